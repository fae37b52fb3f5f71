use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use marketdesk::cli::{self, Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "marketdesk=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = cli.config.as_deref();

    match cli.command {
        Commands::Init => cli::commands::init().await,
        Commands::Login { email, password } => cli::commands::login(config, &email, password).await,
        Commands::Register {
            name,
            email,
            password,
        } => cli::commands::register(config, &name, &email, password).await,
        Commands::Logout => cli::commands::logout(config).await,
        Commands::Whoami { format } => cli::commands::whoami(config, format).await,
        Commands::Check { path } => cli::commands::check(config, &path).await,
        Commands::Routes => cli::commands::routes(config).await,
        Commands::Request { method, path, data } => {
            cli::commands::request(config, method, &path, data).await
        }
    }
}
