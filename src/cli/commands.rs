//! CLI command implementations

use anyhow::{Context, Result};
use dialoguer::{theme::ColorfulTheme, Password};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::api::AuthGateway;
use crate::auth::{decide_public, Decision, FileStorage, SessionStore};
use crate::cli::{
    error, format_decision, info, print_route_table, print_session_detail, success, warn,
    HttpMethod, OutputFormat,
};
use crate::config::{self, loader::CONFIG_FILENAME, Config};
use crate::error::Error;
use crate::routes::DASHBOARD_PATH;

/// Everything a command needs, built once per invocation
struct AppContext {
    config: Config,
    gateway: AuthGateway,
}

impl AppContext {
    fn load(config_path: Option<&Path>) -> Result<Self> {
        let config = config::load_or_default(config_path).map_err(|e| anyhow::anyhow!("{}", e))?;
        let storage = FileStorage::new(&config.storage.state_dir);
        let session = SessionStore::hydrate(Arc::new(storage));
        let gateway = AuthGateway::new(&config.api, session)?;
        Ok(Self { config, gateway })
    }

    fn session(&self) -> &SessionStore {
        self.gateway.session()
    }
}

/// Initialize a new marketdesk.toml configuration file
pub async fn init() -> Result<()> {
    let config_path = Path::new(CONFIG_FILENAME);

    if config_path.exists() {
        warn(&format!("{} already exists", CONFIG_FILENAME));
        return Ok(());
    }

    fs::write(config_path, config::loader::default_config_content())?;

    success(&format!("Created {}", CONFIG_FILENAME));
    info("Edit the API URL if needed and run 'marketdesk login --email <email>'");

    Ok(())
}

fn read_password(password: Option<String>) -> Result<String> {
    match password {
        Some(password) => Ok(password),
        None => Password::with_theme(&ColorfulTheme::default())
            .with_prompt("Password")
            .interact()
            .context("Failed to read password"),
    }
}

/// Log in and persist the session
pub async fn login(config_path: Option<&Path>, email: &str, password: Option<String>) -> Result<()> {
    let ctx = AppContext::load(config_path)?;

    if let Some(target) = decide_public(&ctx.session().snapshot()) {
        info(&format!("Already logged in, continue at {}", target));
        return Ok(());
    }

    let password = read_password(password)?;
    match ctx.gateway.login(email, &password).await {
        Ok(session) => {
            announce_login(&session);
            Ok(())
        }
        Err(e) => {
            error(&format!("Login failed: {}", e));
            Err(e.into())
        }
    }
}

/// Create an account and log in with it
pub async fn register(
    config_path: Option<&Path>,
    name: &str,
    email: &str,
    password: Option<String>,
) -> Result<()> {
    let ctx = AppContext::load(config_path)?;

    if let Some(target) = decide_public(&ctx.session().snapshot()) {
        info(&format!("Already logged in, continue at {}", target));
        return Ok(());
    }

    let password = read_password(password)?;
    match ctx.gateway.register(name, email, &password).await {
        Ok(session) => {
            announce_login(&session);
            Ok(())
        }
        Err(e) => {
            error(&format!("Registration failed: {}", e));
            Err(e.into())
        }
    }
}

fn announce_login(session: &crate::auth::Session) {
    let Some(user) = &session.user else {
        warn("A newer login replaced this one");
        return;
    };
    let who = user.name().map(str::to_string).unwrap_or_else(|| user.id.to_string());
    success(&format!("Logged in as {} ({})", who, user.role));
    let target = decide_public(session).unwrap_or(DASHBOARD_PATH);
    info(&format!("Continue at {}", target));
}

/// Clear the persisted session
pub async fn logout(config_path: Option<&Path>) -> Result<()> {
    let ctx = AppContext::load(config_path)?;
    let was_authenticated = ctx.session().snapshot().is_authenticated;
    ctx.gateway.logout();

    if was_authenticated {
        success("Logged out");
    } else {
        info("No active session");
    }
    Ok(())
}

/// Show the current session
pub async fn whoami(config_path: Option<&Path>, format: OutputFormat) -> Result<()> {
    let ctx = AppContext::load(config_path)?;
    let session = ctx.session().snapshot();

    match format {
        OutputFormat::Table => print_session_detail(&session),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&session)?),
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(&session)?),
    }
    Ok(())
}

/// Decide whether the current session may open a screen
pub async fn check(config_path: Option<&Path>, path: &str) -> Result<()> {
    let ctx = AppContext::load(config_path)?;
    let table = ctx.config.route_table();
    let session = ctx.session().snapshot();

    let screen = table.lookup(path).map_err(|e| anyhow::anyhow!("{}", e))?;
    if screen.public {
        match decide_public(&session) {
            Some(target) => info(&format!("{} is public; logged-in users go to {}", screen.path, target)),
            None => success(&format!("{} is public", screen.path)),
        }
        return Ok(());
    }

    let decision = table.decide(path, &session).map_err(|e| anyhow::anyhow!("{}", e))?;
    println!("{} {}", screen.path, format_decision(decision));
    match decision {
        Decision::Allow | Decision::Pending => Ok(()),
        other => anyhow::bail!(
            "access denied, redirect to {}",
            other.redirect_target().unwrap_or("/login")
        ),
    }
}

/// List screens and whether the current session may open them
pub async fn routes(config_path: Option<&Path>) -> Result<()> {
    let ctx = AppContext::load(config_path)?;
    let table = ctx.config.route_table();
    let session = ctx.session().snapshot();

    let mut rows = Vec::with_capacity(table.screens().len());
    for screen in table.screens() {
        let decision = table
            .decide(&screen.path, &session)
            .unwrap_or(Decision::RedirectLogin);
        rows.push((screen.clone(), decision));
    }
    print_route_table(&rows);
    Ok(())
}

/// Send an authenticated request to the API and print the JSON response
pub async fn request(
    config_path: Option<&Path>,
    method: HttpMethod,
    path: &str,
    data: Option<String>,
) -> Result<()> {
    let ctx = AppContext::load(config_path)?;

    let body: Option<serde_json::Value> = data
        .as_deref()
        .map(serde_json::from_str::<serde_json::Value>)
        .transpose()
        .context("--data is not valid JSON")?;

    let response = match ctx.gateway.send(method.into(), path, body.as_ref()).await {
        Ok(response) => response,
        Err(Error::Unauthorized) => {
            error("Session expired or was revoked");
            info("Log in again with 'marketdesk login --email <email>'");
            return Err(Error::Unauthorized.into());
        }
        Err(e) => return Err(e.into()),
    };

    let status = response.status();
    let text = response.text().await?;
    let pretty = serde_json::from_str::<serde_json::Value>(&text)
        .ok()
        .and_then(|v| serde_json::to_string_pretty(&v).ok())
        .unwrap_or(text);

    if status.is_success() {
        println!("{}", pretty);
        Ok(())
    } else {
        error(&format!("{} returned {}", path, status));
        if !pretty.is_empty() {
            eprintln!("{}", pretty);
        }
        anyhow::bail!("request failed with status {}", status.as_u16())
    }
}
