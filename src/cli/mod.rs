//! CLI interface for Marketdesk

pub mod commands;
mod output;

pub use output::*;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "marketdesk")]
#[command(author = "Krakaw")]
#[command(version)]
#[command(about = "Log in to the service marketplace and check screen access", long_about = None)]
pub struct Cli {
    /// Path to marketdesk.toml (defaults to the nearest one upward from here)
    #[arg(short, long, global = true, env = "MARKETDESK_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new marketdesk.toml configuration file
    Init,

    /// Log in and persist the session
    Login {
        #[arg(short, long)]
        email: String,

        /// Prompted for when omitted
        #[arg(short, long, env = "MARKETDESK_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Create an account and log in with it
    Register {
        #[arg(short, long)]
        name: String,

        #[arg(short, long)]
        email: String,

        /// Prompted for when omitted
        #[arg(short, long, env = "MARKETDESK_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Clear the persisted session
    Logout,

    /// Show the current session
    Whoami {
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Decide whether the current session may open a screen
    Check {
        /// Screen path, e.g. /admin/dashboard
        path: String,
    },

    /// List screens and whether the current session may open them
    Routes,

    /// Send an authenticated request to the API and print the JSON response
    Request {
        /// HTTP method
        #[arg(value_enum)]
        method: HttpMethod,

        /// Resource path, e.g. /todos
        path: String,

        /// JSON request body
        #[arg(short, long)]
        data: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Yaml,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}
