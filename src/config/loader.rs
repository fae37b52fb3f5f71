//! Configuration loading and environment variable interpolation

use crate::error::{Error, Result};
use regex::Regex;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use super::Config;

pub const CONFIG_FILENAME: &str = "marketdesk.toml";

/// Load configuration from marketdesk.toml
pub fn load_config() -> Result<Config> {
    let config_path = find_config_file()?;
    load_config_from_path(&config_path)
}

/// Load configuration from a specific path
pub fn load_config_from_path(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path).map_err(|_| Error::ConfigNotFound)?;
    let content = interpolate_env_vars(&content);
    let mut config: Config = toml::from_str(&content)?;
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        config.storage.resolve_from(dir);
    }
    Ok(config)
}

/// Load the given file, or the nearest marketdesk.toml, falling back to
/// defaults when there is none
pub fn load_or_default(path: Option<&Path>) -> Result<Config> {
    let result = match path {
        Some(path) => load_config_from_path(path),
        None => load_config(),
    };
    match result {
        Err(Error::ConfigNotFound) if path.is_none() => {
            tracing::debug!("No {} found, using defaults", CONFIG_FILENAME);
            Ok(Config::default())
        }
        other => other,
    }
}

/// Find the configuration file, searching upward from current directory
fn find_config_file() -> Result<PathBuf> {
    let mut current = env::current_dir().map_err(|e| Error::Config(e.to_string()))?;

    loop {
        let config_path = current.join(CONFIG_FILENAME);
        if config_path.exists() {
            return Ok(config_path);
        }

        if !current.pop() {
            return Err(Error::ConfigNotFound);
        }
    }
}

/// Interpolate environment variables in the format ${VAR_NAME} or ${VAR_NAME:-default}
fn interpolate_env_vars(content: &str) -> String {
    // This regex is a compile-time constant, panicking is acceptable here
    // as it indicates a programming error in the codebase, not a runtime issue
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)(?::-([^}]*))?\}")
        .expect("Invalid regex pattern - this is a bug in the codebase");

    re.replace_all(content, |caps: &regex::Captures| {
        let var_name = &caps[1];
        let default = caps.get(2).map(|m| m.as_str()).unwrap_or("");

        env::var(var_name).unwrap_or_else(|_| default.to_string())
    })
    .to_string()
}

/// Generate a default configuration file content
pub fn default_config_content() -> &'static str {
    r#"# Marketdesk Configuration

[api]
base_url = "${MARKETDESK_API_URL:-http://localhost:5000}"
timeout_secs = 10

[storage]
# Holds storage.json with the persisted session (mode 0600)
state_dir = "./.marketdesk"

# Screens and the roles allowed on them.
# An empty `roles` list admits any logged-in user; `public` screens need no login.
[[routes]]
path = "/login"
public = true

[[routes]]
path = "/register"
public = true

[[routes]]
path = "/unauthorized"
public = true

[[routes]]
path = "/dashboard"

[[routes]]
path = "/todos"

[[routes]]
path = "/customer/dashboard"
roles = ["customer"]

[[routes]]
path = "/provider/dashboard"
roles = ["provider"]

[[routes]]
path = "/admin/dashboard"
roles = ["admin", "superadmin"]

[[routes]]
path = "/admin"
roles = ["superadmin"]

[[routes]]
path = "/admin/users"
roles = ["superadmin"]
"#
}
