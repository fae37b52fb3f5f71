//! Screen catalog and role landing pages

use serde::{Deserialize, Serialize};

use crate::auth::guard::{decide, Decision};
use crate::auth::models::Role;
use crate::auth::session::Session;
use crate::error::{Error, Result};

pub const LOGIN_PATH: &str = "/login";
pub const REGISTER_PATH: &str = "/register";
pub const UNAUTHORIZED_PATH: &str = "/unauthorized";
pub const DASHBOARD_PATH: &str = "/dashboard";

/// Screen a role lands on after logging in
pub fn landing_path(role: Role) -> &'static str {
    match role {
        Role::Customer => "/customer/dashboard",
        Role::Provider => "/provider/dashboard",
        Role::Admin => "/admin/dashboard",
        Role::SuperAdmin => DASHBOARD_PATH,
    }
}

/// A screen and the roles allowed to reach it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Screen {
    pub path: String,

    /// Allowed role names; empty means any authenticated role
    #[serde(default)]
    pub roles: Vec<String>,

    /// Reachable without logging in
    #[serde(default)]
    pub public: bool,
}

impl Screen {
    pub fn public(path: &str) -> Self {
        Self {
            path: path.to_string(),
            roles: Vec::new(),
            public: true,
        }
    }

    pub fn protected(path: &str, roles: &[Role]) -> Self {
        Self {
            path: path.to_string(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
            public: false,
        }
    }
}

/// Screens shipped with the marketplace front end
pub fn default_screens() -> Vec<Screen> {
    vec![
        Screen::public(LOGIN_PATH),
        Screen::public(REGISTER_PATH),
        Screen::public(UNAUTHORIZED_PATH),
        Screen::protected(DASHBOARD_PATH, &[]),
        Screen::protected("/todos", &[]),
        Screen::protected("/customer/dashboard", &[Role::Customer]),
        Screen::protected("/provider/dashboard", &[Role::Provider]),
        Screen::protected("/admin/dashboard", &[Role::Admin, Role::SuperAdmin]),
        Screen::protected("/admin", &[Role::SuperAdmin]),
        Screen::protected("/admin/users", &[Role::SuperAdmin]),
    ]
}

/// Lookup table over the configured screens
#[derive(Debug, Clone)]
pub struct RouteTable {
    screens: Vec<Screen>,
}

fn normalize_path(path: &str) -> String {
    let trimmed = path.trim().trim_end_matches('/');
    let lowered = trimmed.to_lowercase();
    if lowered.starts_with('/') {
        lowered
    } else {
        format!("/{}", lowered)
    }
}

impl RouteTable {
    pub fn new(screens: Vec<Screen>) -> Self {
        Self { screens }
    }

    pub fn screens(&self) -> &[Screen] {
        &self.screens
    }

    /// Find a screen; paths match case-insensitively, ignoring a trailing slash
    pub fn lookup(&self, path: &str) -> Result<&Screen> {
        let wanted = normalize_path(path);
        self.screens
            .iter()
            .find(|screen| normalize_path(&screen.path) == wanted)
            .ok_or_else(|| Error::ScreenNotFound(path.to_string()))
    }

    /// Guard decision for navigating to `path`
    pub fn decide(&self, path: &str, session: &Session) -> Result<Decision> {
        let screen = self.lookup(path)?;
        if screen.public {
            return Ok(Decision::Allow);
        }
        Ok(decide(session, screen.roles.as_slice()))
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new(default_screens())
    }
}
