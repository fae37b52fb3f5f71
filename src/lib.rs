//! Marketdesk - session, screen access and API gateway for the service marketplace
//!
//! This is the library interface for Marketdesk. A client builds one
//! [`SessionStore`] from durable storage at startup, hands it to an
//! [`AuthGateway`] for all API traffic, and asks the route guard before
//! opening a screen.

pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod routes;

pub use api::AuthGateway;
pub use auth::{decide, Decision, Role, Session, SessionStore, User};
pub use config::Config;
pub use error::Error;
pub use routes::RouteTable;
