//! Client side of the marketplace REST API

pub mod gateway;

pub use gateway::{AuthGateway, LOGIN_ENDPOINT, SIGNUP_ENDPOINT};
