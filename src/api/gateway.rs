//! Authenticated access to the marketplace REST API
//!
//! All outbound traffic goes through `AuthGateway`. It attaches the session's
//! bearer token and is the one place that reacts to a 401: the session is
//! logged out and the caller gets `Error::Unauthorized`, whose redirect target
//! is the login screen.

use chrono::Utc;
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::auth::models::{AuthResponse, ErrorBody, LoginRequest, SignupRequest};
use crate::auth::session::{AuthAttempt, AuthKind, Session, SessionStore};
use crate::config::ApiConfig;
use crate::error::{Error, Result};

pub const LOGIN_ENDPOINT: &str = "/auth/login";
pub const SIGNUP_ENDPOINT: &str = "/auth/signup";

/// HTTP client bound to a session
#[derive(Debug, Clone)]
pub struct AuthGateway {
    client: Client,
    base_url: String,
    session: SessionStore,
}

impl AuthGateway {
    pub fn new(config: &ApiConfig, session: SessionStore) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Log in with email and password
    pub async fn login(&self, email: &str, password: &str) -> Result<Session> {
        let attempt = self.session.begin_auth(AuthKind::Login);
        tracing::info!("Logging in as {}", email);
        self.authenticate(attempt, LOGIN_ENDPOINT, &LoginRequest { email, password })
            .await
    }

    /// Create an account; a successful signup logs the user in
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<Session> {
        let attempt = self.session.begin_auth(AuthKind::Register);
        tracing::info!("Registering {}", email);
        let body = SignupRequest {
            name,
            email,
            password,
        };
        self.authenticate(attempt, SIGNUP_ENDPOINT, &body).await
    }

    /// Drop the local session. The API keeps no server-side session to end.
    pub fn logout(&self) {
        self.session.logout();
    }

    async fn authenticate<B: Serialize>(
        &self,
        attempt: AuthAttempt,
        path: &str,
        body: &B,
    ) -> Result<Session> {
        let url = self.url(path);
        tracing::debug!("POST {}", url);

        let response = match self.client.post(&url).json(body).send().await {
            Ok(response) => response,
            Err(e) => {
                self.session.fail_auth(attempt, e.to_string());
                return Err(e.into());
            }
        };

        if !response.status().is_success() {
            let reason = error_message(response).await;
            self.session.fail_auth(attempt, reason.clone());
            return Err(Error::AuthRejected(reason));
        }

        let auth: AuthResponse = match response.json().await {
            Ok(auth) => auth,
            Err(e) => {
                self.session.fail_auth(attempt, e.to_string());
                return Err(e.into());
            }
        };

        if !self.session.complete_auth(attempt, auth.user, auth.token)? {
            tracing::debug!("{:?} attempt was superseded", attempt.kind());
        }
        Ok(self.session.snapshot())
    }

    /// Send a request with the session's bearer token attached.
    ///
    /// A locally expired token and a 401 response both log the session out
    /// and yield `Error::Unauthorized`. Other statuses are returned as-is.
    pub async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Response> {
        if self.session.expire_if_stale(Utc::now()) {
            return Err(Error::Unauthorized);
        }

        let url = self.url(path);
        tracing::debug!("{} {}", method, url);

        let mut request = self.client.request(method, &url);
        if let Some(token) = self.session.token() {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            tracing::warn!("{} rejected the session token, logging out", url);
            self.session.logout();
            return Err(Error::Unauthorized);
        }
        Ok(response)
    }

    async fn send_json<B, T>(&self, method: Method, path: &str, body: Option<&B>) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = check_status(self.send(method, path, body).await?).await?;
        Ok(response.json().await?)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send_json::<(), T>(Method::GET, path, None).await
    }

    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        self.send_json(Method::POST, path, Some(body)).await
    }

    pub async fn put<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        self.send_json(Method::PUT, path, Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> Result<()> {
        check_status(self.send::<()>(Method::DELETE, path, None).await?).await?;
        Ok(())
    }
}

/// Turn a non-success response into `Error::Status`
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = error_message(response).await;
    Err(Error::Status {
        status: status.as_u16(),
        message,
    })
}

/// Best human-readable reason for a failed response
async fn error_message(response: Response) -> String {
    let status = response.status();
    let fallback = format!("Request failed with status code {}", status.as_u16());
    let text = match response.text().await {
        Ok(text) => text,
        Err(_) => return fallback,
    };
    serde_json::from_str::<ErrorBody>(&text)
        .ok()
        .and_then(ErrorBody::into_message)
        .unwrap_or(fallback)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::storage::MemoryStorage;
    use std::sync::Arc;

    fn gateway(base_url: &str) -> AuthGateway {
        let config = ApiConfig {
            base_url: base_url.to_string(),
            ..ApiConfig::default()
        };
        let session = SessionStore::hydrate(Arc::new(MemoryStorage::new()));
        AuthGateway::new(&config, session).unwrap()
    }

    #[test]
    fn test_url_joining() {
        let gw = gateway("http://localhost:5000/");
        assert_eq!(gw.base_url(), "http://localhost:5000");
        assert_eq!(gw.url("/todos"), "http://localhost:5000/todos");
        assert_eq!(gw.url("users/1"), "http://localhost:5000/users/1");
    }

    #[tokio::test]
    async fn test_transport_error_fails_attempt() {
        // port 9 (discard) on localhost is not expected to accept HTTP
        let gw = gateway("http://127.0.0.1:9");
        let result = gw.login("a@b.com", "x").await;
        assert!(matches!(result, Err(Error::Http(_))));

        let session = gw.session().snapshot();
        assert_eq!(session.status, crate::auth::AuthStatus::Failed);
        assert!(session.error.is_some());
    }
}
