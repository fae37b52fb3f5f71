//! Session management
//!
//! `SessionStore` owns the client's authentication state. Every mutation goes
//! through one of its transitions, each of which runs under a single lock,
//! writes durable storage if needed, and then publishes the new snapshot to
//! subscribers.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

use crate::auth::lock;
use crate::auth::models::{AuthData, User};
use crate::auth::storage::{DurableStorage, AUTH_DATA_KEY};
use crate::auth::token;
use crate::error::{Error, Result};

/// Progress of the most recent login or registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthStatus {
    #[default]
    Idle,
    Loading,
    Succeeded,
    Failed,
}

impl fmt::Display for AuthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthStatus::Idle => write!(f, "idle"),
            AuthStatus::Loading => write!(f, "loading"),
            AuthStatus::Succeeded => write!(f, "succeeded"),
            AuthStatus::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthKind {
    Login,
    Register,
}

/// Snapshot of the client's authentication state
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Session {
    pub user: Option<User>,
    #[serde(skip)]
    pub token: Option<String>,
    pub is_authenticated: bool,
    pub status: AuthStatus,
    pub error: Option<String>,
}

impl Session {
    /// Logged-out, idle state
    pub fn empty() -> Self {
        Self::default()
    }

    /// Fully authenticated state
    pub fn authenticated(user: User, token: String) -> Self {
        Self {
            user: Some(user),
            token: Some(token),
            is_authenticated: true,
            status: AuthStatus::Succeeded,
            error: None,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.status == AuthStatus::Loading
    }

    /// Logged out and idle, with nothing left over from a previous session
    pub fn is_empty(&self) -> bool {
        *self == Self::empty()
    }
}

/// Ticket for one in-flight login or registration.
///
/// Completions carrying a ticket older than the latest `begin_auth` (or any
/// `logout`) are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthAttempt {
    generation: u64,
    kind: AuthKind,
}

impl AuthAttempt {
    pub fn kind(&self) -> AuthKind {
        self.kind
    }
}

struct Inner {
    session: Session,
    generation: u64,
}

struct Shared {
    state: Mutex<Inner>,
    events: watch::Sender<Session>,
    storage: Arc<dyn DurableStorage>,
}

/// Process-wide session state, shared by handle
pub struct SessionStore {
    shared: Arc<Shared>,
}

impl SessionStore {
    /// Build the store from durable storage, as at process start
    pub fn hydrate(storage: Arc<dyn DurableStorage>) -> Self {
        Self::hydrate_at(storage, Utc::now())
    }

    /// Build the store from durable storage, checking expiry against `now`
    pub fn hydrate_at(storage: Arc<dyn DurableStorage>, now: DateTime<Utc>) -> Self {
        let session = load_session(storage.as_ref(), now);
        let (events, _) = watch::channel(session.clone());
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(Inner {
                    session,
                    generation: 0,
                }),
                events,
                storage,
            }),
        }
    }

    /// Current state
    pub fn snapshot(&self) -> Session {
        lock(&self.shared.state).session.clone()
    }

    /// Current bearer token, if any
    pub fn token(&self) -> Option<String> {
        lock(&self.shared.state).session.token.clone()
    }

    /// Receive every state the store transitions into
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.shared.events.subscribe()
    }

    fn publish(&self, inner: &Inner) {
        self.shared.events.send_replace(inner.session.clone());
    }

    /// Mark a login or registration as in flight
    pub fn begin_auth(&self, kind: AuthKind) -> AuthAttempt {
        let mut inner = lock(&self.shared.state);
        inner.generation += 1;
        inner.session.status = AuthStatus::Loading;
        inner.session.error = None;
        self.publish(&inner);
        tracing::debug!("Auth attempt {} started ({:?})", inner.generation, kind);
        AuthAttempt {
            generation: inner.generation,
            kind,
        }
    }

    /// Apply a successful authentication and persist it.
    ///
    /// Returns `Ok(false)` when the attempt is stale and nothing changed. A
    /// token that is already expired or undecodable fails the attempt instead.
    pub fn complete_auth(&self, attempt: AuthAttempt, user: User, token: String) -> Result<bool> {
        let mut inner = lock(&self.shared.state);
        if attempt.generation != inner.generation {
            tracing::warn!(
                "Ignoring stale auth completion (attempt {}, current {})",
                attempt.generation,
                inner.generation
            );
            return Ok(false);
        }

        if let Err(e) = token::decode_expiry(&token) {
            self.fail(&mut inner, e.to_string());
            return Err(e);
        }
        if token::is_expired(&token, Utc::now()) {
            let reason = "Received an expired token".to_string();
            self.fail(&mut inner, reason.clone());
            return Err(Error::Decode(reason));
        }

        let data = AuthData { user, token };
        match serde_json::to_string(&data) {
            Ok(json) => {
                if let Err(e) = self.shared.storage.set(AUTH_DATA_KEY, &json) {
                    tracing::warn!("Failed to persist session: {}", e);
                }
            }
            Err(e) => tracing::warn!("Failed to serialize session: {}", e),
        }

        tracing::info!(
            "Authenticated user {} as {}",
            data.user.id,
            data.user.role
        );
        inner.session = Session::authenticated(data.user, data.token);
        self.publish(&inner);
        Ok(true)
    }

    /// Record a failed authentication. Returns false for stale attempts.
    pub fn fail_auth(&self, attempt: AuthAttempt, reason: impl Into<String>) -> bool {
        let mut inner = lock(&self.shared.state);
        if attempt.generation != inner.generation {
            tracing::warn!(
                "Ignoring stale auth failure (attempt {}, current {})",
                attempt.generation,
                inner.generation
            );
            return false;
        }
        let reason = reason.into();
        tracing::info!("Authentication failed: {}", reason);
        self.fail(&mut inner, reason);
        true
    }

    /// Failed state; a previously stored identity is dropped along with the in-memory one
    fn fail(&self, inner: &mut Inner, reason: String) {
        if inner.session.user.is_some() || inner.session.token.is_some() {
            purge(self.shared.storage.as_ref());
        }
        apply_failure(&mut inner.session, reason);
        self.publish(inner);
    }

    /// Drop the session and its durable copy. In-flight attempts become stale.
    pub fn logout(&self) {
        let mut inner = lock(&self.shared.state);
        self.reset(&mut inner);
        tracing::info!("Logged out");
    }

    /// Apply logout if the current token has expired since it was last checked
    pub fn expire_if_stale(&self, now: DateTime<Utc>) -> bool {
        let mut inner = lock(&self.shared.state);
        let expired = match inner.session.token.as_deref() {
            Some(token) => token::is_expired(token, now),
            None => false,
        };
        if expired {
            tracing::info!("Session token expired");
            self.reset(&mut inner);
        }
        expired
    }

    fn reset(&self, inner: &mut Inner) {
        inner.generation += 1;
        inner.session = Session::empty();
        purge(self.shared.storage.as_ref());
        self.publish(inner);
    }
}

impl Clone for SessionStore {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore")
            .field("session", &self.snapshot())
            .finish_non_exhaustive()
    }
}

fn apply_failure(session: &mut Session, reason: String) {
    session.user = None;
    session.token = None;
    session.is_authenticated = false;
    session.status = AuthStatus::Failed;
    session.error = Some(reason);
}

fn purge(storage: &dyn DurableStorage) {
    if let Err(e) = storage.remove(AUTH_DATA_KEY) {
        tracing::warn!("Failed to clear stored session: {}", e);
    }
}

/// Read the persisted session, purging it if it is unusable
fn load_session(storage: &dyn DurableStorage, now: DateTime<Utc>) -> Session {
    let raw = match storage.get(AUTH_DATA_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Session::empty(),
        Err(e) => {
            tracing::warn!("Could not read stored session, starting fresh: {}", e);
            purge(storage);
            return Session::empty();
        }
    };

    let data: AuthData = match serde_json::from_str(&raw) {
        Ok(data) => data,
        Err(e) => {
            let err = Error::StorageCorrupt(e.to_string());
            tracing::warn!("{}", err);
            purge(storage);
            return Session::empty();
        }
    };

    if token::is_expired(&data.token, now) {
        tracing::info!("Stored session has expired");
        purge(storage);
        return Session::empty();
    }

    tracing::debug!("Restored session for user {}", data.user.id);
    Session::authenticated(data.user, data.token)
}
