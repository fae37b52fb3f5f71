//! Authentication and session management

pub mod guard;
pub mod models;
pub mod session;
pub mod storage;
pub mod token;

pub use guard::{decide, decide_public, Decision, GuardState, ScreenGuard};
pub use models::{AuthData, Role, User, UserId};
pub use session::{AuthAttempt, AuthKind, AuthStatus, Session, SessionStore};
pub use storage::{DurableStorage, FileStorage, MemoryStorage, AUTH_DATA_KEY};
pub use token::{decode_claims, decode_expiry, is_expired, Claims};

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock a mutex, recovering the data if a panicking holder poisoned it
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
