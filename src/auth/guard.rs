//! Role-gated screen access

use tokio::sync::watch;

use crate::auth::models::{normalize_role, Role};
use crate::auth::session::Session;
use crate::routes::{landing_path, LOGIN_PATH, UNAUTHORIZED_PATH};

/// Outcome of checking a session against a screen's role requirements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// An authentication attempt is in flight; show a pending indicator
    Pending,
    Allow,
    RedirectLogin,
    RedirectUnauthorized,
}

impl Decision {
    /// Whether the decision can be acted on
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Decision::Pending)
    }

    /// Screen to navigate to, for redirects
    pub fn redirect_target(&self) -> Option<&'static str> {
        match self {
            Decision::RedirectLogin => Some(LOGIN_PATH),
            Decision::RedirectUnauthorized => Some(UNAUTHORIZED_PATH),
            Decision::Pending | Decision::Allow => None,
        }
    }
}

/// Decide whether `session` may reach a screen requiring one of `required_roles`.
///
/// An empty requirement admits any authenticated role. Role names are
/// compared trimmed and case-folded; names that are not a known role never
/// match.
pub fn decide<S: AsRef<str>>(session: &Session, required_roles: &[S]) -> Decision {
    if session.is_loading() {
        return Decision::Pending;
    }
    let user = match (&session.user, session.is_authenticated) {
        (Some(user), true) => user,
        _ => return Decision::RedirectLogin,
    };
    if required_roles.is_empty() {
        return Decision::Allow;
    }

    let role = normalize_role(user.role.as_str());
    let allowed = required_roles.iter().any(|required| {
        let required = required.as_ref();
        let normalized = normalize_role(required);
        if !Role::ALL.iter().any(|known| known.as_str() == normalized) {
            tracing::warn!("Screen requires unknown role '{}'", required);
            return false;
        }
        normalized == role
    });

    if allowed {
        Decision::Allow
    } else {
        Decision::RedirectUnauthorized
    }
}

/// Where a public screen (login, register) should send the session, if anywhere
pub fn decide_public(session: &Session) -> Option<&'static str> {
    match (&session.user, session.is_authenticated) {
        (Some(user), true) if !session.is_loading() => Some(landing_path(user.role)),
        _ => None,
    }
}

/// Guard state for one screen instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    Pending,
    Allowed,
    Redirecting(&'static str),
}

/// Per-screen guard: starts `Pending` and commits to exactly one terminal
/// state once the session has settled.
#[derive(Debug, Clone)]
pub struct ScreenGuard {
    required_roles: Vec<String>,
    state: GuardState,
}

impl ScreenGuard {
    pub fn new<S: Into<String>>(required_roles: impl IntoIterator<Item = S>) -> Self {
        Self {
            required_roles: required_roles.into_iter().map(Into::into).collect(),
            state: GuardState::Pending,
        }
    }

    pub fn state(&self) -> GuardState {
        self.state
    }

    /// Feed the latest session. Terminal states are never left.
    pub fn observe(&mut self, session: &Session) -> GuardState {
        if self.state != GuardState::Pending {
            return self.state;
        }
        self.state = match decide(session, self.required_roles.as_slice()) {
            Decision::Pending => GuardState::Pending,
            Decision::Allow => GuardState::Allowed,
            Decision::RedirectLogin => GuardState::Redirecting(LOGIN_PATH),
            Decision::RedirectUnauthorized => GuardState::Redirecting(UNAUTHORIZED_PATH),
        };
        self.state
    }

    /// Wait on session updates until the guard reaches a terminal state.
    ///
    /// If the store goes away while still loading, the screen is sent to login.
    pub async fn resolve(&mut self, mut sessions: watch::Receiver<Session>) -> GuardState {
        loop {
            let session = sessions.borrow_and_update().clone();
            if self.observe(&session) != GuardState::Pending {
                return self.state;
            }
            if sessions.changed().await.is_err() {
                self.state = GuardState::Redirecting(LOGIN_PATH);
                return self.state;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::models::{User, UserId};
    use crate::auth::session::AuthStatus;

    fn session_with(role: Role) -> Session {
        Session::authenticated(User::new(UserId::Number(1), role), "token".to_string())
    }

    const NO_ROLES: [&str; 0] = [];

    #[test]
    fn test_loading_is_pending() {
        let mut session = session_with(Role::Admin);
        session.status = AuthStatus::Loading;
        assert_eq!(decide(&session, &["admin"]), Decision::Pending);
        assert!(!Decision::Pending.is_terminal());
    }

    #[test]
    fn test_unauthenticated_redirects_to_login() {
        let decision = decide(&Session::empty(), &NO_ROLES);
        assert_eq!(decision, Decision::RedirectLogin);
        assert_eq!(decision.redirect_target(), Some("/login"));
    }

    #[test]
    fn test_failed_session_redirects_to_login() {
        let session = Session {
            status: AuthStatus::Failed,
            error: Some("Invalid credentials".to_string()),
            ..Session::empty()
        };
        assert_eq!(decide(&session, &["customer"]), Decision::RedirectLogin);
    }

    #[test]
    fn test_empty_roles_allow_any_role() {
        for role in Role::ALL {
            assert_eq!(decide(&session_with(role), &NO_ROLES), Decision::Allow);
        }
    }

    #[test]
    fn test_required_roles_normalized() {
        let session = session_with(Role::Admin);
        assert_eq!(decide(&session, &["Admin"]), Decision::Allow);
        assert_eq!(decide(&session, &["  ADMIN "]), Decision::Allow);
    }

    #[test]
    fn test_role_mismatch_unauthorized() {
        let session = session_with(Role::Customer);
        let decision = decide(&session, &["admin", "superadmin"]);
        assert_eq!(decision, Decision::RedirectUnauthorized);
        assert_eq!(decision.redirect_target(), Some("/unauthorized"));
    }

    #[test]
    fn test_unknown_required_role_never_matches() {
        let session = session_with(Role::Provider);
        assert_eq!(decide(&session, &["vendor"]), Decision::RedirectUnauthorized);
        assert_eq!(decide(&session, &["vendor", "provider"]), Decision::Allow);
    }

    #[test]
    fn test_public_screen_redirects_by_role() {
        assert_eq!(decide_public(&Session::empty()), None);
        assert_eq!(
            decide_public(&session_with(Role::Provider)),
            Some("/provider/dashboard")
        );
        assert_eq!(decide_public(&session_with(Role::SuperAdmin)), Some("/dashboard"));
    }

    #[test]
    fn test_screen_guard_commits_once() {
        let mut guard = ScreenGuard::new(["customer"]);
        let mut loading = Session::empty();
        loading.status = AuthStatus::Loading;

        assert_eq!(guard.observe(&loading), GuardState::Pending);
        assert_eq!(guard.observe(&session_with(Role::Customer)), GuardState::Allowed);
        // later logouts do not flip an already-committed guard
        assert_eq!(guard.observe(&Session::empty()), GuardState::Allowed);
    }

    #[tokio::test]
    async fn test_screen_guard_resolve_waits_for_settled_session() {
        let mut loading = Session::empty();
        loading.status = AuthStatus::Loading;
        let (tx, rx) = watch::channel(loading);

        let handle = tokio::spawn(async move {
            let mut guard = ScreenGuard::new(["admin"]);
            guard.resolve(rx).await
        });

        tx.send_replace(session_with(Role::Customer));
        let state = handle.await.unwrap();
        assert_eq!(state, GuardState::Redirecting("/unauthorized"));
    }

    #[tokio::test]
    async fn test_screen_guard_resolve_store_dropped() {
        let mut loading = Session::empty();
        loading.status = AuthStatus::Loading;
        let (tx, rx) = watch::channel(loading);
        drop(tx);

        let mut guard = ScreenGuard::new(NO_ROLES);
        assert_eq!(guard.resolve(rx).await, GuardState::Redirecting("/login"));
    }
}
