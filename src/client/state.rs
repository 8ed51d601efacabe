//! Client Auth State
//! Mission: Single-writer projection of the persisted token
//!
//! State changes only through `AuthAction`s applied by `SessionState::reduce`;
//! readers take cheap snapshots.

use crate::auth::models::{Role, TokenStatus};
use parking_lot::RwLock;
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SessionState {
    pub is_authenticated: bool,
    pub role: Option<Role>,
}

/// Everything that may change the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthAction {
    /// A token was found (bootstrap) or stored (login); role may still be unknown
    Authenticated { role: Option<Role> },
    /// The backend reported the current user's role
    RoleUpdated(Role),
    LoggedOut,
}

impl SessionState {
    pub fn logged_out() -> Self {
        Self::default()
    }

    /// Initial state derived from a token check
    pub fn from_status(status: &TokenStatus) -> Self {
        match status.claims() {
            Some(claims) => Self {
                is_authenticated: true,
                role: claims.role,
            },
            None => Self::logged_out(),
        }
    }

    pub fn reduce(self, action: &AuthAction) -> Self {
        match action {
            AuthAction::Authenticated { role } => Self {
                is_authenticated: true,
                role: *role,
            },
            // A role without a session is ignored; only a login establishes one.
            AuthAction::RoleUpdated(role) if self.is_authenticated => Self {
                role: Some(*role),
                ..self
            },
            AuthAction::RoleUpdated(_) => self,
            AuthAction::LoggedOut => Self::logged_out(),
        }
    }
}

/// Shared store holding the current `SessionState`
#[derive(Default)]
pub struct AuthStore {
    state: RwLock<SessionState>,
}

impl AuthStore {
    pub fn new(initial: SessionState) -> Self {
        Self {
            state: RwLock::new(initial),
        }
    }

    pub fn snapshot(&self) -> SessionState {
        *self.state.read()
    }

    /// Apply an action and return the resulting state
    pub fn dispatch(&self, action: AuthAction) -> SessionState {
        let mut state = self.state.write();
        let next = state.reduce(&action);
        if next != *state {
            debug!(?action, authenticated = next.is_authenticated, role = ?next.role, "Auth state changed");
        }
        *state = next;
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::models::TokenClaims;

    fn claims(role: Option<Role>) -> TokenClaims {
        TokenClaims {
            subject: Some("1".to_string()),
            email: None,
            role,
            issued_at: None,
            expires_at: 100,
        }
    }

    #[test]
    fn test_from_status() {
        let state = SessionState::from_status(&TokenStatus::Valid(claims(Some(Role::Admin))));
        assert!(state.is_authenticated);
        assert_eq!(state.role, Some(Role::Admin));

        for status in [TokenStatus::Missing, TokenStatus::Malformed, TokenStatus::Expired] {
            assert_eq!(SessionState::from_status(&status), SessionState::logged_out());
        }
    }

    #[test]
    fn test_role_update_requires_session() {
        let anonymous = SessionState::logged_out().reduce(&AuthAction::RoleUpdated(Role::Admin));
        assert_eq!(anonymous, SessionState::logged_out());

        let hydrating = SessionState::logged_out().reduce(&AuthAction::Authenticated { role: None });
        assert!(hydrating.is_authenticated);
        assert_eq!(hydrating.role, None);

        let settled = hydrating.reduce(&AuthAction::RoleUpdated(Role::Patient));
        assert_eq!(settled.role, Some(Role::Patient));
    }

    #[test]
    fn test_logout_is_idempotent() {
        let store = AuthStore::new(SessionState {
            is_authenticated: true,
            role: Some(Role::Freelancer),
        });
        assert_eq!(store.dispatch(AuthAction::LoggedOut), SessionState::logged_out());
        assert_eq!(store.dispatch(AuthAction::LoggedOut), SessionState::logged_out());
        assert_eq!(store.snapshot(), SessionState::logged_out());
    }
}
