//! Route Guard
//! Mission: Settle each protected view into exactly one terminal state
//!
//! A guard starts `Checking` when mounted and leaves it at most once:
//!
//! ```text
//! Checking ──token invalid──────────────▶ Redirecting
//!    │
//!    └──token valid + role known──────▶ Authenticated(role)
//! ```
//!
//! A valid token whose role has not arrived yet keeps the guard in
//! `Checking`: nothing is rendered and nobody is redirected.

use crate::auth::{jwt::unix_now, models::Role};
use crate::client::{navigator::NavigationKind, session::AuthSession, state::SessionState};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardState {
    Checking,
    Authenticated(Role),
    Redirecting(String),
}

impl GuardState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, GuardState::Checking)
    }
}

/// Pure guard evaluation from its two inputs
pub fn evaluate_guard(token_valid: bool, session: SessionState, sign_in_path: &str) -> GuardState {
    if !token_valid {
        return GuardState::Redirecting(sign_in_path.to_string());
    }
    match session {
        SessionState {
            is_authenticated: true,
            role: Some(role),
        } => GuardState::Authenticated(role),
        // Store not hydrated yet; wait instead of bouncing the user.
        _ => GuardState::Checking,
    }
}

/// Guard for one mounted view
pub struct RouteGuard {
    session: Arc<AuthSession>,
    state: GuardState,
}

impl RouteGuard {
    pub fn mount(session: Arc<AuthSession>) -> Self {
        Self::mount_at(session, unix_now())
    }

    pub fn mount_at(session: Arc<AuthSession>, now: i64) -> Self {
        let mut guard = Self {
            session,
            state: GuardState::Checking,
        };
        guard.poll_at(now);
        guard
    }

    pub fn state(&self) -> &GuardState {
        &self.state
    }

    /// Children may render only once the guard settled authenticated
    pub fn can_render(&self) -> bool {
        matches!(self.state, GuardState::Authenticated(_))
    }

    /// Re-evaluate after the auth state may have changed
    pub fn poll(&mut self) -> &GuardState {
        self.poll_at(unix_now())
    }

    pub fn poll_at(&mut self, now: i64) -> &GuardState {
        if self.state.is_terminal() {
            return &self.state;
        }

        let next = evaluate_guard(
            self.session.is_token_valid_at(now),
            self.session.state(),
            &self.session.routes().sign_in_path,
        );

        if let GuardState::Redirecting(target) = &next {
            debug!(redirect = %target, "Guard redirecting");
            self.session
                .navigator()
                .navigate(target, NavigationKind::Push);
        }

        self.state = next;
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIGN_IN: &str = "/authentication/sign-in";

    #[test]
    fn test_invalid_token_redirects() {
        for session in [
            SessionState::logged_out(),
            SessionState {
                is_authenticated: true,
                role: Some(Role::Admin),
            },
        ] {
            assert_eq!(
                evaluate_guard(false, session, SIGN_IN),
                GuardState::Redirecting(SIGN_IN.to_string())
            );
        }
    }

    #[test]
    fn test_valid_token_without_role_keeps_checking() {
        let hydrating = SessionState {
            is_authenticated: true,
            role: None,
        };
        assert_eq!(evaluate_guard(true, hydrating, SIGN_IN), GuardState::Checking);
        assert_eq!(
            evaluate_guard(true, SessionState::logged_out(), SIGN_IN),
            GuardState::Checking
        );
    }

    #[test]
    fn test_valid_token_with_role_settles() {
        let ready = SessionState {
            is_authenticated: true,
            role: Some(Role::Freelancer),
        };
        assert_eq!(
            evaluate_guard(true, ready, SIGN_IN),
            GuardState::Authenticated(Role::Freelancer)
        );
    }
}
