//! Client Auth Session
//! Mission: Application-state object tying token storage, auth state and
//! navigation together
//!
//! Constructed once at bootstrap and shared (`Arc<AuthSession>`) with every
//! guard and API client that needs it.

use crate::auth::{
    gate::{decide_with_status, GateDecision},
    jwt::{unix_now, TokenDecoder},
    models::{Role, TokenStatus},
    routes::RouteTable,
};
use crate::client::{
    navigator::{NavigationKind, Navigator},
    state::{AuthAction, AuthStore, SessionState},
    storage::TokenVault,
};
use anyhow::{bail, Result};
use std::sync::Arc;
use tracing::{debug, info};

pub struct AuthSession {
    vault: TokenVault,
    decoder: TokenDecoder,
    routes: RouteTable,
    store: AuthStore,
    navigator: Arc<dyn Navigator>,
}

impl AuthSession {
    /// Hydrate the session from whatever token is already persisted
    pub fn bootstrap(
        vault: TokenVault,
        decoder: TokenDecoder,
        routes: RouteTable,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self::bootstrap_at(vault, decoder, routes, navigator, unix_now())
    }

    pub fn bootstrap_at(
        vault: TokenVault,
        decoder: TokenDecoder,
        routes: RouteTable,
        navigator: Arc<dyn Navigator>,
        now: i64,
    ) -> Self {
        let status = decoder.status(vault.read().as_deref(), now);
        let initial = SessionState::from_status(&status);
        debug!(token = status.as_str(), role = ?initial.role, "Auth session bootstrapped");

        Self {
            vault,
            decoder,
            routes,
            store: AuthStore::new(initial),
            navigator,
        }
    }

    pub fn state(&self) -> SessionState {
        self.store.snapshot()
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn navigator(&self) -> &Arc<dyn Navigator> {
        &self.navigator
    }

    /// Raw persisted token, if any
    pub fn token(&self) -> Option<String> {
        self.vault.read()
    }

    pub fn token_status_at(&self, now: i64) -> TokenStatus {
        self.decoder.status(self.vault.read().as_deref(), now)
    }

    /// Same expiry rule as the edge gate; false on any decode problem
    pub fn is_token_valid(&self) -> bool {
        self.is_token_valid_at(unix_now())
    }

    pub fn is_token_valid_at(&self, now: i64) -> bool {
        self.token_status_at(now).is_valid()
    }

    /// Persist a freshly issued token and hydrate state from it
    pub fn login(&self, token: &str) -> Result<SessionState> {
        self.login_at(token, unix_now())
    }

    pub fn login_at(&self, token: &str, now: i64) -> Result<SessionState> {
        let status = self.decoder.status(Some(token), now);
        let label = status.as_str();
        let TokenStatus::Valid(claims) = status else {
            bail!("Refusing to store {} token", label);
        };

        self.vault.write(token)?;
        let state = self
            .store
            .dispatch(AuthAction::Authenticated { role: claims.role });
        info!(subject = ?claims.subject, role = ?claims.role, "Logged in");
        Ok(state)
    }

    /// Record a role reported by the backend
    pub fn update_role(&self, role: Role) -> SessionState {
        self.store.dispatch(AuthAction::RoleUpdated(role))
    }

    /// Drop every trace of the session without navigating
    pub fn clear(&self) -> SessionState {
        self.vault.clear();
        self.store.dispatch(AuthAction::LoggedOut)
    }

    /// Clear the session and go to sign-in. Safe to call repeatedly.
    pub fn logout(&self) {
        let was_authenticated = self.state().is_authenticated;
        self.clear();
        if was_authenticated {
            info!("Logged out");
        }
        self.navigator
            .navigate(&self.routes.sign_in_path, NavigationKind::Push);
    }

    /// Gate decision for a client-side route transition
    pub fn check_navigation(&self, path: &str) -> GateDecision {
        self.check_navigation_at(path, unix_now())
    }

    pub fn check_navigation_at(&self, path: &str, now: i64) -> GateDecision {
        if self.routes.is_excluded(path) {
            return GateDecision::Allow;
        }
        decide_with_status(&self.routes, path, &self.token_status_at(now))
    }
}
