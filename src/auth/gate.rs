//! Edge Authentication Gate
//! Mission: Decide allow vs. redirect for every document request
//!
//! Stateless: the decision depends only on the path, the token and the
//! clock. Nothing here can fail; bad tokens simply count as absent.

use crate::auth::{
    jwt::TokenDecoder,
    models::TokenStatus,
    routes::{RouteClass, RouteTable},
};
use tracing::debug;

/// What the gate wants done with a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    Redirect(String),
}

impl GateDecision {
    pub fn is_allow(&self) -> bool {
        matches!(self, GateDecision::Allow)
    }
}

/// Route table plus token decoder
#[derive(Clone)]
pub struct Gate {
    routes: RouteTable,
    decoder: TokenDecoder,
}

impl Gate {
    pub fn new(routes: RouteTable, decoder: TokenDecoder) -> Self {
        Self { routes, decoder }
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn decoder(&self) -> &TokenDecoder {
        &self.decoder
    }

    /// Whether the gate applies to `path` at all
    pub fn applies_to(&self, path: &str) -> bool {
        !self.routes.is_excluded(path)
    }

    /// Evaluate the decision table for one request
    pub fn decide(&self, path: &str, token: Option<&str>, now: i64) -> GateDecision {
        self.evaluate(path, token, now).0
    }

    /// Decision plus the token status it was based on
    pub fn evaluate(
        &self,
        path: &str,
        token: Option<&str>,
        now: i64,
    ) -> (GateDecision, TokenStatus) {
        // API calls carry their own auth; never inspect the token for them.
        if self.routes.is_api(path) {
            return (GateDecision::Allow, TokenStatus::Missing);
        }

        let status = self.decoder.status(token, now);
        let decision = decide_with_status(&self.routes, path, &status);

        if let GateDecision::Redirect(target) = &decision {
            debug!(path, token = status.as_str(), redirect = %target, "Gate redirect");
        }

        (decision, status)
    }
}

impl Default for Gate {
    fn default() -> Self {
        Self::new(RouteTable::default(), TokenDecoder::unverified())
    }
}

/// The decision table, given an already-classified token
pub fn decide_with_status(routes: &RouteTable, path: &str, status: &TokenStatus) -> GateDecision {
    if routes.is_api(path) {
        return GateDecision::Allow;
    }

    let valid = status.is_valid();
    match routes.classify(path) {
        RouteClass::RedirectAway if valid => {
            GateDecision::Redirect(routes.authenticated_landing.clone())
        }
        RouteClass::Protected if !valid => GateDecision::Redirect(routes.sign_in_path.clone()),
        _ => GateDecision::Allow,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;

    const NOW: i64 = 1_700_000_000;

    fn token_expiring_at(exp: i64) -> String {
        encode(
            &Header::default(),
            &json!({ "sub": "7", "email": "a@b.c", "role": "FREELANCER", "iat": NOW - 5, "exp": exp }),
            &EncodingKey::from_secret(b"issuer"),
        )
        .unwrap()
    }

    fn sign_in() -> GateDecision {
        GateDecision::Redirect("/authentication/sign-in".to_string())
    }

    #[test]
    fn test_no_cookie_on_protected_path_redirects_to_sign_in() {
        let gate = Gate::default();
        assert_eq!(gate.decide("/dashboard/my-bookings", None, NOW), sign_in());
    }

    #[test]
    fn test_valid_token_on_root_redirects_to_dashboard() {
        let gate = Gate::default();
        let token = token_expiring_at(NOW + 3600);
        assert_eq!(
            gate.decide("/", Some(&token), NOW),
            GateDecision::Redirect("/dashboard".to_string())
        );
    }

    #[test]
    fn test_expired_token_on_sign_in_is_allowed() {
        let gate = Gate::default();
        let token = token_expiring_at(NOW - 10);
        assert_eq!(
            gate.decide("/authentication/sign-in", Some(&token), NOW),
            GateDecision::Allow
        );
    }

    #[test]
    fn test_api_paths_bypass_regardless_of_token() {
        let gate = Gate::default();
        let valid = token_expiring_at(NOW + 3600);
        let expired = token_expiring_at(NOW - 1);
        for token in [None, Some(valid.as_str()), Some(expired.as_str()), Some("abc.def")] {
            assert!(gate.decide("/api/booking/create", token, NOW).is_allow());
        }
    }

    #[test]
    fn test_malformed_token_redirects_to_sign_in() {
        let gate = Gate::default();
        assert_eq!(gate.decide("/dashboard", Some("abc.def"), NOW), sign_in());
    }

    #[test]
    fn test_public_paths_allowed_without_token() {
        let gate = Gate::default();
        for path in gate.routes().public_paths.clone() {
            assert!(gate.decide(&path, None, NOW).is_allow(), "path {}", path);
        }
    }

    #[test]
    fn test_valid_token_on_other_public_paths_is_allowed() {
        let gate = Gate::default();
        let token = token_expiring_at(NOW + 60);
        assert!(gate
            .decide("/authentication/sign-up", Some(&token), NOW)
            .is_allow());
        assert!(gate.decide("/dashboard", Some(&token), NOW).is_allow());
    }

    #[test]
    fn test_token_expiring_exactly_now_is_rejected() {
        let gate = Gate::default();
        let token = token_expiring_at(NOW);
        assert_eq!(gate.decide("/dashboard", Some(&token), NOW), sign_in());
        assert!(gate.decide("/", Some(&token), NOW).is_allow());
    }

    #[test]
    fn test_gate_does_not_apply_to_static_assets() {
        let gate = Gate::default();
        assert!(!gate.applies_to("/_next/static/app.js"));
        assert!(!gate.applies_to("/favicon.ico"));
        assert!(gate.applies_to("/dashboard"));
    }
}
