//! Gate Middleware
//! Mission: Run the edge gate in front of every routed request

use crate::auth::{
    gate::{Gate, GateDecision},
    jwt::unix_now,
    models::{TokenClaims, TokenStatus},
};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;

pub const DEFAULT_TOKEN_COOKIE: &str = "token";

/// Gate plus the name of the cookie the token lives in
pub struct EdgeGate {
    pub gate: Gate,
    pub cookie_name: String,
}

impl EdgeGate {
    pub fn new(gate: Gate, cookie_name: impl Into<String>) -> Self {
        Self {
            gate,
            cookie_name: cookie_name.into(),
        }
    }

    /// Decide for a request given its cookies
    pub fn evaluate(&self, path: &str, jar: &CookieJar, now: i64) -> GateDecision {
        self.evaluate_with_status(path, jar, now).0
    }

    fn evaluate_with_status(
        &self,
        path: &str,
        jar: &CookieJar,
        now: i64,
    ) -> (GateDecision, TokenStatus) {
        if !self.gate.applies_to(path) {
            return (GateDecision::Allow, TokenStatus::Missing);
        }
        let token = jar.get(&self.cookie_name).map(|c| c.value());
        self.gate.evaluate(path, token, now)
    }
}

impl Default for EdgeGate {
    fn default() -> Self {
        Self::new(Gate::default(), DEFAULT_TOKEN_COOKIE)
    }
}

/// Middleware that redirects or passes the request through.
///
/// On pass-through with a valid token the decoded claims are added to the
/// request extensions for downstream handlers.
pub async fn gate_middleware(
    State(edge): State<Arc<EdgeGate>>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    let path = req.uri().path().to_string();

    match edge.evaluate_with_status(&path, &jar, unix_now()) {
        (GateDecision::Redirect(target), _) => Redirect::temporary(&target).into_response(),
        (GateDecision::Allow, TokenStatus::Valid(claims)) => {
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
        (GateDecision::Allow, _) => next.run(req).await,
    }
}

/// Extract claims from request (use after gate middleware)
pub fn extract_claims(req: &Request) -> Option<&TokenClaims> {
    req.extensions().get::<TokenClaims>()
}
