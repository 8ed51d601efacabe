//! Backend API Client
//! Mission: Attach the session token to REST calls and react to 401s
//!
//! Every business endpoint (`/booking/*`, `/freelancer/*`, `/service/*`, ...)
//! goes through this client. Auth endpoints are called without a token.
//! Errors come back normalised as `ApiError`; nothing is retried here.

use crate::auth::{
    models::Role,
    routes::{is_within, AUTHENTICATION_ROOT},
};
use crate::client::{navigator::NavigationKind, session::AuthSession};
use anyhow::{Context, Result};
use reqwest::{Client, Method, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub const AUTH_ENDPOINT_PREFIX: &str = "/auth";

/// Where a response may report the caller's own role
const ROLE_POINTERS: [&str; 2] = ["/user/role", "/data/user/role"];

/// Normalised failure handed back to callers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiError {
    pub message: String,
    pub status: Option<u16>, // None when no response arrived
    pub data: Option<Value>,
}

impl ApiError {
    pub fn is_unauthorized(&self) -> bool {
        self.status == Some(StatusCode::UNAUTHORIZED.as_u16())
    }

    fn transport(err: reqwest::Error) -> Self {
        Self {
            message: err.to_string(),
            status: err.status().map(|s| s.as_u16()),
            data: None,
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(status) => write!(f, "{} (HTTP {})", self.message, status),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for ApiError {}

/// Build an `ApiError` from a failed response
pub fn normalize_error(status: StatusCode, body: Value) -> ApiError {
    let message = ["message", "error"]
        .iter()
        .find_map(|k| body.get(k).and_then(Value::as_str))
        .map(str::to_string)
        .or_else(|| body.as_str().filter(|s| !s.trim().is_empty()).map(str::to_string))
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string()
        });

    ApiError {
        message,
        status: Some(status.as_u16()),
        data: if body.is_null() { None } else { Some(body) },
    }
}

/// Role the response reports for the current user, if any
pub fn extract_role(body: &Value) -> Option<Role> {
    ROLE_POINTERS.iter().find_map(|p| {
        body.pointer(p)
            .and_then(Value::as_str)
            .and_then(Role::from_str)
    })
}

pub struct ApiClient {
    http: Client,
    base_url: String,
    session: Arc<AuthSession>,
    auth_prefix: String,
}

impl ApiClient {
    pub fn new(base_url: &str, session: Arc<AuthSession>) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .context("Failed to build API client")?;
        Ok(Self::with_client(http, base_url, session))
    }

    pub fn with_client(http: Client, base_url: &str, session: Arc<AuthSession>) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
            auth_prefix: AUTH_ENDPOINT_PREFIX.to_string(),
        }
    }

    pub fn session(&self) -> &Arc<AuthSession> {
        &self.session
    }

    #[inline]
    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Auth endpoints must work before a token exists
    pub fn is_auth_endpoint(&self, path: &str) -> bool {
        let path = path.strip_prefix('/').unwrap_or(path);
        let prefix = self.auth_prefix.trim_start_matches('/');
        is_within(&format!("/{}", path), &format!("/{}", prefix))
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send(Method::GET, path, None).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send(Method::DELETE, path, None).await
    }

    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send(Method::POST, path, Some(to_value(body)?)).await
    }

    pub async fn put<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send(Method::PUT, path, Some(to_value(body)?)).await
    }

    pub async fn patch<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send(Method::PATCH, path, Some(to_value(body)?)).await
    }

    /// One intercepted round trip
    pub async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<T, ApiError> {
        let auth_call = self.is_auth_endpoint(path);
        let mut req = self.http.request(method.clone(), self.url(path));

        if !auth_call {
            if let Some(token) = self.session.token() {
                req = req.bearer_auth(token);
            }
        }
        if let Some(body) = body {
            req = req.json(&body);
        }

        let resp = req.send().await.map_err(ApiError::transport)?;
        let status = resp.status();
        let bytes = resp.bytes().await.map_err(ApiError::transport)?;
        let payload = parse_body(&bytes);

        debug!(%method, path, status = status.as_u16(), "API call");

        if status.is_success() {
            if let Some(role) = extract_role(&payload) {
                self.session.update_role(role);
            }
            return serde_json::from_value(payload).map_err(|e| ApiError {
                message: format!("Unexpected response body: {}", e),
                status: Some(status.as_u16()),
                data: None,
            });
        }

        if status == StatusCode::UNAUTHORIZED && !auth_call {
            self.handle_unauthorized(path);
        }

        Err(normalize_error(status, payload))
    }

    /// Server rejected our token: forget it and send the user to sign-in,
    /// unless they are already somewhere in the auth flow.
    fn handle_unauthorized(&self, path: &str) {
        warn!(path, "API returned 401, clearing session");
        self.session.clear();

        let navigator = self.session.navigator();
        if !is_within(&navigator.current_path(), AUTHENTICATION_ROOT) {
            navigator.navigate(&self.session.routes().sign_in_path, NavigationKind::Reload);
        }
    }
}

fn to_value<B: Serialize + ?Sized>(body: &B) -> Result<Value, ApiError> {
    serde_json::to_value(body).map_err(|e| ApiError {
        message: format!("Failed to encode request body: {}", e),
        status: None,
        data: None,
    })
}

fn parse_body(bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}
