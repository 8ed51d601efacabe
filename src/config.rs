//! Gate configuration, read from the environment (and `.env` files).

use crate::auth::{middleware::DEFAULT_TOKEN_COOKIE, Gate, RouteTable, TokenDecoder};
use anyhow::{Context, Result};
use dotenv::dotenv;
use std::env;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct GateConfig {
    pub bind_addr: SocketAddr,
    pub upstream_url: String,
    pub token_cookie: String,
    pub api_prefix: String,
    pub jwt_secret: Option<String>,
    pub upstream_timeout: Duration,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            upstream_url: "http://127.0.0.1:3001".to_string(),
            token_cookie: DEFAULT_TOKEN_COOKIE.to_string(),
            api_prefix: "/api".to_string(),
            jwt_secret: None,
            upstream_timeout: Duration::from_secs(30),
        }
    }
}

impl GateConfig {
    pub fn from_env() -> Result<Self> {
        load_env();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; blank values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let bind_addr = match get("GATE_BIND_ADDR") {
            Some(v) => v
                .trim()
                .parse()
                .with_context(|| format!("Invalid GATE_BIND_ADDR: {}", v))?,
            None => defaults.bind_addr,
        };

        let upstream_url = get("GATE_UPSTREAM_URL")
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .unwrap_or(defaults.upstream_url);

        let upstream_timeout = match get("GATE_UPSTREAM_TIMEOUT_SECS") {
            Some(v) => Duration::from_secs(
                v.trim()
                    .parse::<u64>()
                    .with_context(|| format!("Invalid GATE_UPSTREAM_TIMEOUT_SECS: {}", v))?,
            ),
            None => defaults.upstream_timeout,
        };

        Ok(Self {
            bind_addr,
            upstream_url,
            token_cookie: get("GATE_TOKEN_COOKIE").unwrap_or(defaults.token_cookie),
            api_prefix: get("GATE_API_PREFIX").unwrap_or(defaults.api_prefix),
            jwt_secret: get("GATE_JWT_SECRET"),
            upstream_timeout,
        })
    }

    pub fn decoder(&self) -> TokenDecoder {
        match &self.jwt_secret {
            Some(secret) => TokenDecoder::with_secret(secret),
            None => TokenDecoder::unverified(),
        }
    }

    pub fn gate(&self) -> Gate {
        Gate::new(RouteTable::with_api_prefix(&self.api_prefix), self.decoder())
    }
}

/// Load `.env` from the working directory, then from the crate root
pub fn load_env() {
    let _ = dotenv();

    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    let candidate = manifest_dir.join(".env");
    if candidate.exists() {
        let _ = dotenv::from_path(&candidate);
    }
}
