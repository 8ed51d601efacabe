//! Upstream Forwarding
//! Mission: Hand requests the gate allowed to the web application unchanged
//!
//! Response bodies are relayed as they arrive, so streamed pages and event
//! streams pass through. Only connecting and waiting for the response head
//! are bounded by the upstream timeout.

use anyhow::{Context, Result};
use axum::{
    body::{to_bytes, Body},
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Largest request body forwarded upstream
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Headers that describe a single hop and must not be forwarded
const HOP_BY_HOP: [&str; 10] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "host",
    "content-length",
];

const X_FORWARDED_FOR: &str = "x-forwarded-for";
const X_FORWARDED_HOST: &str = "x-forwarded-host";
const X_FORWARDED_PROTO: &str = "x-forwarded-proto";

/// The web application behind the gate
#[derive(Clone)]
pub struct Upstream {
    client: reqwest::Client,
    base_url: String,
    head_timeout: Duration,
}

impl Upstream {
    /// `timeout` bounds connecting and receiving the response head, never the
    /// body transfer.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .pool_max_idle_per_host(32)
            .build()
            .context("Failed to build upstream HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            head_timeout: timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path_and_query: &str) -> String {
        format!("{}{}", self.base_url, path_and_query)
    }
}

fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP.iter().any(|h| name.eq_ignore_ascii_case(h))
}

/// Header names listed in `Connection`; they are hop-by-hop as well
fn connection_tokens<'a>(values: impl Iterator<Item = &'a [u8]>) -> Vec<String> {
    values
        .filter_map(|v| std::str::from_utf8(v).ok())
        .flat_map(|v| v.split(','))
        .map(|t| t.trim().to_ascii_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

fn is_forwardable(name: &str, listed: &[String]) -> bool {
    !is_hop_by_hop(name) && !listed.iter().any(|l| name.eq_ignore_ascii_case(l))
}

/// Headers for the upstream request, with the `X-Forwarded-*` set filled in
fn request_headers(incoming: &HeaderMap, client: Option<IpAddr>) -> reqwest::header::HeaderMap {
    let listed = connection_tokens(
        incoming
            .get_all(header::CONNECTION)
            .iter()
            .map(|v| v.as_bytes()),
    );

    let mut out = reqwest::header::HeaderMap::new();
    for (name, value) in incoming.iter() {
        if !is_forwardable(name.as_str(), &listed) || name.as_str() == X_FORWARDED_FOR {
            continue;
        }
        if let (Ok(n), Ok(v)) = (
            reqwest::header::HeaderName::from_bytes(name.as_str().as_bytes()),
            reqwest::header::HeaderValue::from_bytes(value.as_bytes()),
        ) {
            out.append(n, v);
        }
    }

    let mut chain: Vec<String> = incoming
        .get_all(X_FORWARDED_FOR)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(str::to_string)
        .collect();
    if let Some(ip) = client {
        chain.push(ip.to_string());
    }
    if !chain.is_empty() {
        if let Ok(v) = reqwest::header::HeaderValue::from_str(&chain.join(", ")) {
            out.insert(
                reqwest::header::HeaderName::from_static(X_FORWARDED_FOR),
                v,
            );
        }
    }

    if !incoming.contains_key(X_FORWARDED_HOST) {
        if let Some(host) = incoming.get(header::HOST) {
            if let Ok(v) = reqwest::header::HeaderValue::from_bytes(host.as_bytes()) {
                out.insert(
                    reqwest::header::HeaderName::from_static(X_FORWARDED_HOST),
                    v,
                );
            }
        }
    }

    if !incoming.contains_key(X_FORWARDED_PROTO) {
        out.insert(
            reqwest::header::HeaderName::from_static(X_FORWARDED_PROTO),
            reqwest::header::HeaderValue::from_static("http"),
        );
    }

    out
}

/// Upstream response headers minus the hop-by-hop ones
fn response_headers(upstream: &reqwest::header::HeaderMap) -> HeaderMap {
    let listed = connection_tokens(
        upstream
            .get_all(reqwest::header::CONNECTION)
            .iter()
            .map(|v| v.as_bytes()),
    );

    let mut out = HeaderMap::new();
    for (name, value) in upstream.iter() {
        if !is_forwardable(name.as_str(), &listed) {
            continue;
        }
        if let (Ok(n), Ok(v)) = (
            HeaderName::from_bytes(name.as_str().as_bytes()),
            HeaderValue::from_bytes(value.as_bytes()),
        ) {
            out.append(n, v);
        }
    }
    out
}

/// Forward the request and relay the upstream response
pub async fn forward(
    State(upstream): State<Arc<Upstream>>,
    req: Request,
) -> Result<Response, ProxyError> {
    let (parts, body) = req.into_parts();
    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());

    let method = reqwest::Method::from_bytes(parts.method.as_str().as_bytes())
        .map_err(|_| ProxyError::UnsupportedMethod)?;
    let client_ip = parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());
    let headers = request_headers(&parts.headers, client_ip);
    let body = to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|_| ProxyError::BodyTooLarge)?;

    let pending = upstream
        .client
        .request(method, upstream.url(&path_and_query))
        .headers(headers)
        .body(body)
        .send();

    let resp = match tokio::time::timeout(upstream.head_timeout, pending).await {
        Ok(Ok(resp)) => resp,
        Ok(Err(e)) => {
            warn!(path = %path_and_query, "Upstream request failed: {}", e);
            return Err(ProxyError::UpstreamUnavailable);
        }
        Err(_) => {
            warn!(
                path = %path_and_query,
                timeout_ms = upstream.head_timeout.as_millis(),
                "Upstream did not answer in time"
            );
            return Err(ProxyError::UpstreamUnavailable);
        }
    };

    let status =
        StatusCode::from_u16(resp.status().as_u16()).map_err(|_| ProxyError::BadUpstreamResponse)?;
    let out_headers = response_headers(resp.headers());

    Ok((status, out_headers, Body::from_stream(resp.bytes_stream())).into_response())
}

/// Proxy error types
#[derive(Debug)]
pub enum ProxyError {
    UnsupportedMethod,
    BodyTooLarge,
    UpstreamUnavailable,
    BadUpstreamResponse,
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ProxyError::UnsupportedMethod => {
                (StatusCode::METHOD_NOT_ALLOWED, "Unsupported HTTP method")
            }
            ProxyError::BodyTooLarge => (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large"),
            ProxyError::UpstreamUnavailable => {
                (StatusCode::BAD_GATEWAY, "Web application unavailable")
            }
            ProxyError::BadUpstreamResponse => {
                (StatusCode::BAD_GATEWAY, "Invalid response from web application")
            }
        };

        (status, message).into_response()
    }
}
