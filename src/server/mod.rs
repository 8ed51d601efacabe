//! Gate server: the edge gate mounted in front of the web application.

pub mod proxy;

use crate::auth::{gate_middleware, EdgeGate};
use crate::config::GateConfig;
use crate::middleware::request_logging;
use anyhow::{Context, Result};
use axum::{middleware, routing::get, Json, Router};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

pub use proxy::Upstream;

/// Build the full app.
///
/// `/health` answers directly; every other path runs through the gate and,
/// when allowed, is forwarded to `upstream`.
pub fn build_router(edge: Arc<EdgeGate>, upstream: Arc<Upstream>) -> Router {
    let gated = Router::new()
        .fallback(proxy::forward)
        .layer(middleware::from_fn_with_state(edge, gate_middleware))
        .with_state(upstream);

    Router::new()
        .route("/health", get(health_check))
        .fallback_service(gated)
        .layer(middleware::from_fn(request_logging))
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Bind and serve until the process is stopped
pub async fn serve(config: GateConfig) -> Result<()> {
    let edge = Arc::new(EdgeGate::new(config.gate(), config.token_cookie.clone()));
    let upstream = Arc::new(Upstream::new(&config.upstream_url, config.upstream_timeout)?);

    if !edge.gate.decoder().verifies_signature() {
        info!("Token signatures are not verified at the gate (no GATE_JWT_SECRET)");
    }

    let app = build_router(edge, upstream);

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    info!(
        "🛡️  Gate listening on {} → {}",
        config.bind_addr, config.upstream_url
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("Server error")?;

    Ok(())
}
