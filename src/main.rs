//! Booking Gate - edge authentication gate for the booking marketplace
//! Mission: Keep anonymous callers out of protected pages, and signed-in
//! callers off the landing page

use anyhow::Result;
use booking_gate::{config::GateConfig, server};
use clap::Parser;
use std::net::SocketAddr;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "booking-gate", about = "Edge authentication gate")]
struct Args {
    /// Address to listen on (overrides GATE_BIND_ADDR)
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// Web application to forward allowed requests to (overrides GATE_UPSTREAM_URL)
    #[arg(long)]
    upstream: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = GateConfig::from_env()?;
    init_tracing();

    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if let Some(upstream) = args.upstream {
        config.upstream_url = upstream.trim_end_matches('/').to_string();
    }

    info!("🚀 Booking gate starting");

    server::serve(config).await
}

/// Initialize tracing
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "booking_gate=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
