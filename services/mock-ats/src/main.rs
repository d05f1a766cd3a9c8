//! Mock ATS server
//!
//! Serves the Ashby-style wire contract from memory so the gateway can be run
//! end to end without live credentials.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mock_ats::{MOCK_API_KEY, MockStore, build_router};

const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8000";

/// Listen address: `--listen` > MOCK_ATS_LISTEN_ADDR > default.
fn resolve_listen_addr(cli: Option<&str>) -> Result<SocketAddr> {
    let raw = cli
        .map(str::to_string)
        .or_else(|| std::env::var("MOCK_ATS_LISTEN_ADDR").ok())
        .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string());
    raw.parse()
        .with_context(|| format!("invalid listen address '{raw}'"))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let args: Vec<String> = std::env::args().collect();
    let cli_listen = args
        .iter()
        .position(|a| a == "--listen")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str());
    let listen_addr = resolve_listen_addr(cli_listen)?;

    let api_key = std::env::var("MOCK_ATS_API_KEY").unwrap_or_else(|_| MOCK_API_KEY.to_string());
    let store = Arc::new(MockStore::new(&api_key));
    info!(jobs = store.jobs().len(), "mock store seeded");

    let listener = TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("failed to bind to {listen_addr}"))?;
    info!(addr = %listen_addr, "mock ATS listening");

    axum::serve(listener, build_router(store))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("mock server failed")?;

    info!("mock ATS stopped");
    Ok(())
}

/// Wait for SIGTERM or SIGINT.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_listen_addr_wins() {
        let addr = resolve_listen_addr(Some("0.0.0.0:9100")).unwrap();
        assert_eq!(addr.port(), 9100);
    }

    #[test]
    fn bad_listen_addr_is_error() {
        let err = resolve_listen_addr(Some("localhost")).unwrap_err();
        assert!(err.to_string().contains("invalid listen address"));
    }
}
