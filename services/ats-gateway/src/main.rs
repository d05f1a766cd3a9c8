//! ATS Gateway
//!
//! Single-binary service that exposes one canonical jobs / candidates /
//! applications API in front of whichever Applicant Tracking System is
//! configured:
//! 1. Loads config and selects the adapter (Ashby-style or Zoho Recruit)
//! 2. For Zoho, exchanges the refresh token once at startup
//! 3. Serves `/jobs`, `/candidates`, `/applications`, `/health`, `/metrics`

mod config;
mod error;
mod handler;
mod metrics;
mod zoho;

use anyhow::{Context, Result};
use axum::Router;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tracing::{Instrument, error, info, info_span, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ats_provider::{AshbyConfig, AshbyProvider, AtsProvider};
use metrics_exporter_prometheus::PrometheusHandle;
use zoho_auth::RefreshCredentials;

use crate::config::{Config, ProviderKind};
use crate::handler::HandlerResponse;
use crate::zoho::{ZohoConfig, ZohoProvider};

/// How long in-flight requests may run after a shutdown signal.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Request counters reported by `/health`
#[derive(Clone)]
struct RequestCounters {
    requests_total: Arc<AtomicU64>,
    errors_total: Arc<AtomicU64>,
    started_at: Instant,
}

impl RequestCounters {
    fn new() -> Self {
        Self {
            requests_total: Arc::new(AtomicU64::new(0)),
            errors_total: Arc::new(AtomicU64::new(0)),
            started_at: Instant::now(),
        }
    }

    fn observe(&self, response: &HandlerResponse) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        if response.status_code >= 400 {
            self.errors_total.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Shared application state accessible from all handlers
#[derive(Clone)]
struct AppState {
    provider: Arc<dyn AtsProvider>,
    counters: RequestCounters,
    prometheus: PrometheusHandle,
}

/// Build the axum router with all routes and shared state.
///
/// `max_connections` caps concurrently processed requests.
fn build_router(state: AppState, max_connections: usize) -> Router {
    Router::new()
        .route("/jobs", get(jobs_handler))
        .route("/candidates", post(candidates_handler))
        .route("/applications", get(applications_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .layer(tower::limit::ConcurrencyLimitLayer::new(max_connections))
        .with_state(state)
}

/// Construct the configured adapter.
///
/// Zoho construction performs the token exchange; its failure is logged and
/// the adapter still starts with the placeholder token.
async fn build_provider(config: &Config, client: reqwest::Client) -> Result<Arc<dyn AtsProvider>> {
    let provider: Arc<dyn AtsProvider> = match config.ats.provider {
        ProviderKind::Ashby => Arc::new(
            AshbyProvider::new(
                client,
                AshbyConfig {
                    base_url: config.ats.ashby_base_url().to_string(),
                    api_key: config.ats.api_key.clone(),
                    job_board_name: config.ats.job_board_name.clone(),
                    association_policy: config.ats.association_policy,
                },
            )
            .context("failed to build Ashby adapter")?,
        ),
        ProviderKind::Zoho => {
            let zoho = &config.zoho;
            let base_url = config
                .ats
                .base_url
                .clone()
                .unwrap_or_else(|| zoho.data_center.recruit_api_url());
            let credentials = RefreshCredentials::from_parts(
                zoho.client_id.clone(),
                zoho.client_secret.clone(),
                zoho.refresh_token.clone(),
            );
            Arc::new(
                ZohoProvider::connect(
                    client,
                    ZohoConfig {
                        base_url,
                        token_url: zoho.token_url(),
                        credentials,
                        association_policy: config.ats.association_policy,
                    },
                )
                .await
                .context("failed to build Zoho adapter")?,
            )
        }
    };
    Ok(provider)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("starting ats-gateway");

    // Install Prometheus metrics recorder before any metrics are emitted
    let prometheus_handle = metrics::install_recorder();

    // CLI: simple --config flag parsing
    let args: Vec<String> = std::env::args().collect();
    let cli_config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str());

    let (config_path, explicit) = Config::resolve_path(cli_config_path);
    info!(path = %config_path.display(), explicit, "loading configuration");

    let config = Config::load_or_default(&config_path, explicit)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    info!(
        listen_addr = %config.server.listen_addr,
        provider = %config.ats.provider,
        association_policy = ?config.ats.association_policy,
        "configuration loaded"
    );

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.server.upstream_timeout_secs))
        .build()
        .context("failed to build HTTP client")?;

    let provider = build_provider(&config, client).await?;
    info!(provider = provider.id(), "adapter ready");

    let app_state = AppState {
        provider,
        counters: RequestCounters::new(),
        prometheus: prometheus_handle,
    };

    let app = build_router(app_state, config.server.max_connections);

    let listen_addr = config.server.listen_addr;
    let listener = TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("failed to bind to {listen_addr}"))?;
    info!(addr = %listen_addr, "accepting requests");

    // The drain timeout starts when the shutdown signal fires, not when the
    // server starts.
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
    });

    shutdown_signal().await;
    let _ = shutdown_tx.send(());

    match tokio::time::timeout(DRAIN_TIMEOUT, server_handle).await {
        Ok(Ok(Ok(()))) => info!("all in-flight requests drained"),
        Ok(Ok(Err(e))) => error!(error = %e, "server error during shutdown"),
        Ok(Err(e)) => error!(error = %e, "server task panicked"),
        Err(_) => warn!(
            drain_timeout_secs = DRAIN_TIMEOUT.as_secs(),
            "drain timeout exceeded, forcing shutdown"
        ),
    }

    info!("shutdown complete");
    Ok(())
}

fn request_span(route: &'static str) -> tracing::Span {
    let request_id = format!("req_{}", uuid::Uuid::new_v4().as_simple());
    info_span!("request", route, request_id = %request_id)
}

async fn jobs_handler(State(state): State<AppState>) -> Response {
    let response = handler::get_jobs(state.provider.as_ref())
        .instrument(request_span("/jobs"))
        .await;
    state.counters.observe(&response);
    response.into_response()
}

async fn candidates_handler(State(state): State<AppState>, body: Bytes) -> Response {
    let text = String::from_utf8_lossy(&body);
    let response = handler::create_candidate(state.provider.as_ref(), Some(text.as_ref()))
        .instrument(request_span("/candidates"))
        .await;
    state.counters.observe(&response);
    response.into_response()
}

async fn applications_handler(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let response = handler::get_applications(state.provider.as_ref(), &query)
        .instrument(request_span("/applications"))
        .await;
    state.counters.observe(&response);
    response.into_response()
}

/// Liveness plus the active adapter and request counters.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let counters = &state.counters;
    axum::Json(serde_json::json!({
        "status": "healthy",
        "provider": state.provider.id(),
        "uptime_seconds": counters.started_at.elapsed().as_secs(),
        "requests_served": counters.requests_total.load(Ordering::Relaxed),
        "errors_total": counters.errors_total.load(Ordering::Relaxed),
    }))
}

/// Prometheus metrics endpoint, text exposition format.
async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        axum::http::StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        state.prometheus.render(),
    )
}

/// Wait for SIGTERM or SIGINT for graceful shutdown.
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
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use mock_ats::{MOCK_API_KEY, MockStore};
    use tower::ServiceExt;

    /// Start the mock ATS on an ephemeral port.
    async fn start_mock_ats() -> (String, Arc<MockStore>) {
        let store = Arc::new(MockStore::new(MOCK_API_KEY));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = mock_ats::build_router(store.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}"), store)
    }

    async fn test_app(base_url: &str) -> Router {
        let mut config = Config::default();
        config.ats.base_url = Some(base_url.to_string());
        let provider = build_provider(&config, reqwest::Client::new())
            .await
            .unwrap();
        let state = AppState {
            provider,
            counters: RequestCounters::new(),
            prometheus: metrics::detached_handle(),
        };
        build_router(state, 16)
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, body)
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_candidate(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/candidates")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn end_to_end_through_mock_ats() {
        let (url, store) = start_mock_ats().await;
        let app = test_app(&url).await;

        let (status, jobs) = send(&app, get_request("/jobs")).await;
        assert_eq!(status, StatusCode::OK);
        let jobs = jobs.as_array().unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0]["id"], "job_001");
        assert_eq!(jobs[0]["title"], "Software Engineer");
        assert_eq!(jobs[0]["location"], "Remote");
        assert_eq!(jobs[0]["status"], "OPEN");

        let (status, created) = send(
            &app,
            post_candidate(
                r#"{"name":"Ada Lovelace","email":"ada@example.com","job_id":"job_001"}"#,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["status"], "success");
        assert!(!created["candidate_id"].as_str().unwrap().is_empty());
        assert_eq!(store.application_count().await, 1);

        let (status, apps) = send(&app, get_request("/applications?job_id=job_001")).await;
        assert_eq!(status, StatusCode::OK);
        let apps = apps.as_array().unwrap();
        assert_eq!(apps.len(), 1);
        assert_eq!(apps[0]["candidate_name"], "Test Candidate");
        assert_eq!(apps[0]["email"], "test@example.com");
        assert_eq!(apps[0]["status"], "APPLIED");

        let (status, apps) = send(&app, get_request("/applications?job_id=job_002")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(apps, serde_json::json!([]));
    }

    #[tokio::test]
    async fn wrong_api_key_surfaces_as_500() {
        let (url, _store) = start_mock_ats().await;
        let mut config = Config::default();
        config.ats.base_url = Some(url);
        config.ats.api_key = common::Secret::from("wrong-key");
        let provider = build_provider(&config, reqwest::Client::new())
            .await
            .unwrap();
        let app = build_router(
            AppState {
                provider,
                counters: RequestCounters::new(),
                prometheus: metrics::detached_handle(),
            },
            16,
        );

        let (status, body) = send(&app, get_request("/jobs")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().contains("401"));
    }

    #[tokio::test]
    async fn unreachable_upstream_is_500_not_panic() {
        let app = test_app("http://127.0.0.1:1").await;
        let (status, body) = send(&app, get_request("/jobs")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn validation_errors_never_reach_upstream() {
        let (url, store) = start_mock_ats().await;
        let app = test_app(&url).await;

        let (status, body) = send(&app, post_candidate("{broken")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, serde_json::json!({"error": "Invalid JSON"}));

        let (status, body) = send(&app, post_candidate(r#"{"email":"a@b.com"}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("job_id"));

        let (status, body) = send(&app, get_request("/applications")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            serde_json::json!({"error": "job_id query parameter is required"})
        );

        assert_eq!(store.application_count().await, 0);
    }

    #[tokio::test]
    async fn health_reports_provider_and_counts() {
        let app = test_app("http://127.0.0.1:1").await;
        let _ = send(&app, get_request("/applications")).await;

        let (status, body) = send(&app, get_request("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["provider"], "ashby");
        assert_eq!(body["requests_served"], 1);
        assert_eq!(body["errors_total"], 1);
    }

    #[tokio::test]
    async fn metrics_endpoint_serves_text() {
        let app = test_app("http://127.0.0.1:1").await;
        let response = app.oneshot(get_request("/metrics")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "text/plain; version=0.0.4; charset=utf-8"
        );
    }

    #[tokio::test]
    async fn zoho_provider_starts_with_placeholder_when_unconfigured() {
        let mut config = Config::default();
        config.ats.provider = ProviderKind::Zoho;
        config.ats.base_url = Some("http://127.0.0.1:1/recruit/v2".into());
        config.zoho.accounts_url = Some("http://127.0.0.1:1/oauth/v2/token".into());

        let provider = build_provider(&config, reqwest::Client::new())
            .await
            .unwrap();
        assert_eq!(provider.id(), "zoho");
        assert!(provider.fetch_jobs().await.is_err());
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let app = test_app("http://127.0.0.1:1").await;
        let response = app.oneshot(get_request("/nope")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
