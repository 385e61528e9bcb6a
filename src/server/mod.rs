//! # Server — HTTP Front End for the Optimizer
//!
//! Runs an Axum HTTP server exposing the optimizer endpoints consumed by the
//! browser frontend, plus health and Prometheus endpoints.
//!
//! | Endpoint | Handler |
//! |----------|---------|
//! | `POST /greedy` | coverage-maximizing system |
//! | `POST /budget` | system capped by ticket count or money |
//! | `POST /generate` | constraint-only enumeration |
//! | `GET /` | service status |
//! | `GET /healthz`, `GET /readyz`, `GET /metrics` | probes and scraping |
//!
//! Optimizer work runs on tokio's blocking pool (and rayon inside hybrid
//! runs), never on the async executor. No state is shared between requests
//! besides the metrics registry.

mod routes_health;
mod routes_optimize;

use anyhow::Result;
use axum::extract::{MatchedPath, Request};
use axum::http::{HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, Instrument};

use crate::config::ServiceConfig;
use crate::prom_metrics;

pub struct AppState {
    pub config: ServiceConfig,
    pub metrics: prom_metrics::Metrics,
}

impl AppState {
    pub fn new(config: ServiceConfig) -> Arc<Self> {
        Arc::new(AppState {
            config,
            metrics: prom_metrics::Metrics::new(),
        })
    }
}

/// Records request latency, propagates or generates an `x-request-id`, and
/// wraps the request in a tracing span.
async fn metrics_middleware(
    axum::extract::State(state): axum::extract::State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> axum::response::Response {
    let request_id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let method = req.method().to_string();
    let raw_path = req.uri().path().to_string();
    // Route templates only; unmatched paths share one label.
    let label_path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let start = std::time::Instant::now();

    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %method,
        path = %raw_path,
    );
    let mut response = next.run(req).instrument(span).await;

    state
        .metrics
        .http_request_duration
        .get_or_create(&prom_metrics::HttpLabel {
            method,
            path: label_path,
        })
        .observe(start.elapsed().as_secs_f64());

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let server = &state.config.server;
    let body_limit = server.body_limit_bytes;
    let timeout = Duration::from_secs(server.request_timeout_secs);

    Router::new()
        .route("/", get(routes_health::handler_index))
        .route("/healthz", get(routes_health::handler_healthz))
        .route("/readyz", get(routes_health::handler_readyz))
        .route("/metrics", get(routes_health::handler_metrics))
        .route("/greedy", post(routes_optimize::handler_greedy))
        .route("/budget", post(routes_optimize::handler_budget))
        .route("/generate", post(routes_optimize::handler_generate))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(CatchPanicLayer::new())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            metrics_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            timeout,
        ))
        .with_state(state)
}

pub async fn run(config: ServiceConfig) -> Result<()> {
    let listener =
        tokio::net::TcpListener::bind((config.server.bind.as_str(), config.server.port)).await?;
    let addr = listener.local_addr()?;
    let state = AppState::new(config);
    let app = build_router(state);

    info!(%addr, "lottocover listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("received SIGINT, shutting down"),
                    _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
                }
            }
            Err(_) => {
                ctrl_c.await.ok();
                info!("received SIGINT, shutting down");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("received SIGINT, shutting down");
    }
}
