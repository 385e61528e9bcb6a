//! Optimizer endpoints: `/greedy`, `/budget`, `/generate`.
//!
//! Each handler moves the parsed request onto the blocking pool, runs the
//! matching `api` handler against the configured limits, and maps the
//! outcome to JSON. Errors become `{"error": ..., "kind": ...}` with 400 for
//! bad input, 422 for constraints no ticket can satisfy and 500 otherwise.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, warn};

use super::AppState;
use crate::api::{self, BudgetRequest, GenerateRequest, GreedyRequest};
use crate::config::OptimizerConfig;
use crate::error::OptimizerError;

impl IntoResponse for OptimizerError {
    fn into_response(self) -> Response {
        let status = match &self {
            OptimizerError::ConstraintUnsatisfiable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            OptimizerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        };
        (
            status,
            Json(serde_json::json!({"error": self.to_string(), "kind": self.kind()})),
        )
            .into_response()
    }
}

/// Run one optimizer call on the blocking pool with metrics and logging.
async fn run_blocking<Req, Resp>(
    state: Arc<AppState>,
    endpoint: &'static str,
    mode: &'static str,
    req: Req,
    handler: fn(&Req, &OptimizerConfig) -> Result<Resp, OptimizerError>,
    tickets: fn(&Resp) -> usize,
) -> Response
where
    Req: Send + 'static,
    Resp: Serialize + Send + 'static,
{
    state.metrics.record_run(endpoint, mode);
    let started = Instant::now();
    let worker_state = Arc::clone(&state);
    let joined =
        tokio::task::spawn_blocking(move || handler(&req, &worker_state.config.optimizer)).await;

    let outcome = joined.unwrap_or_else(|e| {
        error!(endpoint, error = %e, "optimizer task failed");
        Err(OptimizerError::Internal(format!("optimizer task failed: {}", e)))
    });
    match outcome {
        Ok(resp) => {
            state
                .metrics
                .record_success(endpoint, started.elapsed().as_secs_f64(), tickets(&resp));
            Json(resp).into_response()
        }
        Err(e) => {
            state.metrics.record_failure(endpoint, e.kind());
            if e.is_client_error() {
                warn!(endpoint, kind = e.kind(), error = %e, "request rejected");
            } else {
                error!(endpoint, error = %e, "optimizer failed");
            }
            e.into_response()
        }
    }
}

pub(super) async fn handler_greedy(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GreedyRequest>,
) -> Response {
    let mode = req.mode.map_or("auto", |m| m.as_str());
    run_blocking(state, "greedy", mode, req, api::handle_greedy, |r| r.system_size).await
}

pub(super) async fn handler_budget(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BudgetRequest>,
) -> Response {
    let mode = req.mode.as_str();
    run_blocking(state, "budget", mode, req, api::handle_budget, |r| r.system_size).await
}

pub(super) async fn handler_generate(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GenerateRequest>,
) -> Response {
    run_blocking(state, "generate", "enumerate", req, api::handle_generate, |r| r.count).await
}
