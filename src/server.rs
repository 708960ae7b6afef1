//! HTTP API surface
//!
//! Routes:
//!   POST /api/bundles/build   assemble unsigned bundles from branches
//!   POST /api/bundles/submit  submit signed bundles and wait for outcomes
//!   POST /api/quote           single-order quote passthrough
//!   GET  /health              liveness probe

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

use crate::bundle::{classify, BundleAssembler, BundleError, BundleSubmitter, OutcomeAggregator};
use crate::bundle::validate::validate_signed_transactions;
use crate::quote::{OrderParams, QuoteClient};
use crate::types::{
    BuildBundlesRequest, CallClass, CallResult, QuoteRequest, SimulationDetail,
    SubmitBundlesRequest,
};

#[derive(Clone)]
pub struct AppState {
    pub assembler: Arc<BundleAssembler>,
    pub submitter: Arc<BundleSubmitter>,
    pub aggregator: Arc<OutcomeAggregator>,
    pub quotes: QuoteClient,
    pub confirmation_timeout_ms: u64,
}

struct ApiError(BundleError);

impl From<BundleError> for ApiError {
    fn from(err: BundleError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        metrics::counter!("api_errors_total", "category" => self.0.category()).increment(1);
        if status.is_server_error() {
            error!(category = self.0.category(), error = %self.0, "Request failed");
        } else {
            warn!(category = self.0.category(), error = %self.0, "Request rejected");
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/bundles/build", post(build_bundles))
        .route("/api/bundles/submit", post(submit_bundles))
        .route("/api/quote", post(quote_order))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve the API until the process exits
pub async fn serve(port: u16, state: AppState) -> anyhow::Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    info!(port, "API server listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn build_bundles(
    State(state): State<AppState>,
    Json(request): Json<BuildBundlesRequest>,
) -> Result<Response, ApiError> {
    let response = state.assembler.assemble(&request).await?;
    Ok(Json(response).into_response())
}

async fn quote_order(
    State(state): State<AppState>,
    Json(request): Json<QuoteRequest>,
) -> Result<Response, ApiError> {
    let order = state
        .quotes
        .fetch_order(&OrderParams {
            input_mint: &request.input_mint,
            output_mint: &request.output_mint,
            amount: request.amount,
            taker: &request.signer_pubkey,
            slippage_bps: request.slippage_bps,
        })
        .await
        .map_err(|e| BundleError::QuoteUpstream {
            branch: 1,
            swap: 1,
            status: e.status,
            detail: e.detail,
        })?;
    Ok(Json(order).into_response())
}

async fn submit_bundles(
    State(state): State<AppState>,
    Json(request): Json<SubmitBundlesRequest>,
) -> Result<Response, ApiError> {
    if request.bundles.is_empty() {
        return Err(BundleError::invalid_input("bundles must not be empty").into());
    }
    for (i, bundle) in request.bundles.iter().enumerate() {
        if bundle.is_empty() {
            return Err(BundleError::bad_branch(i + 1, "bundle contains no transactions").into());
        }
    }

    // One bad transaction rejects the whole call before anything is sent
    let flat: Vec<String> = request.bundles.iter().flatten().cloned().collect();
    validate_signed_transactions(&flat, &request.signer_pubkey)?;

    let outcomes = state.submitter.submit_all(&request.bundles).await;
    let result = classify(outcomes);

    match result.classification() {
        CallClass::Success => {
            metrics::counter!("submit_calls_total", "outcome" => "success").increment(1);
            Ok(Json(success_body(&result)).into_response())
        }
        CallClass::Retryable => {
            metrics::counter!("submit_calls_total", "outcome" => "timeout").increment(1);
            Ok((
                StatusCode::REQUEST_TIMEOUT,
                Json(timeout_body(&result, state.confirmation_timeout_ms)),
            )
                .into_response())
        }
        CallClass::HardFailure => {
            metrics::counter!("submit_calls_total", "outcome" => "failure").increment(1);
            let simulations = state
                .aggregator
                .simulate_failed(&request.bundles, &result)
                .await;
            Ok((
                StatusCode::BAD_REQUEST,
                Json(failure_body(&result, &simulations)),
            )
                .into_response())
        }
    }
}

fn success_body(result: &CallResult) -> serde_json::Value {
    json!({
        "success": true,
        "totalBundles": result.total_bundles(),
        "results": result.successful_bundles,
    })
}

fn timeout_body(result: &CallResult, timeout_ms: u64) -> serde_json::Value {
    json!({
        "error": "One or more bundles did not reach a terminal status in time",
        "timeoutBundles": result.timeout_bundles,
        "failedBundles": result.failed_bundles,
        "successfulBundles": result.successful_bundles,
        "timeoutMs": timeout_ms,
        "note": "Timed-out bundles may still land on-chain; verify before resubmitting",
    })
}

fn failure_body(result: &CallResult, simulations: &[SimulationDetail]) -> serde_json::Value {
    json!({
        "error": "One or more bundles failed",
        "failedBundles": result.failed_bundles,
        "successfulBundles": result.successful_bundles,
        "simulations": simulations,
    })
}
