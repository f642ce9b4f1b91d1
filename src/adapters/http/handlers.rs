//! Request handlers.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::header,
    response::{IntoResponse, Redirect},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::domain::{LeverageResponse, RawRequest};

use super::error::ApiResult;
use super::state::AppState;

/// POST /v1/kelly_criterion
///
/// Dropping this future (client disconnect) aborts the in-flight fetches.
pub async fn kelly_criterion(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RawRequest>, JsonRejection>,
) -> ApiResult<Json<LeverageResponse>> {
    let Json(raw) = payload?;
    let result = state.service.compute(&raw).await?;

    info!(
        securities = result.len(),
        succeeded = result.success_count(),
        "kelly request complete"
    );

    Ok(Json(result.to_response()))
}

/// GET /
pub async fn index() -> Redirect {
    Redirect::to("/apidocs")
}

/// GET /apidocs
pub async fn api_docs(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(state.api_docs.clone())
}

/// GET /terms
pub async fn terms(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        state.terms.clone(),
    )
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// Name of the configured quote source
    pub quote_source: &'static str,
}

/// GET /health
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        quote_source: state.service.source_name(),
    })
}
