//! Route definitions.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers;
use super::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/apidocs", get(handlers::api_docs))
        .route("/terms", get(handlers::terms))
        .route("/health", get(handlers::health))
        .route("/v1/kelly_criterion", post(handlers::kelly_criterion))
        .with_state(state)
}
