//! HTTP Adapter
//!
//! axum boundary exposing the leverage service:
//! - `POST /v1/kelly_criterion`
//! - `GET /` (redirect to `/apidocs`), `/apidocs`, `/terms`, `/health`

mod docs;
mod error;
mod handlers;
mod routes;
mod server;
mod state;

pub use docs::openapi_document;
pub use error::{ApiError, ApiResult, ErrorResponse};
pub use handlers::HealthResponse;
pub use routes::create_router;
pub use server::{shutdown_signal, HttpServer};
pub use state::{load_terms, AppState, DEFAULT_TERMS};
