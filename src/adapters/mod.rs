//! Adapters Layer - External System Implementations
//!
//! This module contains implementations of the port traits and the
//! boundaries driving the service:
//! - Yahoo: historical daily quotes over the chart API
//! - HTTP: axum server exposing the leverage endpoint
//! - CLI: Command-line interface handlers

pub mod yahoo;
pub mod http;
pub mod cli;

pub use yahoo::YahooQuoteSource;
pub use http::{create_router, AppState, HttpServer};
pub use cli::CliApp;
