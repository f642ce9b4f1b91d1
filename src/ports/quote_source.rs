//! Quote Source Port
//!
//! Supplies the historical price series of one security over a date range.
//! Any provider can sit behind this trait, including the in-memory
//! `StaticQuoteSource` used by tests.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{DateRange, PriceSeries, SecurityId};

/// Provider failure. The pipeline records every variant as `DataUnavailable`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QuoteSourceError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Provider returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Provider error {code}: {description}")]
    Provider { code: String, description: String },

    #[error("Unknown symbol: {0}")]
    UnknownSymbol(String),

    #[error("Malformed provider response: {0}")]
    Parse(String),
}

/// Historical quote provider.
///
/// A successful fetch may return fewer than 2 observations when the window
/// holds too little history; that is not an error at this layer.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Short provider name for logs and health output
    fn name(&self) -> &'static str;

    /// Fetch observations for `security` with dates inside `range`
    async fn fetch(
        &self,
        security: &SecurityId,
        range: &DateRange,
    ) -> Result<PriceSeries, QuoteSourceError>;
}
