//! Ports Layer - Trait definitions for external dependencies
//!
//! This module defines the interfaces (ports) that adapters must implement.
//! Following hexagonal architecture, the estimation core only sees:
//! - Historical quote sources (daily price history per security)

pub mod quote_source;
pub mod mocks;

pub use quote_source::{QuoteSource, QuoteSourceError};
pub use mocks::StaticQuoteSource;

#[cfg(test)]
pub use quote_source::MockQuoteSource;
