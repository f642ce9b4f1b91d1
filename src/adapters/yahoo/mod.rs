//! Yahoo Finance Adapter
//!
//! Daily price history from the Yahoo Finance chart API.

mod client;

pub use client::{parse_chart, YahooConfig, YahooQuoteSource};
