//! Kelly Leverage - Kelly criterion leverage service library
//!
//! Computes the Kelly-optimal leverage `f = (m - r) / v` per security from
//! daily simple returns over a requested date range.
//!
//! # Modules
//!
//! - `domain`: Core logic (request validation, return series, estimator, outcomes)
//! - `ports`: Trait abstractions (QuoteSource) and the in-memory test source
//! - `adapters`: External implementations (Yahoo, HTTP, CLI)
//! - `config`: Configuration loading and validation
//! - `application`: Portfolio pipeline and the request-level service

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod config;
pub mod application;

pub use application::{KellyService, PipelineSettings, PortfolioPipeline};
pub use domain::{LeverageOutcome, LeverageResponse, LeverageResult, RawRequest, RequestError};
pub use ports::{QuoteSource, QuoteSourceError};
