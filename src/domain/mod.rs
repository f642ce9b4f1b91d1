//! Domain Layer - Core leverage estimation logic
//!
//! Pure types and functions with no I/O. External interactions happen
//! through the ports layer.
//!
//! - `request`: RequestValidator (dates, securities, risk-free rate)
//! - `series`: PriceSeries, ReturnSeries and the return builder
//! - `leverage`: LeverageEstimator (Kelly formula)
//! - `outcome`: per-security outcomes and the aggregated result

pub mod request;
pub mod series;
pub mod leverage;
pub mod outcome;

pub use request::{
    validate_request, DateRange, RawRequest, RequestError, RequestParameters, RequestValidator,
    SecurityId, DATE_FORMAT, DEFAULT_RISK_FREE_RATE,
};
pub use series::{build_returns, PricePoint, PriceSeries, ReturnSeries, SeriesError};
pub use leverage::{
    EstimateError, LeverageEstimate, LeverageEstimator, RiskFreeConvention, MIN_RETURNS,
};
pub use outcome::{Failure, FailureKind, LeverageOutcome, LeverageResponse, LeverageResult, Stage};
