//! Request Validation
//!
//! Normalizes and validates the raw parameters of a leverage request before
//! any quote is fetched. A failure here is terminal for the whole request.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Risk-free rate applied when the request omits one
pub const DEFAULT_RISK_FREE_RATE: f64 = 0.04;

/// Calendar date format accepted for `start_date` / `end_date`
pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RequestError {
    #[error("Malformed {field}: '{value}' is not a YYYY-MM-DD date")]
    MalformedDate { field: &'static str, value: String },

    #[error("Invalid date range: start_date {start} must be before end_date {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("Security list is empty")]
    EmptySecurityList,

    #[error("Invalid security identifier at position {index}: '{value}'")]
    InvalidSecurityIdentifier { index: usize, value: String },

    #[error("Invalid risk free rate: {0}")]
    InvalidRiskFreeRate(f64),
}

/// Request body exactly as received at the boundary
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawRequest {
    /// Start of the sampling period (YYYY-MM-DD)
    pub start_date: String,
    /// End of the sampling period (YYYY-MM-DD)
    pub end_date: String,
    /// Ticker symbols to evaluate
    #[serde(default)]
    pub securities: Vec<String>,
    /// Optional risk-free rate, defaults to 0.04
    #[serde(default)]
    pub risk_free_rate: Option<f64>,
}

impl RawRequest {
    pub fn new(start_date: &str, end_date: &str, securities: &[&str]) -> Self {
        Self {
            start_date: start_date.to_string(),
            end_date: end_date.to_string(),
            securities: securities.iter().map(|s| s.to_string()).collect(),
            risk_free_rate: None,
        }
    }

    pub fn with_risk_free_rate(mut self, rate: f64) -> Self {
        self.risk_free_rate = Some(rate);
        self
    }
}

/// Sampling window with `start < end`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, RequestError> {
        if start >= end {
            return Err(RequestError::InvalidDateRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Whether `date` falls inside the window, both ends inclusive
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Upper-cased, trimmed ticker symbol
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SecurityId(String);

impl SecurityId {
    /// Normalize a raw ticker. Returns `None` for blank input or input
    /// containing whitespace or control characters.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return None;
        }
        Some(Self(trimmed.to_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SecurityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SecurityId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Validated request, ready for the pipeline
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestParameters {
    pub date_range: DateRange,
    /// Request order, duplicates retained
    pub securities: Vec<SecurityId>,
    pub risk_free_rate: f64,
}

/// Turns a [`RawRequest`] into [`RequestParameters`]
#[derive(Debug, Clone, Copy)]
pub struct RequestValidator {
    default_risk_free_rate: f64,
}

impl Default for RequestValidator {
    fn default() -> Self {
        Self {
            default_risk_free_rate: DEFAULT_RISK_FREE_RATE,
        }
    }
}

impl RequestValidator {
    pub fn new(default_risk_free_rate: f64) -> Self {
        Self {
            default_risk_free_rate,
        }
    }

    pub fn validate(&self, raw: &RawRequest) -> Result<RequestParameters, RequestError> {
        let start = parse_date("start_date", &raw.start_date)?;
        let end = parse_date("end_date", &raw.end_date)?;
        let date_range = DateRange::new(start, end)?;

        if raw.securities.is_empty() {
            return Err(RequestError::EmptySecurityList);
        }

        let securities = raw
            .securities
            .iter()
            .enumerate()
            .map(|(index, value)| {
                SecurityId::parse(value).ok_or_else(|| RequestError::InvalidSecurityIdentifier {
                    index,
                    value: value.clone(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let risk_free_rate = match raw.risk_free_rate {
            Some(rate) if !rate.is_finite() => return Err(RequestError::InvalidRiskFreeRate(rate)),
            Some(rate) => rate,
            None => self.default_risk_free_rate,
        };

        Ok(RequestParameters {
            date_range,
            securities,
            risk_free_rate,
        })
    }
}

/// Validate with the default risk-free rate
pub fn validate_request(raw: &RawRequest) -> Result<RequestParameters, RequestError> {
    RequestValidator::default().validate(raw)
}

fn parse_date(field: &'static str, value: &str) -> Result<NaiveDate, RequestError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|_| RequestError::MalformedDate {
        field,
        value: value.to_string(),
    })
}
