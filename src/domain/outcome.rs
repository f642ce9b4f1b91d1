//! Leverage Outcomes
//!
//! Every requested security ends in exactly one `LeverageOutcome`: either a
//! computed estimate or a typed failure. Failures are data, never errors
//! raised past the pipeline.

use std::fmt;

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use super::leverage::LeverageEstimate;
use super::request::SecurityId;

/// Why a security has no leverage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    DataUnavailable,
    InsufficientData,
    DegenerateVariance,
    TimedOut,
    Cancelled,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::DataUnavailable => "data unavailable",
            FailureKind::InsufficientData => "insufficient data",
            FailureKind::DegenerateVariance => "degenerate variance",
            FailureKind::TimedOut => "timed out",
            FailureKind::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Per-security pipeline states.
///
/// `Requested -> Fetched -> ReturnsComputed -> LeverageComputed`, with a
/// failure possible from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Requested,
    Fetched,
    ReturnsComputed,
    LeverageComputed,
}

/// A failed security: what went wrong, where, and a loggable reason
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Failure {
    pub kind: FailureKind,
    /// Last state reached before failing
    pub stage: Stage,
    pub reason: String,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.reason)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LeverageOutcome {
    Computed(LeverageEstimate),
    Failed(Failure),
}

impl LeverageOutcome {
    pub fn failed(kind: FailureKind, stage: Stage, reason: impl Into<String>) -> Self {
        Self::Failed(Failure {
            kind,
            stage,
            reason: reason.into(),
        })
    }

    pub fn leverage(&self) -> Option<f64> {
        match self {
            Self::Computed(estimate) => Some(estimate.leverage),
            Self::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Self::Computed(_) => None,
            Self::Failed(failure) => Some(failure),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Computed(_))
    }
}

/// Outcomes in request order, one per requested security (duplicates included)
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LeverageResult {
    entries: Vec<(SecurityId, LeverageOutcome)>,
}

impl LeverageResult {
    pub fn new(entries: Vec<(SecurityId, LeverageOutcome)>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[(SecurityId, LeverageOutcome)] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SecurityId, &LeverageOutcome)> {
        self.entries.iter().map(|(id, outcome)| (id, outcome))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First outcome recorded for `symbol`
    pub fn get(&self, symbol: &str) -> Option<&LeverageOutcome> {
        self.entries
            .iter()
            .find(|(id, _)| id.as_str() == symbol)
            .map(|(_, outcome)| outcome)
    }

    pub fn failures(&self) -> impl Iterator<Item = (&SecurityId, &Failure)> {
        self.entries
            .iter()
            .filter_map(|(id, outcome)| outcome.failure().map(|f| (id, f)))
    }

    pub fn success_count(&self) -> usize {
        self.entries.iter().filter(|(_, o)| o.is_success()).count()
    }

    /// The wire shape returned to clients
    pub fn to_response(&self) -> LeverageResponse {
        let mut entries: Vec<(String, Option<f64>)> = Vec::with_capacity(self.entries.len());
        for (id, outcome) in &self.entries {
            if entries.iter().any(|(symbol, _)| symbol == id.as_str()) {
                continue;
            }
            entries.push((id.to_string(), outcome.leverage()));
        }
        LeverageResponse { entries }
    }
}

/// JSON object `{symbol: leverage | null}`.
///
/// Keys are the distinct requested securities in first-occurrence order; a
/// failed security maps to `null`.
#[derive(Debug, Clone, PartialEq)]
pub struct LeverageResponse {
    entries: Vec<(String, Option<f64>)>,
}

impl LeverageResponse {
    pub fn entries(&self) -> &[(String, Option<f64>)] {
        &self.entries
    }
}

impl Serialize for LeverageResponse {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (symbol, leverage) in &self.entries {
            map.serialize_entry(symbol, leverage)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(symbol: &str) -> SecurityId {
        SecurityId::parse(symbol).unwrap()
    }

    fn computed(leverage: f64) -> LeverageOutcome {
        LeverageOutcome::Computed(LeverageEstimate {
            mean: 0.0,
            variance: 1.0,
            risk_free_rate: 0.0,
            leverage,
            sample_count: 10,
        })
    }

    #[test]
    fn test_outcome_accessors() {
        let ok = computed(1.5);
        assert_eq!(ok.leverage(), Some(1.5));
        assert!(ok.is_success());
        assert!(ok.failure().is_none());

        let failed = LeverageOutcome::failed(FailureKind::TimedOut, Stage::Requested, "slow");
        assert_eq!(failed.leverage(), None);
        assert_eq!(failed.failure().unwrap().kind, FailureKind::TimedOut);
        assert_eq!(failed.failure().unwrap().to_string(), "timed out: slow");
    }

    #[test]
    fn test_result_lookup_and_failures() {
        let result = LeverageResult::new(vec![
            (id("IBM"), computed(2.0)),
            (
                id("XYZ"),
                LeverageOutcome::failed(FailureKind::DataUnavailable, Stage::Requested, "404"),
            ),
        ]);

        assert_eq!(result.len(), 2);
        assert_eq!(result.success_count(), 1);
        assert_eq!(result.get("IBM").and_then(|o| o.leverage()), Some(2.0));
        let failures: Vec<_> = result.failures().collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0.as_str(), "XYZ");
    }

    #[test]
    fn test_response_keeps_order_and_renders_null() {
        let result = LeverageResult::new(vec![
            (id("MSFT"), computed(3.25)),
            (
                id("AAPL"),
                LeverageOutcome::failed(FailureKind::DegenerateVariance, Stage::ReturnsComputed, "v=0"),
            ),
            (id("IBM"), computed(-1.0)),
        ]);

        let json = serde_json::to_string(&result.to_response()).unwrap();
        assert_eq!(json, r#"{"MSFT":3.25,"AAPL":null,"IBM":-1.0}"#);
    }

    #[test]
    fn test_response_collapses_duplicates() {
        let result = LeverageResult::new(vec![
            (id("IBM"), computed(1.0)),
            (id("AAPL"), computed(2.0)),
            (id("IBM"), computed(1.0)),
        ]);

        assert_eq!(result.len(), 3);
        let response = result.to_response();
        let symbols: Vec<&str> = response.entries().iter().map(|(s, _)| s.as_str()).collect();
        assert_eq!(symbols, vec!["IBM", "AAPL"]);
    }
}
