//! Kelly Leverage Estimation
//!
//! Optimal leverage for a single security under the continuous-time Kelly
//! criterion, assuming the security is independent of the rest of the
//! portfolio:
//!
//! ```text
//! f = (m - r) / v
//! ```
//!
//! Where:
//!     m = arithmetic mean of the periodic returns
//!     v = population variance of the periodic returns (divisor n)
//!     r = risk-free rate for one return period
//!
//! No clamping is applied. A negative leverage is a short position.

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use thiserror::Error;

use super::series::ReturnSeries;

/// Minimum number of returns needed to estimate a variance
pub const MIN_RETURNS: usize = 2;

/// Variances at or below this are rounding noise on a constant series
const MIN_VARIANCE: f64 = 1e-20;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EstimateError {
    #[error("Insufficient data: {observations} return(s), at least {} required", MIN_RETURNS)]
    InsufficientData { observations: usize },

    #[error("Degenerate variance {variance:e}: leverage is undefined")]
    DegenerateVariance { variance: f64 },

    /// Excess return too large relative to the variance to represent
    #[error("Leverage overflow: ({mean} - {rate}) / {variance:e} is not finite")]
    NonFiniteLeverage { mean: f64, rate: f64, variance: f64 },
}

/// How the request's risk-free rate relates to one return period
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RiskFreeConvention {
    /// The rate is already expressed per return period
    #[default]
    PerPeriod,
    /// The rate is annual and spread evenly over `periods_per_year`
    Annualized { periods_per_year: u32 },
}

impl RiskFreeConvention {
    /// Rate for a single return period
    pub fn per_period(&self, rate: f64) -> f64 {
        match self {
            Self::PerPeriod => rate,
            Self::Annualized { periods_per_year } => rate / f64::from(*periods_per_year),
        }
    }
}

/// Sample statistics and the resulting Kelly leverage
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LeverageEstimate {
    pub mean: f64,
    pub variance: f64,
    /// Risk-free rate actually subtracted (per period)
    pub risk_free_rate: f64,
    pub leverage: f64,
    pub sample_count: usize,
}

/// Stateless estimator; identical input always yields identical output
#[derive(Debug, Clone, Copy, Default)]
pub struct LeverageEstimator {
    convention: RiskFreeConvention,
}

impl LeverageEstimator {
    pub fn new(convention: RiskFreeConvention) -> Self {
        Self { convention }
    }

    pub fn estimate(
        &self,
        returns: &ReturnSeries,
        risk_free_rate: f64,
    ) -> Result<LeverageEstimate, EstimateError> {
        let n = returns.len();
        if n < MIN_RETURNS {
            return Err(EstimateError::InsufficientData { observations: n });
        }

        let mean = returns.values().iter().mean();
        let variance = returns.values().iter().population_variance();

        if !variance.is_finite() || variance <= MIN_VARIANCE {
            return Err(EstimateError::DegenerateVariance { variance });
        }

        let rate = self.convention.per_period(risk_free_rate);
        let leverage = (mean - rate) / variance;
        if !leverage.is_finite() {
            return Err(EstimateError::NonFiniteLeverage {
                mean,
                rate,
                variance,
            });
        }

        Ok(LeverageEstimate {
            mean,
            variance,
            risk_free_rate: rate,
            leverage,
            sample_count: n,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn returns(values: &[f64]) -> ReturnSeries {
        ReturnSeries::from(values.to_vec())
    }

    #[test]
    fn test_zero_mean_gives_zero_leverage() {
        let est = LeverageEstimator::default()
            .estimate(&returns(&[0.10, -0.10]), 0.0)
            .unwrap();

        assert_relative_eq!(est.mean, 0.0, epsilon = 1e-12);
        assert_relative_eq!(est.variance, 0.01, epsilon = 1e-12);
        assert_relative_eq!(est.leverage, 0.0, epsilon = 1e-9);
        assert_eq!(est.sample_count, 2);
    }

    #[test]
    fn test_risk_free_rate_is_subtracted() {
        // m = 0.02, v = 0.0004 (population)
        let est = LeverageEstimator::default()
            .estimate(&returns(&[0.04, 0.0]), 0.01)
            .unwrap();

        assert_relative_eq!(est.variance, 0.0004, epsilon = 1e-12);
        assert_relative_eq!(est.leverage, (0.02 - 0.01) / 0.0004, epsilon = 1e-6);
        assert_relative_eq!(est.risk_free_rate, 0.01);
    }

    #[test]
    fn test_negative_leverage_is_returned_unchanged() {
        let est = LeverageEstimator::default()
            .estimate(&returns(&[-0.05, 0.01, -0.02]), 0.0)
            .unwrap();
        assert!(est.leverage < 0.0);
    }

    #[test]
    fn test_constant_returns_are_degenerate() {
        let err = LeverageEstimator::default()
            .estimate(&returns(&[0.10, 0.10]), 0.0)
            .unwrap_err();
        assert!(matches!(err, EstimateError::DegenerateVariance { .. }));

        let err = LeverageEstimator::default()
            .estimate(&returns(&[0.0; 30]), 0.04)
            .unwrap_err();
        assert!(matches!(err, EstimateError::DegenerateVariance { .. }));

        let err = LeverageEstimator::default()
            .estimate(&returns(&[0.1, 0.1, 0.1, 0.1, 0.1, 0.1, 0.1]), 0.0)
            .unwrap_err();
        assert!(matches!(err, EstimateError::DegenerateVariance { .. }));
    }

    #[test]
    fn test_overflowing_leverage_is_rejected() {
        let err = LeverageEstimator::default()
            .estimate(&returns(&[0.10, -0.10]), 1e308)
            .unwrap_err();
        assert!(matches!(err, EstimateError::NonFiniteLeverage { .. }));

        let err = LeverageEstimator::default()
            .estimate(&returns(&[0.10, -0.10]), f64::MAX)
            .unwrap_err();
        assert!(matches!(err, EstimateError::NonFiniteLeverage { .. }));
    }

    #[test]
    fn test_too_few_returns() {
        assert_eq!(
            LeverageEstimator::default().estimate(&returns(&[]), 0.0),
            Err(EstimateError::InsufficientData { observations: 0 })
        );
        assert_eq!(
            LeverageEstimator::default().estimate(&returns(&[0.01]), 0.0),
            Err(EstimateError::InsufficientData { observations: 1 })
        );
    }

    #[test]
    fn test_estimate_is_deterministic() {
        let series = returns(&[0.012, -0.004, 0.007, 0.001, -0.011, 0.009]);
        let estimator = LeverageEstimator::default();
        let first = estimator.estimate(&series, 0.0001).unwrap();
        for _ in 0..10 {
            assert_eq!(estimator.estimate(&series, 0.0001).unwrap(), first);
        }
    }

    #[test]
    fn test_annualized_convention() {
        let convention = RiskFreeConvention::Annualized {
            periods_per_year: 252,
        };
        assert_relative_eq!(convention.per_period(0.0252), 0.0001, epsilon = 1e-15);

        let est = LeverageEstimator::new(convention)
            .estimate(&returns(&[0.04, 0.0]), 0.0252)
            .unwrap();
        assert_relative_eq!(est.leverage, (0.02 - 0.0001) / 0.0004, epsilon = 1e-6);
    }
}
