//! Price and Return Series
//!
//! A `PriceSeries` is the validated price history of one security inside the
//! sampling window. `build_returns` turns it into simple periodic returns:
//!
//! ```text
//! r[t] = (p[t] - p[t-1]) / p[t-1]
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SeriesError {
    #[error("Insufficient data: {points} price observation(s), at least 2 required")]
    InsufficientData { points: usize },

    #[error("Invalid price {price} on {date}")]
    InvalidPrice { date: NaiveDate, price: f64 },

    #[error("Dates not strictly increasing: {next} follows {previous}")]
    UnorderedDates { previous: NaiveDate, next: NaiveDate },
}

/// One (date, price) observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price: f64,
}

impl PricePoint {
    pub fn new(date: NaiveDate, price: f64) -> Self {
        Self { date, price }
    }

    fn is_valid_price(&self) -> bool {
        self.price.is_finite() && self.price > 0.0
    }
}

/// Price history, strictly increasing by date, every price finite and > 0
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Build from already ordered observations, rejecting anything that
    /// breaks the series invariants.
    pub fn new(points: Vec<PricePoint>) -> Result<Self, SeriesError> {
        for point in &points {
            if !point.is_valid_price() {
                return Err(SeriesError::InvalidPrice {
                    date: point.date,
                    price: point.price,
                });
            }
        }
        for pair in points.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(SeriesError::UnorderedDates {
                    previous: pair[0].date,
                    next: pair[1].date,
                });
            }
        }
        Ok(Self { points })
    }

    /// Build from provider data of unknown quality: drops invalid prices,
    /// sorts by date and keeps the last observation for a repeated date.
    pub fn normalized(mut points: Vec<PricePoint>) -> Self {
        points.retain(PricePoint::is_valid_price);
        // stable sort keeps provider order within a date, so "last" is well defined
        points.sort_by_key(|p| p.date);

        let mut deduped: Vec<PricePoint> = Vec::with_capacity(points.len());
        for point in points {
            match deduped.last_mut() {
                Some(last) if last.date == point.date => *last = point,
                _ => deduped.push(point),
            }
        }
        Self { points: deduped }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }
}

/// Simple periodic returns; one shorter than the price series it came from
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReturnSeries {
    values: Vec<f64>,
}

impl ReturnSeries {
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<Vec<f64>> for ReturnSeries {
    fn from(values: Vec<f64>) -> Self {
        Self { values }
    }
}

/// Derive simple returns from consecutive prices.
///
/// Fails with `InsufficientData` when fewer than 2 prices are available.
pub fn build_returns(prices: &PriceSeries) -> Result<ReturnSeries, SeriesError> {
    if prices.len() < 2 {
        return Err(SeriesError::InsufficientData {
            points: prices.len(),
        });
    }

    let values = prices
        .points()
        .windows(2)
        .map(|pair| (pair[1].price - pair[0].price) / pair[0].price)
        .collect();

    Ok(ReturnSeries { values })
}
