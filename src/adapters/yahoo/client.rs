//! Yahoo Finance Chart Client
//!
//! Implements `QuoteSource` over the public v8 chart endpoint, returning
//! daily adjusted closes for the requested window.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Days, NaiveDate};
use reqwest::Client;
use serde::Deserialize;

use crate::config::QuoteSourceSection;
use crate::domain::{DateRange, PricePoint, PriceSeries, SecurityId};
use crate::ports::{QuoteSource, QuoteSourceError};

/// Yahoo chart client configuration
#[derive(Debug, Clone)]
pub struct YahooConfig {
    /// Base URL, e.g. https://query1.finance.yahoo.com
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
    pub user_agent: String,
}

impl From<&QuoteSourceSection> for YahooConfig {
    fn from(section: &QuoteSourceSection) -> Self {
        Self {
            base_url: section.get_base_url(),
            timeout: Duration::from_secs(section.timeout_secs),
            user_agent: section.user_agent.clone(),
        }
    }
}

impl Default for YahooConfig {
    fn default() -> Self {
        Self::from(&QuoteSourceSection::default())
    }
}

#[derive(Debug, Clone)]
pub struct YahooQuoteSource {
    config: YahooConfig,
    http: Client,
}

impl YahooQuoteSource {
    pub fn new() -> Result<Self, QuoteSourceError> {
        Self::with_config(YahooConfig::default())
    }

    pub fn with_config(config: YahooConfig) -> Result<Self, QuoteSourceError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| QuoteSourceError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, http })
    }

    /// Chart URL covering the whole window, end date inclusive
    pub fn chart_url(&self, security: &SecurityId, range: &DateRange) -> String {
        let period1 = unix_midnight(range.start());
        let period2 = unix_midnight(range.end() + Days::new(1));
        format!(
            "{}/v8/finance/chart/{}?period1={}&period2={}&interval=1d&events=history&includeAdjustedClose=true",
            self.config.base_url.trim_end_matches('/'),
            security.as_str(),
            period1,
            period2
        )
    }
}

#[async_trait]
impl QuoteSource for YahooQuoteSource {
    fn name(&self) -> &'static str {
        "yahoo"
    }

    async fn fetch(
        &self,
        security: &SecurityId,
        range: &DateRange,
    ) -> Result<PriceSeries, QuoteSourceError> {
        let url = self.chart_url(security, range);
        tracing::debug!(%url, "requesting yahoo chart");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| QuoteSourceError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| QuoteSourceError::Transport(e.to_string()))?;

        if !status.is_success() {
            // Yahoo explains unknown symbols in a JSON error body
            if let Ok(chart) = serde_json::from_str::<ChartResponse>(&body) {
                if let Some(error) = chart.chart.error {
                    return Err(error.into_source_error(security));
                }
            }
            return Err(QuoteSourceError::Status {
                status: status.as_u16(),
                message: body.chars().take(200).collect(),
            });
        }

        parse_chart(&body, security, range)
    }
}

/// Parse a chart response body into the observations inside `range`.
///
/// Uses `adjclose` when present, `close` otherwise. Missing and
/// non-positive prices are skipped.
pub fn parse_chart(
    body: &str,
    security: &SecurityId,
    range: &DateRange,
) -> Result<PriceSeries, QuoteSourceError> {
    let chart: ChartResponse =
        serde_json::from_str(body).map_err(|e| QuoteSourceError::Parse(e.to_string()))?;

    if let Some(error) = chart.chart.error {
        return Err(error.into_source_error(security));
    }

    let result = chart
        .chart
        .result
        .and_then(|results| results.into_iter().next())
        .ok_or_else(|| QuoteSourceError::Parse("no chart result in response".to_string()))?;

    let offset = result.meta.and_then(|m| m.gmtoffset).unwrap_or(0);
    let timestamps = result.timestamp.unwrap_or_default();

    let prices: Vec<Option<f64>> = match result.indicators.adjclose.and_then(|a| a.into_iter().next()) {
        Some(adjusted) => adjusted.adjclose,
        None => result
            .indicators
            .quote
            .into_iter()
            .next()
            .map(|q| q.close)
            .unwrap_or_default(),
    };

    if prices.len() < timestamps.len() {
        return Err(QuoteSourceError::Parse(format!(
            "{} timestamps but only {} prices",
            timestamps.len(),
            prices.len()
        )));
    }

    let points = timestamps
        .iter()
        .zip(prices)
        .filter_map(|(ts, price)| {
            let date = DateTime::from_timestamp(ts + offset, 0)?.date_naive();
            Some(PricePoint::new(date, price?))
        })
        .filter(|point| range.contains(point.date))
        .collect();

    Ok(PriceSeries::normalized(points))
}

fn unix_midnight(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or_default()
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    #[serde(default)]
    description: String,
}

impl ChartError {
    fn into_source_error(self, security: &SecurityId) -> QuoteSourceError {
        if self.code.eq_ignore_ascii_case("Not Found") {
            QuoteSourceError::UnknownSymbol(security.to_string())
        } else {
            QuoteSourceError::Provider {
                code: self.code,
                description: self.description,
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    meta: Option<ChartMeta>,
    #[serde(default)]
    timestamp: Option<Vec<i64>>,
    indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    #[serde(default)]
    gmtoffset: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<ChartQuote>,
    #[serde(default)]
    adjclose: Option<Vec<ChartAdjClose>>,
}

#[derive(Debug, Deserialize)]
struct ChartQuote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct ChartAdjClose {
    #[serde(default)]
    adjclose: Vec<Option<f64>>,
}
