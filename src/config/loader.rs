//! Configuration Loader
//!
//! Loads and validates configuration from TOML files. Every section is
//! optional and falls back to its defaults.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::domain::{RiskFreeConvention, DEFAULT_RISK_FREE_RATE};

/// Main configuration structure matching config.toml
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerSection,
    pub pipeline: PipelineSection,
    pub quote_source: QuoteSourceSection,
    pub logging: LoggingSection,
    pub service: ServiceSection,
}

/// HTTP listener configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl ServerSection {
    /// Get host with environment variable override
    /// Checks KELLY_HOST env var first, falls back to config value
    pub fn get_host(&self) -> String {
        std::env::var("KELLY_HOST").unwrap_or_else(|_| self.host.clone())
    }

    /// Get port with environment variable override
    /// Checks KELLY_PORT env var first, falls back to config value
    pub fn get_port(&self) -> u16 {
        std::env::var("KELLY_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(self.port)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.get_host(), self.get_port())
    }
}

/// Leverage pipeline configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineSection {
    /// Maximum number of quote fetches in flight per request
    pub max_concurrency: usize,
    /// Upper bound on total wait for one request
    pub request_timeout_secs: u64,
    /// Risk-free rate used when a request omits it
    pub default_risk_free_rate: f64,
    /// When set, request rates are annual and divided by this many periods
    pub risk_free_periods_per_year: Option<u32>,
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            request_timeout_secs: 30,
            default_risk_free_rate: DEFAULT_RISK_FREE_RATE,
            risk_free_periods_per_year: None,
        }
    }
}

impl PipelineSection {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn risk_free_convention(&self) -> RiskFreeConvention {
        match self.risk_free_periods_per_year {
            Some(periods_per_year) => RiskFreeConvention::Annualized { periods_per_year },
            None => RiskFreeConvention::PerPeriod,
        }
    }
}

/// Historical quote provider configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QuoteSourceSection {
    /// Yahoo Finance API base URL
    pub base_url: String,
    /// Per-request HTTP timeout
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for QuoteSourceSection {
    fn default() -> Self {
        Self {
            base_url: "https://query1.finance.yahoo.com".to_string(),
            timeout_secs: 10,
            user_agent: concat!("kelly-leverage/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl QuoteSourceSection {
    /// Get base URL with environment variable override
    /// Checks KELLY_QUOTE_BASE_URL env var first, falls back to config value
    pub fn get_base_url(&self) -> String {
        std::env::var("KELLY_QUOTE_BASE_URL").unwrap_or_else(|_| self.base_url.clone())
    }
}

/// Logging configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level: "trace", "debug", "info", "warn", "error"
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Service metadata configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceSection {
    /// Title shown in the API document
    pub title: String,
    pub description: String,
    /// Terms of service file; built-in text when unset
    pub terms_path: Option<String>,
}

impl Default for ServiceSection {
    fn default() -> Self {
        Self {
            title: "Kelly Criterion Service".to_string(),
            description: "Kelly Criterion Service. Use this service at your own risk.".to_string(),
            terms_path: None,
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Load configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

impl Config {
    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pipeline.max_concurrency == 0 {
            return Err(ConfigError::ValidationError(
                "max_concurrency must be > 0".to_string(),
            ));
        }

        if self.pipeline.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "request_timeout_secs must be > 0".to_string(),
            ));
        }

        if !self.pipeline.default_risk_free_rate.is_finite() {
            return Err(ConfigError::ValidationError(format!(
                "default_risk_free_rate must be finite, got {}",
                self.pipeline.default_risk_free_rate
            )));
        }

        if self.pipeline.risk_free_periods_per_year == Some(0) {
            return Err(ConfigError::ValidationError(
                "risk_free_periods_per_year must be > 0".to_string(),
            ));
        }

        if self.quote_source.base_url.is_empty() {
            return Err(ConfigError::ValidationError(
                "base_url cannot be empty".to_string(),
            ));
        }

        if self.quote_source.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "quote_source timeout_secs must be > 0".to_string(),
            ));
        }

        if !LOG_LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "logging level must be one of {:?}, got {}",
                LOG_LEVELS, self.logging.level
            )));
        }

        Ok(())
    }
}
