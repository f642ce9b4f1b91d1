//! Configuration Module
//!
//! Loads and validates configuration from TOML files.

pub mod loader;

pub use loader::{
    Config, ConfigError, LoggingSection, PipelineSection, QuoteSourceSection, ServerSection,
    ServiceSection, load_config,
};
