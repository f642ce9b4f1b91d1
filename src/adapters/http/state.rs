//! Shared application state for the HTTP boundary.
//!
//! Everything here is built once at startup and read-only afterwards.

use std::path::Path;

use serde_json::Value;

use crate::application::KellyService;
use crate::config::Config;

use super::docs::openapi_document;

/// Terms of service shipped with the binary
pub const DEFAULT_TERMS: &str = include_str!("../../../assets/terms_of_service.txt");

pub struct AppState {
    pub service: KellyService,
    /// Terms of service text
    pub terms: String,
    /// OpenAPI document served at /apidocs
    pub api_docs: Value,
}

impl AppState {
    pub fn new(service: KellyService, terms: String, api_docs: Value) -> Self {
        Self {
            service,
            terms,
            api_docs,
        }
    }

    /// Build state from configuration, reading the terms file if one is set.
    pub fn from_config(config: &Config, service: KellyService) -> std::io::Result<Self> {
        let terms = load_terms(config.service.terms_path.as_deref())?;
        let api_docs = openapi_document(&config.service);
        Ok(Self::new(service, terms, api_docs))
    }
}

/// Terms text from `path`, or the built-in text when no path is given
pub fn load_terms(path: Option<&str>) -> std::io::Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(Path::new(path)),
        None => Ok(DEFAULT_TERMS.to_string()),
    }
}
