//! Kelly Service
//!
//! The single entry point used by every boundary (HTTP, CLI):
//! validate the raw request, then run the portfolio pipeline.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, info_span, warn, Instrument};

use crate::config::Config;
use crate::domain::{LeverageResult, RawRequest, RequestError, RequestValidator};
use crate::ports::QuoteSource;

use super::pipeline::{PipelineSettings, PortfolioPipeline, RunContext};

pub struct KellyService {
    validator: RequestValidator,
    pipeline: PortfolioPipeline,
    next_request_id: AtomicU64,
}

impl KellyService {
    pub fn new(
        source: Arc<dyn QuoteSource>,
        settings: PipelineSettings,
        default_risk_free_rate: f64,
    ) -> Self {
        Self {
            validator: RequestValidator::new(default_risk_free_rate),
            pipeline: PortfolioPipeline::new(source, settings),
            next_request_id: AtomicU64::new(1),
        }
    }

    pub fn from_config(config: &Config, source: Arc<dyn QuoteSource>) -> Self {
        Self::new(
            source,
            PipelineSettings::from(&config.pipeline),
            config.pipeline.default_risk_free_rate,
        )
    }

    pub fn source_name(&self) -> &'static str {
        self.pipeline.source_name()
    }

    /// Compute leverages for one request.
    ///
    /// Returns `Err` only for request-level validation failures; every
    /// per-security failure is reported inside the `LeverageResult`.
    pub async fn compute(&self, raw: &RawRequest) -> Result<LeverageResult, RequestError> {
        self.compute_inner(raw, None).await
    }

    /// Like [`compute`](Self::compute), stopping still-pending securities
    /// once `cancel` turns `true`.
    pub async fn compute_with_cancel(
        &self,
        raw: &RawRequest,
        cancel: watch::Receiver<bool>,
    ) -> Result<LeverageResult, RequestError> {
        self.compute_inner(raw, Some(cancel)).await
    }

    async fn compute_inner(
        &self,
        raw: &RawRequest,
        cancel: Option<watch::Receiver<bool>>,
    ) -> Result<LeverageResult, RequestError> {
        let request_id = self.next_request_id.fetch_add(1, Ordering::Relaxed);
        let span = info_span!("kelly_request", request_id);

        let params = match self.validator.validate(raw) {
            Ok(params) => params,
            Err(e) => {
                warn!(parent: &span, error = %e, "request rejected");
                return Err(e);
            }
        };

        info!(
            parent: &span,
            start_date = %params.date_range.start(),
            end_date = %params.date_range.end(),
            securities = ?params.securities,
            risk_free_rate = params.risk_free_rate,
            "computing kelly leverages"
        );

        let mut ctx = RunContext::new(span.clone());
        if let Some(cancel) = cancel {
            ctx = ctx.with_cancel(cancel);
        }

        Ok(self.pipeline.run(&params, ctx).instrument(span).await)
    }
}
