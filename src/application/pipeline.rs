//! Portfolio Pipeline
//!
//! Runs `fetch -> build_returns -> estimate` for every requested security.
//! Securities are independent: each runs in its own task behind a bounded
//! worker pool, and a failure is recorded for that security only.
//!
//! Guarantees:
//! - exactly one outcome per requested security, in request order
//! - every task ends by the request deadline (`TimedOut` otherwise)
//! - cancellation only touches securities that have not finished yet

use std::future::pending;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, info_span, warn, Instrument, Span};

use crate::config::PipelineSection;
use crate::domain::{
    build_returns, DateRange, EstimateError, FailureKind, LeverageEstimator, LeverageOutcome,
    LeverageResult, RequestParameters, RiskFreeConvention, SecurityId, Stage, MIN_RETURNS,
};
use crate::ports::QuoteSource;

/// Tuning knobs for one pipeline
#[derive(Debug, Clone, Copy)]
pub struct PipelineSettings {
    /// Quote fetches allowed in flight at once
    pub max_concurrency: usize,
    /// Total wait allowed per request
    pub request_timeout: Duration,
    pub risk_free_convention: RiskFreeConvention,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from(&PipelineSection::default())
    }
}

impl From<&PipelineSection> for PipelineSettings {
    fn from(section: &PipelineSection) -> Self {
        Self {
            max_concurrency: section.max_concurrency.max(1),
            request_timeout: section.request_timeout(),
            risk_free_convention: section.risk_free_convention(),
        }
    }
}

/// Per-invocation context: the request's log span and an optional
/// cancellation signal (`true` cancels still-pending securities).
#[derive(Debug)]
pub struct RunContext {
    span: Span,
    cancel: Option<watch::Receiver<bool>>,
}

impl RunContext {
    pub fn new(span: Span) -> Self {
        Self { span, cancel: None }
    }

    pub fn with_cancel(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

pub struct PortfolioPipeline {
    source: Arc<dyn QuoteSource>,
    estimator: LeverageEstimator,
    settings: PipelineSettings,
}

impl PortfolioPipeline {
    pub fn new(source: Arc<dyn QuoteSource>, settings: PipelineSettings) -> Self {
        Self {
            source,
            estimator: LeverageEstimator::new(settings.risk_free_convention),
            settings,
        }
    }

    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }

    /// Evaluate every security in `params`. Never fails as a whole.
    pub async fn run(&self, params: &RequestParameters, mut ctx: RunContext) -> LeverageResult {
        let started = Instant::now();
        let deadline = started + self.settings.request_timeout;
        let permits = Arc::new(Semaphore::new(self.settings.max_concurrency));
        let mut tasks = JoinSet::new();

        for (index, security) in params.securities.iter().enumerate() {
            let task = SecurityTask {
                source: Arc::clone(&self.source),
                estimator: self.estimator,
                security: security.clone(),
                range: params.date_range,
                risk_free_rate: params.risk_free_rate,
            };
            let permits = Arc::clone(&permits);
            let timeout = self.settings.request_timeout;
            let span = info_span!(parent: &ctx.span, "security", symbol = %security);

            tasks.spawn(
                async move {
                    let work = async {
                        // a closed semaphore is impossible here; treat it like a free slot
                        let _permit = permits.acquire_owned().await.ok();
                        task.evaluate().await
                    };
                    let outcome = match timeout_at(deadline, work).await {
                        Ok(outcome) => outcome,
                        Err(_) => {
                            warn!(?timeout, "quote fetch did not finish before the deadline");
                            LeverageOutcome::failed(
                                FailureKind::TimedOut,
                                Stage::Requested,
                                format!("no result within {:?}", timeout),
                            )
                        }
                    };
                    (index, outcome)
                }
                .instrument(span),
            );
        }

        let mut slots: Vec<Option<LeverageOutcome>> = vec![None; params.securities.len()];
        let mut cancelled = false;

        loop {
            let joined = if cancelled {
                tasks.join_next().await
            } else {
                tokio::select! {
                    joined = tasks.join_next() => joined,
                    _ = wait_for_cancel(&mut ctx.cancel) => {
                        info!(parent: &ctx.span, "cancellation requested, aborting pending securities");
                        cancelled = true;
                        tasks.abort_all();
                        continue;
                    }
                }
            };

            match joined {
                None => break,
                Some(Ok((index, outcome))) => slots[index] = Some(outcome),
                Some(Err(err)) if err.is_cancelled() => {}
                Some(Err(err)) => warn!(parent: &ctx.span, error = %err, "security task panicked"),
            }
        }

        let entries = params
            .securities
            .iter()
            .cloned()
            .zip(slots)
            .map(|(security, slot)| {
                let outcome = slot.unwrap_or_else(|| {
                    if cancelled {
                        LeverageOutcome::failed(
                            FailureKind::Cancelled,
                            Stage::Requested,
                            "request cancelled before the quote fetch finished",
                        )
                    } else {
                        LeverageOutcome::failed(
                            FailureKind::DataUnavailable,
                            Stage::Requested,
                            "quote task aborted unexpectedly",
                        )
                    }
                });
                (security, outcome)
            })
            .collect();

        let result = LeverageResult::new(entries);
        info!(
            parent: &ctx.span,
            securities = result.len(),
            succeeded = result.success_count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "leverage computation finished"
        );
        result
    }
}

/// Everything one security's pipeline needs, owned so it can move into a task
struct SecurityTask {
    source: Arc<dyn QuoteSource>,
    estimator: LeverageEstimator,
    security: SecurityId,
    range: DateRange,
    risk_free_rate: f64,
}

impl SecurityTask {
    async fn evaluate(self) -> LeverageOutcome {
        let outcome = self.run_stages().await;
        match &outcome {
            LeverageOutcome::Computed(estimate) => debug!(
                stage = ?Stage::LeverageComputed,
                leverage = estimate.leverage,
                mean = estimate.mean,
                variance = estimate.variance,
                "leverage computed"
            ),
            LeverageOutcome::Failed(failure) => warn!(
                stage = ?failure.stage,
                kind = %failure.kind,
                reason = %failure.reason,
                "security failed"
            ),
        }
        outcome
    }

    async fn run_stages(&self) -> LeverageOutcome {
        debug!(stage = ?Stage::Requested, range = %self.range, "fetching quotes");
        let prices = match self.source.fetch(&self.security, &self.range).await {
            Ok(prices) => prices,
            Err(e) => {
                return LeverageOutcome::failed(FailureKind::DataUnavailable, Stage::Requested, e.to_string())
            }
        };

        debug!(stage = ?Stage::Fetched, observations = prices.len(), "quotes fetched");
        let returns = match build_returns(&prices) {
            Ok(returns) => returns,
            Err(e) => {
                return LeverageOutcome::failed(FailureKind::InsufficientData, Stage::Fetched, e.to_string())
            }
        };
        drop(prices);

        debug!(stage = ?Stage::ReturnsComputed, returns = returns.len(), "returns computed");
        if returns.len() < MIN_RETURNS {
            return LeverageOutcome::failed(
                FailureKind::InsufficientData,
                Stage::ReturnsComputed,
                format!(
                    "{} return(s) in window, at least {} required",
                    returns.len(),
                    MIN_RETURNS
                ),
            );
        }

        match self.estimator.estimate(&returns, self.risk_free_rate) {
            Ok(estimate) => LeverageOutcome::Computed(estimate),
            Err(e) => {
                let kind = match e {
                    EstimateError::InsufficientData { .. } => FailureKind::InsufficientData,
                    EstimateError::DegenerateVariance { .. }
                    | EstimateError::NonFiniteLeverage { .. } => FailureKind::DegenerateVariance,
                };
                LeverageOutcome::failed(kind, Stage::ReturnsComputed, e.to_string())
            }
        }
    }
}

async fn wait_for_cancel(cancel: &mut Option<watch::Receiver<bool>>) {
    match cancel {
        Some(rx) => {
            // sender gone without cancelling: never fires
            if rx.wait_for(|cancelled| *cancelled).await.is_err() {
                pending::<()>().await;
            }
        }
        None => pending::<()>().await,
    }
}
