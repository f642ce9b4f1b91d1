use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Days;

use crate::domain::{DateRange, PricePoint, PriceSeries, SecurityId};
use crate::ports::{QuoteSource, QuoteSourceError};

#[derive(Debug, Clone)]
enum Scripted {
    /// Prices laid out one per day from the start of the requested range
    Prices(Vec<f64>),
    Failure(QuoteSourceError),
}

#[derive(Debug, Default)]
struct StaticState {
    responses: HashMap<String, Scripted>,
    delays: HashMap<String, Duration>,
    calls: Vec<String>,
}

/// Deterministic in-memory quote source that records calls and serves
/// scripted responses. Unknown symbols fail with `UnknownSymbol`.
#[derive(Debug, Clone, Default)]
pub struct StaticQuoteSource {
    state: Arc<Mutex<StaticState>>,
}

impl StaticQuoteSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `prices` as consecutive daily closes starting at the range start
    pub fn with_prices(self, symbol: &str, prices: &[f64]) -> Self {
        self.script(symbol, Scripted::Prices(prices.to_vec()))
    }

    pub fn with_failure(self, symbol: &str, error: QuoteSourceError) -> Self {
        self.script(symbol, Scripted::Failure(error))
    }

    /// Sleep before answering for `symbol`
    pub fn with_delay(self, symbol: &str, delay: Duration) -> Self {
        self.lock().delays.insert(symbol.to_uppercase(), delay);
        self
    }

    /// Symbols fetched so far, in call order
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.lock().calls.len()
    }

    fn script(self, symbol: &str, response: Scripted) -> Self {
        self.lock().responses.insert(symbol.to_uppercase(), response);
        self
    }

    fn lock(&self) -> MutexGuard<'_, StaticState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl QuoteSource for StaticQuoteSource {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn fetch(
        &self,
        security: &SecurityId,
        range: &DateRange,
    ) -> Result<PriceSeries, QuoteSourceError> {
        let (response, delay) = {
            let mut state = self.lock();
            state.calls.push(security.to_string());
            (
                state.responses.get(security.as_str()).cloned(),
                state.delays.get(security.as_str()).copied(),
            )
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        match response {
            Some(Scripted::Prices(prices)) => {
                let points = prices
                    .iter()
                    .enumerate()
                    .map(|(i, price)| PricePoint::new(range.start() + Days::new(i as u64), *price))
                    .collect();
                PriceSeries::new(points).map_err(|e| QuoteSourceError::Parse(e.to_string()))
            }
            Some(Scripted::Failure(error)) => Err(error),
            None => Err(QuoteSourceError::UnknownSymbol(security.to_string())),
        }
    }
}
