//! Batch analysis across tickers.
//!
//! Tickers are independent, so they fan out over a dedicated rayon pool
//! sized by `BatchConfig::max_concurrency`. Results come back in input order
//! and one ticker's failure is only ever that ticker's `NoTrade`.

use std::collections::BTreeMap;

use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::data::TickerInput;
use crate::error::{EngineError, EngineResult};

use super::analyzer::{Engine, ReasonCode, TickerAnalysis};

/// Counts across a batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub tickers: usize,
    pub trades: usize,
    pub no_trades: usize,
    pub by_reason: BTreeMap<ReasonCode, usize>,
}

impl BatchSummary {
    pub fn from_analyses(analyses: &[TickerAnalysis]) -> Self {
        let mut summary = Self {
            tickers: analyses.len(),
            ..Self::default()
        };
        for analysis in analyses {
            match analysis.reason() {
                None => summary.trades += 1,
                Some(rejection) => {
                    summary.no_trades += 1;
                    *summary.by_reason.entry(rejection.code).or_insert(0) += 1;
                }
            }
        }
        summary
    }
}

impl Engine {
    /// Analyze every ticker with at most `max_concurrency` running at once.
    ///
    /// Only failing to start the worker pool is an error.
    pub fn analyze_batch(&self, inputs: &[TickerInput]) -> EngineResult<Vec<TickerAnalysis>> {
        let workers = self.config().batch.max_concurrency;
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("ivcrush-worker-{i}"))
            .build()
            .map_err(|e| EngineError::config(format!("could not start {workers} workers: {e}")))?;

        info!("Analyzing {} tickers on {} workers", inputs.len(), workers);
        let analyses: Vec<TickerAnalysis> =
            pool.install(|| inputs.par_iter().map(|input| self.analyze_ticker(input)).collect());

        let summary = BatchSummary::from_analyses(&analyses);
        info!(
            "Batch complete: {} trade(s), {} no-trade(s)",
            summary.trades, summary.no_trades
        );
        Ok(analyses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::data::{Money, OptionChain};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn empty_input(ticker: &str, price: Money) -> TickerInput {
        let chain = OptionChain::new(NaiveDate::from_ymd_opt(2024, 7, 19).unwrap());
        TickerInput::new(ticker, price, chain)
    }

    #[test]
    fn test_batch_keeps_order_and_isolates_failures() {
        let engine = Engine::new(EngineConfig::default()).unwrap();
        let inputs: Vec<TickerInput> = (0..12)
            .map(|i| {
                let price = if i % 3 == 0 { dec!(0) } else { dec!(50) };
                empty_input(&format!("T{i:02}"), Money::usd(price))
            })
            .collect();

        let analyses = engine.analyze_batch(&inputs).unwrap();
        let tickers: Vec<&str> = analyses.iter().map(|a| a.ticker.as_str()).collect();
        let expected: Vec<&str> = inputs.iter().map(|i| i.ticker.as_str()).collect();
        assert_eq!(tickers, expected);

        let summary = BatchSummary::from_analyses(&analyses);
        assert_eq!(summary.tickers, 12);
        assert_eq!(summary.trades, 0);
        assert_eq!(summary.by_reason.get(&ReasonCode::InvalidData), Some(&4));
        // No straddle to derive an implied move from
        assert_eq!(summary.by_reason.get(&ReasonCode::NoStrikesAvailable), Some(&8));
    }
}
