//! Per-ticker input bundle.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::money::Money;
use super::types::{Direction, HistoricalMove, LiquiditySnapshot, OptionChain, SentimentSignal};

/// Everything collaborators supply for one ticker's analysis.
///
/// Optional fields are derived from the chain when absent: the implied move
/// from the ATM straddle, the skew bias from OTM put/call IV, and the
/// liquidity snapshot from the ATM quotes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickerInput {
    pub ticker: String,
    pub price: Money,
    pub expiration: NaiveDate,
    pub chain: OptionChain,
    /// One-sided implied move, percent.
    #[serde(default)]
    pub implied_move_pct: Option<f64>,
    #[serde(default)]
    pub historical_moves: Vec<HistoricalMove>,
    #[serde(default)]
    pub liquidity: Option<LiquiditySnapshot>,
    #[serde(default)]
    pub skew_bias: Option<Direction>,
    #[serde(default)]
    pub sentiment: Option<SentimentSignal>,
}

impl TickerInput {
    pub fn new(ticker: impl Into<String>, price: Money, chain: OptionChain) -> Self {
        Self {
            ticker: ticker.into(),
            price,
            expiration: chain.expiration,
            chain,
            implied_move_pct: None,
            historical_moves: Vec::new(),
            liquidity: None,
            skew_bias: None,
            sentiment: None,
        }
    }

    pub fn with_implied_move(mut self, implied_move_pct: f64) -> Self {
        self.implied_move_pct = Some(implied_move_pct);
        self
    }

    /// Attach past moves given as signed percentages.
    pub fn with_history(mut self, moves: impl IntoIterator<Item = (NaiveDate, f64)>) -> Self {
        let ticker = self.ticker.clone();
        self.historical_moves = moves
            .into_iter()
            .map(|(earnings_date, move_pct)| HistoricalMove {
                ticker: ticker.clone(),
                earnings_date,
                move_pct,
            })
            .collect();
        self
    }

    pub fn with_liquidity(mut self, snapshot: LiquiditySnapshot) -> Self {
        self.liquidity = Some(snapshot);
        self
    }

    pub fn with_skew_bias(mut self, bias: Direction) -> Self {
        self.skew_bias = Some(bias);
        self
    }

    pub fn with_sentiment(mut self, sentiment: SentimentSignal) -> Self {
        self.sentiment = Some(sentiment);
        self
    }

    /// Composite sentiment, 0 when none was supplied.
    pub fn sentiment_score(&self) -> f64 {
        self.sentiment.as_ref().map(SentimentSignal::composite).unwrap_or(0.0)
    }
}
