//! Core market data types consumed by the engine.
//!
//! Collaborators hand these over already fetched and validated. The option
//! chain keeps calls and puts in separate strike-keyed maps: a strike listed
//! for calls is not guaranteed to exist for puts, so legs of one option type
//! are only ever selected from that type's side.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

use super::money::Money;

/// Option type (call or put).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    Call,
    Put,
}

impl OptionType {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "C" | "CALL" => Some(Self::Call),
            "P" | "PUT" => Some(Self::Put),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Call => "call",
            Self::Put => "put",
        }
    }
}

/// Directional bias, from skew, sentiment, or their reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Bullish,
    Bearish,
    Neutral,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bullish => "BULLISH",
            Self::Bearish => "BEARISH",
            Self::Neutral => "NEUTRAL",
        }
    }
}

/// Per-share Greeks for an option contract.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Greeks {
    pub delta: f64,
    pub theta: f64,
    pub vega: f64,
}

impl Greeks {
    pub fn new(delta: f64, theta: f64, vega: f64) -> Self {
        Self { delta, theta, vega }
    }
}

/// A single option quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionQuote {
    pub option_type: OptionType,
    pub strike: Money,
    pub bid: Money,
    pub ask: Money,
    pub open_interest: u64,
    #[serde(default)]
    pub implied_volatility: Option<f64>,
    #[serde(default)]
    pub greeks: Option<Greeks>,
}

impl OptionQuote {
    pub fn new(option_type: OptionType, strike: Money, bid: Money, ask: Money, open_interest: u64) -> Self {
        Self {
            option_type,
            strike,
            bid,
            ask,
            open_interest,
            implied_volatility: None,
            greeks: None,
        }
    }

    pub fn with_iv(mut self, iv: f64) -> Self {
        self.implied_volatility = Some(iv);
        self
    }

    pub fn with_greeks(mut self, greeks: Greeks) -> Self {
        self.greeks = Some(greeks);
        self
    }

    /// Mid price, `(bid + ask) / 2`.
    pub fn mid(&self) -> Decimal {
        (self.bid.amount + self.ask.amount) / Decimal::TWO
    }

    /// Bid-ask spread as a percentage of mid. `None` when mid is not positive.
    pub fn spread_pct(&self) -> Option<f64> {
        let mid = self.mid();
        if mid <= Decimal::ZERO {
            return None;
        }
        ((self.ask.amount - self.bid.amount) / mid * Decimal::ONE_HUNDRED).to_f64()
    }

    fn validate(&self) -> EngineResult<()> {
        if !self.strike.is_positive() {
            return Err(EngineError::invalid(format!(
                "{} strike must be positive, got {}",
                self.option_type.as_str(),
                self.strike
            )));
        }
        if self.bid.currency != self.strike.currency || self.ask.currency != self.strike.currency {
            return Err(EngineError::invalid("quote mixes currencies"));
        }
        if self.bid.amount < Decimal::ZERO || self.ask.amount < self.bid.amount {
            return Err(EngineError::invalid(format!(
                "{} {} has crossed or negative market: bid {} ask {}",
                self.option_type.as_str(),
                self.strike.amount,
                self.bid.amount,
                self.ask.amount
            )));
        }
        Ok(())
    }
}

/// One side (calls or puts) of a chain, keyed by strike.
#[derive(Debug, Clone, PartialEq)]
pub struct SideChain {
    option_type: OptionType,
    quotes: BTreeMap<Decimal, OptionQuote>,
}

impl SideChain {
    pub fn new(option_type: OptionType) -> Self {
        Self {
            option_type,
            quotes: BTreeMap::new(),
        }
    }

    pub fn option_type(&self) -> OptionType {
        self.option_type
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    /// Strikes listed on this side, ascending.
    pub fn strikes(&self) -> impl Iterator<Item = Decimal> + '_ {
        self.quotes.keys().copied()
    }

    pub fn quotes(&self) -> impl Iterator<Item = &OptionQuote> {
        self.quotes.values()
    }

    pub fn get(&self, strike: Decimal) -> Option<&OptionQuote> {
        self.quotes.get(&strike)
    }

    pub fn contains(&self, strike: Decimal) -> bool {
        self.quotes.contains_key(&strike)
    }

    /// Look up a leg. A strike missing from this side is a generation
    /// failure, never a silent miss.
    pub fn quote(&self, strike: Decimal) -> EngineResult<&OptionQuote> {
        self.quotes.get(&strike).ok_or_else(|| {
            EngineError::NoStrikesAvailable(format!(
                "strike {} is not listed on the {} side",
                strike,
                self.option_type.as_str()
            ))
        })
    }

    /// Strike closest to `target`. Ties go to the lower strike.
    pub fn nearest(&self, target: Decimal) -> Option<&OptionQuote> {
        closest(self.quotes.values(), target, true)
    }

    /// Strike closest to `target` among strikes strictly below `ceiling`.
    /// Ties go to the lower (further out-of-the-money for puts) strike.
    pub fn nearest_below(&self, target: Decimal, ceiling: Decimal) -> Option<&OptionQuote> {
        closest(self.quotes.range(..ceiling).map(|(_, q)| q), target, true)
    }

    /// Strike closest to `target` among strikes strictly above `floor`.
    /// Ties go to the higher (further out-of-the-money for calls) strike.
    pub fn nearest_above(&self, target: Decimal, floor: Decimal) -> Option<&OptionQuote> {
        let above = self
            .quotes
            .range(floor..)
            .filter(move |(strike, _)| **strike > floor)
            .map(|(_, q)| q);
        closest(above, target, false)
    }

    fn insert(&mut self, quote: OptionQuote) -> EngineResult<()> {
        if quote.option_type != self.option_type {
            return Err(EngineError::invalid(format!(
                "{} quote inserted into {} side",
                quote.option_type.as_str(),
                self.option_type.as_str()
            )));
        }
        quote.validate()?;
        match self.quotes.entry(quote.strike.amount) {
            Entry::Occupied(existing) => Err(EngineError::invalid(format!(
                "{} strike {} listed twice",
                self.option_type.as_str(),
                existing.key()
            ))),
            Entry::Vacant(slot) => {
                slot.insert(quote);
                Ok(())
            }
        }
    }
}

fn closest<'a>(
    quotes: impl Iterator<Item = &'a OptionQuote>,
    target: Decimal,
    prefer_lower: bool,
) -> Option<&'a OptionQuote> {
    let mut best: Option<(&OptionQuote, Decimal)> = None;
    for quote in quotes {
        let distance = (quote.strike.amount - target).abs();
        best = match best {
            None => Some((quote, distance)),
            Some((_, best_distance)) if distance < best_distance => Some((quote, distance)),
            Some((_, best_distance)) if distance == best_distance && !prefer_lower => {
                Some((quote, distance))
            }
            keep => keep,
        };
    }
    best.map(|(quote, _)| quote)
}

/// All options for a single expiration, calls and puts kept apart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ChainRecord", into = "ChainRecord")]
pub struct OptionChain {
    pub expiration: NaiveDate,
    calls: SideChain,
    puts: SideChain,
}

impl OptionChain {
    pub fn new(expiration: NaiveDate) -> Self {
        Self {
            expiration,
            calls: SideChain::new(OptionType::Call),
            puts: SideChain::new(OptionType::Put),
        }
    }

    pub fn from_quotes(
        expiration: NaiveDate,
        quotes: impl IntoIterator<Item = OptionQuote>,
    ) -> EngineResult<Self> {
        let mut chain = Self::new(expiration);
        for quote in quotes {
            chain.add_quote(quote)?;
        }
        Ok(chain)
    }

    /// Add a quote to the appropriate side.
    pub fn add_quote(&mut self, quote: OptionQuote) -> EngineResult<()> {
        match quote.option_type {
            OptionType::Call => self.calls.insert(quote),
            OptionType::Put => self.puts.insert(quote),
        }
    }

    pub fn side(&self, option_type: OptionType) -> &SideChain {
        match option_type {
            OptionType::Call => &self.calls,
            OptionType::Put => &self.puts,
        }
    }

    pub fn calls(&self) -> &SideChain {
        &self.calls
    }

    pub fn puts(&self) -> &SideChain {
        &self.puts
    }

    /// Strikes listed on both sides, ascending.
    pub fn common_strikes(&self) -> Vec<Decimal> {
        self.puts
            .strikes()
            .filter(|strike| self.calls.contains(*strike))
            .collect()
    }

    pub fn total_quotes(&self) -> usize {
        self.calls.len() + self.puts.len()
    }
}

/// Flat serialized form of an [`OptionChain`].
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChainRecord {
    expiration: NaiveDate,
    quotes: Vec<OptionQuote>,
}

impl TryFrom<ChainRecord> for OptionChain {
    type Error = EngineError;

    fn try_from(record: ChainRecord) -> Result<Self, Self::Error> {
        OptionChain::from_quotes(record.expiration, record.quotes)
    }
}

impl From<OptionChain> for ChainRecord {
    fn from(chain: OptionChain) -> Self {
        let OptionChain {
            expiration,
            calls,
            puts,
        } = chain;
        let quotes = calls
            .quotes
            .into_values()
            .chain(puts.quotes.into_values())
            .collect();
        Self { expiration, quotes }
    }
}

/// A past earnings reaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalMove {
    pub ticker: String,
    pub earnings_date: NaiveDate,
    /// Signed close-to-close move, in percent.
    pub move_pct: f64,
}

impl HistoricalMove {
    pub fn magnitude(&self) -> f64 {
        self.move_pct.abs()
    }

    /// Unsigned move sizes for the VRP calculator.
    pub fn magnitudes(moves: &[HistoricalMove]) -> Vec<f64> {
        moves.iter().map(Self::magnitude).collect()
    }
}

/// Open interest and spread for the options a trade would touch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LiquiditySnapshot {
    pub open_interest: u64,
    /// Bid-ask spread as a percentage of mid.
    pub spread_pct: f64,
}

impl LiquiditySnapshot {
    pub fn new(open_interest: u64, spread_pct: f64) -> Self {
        Self {
            open_interest,
            spread_pct,
        }
    }

    /// Snapshot for one quote. A quote with no positive mid gets an
    /// infinite spread.
    pub fn from_quote(quote: &OptionQuote) -> Self {
        Self {
            open_interest: quote.open_interest,
            spread_pct: quote.spread_pct().unwrap_or(f64::INFINITY),
        }
    }

    /// Worst-case combination of several quotes: the thinnest open interest
    /// and the widest spread.
    pub fn worst_of<'a>(quotes: impl IntoIterator<Item = &'a OptionQuote>) -> Option<Self> {
        quotes
            .into_iter()
            .map(Self::from_quote)
            .reduce(|a, b| Self {
                open_interest: a.open_interest.min(b.open_interest),
                spread_pct: a.spread_pct.max(b.spread_pct),
            })
    }
}

/// One weighted contributor to the sentiment score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentSource {
    pub name: String,
    pub score: f64,
    pub weight: f64,
}

/// External sentiment, -1 (bearish) to +1 (bullish).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SentimentSignal {
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub sources: Vec<SentimentSource>,
    /// Supporting text for reports; not used in any computation.
    #[serde(default)]
    pub summary: Option<String>,
}

impl SentimentSignal {
    pub fn new(score: f64) -> Self {
        Self {
            score,
            ..Default::default()
        }
    }

    /// Weighted mean of the sub-sources, or `score` when there are none.
    /// Always in [-1, 1]; non-finite inputs collapse to 0.
    pub fn composite(&self) -> f64 {
        let usable: Vec<&SentimentSource> = self
            .sources
            .iter()
            .filter(|s| s.score.is_finite() && s.weight.is_finite() && s.weight > 0.0)
            .collect();

        let raw = if usable.is_empty() {
            self.score
        } else {
            let total_weight: f64 = usable.iter().map(|s| s.weight).sum();
            usable.iter().map(|s| s.score * s.weight).sum::<f64>() / total_weight
        };

        if raw.is_finite() {
            raw.clamp(-1.0, 1.0)
        } else {
            0.0
        }
    }
}
