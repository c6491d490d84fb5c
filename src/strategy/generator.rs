//! Strategy generation from an option chain.
//!
//! Direction picks the strategy types:
//! - BULLISH: bull put spread
//! - BEARISH: bear call spread
//! - NEUTRAL: iron condor and iron butterfly
//!
//! Strikes are placed by implied-move distance from the price. Put legs are
//! always chosen from the puts side and call legs from the calls side.
//! Candidates that cannot be built are reported as rejections, not errors.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::analytics::{classify_legs, percent_of, LiquidityConfig, LiquidityTier, RejectPolicy};
use crate::data::{Direction, Money, MoneyError, OptionChain, OptionQuote};
use crate::error::{EngineError, EngineResult, ErrorKind};

use super::probability::{distance_pct, one_sided_pop, profit_zone, two_sided_pop};
use super::types::{
    Breakevens, SpreadLeg, Strategy, StrategyGreeks, StrategyLegs, StrategyType,
    CONTRACT_MULTIPLIER,
};

/// Strike placement and strategy toggles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    /// Short strike distance from price, in implied moves.
    pub short_strike_move_multiple: f64,
    /// Long strike (and butterfly wing) distance from price, in implied moves.
    pub long_strike_move_multiple: f64,
    pub enable_iron_condor: bool,
    pub enable_iron_butterfly: bool,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            short_strike_move_multiple: 1.0,
            long_strike_move_multiple: 1.5,
            enable_iron_condor: true,
            enable_iron_butterfly: true,
        }
    }
}

impl StrategyConfig {
    pub fn validate(&self) -> EngineResult<()> {
        let short = self.short_strike_move_multiple;
        let long = self.long_strike_move_multiple;
        if !short.is_finite() || short <= 0.0 {
            return Err(EngineError::config(format!(
                "short_strike_move_multiple must be positive, got {short}"
            )));
        }
        if !long.is_finite() || long <= short {
            return Err(EngineError::config(format!(
                "long_strike_move_multiple ({long}) must exceed short_strike_move_multiple ({short})"
            )));
        }
        if !self.enable_iron_condor && !self.enable_iron_butterfly {
            return Err(EngineError::config(
                "at least one neutral strategy (iron condor or iron butterfly) must be enabled",
            ));
        }
        Ok(())
    }

    /// Strategy types built for a direction.
    pub fn strategy_types(&self, direction: Direction) -> Vec<StrategyType> {
        match direction {
            Direction::Bullish => vec![StrategyType::BullPutSpread],
            Direction::Bearish => vec![StrategyType::BearCallSpread],
            Direction::Neutral => {
                let mut types = Vec::with_capacity(2);
                if self.enable_iron_condor {
                    types.push(StrategyType::IronCondor);
                }
                if self.enable_iron_butterfly {
                    types.push(StrategyType::IronButterfly);
                }
                types
            }
        }
    }
}

/// Everything the generator needs for one ticker.
#[derive(Debug, Clone, Copy)]
pub struct GenerationRequest<'a> {
    pub ticker: &'a str,
    pub price: &'a Money,
    pub chain: &'a OptionChain,
    /// One-sided, percent.
    pub implied_move_pct: f64,
    pub direction: Direction,
    /// Ticker-level tier from the liquidity snapshot.
    pub liquidity_tier: LiquidityTier,
    pub expiration: NaiveDate,
}

/// A strategy type that produced no candidate, and why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRejection {
    pub strategy: StrategyType,
    pub kind: ErrorKind,
    pub reason: String,
}

/// Generator output. An empty candidate list is a normal outcome.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Generation {
    pub candidates: Vec<Strategy>,
    pub rejections: Vec<CandidateRejection>,
}

impl Generation {
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Why no candidate survived, or `None` if some did.
    ///
    /// The recorded kinds are ranked liquidity exclusion first, then bad data,
    /// then a sparse chain. With no recorded cause the chain is treated as
    /// too sparse.
    pub fn empty_reason(&self) -> Option<ErrorKind> {
        if !self.candidates.is_empty() {
            return None;
        }
        let kind = self
            .rejections
            .iter()
            .map(|r| r.kind)
            .min_by_key(|kind| empty_reason_rank(*kind))
            .unwrap_or(ErrorKind::NoStrikesAvailable);
        Some(kind)
    }

    fn reject(&mut self, strategy: StrategyType, kind: ErrorKind, reason: impl Into<String>) {
        self.rejections.push(CandidateRejection {
            strategy,
            kind,
            reason: reason.into(),
        });
    }
}

fn empty_reason_rank(kind: ErrorKind) -> u8 {
    match kind {
        ErrorKind::NoLiquidCandidates => 0,
        ErrorKind::InvalidData => 1,
        ErrorKind::OutOfRange => 2,
        ErrorKind::InsufficientData => 3,
        ErrorKind::ConfigurationError => 4,
        ErrorKind::NoStrikesAvailable => 5,
    }
}

/// Builds unscored, unsized candidates.
#[derive(Debug, Clone)]
pub struct StrategyGenerator {
    config: StrategyConfig,
    liquidity: LiquidityConfig,
}

impl StrategyGenerator {
    pub fn new(config: StrategyConfig, liquidity: LiquidityConfig) -> Self {
        Self { config, liquidity }
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    pub fn generate(&self, request: &GenerationRequest<'_>) -> Generation {
        let mut generation = Generation::default();
        let types = self.config.strategy_types(request.direction);

        if let Err(err) = validate_request(request) {
            for kind in types {
                generation.reject(kind, err.kind(), err.to_string());
            }
            return generation;
        }

        let policy = self.liquidity.reject_policy;
        if request.liquidity_tier.is_reject() && policy == RejectPolicy::Exclude {
            for kind in types {
                generation.reject(
                    kind,
                    ErrorKind::NoLiquidCandidates,
                    format!("{} ticker liquidity is REJECT", request.ticker),
                );
            }
            return generation;
        }

        for kind in types {
            let mut strategy = match self.build(kind, request) {
                Ok(strategy) => strategy,
                Err(err) => {
                    debug!("{}: {} not built ({})", request.ticker, kind, err);
                    generation.reject(kind, err.kind(), err.to_string());
                    continue;
                }
            };

            if strategy.liquidity_tier.is_reject() {
                match policy {
                    RejectPolicy::Exclude => {
                        debug!("{}: {} excluded for liquidity", request.ticker, kind);
                        generation.reject(
                            kind,
                            ErrorKind::NoLiquidCandidates,
                            format!("{} {} legs are REJECT liquidity", kind, strategy.strikes_label()),
                        );
                        continue;
                    }
                    RejectPolicy::Penalize => strategy.reduced_sizing = true,
                }
            }
            generation.candidates.push(strategy);
        }

        generation
    }

    fn build(&self, kind: StrategyType, request: &GenerationRequest<'_>) -> EngineResult<Strategy> {
        let price = request.price.amount;
        let short_offset = percent_of(
            price,
            request.implied_move_pct * self.config.short_strike_move_multiple,
        )?;
        let long_offset = percent_of(
            price,
            request.implied_move_pct * self.config.long_strike_move_multiple,
        )?;

        match kind {
            StrategyType::BullPutSpread => {
                let (put, quotes) = put_spread(request, short_offset, long_offset)?;
                self.assemble(request, StrategyLegs::BullPutSpread { put }, &quotes)
            }
            StrategyType::BearCallSpread => {
                let (call, quotes) = call_spread(request, short_offset, long_offset)?;
                self.assemble(request, StrategyLegs::BearCallSpread { call }, &quotes)
            }
            StrategyType::IronCondor => {
                let (put, put_quotes) = put_spread(request, short_offset, long_offset)?;
                let (call, call_quotes) = call_spread(request, short_offset, long_offset)?;
                let quotes = [put_quotes[0], put_quotes[1], call_quotes[0], call_quotes[1]];
                self.assemble(request, StrategyLegs::IronCondor { put, call }, &quotes)
            }
            StrategyType::IronButterfly => {
                let (put, call, quotes) = butterfly(request, long_offset)?;
                self.assemble(request, StrategyLegs::IronButterfly { put, call }, &quotes)
            }
        }
    }

    fn assemble(
        &self,
        request: &GenerationRequest<'_>,
        legs: StrategyLegs,
        quotes: &[&OptionQuote],
    ) -> EngineResult<Strategy> {
        let currency = request.price.currency;
        let spreads = legs.spreads();

        let credit: Decimal = spreads.iter().map(|s| s.credit).sum();
        let widest = spreads
            .iter()
            .map(|s| s.width)
            .max()
            .unwrap_or(Decimal::ZERO);

        let net_credit = Money::new(credit, currency);
        let max_profit = net_credit.checked_mul_int(CONTRACT_MULTIPLIER)?;
        let max_loss = Money::new(widest, currency)
            .checked_sub(&net_credit)?
            .checked_mul_int(CONTRACT_MULTIPLIER)?;
        if !max_loss.is_positive() {
            return Err(EngineError::invalid(format!(
                "{} credit {} covers the widest wing {}",
                legs.kind(),
                credit,
                widest
            )));
        }

        let breakevens = Breakevens {
            lower: legs.put_spread().map(|p| p.short_strike - credit),
            upper: legs.call_spread().map(|c| c.short_strike + credit),
        };

        let price = request.price.amount;
        let implied = request.implied_move_pct;
        let (probability_of_profit, zone) = match (breakevens.lower, breakevens.upper) {
            (Some(lower), Some(upper)) => {
                let zone = profit_zone(price, lower, upper, implied)?;
                (two_sided_pop(zone.width_to_range_ratio), Some(zone))
            }
            (Some(lower), None) => (one_sided_pop(-distance_pct(price, lower)?, implied), None),
            (None, Some(upper)) => (one_sided_pop(distance_pct(price, upper)?, implied), None),
            (None, None) => return Err(EngineError::invalid("strategy has no breakeven")),
        };

        let greeks = spreads
            .iter()
            .map(|s| s.net_greeks())
            .collect::<Option<Vec<_>>>()
            .map(|all| all.into_iter().fold(StrategyGreeks::default(), StrategyGreeks::combine));

        let leg_tier = classify_legs(quotes.iter().copied(), &self.liquidity);

        Ok(Strategy {
            ticker: request.ticker.to_string(),
            expiration: request.expiration,
            legs,
            net_credit,
            max_profit,
            max_loss,
            probability_of_profit,
            breakevens,
            profit_zone: zone,
            greeks,
            liquidity_tier: request.liquidity_tier.min(leg_tier),
            reduced_sizing: false,
            score: None,
            sizing: None,
        })
    }
}

fn validate_request(request: &GenerationRequest<'_>) -> EngineResult<()> {
    if !request.price.is_positive() {
        return Err(EngineError::invalid(format!(
            "stock price must be positive, got {}",
            request.price
        )));
    }
    let implied = request.implied_move_pct;
    if !implied.is_finite() || implied <= 0.0 {
        return Err(EngineError::invalid(format!(
            "implied move must be positive, got {implied}"
        )));
    }
    let currency = request.price.currency;
    let chain = request.chain;
    if let Some(quote) = chain
        .puts()
        .quotes()
        .chain(chain.calls().quotes())
        .find(|q| q.strike.currency != currency)
    {
        return Err(MoneyError::CurrencyMismatch(
            currency.as_str(),
            quote.strike.currency.as_str(),
        )
        .into());
    }
    if request.expiration != request.chain.expiration {
        return Err(EngineError::invalid(format!(
            "chain expires {} but {} was requested",
            request.chain.expiration, request.expiration
        )));
    }
    Ok(())
}

/// Short put near `price - short_offset`, long put further out.
fn put_spread<'a>(
    request: &GenerationRequest<'a>,
    short_offset: Decimal,
    long_offset: Decimal,
) -> EngineResult<(SpreadLeg, [&'a OptionQuote; 2])> {
    let puts = request.chain.puts();
    let price = request.price.amount;
    let short = puts
        .nearest_below(price - short_offset, price)
        .ok_or_else(|| {
            EngineError::NoStrikesAvailable(format!("no out-of-the-money put below {price}"))
        })?
        .strike
        .amount;
    let long = puts
        .nearest_below(price - long_offset, short)
        .ok_or_else(|| EngineError::NoStrikesAvailable(format!("no put listed below {short}")))?
        .strike
        .amount;
    SpreadLeg::from_side(puts, short, long)
}

/// Short call near `price + short_offset`, long call further out.
fn call_spread<'a>(
    request: &GenerationRequest<'a>,
    short_offset: Decimal,
    long_offset: Decimal,
) -> EngineResult<(SpreadLeg, [&'a OptionQuote; 2])> {
    let calls = request.chain.calls();
    let price = request.price.amount;
    let short = calls
        .nearest_above(price + short_offset, price)
        .ok_or_else(|| {
            EngineError::NoStrikesAvailable(format!("no out-of-the-money call above {price}"))
        })?
        .strike
        .amount;
    let long = calls
        .nearest_above(price + long_offset, short)
        .ok_or_else(|| EngineError::NoStrikesAvailable(format!("no call listed above {short}")))?
        .strike
        .amount;
    SpreadLeg::from_side(calls, short, long)
}

/// Short straddle at the listed-on-both-sides strike nearest the price,
/// protected by wings `wing_offset` away.
fn butterfly<'a>(
    request: &GenerationRequest<'a>,
    wing_offset: Decimal,
) -> EngineResult<(SpreadLeg, SpreadLeg, [&'a OptionQuote; 4])> {
    let price = request.price.amount;
    let body = request
        .chain
        .common_strikes()
        .into_iter()
        .min_by(|a, b| (*a - price).abs().cmp(&(*b - price).abs()).then(a.cmp(b)))
        .ok_or_else(|| {
            EngineError::NoStrikesAvailable("no strike listed for both puts and calls".to_string())
        })?;

    let puts = request.chain.puts();
    let calls = request.chain.calls();
    let put_wing = puts
        .nearest_below(price - wing_offset, body)
        .ok_or_else(|| EngineError::NoStrikesAvailable(format!("no put wing below {body}")))?
        .strike
        .amount;
    let call_wing = calls
        .nearest_above(price + wing_offset, body)
        .ok_or_else(|| EngineError::NoStrikesAvailable(format!("no call wing above {body}")))?
        .strike
        .amount;

    let (put, [ps, pl]) = SpreadLeg::from_side(puts, body, put_wing)?;
    let (call, [cs, cl]) = SpreadLeg::from_side(calls, body, call_wing)?;
    Ok((put, call, [ps, pl, cs, cl]))
}
