//! Strategy records produced by the generator.
//!
//! A `Strategy` is written in three phases: the generator builds it, the
//! scorer fills `score`, and the position sizer fills `sizing`. After that it
//! is read-only output.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::analytics::LiquidityTier;
use crate::data::{Greeks, Money, OptionQuote, OptionType, SideChain};
use crate::error::{EngineError, EngineResult};
use crate::risk::SizingResult;
use crate::scoring::ScoreBreakdown;

/// Shares per equity option contract.
pub const CONTRACT_MULTIPLIER: i64 = 100;

/// Closed set of strategies the engine builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyType {
    BullPutSpread,
    BearCallSpread,
    IronCondor,
    IronButterfly,
}

impl StrategyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BullPutSpread => "bull-put-spread",
            Self::BearCallSpread => "bear-call-spread",
            Self::IronCondor => "iron-condor",
            Self::IronButterfly => "iron-butterfly",
        }
    }

    /// Profits inside a range bounded by two breakevens.
    pub fn is_two_sided(&self) -> bool {
        match self {
            Self::BullPutSpread | Self::BearCallSpread => false,
            Self::IronCondor | Self::IronButterfly => true,
        }
    }

    pub fn leg_count(&self) -> usize {
        if self.is_two_sided() {
            4
        } else {
            2
        }
    }
}

impl std::fmt::Display for StrategyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A vertical credit spread: short one strike, long a further-OTM strike of
/// the same option type. Prices are per share.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpreadLeg {
    pub option_type: OptionType,
    pub short_strike: Decimal,
    pub long_strike: Decimal,
    /// Bid received for the short option.
    pub short_premium: Decimal,
    /// Ask paid for the long option.
    pub long_premium: Decimal,
    pub credit: Decimal,
    pub width: Decimal,
    #[serde(default)]
    pub short_greeks: Option<Greeks>,
    #[serde(default)]
    pub long_greeks: Option<Greeks>,
}

impl SpreadLeg {
    /// Build a spread from two strikes of one side of the chain.
    ///
    /// Both strikes are looked up on `side`; a strike only listed on the
    /// other side fails with `NoStrikesAvailable`.
    pub fn from_side<'a>(
        side: &'a SideChain,
        short_strike: Decimal,
        long_strike: Decimal,
    ) -> EngineResult<(SpreadLeg, [&'a OptionQuote; 2])> {
        let short = side.quote(short_strike)?;
        let long = side.quote(long_strike)?;
        let option_type = side.option_type();

        let long_is_further_otm = match option_type {
            OptionType::Put => long_strike < short_strike,
            OptionType::Call => long_strike > short_strike,
        };
        if !long_is_further_otm {
            return Err(EngineError::invalid(format!(
                "{} spread long strike {} is not beyond short strike {}",
                option_type.as_str(),
                long_strike,
                short_strike
            )));
        }

        let credit = short.bid.amount - long.ask.amount;
        let width = (short_strike - long_strike).abs();
        if credit <= Decimal::ZERO {
            return Err(EngineError::invalid(format!(
                "{} {}/{} spread has no credit ({})",
                option_type.as_str(),
                short_strike,
                long_strike,
                credit
            )));
        }
        if credit >= width {
            return Err(EngineError::invalid(format!(
                "{} {}/{} spread credit {} is not below width {}",
                option_type.as_str(),
                short_strike,
                long_strike,
                credit,
                width
            )));
        }

        let leg = SpreadLeg {
            option_type,
            short_strike,
            long_strike,
            short_premium: short.bid.amount,
            long_premium: long.ask.amount,
            credit,
            width,
            short_greeks: short.greeks,
            long_greeks: long.greeks,
        };
        Ok((leg, [short, long]))
    }

    /// Net Greeks per share: short leg negated, long leg as is.
    pub fn net_greeks(&self) -> Option<StrategyGreeks> {
        let short = self.short_greeks?;
        let long = self.long_greeks?;
        Some(StrategyGreeks {
            net_delta: long.delta - short.delta,
            net_theta: long.theta - short.theta,
            net_vega: long.vega - short.vega,
        })
    }
}

/// Legs of a strategy, one variant per strategy type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StrategyLegs {
    BullPutSpread { put: SpreadLeg },
    BearCallSpread { call: SpreadLeg },
    IronCondor { put: SpreadLeg, call: SpreadLeg },
    IronButterfly { put: SpreadLeg, call: SpreadLeg },
}

impl StrategyLegs {
    pub fn kind(&self) -> StrategyType {
        match self {
            Self::BullPutSpread { .. } => StrategyType::BullPutSpread,
            Self::BearCallSpread { .. } => StrategyType::BearCallSpread,
            Self::IronCondor { .. } => StrategyType::IronCondor,
            Self::IronButterfly { .. } => StrategyType::IronButterfly,
        }
    }

    pub fn put_spread(&self) -> Option<&SpreadLeg> {
        match self {
            Self::BullPutSpread { put }
            | Self::IronCondor { put, .. }
            | Self::IronButterfly { put, .. } => Some(put),
            Self::BearCallSpread { .. } => None,
        }
    }

    pub fn call_spread(&self) -> Option<&SpreadLeg> {
        match self {
            Self::BearCallSpread { call }
            | Self::IronCondor { call, .. }
            | Self::IronButterfly { call, .. } => Some(call),
            Self::BullPutSpread { .. } => None,
        }
    }

    pub fn spreads(&self) -> Vec<&SpreadLeg> {
        self.put_spread()
            .into_iter()
            .chain(self.call_spread())
            .collect()
    }
}

/// Breakeven prices at expiration, per share.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Breakevens {
    pub lower: Option<Decimal>,
    pub upper: Option<Decimal>,
}

/// Profit zone of a two-sided strategy, compared against the full expected
/// range (twice the one-sided implied move).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProfitZone {
    pub lower_breakeven: Decimal,
    pub upper_breakeven: Decimal,
    /// Breakeven-to-breakeven width as a percent of price.
    pub width_pct: f64,
    /// 2 x implied move, percent.
    pub expected_range_pct: f64,
    /// width_pct / expected_range_pct
    pub width_to_range_ratio: f64,
}

/// Net per-share Greeks across all legs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StrategyGreeks {
    pub net_delta: f64,
    pub net_theta: f64,
    pub net_vega: f64,
}

impl StrategyGreeks {
    pub fn combine(a: StrategyGreeks, b: StrategyGreeks) -> StrategyGreeks {
        StrategyGreeks {
            net_delta: a.net_delta + b.net_delta,
            net_theta: a.net_theta + b.net_theta,
            net_vega: a.net_vega + b.net_vega,
        }
    }
}

/// A fully specified candidate trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Strategy {
    pub ticker: String,
    pub expiration: NaiveDate,
    pub legs: StrategyLegs,
    /// Net credit per share.
    pub net_credit: Money,
    /// Per contract.
    pub max_profit: Money,
    /// Per contract.
    pub max_loss: Money,
    pub probability_of_profit: f64,
    pub breakevens: Breakevens,
    pub profit_zone: Option<ProfitZone>,
    pub greeks: Option<StrategyGreeks>,
    pub liquidity_tier: LiquidityTier,
    /// Kept despite REJECT liquidity; sized down.
    pub reduced_sizing: bool,
    pub score: Option<ScoreBreakdown>,
    pub sizing: Option<SizingResult>,
}

impl Strategy {
    pub fn kind(&self) -> StrategyType {
        self.legs.kind()
    }

    /// Max profit / max loss, 0 when either is not positive.
    pub fn reward_risk(&self) -> f64 {
        if !self.max_profit.is_positive() || !self.max_loss.is_positive() {
            return 0.0;
        }
        self.max_profit.checked_ratio(&self.max_loss).unwrap_or(0.0)
    }

    /// Final score, 0 before scoring.
    pub fn total_score(&self) -> f64 {
        self.score.as_ref().map(|s| s.total).unwrap_or(0.0)
    }

    pub fn contracts(&self) -> u32 {
        self.sizing.as_ref().map(|s| s.contracts).unwrap_or(0)
    }

    /// Short strikes joined with long strikes, e.g. `95/90` or `95/90 105/110`.
    pub fn strikes_label(&self) -> String {
        self.legs
            .spreads()
            .iter()
            .map(|s| format!("{}/{}", s.short_strike.normalize(), s.long_strike.normalize()))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{OptionChain, OptionQuote};
    use rust_decimal_macros::dec;

    fn put(strike: Decimal, bid: Decimal, ask: Decimal, greeks: Greeks) -> OptionQuote {
        OptionQuote::new(
            OptionType::Put,
            Money::usd(strike),
            Money::usd(bid),
            Money::usd(ask),
            1_000,
        )
        .with_greeks(greeks)
    }

    fn chain() -> OptionChain {
        OptionChain::from_quotes(
            NaiveDate::from_ymd_opt(2024, 7, 19).unwrap(),
            vec![
                put(dec!(95), dec!(2.50), dec!(2.60), Greeks::new(-0.30, -0.20, 0.10)),
                put(dec!(90), dec!(1.00), dec!(1.10), Greeks::new(-0.15, -0.12, 0.07)),
                OptionQuote::new(
                    OptionType::Call,
                    Money::usd(dec!(92.5)),
                    Money::usd(dec!(9.00)),
                    Money::usd(dec!(9.20)),
                    1_000,
                ),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_spread_from_side() {
        let chain = chain();
        let (leg, [short, long]) = SpreadLeg::from_side(chain.puts(), dec!(95), dec!(90)).unwrap();
        assert_eq!(leg.credit, dec!(1.40));
        assert_eq!(leg.width, dec!(5));
        assert_eq!(short.strike.amount, dec!(95));
        assert_eq!(long.strike.amount, dec!(90));

        let greeks = leg.net_greeks().unwrap();
        assert!((greeks.net_delta - 0.15).abs() < 1e-12);
        assert!((greeks.net_theta - 0.08).abs() < 1e-12);
        assert!((greeks.net_vega + 0.03).abs() < 1e-12);
    }

    #[test]
    fn test_call_only_strike_fails_put_leg() {
        let chain = chain();
        let err = SpreadLeg::from_side(chain.puts(), dec!(95), dec!(92.5)).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::NoStrikesAvailable);
    }

    #[test]
    fn test_inverted_spread_rejected() {
        let chain = chain();
        let err = SpreadLeg::from_side(chain.puts(), dec!(90), dec!(95)).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidData);
    }

    #[test]
    fn test_two_sided_classification() {
        assert!(!StrategyType::BullPutSpread.is_two_sided());
        assert!(!StrategyType::BearCallSpread.is_two_sided());
        assert!(StrategyType::IronCondor.is_two_sided());
        assert!(StrategyType::IronButterfly.is_two_sided());
        assert_eq!(StrategyType::IronCondor.leg_count(), 4);
        assert_eq!(StrategyType::IronCondor.to_string(), "iron-condor");
    }
}
