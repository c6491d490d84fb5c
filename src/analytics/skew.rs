//! Volatility-skew directional bias.
//!
//! Compares implied volatility of an out-of-the-money put and call, each
//! roughly one implied move away from the price:
//! - puts richer than calls by more than the threshold: BEARISH
//! - calls richer than puts by more than the threshold: BULLISH
//! - otherwise NEUTRAL
//!
//! Each leg comes from its own side of the chain.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::data::{Direction, Money, OptionChain, OptionQuote};
use crate::error::{EngineError, EngineResult};

use super::percent_of;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkewConfig {
    /// Distance of the sampled strikes from price, in implied moves.
    pub otm_move_multiple: f64,
    /// Put IV minus call IV (decimal vol) needed to call a bias.
    pub skew_threshold: f64,
}

impl Default for SkewConfig {
    fn default() -> Self {
        Self {
            otm_move_multiple: 1.0,
            skew_threshold: 0.02,
        }
    }
}

impl SkewConfig {
    pub fn validate(&self) -> EngineResult<()> {
        if !self.otm_move_multiple.is_finite() || self.otm_move_multiple <= 0.0 {
            return Err(EngineError::config("otm_move_multiple must be positive"));
        }
        if !self.skew_threshold.is_finite() || self.skew_threshold < 0.0 {
            return Err(EngineError::config("skew_threshold must be non-negative"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkewReading {
    pub put_strike: Decimal,
    pub call_strike: Decimal,
    pub put_iv: f64,
    pub call_iv: f64,
    /// put IV - call IV
    pub skew: f64,
    pub bias: Direction,
}

fn iv_of(quote: &OptionQuote) -> EngineResult<f64> {
    match quote.implied_volatility {
        Some(iv) if iv.is_finite() && iv > 0.0 => Ok(iv),
        _ => Err(EngineError::invalid(format!(
            "{} {} has no usable implied volatility",
            quote.option_type.as_str(),
            quote.strike.amount
        ))),
    }
}

pub fn skew_bias(
    price: &Money,
    chain: &OptionChain,
    implied_move_pct: f64,
    config: &SkewConfig,
) -> EngineResult<SkewReading> {
    if !price.is_positive() {
        return Err(EngineError::invalid(format!(
            "stock price must be positive, got {price}"
        )));
    }

    let offset = percent_of(price.amount, implied_move_pct * config.otm_move_multiple)?;
    let put = chain
        .puts()
        .nearest_below(price.amount - offset, price.amount)
        .ok_or_else(|| EngineError::NoStrikesAvailable("no OTM put to sample skew".to_string()))?;
    let call = chain
        .calls()
        .nearest_above(price.amount + offset, price.amount)
        .ok_or_else(|| EngineError::NoStrikesAvailable("no OTM call to sample skew".to_string()))?;

    let put_iv = iv_of(put)?;
    let call_iv = iv_of(call)?;
    let skew = put_iv - call_iv;

    let bias = if skew > config.skew_threshold {
        Direction::Bearish
    } else if skew < -config.skew_threshold {
        Direction::Bullish
    } else {
        Direction::Neutral
    };

    Ok(SkewReading {
        put_strike: put.strike.amount,
        call_strike: call.strike.amount,
        put_iv,
        call_iv,
        skew,
        bias,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::OptionType;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn chain(put_iv: f64, call_iv: f64) -> OptionChain {
        let q = |t, k| {
            OptionQuote::new(
                t,
                Money::usd(k),
                Money::usd(dec!(1.00)),
                Money::usd(dec!(1.10)),
                500,
            )
        };
        OptionChain::from_quotes(
            NaiveDate::from_ymd_opt(2024, 7, 19).unwrap(),
            vec![
                q(OptionType::Put, dec!(90)).with_iv(put_iv),
                q(OptionType::Put, dec!(95)).with_iv(put_iv),
                q(OptionType::Call, dec!(105)).with_iv(call_iv),
                q(OptionType::Call, dec!(110)).with_iv(call_iv),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_put_premium_is_bearish() {
        let reading =
            skew_bias(&Money::usd(dec!(100)), &chain(0.60, 0.50), 5.0, &SkewConfig::default())
                .unwrap();
        assert_eq!(reading.put_strike, dec!(95));
        assert_eq!(reading.call_strike, dec!(105));
        assert_eq!(reading.bias, Direction::Bearish);
    }

    #[test]
    fn test_call_premium_is_bullish() {
        let reading =
            skew_bias(&Money::usd(dec!(100)), &chain(0.45, 0.55), 5.0, &SkewConfig::default())
                .unwrap();
        assert_eq!(reading.bias, Direction::Bullish);
    }

    #[test]
    fn test_flat_skew_is_neutral() {
        let reading =
            skew_bias(&Money::usd(dec!(100)), &chain(0.51, 0.50), 5.0, &SkewConfig::default())
                .unwrap();
        assert_eq!(reading.bias, Direction::Neutral);
    }

    #[test]
    fn test_missing_iv_is_error() {
        let mut c = chain(0.5, 0.5);
        c.add_quote(OptionQuote::new(
            OptionType::Put,
            Money::usd(dec!(94)),
            Money::usd(dec!(1.00)),
            Money::usd(dec!(1.10)),
            500,
        ))
        .unwrap();
        let err = skew_bias(&Money::usd(dec!(100)), &c, 6.0, &SkewConfig::default()).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidData);
    }
}
