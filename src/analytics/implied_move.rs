//! One-sided implied move from the at-the-money straddle.
//!
//! implied move % = (ATM call mid + ATM put mid) / price * 100
//!
//! The ATM strike must be listed on both sides of the chain.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::data::{Money, OptionChain};
use crate::error::{EngineError, EngineResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpliedMove {
    pub atm_strike: Decimal,
    /// Straddle mid, per share.
    pub straddle: Money,
    pub implied_move_pct: f64,
}

pub fn implied_move_from_straddle(price: &Money, chain: &OptionChain) -> EngineResult<ImpliedMove> {
    if !price.is_positive() {
        return Err(EngineError::invalid(format!(
            "stock price must be positive, got {price}"
        )));
    }

    let atm_strike = chain
        .common_strikes()
        .into_iter()
        .min_by_key(|strike| (*strike - price.amount).abs())
        .ok_or_else(|| {
            EngineError::NoStrikesAvailable("no strike is listed for both calls and puts".to_string())
        })?;

    let call = chain.calls().quote(atm_strike)?;
    let put = chain.puts().quote(atm_strike)?;
    let straddle = call.mid() + put.mid();

    if straddle <= Decimal::ZERO {
        return Err(EngineError::invalid(format!(
            "ATM straddle at {atm_strike} has no value"
        )));
    }

    let implied_move_pct = (straddle / price.amount * Decimal::ONE_HUNDRED)
        .to_f64()
        .ok_or_else(|| EngineError::invalid("implied move not representable"))?;

    Ok(ImpliedMove {
        atm_strike,
        straddle: Money::new(straddle, price.currency),
        implied_move_pct,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{OptionQuote, OptionType};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn quote(option_type: OptionType, strike: Decimal, bid: Decimal, ask: Decimal) -> OptionQuote {
        OptionQuote::new(
            option_type,
            Money::usd(strike),
            Money::usd(bid),
            Money::usd(ask),
            1_000,
        )
    }

    #[test]
    fn test_straddle_implied_move() {
        let chain = OptionChain::from_quotes(
            NaiveDate::from_ymd_opt(2024, 7, 19).unwrap(),
            vec![
                quote(OptionType::Call, dec!(100), dec!(3.90), dec!(4.10)),
                quote(OptionType::Put, dec!(100), dec!(3.90), dec!(4.10)),
                quote(OptionType::Call, dec!(105), dec!(1.90), dec!(2.10)),
                quote(OptionType::Put, dec!(95), dec!(1.90), dec!(2.10)),
            ],
        )
        .unwrap();

        let result = implied_move_from_straddle(&Money::usd(dec!(101)), &chain).unwrap();
        assert_eq!(result.atm_strike, dec!(100));
        assert_eq!(result.straddle, Money::usd(dec!(8.00)));
        assert!((result.implied_move_pct - 7.9208).abs() < 0.001);
    }

    #[test]
    fn test_requires_common_strike() {
        let chain = OptionChain::from_quotes(
            NaiveDate::from_ymd_opt(2024, 7, 19).unwrap(),
            vec![
                quote(OptionType::Call, dec!(105), dec!(1.90), dec!(2.10)),
                quote(OptionType::Put, dec!(95), dec!(1.90), dec!(2.10)),
            ],
        )
        .unwrap();
        let err = implied_move_from_straddle(&Money::usd(dec!(100)), &chain).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::NoStrikesAvailable);
    }

    #[test]
    fn test_rejects_non_positive_price() {
        let chain = OptionChain::new(NaiveDate::from_ymd_opt(2024, 7, 19).unwrap());
        let err = implied_move_from_straddle(&Money::usd(dec!(0)), &chain).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidData);
    }
}
