//! Probability of profit at expiration.
//!
//! The post-earnings move is modelled as normal with standard deviation equal
//! to the one-sided implied move.
//!
//! - One-sided: P = Φ(d / m), d = breakeven distance from price (%), m = implied move (%)
//! - Two-sided: r = zone width (%) / (2 · m), P = 2Φ(r) − 1
//!
//! The expected range of a two-sided trade is 2 · m, so a zone exactly as wide
//! as the expected range has r = 1.

use std::f64::consts::SQRT_2;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use statrs::function::erf::erfc;

use crate::error::{EngineError, EngineResult};

use super::types::ProfitZone;

/// Standard normal CDF, Φ(x) = erfc(−x / √2) / 2.
pub fn norm_cdf(x: f64) -> f64 {
    0.5 * erfc(-x / SQRT_2)
}

/// Profit zone width relative to the full expected range (2 × implied move).
pub fn width_to_range_ratio(width_pct: f64, implied_move_pct: f64) -> f64 {
    width_pct / (2.0 * implied_move_pct)
}

/// POP for a single-breakeven trade. `distance_pct` is positive when the
/// breakeven sits on the profitable side of the current price.
pub fn one_sided_pop(distance_pct: f64, implied_move_pct: f64) -> f64 {
    clamp_probability(norm_cdf(distance_pct / implied_move_pct))
}

/// POP for a range trade, treating the zone as centered on the price.
pub fn two_sided_pop(width_to_range_ratio: f64) -> f64 {
    if width_to_range_ratio <= 0.0 {
        return 0.0;
    }
    clamp_probability(2.0 * norm_cdf(width_to_range_ratio) - 1.0)
}

fn clamp_probability(p: f64) -> f64 {
    if p.is_nan() {
        0.0
    } else {
        p.clamp(0.0, 1.0)
    }
}

/// Signed distance from `price` to `level` as a percent of price.
pub fn distance_pct(price: Decimal, level: Decimal) -> EngineResult<f64> {
    if price <= Decimal::ZERO {
        return Err(EngineError::invalid(format!("price must be positive, got {price}")));
    }
    ((level - price) / price * Decimal::ONE_HUNDRED)
        .to_f64()
        .ok_or_else(|| EngineError::invalid("distance not representable as f64"))
}

/// Zone between two breakevens measured against `implied_move_pct`.
pub fn profit_zone(
    price: Decimal,
    lower_breakeven: Decimal,
    upper_breakeven: Decimal,
    implied_move_pct: f64,
) -> EngineResult<ProfitZone> {
    if upper_breakeven <= lower_breakeven {
        return Err(EngineError::invalid(format!(
            "breakevens do not bound a zone: {lower_breakeven} .. {upper_breakeven}"
        )));
    }
    let width_pct = distance_pct(price, upper_breakeven)? - distance_pct(price, lower_breakeven)?;
    let expected_range_pct = 2.0 * implied_move_pct;
    Ok(ProfitZone {
        lower_breakeven,
        upper_breakeven,
        width_pct,
        expected_range_pct,
        width_to_range_ratio: width_to_range_ratio(width_pct, implied_move_pct),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_norm_cdf() {
        assert!((norm_cdf(0.0) - 0.5).abs() < 1e-12);
        assert!((norm_cdf(1.0) - 0.841_344_746).abs() < 1e-6);
        assert!((norm_cdf(-1.0) - 0.158_655_254).abs() < 1e-6);
    }

    #[test]
    fn test_norm_cdf_matches_statrs_normal() {
        use statrs::distribution::{ContinuousCDF, Normal};

        let normal = Normal::new(0.0, 1.0).unwrap();
        for i in -40..=40 {
            let x = i as f64 / 10.0;
            assert!((norm_cdf(x) - normal.cdf(x)).abs() < 1e-12, "x = {x}");
        }
    }

    #[test]
    fn test_one_sided_pop() {
        // Breakeven one implied move out of the money
        assert!((one_sided_pop(5.0, 5.0) - 0.8413).abs() < 1e-3);
        // Breakeven at the money
        assert!((one_sided_pop(0.0, 5.0) - 0.5).abs() < 1e-12);
        // Breakeven on the losing side
        assert!(one_sided_pop(-2.0, 5.0) < 0.5);
    }

    #[test]
    fn test_ratio_uses_full_expected_range() {
        // 21.18% zone against a 15% one-sided move covers about 0.706 of the
        // 30% expected range, not 1.41.
        let ratio = width_to_range_ratio(21.18, 15.0);
        assert!((ratio - 0.706).abs() < 1e-3);

        let pop = two_sided_pop(ratio);
        assert!((pop - 0.52).abs() < 0.01);
        assert!(pop < two_sided_pop(21.18 / 15.0));
    }

    #[test]
    fn test_two_sided_bounds() {
        assert_eq!(two_sided_pop(0.0), 0.0);
        assert_eq!(two_sided_pop(-1.0), 0.0);
        assert!(two_sided_pop(10.0) <= 1.0);
        assert!((two_sided_pop(1.0) - 0.6827).abs() < 1e-3);
    }

    #[test]
    fn test_profit_zone() {
        let zone = profit_zone(dec!(100), dec!(90), dec!(110), 10.0).unwrap();
        assert!((zone.width_pct - 20.0).abs() < 1e-9);
        assert!((zone.expected_range_pct - 20.0).abs() < 1e-9);
        assert!((zone.width_to_range_ratio - 1.0).abs() < 1e-9);

        assert!(profit_zone(dec!(100), dec!(110), dec!(90), 10.0).is_err());
    }
}
