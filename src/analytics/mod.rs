//! Pre-trade analytics.
//!
//! Provides:
//! - VRP ratio and tier (implied move vs. historical earnings moves)
//! - Liquidity tier classification (open interest and spread)
//! - Direction resolution (skew bias reconciled with sentiment)
//! - Skew-derived directional bias
//! - Implied move from the ATM straddle

pub mod direction;
pub mod implied_move;
pub mod liquidity;
pub mod skew;
pub mod vrp;

pub use direction::{resolve_direction, DirectionConfig, SentimentBucket};
pub use implied_move::{implied_move_from_straddle, ImpliedMove};
pub use liquidity::{
    classify, classify_legs, classify_open_interest, classify_spread, LiquidityAssessment,
    LiquidityConfig, LiquidityTier, RejectPolicy,
};
pub use skew::{skew_bias, SkewConfig, SkewReading};
pub use vrp::{calculate_vrp, VrpResult, VrpThresholds, VrpTier, MIN_HISTORICAL_SAMPLES};

use rust_decimal::Decimal;

use crate::error::{EngineError, EngineResult};

/// `pct` percent of `amount`.
pub(crate) fn percent_of(amount: Decimal, pct: f64) -> EngineResult<Decimal> {
    if !pct.is_finite() {
        return Err(EngineError::invalid(format!("percentage is not finite: {pct}")));
    }
    let pct = Decimal::try_from(pct)
        .map_err(|_| EngineError::invalid(format!("percentage out of range: {pct}")))?;
    amount
        .checked_mul(pct)
        .map(|v| v / Decimal::ONE_HUNDRED)
        .ok_or_else(|| EngineError::invalid("percentage of amount overflowed"))
}
