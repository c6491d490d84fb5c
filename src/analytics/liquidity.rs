//! Liquidity tier classification.
//!
//! Two independent sub-tiers:
//! - open interest relative to the intended position size (5x / 2x / 1x)
//! - bid-ask spread as a percentage of mid (8% / 12% / 15%)
//!
//! The final tier is the worse of the two. Classification never fails:
//! degenerate input (zero position size, NaN spread) maps to REJECT.

use serde::{Deserialize, Serialize};

use crate::data::{LiquiditySnapshot, OptionQuote};
use crate::error::{EngineError, EngineResult};

/// Execution-quality tier. Ordered worst to best, so `min` picks the worse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LiquidityTier {
    Reject,
    Warning,
    Good,
    Excellent,
}

impl LiquidityTier {
    pub const ALL: [LiquidityTier; 4] = [
        LiquidityTier::Reject,
        LiquidityTier::Warning,
        LiquidityTier::Good,
        LiquidityTier::Excellent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reject => "REJECT",
            Self::Warning => "WARNING",
            Self::Good => "GOOD",
            Self::Excellent => "EXCELLENT",
        }
    }

    pub fn is_reject(&self) -> bool {
        matches!(self, Self::Reject)
    }
}

/// What the strategy generator does with REJECT-tier candidates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectPolicy {
    /// Drop the candidate.
    #[default]
    Exclude,
    /// Keep it, score it with zero liquidity points and size it down.
    Penalize,
}

impl RejectPolicy {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "exclude" | "strict" => Some(Self::Exclude),
            "penalize" | "relaxed" => Some(Self::Penalize),
            _ => None,
        }
    }
}

/// Liquidity breakpoints and policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiquidityConfig {
    /// Minimum OI / position size for EXCELLENT.
    pub oi_ratio_excellent: f64,
    /// Minimum OI / position size for GOOD.
    pub oi_ratio_good: f64,
    /// Minimum OI / position size for WARNING.
    pub oi_ratio_warning: f64,
    /// Maximum spread % for EXCELLENT.
    pub spread_pct_excellent: f64,
    /// Maximum spread % for GOOD.
    pub spread_pct_good: f64,
    /// Maximum spread % for WARNING.
    pub spread_pct_warning: f64,
    /// Contract count liquidity is judged against before sizing.
    pub intended_contracts: u32,
    pub reject_policy: RejectPolicy,
}

impl Default for LiquidityConfig {
    fn default() -> Self {
        Self {
            oi_ratio_excellent: 5.0,
            oi_ratio_good: 2.0,
            oi_ratio_warning: 1.0,
            spread_pct_excellent: 8.0,
            spread_pct_good: 12.0,
            spread_pct_warning: 15.0,
            intended_contracts: 10,
            reject_policy: RejectPolicy::Exclude,
        }
    }
}

impl LiquidityConfig {
    pub fn validate(&self) -> EngineResult<()> {
        let oi = [
            self.oi_ratio_excellent,
            self.oi_ratio_good,
            self.oi_ratio_warning,
        ];
        if oi.iter().any(|v| !v.is_finite() || *v <= 0.0)
            || !(self.oi_ratio_excellent > self.oi_ratio_good
                && self.oi_ratio_good > self.oi_ratio_warning)
        {
            return Err(EngineError::config(
                "open-interest ratio breakpoints must be positive and strictly decreasing",
            ));
        }

        let spread = [
            self.spread_pct_excellent,
            self.spread_pct_good,
            self.spread_pct_warning,
        ];
        if spread.iter().any(|v| !v.is_finite() || *v <= 0.0)
            || !(self.spread_pct_excellent < self.spread_pct_good
                && self.spread_pct_good < self.spread_pct_warning)
        {
            return Err(EngineError::config(
                "spread breakpoints must be positive and strictly increasing",
            ));
        }

        if self.intended_contracts == 0 {
            return Err(EngineError::config("intended_contracts must be at least 1"));
        }
        Ok(())
    }
}

/// Tier breakdown for one snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LiquidityAssessment {
    pub tier: LiquidityTier,
    pub oi_tier: LiquidityTier,
    pub spread_tier: LiquidityTier,
    /// Open interest / position size; 0 when the position size is 0.
    pub oi_ratio: f64,
    pub spread_pct: f64,
}

/// Tier from open interest relative to position size.
pub fn classify_open_interest(
    open_interest: u64,
    position_size: u32,
    config: &LiquidityConfig,
) -> LiquidityTier {
    if position_size == 0 {
        return LiquidityTier::Reject;
    }
    let ratio = open_interest as f64 / position_size as f64;
    if ratio >= config.oi_ratio_excellent {
        LiquidityTier::Excellent
    } else if ratio >= config.oi_ratio_good {
        LiquidityTier::Good
    } else if ratio >= config.oi_ratio_warning {
        LiquidityTier::Warning
    } else {
        LiquidityTier::Reject
    }
}

/// Tier from bid-ask spread percentage.
pub fn classify_spread(spread_pct: f64, config: &LiquidityConfig) -> LiquidityTier {
    if spread_pct.is_nan() || spread_pct < 0.0 {
        return LiquidityTier::Reject;
    }
    if spread_pct <= config.spread_pct_excellent {
        LiquidityTier::Excellent
    } else if spread_pct <= config.spread_pct_good {
        LiquidityTier::Good
    } else if spread_pct <= config.spread_pct_warning {
        LiquidityTier::Warning
    } else {
        LiquidityTier::Reject
    }
}

/// Classify a snapshot; the result is the worse of the two sub-tiers.
pub fn classify(
    snapshot: &LiquiditySnapshot,
    position_size: u32,
    config: &LiquidityConfig,
) -> LiquidityAssessment {
    let oi_tier = classify_open_interest(snapshot.open_interest, position_size, config);
    let spread_tier = classify_spread(snapshot.spread_pct, config);
    let oi_ratio = if position_size == 0 {
        0.0
    } else {
        snapshot.open_interest as f64 / position_size as f64
    };

    LiquidityAssessment {
        tier: oi_tier.min(spread_tier),
        oi_tier,
        spread_tier,
        oi_ratio,
        spread_pct: snapshot.spread_pct,
    }
}

/// Worst tier across a set of legs at the configured intended size.
pub fn classify_legs<'a>(
    legs: impl IntoIterator<Item = &'a OptionQuote>,
    config: &LiquidityConfig,
) -> LiquidityTier {
    legs.into_iter()
        .map(|q| classify(&LiquiditySnapshot::from_quote(q), config.intended_contracts, config).tier)
        .min()
        .unwrap_or(LiquidityTier::Reject)
}
