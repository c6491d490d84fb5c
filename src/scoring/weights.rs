//! Scoring weights and the sentiment modifier table.

use serde::{Deserialize, Serialize};

use crate::analytics::{LiquidityTier, VrpTier};
use crate::error::{EngineError, EngineResult};

/// Fraction of the liquidity weight earned by each tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiquidityTierScores {
    pub excellent: f64,
    pub good: f64,
    pub warning: f64,
    pub reject: f64,
}

impl Default for LiquidityTierScores {
    fn default() -> Self {
        Self {
            excellent: 1.0,
            good: 0.8,
            warning: 0.5,
            reject: 0.0,
        }
    }
}

impl LiquidityTierScores {
    pub fn for_tier(&self, tier: LiquidityTier) -> f64 {
        match tier {
            LiquidityTier::Excellent => self.excellent,
            LiquidityTier::Good => self.good,
            LiquidityTier::Warning => self.warning,
            LiquidityTier::Reject => self.reject,
        }
    }

    fn validate(&self) -> EngineResult<()> {
        let ordered = [self.reject, self.warning, self.good, self.excellent];
        validate_tier_scores("liquidity_scores", &ordered)
    }
}

/// Fraction of the VRP weight earned by each tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VrpTierScores {
    pub excellent: f64,
    pub good: f64,
    pub marginal: f64,
    pub skip: f64,
}

impl Default for VrpTierScores {
    fn default() -> Self {
        Self {
            excellent: 1.0,
            good: 0.75,
            marginal: 0.4,
            skip: 0.0,
        }
    }
}

impl VrpTierScores {
    pub fn for_tier(&self, tier: VrpTier) -> f64 {
        match tier {
            VrpTier::Excellent => self.excellent,
            VrpTier::Good => self.good,
            VrpTier::Marginal => self.marginal,
            VrpTier::Skip => self.skip,
        }
    }

    fn validate(&self) -> EngineResult<()> {
        let ordered = [self.skip, self.marginal, self.good, self.excellent];
        validate_tier_scores("vrp_scores", &ordered)
    }
}

/// Scores listed worst to best: each in [0, 1] and non-decreasing.
fn validate_tier_scores(name: &str, ordered: &[f64]) -> EngineResult<()> {
    if ordered.iter().any(|s| !s.is_finite() || !(0.0..=1.0).contains(s)) {
        return Err(EngineError::config(format!("{name} must lie in [0, 1]")));
    }
    if ordered.windows(2).any(|w| w[0] > w[1]) {
        return Err(EngineError::config(format!(
            "{name} must not decrease as the tier improves"
        )));
    }
    Ok(())
}

/// Component weights and the thresholds the components are measured against.
///
/// Each component contributes `weight × fit`, with fit in [0, 1], so a
/// strategy at every target scores exactly the weight total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub pop_weight: f64,
    pub liquidity_weight: f64,
    pub vrp_weight: f64,
    pub kelly_edge_weight: f64,
    pub greeks_weight: f64,
    /// Required sum of the five weights.
    pub expected_total: f64,
    /// POP at which the POP component is full.
    pub target_pop: f64,
    /// Kelly edge at which the edge component is full.
    pub target_kelly_edge: f64,
    /// Share of VRP points lost at consistency (MAD / median) of 1 or worse.
    pub consistency_penalty: f64,
    /// |net delta| per share tolerated by a range strategy before losing delta fit.
    pub max_neutral_delta: f64,
    /// Greeks fit used when a leg has no Greeks.
    pub missing_greeks_score: f64,
    /// Cap the final score at 100. Off leaves headroom above 100 for a
    /// positive sentiment modifier.
    pub cap_at_100: bool,
    pub liquidity_scores: LiquidityTierScores,
    pub vrp_scores: VrpTierScores,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            pop_weight: 25.0,
            liquidity_weight: 15.0,
            vrp_weight: 30.0,
            kelly_edge_weight: 20.0,
            greeks_weight: 10.0,
            expected_total: 100.0,
            target_pop: 0.65,
            target_kelly_edge: 0.10,
            consistency_penalty: 0.25,
            max_neutral_delta: 0.10,
            missing_greeks_score: 0.5,
            cap_at_100: true,
            liquidity_scores: LiquidityTierScores::default(),
            vrp_scores: VrpTierScores::default(),
        }
    }
}

impl ScoringWeights {
    pub fn total(&self) -> f64 {
        self.pop_weight
            + self.liquidity_weight
            + self.vrp_weight
            + self.kelly_edge_weight
            + self.greeks_weight
    }

    pub fn validate(&self) -> EngineResult<()> {
        let weights = [
            ("pop_weight", self.pop_weight),
            ("liquidity_weight", self.liquidity_weight),
            ("vrp_weight", self.vrp_weight),
            ("kelly_edge_weight", self.kelly_edge_weight),
            ("greeks_weight", self.greeks_weight),
        ];
        for (name, w) in weights {
            if !w.is_finite() || w < 0.0 {
                return Err(EngineError::config(format!("{name} must be non-negative, got {w}")));
            }
        }
        if (self.total() - self.expected_total).abs() > 1e-9 {
            return Err(EngineError::config(format!(
                "weights sum to {} but expected_total is {}",
                self.total(),
                self.expected_total
            )));
        }
        if !(self.target_pop > 0.0 && self.target_pop <= 1.0) {
            return Err(EngineError::config(format!(
                "target_pop must be in (0, 1], got {}",
                self.target_pop
            )));
        }
        if !self.target_kelly_edge.is_finite() || self.target_kelly_edge <= 0.0 {
            return Err(EngineError::config("target_kelly_edge must be positive"));
        }
        if !(0.0..=1.0).contains(&self.consistency_penalty) {
            return Err(EngineError::config("consistency_penalty must be in [0, 1]"));
        }
        if !self.max_neutral_delta.is_finite() || self.max_neutral_delta <= 0.0 {
            return Err(EngineError::config("max_neutral_delta must be positive"));
        }
        if !(0.0..=1.0).contains(&self.missing_greeks_score) {
            return Err(EngineError::config("missing_greeks_score must be in [0, 1]"));
        }
        self.liquidity_scores.validate()?;
        self.vrp_scores.validate()
    }
}

/// Ordered sentiment bands and the score multiplier each applies.
///
/// | sentiment            | modifier         |
/// |----------------------|------------------|
/// | ≥ strong_bullish_at  | strong_bullish   |
/// | ≥ bullish_at         | bullish          |
/// | ≤ strong_bearish_at  | strong_bearish   |
/// | ≤ bearish_at         | bearish          |
/// | otherwise            | 0                |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SentimentModifiers {
    pub strong_bullish_at: f64,
    pub bullish_at: f64,
    pub bearish_at: f64,
    pub strong_bearish_at: f64,
    pub strong_bullish: f64,
    pub bullish: f64,
    pub bearish: f64,
    pub strong_bearish: f64,
}

impl Default for SentimentModifiers {
    fn default() -> Self {
        Self {
            strong_bullish_at: 0.6,
            bullish_at: 0.2,
            bearish_at: -0.2,
            strong_bearish_at: -0.6,
            strong_bullish: 0.12,
            bullish: 0.07,
            bearish: -0.07,
            strong_bearish: -0.12,
        }
    }
}

impl SentimentModifiers {
    /// Modifier for a sentiment score. NaN maps to 0.
    pub fn modifier(&self, sentiment: f64) -> f64 {
        if sentiment >= self.strong_bullish_at {
            self.strong_bullish
        } else if sentiment >= self.bullish_at {
            self.bullish
        } else if sentiment <= self.strong_bearish_at {
            self.strong_bearish
        } else if sentiment <= self.bearish_at {
            self.bearish
        } else {
            0.0
        }
    }

    pub fn validate(&self) -> EngineResult<()> {
        let bands = [
            self.strong_bearish_at,
            self.bearish_at,
            self.bullish_at,
            self.strong_bullish_at,
        ];
        if bands.iter().any(|b| !b.is_finite()) || bands.windows(2).any(|w| w[0] >= w[1]) {
            return Err(EngineError::config(
                "sentiment bands must be strictly increasing: strong_bearish_at < bearish_at < bullish_at < strong_bullish_at",
            ));
        }
        let modifiers = [self.strong_bearish, self.bearish, self.bullish, self.strong_bullish];
        if modifiers.iter().any(|m| !m.is_finite() || *m <= -1.0) {
            return Err(EngineError::config("sentiment modifiers must be greater than -1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weights_valid() {
        let weights = ScoringWeights::default();
        assert_eq!(weights.total(), 100.0);
        assert!(weights.validate().is_ok());
        assert!(SentimentModifiers::default().validate().is_ok());
    }

    #[test]
    fn test_weights_must_sum_to_total() {
        let weights = ScoringWeights {
            vrp_weight: 40.0,
            ..ScoringWeights::default()
        };
        assert!(weights.validate().is_err());

        let headroom = ScoringWeights {
            vrp_weight: 40.0,
            expected_total: 110.0,
            ..ScoringWeights::default()
        };
        assert!(headroom.validate().is_ok());
    }

    #[test]
    fn test_negative_weight_rejected() {
        let weights = ScoringWeights {
            greeks_weight: -10.0,
            pop_weight: 45.0,
            ..ScoringWeights::default()
        };
        let err = weights.validate().unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::ConfigurationError);
    }

    #[test]
    fn test_tier_scores_must_be_monotonic() {
        let weights = ScoringWeights {
            liquidity_scores: LiquidityTierScores {
                warning: 0.9,
                ..LiquidityTierScores::default()
            },
            ..ScoringWeights::default()
        };
        assert!(weights.validate().is_err());
    }

    #[test]
    fn test_modifier_table() {
        let m = SentimentModifiers::default();
        let cases = [
            (1.0, 0.12),
            (0.6, 0.12),
            (0.59, 0.07),
            (0.2, 0.07),
            (0.19, 0.0),
            (0.0, 0.0),
            (-0.19, 0.0),
            (-0.2, -0.07),
            (-0.59, -0.07),
            (-0.6, -0.12),
            (-1.0, -0.12),
            (f64::NAN, 0.0),
        ];
        for (sentiment, expected) in cases {
            assert_eq!(m.modifier(sentiment), expected, "sentiment {sentiment}");
        }
    }

    #[test]
    fn test_modifier_bands_must_be_ordered() {
        let m = SentimentModifiers {
            bullish_at: 0.7,
            ..SentimentModifiers::default()
        };
        assert!(m.validate().is_err());
    }
}
