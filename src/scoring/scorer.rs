//! Composite strategy scoring and ranking.
//!
//! Base score is the weighted sum of five fits, each in [0, 1]:
//! - POP against the target POP
//! - liquidity tier
//! - VRP tier, discounted by historical inconsistency
//! - Kelly edge against the target edge
//! - Greeks quality (theta collected, short vega, delta suited to the strategy)
//!
//! final = base × (1 + sentiment modifier), optionally capped at 100.

use serde::{Deserialize, Serialize};

use crate::analytics::VrpResult;
use crate::risk::kelly_edge;
use crate::strategy::{Strategy, StrategyGreeks, StrategyType};

use super::weights::{ScoringWeights, SentimentModifiers};

/// Ceiling applied when `ScoringWeights::cap_at_100` is set.
pub const SCORE_CAP: f64 = 100.0;

/// Per-component points and the final score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub pop_points: f64,
    pub liquidity_points: f64,
    pub vrp_points: f64,
    pub kelly_edge_points: f64,
    pub greeks_points: f64,
    /// Edge the Kelly component was computed from.
    pub kelly_edge: f64,
    pub base: f64,
    pub sentiment_modifier: f64,
    pub total: f64,
}

#[derive(Debug, Clone)]
pub struct CompositeScorer {
    weights: ScoringWeights,
    modifiers: SentimentModifiers,
}

impl CompositeScorer {
    pub fn new(weights: ScoringWeights, modifiers: SentimentModifiers) -> Self {
        Self { weights, modifiers }
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Score one strategy against its ticker's VRP and sentiment.
    pub fn score(&self, strategy: &Strategy, vrp: &VrpResult, sentiment: f64) -> ScoreBreakdown {
        self.score_with_modifier(strategy, vrp, self.modifiers.modifier(sentiment))
    }

    /// Score with an explicit sentiment modifier.
    pub fn score_with_modifier(
        &self,
        strategy: &Strategy,
        vrp: &VrpResult,
        modifier: f64,
    ) -> ScoreBreakdown {
        let w = &self.weights;

        let pop_points = w.pop_weight * ratio_fit(strategy.probability_of_profit, w.target_pop);
        let liquidity_points =
            w.liquidity_weight * w.liquidity_scores.for_tier(strategy.liquidity_tier);
        let vrp_points = w.vrp_weight * self.vrp_fit(vrp);

        let edge = kelly_edge(strategy.probability_of_profit, strategy.reward_risk());
        let kelly_edge_points = w.kelly_edge_weight * ratio_fit(edge, w.target_kelly_edge);

        let greeks_points = w.greeks_weight * self.greeks_fit(strategy.kind(), strategy.greeks.as_ref());

        let base = pop_points + liquidity_points + vrp_points + kelly_edge_points + greeks_points;

        ScoreBreakdown {
            pop_points,
            liquidity_points,
            vrp_points,
            kelly_edge_points,
            greeks_points,
            kelly_edge: edge,
            base,
            sentiment_modifier: modifier,
            total: self.apply_modifier(base, modifier),
        }
    }

    /// base × (1 + modifier), capped when configured.
    pub fn apply_modifier(&self, base: f64, modifier: f64) -> f64 {
        let total = (base * (1.0 + modifier)).max(0.0);
        if self.weights.cap_at_100 {
            total.min(SCORE_CAP)
        } else {
            total
        }
    }

    /// Fill `score` on every strategy.
    pub fn score_all(&self, strategies: &mut [Strategy], vrp: &VrpResult, sentiment: f64) {
        for strategy in strategies.iter_mut() {
            strategy.score = Some(self.score(strategy, vrp, sentiment));
        }
    }

    fn vrp_fit(&self, vrp: &VrpResult) -> f64 {
        let w = &self.weights;
        let consistency = if vrp.consistency.is_finite() {
            vrp.consistency.clamp(0.0, 1.0)
        } else {
            1.0
        };
        w.vrp_scores.for_tier(vrp.tier) * (1.0 - w.consistency_penalty * consistency)
    }

    fn greeks_fit(&self, kind: StrategyType, greeks: Option<&StrategyGreeks>) -> f64 {
        let Some(g) = greeks else {
            return self.weights.missing_greeks_score;
        };

        let theta = if g.net_theta > 0.0 { 1.0 } else { 0.0 };
        let vega = if g.net_vega < 0.0 { 1.0 } else { 0.0 };
        let delta = match kind {
            StrategyType::BullPutSpread => {
                if g.net_delta >= 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            StrategyType::BearCallSpread => {
                if g.net_delta <= 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            StrategyType::IronCondor | StrategyType::IronButterfly => {
                (1.0 - g.net_delta.abs() / self.weights.max_neutral_delta).max(0.0)
            }
        };

        (theta + vega + delta) / 3.0
    }
}

/// value / target clamped to [0, 1].
fn ratio_fit(value: f64, target: f64) -> f64 {
    if !value.is_finite() || target <= 0.0 {
        return 0.0;
    }
    (value / target).clamp(0.0, 1.0)
}

/// Sort best first: total score, then POP. Unscored strategies sort last.
pub fn rank(strategies: &mut [Strategy]) {
    strategies.sort_by(|a, b| {
        b.total_score()
            .total_cmp(&a.total_score())
            .then_with(|| b.probability_of_profit.total_cmp(&a.probability_of_profit))
    });
}
