//! Position sizing module.
//!
//! Fractional-Kelly contract count:
//! - edge = p * b - (1 - p), with b = max profit / max loss
//! - edge below the minimum (including any negative edge): minimum contracts
//! - otherwise: fraction = edge / b * multiplier, contracts =
//!   floor(fraction * risk budget / max loss), clamped to [min, max]
//!
//! Non-positive max profit or max loss falls back to the minimum count.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::data::Money;
use crate::error::{EngineError, EngineResult};
use crate::strategy::Strategy;

/// Kelly sizing configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KellyConfig {
    /// Capital the Kelly fraction is applied to.
    pub risk_budget: Decimal,
    /// Fraction of full Kelly to bet (0.25 = quarter Kelly).
    pub fractional_multiplier: f64,
    /// Minimum edge before sizing scales above the floor.
    pub min_edge: f64,
    /// Floor on contracts per trade.
    pub min_contracts: u32,
    /// Cap on contracts per trade.
    pub max_contracts: u32,
    /// Multiplier on position value for candidates flagged for reduced sizing.
    pub reduced_size_multiplier: f64,
}

impl Default for KellyConfig {
    fn default() -> Self {
        Self {
            risk_budget: Decimal::from(20_000),
            fractional_multiplier: 0.25,
            min_edge: 0.02,
            min_contracts: 1,
            max_contracts: 10,
            reduced_size_multiplier: 0.5,
        }
    }
}

impl KellyConfig {
    pub fn validate(&self) -> EngineResult<()> {
        if self.risk_budget <= Decimal::ZERO {
            return Err(EngineError::config("risk_budget must be positive"));
        }
        let f = self.fractional_multiplier;
        if !f.is_finite() || f <= 0.0 || f > 1.0 {
            return Err(EngineError::config(format!(
                "fractional_multiplier must be in (0, 1], got {f}"
            )));
        }
        if !self.min_edge.is_finite() || self.min_edge < 0.0 {
            return Err(EngineError::config("min_edge must be non-negative"));
        }
        if self.min_contracts == 0 {
            return Err(EngineError::config("min_contracts must be at least 1"));
        }
        if self.max_contracts < self.min_contracts {
            return Err(EngineError::config(format!(
                "max_contracts {} is below min_contracts {}",
                self.max_contracts, self.min_contracts
            )));
        }
        let r = self.reduced_size_multiplier;
        if !r.is_finite() || r <= 0.0 || r > 1.0 {
            return Err(EngineError::config(format!(
                "reduced_size_multiplier must be in (0, 1], got {r}"
            )));
        }
        Ok(())
    }
}

/// How the contract count was arrived at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizingBasis {
    /// Kelly sizing within the floor and cap.
    Kelly,
    /// Kelly sizing clamped up to the floor.
    FlooredAtMinimum,
    /// Kelly sizing clamped down to the cap.
    CappedAtMaximum,
    /// Edge below the minimum; floor used.
    BelowMinimumEdge,
    /// Non-positive max profit or max loss; floor used.
    InvalidRisk,
}

/// Result of position sizing calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizingResult {
    /// Recommended number of contracts.
    pub contracts: u32,
    /// p * b - (1 - p).
    pub edge: f64,
    /// Reward per unit risked.
    pub reward_risk: f64,
    /// Full Kelly fraction (0 when not sized by Kelly).
    pub full_kelly_fraction: f64,
    /// Fraction of the budget actually applied.
    pub applied_fraction: f64,
    /// Budget allocated before rounding to whole contracts.
    pub position_value: Decimal,
    pub basis: SizingBasis,
}

impl SizingResult {
    /// Sized by the floor rather than by an edge.
    pub fn is_low_confidence(&self) -> bool {
        matches!(
            self.basis,
            SizingBasis::BelowMinimumEdge | SizingBasis::InvalidRisk
        )
    }
}

/// Kelly edge: expected profit per unit risked.
pub fn kelly_edge(probability: f64, reward_risk: f64) -> f64 {
    probability * reward_risk - (1.0 - probability)
}

/// Position sizer for determining contract counts.
#[derive(Debug, Clone)]
pub struct PositionSizer {
    config: KellyConfig,
}

impl PositionSizer {
    pub fn new(config: KellyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &KellyConfig {
        &self.config
    }

    fn floor_result(&self, edge: f64, reward_risk: f64, basis: SizingBasis) -> SizingResult {
        SizingResult {
            contracts: self.config.min_contracts,
            edge,
            reward_risk,
            full_kelly_fraction: 0.0,
            applied_fraction: 0.0,
            position_value: Decimal::ZERO,
            basis,
        }
    }

    /// Size a trade.
    ///
    /// # Arguments
    /// * `probability_of_profit` - must lie in [0, 1]
    /// * `max_profit_per_contract` / `max_loss_per_contract` - dollars per contract
    /// * `reduced` - apply the reduced-size multiplier
    pub fn size(
        &self,
        probability_of_profit: f64,
        max_profit_per_contract: &Money,
        max_loss_per_contract: &Money,
        reduced: bool,
    ) -> EngineResult<SizingResult> {
        let p = probability_of_profit;
        if !p.is_finite() || !(0.0..=1.0).contains(&p) {
            return Err(EngineError::OutOfRange {
                field: "probability_of_profit",
                value: p,
            });
        }

        if !max_loss_per_contract.is_positive() || !max_profit_per_contract.is_positive() {
            warn!(
                "Non-positive risk or reward per contract (max profit {}, max loss {}), using minimum size",
                max_profit_per_contract, max_loss_per_contract
            );
            return Ok(self.floor_result(0.0, 0.0, SizingBasis::InvalidRisk));
        }

        let reward_risk = max_profit_per_contract.checked_ratio(max_loss_per_contract)?;
        let edge = kelly_edge(p, reward_risk);

        if edge < self.config.min_edge {
            debug!(
                "Edge {:.4} below minimum {:.4}, using minimum size",
                edge, self.config.min_edge
            );
            return Ok(self.floor_result(edge, reward_risk, SizingBasis::BelowMinimumEdge));
        }

        let full_kelly_fraction = edge / reward_risk;
        let mut applied_fraction = full_kelly_fraction * self.config.fractional_multiplier;
        if reduced {
            applied_fraction *= self.config.reduced_size_multiplier;
        }

        let fraction = Decimal::try_from(applied_fraction)
            .map_err(|_| EngineError::invalid(format!("kelly fraction {applied_fraction} not representable")))?;
        let position_value = self.config.risk_budget * fraction;
        let raw_contracts = (position_value / max_loss_per_contract.amount)
            .floor()
            .to_u64()
            .unwrap_or(u64::MAX);

        let (contracts, basis) = if raw_contracts < self.config.min_contracts as u64 {
            (self.config.min_contracts, SizingBasis::FlooredAtMinimum)
        } else if raw_contracts > self.config.max_contracts as u64 {
            (self.config.max_contracts, SizingBasis::CappedAtMaximum)
        } else {
            (raw_contracts as u32, SizingBasis::Kelly)
        };

        Ok(SizingResult {
            contracts,
            edge,
            reward_risk,
            full_kelly_fraction,
            applied_fraction,
            position_value,
            basis,
        })
    }

    /// Size a generated strategy from its POP and per-contract risk.
    pub fn size_strategy(&self, strategy: &Strategy) -> EngineResult<SizingResult> {
        self.size(
            strategy.probability_of_profit,
            &strategy.max_profit,
            &strategy.max_loss,
            strategy.reduced_sizing,
        )
    }
}
