//! Engine configuration.
//!
//! One `EngineConfig` is loaded at startup, validated once, and handed to
//! each component as the sub-record it needs. Sources, later wins:
//! 1. built-in defaults
//! 2. a TOML or JSON file (`EngineConfig::load`)
//! 3. `IVCRUSH_*` environment variables, including a `.env` file

use std::path::Path;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::analytics::{DirectionConfig, LiquidityConfig, RejectPolicy, SkewConfig, VrpThresholds};
use crate::error::{EngineError, EngineResult};
use crate::risk::KellyConfig;
use crate::scoring::{ScoringWeights, SentimentModifiers};
use crate::strategy::StrategyConfig;

/// Directional signal settings: skew sampling, sentiment strength and the
/// sentiment score modifier table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SentimentConfig {
    pub direction: DirectionConfig,
    pub skew: SkewConfig,
    pub modifiers: SentimentModifiers,
}

impl SentimentConfig {
    pub fn validate(&self) -> EngineResult<()> {
        self.direction.validate()?;
        self.skew.validate()?;
        self.modifiers.validate()
    }
}

/// Batch fan-out limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Worker threads analyzing tickers at once.
    pub max_concurrency: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self { max_concurrency: 4 }
    }
}

impl BatchConfig {
    pub fn validate(&self) -> EngineResult<()> {
        if self.max_concurrency == 0 {
            return Err(EngineError::config("max_concurrency must be at least 1"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub vrp: VrpThresholds,
    pub liquidity: LiquidityConfig,
    pub kelly: KellyConfig,
    pub scoring: ScoringWeights,
    pub sentiment: SentimentConfig,
    pub strategy: StrategyConfig,
    pub batch: BatchConfig,
}

impl EngineConfig {
    /// Load from a `.json` file, or TOML for any other extension.
    pub fn load(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| EngineError::config(format!("could not read {}: {e}", path.display())))?;

        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        if is_json {
            Self::from_json_str(&text)
        } else {
            Self::from_toml_str(&text)
        }
    }

    pub fn from_toml_str(text: &str) -> EngineResult<Self> {
        toml::from_str(text).map_err(|e| EngineError::config(format!("failed to parse TOML config: {e}")))
    }

    pub fn from_json_str(text: &str) -> EngineResult<Self> {
        serde_json::from_str(text)
            .map_err(|e| EngineError::config(format!("failed to parse JSON config: {e}")))
    }

    /// Apply `IVCRUSH_*` overrides from the process environment and `.env`.
    pub fn apply_env_overrides(&mut self) -> EngineResult<()> {
        dotenvy::dotenv().ok();
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> EngineResult<()> {
        if let Some(v) = parsed::<f64>(&lookup, "IVCRUSH_VRP_EXCELLENT")? {
            self.vrp.excellent = v;
        }
        if let Some(v) = parsed::<f64>(&lookup, "IVCRUSH_VRP_GOOD")? {
            self.vrp.good = v;
        }
        if let Some(v) = parsed::<f64>(&lookup, "IVCRUSH_VRP_MARGINAL")? {
            self.vrp.marginal = v;
        }
        if let Some(v) = parsed::<f64>(&lookup, "IVCRUSH_KELLY_FRACTION")? {
            self.kelly.fractional_multiplier = v;
        }
        if let Some(v) = parsed::<f64>(&lookup, "IVCRUSH_KELLY_MIN_EDGE")? {
            self.kelly.min_edge = v;
        }
        if let Some(v) = parsed::<Decimal>(&lookup, "IVCRUSH_RISK_BUDGET")? {
            self.kelly.risk_budget = v;
        }
        if let Some(v) = parsed::<u32>(&lookup, "IVCRUSH_MIN_CONTRACTS")? {
            self.kelly.min_contracts = v;
        }
        if let Some(v) = parsed::<u32>(&lookup, "IVCRUSH_MAX_CONTRACTS")? {
            self.kelly.max_contracts = v;
        }
        if let Some(raw) = lookup("IVCRUSH_LIQUIDITY_REJECT_POLICY") {
            self.liquidity.reject_policy = RejectPolicy::from_str(&raw).ok_or_else(|| {
                EngineError::config(format!("IVCRUSH_LIQUIDITY_REJECT_POLICY: unknown policy {raw:?}"))
            })?;
        }
        if let Some(v) = parsed::<bool>(&lookup, "IVCRUSH_SCORE_CAP")? {
            self.scoring.cap_at_100 = v;
        }
        Ok(())
    }

    /// Check every sub-record. The only source of configuration errors.
    pub fn validate(&self) -> EngineResult<()> {
        self.vrp.validate()?;
        self.liquidity.validate()?;
        self.kelly.validate()?;
        self.scoring.validate()?;
        self.sentiment.validate()?;
        self.strategy.validate()?;
        self.batch.validate()
    }
}

fn parsed<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> EngineResult<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| EngineError::config(format!("{key}: {e}"))),
    }
}
