//! Volatility risk premium (VRP) calculation.
//!
//! Compares the one-sided move the options market prices into earnings with
//! the mean of past realized earnings moves:
//! - ratio = implied move / historical mean
//! - tier from strictly decreasing thresholds (excellent > good > marginal)
//! - consistency = median absolute deviation / median of the historical sample

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Minimum number of historical moves for a usable ratio.
pub const MIN_HISTORICAL_SAMPLES: usize = 4;

/// VRP quality tier. Ordered worst to best, so `Ord` compares quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VrpTier {
    Skip,
    Marginal,
    Good,
    Excellent,
}

impl VrpTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Skip => "SKIP",
            Self::Marginal => "MARGINAL",
            Self::Good => "GOOD",
            Self::Excellent => "EXCELLENT",
        }
    }
}

/// Tier breakpoints on the implied/historical ratio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VrpThresholds {
    pub excellent: f64,
    pub good: f64,
    pub marginal: f64,
    /// Historical sample size below which no ratio is computed.
    pub min_samples: usize,
    /// Whether a SKIP tier stops the ticker from trading at all.
    pub skip_blocks_trade: bool,
}

impl Default for VrpThresholds {
    fn default() -> Self {
        Self {
            excellent: 7.0,
            good: 4.0,
            marginal: 1.5,
            min_samples: MIN_HISTORICAL_SAMPLES,
            skip_blocks_trade: true,
        }
    }
}

impl VrpThresholds {
    pub fn validate(&self) -> EngineResult<()> {
        let all_finite = [self.excellent, self.good, self.marginal]
            .iter()
            .all(|t| t.is_finite());
        if !all_finite || self.marginal <= 0.0 {
            return Err(EngineError::config(
                "VRP thresholds must be finite and positive",
            ));
        }
        if !(self.excellent > self.good && self.good > self.marginal) {
            return Err(EngineError::config(format!(
                "VRP thresholds must be strictly decreasing: excellent {} > good {} > marginal {}",
                self.excellent, self.good, self.marginal
            )));
        }
        if self.min_samples < MIN_HISTORICAL_SAMPLES {
            return Err(EngineError::config(format!(
                "VRP min_samples must be at least {}",
                MIN_HISTORICAL_SAMPLES
            )));
        }
        Ok(())
    }

    pub fn tier(&self, ratio: f64) -> VrpTier {
        if ratio >= self.excellent {
            VrpTier::Excellent
        } else if ratio >= self.good {
            VrpTier::Good
        } else if ratio >= self.marginal {
            VrpTier::Marginal
        } else {
            VrpTier::Skip
        }
    }
}

/// Result of a VRP calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VrpResult {
    /// One-sided implied move, percent.
    pub implied_move_pct: f64,
    /// Mean historical move magnitude, percent.
    pub historical_mean_pct: f64,
    pub ratio: f64,
    pub tier: VrpTier,
    /// MAD / median of the historical magnitudes. 0 is perfectly consistent;
    /// a zero median counts as fully inconsistent (1.0).
    pub consistency: f64,
    pub sample_size: usize,
}

/// Calculate the VRP ratio and tier.
///
/// `historical_moves` are move magnitudes in percent; signs are ignored.
pub fn calculate_vrp(
    implied_move_pct: f64,
    historical_moves: &[f64],
    thresholds: &VrpThresholds,
) -> EngineResult<VrpResult> {
    if historical_moves.len() < thresholds.min_samples {
        return Err(EngineError::InsufficientData {
            required: thresholds.min_samples,
            actual: historical_moves.len(),
        });
    }

    if !implied_move_pct.is_finite() || implied_move_pct <= 0.0 {
        return Err(EngineError::invalid(format!(
            "implied move must be positive, got {implied_move_pct}"
        )));
    }

    if historical_moves.iter().any(|m| !m.is_finite()) {
        return Err(EngineError::invalid("historical moves contain non-finite values"));
    }

    let magnitudes: Vec<f64> = historical_moves.iter().map(|m| m.abs()).collect();
    let historical_mean = magnitudes.iter().sum::<f64>() / magnitudes.len() as f64;

    if historical_mean <= 0.0 {
        return Err(EngineError::invalid(format!(
            "historical mean move must be positive, got {historical_mean}"
        )));
    }

    let ratio = implied_move_pct / historical_mean;

    Ok(VrpResult {
        implied_move_pct,
        historical_mean_pct: historical_mean,
        ratio,
        tier: thresholds.tier(ratio),
        consistency: consistency(&magnitudes),
        sample_size: magnitudes.len(),
    })
}

fn median(values: &mut [f64]) -> f64 {
    values.sort_by(|a, b| a.total_cmp(b));
    let n = values.len();
    if n == 0 {
        return 0.0;
    }
    if n % 2 == 0 {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    } else {
        values[n / 2]
    }
}

/// Median absolute deviation over median.
fn consistency(magnitudes: &[f64]) -> f64 {
    let mut sorted = magnitudes.to_vec();
    let med = median(&mut sorted);
    if med <= 0.0 {
        return 1.0;
    }
    let mut deviations: Vec<f64> = magnitudes.iter().map(|m| (m - med).abs()).collect();
    median(&mut deviations) / med
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_samples() {
        let thresholds = VrpThresholds::default();
        for n in 0..MIN_HISTORICAL_SAMPLES {
            let moves = vec![5.0; n];
            let err = calculate_vrp(8.0, &moves, &thresholds).unwrap_err();
            assert_eq!(
                err,
                EngineError::InsufficientData {
                    required: 4,
                    actual: n
                }
            );
        }
    }

    #[test]
    fn test_ratio_is_implied_over_mean() {
        let thresholds = VrpThresholds::default();
        let moves = [2.0, 4.0, 6.0, 8.0];
        let result = calculate_vrp(10.0, &moves, &thresholds).unwrap();
        assert!((result.historical_mean_pct - 5.0).abs() < 1e-12);
        assert!((result.ratio - 2.0).abs() < 1e-12);
        assert_eq!(result.tier, VrpTier::Marginal);
        assert_eq!(result.sample_size, 4);
    }

    #[test]
    fn test_signed_moves_use_magnitude() {
        let thresholds = VrpThresholds::default();
        let result = calculate_vrp(8.0, &[-1.0, 1.0, -1.0, 1.0], &thresholds).unwrap();
        assert!((result.ratio - 8.0).abs() < 1e-12);
        assert_eq!(result.tier, VrpTier::Excellent);
    }

    #[test]
    fn test_zero_mean_is_invalid() {
        let thresholds = VrpThresholds::default();
        let err = calculate_vrp(8.0, &[0.0; 5], &thresholds).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidData);
    }

    #[test]
    fn test_non_positive_implied_move_is_invalid() {
        let thresholds = VrpThresholds::default();
        let err = calculate_vrp(0.0, &[3.0; 4], &thresholds).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidData);
    }

    #[test]
    fn test_tiers_are_monotonic() {
        let thresholds = VrpThresholds::default();
        let ratios: Vec<f64> = (0..200).map(|i| i as f64 * 0.05).collect();
        for pair in ratios.windows(2) {
            assert!(thresholds.tier(pair[1]) >= thresholds.tier(pair[0]));
        }
        assert_eq!(thresholds.tier(7.0), VrpTier::Excellent);
        assert_eq!(thresholds.tier(6.99), VrpTier::Good);
        assert_eq!(thresholds.tier(4.0), VrpTier::Good);
        assert_eq!(thresholds.tier(1.5), VrpTier::Marginal);
        assert_eq!(thresholds.tier(1.49), VrpTier::Skip);
    }

    #[test]
    fn test_threshold_validation() {
        assert!(VrpThresholds::default().validate().is_ok());

        let flat = VrpThresholds {
            good: 7.0,
            ..Default::default()
        };
        assert!(flat.validate().is_err());

        let inverted = VrpThresholds {
            excellent: 1.0,
            good: 2.0,
            marginal: 3.0,
            ..Default::default()
        };
        assert!(inverted.validate().is_err());
    }

    #[test]
    fn test_consistency() {
        // Identical moves are perfectly consistent.
        let thresholds = VrpThresholds::default();
        let steady = calculate_vrp(8.0, &[4.0, 4.0, 4.0, 4.0], &thresholds).unwrap();
        assert_eq!(steady.consistency, 0.0);

        // median 5, deviations [3, 1, 1, 5] -> MAD 2 -> 0.4
        let noisy = calculate_vrp(8.0, &[2.0, 4.0, 6.0, 10.0], &thresholds).unwrap();
        assert!((noisy.consistency - 0.4).abs() < 1e-12);

        // Zero median counts as fully inconsistent.
        let spiky = calculate_vrp(8.0, &[0.0, 0.0, 0.0, 12.0, 0.0], &thresholds).unwrap();
        assert_eq!(spiky.consistency, 1.0);
    }
}
