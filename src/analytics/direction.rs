//! Direction resolution: skew bias reconciled with sentiment.
//!
//! Fixed three-rule policy:
//! 1. Neutral skew + strong sentiment: sentiment breaks the tie.
//! 2. Directional skew + strongly opposed sentiment: hedge to NEUTRAL.
//! 3. Anything else keeps the skew bias.

use serde::{Deserialize, Serialize};

use crate::data::Direction;
use crate::error::{EngineError, EngineResult};

/// Sentiment bucket relative to the strength threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SentimentBucket {
    StrongBullish,
    Weak,
    StrongBearish,
}

impl SentimentBucket {
    /// Bucket a score. NaN is weak.
    pub fn from_score(score: f64, threshold: f64) -> Self {
        if score >= threshold {
            Self::StrongBullish
        } else if score <= -threshold {
            Self::StrongBearish
        } else {
            Self::Weak
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectionConfig {
    /// |sentiment| at or above which sentiment counts as strong.
    pub strong_sentiment_threshold: f64,
}

impl Default for DirectionConfig {
    fn default() -> Self {
        Self {
            strong_sentiment_threshold: 0.3,
        }
    }
}

impl DirectionConfig {
    pub fn validate(&self) -> EngineResult<()> {
        let t = self.strong_sentiment_threshold;
        if !t.is_finite() || t <= 0.0 || t > 1.0 {
            return Err(EngineError::config(format!(
                "strong_sentiment_threshold must be in (0, 1], got {t}"
            )));
        }
        Ok(())
    }
}

/// Resolve the trading direction.
pub fn resolve_direction(skew_bias: Direction, sentiment: f64, config: &DirectionConfig) -> Direction {
    let bucket = SentimentBucket::from_score(sentiment, config.strong_sentiment_threshold);
    match (skew_bias, bucket) {
        (Direction::Neutral, SentimentBucket::StrongBullish) => Direction::Bullish,
        (Direction::Neutral, SentimentBucket::StrongBearish) => Direction::Bearish,
        (Direction::Bullish, SentimentBucket::StrongBearish) => Direction::Neutral,
        (Direction::Bearish, SentimentBucket::StrongBullish) => Direction::Neutral,
        (skew, _) => skew,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_nine_combinations() {
        let config = DirectionConfig::default();
        let cases = [
            (Direction::Neutral, 0.5, Direction::Bullish),
            (Direction::Neutral, 0.0, Direction::Neutral),
            (Direction::Neutral, -0.5, Direction::Bearish),
            (Direction::Bullish, 0.5, Direction::Bullish),
            (Direction::Bullish, 0.0, Direction::Bullish),
            (Direction::Bullish, -0.5, Direction::Neutral),
            (Direction::Bearish, 0.5, Direction::Neutral),
            (Direction::Bearish, 0.0, Direction::Bearish),
            (Direction::Bearish, -0.5, Direction::Bearish),
        ];
        for (skew, sentiment, expected) in cases {
            assert_eq!(
                resolve_direction(skew, sentiment, &config),
                expected,
                "skew {:?} sentiment {}",
                skew,
                sentiment
            );
        }
    }

    #[test]
    fn test_threshold_boundaries() {
        let config = DirectionConfig::default();
        assert_eq!(resolve_direction(Direction::Neutral, 0.3, &config), Direction::Bullish);
        assert_eq!(resolve_direction(Direction::Neutral, 0.29, &config), Direction::Neutral);
        assert_eq!(resolve_direction(Direction::Neutral, -0.3, &config), Direction::Bearish);
        assert_eq!(resolve_direction(Direction::Bullish, -0.29, &config), Direction::Bullish);
    }

    #[test]
    fn test_nan_sentiment_keeps_skew() {
        let config = DirectionConfig::default();
        for skew in [Direction::Bullish, Direction::Bearish, Direction::Neutral] {
            assert_eq!(resolve_direction(skew, f64::NAN, &config), skew);
        }
    }

    #[test]
    fn test_config_validation() {
        assert!(DirectionConfig::default().validate().is_ok());
        let bad = DirectionConfig {
            strong_sentiment_threshold: 0.0,
        };
        assert!(bad.validate().is_err());
    }
}
