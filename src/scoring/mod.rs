//! Composite scoring of candidate strategies.
//!
//! Provides:
//! - Configurable component weights and tier scores
//! - Sentiment modifier table
//! - Composite scorer and ranking

pub mod scorer;
pub mod weights;

pub use scorer::{rank, CompositeScorer, ScoreBreakdown, SCORE_CAP};
pub use weights::{LiquidityTierScores, ScoringWeights, SentimentModifiers, VrpTierScores};
