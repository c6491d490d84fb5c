//! Credit strategy construction.
//!
//! Provides:
//! - Strategy records (bull put, bear call, iron condor, iron butterfly)
//! - Strike selection and candidate generation from a two-sided chain
//! - Probability of profit against the implied move

pub mod generator;
pub mod probability;
pub mod types;

pub use generator::{
    CandidateRejection, Generation, GenerationRequest, StrategyConfig, StrategyGenerator,
};
pub use probability::{norm_cdf, one_sided_pop, profit_zone, two_sided_pop, width_to_range_ratio};
pub use types::{
    Breakevens, ProfitZone, SpreadLeg, Strategy, StrategyGreeks, StrategyLegs, StrategyType,
    CONTRACT_MULTIPLIER,
};
