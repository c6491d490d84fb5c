pub mod analytics;
pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod risk;
pub mod scoring;
pub mod strategy;

// Re-export commonly used types
pub use analytics::{LiquidityTier, RejectPolicy, VrpResult, VrpTier};
pub use config::EngineConfig;
pub use data::{Direction, Money, OptionChain, OptionQuote, OptionType, TickerInput};
pub use engine::{BatchSummary, Decision, Engine, ReasonCode, Rejection, TickerAnalysis};
pub use error::{EngineError, EngineResult, ErrorKind};
pub use risk::{PositionSizer, SizingResult};
pub use scoring::{CompositeScorer, ScoreBreakdown, ScoringWeights};
pub use strategy::{Strategy, StrategyGenerator, StrategyType};
