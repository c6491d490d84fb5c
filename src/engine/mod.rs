//! Analysis pipeline.
//!
//! Provides:
//! - `Engine`: validated configuration plus the generator, scorer and sizer
//! - Per-ticker analysis with a trade / no-trade decision and reason codes
//! - Bounded-concurrency batch analysis

pub mod analyzer;
pub mod batch;

pub use analyzer::{Decision, Engine, ReasonCode, Rejection, TickerAnalysis};
pub use batch::BatchSummary;
