//! Risk management module.
//!
//! Provides fractional-Kelly position sizing with a contract floor and cap.

pub mod position_sizer;

pub use position_sizer::{kelly_edge, KellyConfig, PositionSizer, SizingBasis, SizingResult};
