//! Engine error taxonomy.
//!
//! Every failure the engine reports maps onto one of six kinds. The VRP
//! calculator, liquidity classifier and position sizer return these as
//! ordinary values; only `ConfigurationError` is meant to be fatal, and only
//! at startup.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reason-code kind of an [`EngineError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    InsufficientData,
    InvalidData,
    OutOfRange,
    NoLiquidCandidates,
    NoStrikesAvailable,
    ConfigurationError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InsufficientData => "INSUFFICIENT_DATA",
            Self::InvalidData => "INVALID_DATA",
            Self::OutOfRange => "OUT_OF_RANGE",
            Self::NoLiquidCandidates => "NO_LIQUID_CANDIDATES",
            Self::NoStrikesAvailable => "NO_STRIKES_AVAILABLE",
            Self::ConfigurationError => "CONFIGURATION_ERROR",
        }
    }

    /// Human-readable explanation for reports.
    pub fn describe(&self) -> &'static str {
        match self {
            Self::InsufficientData => "Not enough historical earnings moves to measure volatility",
            Self::InvalidData => "Input data is invalid (non-positive price, strike, mean or credit)",
            Self::OutOfRange => "A probability or score fell outside its valid range",
            Self::NoLiquidCandidates => "Every candidate strategy failed the liquidity policy",
            Self::NoStrikesAvailable => "Option chain is too sparse to build a spread",
            Self::ConfigurationError => "Engine configuration is malformed",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("insufficient data: need at least {required} samples, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("{field} out of range: {value}")]
    OutOfRange { field: &'static str, value: f64 },

    #[error("no liquid candidates: {0}")]
    NoLiquidCandidates(String),

    #[error("no strikes available: {0}")]
    NoStrikesAvailable(String),

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InsufficientData { .. } => ErrorKind::InsufficientData,
            Self::InvalidData(_) => ErrorKind::InvalidData,
            Self::OutOfRange { .. } => ErrorKind::OutOfRange,
            Self::NoLiquidCandidates(_) => ErrorKind::NoLiquidCandidates,
            Self::NoStrikesAvailable(_) => ErrorKind::NoStrikesAvailable,
            Self::Configuration(_) => ErrorKind::ConfigurationError,
        }
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidData(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
