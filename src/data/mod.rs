//! Market data handed to the engine by its collaborators.

pub mod input;
pub mod money;
pub mod types;

pub use input::TickerInput;
pub use money::{Currency, Money, MoneyError};
pub use types::{
    Direction, Greeks, HistoricalMove, LiquiditySnapshot, OptionChain, OptionQuote, OptionType,
    SentimentSignal, SentimentSource, SideChain,
};
