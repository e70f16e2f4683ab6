//! Shared market-data types used across the factor and backtest crates.

mod types;

pub use types::{Tick, TradeSide};

pub use chrono::{DateTime, Duration, Utc};
pub use rust_decimal::Decimal;
