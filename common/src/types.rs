//! Core market-data types shared by every engine.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single trade/quote update for one symbol.
///
/// Ticks are read-only to all engines; the ingestion layer owns them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tick {
    pub timestamp: DateTime<Utc>,
    pub symbol: String,
    /// Last trade price
    pub price: Decimal,
    /// Last trade volume
    pub volume: Decimal,
    /// Best bid at the time of the trade
    pub bid: Decimal,
    /// Best ask at the time of the trade
    pub ask: Decimal,
}

impl Tick {
    /// True when the attached quote is usable: ask > bid > 0.
    ///
    /// Crossed or zeroed quotes are transient feed noise and are dropped by
    /// every consumer rather than treated as errors.
    pub fn has_valid_quote(&self) -> bool {
        self.bid > Decimal::ZERO && self.ask > self.bid
    }

    /// True when the trade itself is usable: positive price and volume.
    pub fn has_valid_trade(&self) -> bool {
        self.price > Decimal::ZERO && self.volume > Decimal::ZERO
    }

    /// Quote midpoint, only meaningful when `has_valid_quote` holds.
    pub fn mid(&self) -> Decimal {
        (self.bid + self.ask) / Decimal::TWO
    }
}

/// Aggressor side of a classified trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeSide {
    Buy,
    Sell,
    Neutral,
}

impl TradeSide {
    /// Signed multiplier: +1 buy, -1 sell, 0 neutral.
    pub fn sign(&self) -> i8 {
        match self {
            TradeSide::Buy => 1,
            TradeSide::Sell => -1,
            TradeSide::Neutral => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn tick(bid: Decimal, ask: Decimal) -> Tick {
        Tick {
            timestamp: Utc::now(),
            symbol: "BTC-USD".to_string(),
            price: dec!(100.1),
            volume: dec!(1.5),
            bid,
            ask,
        }
    }

    #[test]
    fn test_valid_quote() {
        assert!(tick(dec!(100.0), dec!(100.5)).has_valid_quote());
    }

    #[test]
    fn test_crossed_and_zero_quotes_rejected() {
        assert!(!tick(dec!(100.5), dec!(100.0)).has_valid_quote());
        assert!(!tick(dec!(100.0), dec!(100.0)).has_valid_quote());
        assert!(!tick(dec!(0), dec!(100.0)).has_valid_quote());
    }

    #[test]
    fn test_mid_is_exact() {
        assert_eq!(tick(dec!(100.0), dec!(100.5)).mid(), dec!(100.25));
    }

    #[test]
    fn test_side_sign() {
        assert_eq!(TradeSide::Buy.sign(), 1);
        assert_eq!(TradeSide::Sell.sign(), -1);
        assert_eq!(TradeSide::Neutral.sign(), 0);
    }
}
