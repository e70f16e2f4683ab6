// Orderbook Factor Engine
// Stateless liquidity/spread snapshot from a single best bid/ask pair

use common::Tick;
use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Instantaneous liquidity/spread snapshot derived from one quote.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderbookFactor {
    /// Quote midpoint, (bid + ask) / 2
    pub mid: Decimal,
    /// Absolute spread, ask - bid
    pub spread: Decimal,
    /// Spread relative to mid, in basis points
    pub rel_spread_bp: f64,
    /// Round-trip liquidity cost proxy; equal to the relative spread
    pub liquidity_cost_bp: f64,
}

/// Pure function over raw (bid, ask) values, independent of any tick
/// representation, for batch/vectorized use.
///
/// Returns `None` for halted/bad-quote conditions: bid <= 0, ask <= 0,
/// ask <= bid, or a midpoint below `min_mid`.
pub fn quote_metrics(bid: Decimal, ask: Decimal, min_mid: Decimal) -> Option<OrderbookFactor> {
    if bid <= Decimal::ZERO || ask <= Decimal::ZERO || ask <= bid {
        return None;
    }
    let mid = (bid + ask) / Decimal::TWO;
    if mid < min_mid {
        return None;
    }
    let spread = ask - bid;
    let rel_spread_bp = (spread / mid * Decimal::from(10_000u32)).to_f64()?;
    Some(OrderbookFactor {
        mid,
        spread,
        rel_spread_bp,
        liquidity_cost_bp: rel_spread_bp,
    })
}

/// Stateless engine wrapper carrying the halted-quote epsilon.
#[derive(Debug, Clone)]
pub struct OrderbookFactorEngine {
    /// Quotes with a midpoint below this are treated as halted/bad
    min_mid: Decimal,
}

impl Default for OrderbookFactorEngine {
    fn default() -> Self {
        Self {
            min_mid: rust_decimal_macros::dec!(0.000001),
        }
    }
}

impl OrderbookFactorEngine {
    pub fn new(min_mid: Decimal) -> Self {
        Self { min_mid }
    }

    pub fn compute(&self, bid: Decimal, ask: Decimal) -> Option<OrderbookFactor> {
        quote_metrics(bid, ask, self.min_mid)
    }

    pub fn from_tick(&self, tick: &Tick) -> Option<OrderbookFactor> {
        quote_metrics(tick.bid, tick.ask, self.min_mid)
    }
}
