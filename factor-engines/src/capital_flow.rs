// Capital Flow Engine
// Classifies trade aggressor side and computes windowed order-flow imbalance
// (SAI) plus its short-term momentum (MOI)

use crate::EngineConfigError;
use chrono::{DateTime, Utc};
use common::{Tick, TradeSide};
use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::debug;

/// Configuration for the capital flow engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapitalFlowConfig {
    /// Capacity of the classified-sample window; oldest evicted on overflow
    pub window_size: usize,
    /// Minimum samples before any factor is computed
    pub min_points: usize,
    /// A trade further than this many basis points from the quote midpoint
    /// is classified as aggressive (buyer above, seller below)
    pub side_tolerance_bp: Decimal,
}

impl Default for CapitalFlowConfig {
    fn default() -> Self {
        Self {
            window_size: 50,
            min_points: 10,
            side_tolerance_bp: rust_decimal_macros::dec!(1.0),
        }
    }
}

impl CapitalFlowConfig {
    pub fn validate(&self) -> Result<(), EngineConfigError> {
        if self.window_size == 0 {
            return Err(EngineConfigError::ZeroWindow(self.window_size));
        }
        if self.min_points == 0 {
            return Err(EngineConfigError::ZeroMinPoints(self.min_points));
        }
        if self.min_points > self.window_size {
            return Err(EngineConfigError::MinPointsExceedWindow {
                min_points: self.min_points,
                window_size: self.window_size,
            });
        }
        Ok(())
    }
}

/// One classified trade inside the window. Internal only.
#[derive(Debug, Clone)]
struct CapitalFlowSample {
    volume: Decimal,
    side: TradeSide,
}

/// Windowed order-flow imbalance factor.
///
/// `sai` and `moi` are `None` when the window cannot support them; absence
/// is distinct from a legitimate zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapitalFlowFactor {
    pub timestamp: DateTime<Utc>,
    pub symbol: String,
    pub window_trades: usize,
    pub window_volume: Decimal,
    pub buy_volume: Decimal,
    pub sell_volume: Decimal,
    pub net_signed_volume: Decimal,
    /// Smart Aggression Index: (buy - sell) / total window volume, in [-1, 1]
    pub sai: Option<f64>,
    /// Momentum of Imbalance: recent-half imbalance minus early-half imbalance
    pub moi: Option<f64>,
}

/// Estimates whether recent volume is dominated by aggressive buyers or
/// sellers, and the trend of that dominance.
#[derive(Debug, Clone)]
pub struct CapitalFlowEngine {
    config: CapitalFlowConfig,
    /// Bound symbol; `None` accepts every symbol into one window
    symbol: Option<String>,
    window: VecDeque<CapitalFlowSample>,
}

impl CapitalFlowEngine {
    pub fn new(
        symbol: Option<String>,
        config: CapitalFlowConfig,
    ) -> Result<Self, EngineConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            symbol,
            window: VecDeque::new(),
        })
    }

    /// Classifies a trade against its quote midpoint.
    ///
    /// Returns `None` when the quote is unusable. Trades within the bp
    /// tolerance band around the mid are `Neutral`.
    pub fn classify_side(&self, tick: &Tick) -> Option<TradeSide> {
        if !tick.has_valid_quote() {
            return None;
        }
        let mid = tick.mid();
        let band = mid * self.config.side_tolerance_bp / Decimal::from(10_000u32);
        if tick.price > mid + band {
            Some(TradeSide::Buy)
        } else if tick.price < mid - band {
            Some(TradeSide::Sell)
        } else {
            Some(TradeSide::Neutral)
        }
    }

    /// Feed one tick. Returns a freshly computed factor once the window
    /// holds at least `min_points` samples.
    ///
    /// Wrong-symbol, bad-quote, and non-positive-volume ticks are ignored.
    pub fn update(&mut self, tick: &Tick) -> Option<CapitalFlowFactor> {
        if let Some(bound) = &self.symbol {
            if *bound != tick.symbol {
                return None;
            }
        }
        if !tick.has_valid_trade() {
            debug!(symbol = %tick.symbol, "skipping tick with non-positive trade fields");
            return None;
        }
        let side = match self.classify_side(tick) {
            Some(side) => side,
            None => {
                debug!(symbol = %tick.symbol, "skipping tick with unusable quote");
                return None;
            }
        };

        self.window.push_back(CapitalFlowSample {
            volume: tick.volume,
            side,
        });
        while self.window.len() > self.config.window_size {
            self.window.pop_front();
        }

        if self.window.len() < self.config.min_points {
            return None;
        }
        Some(self.compute(tick.timestamp, &tick.symbol))
    }

    /// Replays a full tick sequence through a fresh engine and returns only
    /// the final factor. For offline recomputation and testing.
    pub fn replay(
        symbol: Option<String>,
        config: CapitalFlowConfig,
        ticks: &[Tick],
    ) -> Result<Option<CapitalFlowFactor>, EngineConfigError> {
        let mut engine = Self::new(symbol, config)?;
        let mut last = None;
        for tick in ticks {
            if let Some(factor) = engine.update(tick) {
                last = Some(factor);
            }
        }
        Ok(last)
    }

    pub fn window_len(&self) -> usize {
        self.window.len()
    }

    pub fn reset(&mut self) {
        self.window.clear();
    }

    /// Recomputes the factor fully from current window contents.
    fn compute(&self, timestamp: DateTime<Utc>, symbol: &str) -> CapitalFlowFactor {
        let (buy_volume, sell_volume, window_volume) = Self::tally(self.window.iter());
        let net_signed_volume = buy_volume - sell_volume;

        let sai = if window_volume > Decimal::ZERO {
            (net_signed_volume / window_volume).to_f64()
        } else {
            None
        };

        // Split the window in half by count: early samples vs recent samples.
        // With an odd count the extra sample lands in the recent half.
        let split = self.window.len() / 2;
        let early = Self::half_imbalance(self.window.iter().take(split));
        let recent = Self::half_imbalance(self.window.iter().skip(split));
        let moi = match (early, recent) {
            (Some(early), Some(recent)) => Some(recent - early),
            _ => None,
        };

        CapitalFlowFactor {
            timestamp,
            symbol: symbol.to_string(),
            window_trades: self.window.len(),
            window_volume,
            buy_volume,
            sell_volume,
            net_signed_volume,
            sai,
            moi,
        }
    }

    fn tally<'a>(
        samples: impl Iterator<Item = &'a CapitalFlowSample>,
    ) -> (Decimal, Decimal, Decimal) {
        let mut buy = Decimal::ZERO;
        let mut sell = Decimal::ZERO;
        let mut total = Decimal::ZERO;
        for sample in samples {
            total += sample.volume;
            match sample.side {
                TradeSide::Buy => buy += sample.volume,
                TradeSide::Sell => sell += sample.volume,
                TradeSide::Neutral => {}
            }
        }
        (buy, sell, total)
    }

    /// Signed volume over total volume for one half of the window; `None`
    /// when the half holds no volume.
    fn half_imbalance<'a>(
        samples: impl Iterator<Item = &'a CapitalFlowSample>,
    ) -> Option<f64> {
        let (buy, sell, total) = Self::tally(samples);
        if total <= Decimal::ZERO {
            return None;
        }
        ((buy - sell) / total).to_f64()
    }
}
