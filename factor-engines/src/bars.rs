// Volume Bar Aggregator
// Buckets a per-symbol tick stream into volume-thresholded "information time" bars

use crate::EngineConfigError;
use chrono::{DateTime, Utc};
use common::Tick;
use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::debug;

/// Configuration for the volume bar aggregator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeBarConfig {
    /// Cumulative traded volume that closes a bar
    pub volume_threshold: Decimal,
    /// Number of completed bars retained for `recent_bars` and the
    /// information-time ratio
    pub max_history: usize,
}

impl Default for VolumeBarConfig {
    fn default() -> Self {
        Self {
            volume_threshold: rust_decimal_macros::dec!(1000),
            max_history: 256,
        }
    }
}

/// A completed volume-thresholded bar. Immutable once emitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeBar {
    pub symbol: String,
    pub start_ts: DateTime<Utc>,
    pub end_ts: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    /// Volume-weighted average price over the bar
    pub vwap: Decimal,
    pub total_volume: Decimal,
    pub tick_count: usize,
    pub avg_bid: Decimal,
    pub avg_ask: Decimal,
}

impl VolumeBar {
    /// Wall-clock duration of the bar in seconds.
    pub fn duration_secs(&self) -> f64 {
        (self.end_ts - self.start_ts).num_milliseconds() as f64 / 1000.0
    }
}

/// Fill state of the in-progress accumulator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BarStatus {
    Empty,
    Accumulating,
}

/// Non-mutating snapshot of the in-progress bar
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BarProgress {
    pub status: BarStatus,
    /// Accumulated volume as a fraction of the threshold, in [0, 1)
    pub fraction: f64,
    pub volume: Decimal,
    pub tick_count: usize,
}

#[derive(Debug, Clone, Default)]
struct BarAccumulator {
    start_ts: Option<DateTime<Utc>>,
    end_ts: Option<DateTime<Utc>>,
    open: Option<Decimal>,
    high: Option<Decimal>,
    low: Option<Decimal>,
    close: Option<Decimal>,
    price_volume_sum: Decimal,
    volume_sum: Decimal,
    bid_sum: Decimal,
    ask_sum: Decimal,
    tick_count: usize,
}

/// Accumulates ticks for one symbol into volume-thresholded bars.
///
/// Bars normalize for activity intensity rather than wall-clock time: a busy
/// market closes bars quickly, a quiet one slowly. When a single trade
/// overshoots the threshold the excess volume is discarded and the next bar
/// starts empty.
#[derive(Debug, Clone)]
pub struct VolumeBarAggregator {
    symbol: String,
    config: VolumeBarConfig,
    accumulator: BarAccumulator,
    completed: VecDeque<VolumeBar>,
}

impl VolumeBarAggregator {
    pub fn new(symbol: impl Into<String>, config: VolumeBarConfig) -> Result<Self, EngineConfigError> {
        if config.volume_threshold <= Decimal::ZERO {
            return Err(EngineConfigError::NonPositiveBarThreshold(
                config.volume_threshold,
            ));
        }
        if config.max_history == 0 {
            return Err(EngineConfigError::ZeroWindow(config.max_history));
        }
        Ok(Self {
            symbol: symbol.into(),
            config,
            accumulator: BarAccumulator::default(),
            completed: VecDeque::new(),
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Feed one tick. Returns the completed bar when the accumulated volume
    /// reaches the configured threshold, otherwise `None`.
    ///
    /// Malformed ticks (non-positive trade price/volume, unusable quote,
    /// wrong symbol) are skipped, never fatal.
    pub fn add_tick(&mut self, tick: &Tick) -> Option<VolumeBar> {
        if tick.symbol != self.symbol {
            return None;
        }
        if !tick.has_valid_trade() || !tick.has_valid_quote() {
            debug!(symbol = %tick.symbol, "skipping malformed tick in bar aggregation");
            return None;
        }

        let acc = &mut self.accumulator;
        if acc.start_ts.is_none() {
            acc.start_ts = Some(tick.timestamp);
            acc.open = Some(tick.price);
            acc.high = Some(tick.price);
            acc.low = Some(tick.price);
        }
        acc.end_ts = Some(tick.timestamp);
        acc.close = Some(tick.price);
        acc.high = Some(acc.high.map_or(tick.price, |h| h.max(tick.price)));
        acc.low = Some(acc.low.map_or(tick.price, |l| l.min(tick.price)));
        acc.price_volume_sum += tick.price * tick.volume;
        acc.volume_sum += tick.volume;
        acc.bid_sum += tick.bid;
        acc.ask_sum += tick.ask;
        acc.tick_count += 1;

        if acc.volume_sum >= self.config.volume_threshold {
            let bar = self.finish_bar()?;
            self.completed.push_back(bar.clone());
            while self.completed.len() > self.config.max_history {
                self.completed.pop_front();
            }
            return Some(bar);
        }
        None
    }

    /// Reports the in-progress accumulator without mutating it.
    pub fn current_progress(&self) -> BarProgress {
        let acc = &self.accumulator;
        let status = if acc.tick_count == 0 {
            BarStatus::Empty
        } else {
            BarStatus::Accumulating
        };
        let fraction = (acc.volume_sum / self.config.volume_threshold)
            .to_f64()
            .unwrap_or(0.0);
        BarProgress {
            status,
            fraction,
            volume: acc.volume_sum,
            tick_count: acc.tick_count,
        }
    }

    /// The last `n` completed bars, oldest first. Non-mutating.
    pub fn recent_bars(&self, n: usize) -> Vec<VolumeBar> {
        let skip = self.completed.len().saturating_sub(n);
        self.completed.iter().skip(skip).cloned().collect()
    }

    pub fn completed_count(&self) -> usize {
        self.completed.len()
    }

    /// Latest bar duration divided by the long-run average bar duration.
    ///
    /// Values above 1 mean activity is slowing (bars take longer to fill),
    /// below 1 that it is accelerating. Undefined until two bars completed
    /// or when the average duration is zero.
    pub fn information_time_ratio(&self) -> Option<f64> {
        if self.completed.len() < 2 {
            return None;
        }
        let latest = self.completed.back()?.duration_secs();
        let total: f64 = self.completed.iter().map(|b| b.duration_secs()).sum();
        let avg = total / self.completed.len() as f64;
        if avg <= 0.0 {
            return None;
        }
        Some(latest / avg)
    }

    /// Clears the accumulator and the completed-bar history.
    pub fn reset(&mut self) {
        self.accumulator = BarAccumulator::default();
        self.completed.clear();
    }

    fn finish_bar(&mut self) -> Option<VolumeBar> {
        let acc = std::mem::take(&mut self.accumulator);
        if acc.volume_sum <= Decimal::ZERO || acc.tick_count == 0 {
            return None;
        }
        let ticks = Decimal::from(acc.tick_count as u64);
        Some(VolumeBar {
            symbol: self.symbol.clone(),
            start_ts: acc.start_ts?,
            end_ts: acc.end_ts?,
            open: acc.open?,
            high: acc.high?,
            low: acc.low?,
            close: acc.close?,
            vwap: acc.price_volume_sum / acc.volume_sum,
            total_volume: acc.volume_sum,
            tick_count: acc.tick_count,
            avg_bid: acc.bid_sum / ticks,
            avg_ask: acc.ask_sum / ticks,
        })
    }
}
