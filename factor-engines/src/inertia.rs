// Inertia Factor Engine
// Smooths the short-window SAI series into a longer-horizon estimate that is
// robust to single-window noise

use crate::{CapitalFlowFactor, EngineConfigError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::debug;

/// Configuration for the inertia factor engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InertiaConfig {
    /// Capacity of the SAI observation window; sized larger than the capital
    /// flow window
    pub window_size: usize,
    /// Minimum SAI observations before any factor is emitted
    pub min_effective_points: usize,
}

impl Default for InertiaConfig {
    fn default() -> Self {
        Self {
            window_size: 200,
            min_effective_points: 20,
        }
    }
}

impl InertiaConfig {
    pub fn validate(&self) -> Result<(), EngineConfigError> {
        if self.window_size == 0 {
            return Err(EngineConfigError::ZeroWindow(self.window_size));
        }
        if self.min_effective_points == 0 {
            return Err(EngineConfigError::ZeroMinPoints(self.min_effective_points));
        }
        if self.min_effective_points > self.window_size {
            return Err(EngineConfigError::MinPointsExceedWindow {
                min_points: self.min_effective_points,
                window_size: self.window_size,
            });
        }
        Ok(())
    }
}

/// Long-horizon smoothed imbalance estimate, in [-1, 1] by construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InertiaFactor {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub inertia_sai: f64,
}

/// Maintains a bounded window of SAI observations for one symbol and emits
/// their window mean once enough observations have accumulated.
#[derive(Debug, Clone)]
pub struct InertiaFactorEngine {
    config: InertiaConfig,
    symbol: String,
    window: VecDeque<(f64, DateTime<Utc>)>,
}

impl InertiaFactorEngine {
    pub fn new(symbol: impl Into<String>, config: InertiaConfig) -> Result<Self, EngineConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            symbol: symbol.into(),
            window: VecDeque::new(),
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Feed one capital flow factor. Instances with an undefined SAI or a
    /// mismatched symbol are ignored.
    pub fn update(&mut self, factor: &CapitalFlowFactor) -> Option<InertiaFactor> {
        if factor.symbol != self.symbol {
            return None;
        }
        let sai = match factor.sai {
            Some(sai) => sai,
            None => {
                debug!(symbol = %factor.symbol, "ignoring capital flow factor without SAI");
                return None;
            }
        };

        self.window.push_back((sai, factor.timestamp));
        while self.window.len() > self.config.window_size {
            self.window.pop_front();
        }

        if self.window.len() < self.config.min_effective_points {
            return None;
        }

        // Mean of values each in [-1, 1] stays in [-1, 1]
        let sum: f64 = self.window.iter().map(|(sai, _)| sai).sum();
        Some(InertiaFactor {
            symbol: self.symbol.clone(),
            timestamp: factor.timestamp,
            inertia_sai: sum / self.window.len() as f64,
        })
    }

    pub fn window_len(&self) -> usize {
        self.window.len()
    }

    pub fn reset(&mut self) {
        self.window.clear();
    }
}
