// Signal Fusion Engine
// Combines one CapitalFlowFactor and one InertiaFactor for the same symbol
// into a bounded score and a discrete bucket

use crate::signals::{SignalBucket, SignalFactor};
use factor_engines::{CapitalFlowFactor, InertiaFactor};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Configuration for the signal fusion engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusionConfig {
    /// Weight of the short-window SAI term
    pub w_sai: f64,
    /// Weight of the MOI term (after normalization)
    pub w_moi: f64,
    /// Weight of the long-horizon inertia term
    pub w_inertia: f64,
    /// MOI is divided by this before clipping to [-1, 1]; MOI itself is
    /// unbounded
    pub moi_scale: f64,
    /// |raw_score| at or above this is a weak signal
    pub weak_threshold: f64,
    /// |raw_score| at or above this is a strong signal
    pub strong_threshold: f64,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            w_sai: 0.5,
            w_moi: 0.2,
            w_inertia: 0.3,
            moi_scale: 2.0,
            weak_threshold: 0.2,
            strong_threshold: 0.6,
        }
    }
}

impl FusionConfig {
    pub fn validate(&self) -> Result<(), FusionConfigError> {
        if self.moi_scale <= 0.0 {
            return Err(FusionConfigError::NonPositiveMoiScale(self.moi_scale));
        }
        if self.weak_threshold <= 0.0 {
            return Err(FusionConfigError::NonPositiveWeakThreshold(
                self.weak_threshold,
            ));
        }
        if self.weak_threshold >= self.strong_threshold {
            return Err(FusionConfigError::ThresholdOrder {
                weak: self.weak_threshold,
                strong: self.strong_threshold,
            });
        }
        if self.strong_threshold > 1.0 {
            return Err(FusionConfigError::StrongThresholdAboveOne(
                self.strong_threshold,
            ));
        }
        Ok(())
    }
}

/// Configuration errors raised when constructing a fusion engine.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum FusionConfigError {
    #[error("moi_scale must be positive, got {0}")]
    NonPositiveMoiScale(f64),
    #[error("weak_threshold must be positive, got {0}")]
    NonPositiveWeakThreshold(f64),
    #[error("weak_threshold {weak} must be below strong_threshold {strong}")]
    ThresholdOrder { weak: f64, strong: f64 },
    #[error("strong_threshold must not exceed 1.0, got {0}")]
    StrongThresholdAboveOne(f64),
}

/// Fuses per-window and long-horizon imbalance estimates into one decision.
///
/// The engine is stateless per call; all validation happens at construction
/// so signal-time failures are limited to absent inputs.
#[derive(Debug, Clone)]
pub struct SignalFusionEngine {
    config: FusionConfig,
}

impl SignalFusionEngine {
    pub fn new(config: FusionConfig) -> Result<Self, FusionConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &FusionConfig {
        &self.config
    }

    /// Fuses one capital flow factor and one inertia factor.
    ///
    /// Returns `None` (no signal, not an error) when symbols mismatch or
    /// SAI/MOI are undefined.
    pub fn fuse(
        &self,
        capital_flow: &CapitalFlowFactor,
        inertia: &InertiaFactor,
    ) -> Option<SignalFactor> {
        if capital_flow.symbol != inertia.symbol {
            debug!(
                flow_symbol = %capital_flow.symbol,
                inertia_symbol = %inertia.symbol,
                "fusion inputs for different symbols"
            );
            return None;
        }
        let sai = capital_flow.sai?;
        let moi = capital_flow.moi?;

        let moi_term = clip(moi / self.config.moi_scale);
        let raw_score = clip(
            self.config.w_sai * sai
                + self.config.w_moi * moi_term
                + self.config.w_inertia * inertia.inertia_sai,
        );

        Some(SignalFactor {
            symbol: capital_flow.symbol.clone(),
            timestamp: capital_flow.timestamp,
            raw_score,
            bucket: self.classify(raw_score),
        })
    }

    /// Buckets a score, evaluated from the most extreme range inward.
    pub fn classify(&self, raw_score: f64) -> SignalBucket {
        if raw_score >= self.config.strong_threshold {
            SignalBucket::StrongBuy
        } else if raw_score >= self.config.weak_threshold {
            SignalBucket::WeakBuy
        } else if raw_score <= -self.config.strong_threshold {
            SignalBucket::StrongSell
        } else if raw_score <= -self.config.weak_threshold {
            SignalBucket::WeakSell
        } else {
            SignalBucket::Neutral
        }
    }
}

fn clip(value: f64) -> f64 {
    value.clamp(-1.0, 1.0)
}
