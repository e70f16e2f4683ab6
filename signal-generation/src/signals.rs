use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Discrete directional classification of a fused score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalBucket {
    StrongBuy,
    WeakBuy,
    Neutral,
    WeakSell,
    StrongSell,
}

/// Fused directional trading signal. Immutable once derived.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalFactor {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    /// Weighted, clipped fusion score in [-1, 1]
    pub raw_score: f64,
    pub bucket: SignalBucket,
}
