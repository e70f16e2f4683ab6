// Factor Cache Interface
// Replayable source of precomputed (capital flow, inertia) factor pairs

use anyhow::Result;
use chrono::{DateTime, Utc};
use factor_engines::{CapitalFlowFactor, InertiaFactor};
use serde::{Deserialize, Serialize};

/// One cached observation: a timestamped pair of factors for one symbol,
/// either half of which may be absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactorCacheEntry {
    pub timestamp: DateTime<Utc>,
    pub symbol: String,
    pub capital_flow: Option<CapitalFlowFactor>,
    pub inertia: Option<InertiaFactor>,
}

impl FactorCacheEntry {
    /// Splits the entry into its two halves.
    pub fn unpack(self) -> (Option<CapitalFlowFactor>, Option<InertiaFactor>) {
        (self.capital_flow, self.inertia)
    }

    /// True when both halves are present.
    pub fn is_complete(&self) -> bool {
        self.capital_flow.is_some() && self.inertia.is_some()
    }
}

/// Trait for factor cache backends.
///
/// This is the orchestrator's only real I/O boundary; a `load` failure
/// propagates uncaught to the caller. Returned entries carry no ordering
/// guarantee.
#[async_trait::async_trait]
pub trait FactorCacheReader: Send + Sync {
    /// Load every cached entry for the given symbols with a timestamp in
    /// [start, end], in no particular order.
    async fn load(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        symbols: &[String],
    ) -> Result<Vec<FactorCacheEntry>>;
}

/// In-memory factor cache (for testing and development)
pub struct InMemoryFactorCache {
    entries: tokio::sync::RwLock<Vec<FactorCacheEntry>>,
}

impl InMemoryFactorCache {
    pub fn new() -> Self {
        Self {
            entries: tokio::sync::RwLock::new(Vec::new()),
        }
    }

    pub async fn insert(&self, entry: FactorCacheEntry) {
        let mut entries = self.entries.write().await;
        entries.push(entry);
    }

    pub async fn insert_many(&self, batch: impl IntoIterator<Item = FactorCacheEntry>) {
        let mut entries = self.entries.write().await;
        entries.extend(batch);
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl Default for InMemoryFactorCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl FactorCacheReader for InMemoryFactorCache {
    async fn load(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        symbols: &[String],
    ) -> Result<Vec<FactorCacheEntry>> {
        let entries = self.entries.read().await;
        let matching = entries
            .iter()
            .filter(|e| e.timestamp >= start && e.timestamp <= end)
            .filter(|e| symbols.iter().any(|s| *s == e.symbol))
            .cloned()
            .collect();
        Ok(matching)
    }
}
