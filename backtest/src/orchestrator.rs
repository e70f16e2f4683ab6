// Walk-Forward Orchestrator
// Replays cached factor data period by period through fresh engine sets and
// retains only out-of-sample signal emissions

use crate::cache::FactorCacheReader;
use crate::schedule::{WalkForwardConfig, WalkForwardPeriod};
use anyhow::Result;
use common::Tick;
use factor_engines::{CapitalFlowEngine, CapitalFlowFactor, InertiaFactor, InertiaFactorEngine};
use serde::{Deserialize, Serialize};
use signal_generation::{SignalFactor, SignalFusionEngine};
use std::collections::HashMap;
use tracing::{debug, info};
use uuid::Uuid;

/// Signals emitted for one (period, symbol) during the evaluation sub-window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationResult {
    pub id: Uuid,
    pub period: WalkForwardPeriod,
    pub symbol: String,
    /// Ordered by timestamp; possibly empty
    pub signals: Vec<SignalFactor>,
}

/// The full engine set for one symbol within one period.
///
/// Periods are the unit of engine lifetime: a set is constructed at period
/// start, used for that period's replay, and discarded. Sets are never
/// pooled or reset across periods, which is what guarantees zero state
/// leakage between them.
struct PeriodEngines {
    capital_flow: CapitalFlowEngine,
    inertia: InertiaFactorEngine,
    fusion: SignalFusionEngine,
}

impl PeriodEngines {
    fn build(symbol: &str, config: &WalkForwardConfig) -> Result<Self> {
        // Engine parameters were already validated with the schedule
        Ok(Self {
            capital_flow: CapitalFlowEngine::new(
                Some(symbol.to_string()),
                config.capital_flow.clone(),
            )?,
            inertia: InertiaFactorEngine::new(symbol, config.inertia.clone())?,
            fusion: SignalFusionEngine::new(config.fusion.clone())?,
        })
    }

    /// Cached replay path: fuse a precomputed factor pair.
    fn process_pair(
        &self,
        capital_flow: &CapitalFlowFactor,
        inertia: &InertiaFactor,
    ) -> Option<SignalFactor> {
        self.fusion.fuse(capital_flow, inertia)
    }

    /// Live replay path: drive the full chain from a raw tick.
    fn process_tick(&mut self, tick: &Tick) -> Option<SignalFactor> {
        let capital_flow = self.capital_flow.update(tick)?;
        let inertia = self.inertia.update(&capital_flow)?;
        self.fusion.fuse(&capital_flow, &inertia)
    }
}

/// Runs a validated walk-forward schedule against a factor cache.
pub struct WalkForwardOrchestrator {
    config: WalkForwardConfig,
    cache: Box<dyn FactorCacheReader>,
}

impl WalkForwardOrchestrator {
    pub fn new(config: WalkForwardConfig, cache: Box<dyn FactorCacheReader>) -> Self {
        Self { config, cache }
    }

    pub fn config(&self) -> &WalkForwardConfig {
        &self.config
    }

    /// Replays every configured period against the cache and returns one
    /// `SimulationResult` per (period, symbol).
    ///
    /// Cache-load failures propagate; missing or partial per-entry data is
    /// silently skipped.
    pub async fn run_simulation(&self) -> Result<Vec<SimulationResult>> {
        let mut results = Vec::new();

        for (index, period) in self.config.periods().iter().enumerate() {
            let mut entries = self
                .cache
                .load(period.train_start, period.oos_end, self.config.symbols())
                .await?;
            // Source order is not guaranteed; windows and warm-up depend on
            // non-decreasing timestamps
            entries.sort_by_key(|e| e.timestamp);

            info!(
                period = index,
                entries = entries.len(),
                oos_start = %period.oos_start,
                oos_end = %period.oos_end,
                "replaying walk-forward period"
            );

            let mut engines = self.build_engine_sets()?;
            let mut oos_signals: HashMap<String, Vec<SignalFactor>> = HashMap::new();

            for entry in entries {
                let symbol = entry.symbol.clone();
                let engine_set = match engines.get_mut(&symbol) {
                    Some(set) => set,
                    None => {
                        debug!(symbol = %symbol, "skipping entry for unconfigured symbol");
                        continue;
                    }
                };
                let (capital_flow, inertia) = entry.unpack();
                let (Some(capital_flow), Some(inertia)) = (capital_flow, inertia) else {
                    debug!(symbol = %symbol, "skipping entry missing half of the factor pair");
                    continue;
                };

                if let Some(signal) = engine_set.process_pair(&capital_flow, &inertia) {
                    // Training-window signals are computed for warm-up but
                    // never retained
                    if period.in_oos(signal.timestamp) {
                        oos_signals.entry(symbol).or_default().push(signal);
                    }
                }
            }

            for symbol in self.config.symbols() {
                results.push(SimulationResult {
                    id: Uuid::new_v4(),
                    period: *period,
                    symbol: symbol.clone(),
                    signals: oos_signals.remove(symbol).unwrap_or_default(),
                });
            }
        }

        Ok(results)
    }

    /// Same per-period lifecycle over a raw tick stream, for running without
    /// a pre-populated factor cache. Every engine in the per-symbol set is
    /// rebuilt fresh each period.
    pub fn run_tick_replay(&self, ticks: &[Tick]) -> Result<Vec<SimulationResult>> {
        let mut results = Vec::new();

        for (index, period) in self.config.periods().iter().enumerate() {
            let mut span: Vec<&Tick> = ticks
                .iter()
                .filter(|t| period.contains(t.timestamp))
                .collect();
            span.sort_by_key(|t| t.timestamp);

            info!(period = index, ticks = span.len(), "replaying period from ticks");

            let mut engines = self.build_engine_sets()?;
            let mut oos_signals: HashMap<String, Vec<SignalFactor>> = HashMap::new();

            for tick in span {
                let Some(engine_set) = engines.get_mut(&tick.symbol) else {
                    continue;
                };
                if let Some(signal) = engine_set.process_tick(tick) {
                    if period.in_oos(signal.timestamp) {
                        oos_signals
                            .entry(tick.symbol.clone())
                            .or_default()
                            .push(signal);
                    }
                }
            }

            for symbol in self.config.symbols() {
                results.push(SimulationResult {
                    id: Uuid::new_v4(),
                    period: *period,
                    symbol: symbol.clone(),
                    signals: oos_signals.remove(symbol).unwrap_or_default(),
                });
            }
        }

        Ok(results)
    }

    /// Brand-new engine instances per target symbol. Called once per period;
    /// previous sets are dropped, never reused.
    fn build_engine_sets(&self) -> Result<HashMap<String, PeriodEngines>> {
        let mut engines = HashMap::new();
        for symbol in self.config.symbols() {
            engines.insert(symbol.clone(), PeriodEngines::build(symbol, &self.config)?);
        }
        Ok(engines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{FactorCacheEntry, InMemoryFactorCache};
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use factor_engines::{CapitalFlowConfig, InertiaConfig};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use signal_generation::FusionConfig;

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    }

    fn ts(minutes: i64) -> DateTime<Utc> {
        base() + Duration::minutes(minutes)
    }

    fn period(train_start: i64, train_end: i64, oos_start: i64, oos_end: i64) -> WalkForwardPeriod {
        WalkForwardPeriod {
            train_start: ts(train_start),
            train_end: ts(train_end),
            oos_start: ts(oos_start),
            oos_end: ts(oos_end),
        }
    }

    fn entry(minutes: i64, symbol: &str, sai: f64, moi: f64, inertia_sai: f64) -> FactorCacheEntry {
        let timestamp = ts(minutes);
        FactorCacheEntry {
            timestamp,
            symbol: symbol.to_string(),
            capital_flow: Some(CapitalFlowFactor {
                timestamp,
                symbol: symbol.to_string(),
                window_trades: 20,
                window_volume: Decimal::from(20u32),
                buy_volume: Decimal::from(12u32),
                sell_volume: Decimal::from(8u32),
                net_signed_volume: Decimal::from(4u32),
                sai: Some(sai),
                moi: Some(moi),
            }),
            inertia: Some(InertiaFactor {
                symbol: symbol.to_string(),
                timestamp,
                inertia_sai,
            }),
        }
    }

    fn config(periods: Vec<WalkForwardPeriod>) -> WalkForwardConfig {
        WalkForwardConfig::new(
            periods,
            vec!["BTC-USD".to_string()],
            CapitalFlowConfig {
                window_size: 10,
                min_points: 3,
                side_tolerance_bp: dec!(1.0),
            },
            InertiaConfig {
                window_size: 20,
                min_effective_points: 3,
            },
            FusionConfig::default(),
        )
        .unwrap()
    }

    async fn cache_of(entries: Vec<FactorCacheEntry>) -> Box<InMemoryFactorCache> {
        let cache = InMemoryFactorCache::new();
        cache.insert_many(entries).await;
        Box::new(cache)
    }

    #[tokio::test]
    async fn test_two_periods_produce_two_results() {
        // Two consecutive non-overlapping periods, 30 time-ordered entries
        let periods = vec![period(0, 10, 10, 15), period(15, 25, 25, 30)];
        let entries: Vec<FactorCacheEntry> = (0..30)
            .map(|i| entry(i, "BTC-USD", 0.6, 0.2, 0.5))
            .collect();

        let orchestrator =
            WalkForwardOrchestrator::new(config(periods), cache_of(entries).await);
        let results = orchestrator.run_simulation().await.unwrap();

        assert_eq!(results.len(), 2);
        for result in &results {
            assert!(!result.signals.is_empty());
            for signal in &result.signals {
                assert!(result.period.in_oos(signal.timestamp));
                assert!(signal.raw_score >= -1.0 && signal.raw_score <= 1.0);
            }
            // Emission order follows the in-period timestamp sort
            for pair in result.signals.windows(2) {
                assert!(pair[0].timestamp <= pair[1].timestamp);
            }
        }
    }

    #[tokio::test]
    async fn test_unsorted_cache_is_sorted_in_period() {
        let periods = vec![period(0, 10, 10, 15)];
        // Insert in reverse timestamp order
        let entries: Vec<FactorCacheEntry> = (0..15)
            .rev()
            .map(|i| entry(i, "BTC-USD", 0.4, 0.0, 0.4))
            .collect();

        let orchestrator =
            WalkForwardOrchestrator::new(config(periods), cache_of(entries).await);
        let results = orchestrator.run_simulation().await.unwrap();

        let signals = &results[0].signals;
        assert!(!signals.is_empty());
        for pair in signals.windows(2) {
            assert!(pair[0].timestamp <= pair[1].timestamp);
        }
    }

    #[tokio::test]
    async fn test_partial_and_unconfigured_entries_skipped() {
        let periods = vec![period(0, 5, 5, 10)];
        let mut entries: Vec<FactorCacheEntry> =
            (0..10).map(|i| entry(i, "BTC-USD", 0.6, 0.2, 0.5)).collect();
        // Strip one half from an in-oos entry
        entries[7].inertia = None;
        // Unconfigured symbol never reaches an engine set
        entries.push(entry(6, "ETH-USD", 0.9, 0.9, 0.9));

        let orchestrator =
            WalkForwardOrchestrator::new(config(periods), cache_of(entries).await);
        let results = orchestrator.run_simulation().await.unwrap();

        assert_eq!(results.len(), 1);
        let signals = &results[0].signals;
        // oos minutes 5..=9 present, minus the stripped entry at minute 7
        assert_eq!(signals.len(), 4);
        assert!(signals.iter().all(|s| s.symbol == "BTC-USD"));
    }

    #[tokio::test]
    async fn test_empty_oos_yields_empty_result() {
        let periods = vec![period(0, 5, 5, 10)];
        // All entries inside the training window only
        let entries: Vec<FactorCacheEntry> =
            (0..5).map(|i| entry(i, "BTC-USD", 0.6, 0.2, 0.5)).collect();

        let orchestrator =
            WalkForwardOrchestrator::new(config(periods), cache_of(entries).await);
        let results = orchestrator.run_simulation().await.unwrap();

        assert_eq!(results.len(), 1);
        assert!(results[0].signals.is_empty());
    }

    #[tokio::test]
    async fn test_boundary_discontinuity_does_not_leak() {
        let periods = vec![period(0, 10, 10, 15), period(15, 25, 25, 30)];
        let baseline: Vec<FactorCacheEntry> = (0..=30)
            .map(|i| entry(i, "BTC-USD", 0.3, 0.1, 0.3))
            .collect();

        // Same data but with an extreme shock right at the end of period 1
        let mut shocked = baseline.clone();
        shocked[14] = entry(14, "BTC-USD", -1.0, -50.0, -1.0);
        shocked[15] = entry(15, "BTC-USD", -1.0, -50.0, -1.0);

        let orch_a =
            WalkForwardOrchestrator::new(config(periods.clone()), cache_of(baseline).await);
        let orch_b = WalkForwardOrchestrator::new(config(periods), cache_of(shocked).await);

        let a = orch_a.run_simulation().await.unwrap();
        let b = orch_b.run_simulation().await.unwrap();

        // Period 2 output is bit-identical despite the period-1 shock
        let a2 = &a[1];
        let b2 = &b[1];
        assert_eq!(a2.signals.len(), b2.signals.len());
        for (sa, sb) in a2.signals.iter().zip(b2.signals.iter()) {
            assert_eq!(sa.timestamp, sb.timestamp);
            assert_eq!(sa.raw_score, sb.raw_score);
            assert_eq!(sa.bucket, sb.bucket);
        }
    }

    #[tokio::test]
    async fn test_tick_replay_builds_factors_per_period() {
        let periods = vec![period(0, 10, 10, 20)];
        let orchestrator = WalkForwardOrchestrator::new(
            config(periods),
            Box::new(InMemoryFactorCache::new()),
        );

        // Steady buyer-dominated flow across the full span
        let ticks: Vec<Tick> = (0..=20)
            .map(|i| Tick {
                timestamp: ts(i),
                symbol: "BTC-USD".to_string(),
                price: dec!(100.45),
                volume: dec!(2),
                bid: dec!(100.0),
                ask: dec!(100.5),
            })
            .collect();

        let results = orchestrator.run_tick_replay(&ticks).unwrap();
        assert_eq!(results.len(), 1);
        let signals = &results[0].signals;
        assert!(!signals.is_empty());
        for signal in signals {
            assert!(results[0].period.in_oos(signal.timestamp));
            // All-buy flow must score positive
            assert!(signal.raw_score > 0.0);
        }
    }
}
