// Walk-Forward Backtest (Layer 3)
// Validates the fused directional signal across sequential, non-overlapping
// train/evaluation periods without information leakage across boundaries

pub mod cache;
pub mod orchestrator;
pub mod schedule;

pub use cache::{FactorCacheEntry, FactorCacheReader, InMemoryFactorCache};
pub use orchestrator::{SimulationResult, WalkForwardOrchestrator};
pub use schedule::{ScheduleError, WalkForwardConfig, WalkForwardPeriod};
