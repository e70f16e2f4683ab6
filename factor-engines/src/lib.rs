// Streaming Factor Engines
// Converts a per-symbol tick stream into volume bars and order-flow factors

pub mod bars;
pub mod capital_flow;
pub mod inertia;
pub mod orderbook;

pub use bars::{BarProgress, BarStatus, VolumeBarAggregator, VolumeBarConfig, VolumeBar};
pub use capital_flow::{CapitalFlowConfig, CapitalFlowEngine, CapitalFlowFactor};
pub use inertia::{InertiaConfig, InertiaFactor, InertiaFactorEngine};
pub use orderbook::{quote_metrics, OrderbookFactor, OrderbookFactorEngine};

/// Configuration errors raised at engine construction.
///
/// Data-quality problems in the tick stream are never errors; they surface
/// as an absent factor for that step. This type only covers parameters that
/// make an engine structurally unusable.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum EngineConfigError {
    #[error("window_size must be positive, got {0}")]
    ZeroWindow(usize),
    #[error("min_points must be positive, got {0}")]
    ZeroMinPoints(usize),
    #[error("min_points {min_points} exceeds window_size {window_size}")]
    MinPointsExceedWindow {
        min_points: usize,
        window_size: usize,
    },
    #[error("bar volume threshold must be positive, got {0}")]
    NonPositiveBarThreshold(rust_decimal::Decimal),
}
