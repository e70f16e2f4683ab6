// Signal Generation
// Fuses short-window order-flow factors and long-horizon inertia into a
// single directional trading signal

pub mod fusion;
pub mod signals;

pub use fusion::{FusionConfig, FusionConfigError, SignalFusionEngine};
pub use signals::{SignalBucket, SignalFactor};
