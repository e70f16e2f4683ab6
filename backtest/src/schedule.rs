// Walk-Forward Schedule
// Declarative train/evaluation periods with fail-fast validation

use chrono::{DateTime, Utc};
use factor_engines::{CapitalFlowConfig, InertiaConfig};
use serde::{Deserialize, Serialize};
use signal_generation::FusionConfig;

/// One train/evaluation period. Immutable value.
///
/// The training sub-window [train_start, train_end) warms engine state; only
/// signals from the out-of-sample sub-window [oos_start, oos_end] are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalkForwardPeriod {
    pub train_start: DateTime<Utc>,
    pub train_end: DateTime<Utc>,
    pub oos_start: DateTime<Utc>,
    pub oos_end: DateTime<Utc>,
}

impl WalkForwardPeriod {
    /// True when a timestamp falls in the full replay span.
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.train_start && ts <= self.oos_end
    }

    /// True when a timestamp falls in the evaluation sub-window.
    pub fn in_oos(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.oos_start && ts <= self.oos_end
    }
}

/// Schedule or engine-parameter errors raised once at configuration time.
#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    #[error("period list is empty")]
    NoPeriods,
    #[error("symbol set is empty")]
    NoSymbols,
    #[error(
        "period {index} timestamps out of order: require train_start < train_end <= oos_start < oos_end"
    )]
    PeriodOrder { index: usize },
    #[error("period {index} overlaps the previous period")]
    PeriodOverlap { index: usize },
    #[error("invalid engine parameters: {0}")]
    Engine(#[from] factor_engines::EngineConfigError),
    #[error("invalid fusion parameters: {0}")]
    Fusion(#[from] signal_generation::FusionConfigError),
}

/// Validated walk-forward configuration. Immutable after construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkForwardConfig {
    periods: Vec<WalkForwardPeriod>,
    symbols: Vec<String>,
    pub capital_flow: CapitalFlowConfig,
    pub inertia: InertiaConfig,
    pub fusion: FusionConfig,
}

impl WalkForwardConfig {
    /// Validates the schedule and engine parameters once, up front.
    ///
    /// Periods must be declared in order, internally consistent, and
    /// non-overlapping: period[i].oos_end <= period[i+1].train_start.
    pub fn new(
        periods: Vec<WalkForwardPeriod>,
        symbols: Vec<String>,
        capital_flow: CapitalFlowConfig,
        inertia: InertiaConfig,
        fusion: FusionConfig,
    ) -> Result<Self, ScheduleError> {
        if periods.is_empty() {
            return Err(ScheduleError::NoPeriods);
        }
        if symbols.is_empty() {
            return Err(ScheduleError::NoSymbols);
        }
        for (index, period) in periods.iter().enumerate() {
            let ordered = period.train_start < period.train_end
                && period.train_end <= period.oos_start
                && period.oos_start < period.oos_end;
            if !ordered {
                return Err(ScheduleError::PeriodOrder { index });
            }
            if index > 0 && periods[index - 1].oos_end > period.train_start {
                return Err(ScheduleError::PeriodOverlap { index });
            }
        }

        // Engine parameters fail at configuration time, not at signal time
        capital_flow.validate()?;
        inertia.validate()?;
        fusion.validate()?;

        Ok(Self {
            periods,
            symbols,
            capital_flow,
            inertia,
            fusion,
        })
    }

    pub fn periods(&self) -> &[WalkForwardPeriod] {
        &self.periods
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn is_configured_symbol(&self, symbol: &str) -> bool {
        self.symbols.iter().any(|s| s == symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn ts(hours: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap() + Duration::hours(hours)
    }

    fn period(train_start: i64, train_end: i64, oos_start: i64, oos_end: i64) -> WalkForwardPeriod {
        WalkForwardPeriod {
            train_start: ts(train_start),
            train_end: ts(train_end),
            oos_start: ts(oos_start),
            oos_end: ts(oos_end),
        }
    }

    fn config_with(periods: Vec<WalkForwardPeriod>) -> Result<WalkForwardConfig, ScheduleError> {
        WalkForwardConfig::new(
            periods,
            vec!["BTC-USD".to_string()],
            CapitalFlowConfig::default(),
            InertiaConfig::default(),
            FusionConfig::default(),
        )
    }

    #[test]
    fn test_valid_schedule() {
        let config = config_with(vec![period(0, 4, 4, 6), period(6, 10, 10, 12)]).unwrap();
        assert_eq!(config.periods().len(), 2);
        assert!(config.is_configured_symbol("BTC-USD"));
        assert!(!config.is_configured_symbol("ETH-USD"));
    }

    #[test]
    fn test_empty_periods_rejected() {
        assert!(matches!(config_with(vec![]), Err(ScheduleError::NoPeriods)));
    }

    #[test]
    fn test_empty_symbols_rejected() {
        let result = WalkForwardConfig::new(
            vec![period(0, 4, 4, 6)],
            vec![],
            CapitalFlowConfig::default(),
            InertiaConfig::default(),
            FusionConfig::default(),
        );
        assert!(matches!(result, Err(ScheduleError::NoSymbols)));
    }

    #[test]
    fn test_out_of_order_period_rejected() {
        // train_end after oos_start
        let result = config_with(vec![period(0, 5, 4, 6)]);
        assert!(matches!(result, Err(ScheduleError::PeriodOrder { index: 0 })));

        // oos_end before oos_start
        let result = config_with(vec![period(0, 4, 6, 5)]);
        assert!(matches!(result, Err(ScheduleError::PeriodOrder { index: 0 })));
    }

    #[test]
    fn test_overlapping_periods_rejected() {
        let result = config_with(vec![period(0, 4, 4, 8), period(6, 10, 10, 12)]);
        assert!(matches!(result, Err(ScheduleError::PeriodOverlap { index: 1 })));
    }

    #[test]
    fn test_touching_periods_allowed() {
        // period[0].oos_end == period[1].train_start
        assert!(config_with(vec![period(0, 4, 4, 6), period(6, 8, 8, 10)]).is_ok());
    }

    #[test]
    fn test_invalid_engine_params_rejected() {
        let result = WalkForwardConfig::new(
            vec![period(0, 4, 4, 6)],
            vec!["BTC-USD".to_string()],
            CapitalFlowConfig {
                window_size: 5,
                min_points: 10,
                ..CapitalFlowConfig::default()
            },
            InertiaConfig::default(),
            FusionConfig::default(),
        );
        assert!(matches!(result, Err(ScheduleError::Engine(_))));
    }

    #[test]
    fn test_oos_window_membership() {
        let p = period(0, 4, 4, 6);
        assert!(p.contains(ts(0)));
        assert!(p.contains(ts(6)));
        assert!(!p.contains(ts(7)));
        assert!(!p.in_oos(ts(3)));
        assert!(p.in_oos(ts(4)));
        assert!(p.in_oos(ts(6)));
    }
}
