//! Example walk-forward run over a synthetic factor cache

use backtest::{
    FactorCacheEntry, InMemoryFactorCache, WalkForwardConfig, WalkForwardOrchestrator,
    WalkForwardPeriod,
};
use chrono::{Duration, TimeZone, Utc};
use factor_engines::{CapitalFlowConfig, CapitalFlowFactor, InertiaConfig, InertiaFactor};
use rust_decimal::Decimal;
use signal_generation::FusionConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().init();

    let base = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
    let ts = |minutes: i64| base + Duration::minutes(minutes);

    let periods = vec![
        WalkForwardPeriod {
            train_start: ts(0),
            train_end: ts(60),
            oos_start: ts(60),
            oos_end: ts(90),
        },
        WalkForwardPeriod {
            train_start: ts(90),
            train_end: ts(150),
            oos_start: ts(150),
            oos_end: ts(180),
        },
    ];

    let config = WalkForwardConfig::new(
        periods,
        vec!["BTC-USD".to_string()],
        CapitalFlowConfig::default(),
        InertiaConfig::default(),
        FusionConfig::default(),
    )?;

    // Synthetic cache: drifting buyer dominance over three hours
    let cache = InMemoryFactorCache::new();
    for i in 0..180 {
        let timestamp = ts(i);
        let sai = 0.8 * (i as f64 / 180.0);
        cache
            .insert(FactorCacheEntry {
                timestamp,
                symbol: "BTC-USD".to_string(),
                capital_flow: Some(CapitalFlowFactor {
                    timestamp,
                    symbol: "BTC-USD".to_string(),
                    window_trades: 50,
                    window_volume: Decimal::from(100u32),
                    buy_volume: Decimal::from(60u32),
                    sell_volume: Decimal::from(40u32),
                    net_signed_volume: Decimal::from(20u32),
                    sai: Some(sai),
                    moi: Some(0.05),
                }),
                inertia: Some(InertiaFactor {
                    symbol: "BTC-USD".to_string(),
                    timestamp,
                    inertia_sai: sai * 0.9,
                }),
            })
            .await;
    }

    let orchestrator = WalkForwardOrchestrator::new(config, Box::new(cache));
    let results = orchestrator.run_simulation().await?;

    for result in &results {
        println!(
            "{} [{} .. {}]: {} oos signals",
            result.symbol,
            result.period.oos_start,
            result.period.oos_end,
            result.signals.len()
        );
        if let Some(last) = result.signals.last() {
            println!("  last: {}", serde_json::to_string(last)?);
        }
    }

    Ok(())
}
