// Common test utilities and fixture builders

use chrono::{DateTime, Duration, TimeZone, Utc};
use xemm_sim::{OrderBookSnapshot, PriceLevel, SimulationConfig};

/// Initialize test logging once; later calls are no-ops
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2021, 7, 5, 12, 0, 0).unwrap()
}

/// Build a snapshot at `base_time() + offset_secs`
pub fn snapshot_at(
    offset_secs: i64,
    bids: &[(f64, f64)],
    asks: &[(f64, f64)],
) -> OrderBookSnapshot {
    OrderBookSnapshot {
        timestamp: base_time() + Duration::seconds(offset_secs),
        bids: bids
            .iter()
            .map(|&(price, size)| PriceLevel { price, size })
            .collect(),
        asks: asks
            .iter()
            .map(|&(price, size)| PriceLevel { price, size })
            .collect(),
    }
}

/// A series of `count` identical snapshots, one second apart
pub fn constant_series(
    count: usize,
    bids: &[(f64, f64)],
    asks: &[(f64, f64)],
) -> Vec<OrderBookSnapshot> {
    (0..count)
        .map(|i| snapshot_at(i as i64, bids, asks))
        .collect()
}

/// Create a test configuration with sensible defaults
pub fn test_config() -> SimulationConfig {
    let mut config = SimulationConfig::default();
    config.replication.band_bp = 100;
    config.replication.replication_fraction = 0.5;
    config.replication.latency_window = 10.0;
    config.replication.latency_budget = 1e9;
    config.replication.random_seed = 7;
    config.fees.maker_origin = 0.001;
    config.fees.taker_origin = 0.002;
    config.fees.maker_destination = 0.001;
    config.fees.taker_destination = 0.002;
    config.balances.fiat_origin = 10_000.0;
    config.balances.token_origin = 10.0;
    config.balances.fiat_destination = 10_000.0;
    config.balances.token_destination = 10.0;
    config.max_steps = 3;
    config
}
