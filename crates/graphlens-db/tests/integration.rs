//! Offline unit tests for graphlens-db pool configuration and row types.
//! These tests do not require a live database connection.

use chrono::Utc;
use graphlens_core::{AppConfig, Environment, HistoricalDataPoint};
use graphlens_db::{storable_value, HistoryRow, PoolConfig};
use rust_decimal::Decimal;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let app_config = AppConfig {
        database_url: "postgres://example".to_string(),
        gemini_api_key: "key".to_string(),
        env: Environment::Test,
        bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 8000),
        log_level: "info".to_string(),
        cors_origin: "http://localhost:3000".to_string(),
        db_max_connections: 42,
        db_min_connections: 7,
        db_acquire_timeout_secs: 9,
        gemini_base_url: "http://localhost:9999".to_string(),
        vision_model: "vision".to_string(),
        text_model: "text".to_string(),
        upstream_timeout_secs: 30,
        max_image_bytes: 1024,
        history_limit: 10,
    };

    let pool_config = PoolConfig::from_app_config(&app_config);
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

#[test]
fn history_row_converts_to_domain_point() {
    let now = Utc::now();
    let row = HistoryRow {
        id: 3,
        metric_name: "sales".to_string(),
        category: "Jan".to_string(),
        value: Decimal::new(1_000_005, 1), // 100000.5
        extracted_at: now,
        source_hash: "abc".to_string(),
    };

    let point = HistoricalDataPoint::try_from(row).expect("convertible row");
    assert_eq!(point.id, 3);
    assert_eq!(point.metric_name, "sales");
    assert_eq!(point.category, "Jan");
    assert!((point.value - 100_000.5).abs() < 1e-9);
    assert_eq!(point.extracted_at, now);
    assert_eq!(point.source_hash, "abc");
}

#[test]
fn storable_value_rejects_values_numeric_cannot_round_trip() {
    assert_eq!(storable_value(120.0), Some(Decimal::new(120, 0)));
    assert_eq!(storable_value(0.0), Some(Decimal::ZERO));
    assert_eq!(storable_value(-2.5), Some(Decimal::new(-25, 1)));

    assert_eq!(storable_value(1e30), None);
    assert_eq!(storable_value(-1e30), None);
    assert_eq!(storable_value(1e-30), None);
    assert_eq!(storable_value(f64::NAN), None);
    assert_eq!(storable_value(f64::INFINITY), None);
}
