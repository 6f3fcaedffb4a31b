//! Tests for configuration validation

use std::collections::HashMap;
use std::time::Duration;

use alarm_lot::config::{HealthConfig, KeepAliveConfig, QuotaConfig, ServiceConfig};

#[test]
fn test_defaults_match_platform_quota() {
    let cfg = ServiceConfig::default();
    assert!(cfg.validate().is_ok());
    assert_eq!(cfg.quota.limits().max_alarm_slots(), 60);
    assert_eq!(cfg.health.options().check_interval, Duration::from_secs(300));
    assert_eq!(cfg.health.options().verification_delay, Duration::from_secs(5));
    assert_eq!(cfg.health.options().failure_threshold, 3);
    assert_eq!(cfg.health.options().recovery_timeout, Duration::from_secs(60));
    assert_eq!(cfg.keep_alive.options().restart_delay, Duration::from_millis(500));
    assert_eq!(cfg.channel_timeout(), Duration::from_secs(10));
}

#[test]
fn test_quota_config_invalid() {
    let zero = QuotaConfig {
        max_total: 0,
        reserved_non_alarm: 0,
    };
    assert!(zero.validate().is_err());

    let all_reserved = QuotaConfig {
        max_total: 4,
        reserved_non_alarm: 4,
    };
    assert!(all_reserved.validate().is_err());
}

#[test]
fn test_health_config_invalid() {
    let no_threshold = HealthConfig {
        failure_threshold: 0,
        ..HealthConfig::default()
    };
    assert!(no_threshold.validate().is_err());

    let slow_verify = HealthConfig {
        check_interval_secs: 5,
        verification_delay_secs: 5,
        ..HealthConfig::default()
    };
    assert!(slow_verify.validate().is_err());
}

#[test]
fn test_keep_alive_volume_range() {
    let loud = KeepAliveConfig {
        volume: 1.5,
        ..KeepAliveConfig::default()
    };
    assert!(loud.validate().is_err());

    let cfg = ServiceConfig {
        keep_alive: loud,
        ..ServiceConfig::default()
    };
    let err = cfg.validate().unwrap_err();
    assert!(err.starts_with("keep_alive invalid"));
}

#[test]
fn test_service_config_from_json() {
    let json = r#"{
        "quota": { "max_total": 32, "reserved_non_alarm": 2 },
        "health": { "check_interval_secs": 120 },
        "channel_timeout_ms": 2500
    }"#;

    let cfg = ServiceConfig::from_json_str(json).unwrap();
    assert_eq!(cfg.quota.limits().max_alarm_slots(), 30);
    assert_eq!(cfg.health.check_interval_secs, 120);
    assert_eq!(cfg.health.failure_threshold, 3);
    assert_eq!(cfg.channel_timeout(), Duration::from_millis(2500));
}

#[test]
fn test_service_config_from_json_rejects_invalid() {
    assert!(ServiceConfig::from_json_str("{ not json").is_err());
    assert!(ServiceConfig::from_json_str(r#"{ "channel_timeout_ms": 0 }"#).is_err());
}

#[test]
fn test_service_config_from_lookup() {
    let vars: HashMap<&str, &str> = [
        ("ALARM_LOT_MAX_TOTAL", "128"),
        ("ALARM_LOT_RESERVED_NON_ALARM", "8"),
        ("ALARM_LOT_FAILURE_THRESHOLD", " 5 "),
        ("ALARM_LOT_VOLUME", "0.05"),
    ]
    .into_iter()
    .collect();

    let cfg = ServiceConfig::from_lookup(|key| vars.get(key).map(ToString::to_string)).unwrap();
    assert_eq!(cfg.quota.max_total, 128);
    assert_eq!(cfg.quota.limits().max_alarm_slots(), 120);
    assert_eq!(cfg.health.failure_threshold, 5);
    assert!((cfg.keep_alive.volume - 0.05).abs() < f32::EPSILON);
    assert_eq!(cfg.health.check_interval_secs, 300);
}

#[test]
fn test_service_config_from_lookup_rejects_garbage() {
    let err = ServiceConfig::from_lookup(|key| {
        (key == "ALARM_LOT_CHECK_INTERVAL_SECS").then(|| "soon".to_string())
    })
    .unwrap_err();
    assert!(err.contains("ALARM_LOT_CHECK_INTERVAL_SECS"));
}
