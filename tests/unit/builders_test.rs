//! Tests for builder modules

use std::sync::Arc;

use alarm_lot::builders::build_service;
use alarm_lot::config::{QuotaConfig, ServiceConfig};
use alarm_lot::core::{Alarm, AuditSink, InMemoryAuditSink, SchedulerError, SharedAuditSink};
use alarm_lot::infra::{InMemoryAlarmStore, InMemoryChannel, SimulatedOutput};
use alarm_lot::runtime::TokioSpawner;
use alarm_lot::util::{SystemClock, WallClock};
use parking_lot::Mutex;

fn parts() -> (Arc<InMemoryAlarmStore>, Arc<InMemoryChannel>, Arc<dyn WallClock>) {
    let clock: Arc<dyn WallClock> = Arc::new(SystemClock);
    let store = Arc::new(InMemoryAlarmStore::new(Arc::clone(&clock)));
    (store, Arc::new(InMemoryChannel::new(64)), clock)
}

#[tokio::test]
async fn test_build_service_applies_quota() {
    let (store, channel, clock) = parts();
    let cfg = ServiceConfig {
        quota: QuotaConfig {
            max_total: 64,
            reserved_non_alarm: 14,
        },
        ..ServiceConfig::default()
    };

    let service = build_service(
        &cfg,
        store,
        channel,
        Arc::new(SimulatedOutput::new()),
        clock,
        TokioSpawner::current().unwrap(),
        None,
    )
    .unwrap();

    assert_eq!(service.scheduler().limits().max_alarm_slots(), 50);
    assert_eq!(service.status().await.unwrap().available_alarm_slots, 50);
    assert!(!service.monitor().is_monitoring());
}

#[tokio::test]
async fn test_build_service_rejects_invalid_config() {
    let (store, channel, clock) = parts();
    let cfg = ServiceConfig {
        channel_timeout_ms: 0,
        ..ServiceConfig::default()
    };

    let result = build_service(
        &cfg,
        store,
        channel,
        Arc::new(SimulatedOutput::new()),
        clock,
        TokioSpawner::current().unwrap(),
        None,
    );
    assert!(matches!(result, Err(SchedulerError::InvalidConfig(_))));
}

#[tokio::test]
async fn test_build_service_shares_audit_sink() {
    let (store, channel, clock) = parts();
    store.upsert(Alarm::one_shot("a", 7, 0));
    let sink = InMemoryAuditSink::new(32);
    let boxed: Box<dyn AuditSink> = Box::new(sink.clone());
    let shared: SharedAuditSink = Arc::new(Mutex::new(boxed));

    let service = build_service(
        &ServiceConfig::default(),
        store,
        channel,
        Arc::new(SimulatedOutput::new()),
        clock,
        TokioSpawner::current().unwrap(),
        Some(shared),
    )
    .unwrap();

    service.schedule_all().await.unwrap();
    assert_eq!(sink.with_action("pass").len(), 1);
}
