//! End-to-end tests through the `AlarmService` facade.

use std::sync::Arc;

use alarm_lot::builders::build_service;
use alarm_lot::config::ServiceConfig;
use alarm_lot::core::{
    Alarm, AppPhase, AudioOutput, CheckOutcome, DeliveryChannel, KeepAliveState,
};
use alarm_lot::infra::{InMemoryAlarmStore, InMemoryChannel, SimulatedOutput};
use alarm_lot::runtime::{AlarmService, TokioSpawner};
use alarm_lot::util::{FixedClock, WallClock};
use chrono::NaiveDate;

type Service = AlarmService<InMemoryAlarmStore, InMemoryChannel, SimulatedOutput, TokioSpawner>;

struct World {
    store: Arc<InMemoryAlarmStore>,
    channel: InMemoryChannel,
    output: SimulatedOutput,
    service: Service,
}

fn world(alarms: Vec<Alarm>) -> World {
    alarm_lot::util::init_tracing();
    let clock: Arc<dyn WallClock> = Arc::new(FixedClock::new(
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap(),
    ));
    let store = Arc::new(InMemoryAlarmStore::with_alarms(Arc::clone(&clock), alarms));
    let channel = InMemoryChannel::new(64);
    let output = SimulatedOutput::new();
    let service = build_service(
        &ServiceConfig::default(),
        Arc::clone(&store),
        Arc::new(channel.clone()),
        Arc::new(output.clone()),
        clock,
        TokioSpawner::current().unwrap(),
        None,
    )
    .unwrap();
    World {
        store,
        channel,
        output,
        service,
    }
}

#[tokio::test(start_paused = true)]
async fn test_background_flow_schedules_and_keeps_alive() {
    let w = world(vec![Alarm::one_shot("a", 9, 0), Alarm::daily("d", 6, 0)]);

    let report = w.service.schedule_all().await.unwrap();
    assert_eq!(report.scheduled_alarms, 2);

    w.service.on_enter_background().await;
    assert!(w.output.is_playing());
    assert!(w.service.monitor().is_monitoring());

    let snapshot = w.service.snapshot().await.unwrap();
    assert_eq!(snapshot.queue.alarm_notifications, 8);
    assert_eq!(snapshot.keep_alive, KeepAliveState::Active);
    assert_eq!(snapshot.phase, AppPhase::Background);
    assert!(snapshot.monitoring);

    let json = serde_json::to_value(&snapshot).unwrap();
    assert_eq!(json["keep_alive"], "active");
    assert_eq!(json["health"]["breaker_state"], "closed");

    assert_eq!(w.service.check_now().await, CheckOutcome::Healthy);
    assert_eq!(w.service.health_metrics().total_checks, 1);

    w.service.stop_monitoring();
    assert!(!w.service.monitor().is_monitoring());
}

#[tokio::test(start_paused = true)]
async fn test_removing_last_alarm_stops_keep_alive() {
    let w = world(vec![Alarm::one_shot("a", 9, 0)]);
    w.service.schedule_all().await.unwrap();
    w.service.on_enter_background().await;
    assert_eq!(w.service.keep_alive().state(), KeepAliveState::Active);

    w.store.delete("a");
    w.service.remove(&Alarm::one_shot("a", 9, 0)).await.unwrap();
    assert!(w.channel.is_empty());
    assert_eq!(w.service.keep_alive().state(), KeepAliveState::Inactive);
    w.service.stop_monitoring();
}

#[tokio::test(start_paused = true)]
async fn test_adding_alarm_in_background_starts_keep_alive() {
    let w = world(Vec::new());
    w.service.on_enter_background().await;
    assert_eq!(w.service.keep_alive().state(), KeepAliveState::Inactive);

    let alarm = Alarm::one_shot("late", 22, 0);
    w.store.upsert(alarm.clone());
    assert_eq!(w.service.add(&alarm).await.unwrap(), 1);
    assert_eq!(w.service.keep_alive().state(), KeepAliveState::Active);

    w.store.set_enabled("late", false);
    assert_eq!(
        w.service.add(&alarm.clone().enabled(false)).await.unwrap(),
        0
    );
    assert_eq!(w.service.keep_alive().state(), KeepAliveState::Inactive);
    w.service.stop_monitoring();
}

#[tokio::test]
async fn test_foreground_keeps_monitor_running() {
    let w = world(vec![Alarm::one_shot("a", 9, 0)]);
    w.service.on_enter_background().await;
    w.service.on_enter_foreground().await;

    assert!(w.service.monitor().is_monitoring());
    assert_eq!(w.service.check_now().await, CheckOutcome::Skipped);
    w.service.stop_monitoring();
}

#[tokio::test]
async fn test_health_reports_unreachable_channel() {
    let w = world(Vec::new());
    assert_eq!(
        w.service.health().await,
        alarm_lot::runtime::Health {
            ok: true,
            degraded: false
        }
    );

    w.channel.set_list_failure(true);
    assert!(!w.service.health().await.ok);
    assert!(w.service.snapshot().await.is_err());
    assert!(w.channel.pending().await.is_err());
}

#[tokio::test]
async fn test_alarm_signals_pass_through() {
    let w = world(vec![Alarm::one_shot("a", 9, 0)]);
    w.service.on_enter_background().await;

    w.service.on_alarms_disabled();
    assert_eq!(w.service.keep_alive().state(), KeepAliveState::Inactive);
    w.service.on_alarms_enabled();
    assert_eq!(w.service.keep_alive().state(), KeepAliveState::Active);
    w.service.stop_monitoring();
}
