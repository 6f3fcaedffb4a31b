//! Tests for capacity accounting

use std::sync::Arc;

use alarm_lot::core::{Alarm, CapacityTracker, QueueStatus, QuotaLimits, ScheduledEntry};
use alarm_lot::core::DeliveryChannel;
use alarm_lot::infra::InMemoryChannel;
use chrono::{NaiveDate, Weekday};

fn one_shot(id: &str) -> ScheduledEntry {
    let at = NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap();
    ScheduledEntry::one_shot(&Alarm::one_shot(id, 9, 0), at)
}

#[test]
fn test_default_limits() {
    let limits = QuotaLimits::default();
    assert_eq!(limits.max_total, 64);
    assert_eq!(limits.reserved_non_alarm, 4);
    assert_eq!(limits.max_alarm_slots(), 60);
}

#[test]
fn test_status_partitions_by_category() {
    let limits = QuotaLimits::default();
    let weekly = Alarm::weekly("w", 7, 0, [Weekday::Mon, Weekday::Tue]);
    let mut entries = vec![
        one_shot("a"),
        ScheduledEntry::weekly(&weekly, Weekday::Mon),
        ScheduledEntry::weekly(&weekly, Weekday::Tue),
    ];
    let mut foreign = one_shot("promo");
    foreign.category = "MARKETING".into();
    entries.push(foreign);

    let status = QueueStatus::from_entries(&limits, &entries);
    assert_eq!(status.total_notifications, 4);
    assert_eq!(status.alarm_notifications, 3);
    assert_eq!(status.other_notifications, 1);
    assert_eq!(status.available_slots, 60);
    assert_eq!(status.available_alarm_slots, 57);
}

#[test]
fn test_status_saturates_when_over_quota() {
    let limits = QuotaLimits {
        max_total: 2,
        reserved_non_alarm: 1,
    };
    let entries = vec![one_shot("a"), one_shot("b"), one_shot("c")];
    let status = QueueStatus::from_entries(&limits, &entries);
    assert_eq!(status.available_slots, 0);
    assert_eq!(status.available_alarm_slots, 0);
}

#[tokio::test]
async fn test_tracker_reads_channel_every_time() {
    let channel = Arc::new(InMemoryChannel::new(64));
    let tracker = CapacityTracker::new(Arc::clone(&channel), QuotaLimits::default());

    assert_eq!(tracker.snapshot().await.unwrap().total_notifications, 0);
    channel.add(one_shot("a")).await.unwrap();
    assert_eq!(tracker.snapshot().await.unwrap().alarm_notifications, 1);
}

#[tokio::test]
async fn test_tracker_propagates_channel_failure() {
    let channel = Arc::new(InMemoryChannel::new(64));
    channel.set_list_failure(true);
    let tracker = CapacityTracker::new(channel, QuotaLimits::default());

    assert!(tracker.snapshot().await.is_err());
}
