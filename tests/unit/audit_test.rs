//! Tests for audit sink

use alarm_lot::core::{build_audit_event, AuditSink, InMemoryAuditSink};

#[test]
fn test_in_memory_audit_sink() {
    let mut sink = InMemoryAuditSink::new(10);

    let event = build_audit_event("alarm-1", "scheduler", "skipped", Some("budget".to_string()));
    sink.record(event);
    assert_eq!(sink.events().len(), 1);

    let events = sink.events();
    assert_eq!(events[0].subject, "alarm-1");
    assert_eq!(events[0].component, "scheduler");
    assert_eq!(events[0].action, "skipped");
    assert_eq!(events[0].detail.as_deref(), Some("budget"));
    assert!(!events[0].event_id.is_empty());
}

#[test]
fn test_audit_sink_overflow() {
    let mut sink = InMemoryAuditSink::new(2);

    sink.record(build_audit_event("a", "scheduler", "skipped", None));
    sink.record(build_audit_event("b", "scheduler", "skipped", None));
    sink.record(build_audit_event("c", "scheduler", "skipped", None));

    let events = sink.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].subject, "b"); // First one popped
    assert_eq!(events[1].subject, "c");
}

#[test]
fn test_clones_share_buffer_and_ids_are_unique() {
    let reader = InMemoryAuditSink::new(8);
    let mut writer = reader.clone();

    writer.record(build_audit_event("pass", "scheduler", "pass", None));
    writer.record(build_audit_event("keep_alive", "health", "recovery", None));

    let events = reader.events();
    assert_eq!(events.len(), 2);
    assert_ne!(events[0].event_id, events[1].event_id);
    assert_eq!(reader.with_action("recovery").len(), 1);
}
