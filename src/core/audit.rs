//! Audit sink implementations.
//!
//! Records the decisions the scheduler and health monitor take on their own:
//! quota skips, rollbacks, pass summaries, and recovery attempts.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::util::clock::now_ms;

/// Audit event structure.
#[derive(Debug, Clone)]
pub struct AuditEvent {
    /// Event identifier.
    pub event_id: String,
    /// What the event is about (alarm id, or `pass` / `keep_alive`).
    pub subject: String,
    /// Emitting component (`scheduler`, `health`).
    pub component: String,
    /// Action taken (scheduled, skipped, rolled_back, pass, recovery, suppressed).
    pub action: String,
    /// Timestamp milliseconds.
    pub created_at_ms: u128,
    /// Additional context.
    pub detail: Option<String>,
}

/// Audit sink abstraction.
pub trait AuditSink: Send {
    /// Record an audit event.
    fn record(&mut self, event: AuditEvent);
}

/// Shared handle to an audit sink as held by components.
pub type SharedAuditSink = Arc<Mutex<Box<dyn AuditSink>>>;

/// In-memory audit sink for testing and dev.
///
/// Clones share the same buffer, so a test can keep one handle and hand
/// another to the component under test.
#[derive(Clone)]
pub struct InMemoryAuditSink {
    events: Arc<Mutex<VecDeque<AuditEvent>>>,
    max_events: usize,
}

impl InMemoryAuditSink {
    /// Create a new in-memory sink with a bounded buffer.
    #[must_use]
    pub fn new(max_events: usize) -> Self {
        Self {
            events: Arc::new(Mutex::new(VecDeque::with_capacity(max_events))),
            max_events,
        }
    }

    /// Retrieve a snapshot of stored events.
    #[must_use]
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().iter().cloned().collect()
    }

    /// Events carrying `action`.
    #[must_use]
    pub fn with_action(&self, action: &str) -> Vec<AuditEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.action == action)
            .cloned()
            .collect()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn record(&mut self, event: AuditEvent) {
        let mut events = self.events.lock();
        if events.len() >= self.max_events {
            events.pop_front();
        }
        events.push_back(event);
    }
}

/// Helper to build an audit event with a fresh identifier.
pub fn build_audit_event(
    subject: impl Into<String>,
    component: impl Into<String>,
    action: impl Into<String>,
    detail: Option<String>,
) -> AuditEvent {
    AuditEvent {
        event_id: uuid::Uuid::new_v4().to_string(),
        subject: subject.into(),
        component: component.into(),
        action: action.into(),
        created_at_ms: now_ms(),
        detail,
    }
}

/// Record into an optional shared sink.
pub(crate) fn record_to(sink: Option<&SharedAuditSink>, event: AuditEvent) {
    if let Some(sink) = sink {
        sink.lock().record(event);
    }
}
