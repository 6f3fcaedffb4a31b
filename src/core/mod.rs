//! Core scheduling abstractions, capacity accounting, and keep-alive supervision.

pub mod alarm;
pub mod audit;
pub mod breaker;
pub mod capacity;
pub mod channel;
pub mod error;
pub mod health;
pub mod keep_alive;
pub mod scheduler;
pub mod spawn;
pub mod trigger;

pub use alarm::{Alarm, AlarmStore};
pub use audit::{build_audit_event, AuditEvent, AuditSink, InMemoryAuditSink, SharedAuditSink};
pub use breaker::{BreakerState, CircuitBreaker};
pub use capacity::{CapacityTracker, QueueStatus, QuotaLimits};
pub use channel::{ChannelError, DeliveryChannel, EntryContent, ScheduledEntry};
pub use error::{AppResult, KeepAliveError, SchedulerError};
pub use health::{CheckOutcome, HealthMetrics, HealthMonitor, HealthOptions};
pub use keep_alive::{
    AppPhase, AudioOutput, BackgroundKeepAlive, KeepAlive, KeepAliveOptions, KeepAliveState,
};
pub use scheduler::{
    per_alarm_budget, select_weekdays, AlarmFailure, NotificationScheduler, RecurringCoverage,
    SchedulingReport, MAX_ENTRIES_PER_ALARM,
};
pub use spawn::Spawn;
pub use trigger::{build_one_shot, build_weekly, DateMatch, Trigger};
