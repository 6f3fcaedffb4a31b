//! Notification capacity scheduler.
//!
//! Allocates the channel's alarm slots across every enabled alarm:
//!
//! - **Priority**: alarms are walked soonest-first; once the walk index
//!   reaches the slot budget every remaining alarm is skipped outright.
//! - **Fair share**: a recurring alarm gets an even split of the remaining
//!   slots over the remaining alarms, capped at one entry per weekday.
//! - **All-or-nothing**: a recurring alarm whose registration fails partway
//!   has its successful entries withdrawn before the failure is reported.
//!
//! Channel calls are bounded by a timeout. Callers serialize `schedule_all`
//! against `add`/`remove`; nothing here locks the channel.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Datelike, NaiveDateTime, Weekday};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::core::audit::{build_audit_event, record_to, AuditSink, SharedAuditSink};
use crate::core::capacity::{CapacityTracker, QueueStatus, QuotaLimits};
use crate::core::channel::{ChannelError, DeliveryChannel, ScheduledEntry};
use crate::core::{Alarm, AlarmStore, SchedulerError};
use crate::util::clock::WallClock;
use crate::util::serde::{all_entry_identifiers, week_from, AlarmId};

/// Most entries a single recurring alarm can hold: one per weekday.
pub const MAX_ENTRIES_PER_ALARM: usize = 7;

/// Per-alarm failure collected during a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmFailure {
    /// Alarm that could not be scheduled.
    pub alarm_id: AlarmId,
    /// Rendered error.
    pub message: String,
}

/// Recurring alarm that received fewer weekdays than it repeats on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurringCoverage {
    /// The alarm.
    pub alarm_id: AlarmId,
    /// Weekdays in its repeat set.
    pub requested: usize,
    /// Weekdays actually registered.
    pub scheduled: usize,
}

/// Outcome of one full scheduling pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulingReport {
    /// Enabled alarms considered.
    pub total_alarms: usize,
    /// Alarms with every selected entry registered.
    pub scheduled_alarms: usize,
    /// Alarms left out because the slot budget ran out.
    pub skipped_alarms: usize,
    /// Alarms that failed individually.
    pub errors: Vec<AlarmFailure>,
    /// Channel slots consumed by this pass.
    pub entries_registered: usize,
    /// Ids of the skipped alarms, in priority order.
    pub skipped_ids: Vec<AlarmId>,
    /// Recurring alarms scheduled with reduced weekday coverage.
    pub reduced_coverage: Vec<RecurringCoverage>,
}

impl SchedulingReport {
    /// `scheduled_alarms / total_alarms`; 1.0 when there was nothing to schedule.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn success_rate(&self) -> f64 {
        if self.total_alarms == 0 {
            return 1.0;
        }
        self.scheduled_alarms as f64 / self.total_alarms as f64
    }

    /// Whether some alarms will not fire and the user should be told.
    #[must_use]
    pub fn has_skips(&self) -> bool {
        self.skipped_alarms > 0
    }

    fn record_failure(&mut self, alarm_id: &str, err: &SchedulerError) {
        self.errors.push(AlarmFailure {
            alarm_id: alarm_id.to_string(),
            message: err.to_string(),
        });
    }
}

/// Entries a recurring alarm at priority `index` may hold.
///
/// `max(1, min(7, (capacity - index) / (total - index)))`: an even split of
/// what is left over the alarms still to place. This is a coarse heuristic;
/// neighbouring recurring alarms near the quota edge get truncated coverage
/// with no tie-break.
#[must_use]
pub fn per_alarm_budget(capacity: usize, index: usize, total: usize) -> usize {
    let remaining_slots = capacity.saturating_sub(index);
    let remaining_alarms = total.saturating_sub(index).max(1);
    (remaining_slots / remaining_alarms).clamp(1, MAX_ENTRIES_PER_ALARM)
}

/// Up to `budget` weekdays of `alarm`, walking forward from `today`.
#[must_use]
pub fn select_weekdays(alarm: &Alarm, today: Weekday, budget: usize) -> Vec<Weekday> {
    week_from(today)
        .filter(|day| alarm.repeat_days.contains(day))
        .take(budget)
        .collect()
}

/// Scheduler over an alarm store and a delivery channel.
pub struct NotificationScheduler<S: ?Sized, C: ?Sized> {
    store: Arc<S>,
    channel: Arc<C>,
    tracker: CapacityTracker<C>,
    clock: Arc<dyn WallClock>,
    channel_timeout: Duration,
    audit: Option<SharedAuditSink>,
}

impl<S, C> NotificationScheduler<S, C>
where
    S: AlarmStore + ?Sized,
    C: DeliveryChannel + ?Sized,
{
    /// Create a scheduler.
    pub fn new(
        store: Arc<S>,
        channel: Arc<C>,
        limits: QuotaLimits,
        clock: Arc<dyn WallClock>,
        channel_timeout: Duration,
    ) -> Self {
        Self {
            store,
            tracker: CapacityTracker::new(Arc::clone(&channel), limits),
            channel,
            clock,
            channel_timeout,
            audit: None,
        }
    }

    /// Attach an audit sink.
    #[must_use]
    pub fn with_audit(mut self, audit: Box<dyn AuditSink>) -> Self {
        self.audit = Some(Arc::new(parking_lot::Mutex::new(audit)));
        self
    }

    /// Share an already-wrapped audit sink.
    #[must_use]
    pub fn with_shared_audit(mut self, audit: SharedAuditSink) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Quota in force.
    pub fn limits(&self) -> &QuotaLimits {
        self.tracker.limits()
    }

    /// Full reconciliation pass.
    ///
    /// Reads the enabled alarms, cancels every pending alarm entry, then
    /// re-registers the alarms in priority order within the slot budget.
    ///
    /// # Errors
    ///
    /// Reading the alarm store, or listing or cancelling stale entries,
    /// aborts the pass. A store failure leaves the channel untouched.
    /// Per-alarm registration failures are collected in the report.
    pub async fn schedule_all(&self) -> Result<SchedulingReport, SchedulerError> {
        // Snapshot the store before touching the channel so a failed read
        // leaves the registered entries in place.
        let alarms = self.store.list_enabled().await?;
        let mut report = SchedulingReport::default();
        let mut queue: Vec<(NaiveDateTime, Alarm)> = Vec::with_capacity(alarms.len());
        for alarm in alarms.into_iter().filter(|a| a.is_enabled) {
            report.total_alarms += 1;
            if let Err(err) = alarm.validate() {
                warn!(alarm = %alarm.id, "{err}");
                report.record_failure(&alarm.id, &err);
                continue;
            }
            queue.push((self.store.next_occurrence(&alarm), alarm));
        }
        queue.sort_by(|(a_at, a), (b_at, b)| a_at.cmp(b_at).then_with(|| a.id.cmp(&b.id)));

        let pending = self.bounded("list", self.channel.pending()).await?;
        let stale: Vec<String> = pending
            .iter()
            .filter(|e| e.is_alarm())
            .map(|e| e.identifier.clone())
            .collect();
        let other = pending.len() - stale.len();
        if !stale.is_empty() {
            self.bounded("cancel", self.channel.cancel(&stale)).await?;
            debug!(count = stale.len(), "cancelled stale alarm entries");
        }

        let limits = *self.limits();
        let capacity = limits
            .max_alarm_slots()
            .min(limits.max_total.saturating_sub(other));
        if capacity < limits.max_alarm_slots() {
            warn!(
                other,
                capacity, "other producers exceed their reservation; alarm budget reduced"
            );
        }

        let total = queue.len();
        let today = self.clock.now().weekday();
        info!(alarms = total, capacity, "scheduling pass started");

        for (index, (occurrence, alarm)) in queue.iter().enumerate() {
            let left = capacity.saturating_sub(report.entries_registered);
            if index >= capacity || left == 0 {
                self.skip_rest(&mut report, &queue[index..]);
                break;
            }

            if alarm.is_recurring() {
                // Hold back one slot for each alarm still waiting behind this one.
                let behind = total - index - 1;
                let budget = per_alarm_budget(capacity, index, total)
                    .min(left.saturating_sub(behind).max(1));
                let days = select_weekdays(alarm, today, budget);
                match self.register_recurring(alarm, &days).await {
                    Ok(registered) => {
                        report.scheduled_alarms += 1;
                        report.entries_registered += registered;
                        if registered < alarm.repeat_days.len() {
                            debug!(
                                alarm = %alarm.id,
                                registered,
                                requested = alarm.repeat_days.len(),
                                "recurring alarm coverage reduced"
                            );
                            report.reduced_coverage.push(RecurringCoverage {
                                alarm_id: alarm.id.clone(),
                                requested: alarm.repeat_days.len(),
                                scheduled: registered,
                            });
                        }
                    }
                    Err(err) => {
                        warn!(alarm = %alarm.id, "{err}");
                        report.record_failure(&alarm.id, &err);
                    }
                }
            } else {
                match self.register_one_shot(alarm, *occurrence).await {
                    Ok(()) => {
                        report.scheduled_alarms += 1;
                        report.entries_registered += 1;
                    }
                    Err(err) => {
                        warn!(alarm = %alarm.id, "{err}");
                        report.record_failure(&alarm.id, &err);
                    }
                }
            }
        }

        info!(
            total = report.total_alarms,
            scheduled = report.scheduled_alarms,
            skipped = report.skipped_alarms,
            failed = report.errors.len(),
            entries = report.entries_registered,
            "scheduling pass finished"
        );
        record_to(
            self.audit.as_ref(),
            build_audit_event(
                "pass",
                "scheduler",
                "pass",
                Some(format!(
                    "scheduled={} skipped={} failed={} entries={}",
                    report.scheduled_alarms,
                    report.skipped_alarms,
                    report.errors.len(),
                    report.entries_registered
                )),
            ),
        );
        Ok(report)
    }

    /// Register a single alarm outside a full pass.
    ///
    /// Recurring alarms get every weekday of their repeat set. Entries the
    /// alarm already holds count as reclaimable headroom and are replaced.
    /// Returns the number of entries registered.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::QuotaExceeded`] without touching the channel when
    /// the alarm does not fit; channel and rollback errors otherwise.
    pub async fn add(&self, alarm: &Alarm) -> Result<usize, SchedulerError> {
        alarm.validate()?;
        if !alarm.is_enabled {
            self.remove(alarm).await?;
            return Ok(0);
        }

        let pending = self.bounded("list", self.channel.pending()).await?;
        let status = QueueStatus::from_entries(self.limits(), &pending);
        let derivable = all_entry_identifiers(&alarm.id);
        let own: Vec<String> = pending
            .iter()
            .filter(|e| e.is_alarm() && derivable.contains(&e.identifier))
            .map(|e| e.identifier.clone())
            .collect();

        let needed = if alarm.is_recurring() {
            alarm.repeat_days.len()
        } else {
            1
        };
        let available = status
            .available_alarm_slots
            .min(status.available_slots)
            + own.len();
        if needed > available {
            warn!(alarm = %alarm.id, needed, available, "alarm rejected: queue full");
            return Err(SchedulerError::QuotaExceeded { needed, available });
        }

        if !own.is_empty() {
            self.bounded("cancel", self.channel.cancel(&own)).await?;
        }

        if alarm.is_recurring() {
            let today = self.clock.now().weekday();
            let days = select_weekdays(alarm, today, MAX_ENTRIES_PER_ALARM);
            self.register_recurring(alarm, &days).await
        } else {
            let occurrence = self.store.next_occurrence(alarm);
            self.register_one_shot(alarm, occurrence).await.map(|()| 1)
        }
    }

    /// Cancel every entry derivable from the alarm's id.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::ChannelUnavailable`] if the cancel fails.
    pub async fn remove(&self, alarm: &Alarm) -> Result<(), SchedulerError> {
        let identifiers = all_entry_identifiers(&alarm.id);
        self.bounded("cancel", self.channel.cancel(&identifiers))
            .await?;
        debug!(alarm = %alarm.id, "alarm entries cancelled");
        Ok(())
    }

    /// Current channel occupancy.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::ChannelUnavailable`] on failure or timeout.
    pub async fn status(&self) -> Result<QueueStatus, SchedulerError> {
        tokio::time::timeout(self.channel_timeout, self.tracker.snapshot())
            .await
            .map_err(|_| self.timed_out("list"))?
    }

    async fn register_one_shot(
        &self,
        alarm: &Alarm,
        occurrence: NaiveDateTime,
    ) -> Result<(), SchedulerError> {
        let entry = ScheduledEntry::one_shot(alarm, occurrence);
        self.bounded("add", self.channel.add(entry)).await?;
        debug!(alarm = %alarm.id, at = %occurrence, "one-shot alarm registered");
        Ok(())
    }

    /// Register every entry in `days` or none of them.
    async fn register_recurring(
        &self,
        alarm: &Alarm,
        days: &[Weekday],
    ) -> Result<usize, SchedulerError> {
        let mut registered: Vec<String> = Vec::with_capacity(days.len());
        for &day in days {
            let entry = ScheduledEntry::weekly(alarm, day);
            let identifier = entry.identifier.clone();
            if let Err(err) = self.bounded("add", self.channel.add(entry)).await {
                let count = registered.len();
                let mut reason = err.to_string();
                if !registered.is_empty() {
                    if let Err(rollback) =
                        self.bounded("cancel", self.channel.cancel(&registered)).await
                    {
                        error!(alarm = %alarm.id, "rollback failed: {rollback}");
                        reason = format!("{reason}; rollback failed: {rollback}");
                    }
                }
                record_to(
                    self.audit.as_ref(),
                    build_audit_event(
                        alarm.id.as_str(),
                        "scheduler",
                        "rolled_back",
                        Some(reason.clone()),
                    ),
                );
                return Err(SchedulerError::PartialRegistrationRolledBack {
                    alarm_id: alarm.id.clone(),
                    registered: count,
                    reason,
                });
            }
            registered.push(identifier);
        }
        debug!(alarm = %alarm.id, entries = registered.len(), "recurring alarm registered");
        Ok(registered.len())
    }

    fn skip_rest(&self, report: &mut SchedulingReport, rest: &[(NaiveDateTime, Alarm)]) {
        warn!(
            skipped = rest.len(),
            "alarm slot budget exhausted; remaining alarms will not fire"
        );
        for (_, alarm) in rest {
            report.skipped_alarms += 1;
            report.skipped_ids.push(alarm.id.clone());
            record_to(
                self.audit.as_ref(),
                build_audit_event(alarm.id.as_str(), "scheduler", "skipped", None),
            );
        }
    }

    async fn bounded<T>(
        &self,
        op: &'static str,
        call: impl Future<Output = Result<T, ChannelError>>,
    ) -> Result<T, SchedulerError> {
        match tokio::time::timeout(self.channel_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(SchedulerError::ChannelUnavailable(format!("{op}: {err}"))),
            Err(_) => Err(self.timed_out(op)),
        }
    }

    fn timed_out(&self, op: &str) -> SchedulerError {
        SchedulerError::ChannelUnavailable(format!(
            "{op}: timed out after {}ms",
            self.channel_timeout.as_millis()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_splits_remaining_capacity() {
        assert_eq!(per_alarm_budget(60, 0, 11), 5);
        assert_eq!(per_alarm_budget(60, 5, 56), 1);
        assert_eq!(per_alarm_budget(60, 0, 1), MAX_ENTRIES_PER_ALARM);
        // Floor of one even when the split rounds to zero.
        assert_eq!(per_alarm_budget(60, 59, 200), 1);
    }

    #[test]
    fn weekdays_walk_forward_from_today() {
        let alarm = Alarm::weekly("w", 7, 0, [Weekday::Mon, Weekday::Wed, Weekday::Sat]);
        assert_eq!(
            select_weekdays(&alarm, Weekday::Thu, 2),
            vec![Weekday::Sat, Weekday::Mon]
        );
        assert_eq!(select_weekdays(&alarm, Weekday::Mon, 7).len(), 3);
    }

    #[test]
    fn empty_report_rate_is_one() {
        let report = SchedulingReport::default();
        assert!((report.success_rate() - 1.0).abs() < f64::EPSILON);
        assert!(!report.has_skips());
    }
}
