//! Capacity accounting against the delivery channel's quota.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::channel::{DeliveryChannel, ScheduledEntry};
use crate::core::SchedulerError;

/// Quota values the channel enforces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaLimits {
    /// Hard cap on pending entries across every producer.
    pub max_total: usize,
    /// Slots kept free for producers other than the alarm scheduler.
    pub reserved_non_alarm: usize,
}

impl QuotaLimits {
    /// Slots the alarm scheduler may occupy.
    #[must_use]
    pub const fn max_alarm_slots(&self) -> usize {
        self.max_total.saturating_sub(self.reserved_non_alarm)
    }
}

impl Default for QuotaLimits {
    fn default() -> Self {
        Self {
            max_total: 64,
            reserved_non_alarm: 4,
        }
    }
}

/// Point-in-time view of channel occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStatus {
    /// Pending entries from every producer.
    pub total_notifications: usize,
    /// Pending alarm entries.
    pub alarm_notifications: usize,
    /// Pending entries from other producers.
    pub other_notifications: usize,
    /// `max_total - total_notifications`.
    pub available_slots: usize,
    /// `max_alarm_slots - alarm_notifications`.
    pub available_alarm_slots: usize,
}

impl QueueStatus {
    /// Compute occupancy from a listing of pending entries.
    #[must_use]
    pub fn from_entries(limits: &QuotaLimits, entries: &[ScheduledEntry]) -> Self {
        let total = entries.len();
        let alarms = entries.iter().filter(|e| e.is_alarm()).count();
        Self {
            total_notifications: total,
            alarm_notifications: alarms,
            other_notifications: total - alarms,
            available_slots: limits.max_total.saturating_sub(total),
            available_alarm_slots: limits.max_alarm_slots().saturating_sub(alarms),
        }
    }
}

/// Reads channel occupancy on demand. Nothing is cached: a stale count could
/// let the scheduler overrun the quota.
pub struct CapacityTracker<C: ?Sized> {
    channel: Arc<C>,
    limits: QuotaLimits,
}

impl<C: DeliveryChannel + ?Sized> CapacityTracker<C> {
    /// Create a tracker over `channel`.
    pub fn new(channel: Arc<C>, limits: QuotaLimits) -> Self {
        Self { channel, limits }
    }

    /// Quota in force.
    pub fn limits(&self) -> &QuotaLimits {
        &self.limits
    }

    /// Current occupancy.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::ChannelUnavailable`] if the listing fails.
    pub async fn snapshot(&self) -> Result<QueueStatus, SchedulerError> {
        let entries = self
            .channel
            .pending()
            .await
            .map_err(|e| SchedulerError::ChannelUnavailable(e.to_string()))?;
        let status = QueueStatus::from_entries(&self.limits, &entries);
        tracing::debug!(
            total = status.total_notifications,
            alarms = status.alarm_notifications,
            free_alarm_slots = status.available_alarm_slots,
            "capacity snapshot"
        );
        Ok(status)
    }
}
