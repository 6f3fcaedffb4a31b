//! Delivery-channel port and the entries this crate registers on it.
//!
//! The channel is shared with unrelated notification producers. Entries are
//! tagged with a category; the scheduler only ever touches entries tagged
//! [`ALARM_CATEGORY`].

use async_trait::async_trait;
use chrono::Weekday;
use serde::{Deserialize, Serialize};

use crate::core::trigger::{build_one_shot, build_weekly, Trigger};
use crate::core::Alarm;
use crate::util::serde::{entry_identifier, weekday_number, AlarmId, ALARM_CATEGORY};

/// Failure reported by a delivery channel.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
    /// The channel rejected the entry because its global quota is reached.
    #[error("channel quota reached ({0} pending)")]
    Full(usize),
    /// The channel rejected or failed the request.
    #[error("channel request failed: {0}")]
    Rejected(String),
}

/// User-facing payload of an entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryContent {
    /// Notification title.
    pub title: String,
    /// Notification body.
    pub body: String,
    /// Alarm that produced the entry.
    pub alarm_id: AlarmId,
    /// Weekday number (Sunday = 1) for recurring entries.
    pub weekday: Option<u32>,
}

/// A pending entry held by the delivery channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledEntry {
    /// Channel key, reconstructible from alarm id and weekday.
    pub identifier: String,
    /// Producer tag.
    pub category: String,
    /// When it fires.
    pub trigger: Trigger,
    /// What it shows.
    pub content: EntryContent,
}

impl ScheduledEntry {
    /// Whether the entry belongs to the alarm scheduler.
    #[must_use]
    pub fn is_alarm(&self) -> bool {
        self.category == ALARM_CATEGORY
    }

    /// Single non-repeating entry for a one-shot alarm firing at `occurrence`.
    #[must_use]
    pub fn one_shot(alarm: &Alarm, occurrence: chrono::NaiveDateTime) -> Self {
        Self {
            identifier: entry_identifier(&alarm.id, None),
            category: ALARM_CATEGORY.to_string(),
            trigger: build_one_shot(occurrence),
            content: content_for(alarm, None),
        }
    }

    /// Repeating entry for one weekday of a recurring alarm.
    #[must_use]
    pub fn weekly(alarm: &Alarm, weekday: Weekday) -> Self {
        use chrono::Timelike;

        Self {
            identifier: entry_identifier(&alarm.id, Some(weekday)),
            category: ALARM_CATEGORY.to_string(),
            trigger: build_weekly(alarm.time.hour(), alarm.time.minute(), weekday),
            content: content_for(alarm, Some(weekday)),
        }
    }
}

fn content_for(alarm: &Alarm, weekday: Option<Weekday>) -> EntryContent {
    let title = if alarm.label.trim().is_empty() {
        "Alarm".to_string()
    } else {
        alarm.label.clone()
    };
    EntryContent {
        title,
        body: format!("It's {}", alarm.time.format("%H:%M")),
        alarm_id: alarm.id.clone(),
        weekday: weekday.map(weekday_number),
    }
}

/// Quota-limited queue of pending entries.
///
/// Every call may take arbitrarily long; the scheduler bounds each one with
/// its own timeout.
#[async_trait]
pub trait DeliveryChannel: Send + Sync {
    /// All pending entries, from every producer.
    async fn pending(&self) -> Result<Vec<ScheduledEntry>, ChannelError>;

    /// Register an entry. An entry with the same identifier is replaced.
    async fn add(&self, entry: ScheduledEntry) -> Result<(), ChannelError>;

    /// Remove entries by identifier. Unknown identifiers are ignored.
    async fn cancel(&self, identifiers: &[String]) -> Result<(), ChannelError>;
}
