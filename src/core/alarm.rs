//! Alarm records and the alarm-store port.
//!
//! Alarms are owned by an external store; this crate only reads a snapshot
//! per scheduling pass.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{Datelike, NaiveDateTime, NaiveTime, TimeDelta, Timelike, Weekday};
use serde::{Deserialize, Serialize};

use crate::core::SchedulerError;
use crate::util::serde::{week_from, AlarmId};

/// A user alarm as seen by the scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alarm {
    /// Stable unique key.
    pub id: AlarmId,
    /// Wall-clock firing time. Only hour and minute are used.
    pub time: NaiveTime,
    /// Disabled alarms are never scheduled.
    pub is_enabled: bool,
    /// Days the alarm repeats on. Empty means one-shot.
    pub repeat_days: HashSet<Weekday>,
    /// Display text.
    pub label: String,
}

impl Alarm {
    /// Enabled one-shot alarm at `hour:minute`.
    ///
    /// `hour` must be below 24 and `minute` below 60. Debug builds assert
    /// this; release builds fall back to midnight.
    #[must_use]
    pub fn one_shot(id: impl Into<AlarmId>, hour: u32, minute: u32) -> Self {
        debug_assert!(
            hour < 24 && minute < 60,
            "alarm time {hour}:{minute:02} out of range"
        );
        Self {
            id: id.into(),
            time: NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or_default(),
            is_enabled: true,
            repeat_days: HashSet::new(),
            label: String::new(),
        }
    }

    /// Enabled alarm repeating on `days` at `hour:minute`.
    #[must_use]
    pub fn weekly(
        id: impl Into<AlarmId>,
        hour: u32,
        minute: u32,
        days: impl IntoIterator<Item = Weekday>,
    ) -> Self {
        Self {
            repeat_days: days.into_iter().collect(),
            ..Self::one_shot(id, hour, minute)
        }
    }

    /// Enabled alarm repeating every day at `hour:minute`.
    #[must_use]
    pub fn daily(id: impl Into<AlarmId>, hour: u32, minute: u32) -> Self {
        Self::weekly(id, hour, minute, week_from(Weekday::Mon))
    }

    /// Replace the label.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Set the enabled flag.
    #[must_use]
    pub fn enabled(mut self, is_enabled: bool) -> Self {
        self.is_enabled = is_enabled;
        self
    }

    /// True when the alarm repeats on at least one weekday.
    #[must_use]
    pub fn is_recurring(&self) -> bool {
        !self.repeat_days.is_empty()
    }

    /// Reject alarms the channel cannot key.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidAlarm`] for an empty or blank id.
    pub fn validate(&self) -> Result<(), SchedulerError> {
        if self.id.trim().is_empty() {
            return Err(SchedulerError::InvalidAlarm("missing identifier".into()));
        }
        Ok(())
    }

    /// Next time this alarm fires strictly after `now`.
    ///
    /// One-shot alarms fire today if the time is still ahead, otherwise
    /// tomorrow. Recurring alarms fire on the soonest member of
    /// `repeat_days`; a slot already passed today rolls over to next week.
    #[must_use]
    pub fn next_occurrence_after(&self, now: NaiveDateTime) -> NaiveDateTime {
        let time = self
            .time
            .with_second(0)
            .and_then(|t| t.with_nanosecond(0))
            .unwrap_or(self.time);
        let today = now.date().and_time(time);

        if !self.is_recurring() {
            return if today > now {
                today
            } else {
                today + TimeDelta::days(1)
            };
        }

        (0..=7)
            .map(|offset| today + TimeDelta::days(offset))
            .find(|candidate| {
                *candidate > now && self.repeat_days.contains(&candidate.weekday())
            })
            .unwrap_or(today + TimeDelta::days(7))
    }
}

/// Read access to the external alarm store.
#[async_trait]
pub trait AlarmStore: Send + Sync {
    /// Snapshot of every enabled alarm.
    async fn list_enabled(&self) -> Result<Vec<Alarm>, SchedulerError>;

    /// Next firing time of `alarm`, already rolled past the current time.
    fn next_occurrence(&self, alarm: &Alarm) -> NaiveDateTime;
}
