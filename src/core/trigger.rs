//! Trigger construction for delivery-channel entries.
//!
//! Triggers are calendar matches: an hour and minute, optionally pinned to a
//! weekday. The builder does no date arithmetic of its own; callers pass an
//! occurrence that has already been rolled forward.

use chrono::{Datelike, NaiveDateTime, TimeDelta, Timelike, Weekday};
use serde::{Deserialize, Serialize};

/// Calendar components a trigger matches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateMatch {
    /// Weekday to match, or `None` to match any day.
    pub weekday: Option<Weekday>,
    /// Hour of day, 0-23.
    pub hour: u32,
    /// Minute of hour, 0-59.
    pub minute: u32,
}

/// When a channel entry fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Trigger {
    /// Components to match.
    pub matching: DateMatch,
    /// Whether the trigger keeps firing after the first match.
    pub repeats: bool,
}

/// Non-repeating trigger for the hour and minute of `time`.
#[must_use]
pub fn build_one_shot(time: NaiveDateTime) -> Trigger {
    Trigger {
        matching: DateMatch {
            weekday: None,
            hour: time.hour(),
            minute: time.minute(),
        },
        repeats: false,
    }
}

/// Repeating trigger on `weekday` at `hour:minute`.
#[must_use]
pub const fn build_weekly(hour: u32, minute: u32, weekday: Weekday) -> Trigger {
    Trigger {
        matching: DateMatch {
            weekday: Some(weekday),
            hour,
            minute,
        },
        repeats: true,
    }
}

impl Trigger {
    /// First instant strictly after `now` that this trigger matches.
    #[must_use]
    pub fn next_fire_after(&self, now: NaiveDateTime) -> Option<NaiveDateTime> {
        let today = now
            .date()
            .and_hms_opt(self.matching.hour, self.matching.minute, 0)?;
        (0..=7)
            .map(|offset| today + TimeDelta::days(offset))
            .find(|candidate| {
                *candidate > now
                    && self
                        .matching
                        .weekday
                        .is_none_or(|day| candidate.weekday() == day)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn monday(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    #[test]
    fn one_shot_matches_hour_and_minute_only() {
        let trigger = build_one_shot(monday(6, 45));
        assert!(!trigger.repeats);
        assert_eq!(trigger.matching.weekday, None);
        assert_eq!((trigger.matching.hour, trigger.matching.minute), (6, 45));
    }

    #[test]
    fn weekly_repeats_on_weekday() {
        let trigger = build_weekly(7, 5, Weekday::Thu);
        assert!(trigger.repeats);
        assert_eq!(trigger.matching.weekday, Some(Weekday::Thu));
    }

    #[test]
    fn next_fire_respects_weekday() {
        let trigger = build_weekly(7, 0, Weekday::Wed);
        let next = trigger.next_fire_after(monday(8, 0)).unwrap();
        assert_eq!(next.weekday(), Weekday::Wed);
        assert_eq!(next.day(), 3);
    }

    #[test]
    fn next_fire_of_passed_one_shot_is_tomorrow() {
        let trigger = build_one_shot(monday(6, 0));
        let next = trigger.next_fire_after(monday(7, 0)).unwrap();
        assert_eq!(next, monday(6, 0) + TimeDelta::days(1));
    }
}
