//! Shared serializable value types and identifier helpers.

use chrono::Weekday;

/// Stable alarm identifier.
pub type AlarmId = String;

/// Category tag carried by every entry this crate registers.
pub const ALARM_CATEGORY: &str = "ALARM_CATEGORY";

/// Calendar weekday number, Sunday = 1 through Saturday = 7.
#[must_use]
pub fn weekday_number(day: Weekday) -> u32 {
    day.number_from_sunday()
}

/// Inverse of [`weekday_number`]. Returns `None` outside `1..=7`.
#[must_use]
pub fn weekday_from_number(n: u32) -> Option<Weekday> {
    match n {
        1 => Some(Weekday::Sun),
        2 => Some(Weekday::Mon),
        3 => Some(Weekday::Tue),
        4 => Some(Weekday::Wed),
        5 => Some(Weekday::Thu),
        6 => Some(Weekday::Fri),
        7 => Some(Weekday::Sat),
        _ => None,
    }
}

/// The seven weekdays starting at `start` and walking forward.
pub fn week_from(start: Weekday) -> impl Iterator<Item = Weekday> {
    std::iter::successors(Some(start), |d| Some(d.succ())).take(7)
}

/// Channel identifier for an alarm, optionally scoped to a weekday.
///
/// One-shot alarms use the bare id; recurring alarms get one entry per
/// weekday named `{id}-{weekday_number}`.
#[must_use]
pub fn entry_identifier(alarm_id: &str, weekday: Option<Weekday>) -> String {
    match weekday {
        Some(day) => format!("{alarm_id}-{}", weekday_number(day)),
        None => alarm_id.to_string(),
    }
}

/// Every identifier an alarm could own, regardless of its current shape.
#[must_use]
pub fn all_entry_identifiers(alarm_id: &str) -> Vec<String> {
    let mut ids = Vec::with_capacity(8);
    ids.push(entry_identifier(alarm_id, None));
    ids.extend(week_from(Weekday::Sun).map(|d| entry_identifier(alarm_id, Some(d))));
    ids
}
