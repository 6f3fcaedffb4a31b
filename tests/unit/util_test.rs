//! Tests for utility functions

use alarm_lot::util::{
    all_entry_identifiers, entry_identifier, now_ms, week_from, weekday_from_number,
    weekday_number, FixedClock, WallClock, ALARM_CATEGORY,
};
use chrono::{NaiveDate, TimeDelta, Weekday};

#[test]
fn test_weekday_numbers_start_on_sunday() {
    assert_eq!(weekday_number(Weekday::Sun), 1);
    assert_eq!(weekday_number(Weekday::Mon), 2);
    assert_eq!(weekday_number(Weekday::Sat), 7);
    for n in 1..=7 {
        assert_eq!(weekday_number(weekday_from_number(n).unwrap()), n);
    }
    assert_eq!(weekday_from_number(0), None);
    assert_eq!(weekday_from_number(8), None);
}

#[test]
fn test_entry_identifiers() {
    assert_eq!(entry_identifier("wake", None), "wake");
    assert_eq!(entry_identifier("wake", Some(Weekday::Fri)), "wake-6");

    let all = all_entry_identifiers("wake");
    assert_eq!(all.len(), 8);
    assert!(all.contains(&"wake".to_string()));
    assert!(all.contains(&"wake-1".to_string()));
    assert!(all.contains(&"wake-7".to_string()));
}

#[test]
fn test_week_from_wraps() {
    let days: Vec<Weekday> = week_from(Weekday::Fri).collect();
    assert_eq!(days.len(), 7);
    assert_eq!(days[0], Weekday::Fri);
    assert_eq!(days[2], Weekday::Sun);
    assert_eq!(days[6], Weekday::Thu);
}

#[test]
fn test_fixed_clock_advances() {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(23, 30, 0)
        .unwrap();
    let clock = FixedClock::new(start);
    let shared = clock.clone();

    clock.advance(TimeDelta::hours(1));
    assert_eq!(shared.now(), start + TimeDelta::hours(1));
}

#[test]
fn test_category_and_now() {
    assert_eq!(ALARM_CATEGORY, "ALARM_CATEGORY");
    assert!(now_ms() > 0);
}
