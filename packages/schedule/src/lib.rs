#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Duty/off calendar computation.
//!
//! Every function here is a pure calculation over calendar dates
//! (`NaiveDate`, no time zone), so results never depend on wall-clock
//! time or on which month was computed before.

pub mod registry;

use std::collections::BTreeMap;

use chrono::{Datelike, Months, NaiveDate};
pub use precinct_map_schedule_models::{
    DutyToken, PatternKind, ScheduleDefinition, ScheduleError, parse_pattern,
};
use serde::Serialize;

/// Whole calendar days from the schedule's anchor date to `date`.
///
/// Negative for dates before the anchor.
#[must_use]
pub fn days_since_anchor(date: NaiveDate, schedule: &ScheduleDefinition) -> i64 {
    date.signed_duration_since(schedule.anchor_date()).num_days()
}

/// Index into the schedule's pattern for `date`.
///
/// Cyclic: `(days_since_anchor + offset) mod cycle_length`, always in
/// `0..cycle_length` even before the anchor. Weekly: day of week with
/// Sunday = 0.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn pattern_index(date: NaiveDate, schedule: &ScheduleDefinition) -> usize {
    match schedule.kind() {
        PatternKind::Cyclic => {
            let cycle = i64::from(schedule.cycle_length());
            let shifted = days_since_anchor(date, schedule) + i64::from(schedule.offset());
            // rem_euclid keeps this in 0..cycle
            shifted.rem_euclid(cycle) as usize
        }
        PatternKind::Weekly => date.weekday().num_days_from_sunday() as usize,
    }
}

/// The pattern token in effect on `date`.
#[must_use]
pub fn duty_token(date: NaiveDate, schedule: &ScheduleDefinition) -> DutyToken {
    schedule.pattern()[pattern_index(date, schedule)]
}

/// Whether `date` is a day off.
#[must_use]
pub fn is_off(date: NaiveDate, schedule: &ScheduleDefinition) -> bool {
    duty_token(date, schedule).is_off()
}

fn first_of_month(year: i32, month: u32) -> Result<NaiveDate, ScheduleError> {
    NaiveDate::from_ymd_opt(year, month, 1).ok_or(ScheduleError::InvalidMonth { year, month })
}

/// Number of days in the given month, leap years included.
///
/// # Errors
///
/// Returns [`ScheduleError::InvalidMonth`] if `month` is not 1-12 or the
/// year is outside the supported calendar range.
pub fn days_in_month(year: i32, month: u32) -> Result<u32, ScheduleError> {
    let invalid = || ScheduleError::InvalidMonth { year, month };

    first_of_month(year, month)?
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .map(|last| last.day())
        .ok_or_else(invalid)
}

/// Off-day flags for every day of a month, keyed by 1-based day of month.
///
/// # Errors
///
/// Returns [`ScheduleError::InvalidMonth`] for an invalid year/month.
pub fn compute_month(
    year: i32,
    month: u32,
    schedule: &ScheduleDefinition,
) -> Result<BTreeMap<u32, bool>, ScheduleError> {
    Ok(first_of_month(year, month)?
        .iter_days()
        .take_while(|d| d.month() == month)
        .map(|d| (d.day(), is_off(d, schedule)))
        .collect())
}

/// Duty/off totals for one month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthSummary {
    /// Calendar year.
    pub year: i32,
    /// Month, 1-12.
    pub month: u32,
    /// Days on duty.
    pub duty_days: u32,
    /// Days off.
    pub off_days: u32,
}

/// Counts duty and off days in a month.
///
/// # Errors
///
/// Returns [`ScheduleError::InvalidMonth`] for an invalid year/month.
pub fn month_summary(
    year: i32,
    month: u32,
    schedule: &ScheduleDefinition,
) -> Result<MonthSummary, ScheduleError> {
    let days = compute_month(year, month, schedule)?;
    let (off_days, duty_days) = days.values().fold((0, 0), |(off, duty), &is_off| {
        if is_off { (off + 1, duty) } else { (off, duty + 1) }
    });

    Ok(MonthSummary {
        year,
        month,
        duty_days,
        off_days,
    })
}

/// First day off on or after `from`.
///
/// Searches one full cycle; `None` when the pattern has no off days.
#[must_use]
pub fn next_off_day(from: NaiveDate, schedule: &ScheduleDefinition) -> Option<NaiveDate> {
    if !schedule.has_off_days() {
        return None;
    }

    from.iter_days()
        .take(schedule.pattern().len())
        .find(|&d| is_off(d, schedule))
}

/// Parses a `YYYY-MM-DD` calendar date.
///
/// # Errors
///
/// Returns [`ScheduleError::InvalidDate`] if `value` is not a valid date.
pub fn parse_date(value: &str) -> Result<NaiveDate, ScheduleError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| ScheduleError::InvalidDate {
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn cyclic(offset: i64) -> ScheduleDefinition {
        ScheduleDefinition::new(
            "squad",
            None,
            PatternKind::Cyclic,
            Some(15),
            parse_pattern("WWWWWOOWWWWWOOO").unwrap(),
            date(2026, 1, 1),
            offset,
        )
        .unwrap()
    }

    fn weekly() -> ScheduleDefinition {
        ScheduleDefinition::new(
            "office",
            None,
            PatternKind::Weekly,
            None,
            parse_pattern("OWWWWWO").unwrap(),
            date(2026, 1, 1),
            0,
        )
        .unwrap()
    }

    #[test]
    fn cyclic_anchor_and_sixth_day() {
        let schedule = cyclic(0);
        assert!(!is_off(date(2026, 1, 1), &schedule));
        assert!(is_off(date(2026, 1, 6), &schedule));
        assert_eq!(duty_token(date(2026, 1, 6), &schedule), DutyToken::Off);
    }

    #[test]
    fn offset_staggers_groups() {
        let staggered = cyclic(5);
        assert!(is_off(date(2026, 1, 1), &staggered));
        assert_eq!(pattern_index(date(2026, 1, 1), &staggered), 5);
    }

    #[test]
    fn dates_before_anchor_wrap_into_range() {
        let schedule = cyclic(0);
        assert_eq!(days_since_anchor(date(2025, 12, 31), &schedule), -1);
        assert_eq!(pattern_index(date(2025, 12, 31), &schedule), 14);
        assert!(is_off(date(2025, 12, 31), &schedule));
        assert_eq!(pattern_index(date(2025, 12, 17), &schedule), 0);
        assert!(!is_off(date(2025, 12, 17), &schedule));
    }

    #[test]
    fn weekly_weekends_are_off() {
        let schedule = weekly();
        // 2026-01-03 is a Saturday.
        assert!(is_off(date(2026, 1, 3), &schedule));
        assert!(is_off(date(2026, 1, 4), &schedule));
        for day in 5..=9 {
            assert!(!is_off(date(2026, 1, day), &schedule));
        }
        // Anchor is irrelevant for weekly patterns.
        assert!(is_off(date(1999, 7, 4), &schedule));
    }

    #[test]
    fn month_lengths_follow_the_calendar() {
        let schedule = weekly();
        assert_eq!(compute_month(2026, 2, &schedule).unwrap().len(), 28);
        assert_eq!(compute_month(2028, 2, &schedule).unwrap().len(), 29);
        assert_eq!(compute_month(2026, 4, &schedule).unwrap().len(), 30);
        assert_eq!(compute_month(2026, 12, &schedule).unwrap().len(), 31);
        assert_eq!(days_in_month(2000, 2).unwrap(), 29);
        assert_eq!(days_in_month(1900, 2).unwrap(), 28);
    }

    #[test]
    fn invalid_month_is_an_error() {
        let schedule = weekly();
        assert_eq!(
            compute_month(2026, 13, &schedule),
            Err(ScheduleError::InvalidMonth {
                year: 2026,
                month: 13
            })
        );
        assert!(days_in_month(2026, 0).is_err());
    }

    #[test]
    fn compute_month_is_keyed_by_day() {
        let month = compute_month(2026, 1, &cyclic(0)).unwrap();
        let off: Vec<u32> = month.iter().filter(|(_, off)| **off).map(|(d, _)| *d).collect();
        assert_eq!(off, vec![6, 7, 13, 14, 15, 21, 22, 28, 29, 30]);
        assert_eq!(month.keys().next(), Some(&1));
        assert_eq!(month.keys().last(), Some(&31));
    }

    #[test]
    fn summaries_count_both_kinds() {
        assert_eq!(
            month_summary(2026, 1, &cyclic(0)).unwrap(),
            MonthSummary {
                year: 2026,
                month: 1,
                duty_days: 21,
                off_days: 10,
            }
        );
        // February 2026 starts on a Sunday: exactly four weeks.
        let feb = month_summary(2026, 2, &weekly()).unwrap();
        assert_eq!((feb.duty_days, feb.off_days), (20, 8));
    }

    #[test]
    fn next_off_day_searches_one_cycle() {
        let schedule = cyclic(0);
        assert_eq!(next_off_day(date(2026, 1, 1), &schedule), Some(date(2026, 1, 6)));
        assert_eq!(next_off_day(date(2026, 1, 6), &schedule), Some(date(2026, 1, 6)));

        let always_on = ScheduleDefinition::new(
            "ops",
            None,
            PatternKind::Cyclic,
            None,
            parse_pattern("WWW").unwrap(),
            date(2026, 1, 1),
            0,
        )
        .unwrap();
        assert_eq!(next_off_day(date(2026, 1, 1), &always_on), None);
    }

    #[test]
    fn parse_date_rejects_garbage() {
        assert_eq!(parse_date(" 2026-02-28 ").unwrap(), date(2026, 2, 28));
        assert!(matches!(
            parse_date("2026-02-30"),
            Err(ScheduleError::InvalidDate { .. })
        ));
    }

    proptest! {
        #[test]
        fn cyclic_index_in_range_and_periodic(days in -200_000i64..200_000, offset in -60i64..60) {
            let schedule = cyclic(offset);
            let day = date(2026, 1, 1) + chrono::Duration::days(days);
            let index = pattern_index(day, &schedule);
            prop_assert!(index < 15);

            let next_cycle = day + chrono::Duration::days(15);
            prop_assert_eq!(is_off(day, &schedule), is_off(next_cycle, &schedule));
        }

        #[test]
        fn weekly_is_periodic_in_seven_days(days in -200_000i64..200_000) {
            let schedule = weekly();
            let day = date(2026, 1, 1) + chrono::Duration::days(days);
            prop_assert_eq!(
                is_off(day, &schedule),
                is_off(day + chrono::Duration::days(7), &schedule)
            );
        }

        #[test]
        fn offset_equals_shifted_dates(days in -5_000i64..5_000, offset in 0i64..15) {
            let day = date(2026, 1, 1) + chrono::Duration::days(days);
            prop_assert_eq!(
                is_off(day, &cyclic(offset)),
                is_off(day + chrono::Duration::days(offset), &cyclic(0))
            );
        }
    }
}
