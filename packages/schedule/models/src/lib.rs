#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Duty schedule definition types.
//!
//! A schedule is either a cyclic pattern of duty/off tokens anchored to a
//! calendar date, or a fixed Sunday-first weekly pattern. Definitions are
//! validated when constructed (and when deserialized), so a misconfigured
//! pattern fails at load time instead of producing wrong calendars.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use thiserror::Error;

/// Days in a weekly pattern.
pub const WEEK_LENGTH: u32 = 7;

/// Errors raised while building or evaluating a schedule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    /// The pattern has no tokens.
    #[error("Schedule {group_id} has an empty pattern")]
    EmptyPattern {
        /// Offending group.
        group_id: String,
    },

    /// A cyclic pattern's length differs from its declared cycle length.
    #[error("Schedule {group_id} declares cycle length {declared} but has {actual} pattern entries")]
    PatternLengthMismatch {
        /// Offending group.
        group_id: String,
        /// Declared cycle length.
        declared: u32,
        /// Pattern entries present.
        actual: usize,
    },

    /// A weekly pattern does not have exactly seven entries.
    #[error("Weekly schedule {group_id} needs {WEEK_LENGTH} pattern entries, found {actual}")]
    WeeklyPatternLength {
        /// Offending group.
        group_id: String,
        /// Pattern entries present.
        actual: usize,
    },

    /// A cycle length of zero, or a weekly schedule declaring a cycle
    /// other than seven days.
    #[error("Schedule {group_id} has invalid cycle length {cycle_length}")]
    InvalidCycleLength {
        /// Offending group.
        group_id: String,
        /// Declared cycle length.
        cycle_length: u32,
    },

    /// The year/month pair does not name a calendar month.
    #[error("Invalid month {year}-{month}")]
    InvalidMonth {
        /// Requested year.
        year: i32,
        /// Requested month (1-12).
        month: u32,
    },

    /// A date string could not be parsed as `YYYY-MM-DD`.
    #[error("Invalid date {value:?}")]
    InvalidDate {
        /// The rejected input.
        value: String,
    },

    /// No registered duty group has this id.
    #[error("Unknown duty group {0:?}")]
    UnknownGroup(String),
}

/// One day of a duty pattern.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum DutyToken {
    /// On duty.
    #[serde(rename = "W")]
    #[strum(serialize = "W")]
    Duty,
    /// Day off.
    #[serde(rename = "O")]
    #[strum(serialize = "O")]
    Off,
}

impl DutyToken {
    /// Whether this is a day off.
    #[must_use]
    pub const fn is_off(self) -> bool {
        matches!(self, Self::Off)
    }
}

/// How a pattern maps onto calendar dates.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PatternKind {
    /// Indexed by days since the anchor date plus the group offset.
    Cyclic,
    /// Indexed by day of week, Sunday = 0.
    Weekly,
}

/// A validated duty schedule for one group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSchedule", into = "RawSchedule")]
pub struct ScheduleDefinition {
    group_id: String,
    name: Option<String>,
    kind: PatternKind,
    cycle_length: u32,
    pattern: Vec<DutyToken>,
    anchor_date: NaiveDate,
    offset: u32,
}

impl ScheduleDefinition {
    /// Builds and validates a schedule.
    ///
    /// For [`PatternKind::Cyclic`] an absent `cycle_length` is taken from
    /// the pattern length. For [`PatternKind::Weekly`] the cycle is always
    /// seven days. `offset` is reduced modulo the cycle length.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError`] if the pattern is empty, its length does
    /// not match the cycle length, or the cycle length is invalid.
    pub fn new(
        group_id: impl Into<String>,
        name: Option<String>,
        kind: PatternKind,
        cycle_length: Option<u32>,
        pattern: Vec<DutyToken>,
        anchor_date: NaiveDate,
        offset: i64,
    ) -> Result<Self, ScheduleError> {
        let group_id = group_id.into();

        if pattern.is_empty() {
            return Err(ScheduleError::EmptyPattern { group_id });
        }

        let cycle_length = match kind {
            PatternKind::Cyclic => {
                let declared = match cycle_length {
                    Some(declared) => declared,
                    None => u32::try_from(pattern.len()).map_err(|_| {
                        ScheduleError::PatternLengthMismatch {
                            group_id: group_id.clone(),
                            declared: u32::MAX,
                            actual: pattern.len(),
                        }
                    })?,
                };
                if declared == 0 {
                    return Err(ScheduleError::InvalidCycleLength {
                        group_id,
                        cycle_length: declared,
                    });
                }
                if usize::try_from(declared).ok() != Some(pattern.len()) {
                    return Err(ScheduleError::PatternLengthMismatch {
                        group_id,
                        declared,
                        actual: pattern.len(),
                    });
                }
                declared
            }
            PatternKind::Weekly => {
                if let Some(declared) = cycle_length.filter(|&c| c != WEEK_LENGTH) {
                    return Err(ScheduleError::InvalidCycleLength {
                        group_id,
                        cycle_length: declared,
                    });
                }
                if usize::try_from(WEEK_LENGTH).ok() != Some(pattern.len()) {
                    return Err(ScheduleError::WeeklyPatternLength {
                        group_id,
                        actual: pattern.len(),
                    });
                }
                WEEK_LENGTH
            }
        };

        let reduced = offset.rem_euclid(i64::from(cycle_length));
        let offset = u32::try_from(reduced).map_err(|_| ScheduleError::InvalidCycleLength {
            group_id: group_id.clone(),
            cycle_length,
        })?;

        Ok(Self {
            group_id,
            name,
            kind,
            cycle_length,
            pattern,
            anchor_date,
            offset,
        })
    }

    /// Owning group identifier.
    #[must_use]
    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    /// Human-readable group name, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Pattern kind.
    #[must_use]
    pub const fn kind(&self) -> PatternKind {
        self.kind
    }

    /// Cycle length in days (always 7 for weekly patterns).
    #[must_use]
    pub const fn cycle_length(&self) -> u32 {
        self.cycle_length
    }

    /// Pattern tokens; length equals [`ScheduleDefinition::cycle_length`].
    #[must_use]
    pub fn pattern(&self) -> &[DutyToken] {
        &self.pattern
    }

    /// Date aligned with pattern index `offset`.
    #[must_use]
    pub const fn anchor_date(&self) -> NaiveDate {
        self.anchor_date
    }

    /// Offset, already reduced into `0..cycle_length`.
    #[must_use]
    pub const fn offset(&self) -> u32 {
        self.offset
    }

    /// Whether the pattern contains at least one day off.
    #[must_use]
    pub fn has_off_days(&self) -> bool {
        self.pattern.iter().any(|t| t.is_off())
    }
}

/// Unvalidated wire shape of [`ScheduleDefinition`].
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawSchedule {
    group_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    kind: PatternKind,
    #[serde(default)]
    cycle_length: Option<u32>,
    pattern: Vec<DutyToken>,
    anchor_date: NaiveDate,
    #[serde(default)]
    offset: i64,
}

impl TryFrom<RawSchedule> for ScheduleDefinition {
    type Error = ScheduleError;

    fn try_from(raw: RawSchedule) -> Result<Self, Self::Error> {
        Self::new(
            raw.group_id,
            raw.name,
            raw.kind,
            raw.cycle_length,
            raw.pattern,
            raw.anchor_date,
            raw.offset,
        )
    }
}

impl From<ScheduleDefinition> for RawSchedule {
    fn from(schedule: ScheduleDefinition) -> Self {
        Self {
            group_id: schedule.group_id,
            name: schedule.name,
            kind: schedule.kind,
            cycle_length: Some(schedule.cycle_length),
            pattern: schedule.pattern,
            anchor_date: schedule.anchor_date,
            offset: i64::from(schedule.offset),
        }
    }
}

/// Parses a compact token string such as `"WWWWWOO"`.
///
/// Whitespace and commas are ignored.
///
/// # Errors
///
/// Returns the first unrecognized character.
pub fn parse_pattern(text: &str) -> Result<Vec<DutyToken>, char> {
    text.chars()
        .filter(|c| !c.is_whitespace() && *c != ',')
        .map(|c| match c {
            'W' => Ok(DutyToken::Duty),
            'O' => Ok(DutyToken::Off),
            other => Err(other),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn cyclic_length_must_match_pattern() {
        let err = ScheduleDefinition::new(
            "a",
            None,
            PatternKind::Cyclic,
            Some(15),
            parse_pattern("WWWWWOO").unwrap(),
            date(2026, 1, 1),
            0,
        )
        .unwrap_err();
        assert_eq!(
            err,
            ScheduleError::PatternLengthMismatch {
                group_id: "a".to_string(),
                declared: 15,
                actual: 7,
            }
        );
    }

    #[test]
    fn cyclic_length_defaults_to_pattern_length() {
        let schedule = ScheduleDefinition::new(
            "a",
            None,
            PatternKind::Cyclic,
            None,
            parse_pattern("WWO").unwrap(),
            date(2026, 1, 1),
            0,
        )
        .unwrap();
        assert_eq!(schedule.cycle_length(), 3);
    }

    #[test]
    fn zero_cycle_and_empty_pattern_are_rejected() {
        let empty = ScheduleDefinition::new(
            "e",
            None,
            PatternKind::Cyclic,
            Some(0),
            vec![],
            date(2026, 1, 1),
            0,
        );
        assert!(matches!(empty, Err(ScheduleError::EmptyPattern { .. })));

        let zero = ScheduleDefinition::new(
            "z",
            None,
            PatternKind::Cyclic,
            Some(0),
            vec![DutyToken::Duty],
            date(2026, 1, 1),
            0,
        );
        assert!(matches!(zero, Err(ScheduleError::InvalidCycleLength { .. })));
    }

    #[test]
    fn weekly_needs_seven_entries() {
        let short = ScheduleDefinition::new(
            "w",
            None,
            PatternKind::Weekly,
            None,
            parse_pattern("OWWWWW").unwrap(),
            date(2026, 1, 1),
            0,
        );
        assert!(matches!(
            short,
            Err(ScheduleError::WeeklyPatternLength { actual: 6, .. })
        ));

        let wrong_cycle = ScheduleDefinition::new(
            "w",
            None,
            PatternKind::Weekly,
            Some(14),
            parse_pattern("OWWWWWO").unwrap(),
            date(2026, 1, 1),
            0,
        );
        assert!(matches!(
            wrong_cycle,
            Err(ScheduleError::InvalidCycleLength { cycle_length: 14, .. })
        ));
    }

    #[test]
    fn offset_is_reduced_modulo_cycle() {
        let build = |offset| {
            ScheduleDefinition::new(
                "o",
                None,
                PatternKind::Cyclic,
                Some(15),
                parse_pattern("WWWWWOOWWWWWOOO").unwrap(),
                date(2026, 1, 1),
                offset,
            )
            .unwrap()
            .offset()
        };
        assert_eq!(build(20), 5);
        assert_eq!(build(-1), 14);
        assert_eq!(build(-30), 0);
    }

    #[test]
    fn parse_pattern_rejects_unknown_tokens() {
        assert_eq!(parse_pattern("W, O ,W").unwrap().len(), 3);
        assert_eq!(parse_pattern("WXO"), Err('X'));
    }

    #[test]
    fn deserialization_validates() {
        let good = r#"
            group_id = "squad_a"
            kind = "cyclic"
            cycle_length = 3
            pattern = ["W", "W", "O"]
            anchor_date = "2026-01-01"
            offset = -1
        "#;
        let schedule: ScheduleDefinition = toml::from_str(good).unwrap();
        assert_eq!(schedule.offset(), 2);
        assert!(schedule.has_off_days());

        let bad = r#"
            group_id = "squad_a"
            kind = "cyclic"
            cycle_length = 4
            pattern = ["W", "W", "O"]
            anchor_date = "2026-01-01"
        "#;
        assert!(toml::from_str::<ScheduleDefinition>(bad).is_err());

        let bad_token = r#"
            group_id = "squad_a"
            kind = "weekly"
            pattern = ["O", "W", "W", "X", "W", "W", "O"]
            anchor_date = "2026-01-01"
        "#;
        assert!(toml::from_str::<ScheduleDefinition>(bad_token).is_err());
    }

    #[test]
    fn token_names_are_single_letters() {
        assert_eq!(DutyToken::Duty.as_ref(), "W");
        assert_eq!("O".parse::<DutyToken>().unwrap(), DutyToken::Off);
        assert_eq!(PatternKind::Weekly.as_ref(), "weekly");
    }
}
