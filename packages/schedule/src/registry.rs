//! Compile-time registry of duty groups.
//!
//! Each entry is a `(name, toml_content)` pair embedded via `include_str!`.
//! Adding a group requires creating a TOML file in `groups/` and adding a
//! corresponding entry here.

use precinct_map_schedule_models::{ScheduleDefinition, ScheduleError};

/// Number of registered duty groups. Enforced by a test.
#[cfg(test)]
const EXPECTED_GROUP_COUNT: usize = 4;

/// Embedded TOML group definitions.
const GROUP_TOMLS: &[(&str, &str)] = &[
    ("squad_a", include_str!("../groups/squad_a.toml")),
    ("squad_b", include_str!("../groups/squad_b.toml")),
    ("squad_c", include_str!("../groups/squad_c.toml")),
    ("office_weekly", include_str!("../groups/office_weekly.toml")),
];

/// Returns all registered duty groups.
///
/// # Panics
///
/// Panics if any embedded TOML file fails to parse or validate. Since
/// these are compile-time constants, failures indicate a development
/// error and are caught by the tests below.
#[must_use]
pub fn all_groups() -> Vec<ScheduleDefinition> {
    GROUP_TOMLS
        .iter()
        .map(|(name, toml_str)| {
            toml::de::from_str(toml_str)
                .unwrap_or_else(|e| panic!("Failed to parse duty group '{name}': {e}"))
        })
        .collect()
}

/// Looks up a registered duty group by id.
///
/// # Errors
///
/// Returns [`ScheduleError::UnknownGroup`] if no group has this id.
pub fn group(id: &str) -> Result<ScheduleDefinition, ScheduleError> {
    all_groups()
        .into_iter()
        .find(|g| g.group_id() == id)
        .ok_or_else(|| ScheduleError::UnknownGroup(id.to_string()))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use chrono::NaiveDate;

    use super::*;
    use crate::is_off;

    #[test]
    fn loads_all_groups() {
        let groups = all_groups();
        assert_eq!(
            groups.len(),
            EXPECTED_GROUP_COUNT,
            "Expected {EXPECTED_GROUP_COUNT} duty groups, found {}. \
             Update EXPECTED_GROUP_COUNT after adding/removing groups.",
            groups.len()
        );
    }

    #[test]
    fn group_ids_are_unique_and_match_file_names() {
        let mut seen = BTreeSet::new();
        for ((name, _), group) in GROUP_TOMLS.iter().zip(all_groups()) {
            assert_eq!(*name, group.group_id(), "File {name} declares another id");
            assert!(
                seen.insert(group.group_id().to_string()),
                "Duplicate duty group ID: {}",
                group.group_id()
            );
        }
    }

    #[test]
    fn squads_share_a_staggered_rotation() {
        let anchor = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let a = group("squad_a").unwrap();
        let b = group("squad_b").unwrap();

        assert!(!is_off(anchor, &a));
        assert!(is_off(anchor, &b));
        assert_eq!(a.pattern(), b.pattern());
    }

    #[test]
    fn unknown_group_is_an_error() {
        assert_eq!(
            group("night_watch"),
            Err(ScheduleError::UnknownGroup("night_watch".to_string()))
        );
    }
}
