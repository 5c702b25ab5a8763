#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Dataset keys, version records and version ordering rules.
//!
//! Each logical dataset (zones, sub-zones, the reference-text library)
//! carries an opaque version string. The local copy is reseeded whenever
//! its recorded version is missing or older than the version shipped with
//! the application.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use semver::Version;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// A logical dataset that is seeded and versioned as a unit.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DatasetKey {
    /// Precinct-equivalent zone boundaries.
    Zones,
    /// Sector boundaries within zones.
    SubZones,
    /// Reference-text library articles.
    LawLibrary,
}

impl DatasetKey {
    /// Every dataset key, in seeding order (sub-zones depend on zones).
    pub const ALL: &[Self] = &[Self::Zones, Self::SubZones, Self::LawLibrary];

    /// Datasets whose rows reference this one and must be reloaded
    /// whenever it is replaced.
    #[must_use]
    pub const fn dependents(self) -> &'static [Self] {
        match self {
            Self::Zones => &[Self::SubZones],
            Self::SubZones | Self::LawLibrary => &[],
        }
    }

    /// Whether a dataset at `current` must be reseeded to reach `target`.
    ///
    /// True when nothing has been recorded yet or `current` orders strictly
    /// before `target` under `ordering`.
    #[must_use]
    pub fn needs_upgrade(self, current: Option<&str>, target: &str, ordering: VersionOrdering) -> bool {
        current.is_none_or(|current| ordering.compare(current, target) == Ordering::Less)
    }
}

/// How two version strings are ordered.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
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
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum VersionOrdering {
    /// `SemVer` 2.0 precedence.
    ///
    /// Accepts `MAJOR[.MINOR[.PATCH]][-PRERELEASE][+BUILD]` with numeric
    /// core segments; missing minor/patch segments count as `0` and
    /// leading zeros are ignored, so `"7"` is `7.0.0` and `"2024.01.15"`
    /// is `2024.1.15`. A pre-release orders before its release
    /// (`"1.0.0-rc.1"` < `"1.0.0"`) and build metadata is ignored.
    ///
    /// When either side is not of that shape (more than three core
    /// segments, non-numeric or overflowing core), both are compared as
    /// dotted segments instead: numerically when both segments are digits,
    /// otherwise as text, with missing segments counting as `0`.
    #[default]
    Semantic,
    /// Plain byte-wise string comparison, as older releases did.
    ///
    /// Accepts any string. `"10.0.0"` orders before `"9.0.0"`. Only for
    /// seed data whose version strings were chosen around that behaviour.
    Lexicographic,
}

impl VersionOrdering {
    /// Compares two version strings under this rule.
    #[must_use]
    pub fn compare(self, a: &str, b: &str) -> Ordering {
        match self {
            Self::Semantic => compare_semantic(a, b),
            Self::Lexicographic => a.cmp(b),
        }
    }
}

fn compare_semantic(a: &str, b: &str) -> Ordering {
    match (parse_semver(a), parse_semver(b)) {
        (Some(a), Some(b)) => compare_precedence(&a, &b),
        _ => compare_dotted(a, b),
    }
}

/// Parses `a`, padding a short numeric core to three segments.
fn parse_semver(raw: &str) -> Option<Version> {
    let raw = raw.trim();
    let (core, suffix) = raw.find(['-', '+']).map_or((raw, ""), |i| raw.split_at(i));

    let mut segments: Vec<&str> = core.split('.').collect();
    if segments.len() > 3 || segments.iter().any(|s| !is_numeric(s)) {
        return None;
    }
    segments.resize(3, "0");

    let core = segments
        .iter()
        .map(|s| match s.trim_start_matches('0') {
            "" => "0",
            digits => digits,
        })
        .collect::<Vec<_>>()
        .join(".");

    Version::parse(&format!("{core}{suffix}")).ok()
}

/// `SemVer` precedence: build metadata does not participate.
fn compare_precedence(a: &Version, b: &Version) -> Ordering {
    (a.major, a.minor, a.patch, &a.pre).cmp(&(b.major, b.minor, b.patch, &b.pre))
}

fn compare_dotted(a: &str, b: &str) -> Ordering {
    let mut left = a.trim().split('.');
    let mut right = b.trim().split('.');

    loop {
        let ordering = match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (Some(l), None) => compare_segment(l, "0"),
            (None, Some(r)) => compare_segment("0", r),
            (Some(l), Some(r)) => compare_segment(l, r),
        };

        if ordering != Ordering::Equal {
            return ordering;
        }
    }
}

fn is_numeric(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|c| c.is_ascii_digit())
}

fn compare_segment(a: &str, b: &str) -> Ordering {
    if is_numeric(a) && is_numeric(b) {
        // Arbitrary-length digit strings: shorter (after stripping leading
        // zeros) is smaller, equal lengths compare as text.
        let a = a.trim_start_matches('0');
        let b = b.trim_start_matches('0');
        a.len().cmp(&b.len()).then_with(|| a.cmp(b))
    } else {
        a.cmp(b)
    }
}

/// A recorded dataset version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetVersion {
    /// Dataset this record belongs to.
    pub key: DatasetKey,
    /// Opaque version string.
    pub version: String,
    /// When the dataset was last (re)seeded or confirmed.
    pub last_synced_at: DateTime<Utc>,
}

/// A reference-text library article.
///
/// Stored only so the library dataset can be seeded and versioned; search
/// over it lives elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LawArticle {
    /// Article identifier (e.g. `"PL-140.10"`).
    pub id: String,
    /// Chapter or code section grouping.
    pub chapter: Option<String>,
    /// Article title.
    pub title: String,
    /// Article text.
    pub body: String,
}
