//! Version parsing and ordering
//!
//! Resource versions are plain `MAJOR.MINOR.PATCH` triples compared
//! numerically segment by segment.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during version handling
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SemverError {
    /// Invalid version format
    #[error("Invalid version format: {0}")]
    InvalidVersion(String),

    /// `latest` was asked to pick from nothing
    #[error("Cannot select the latest version of an empty set")]
    EmptySet,
}

/// Resource version (MAJOR.MINOR.PATCH)
///
/// Only the canonical spelling is accepted (no leading zeros, no prefix,
/// no pre-release or build suffix), so two versions are equal exactly when
/// their strings are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl Version {
    /// Create a new version
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Version {
            major,
            minor,
            patch,
        }
    }

    /// Parse a version string
    pub fn parse(s: &str) -> Result<Self, SemverError> {
        let parts: Vec<&str> = s.split('.').collect();
        if parts.len() != 3 {
            return Err(SemverError::InvalidVersion(format!(
                "Expected MAJOR.MINOR.PATCH, got '{}'",
                s
            )));
        }

        let major = parse_segment(parts[0], "major", s)?;
        let minor = parse_segment(parts[1], "minor", s)?;
        let patch = parse_segment(parts[2], "patch", s)?;

        Ok(Version::new(major, minor, patch))
    }
}

fn parse_segment(segment: &str, label: &str, whole: &str) -> Result<u64, SemverError> {
    let invalid = || {
        SemverError::InvalidVersion(format!("Invalid {} version '{}' in '{}'", label, segment, whole))
    };

    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    if segment.len() > 1 && segment.starts_with('0') {
        return Err(invalid());
    }

    segment.parse().map_err(|_| invalid())
}

/// Compare two versions numerically
pub fn compare(a: &Version, b: &Version) -> Ordering {
    a.cmp(b)
}

/// Pick the highest version
///
/// Fails with [`SemverError::EmptySet`] when `versions` yields nothing.
pub fn latest<'a, I>(versions: I) -> Result<Version, SemverError>
where
    I: IntoIterator<Item = &'a Version>,
{
    versions
        .into_iter()
        .max()
        .copied()
        .ok_or(SemverError::EmptySet)
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for Version {
    type Err = SemverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Version::parse(s)
    }
}

impl TryFrom<String> for Version {
    type Error = SemverError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Version::parse(&value)
    }
}

impl From<Version> for String {
    fn from(version: Version) -> Self {
        version.to_string()
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.major
            .cmp(&other.major)
            .then(self.minor.cmp(&other.minor))
            .then(self.patch.cmp(&other.patch))
    }
}
