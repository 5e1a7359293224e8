//! Dotted version parsing and ordering.
//!
//! Versions are `major.minor.patch` triples of non-negative integers and
//! compare component-wise, major first. Migration buckets are keyed by the
//! "minor key" (`major.minor`), which parses to a version with patch `0`.

use crate::error::{CoreError, CoreResult};
use regex::Regex;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Version of the application this build of Strata ships schema scripts for.
pub const APP_VERSION: &str = "0.13.2";

static FULL_VERSION_RE: OnceLock<Regex> = OnceLock::new();
static MINOR_KEY_RE: OnceLock<Regex> = OnceLock::new();

fn full_version_re() -> &'static Regex {
    FULL_VERSION_RE.get_or_init(|| {
        Regex::new(r"^([0-9]+)\.([0-9]+)\.([0-9]+)$").expect("valid regex")
    })
}

fn minor_key_re() -> &'static Regex {
    MINOR_KEY_RE
        .get_or_init(|| Regex::new(r"^([0-9]+)\.([0-9]+)$").expect("valid regex"))
}

/// Parsed `major.minor.patch` triple.
///
/// Field order matters: the derived `Ord` is lexicographic over
/// `(major, minor, patch)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl Version {
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse a full `<uint>.<uint>.<uint>` version string.
    pub fn parse(input: &str) -> CoreResult<Self> {
        let caps = full_version_re()
            .captures(input)
            .ok_or_else(|| invalid(input))?;
        Ok(Self {
            major: component(input, &caps[1])?,
            minor: component(input, &caps[2])?,
            patch: component(input, &caps[3])?,
        })
    }

    /// Parse a `<uint>.<uint>` minor key, defaulting patch to `0`.
    pub fn parse_minor_key(input: &str) -> CoreResult<Self> {
        let caps = minor_key_re().captures(input).ok_or_else(|| invalid(input))?;
        Ok(Self {
            major: component(input, &caps[1])?,
            minor: component(input, &caps[2])?,
            patch: 0,
        })
    }

    /// Whether `input` looks like a bucket directory name (`major.minor`).
    pub fn is_minor_key(input: &str) -> bool {
        minor_key_re().is_match(input)
    }

    /// The `major.minor` bucket this version belongs to.
    pub fn minor_key(&self) -> String {
        format!("{}.{}", self.major, self.minor)
    }

    /// The schema-relevant part of the version: `major.minor.0`.
    ///
    /// Patch releases never carry schema changes, so migration decisions
    /// compare this value rather than the full version.
    pub fn schema_version(&self) -> Version {
        Version::new(self.major, self.minor, 0)
    }
}

fn invalid(input: &str) -> CoreError {
    CoreError::InvalidVersionFormat {
        input: input.to_string(),
    }
}

fn component(input: &str, digits: &str) -> CoreResult<u64> {
    digits.parse::<u64>().map_err(|_| invalid(input))
}

impl FromStr for Version {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Version::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Compare two version strings component-wise.
pub fn compare(a: &str, b: &str) -> CoreResult<Ordering> {
    Ok(Version::parse(a)?.cmp(&Version::parse(b)?))
}

/// `a > b`
pub fn is_greater(a: &str, b: &str) -> CoreResult<bool> {
    Ok(compare(a, b)? == Ordering::Greater)
}

/// `a >= b`
pub fn is_greater_or_equal(a: &str, b: &str) -> CoreResult<bool> {
    Ok(compare(a, b)? != Ordering::Less)
}

/// Sort version strings ascending.
///
/// Every entry is parsed up front so a single malformed version fails the
/// whole sort instead of producing a partially ordered list.
pub fn sort_versions(versions: &mut [String]) -> CoreResult<()> {
    let mut keyed = versions
        .iter()
        .map(|v| Version::parse(v).map(|parsed| (parsed, v.clone())))
        .collect::<CoreResult<Vec<_>>>()?;
    keyed.sort_by(|a, b| a.0.cmp(&b.0));
    for (slot, (_, original)) in versions.iter_mut().zip(keyed) {
        *slot = original;
    }
    Ok(())
}

/// Highest version among `versions`, or `None` when empty.
pub fn latest<'a, I>(versions: I) -> CoreResult<Option<Version>>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut max: Option<Version> = None;
    for raw in versions {
        let parsed = Version::parse(raw)?;
        if max.map_or(true, |current| parsed > current) {
            max = Some(parsed);
        }
    }
    Ok(max)
}

#[cfg(test)]
#[path = "version_test.rs"]
mod tests;
