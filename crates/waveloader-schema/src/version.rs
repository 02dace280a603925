use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    #[error("bad version '{0}': expected major.minor.build")]
    Malformed(String),
}

/// A `major.minor.build` release identifier.
///
/// Ordering is lexicographic over `(major, minor, build)`, which is exactly
/// what the derived `Ord` gives for this field order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VersionSet {
    pub major: u64,
    pub minor: u64,
    pub build: u64,
}

impl VersionSet {
    pub const fn new(major: u64, minor: u64, build: u64) -> Self {
        Self {
            major,
            minor,
            build,
        }
    }

    /// Parse a `major.minor.build` string. Each component must be a
    /// non-empty run of ASCII digits.
    pub fn parse(s: &str) -> Result<Self, VersionError> {
        let malformed = || VersionError::Malformed(s.to_owned());
        let mut tokens = s.split('.');
        let mut next = || -> Result<u64, VersionError> {
            let tok = tokens.next().ok_or_else(malformed)?;
            if tok.is_empty() || !tok.bytes().all(|b| b.is_ascii_digit()) {
                return Err(malformed());
            }
            tok.parse().map_err(|_| malformed())
        };
        let major = next()?;
        let minor = next()?;
        let build = next()?;
        if tokens.next().is_some() {
            return Err(malformed());
        }
        Ok(Self::new(major, minor, build))
    }
}

impl FromStr for VersionSet {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for VersionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.build)
    }
}

impl Serialize for VersionSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for VersionSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Pick the item with the greatest version.
///
/// Only a strictly greater version replaces the running maximum, so among
/// equal versions the earliest one seen wins.
pub fn latest_by<T, I, F>(items: I, mut version_of: F) -> Option<T>
where
    I: IntoIterator<Item = T>,
    F: FnMut(&T) -> VersionSet,
{
    let mut best: Option<(VersionSet, T)> = None;
    for item in items {
        let v = version_of(&item);
        match best {
            Some((current, _)) if v <= current => {}
            _ => best = Some((v, item)),
        }
    }
    best.map(|(_, item)| item)
}
