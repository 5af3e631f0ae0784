// Version Domain Model

use super::error::DomainError;
use std::fmt;
use std::str::FromStr;

/// Semantic version triple reported by `pixi --version`
///
/// Ordering is the derived lexicographic ordering on (major, minor, patch).
/// Pre-release and build metadata are not supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VersionTuple {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl VersionTuple {
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl fmt::Display for VersionTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for VersionTuple {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DomainError::InvalidVersion(s.to_string());

        let mut parts = s.trim().split('.');
        let mut next = || -> Result<u64, DomainError> {
            parts
                .next()
                .ok_or_else(invalid)?
                .parse::<u64>()
                .map_err(|_| invalid())
        };

        let version = Self::new(next()?, next()?, next()?);

        if parts.next().is_some() {
            return Err(invalid());
        }

        Ok(version)
    }
}
