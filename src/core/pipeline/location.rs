#![allow(clippy::result_large_err)]

use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Coordinate of a step inside a pipeline.
///
/// Tiers run from the entry step outward; branches sit perpendicular to
/// tiers. `(0,0)` is the entry point of every traversal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Location {
    branch: i16,
    tier: i16,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LocationParseError {
    #[error("location '{0}' must contain exactly two comma separated coordinates")]
    WrongArity(String),
    #[error("location coordinate '{0}' is not a 16-bit integer")]
    NotANumber(String),
    #[error("location '{0}' uses a negative coordinate; only (-1,-1) may be negative")]
    Negative(String),
}

impl From<LocationParseError> for AppError {
    fn from(err: LocationParseError) -> Self {
        AppError::new(ErrorCategory::ParseError, err.to_string()).with_code("TF-PARSE-001")
    }
}

impl Location {
    /// Sentinel returned when no further step exists.
    pub const INVALID: Location = Location {
        branch: -1,
        tier: -1,
    };

    /// Entry location of every traversal.
    pub const ORIGIN: Location = Location { branch: 0, tier: 0 };

    pub const fn new(branch: i16, tier: i16) -> Self {
        Self { branch, tier }
    }

    pub fn branch(&self) -> i16 {
        self.branch
    }

    pub fn tier(&self) -> i16 {
        self.tier
    }

    pub fn is_valid(&self) -> bool {
        self.branch >= 0 && self.tier >= 0
    }

    /// Location one tier further on the same branch, or `INVALID` on overflow.
    pub fn next_tier(&self) -> Location {
        match self.tier.checked_add(1) {
            Some(tier) if self.is_valid() => Location::new(self.branch, tier),
            _ => Location::INVALID,
        }
    }

    pub fn parse(input: &str) -> Result<Self, AppError> {
        input.parse::<Location>().map_err(AppError::from)
    }
}

impl Default for Location {
    fn default() -> Self {
        Location::ORIGIN
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.branch, self.tier)
    }
}

impl FromStr for Location {
    type Err = LocationParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        let inner = trimmed
            .strip_prefix('(')
            .and_then(|rest| rest.strip_suffix(')'))
            .unwrap_or(trimmed);

        let parts: Vec<&str> = inner.split(',').map(str::trim).collect();
        if parts.len() != 2 {
            return Err(LocationParseError::WrongArity(trimmed.to_string()));
        }

        let branch = parts[0]
            .parse::<i16>()
            .map_err(|_| LocationParseError::NotANumber(parts[0].to_string()))?;
        let tier = parts[1]
            .parse::<i16>()
            .map_err(|_| LocationParseError::NotANumber(parts[1].to_string()))?;

        let location = Location::new(branch, tier);
        if !location.is_valid() && location != Location::INVALID {
            return Err(LocationParseError::Negative(trimmed.to_string()));
        }
        Ok(location)
    }
}
