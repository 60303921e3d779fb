//! Source ranges used as coverage keys.

use crate::result::FuzzError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A source range in IDE coordinates
///
/// Encoded as `start_line:start_column-end_line:end_column`, which is also the
/// key used in the persisted coverage files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdePosition {
    /// First line
    pub start_line: u32,
    /// First column
    pub start_column: u32,
    /// Last line
    pub end_line: u32,
    /// Last column
    pub end_column: u32,
}

impl IdePosition {
    /// Create a position
    #[must_use]
    pub const fn new(start_line: u32, start_column: u32, end_line: u32, end_column: u32) -> Self {
        Self {
            start_line,
            start_column,
            end_line,
            end_column,
        }
    }
}

impl fmt::Display for IdePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}-{}:{}",
            self.start_line, self.start_column, self.end_line, self.end_column
        )
    }
}

fn parse_point(text: &str, full: &str) -> Result<(u32, u32), FuzzError> {
    let invalid = || FuzzError::configuration(format!("Invalid coverage position '{full}'"));
    let (line, column) = text.split_once(':').ok_or_else(invalid)?;
    let line = line.trim().parse().map_err(|_| invalid())?;
    let column = column.trim().parse().map_err(|_| invalid())?;
    Ok((line, column))
}

impl FromStr for IdePosition {
    type Err = FuzzError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (start, end) = s
            .split_once('-')
            .ok_or_else(|| FuzzError::configuration(format!("Invalid coverage position '{s}'")))?;
        let (start_line, start_column) = parse_point(start, s)?;
        let (end_line, end_column) = parse_point(end, s)?;
        Ok(Self::new(start_line, start_column, end_line, end_column))
    }
}

impl Serialize for IdePosition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for IdePosition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}
