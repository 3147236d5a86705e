// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Wall-clock time values and minute arithmetic.
//!
//! Booking and availability rows carry local wall-clock times as `HH:MM` or
//! `HH:MM:SS` strings. This module parses them into a typed value so the rest
//! of the engine never does string math, and rejects malformed or inverted
//! ranges with a typed error instead of letting garbage propagate.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Errors from wall-clock parsing and arithmetic.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimeError {
    #[error("Unparseable time string: {0:?}")]
    Parse(String),

    #[error("Time component out of range in {0:?}")]
    OutOfRange(String),

    /// A range where the end does not come after the start on the same day.
    ///
    /// Ranges crossing midnight are rejected rather than wrapped; the data
    /// model keeps a booking within a single calendar date.
    #[error("Inverted time range: {start} >= {end}")]
    InvertedRange { start: ClockTime, end: ClockTime },
}

/// A time of day with second precision, ordered chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClockTime {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl ClockTime {
    /// Build a clock time, validating component ranges.
    pub fn new(hour: u8, minute: u8, second: u8) -> Result<Self, TimeError> {
        if hour > 23 || minute > 59 || second > 59 {
            return Err(TimeError::OutOfRange(format!(
                "{:02}:{:02}:{:02}",
                hour, minute, second
            )));
        }
        Ok(Self {
            hour,
            minute,
            second,
        })
    }

    /// Seconds since midnight.
    pub fn seconds_from_midnight(&self) -> u32 {
        self.hour as u32 * 3600 + self.minute as u32 * 60 + self.second as u32
    }

    /// Convert to a `chrono::NaiveTime` for date-time assembly.
    pub fn to_naive(&self) -> chrono::NaiveTime {
        // Components are range-checked at construction, so this cannot fail.
        chrono::NaiveTime::from_hms_opt(self.hour as u32, self.minute as u32, self.second as u32)
            .unwrap_or_default()
    }
}

impl FromStr for ClockTime {
    type Err = TimeError;

    /// Parse `HH:MM` or `HH:MM:SS`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 2 && parts.len() != 3 {
            return Err(TimeError::Parse(s.to_string()));
        }

        let field = |p: &str| -> Result<u8, TimeError> {
            p.parse::<u8>().map_err(|_| TimeError::Parse(s.to_string()))
        };

        let hour = field(parts[0])?;
        let minute = field(parts[1])?;
        let second = if parts.len() == 3 { field(parts[2])? } else { 0 };

        Self::new(hour, minute, second)
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}:{:02}", self.hour, self.minute, self.second)
    }
}

// Rows store times as strings; serialize the same way.
impl Serialize for ClockTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ClockTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Whole minutes from `start` to `end` within the same day.
///
/// Rejects `end <= start`; a zero-length or midnight-crossing range is a data
/// error, not a duration.
pub fn minutes_between(start: ClockTime, end: ClockTime) -> Result<u32, TimeError> {
    if end <= start {
        return Err(TimeError::InvertedRange { start, end });
    }
    Ok((end.seconds_from_midnight() - start.seconds_from_midnight()) / 60)
}

impl From<TimeError> for crate::error::AppError {
    fn from(err: TimeError) -> Self {
        crate::error::AppError::BadRequest(err.to_string())
    }
}
