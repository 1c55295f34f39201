//! Time of day for daily, weekly and monthly schedules.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveTime, Timelike};

use super::error::ValidationError;

/// Wall-clock time a task fires at, minute precision.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub struct TimeOfDay(NaiveTime);

impl TimeOfDay {
    /// Parse `HH:MM` (seconds, as sent by some time pickers, are accepted and dropped).
    ///
    /// # Errors
    /// Returns [`ValidationError::InvalidTime`] if the value is not a valid time.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let s = raw.trim();
        let time = NaiveTime::parse_from_str(s, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
            .map_err(|_| ValidationError::InvalidTime(raw.to_string()))?;
        Ok(Self(time.with_second(0).unwrap_or(time)))
    }

    /// Hour, 0-23.
    #[must_use]
    pub fn hour(self) -> u32 {
        self.0.hour()
    }

    /// Minute, 0-59.
    #[must_use]
    pub fn minute(self) -> u32 {
        self.0.minute()
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl FromStr for TimeOfDay {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
