//! Validation errors raised before anything reaches the network.

use thiserror::Error;

/// Local, pre-flight validation failure; corrected in place by the user.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum ValidationError {
    /// A required field is missing or blank.
    #[error("{0} required")]
    Required(&'static str),
    /// Time of day is not `HH:MM`.
    #[error("invalid time {0:?}: expected HH:MM")]
    InvalidTime(String),
    /// Day of week outside 0-6.
    #[error("day of week {0} out of range 0-6")]
    DayOfWeekOutOfRange(u8),
    /// Day of month outside 1-31.
    #[error("day of month {0} out of range 1-31")]
    DayOfMonthOutOfRange(u8),
    /// Unknown schedule kind.
    #[error("unknown schedule kind {0:?}")]
    UnknownKind(String),
    /// Cron expression without exactly five fields.
    #[error("cron expression must have 5 fields, got {0}")]
    CronFieldCount(usize),
    /// A cron field is syntactically invalid.
    #[error("invalid cron {field} field {value:?}: {reason}")]
    CronField {
        /// Field name (minute, hour, ...).
        field: &'static str,
        /// Offending field text.
        value: String,
        /// What is wrong with it.
        reason: String,
    },
    /// E-mail address is not plausible.
    #[error("invalid email address {0:?}")]
    InvalidEmail(String),
}
