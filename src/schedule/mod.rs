//! Recurrence building for scheduled tasks.
//!
//! - `recurrence`: schedule kinds, raw params and [`build_recurrence`]
//! - `cron`: syntactic check of custom 5-field expressions
//! - `time`: `HH:MM` time of day
//! - `error`: [`ValidationError`]

mod cron;
mod error;
mod recurrence;
mod time;

pub use cron::CronExpression;
pub use error::ValidationError;
pub use recurrence::{RecurrenceParams, RecurrenceSpec, ScheduleKind, build_recurrence};
pub use time::TimeOfDay;
