//! Structured recurrence choices and their validation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::cron::CronExpression;
use super::error::ValidationError;
use super::time::TimeOfDay;

const WEEKDAYS: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

/// How often a scheduled task runs.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum ScheduleKind {
    /// Every five minutes.
    #[serde(rename = "every5m")]
    EveryFiveMinutes,
    /// Every thirty minutes.
    #[serde(rename = "every30m")]
    EveryThirtyMinutes,
    /// Once a day at a fixed time.
    #[default]
    #[serde(rename = "daily")]
    Daily,
    /// Once a week on a fixed day and time.
    #[serde(rename = "weekly")]
    Weekly,
    /// Once a month on a fixed day and time.
    #[serde(rename = "monthly")]
    Monthly,
    /// User-supplied cron expression.
    #[serde(rename = "customCron")]
    CustomCron,
}

impl ScheduleKind {
    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EveryFiveMinutes => "every5m",
            Self::EveryThirtyMinutes => "every30m",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::CustomCron => "customCron",
        }
    }
}

impl fmt::Display for ScheduleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScheduleKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "every5m" => Ok(Self::EveryFiveMinutes),
            "every30m" => Ok(Self::EveryThirtyMinutes),
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "customCron" => Ok(Self::CustomCron),
            other => Err(ValidationError::UnknownKind(other.to_string())),
        }
    }
}

/// Raw recurrence fields as edited in the form. Which ones matter depends on the kind.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurrenceParams {
    /// `HH:MM`, for daily, weekly and monthly.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    /// 0 (Sunday) to 6, for weekly.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_of_week: Option<u8>,
    /// 1 to 31, for monthly.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_of_month: Option<u8>,
    /// Five-field expression, for custom cron.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cron_expression: Option<String>,
}

impl RecurrenceParams {
    /// Params with a time of day.
    #[must_use]
    pub fn at(time: impl Into<String>) -> Self {
        Self {
            time: Some(time.into()),
            ..Self::default()
        }
    }

    /// Set the day of week.
    #[must_use]
    pub const fn with_day_of_week(mut self, day: u8) -> Self {
        self.day_of_week = Some(day);
        self
    }

    /// Set the day of month.
    #[must_use]
    pub const fn with_day_of_month(mut self, day: u8) -> Self {
        self.day_of_month = Some(day);
        self
    }

    /// Params carrying a cron expression.
    #[must_use]
    pub fn cron(expression: impl Into<String>) -> Self {
        Self {
            cron_expression: Some(expression.into()),
            ..Self::default()
        }
    }

    fn time(&self) -> Result<TimeOfDay, ValidationError> {
        match self.time.as_deref().map(str::trim) {
            None | Some("") => Err(ValidationError::Required("time")),
            Some(raw) => TimeOfDay::parse(raw),
        }
    }
}

/// A validated recurrence, ready for preview and submission.
///
/// The server computes the canonical cron string actually used for execution;
/// [`RecurrenceSpec::cron`] is the client's candidate.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RecurrenceSpec {
    /// `*/5 * * * *`.
    EveryFiveMinutes,
    /// `*/30 * * * *`.
    EveryThirtyMinutes,
    /// Every day at `at`.
    Daily {
        /// Time of day.
        at: TimeOfDay,
    },
    /// Every week on `day` (0 = Sunday) at `at`.
    Weekly {
        /// Time of day.
        at: TimeOfDay,
        /// Day of week, 0-6.
        day: u8,
    },
    /// Every month on `day` at `at`.
    Monthly {
        /// Time of day.
        at: TimeOfDay,
        /// Day of month, 1-31.
        day: u8,
    },
    /// Custom expression.
    Custom(CronExpression),
}

impl RecurrenceSpec {
    /// Kind this spec was built from.
    #[must_use]
    pub const fn kind(&self) -> ScheduleKind {
        match self {
            Self::EveryFiveMinutes => ScheduleKind::EveryFiveMinutes,
            Self::EveryThirtyMinutes => ScheduleKind::EveryThirtyMinutes,
            Self::Daily { .. } => ScheduleKind::Daily,
            Self::Weekly { .. } => ScheduleKind::Weekly,
            Self::Monthly { .. } => ScheduleKind::Monthly,
            Self::Custom(_) => ScheduleKind::CustomCron,
        }
    }

    /// Candidate 5-field cron string.
    #[must_use]
    pub fn cron(&self) -> String {
        match self {
            Self::EveryFiveMinutes => "*/5 * * * *".to_string(),
            Self::EveryThirtyMinutes => "*/30 * * * *".to_string(),
            Self::Daily { at } => format!("{} {} * * *", at.minute(), at.hour()),
            Self::Weekly { at, day } => format!("{} {} * * {day}", at.minute(), at.hour()),
            Self::Monthly { at, day } => format!("{} {} {day} * *", at.minute(), at.hour()),
            Self::Custom(expr) => expr.to_string(),
        }
    }

    /// Human-readable description for previews.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::EveryFiveMinutes => "Every 5 minutes".to_string(),
            Self::EveryThirtyMinutes => "Every 30 minutes".to_string(),
            Self::Daily { at } => format!("Daily at {at}"),
            Self::Weekly { at, day } => {
                let name = WEEKDAYS.get(usize::from(*day)).copied().unwrap_or("?");
                format!("Weekly on {name} at {at}")
            }
            Self::Monthly { at, day } => format!("Monthly on day {day} at {at}"),
            Self::Custom(expr) => format!("Custom schedule ({expr})"),
        }
    }
}

impl fmt::Display for RecurrenceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

/// Validate `params` for `kind` and build the recurrence.
///
/// Only the fields relevant to `kind` are looked at. The time is checked
/// before the day.
///
/// # Errors
/// Returns the first [`ValidationError`] found.
pub fn build_recurrence(
    kind: ScheduleKind,
    params: &RecurrenceParams,
) -> Result<RecurrenceSpec, ValidationError> {
    match kind {
        ScheduleKind::EveryFiveMinutes => Ok(RecurrenceSpec::EveryFiveMinutes),
        ScheduleKind::EveryThirtyMinutes => Ok(RecurrenceSpec::EveryThirtyMinutes),
        ScheduleKind::Daily => Ok(RecurrenceSpec::Daily { at: params.time()? }),
        ScheduleKind::Weekly => {
            let at = params.time()?;
            let day = params
                .day_of_week
                .ok_or(ValidationError::Required("day of week"))?;
            if day > 6 {
                return Err(ValidationError::DayOfWeekOutOfRange(day));
            }
            Ok(RecurrenceSpec::Weekly { at, day })
        }
        ScheduleKind::Monthly => {
            let at = params.time()?;
            let day = params
                .day_of_month
                .ok_or(ValidationError::Required("day of month"))?;
            if !(1..=31).contains(&day) {
                return Err(ValidationError::DayOfMonthOutOfRange(day));
            }
            Ok(RecurrenceSpec::Monthly { at, day })
        }
        ScheduleKind::CustomCron => {
            let raw = params
                .cron_expression
                .as_deref()
                .ok_or(ValidationError::Required("cron expression"))?;
            Ok(RecurrenceSpec::Custom(CronExpression::parse(raw)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_intervals_need_no_params() {
        let params = RecurrenceParams::default();
        let five = build_recurrence(ScheduleKind::EveryFiveMinutes, &params).unwrap();
        assert_eq!(five.cron(), "*/5 * * * *");
        let thirty = build_recurrence(ScheduleKind::EveryThirtyMinutes, &params).unwrap();
        assert_eq!(thirty.cron(), "*/30 * * * *");
        assert_eq!(thirty.describe(), "Every 30 minutes");
    }

    #[test]
    fn test_daily_requires_time() {
        assert_eq!(
            build_recurrence(ScheduleKind::Daily, &RecurrenceParams::default()),
            Err(ValidationError::Required("time"))
        );
        assert_eq!(
            build_recurrence(ScheduleKind::Daily, &RecurrenceParams::at("  ")),
            Err(ValidationError::Required("time"))
        );
        assert!(matches!(
            build_recurrence(ScheduleKind::Daily, &RecurrenceParams::at("25:00")),
            Err(ValidationError::InvalidTime(_))
        ));

        let spec = build_recurrence(ScheduleKind::Daily, &RecurrenceParams::at("07:30")).unwrap();
        assert_eq!(spec.cron(), "30 7 * * *");
        assert_eq!(spec.describe(), "Daily at 07:30");
    }

    #[test]
    fn test_weekly_day_out_of_range() {
        let no_time = RecurrenceParams::default().with_day_of_week(7);
        assert!(build_recurrence(ScheduleKind::Weekly, &no_time).is_err());

        let with_time = RecurrenceParams::at("08:00").with_day_of_week(7);
        assert_eq!(
            build_recurrence(ScheduleKind::Weekly, &with_time),
            Err(ValidationError::DayOfWeekOutOfRange(7))
        );
    }

    #[test]
    fn test_weekly_monday_morning() {
        let params = RecurrenceParams::at("08:00").with_day_of_week(1);
        let spec = build_recurrence(ScheduleKind::Weekly, &params).unwrap();
        assert_eq!(spec.kind(), ScheduleKind::Weekly);
        assert_eq!(spec.cron(), "0 8 * * 1");
        assert_eq!(spec.describe(), "Weekly on Monday at 08:00");
    }

    #[test]
    fn test_weekly_requires_day() {
        assert_eq!(
            build_recurrence(ScheduleKind::Weekly, &RecurrenceParams::at("08:00")),
            Err(ValidationError::Required("day of week"))
        );
    }

    #[test]
    fn test_monthly_bounds() {
        let last = RecurrenceParams::at("06:00").with_day_of_month(31);
        let spec = build_recurrence(ScheduleKind::Monthly, &last).unwrap();
        assert_eq!(spec.cron(), "0 6 31 * *");
        assert_eq!(spec.describe(), "Monthly on day 31 at 06:00");

        for day in [0, 32] {
            let params = RecurrenceParams::at("06:00").with_day_of_month(day);
            assert_eq!(
                build_recurrence(ScheduleKind::Monthly, &params),
                Err(ValidationError::DayOfMonthOutOfRange(day))
            );
        }
    }

    #[test]
    fn test_custom_cron_is_validated() {
        let spec = build_recurrence(
            ScheduleKind::CustomCron,
            &RecurrenceParams::cron("0  9 * *  1-5"),
        )
        .unwrap();
        assert_eq!(spec.cron(), "0 9 * * 1-5");

        assert_eq!(
            build_recurrence(ScheduleKind::CustomCron, &RecurrenceParams::default()),
            Err(ValidationError::Required("cron expression"))
        );
        assert_eq!(
            build_recurrence(ScheduleKind::CustomCron, &RecurrenceParams::cron("0 9 * *")),
            Err(ValidationError::CronFieldCount(4))
        );
    }

    #[test]
    fn test_irrelevant_params_are_ignored() {
        let params = RecurrenceParams::at("not a time").with_day_of_week(9);
        assert!(build_recurrence(ScheduleKind::EveryFiveMinutes, &params).is_ok());
    }

    #[test]
    fn test_kind_wire_names() {
        for kind in [
            ScheduleKind::EveryFiveMinutes,
            ScheduleKind::EveryThirtyMinutes,
            ScheduleKind::Daily,
            ScheduleKind::Weekly,
            ScheduleKind::Monthly,
            ScheduleKind::CustomCron,
        ] {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{kind}\""));
            assert_eq!(kind.as_str().parse::<ScheduleKind>().unwrap(), kind);
        }
        assert_eq!(
            "hourly".parse::<ScheduleKind>(),
            Err(ValidationError::UnknownKind("hourly".to_string()))
        );
    }

    #[test]
    fn test_params_serialize_camel_case() {
        let params = RecurrenceParams::at("06:00").with_day_of_month(31);
        let value = serde_json::to_value(&params).unwrap();
        assert_eq!(value, serde_json::json!({"time": "06:00", "dayOfMonth": 31}));
    }
}
