//! Syntactic validation of 5-field cron expressions.
//!
//! This is a fast-fail aid for the form: field count, character set and
//! value ranges. The server decides whether an expression is acceptable
//! (impossible dates such as `0 0 31 2 *` pass here).

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use super::error::ValidationError;

/// Characters allowed in a single field.
#[allow(clippy::expect_used)]
static FIELD_CHARSET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9A-Za-z*,/\-]+$").expect("field charset pattern is valid"));

const MONTH_NAMES: [&str; 12] = [
    "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
];
const WEEKDAY_NAMES: [&str; 7] = ["SUN", "MON", "TUE", "WED", "THU", "FRI", "SAT"];

struct FieldSpec {
    name: &'static str,
    min: u32,
    max: u32,
    /// Names mapped to `min + index`.
    names: &'static [&'static str],
}

const FIELDS: [FieldSpec; 5] = [
    FieldSpec { name: "minute", min: 0, max: 59, names: &[] },
    FieldSpec { name: "hour", min: 0, max: 23, names: &[] },
    FieldSpec { name: "day-of-month", min: 1, max: 31, names: &[] },
    FieldSpec { name: "month", min: 1, max: 12, names: &MONTH_NAMES },
    // 7 is accepted as an alias for Sunday.
    FieldSpec { name: "day-of-week", min: 0, max: 7, names: &WEEKDAY_NAMES },
];

impl FieldSpec {
    fn error(&self, value: &str, reason: impl Into<String>) -> ValidationError {
        ValidationError::CronField {
            field: self.name,
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    fn value(&self, field: &str, token: &str) -> Result<u32, ValidationError> {
        let parsed = if token.chars().all(|c| c.is_ascii_digit()) {
            token
                .parse::<u32>()
                .map_err(|_| self.error(field, format!("{token} is not a number")))?
        } else {
            let upper = token.to_ascii_uppercase();
            let index = self
                .names
                .iter()
                .position(|n| *n == upper)
                .ok_or_else(|| self.error(field, format!("unknown name {token}")))?;
            self.min + u32::try_from(index).unwrap_or(u32::MAX)
        };
        if parsed < self.min || parsed > self.max {
            return Err(self.error(
                field,
                format!("{parsed} outside {}-{}", self.min, self.max),
            ));
        }
        Ok(parsed)
    }

    fn validate(&self, field: &str) -> Result<(), ValidationError> {
        if !FIELD_CHARSET.is_match(field) {
            return Err(self.error(field, "unexpected character"));
        }

        for item in field.split(',') {
            if item.is_empty() {
                return Err(self.error(field, "empty list item"));
            }
            let (range, step) = item
                .split_once('/')
                .map_or((item, None), |(range, step)| (range, Some(step)));
            if let Some(step) = step {
                let step: u32 = step
                    .parse()
                    .map_err(|_| self.error(field, format!("invalid step {step:?}")))?;
                if step == 0 {
                    return Err(self.error(field, "step must be > 0"));
                }
                if step > self.max {
                    return Err(self.error(field, format!("step {step} exceeds {}", self.max)));
                }
            }
            if range == "*" {
                continue;
            }
            match range.split_once('-') {
                Some((low, high)) => {
                    let low = self.value(field, low)?;
                    let high = self.value(field, high)?;
                    if low > high {
                        return Err(self.error(field, format!("range {low}-{high} is descending")));
                    }
                }
                None => {
                    self.value(field, range)?;
                }
            }
        }
        Ok(())
    }
}

/// A syntactically valid 5-field cron expression, normalized to single spaces.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct CronExpression(String);

impl CronExpression {
    /// Validate `raw`: minute, hour, day-of-month, month and day-of-week fields.
    ///
    /// # Errors
    /// Returns a [`ValidationError`] naming the first offending field.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let fields: Vec<&str> = raw.split_whitespace().collect();
        if fields.is_empty() {
            return Err(ValidationError::Required("cron expression"));
        }
        if fields.len() != FIELDS.len() {
            return Err(ValidationError::CronFieldCount(fields.len()));
        }
        for (spec, field) in FIELDS.iter().zip(&fields) {
            spec.validate(field)?;
        }
        Ok(Self(fields.join(" ")))
    }

    /// Borrow as `&str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CronExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CronExpression {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
