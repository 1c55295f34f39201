//! Task records and task service payloads.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::schedule::{RecurrenceParams, ScheduleKind};

/// Server-assigned task identifier.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub i64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TaskId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

/// Editable fields of a scheduled task. Every field is tracked for dirtiness.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskForm {
    /// Display name.
    pub name: String,
    /// Natural-language instruction for the agent.
    pub question: String,
    /// Recipient of the results.
    pub email: String,
    /// Literal SQL bypassing the natural-language interpretation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql_override: Option<String>,
    /// Recurrence kind.
    pub schedule_kind: ScheduleKind,
    /// Recurrence fields relevant to `schedule_kind`.
    #[serde(flatten)]
    pub recurrence: RecurrenceParams,
    /// Whether the scheduler should fire this task.
    pub is_enabled: bool,
}

impl Default for TaskForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            question: String::new(),
            email: String::new(),
            sql_override: None,
            schedule_kind: ScheduleKind::default(),
            recurrence: RecurrenceParams::default(),
            is_enabled: true,
        }
    }
}

/// A task as persisted by the platform.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledTask {
    /// Identifier.
    pub id: TaskId,
    /// Persisted fields.
    #[serde(flatten)]
    pub form: TaskForm,
    /// Cron string the scheduler actually uses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence_canonical: Option<String>,
    /// Last execution time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run_at: Option<DateTime<Utc>>,
    /// Outcome of the last execution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_status: Option<String>,
}

/// Body of a save call. Creates when `id` is absent, updates otherwise.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPayload {
    /// Identifier of the task being updated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<TaskId>,
    /// Fields to persist.
    #[serde(flatten)]
    pub form: TaskForm,
    /// Client-side candidate cron string.
    pub cron: String,
    /// Human-readable recurrence.
    pub description: String,
}

/// Read-only dry run of a task's question.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PreviewResult {
    /// Plain-text answer.
    pub answer: Option<String>,
    /// Rich answer.
    pub answer_html: Option<String>,
    /// SQL the agent ran; this is what will run unattended.
    pub used_sql: Option<String>,
    /// Number of rows the query returned.
    pub row_count: Option<u64>,
}

/// Outcome of a save.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveReceipt {
    /// Assigned or kept identifier.
    pub id: TaskId,
    /// Cron string the server settled on.
    #[serde(default)]
    pub recurrence_canonical: Option<String>,
}

/// Outcome of a manual run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunResult {
    /// Server message.
    pub message: String,
}
