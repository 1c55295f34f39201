//! Error types for the task lifecycle.

use thiserror::Error;

use crate::agent::TransportError;
use crate::schedule::ValidationError;

/// Failures of task operations.
#[derive(Debug, Error)]
pub enum TaskError {
    /// A field is missing or malformed; nothing was sent.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Run attempted while the form differs from the last save; nothing was sent.
    #[error("task has unsaved changes: save first")]
    StaleConfiguration,

    /// Run attempted on a task that was never saved; nothing was sent.
    #[error("task has not been saved yet: save first")]
    NotSaved,

    /// The task service could not be reached or refused the call.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl TaskError {
    /// Whether the failure was decided locally, without a network call.
    #[must_use]
    pub const fn is_local(&self) -> bool {
        !matches!(self, Self::Transport(_))
    }
}
