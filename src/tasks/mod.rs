//! Scheduled tasks.
//!
//! - `lifecycle`: [`TaskEditor`] dirty tracking and [`TaskLifecycleManager`]
//! - `service`: [`TaskService`] contract and its HTTP implementation
//! - `registry`: thin operator view
//! - `types`: records and payloads

pub mod error;
pub mod lifecycle;
pub mod registry;
pub mod service;
pub mod types;

pub use error::TaskError;
pub use lifecycle::{TaskEditor, TaskLifecycleManager, TaskPhase, validate_form};
pub use registry::TaskAdminRegistry;
pub use service::{HttpTaskService, TaskService};
pub use types::{
    PreviewResult, RunResult, SaveReceipt, ScheduledTask, TaskForm, TaskId, TaskPayload,
};
