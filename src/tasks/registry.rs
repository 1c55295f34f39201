//! Operator view over persisted tasks.

use std::sync::Arc;

use crate::agent::TransportError;

use super::service::TaskService;
use super::types::{RunResult, ScheduledTask, TaskId};

/// List, toggle, run and delete tasks straight against the service.
///
/// Operators act on persisted records, so there is no form and no dirty state here.
#[derive(Clone)]
pub struct TaskAdminRegistry {
    service: Arc<dyn TaskService>,
}

impl TaskAdminRegistry {
    /// Create a registry over `service`.
    #[must_use]
    pub const fn new(service: Arc<dyn TaskService>) -> Self {
        Self { service }
    }

    /// All persisted tasks.
    ///
    /// # Errors
    /// Returns the transport error.
    pub async fn list(&self) -> Result<Vec<ScheduledTask>, TransportError> {
        self.service.list().await
    }

    /// Enable or disable a task.
    ///
    /// # Errors
    /// Returns the transport error.
    pub async fn toggle(&self, id: TaskId, is_enabled: bool) -> Result<(), TransportError> {
        self.service.toggle(id, is_enabled).await
    }

    /// Run a persisted task now.
    ///
    /// # Errors
    /// Returns the transport error.
    pub async fn run(&self, id: TaskId) -> Result<RunResult, TransportError> {
        self.service.run(id).await
    }

    /// Delete a task.
    ///
    /// # Errors
    /// Returns the transport error.
    pub async fn delete(&self, id: TaskId) -> Result<(), TransportError> {
        self.service.delete(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::{TaskEditor, TaskForm, TaskLifecycleManager};
    use crate::schedule::ScheduleKind;
    use crate::testing::FakeTaskService;

    #[tokio::test]
    async fn test_registry_operates_on_saved_tasks() {
        let service = Arc::new(FakeTaskService::new());
        let manager = TaskLifecycleManager::new(service.clone());
        let mut editor = TaskEditor::with_form(TaskForm {
            name: "Orders".into(),
            question: "Open orders per customer".into(),
            email: "ops@example.com".into(),
            schedule_kind: ScheduleKind::EveryThirtyMinutes,
            ..TaskForm::default()
        });
        let saved = manager.save(&mut editor).await.unwrap();

        let registry = TaskAdminRegistry::new(service.clone());
        registry.toggle(saved.id, false).await.unwrap();
        assert!(!registry.list().await.unwrap()[0].form.is_enabled);

        registry.run(saved.id).await.unwrap();
        assert_eq!(service.run_count(), 1);

        registry.delete(saved.id).await.unwrap();
        assert!(registry.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_registry_surfaces_transport_errors() {
        let service = Arc::new(FakeTaskService::new());
        service.fail_next_call();
        let registry = TaskAdminRegistry::new(service);
        assert!(matches!(
            registry.list().await,
            Err(TransportError::Status { status: 503, .. })
        ));
    }
}
