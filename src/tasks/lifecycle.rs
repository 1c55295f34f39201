//! Task editing, saving and running.
//!
//! A task moves `Draft -> Saved <-> Dirty`. Running is allowed only from
//! `Saved`: a task whose form differs from what was last persisted would run
//! against configuration the user has not committed to.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::schedule::{RecurrenceSpec, ValidationError, build_recurrence};

use super::error::TaskError;
use super::service::TaskService;
use super::types::{PreviewResult, RunResult, ScheduledTask, TaskForm, TaskId, TaskPayload};

/// Derived position of an editor in the lifecycle.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TaskPhase {
    /// Never saved; has no id.
    Draft,
    /// Form equals the last saved snapshot.
    Saved,
    /// Saved once, edited since.
    Dirty,
}

/// In-memory form of one task plus its last-saved snapshot.
#[derive(Clone, Debug, Default)]
pub struct TaskEditor {
    id: Option<TaskId>,
    form: TaskForm,
    snapshot: Option<TaskForm>,
    canonical: Option<String>,
}

impl TaskEditor {
    /// Empty draft.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Draft pre-filled with `form`.
    #[must_use]
    pub fn with_form(form: TaskForm) -> Self {
        Self {
            form,
            ..Self::default()
        }
    }

    /// Open a persisted task; it starts out `Saved`.
    #[must_use]
    pub fn from_task(task: &ScheduledTask) -> Self {
        Self {
            id: Some(task.id),
            form: task.form.clone(),
            snapshot: Some(task.form.clone()),
            canonical: task.recurrence_canonical.clone(),
        }
    }

    /// Server id, once saved.
    #[must_use]
    pub const fn id(&self) -> Option<TaskId> {
        self.id
    }

    /// Current form.
    #[must_use]
    pub const fn form(&self) -> &TaskForm {
        &self.form
    }

    /// Edit the form. Any change from the snapshot makes the task dirty.
    pub const fn form_mut(&mut self) -> &mut TaskForm {
        &mut self.form
    }

    /// Cron string the server returned on the last save.
    #[must_use]
    pub fn recurrence_canonical(&self) -> Option<&str> {
        self.canonical.as_deref()
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> TaskPhase {
        match (self.id, &self.snapshot) {
            (Some(_), Some(snapshot)) if *snapshot == self.form => TaskPhase::Saved,
            (Some(_), _) => TaskPhase::Dirty,
            (None, _) => TaskPhase::Draft,
        }
    }

    /// Whether the form diverged from the last save.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.phase() == TaskPhase::Dirty
    }

    /// Whether the scheduler fires this task. Orthogonal to the phase.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.form.is_enabled
    }

    fn mark_saved(&mut self, id: TaskId, form: TaskForm, canonical: Option<String>) {
        self.id = Some(id);
        self.snapshot = Some(form);
        self.canonical = canonical;
    }
}

fn require(value: &str, field: &'static str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required(field));
    }
    Ok(())
}

fn validate_email(raw: &str) -> Result<(), ValidationError> {
    let email = raw.trim();
    require(email, "email")?;
    let plausible = email
        .split_once('@')
        .is_some_and(|(local, domain)| {
            !local.is_empty() && !domain.is_empty() && !domain.contains('@')
        })
        && !email.chars().any(char::is_whitespace);
    if plausible {
        Ok(())
    } else {
        Err(ValidationError::InvalidEmail(raw.to_string()))
    }
}

/// Check the fields a save needs and build the recurrence.
///
/// # Errors
/// Returns the first missing or malformed field.
pub fn validate_form(form: &TaskForm) -> Result<RecurrenceSpec, ValidationError> {
    require(&form.name, "name")?;
    require(&form.question, "question")?;
    validate_email(&form.email)?;
    build_recurrence(form.schedule_kind, &form.recurrence)
}

/// Owns the task list and enforces the save-before-run policy.
pub struct TaskLifecycleManager {
    service: Arc<dyn TaskService>,
    tasks: Mutex<Vec<ScheduledTask>>,
}

impl TaskLifecycleManager {
    /// Create a manager over `service`. The task list starts empty until [`Self::refresh`].
    #[must_use]
    pub const fn new(service: Arc<dyn TaskService>) -> Self {
        Self {
            service,
            tasks: Mutex::new(Vec::new()),
        }
    }

    fn cache(&self) -> MutexGuard<'_, Vec<ScheduledTask>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Last fetched task list.
    #[must_use]
    pub fn tasks(&self) -> Vec<ScheduledTask> {
        self.cache().clone()
    }

    /// Re-fetch the whole task list.
    ///
    /// # Errors
    /// Returns the transport error; the cached list is left untouched.
    pub async fn refresh(&self) -> Result<Vec<ScheduledTask>, TaskError> {
        let tasks = self.service.list().await?;
        tracing::debug!(count = tasks.len(), "Task list refreshed");
        *self.cache() = tasks.clone();
        Ok(tasks)
    }

    async fn refresh_after_mutation(&self) {
        if let Err(e) = self.refresh().await {
            tracing::warn!("Task list refresh failed: {e}");
        }
    }

    /// Dry-run a question in read-only mode. Usable from any phase, any number of times.
    ///
    /// # Errors
    /// Returns a validation error for a blank question, or the transport error.
    pub async fn preview(
        &self,
        question: &str,
        sql_override: Option<&str>,
    ) -> Result<PreviewResult, TaskError> {
        require(question, "question")?;
        let sql_override = sql_override.map(str::trim).filter(|s| !s.is_empty());
        Ok(self.service.preview(question.trim(), sql_override).await?)
    }

    /// Preview the editor's current question and SQL override.
    ///
    /// # Errors
    /// Same as [`Self::preview`].
    pub async fn preview_editor(&self, editor: &TaskEditor) -> Result<PreviewResult, TaskError> {
        let form = editor.form();
        self.preview(&form.question, form.sql_override.as_deref()).await
    }

    /// Validate and persist the editor's form.
    ///
    /// On success the editor is `Saved` with a fresh snapshot and the task list
    /// is re-fetched. On failure the editor is unchanged.
    ///
    /// # Errors
    /// Returns a validation error without any network call, or the transport error.
    pub async fn save(&self, editor: &mut TaskEditor) -> Result<ScheduledTask, TaskError> {
        let spec = validate_form(editor.form())?;
        let payload = TaskPayload {
            id: editor.id(),
            form: editor.form().clone(),
            cron: spec.cron(),
            description: spec.describe(),
        };

        let receipt = self.service.save(&payload).await?;
        editor.mark_saved(receipt.id, payload.form.clone(), receipt.recurrence_canonical.clone());
        tracing::info!(id = %receipt.id, schedule = %spec, "Task saved");

        self.refresh_after_mutation().await;
        let saved = self
            .cache()
            .iter()
            .find(|t| t.id == receipt.id)
            .cloned()
            .unwrap_or(ScheduledTask {
                id: receipt.id,
                form: payload.form,
                recurrence_canonical: receipt.recurrence_canonical,
                last_run_at: None,
                last_status: None,
            });
        Ok(saved)
    }

    /// Execute the task now. Only a `Saved` task runs.
    ///
    /// # Errors
    /// Returns [`TaskError::NotSaved`] or [`TaskError::StaleConfiguration`] without
    /// any network call, or the transport error.
    pub async fn run(&self, editor: &TaskEditor) -> Result<RunResult, TaskError> {
        let id = match (editor.phase(), editor.id()) {
            (TaskPhase::Saved, Some(id)) => id,
            (TaskPhase::Dirty, _) => return Err(TaskError::StaleConfiguration),
            _ => return Err(TaskError::NotSaved),
        };
        Ok(self.service.run(id).await?)
    }

    /// Enable or disable the task.
    ///
    /// For a saved task this persists only the flag: the snapshot's flag is
    /// updated too, so unrelated pending edits stay dirty and nothing else is
    /// re-validated. A draft just records the choice for its first save.
    ///
    /// # Errors
    /// Returns the transport error; the editor is unchanged in that case.
    pub async fn set_enabled(&self, editor: &mut TaskEditor, enabled: bool) -> Result<(), TaskError> {
        let Some(id) = editor.id() else {
            editor.form.is_enabled = enabled;
            return Ok(());
        };

        self.service.toggle(id, enabled).await?;
        editor.form.is_enabled = enabled;
        if let Some(snapshot) = editor.snapshot.as_mut() {
            snapshot.is_enabled = enabled;
        }
        self.refresh_after_mutation().await;
        Ok(())
    }

    /// Delete a persisted task and re-fetch the list.
    ///
    /// # Errors
    /// Returns the transport error.
    pub async fn delete(&self, id: TaskId) -> Result<(), TaskError> {
        self.service.delete(id).await?;
        tracing::info!(%id, "Task deleted");
        self.refresh_after_mutation().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::{RecurrenceParams, ScheduleKind};
    use crate::testing::FakeTaskService;

    fn monthly_form() -> TaskForm {
        TaskForm {
            name: "Month-end stock".into(),
            question: "Total kilos in stock per cut".into(),
            email: "ops@butchery.example".into(),
            schedule_kind: ScheduleKind::Monthly,
            recurrence: RecurrenceParams::at("06:00").with_day_of_month(31),
            ..TaskForm::default()
        }
    }

    fn manager() -> (Arc<FakeTaskService>, TaskLifecycleManager) {
        let service = Arc::new(FakeTaskService::new());
        let manager = TaskLifecycleManager::new(service.clone());
        (service, manager)
    }

    #[tokio::test]
    async fn test_save_then_edit_blocks_run_until_saved() {
        let (service, manager) = manager();
        let mut editor = TaskEditor::with_form(monthly_form());
        assert_eq!(editor.phase(), TaskPhase::Draft);

        let saved = manager.save(&mut editor).await.unwrap();
        assert_eq!(editor.phase(), TaskPhase::Saved);
        assert_eq!(editor.snapshot.as_ref(), Some(editor.form()));
        assert_eq!(saved.form, monthly_form());
        assert_eq!(editor.recurrence_canonical(), Some("0 6 31 * *"));
        assert_eq!(service.saves.lock().unwrap()[0].cron, "0 6 31 * *");

        editor.form_mut().email = "manager@butchery.example".into();
        assert!(editor.is_dirty());
        assert!(matches!(
            manager.run(&editor).await,
            Err(TaskError::StaleConfiguration)
        ));
        assert_eq!(service.run_count(), 0);

        manager.save(&mut editor).await.unwrap();
        assert!(!editor.is_dirty());
        let result = manager.run(&editor).await.unwrap();
        assert!(result.message.contains(&saved.id.to_string()));
        assert_eq!(service.run_count(), 1);
        assert_eq!(service.save_count(), 2);
        assert_eq!(service.saves.lock().unwrap()[1].id, Some(saved.id));
    }

    #[tokio::test]
    async fn test_reverting_an_edit_clears_dirty() {
        let (_, manager) = manager();
        let mut editor = TaskEditor::with_form(monthly_form());
        manager.save(&mut editor).await.unwrap();

        editor.form_mut().name = "Other".into();
        assert!(editor.is_dirty());
        editor.form_mut().name = "Month-end stock".into();
        assert_eq!(editor.phase(), TaskPhase::Saved);
    }

    #[tokio::test]
    async fn test_draft_cannot_run() {
        let (service, manager) = manager();
        let editor = TaskEditor::with_form(monthly_form());
        assert!(matches!(manager.run(&editor).await, Err(TaskError::NotSaved)));
        assert_eq!(service.run_count(), 0);
    }

    #[tokio::test]
    async fn test_validation_never_reaches_the_network() {
        let (service, manager) = manager();
        let cases: [(fn(&mut TaskForm), ValidationError); 6] = [
            (|f: &mut TaskForm| f.name = "  ".into(), ValidationError::Required("name")),
            (|f: &mut TaskForm| f.question.clear(), ValidationError::Required("question")),
            (|f: &mut TaskForm| f.email.clear(), ValidationError::Required("email")),
            (
                |f: &mut TaskForm| f.email = "ops.example".into(),
                ValidationError::InvalidEmail("ops.example".into()),
            ),
            (
                |f: &mut TaskForm| f.recurrence.day_of_month = Some(32),
                ValidationError::DayOfMonthOutOfRange(32),
            ),
            (|f: &mut TaskForm| f.recurrence.time = None, ValidationError::Required("time")),
        ];
        for (edit, expected) in cases {
            let mut form = monthly_form();
            edit(&mut form);
            let mut editor = TaskEditor::with_form(form);
            let result = manager.save(&mut editor).await;
            assert!(
                matches!(&result, Err(TaskError::Validation(e)) if *e == expected),
                "expected {expected:?}, got {result:?}"
            );
            assert_eq!(editor.phase(), TaskPhase::Draft);
        }
        assert_eq!(service.save_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_save_leaves_editor_unchanged() {
        let (service, manager) = manager();
        let mut editor = TaskEditor::with_form(monthly_form());
        manager.save(&mut editor).await.unwrap();
        editor.form_mut().question = "Kilos sold per customer".into();

        service.fail_next_call();
        assert!(matches!(
            manager.save(&mut editor).await,
            Err(TaskError::Transport(_))
        ));
        assert!(editor.is_dirty());
        assert!(matches!(
            manager.run(&editor).await,
            Err(TaskError::StaleConfiguration)
        ));
    }

    #[tokio::test]
    async fn test_toggle_keeps_unrelated_edits_dirty() {
        let (service, manager) = manager();
        let mut editor = TaskEditor::with_form(monthly_form());
        let saved = manager.save(&mut editor).await.unwrap();

        manager.set_enabled(&mut editor, false).await.unwrap();
        assert!(!editor.is_enabled());
        assert_eq!(editor.phase(), TaskPhase::Saved);
        assert_eq!(*service.toggles.lock().unwrap(), vec![(saved.id, false)]);
        assert!(!manager.tasks()[0].form.is_enabled);

        editor.form_mut().email = "x@y".into();
        manager.set_enabled(&mut editor, true).await.unwrap();
        assert!(editor.is_dirty());
        assert_eq!(service.save_count(), 1);
    }

    #[tokio::test]
    async fn test_toggle_on_draft_is_local() {
        let (service, manager) = manager();
        let mut editor = TaskEditor::with_form(monthly_form());
        manager.set_enabled(&mut editor, false).await.unwrap();
        assert!(!editor.form().is_enabled);
        assert!(service.toggles.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_preview_from_any_phase() {
        let (service, manager) = manager();
        let editor = TaskEditor::with_form(monthly_form());
        let preview = manager.preview_editor(&editor).await.unwrap();
        assert_eq!(preview.used_sql.as_deref(), Some("SELECT 1"));
        assert_eq!(editor.phase(), TaskPhase::Draft);

        let overridden = manager
            .preview("Stock?", Some("SELECT kilos FROM stock"))
            .await
            .unwrap();
        assert_eq!(overridden.used_sql.as_deref(), Some("SELECT kilos FROM stock"));
        assert_eq!(*service.previews.lock().unwrap(), 2);

        assert!(matches!(
            manager.preview("   ", None).await,
            Err(TaskError::Validation(ValidationError::Required("question")))
        ));
    }

    #[tokio::test]
    async fn test_mutations_refetch_the_list() {
        let (service, manager) = manager();
        let mut first = TaskEditor::with_form(monthly_form());
        let mut second = TaskEditor::with_form(TaskForm {
            name: "Every five".into(),
            schedule_kind: ScheduleKind::EveryFiveMinutes,
            ..monthly_form()
        });
        manager.save(&mut first).await.unwrap();
        manager.save(&mut second).await.unwrap();
        assert_eq!(manager.tasks().len(), 2);

        let id = first.id().unwrap();
        manager.delete(id).await.unwrap();
        let remaining = manager.tasks();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, second.id().unwrap());
        assert_eq!(*service.list_calls.lock().unwrap(), 3);
    }

    #[tokio::test]
    async fn test_open_existing_task() {
        let (_, manager) = manager();
        let mut editor = TaskEditor::with_form(monthly_form());
        manager.save(&mut editor).await.unwrap();

        let listed = manager.refresh().await.unwrap();
        let reopened = TaskEditor::from_task(&listed[0]);
        assert_eq!(reopened.phase(), TaskPhase::Saved);
        assert_eq!(reopened.id(), editor.id());
        assert!(manager.run(&reopened).await.is_ok());
    }
}
