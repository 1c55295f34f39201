//! Scripted fakes of the external collaborators, for unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::agent::{AgentExchange, AgentRequest, AgentTransport, TransportError, TransportFuture};
use crate::tasks::{
    PreviewResult, RunResult, SaveReceipt, ScheduledTask, TaskId, TaskPayload, TaskService,
};

enum Scripted {
    Ok(AgentExchange),
    Status(u16, String),
}

/// Agent transport answering from a queue and recording every request.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<AgentRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_ok(&self, exchange: AgentExchange) {
        self.replies.lock().unwrap().push_back(Scripted::Ok(exchange));
    }

    pub fn push_status(&self, status: u16, message: &str) {
        self.replies
            .lock()
            .unwrap()
            .push_back(Scripted::Status(status, message.to_string()));
    }

    pub fn requests(&self) -> Vec<AgentRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn confirm_count(&self) -> usize {
        self.requests.lock().unwrap().iter().filter(|r| r.confirm).count()
    }
}

impl AgentTransport for ScriptedTransport {
    fn send(&self, request: &AgentRequest) -> TransportFuture<'_, Result<AgentExchange, TransportError>> {
        self.requests.lock().unwrap().push(request.clone());
        let next = self.replies.lock().unwrap().pop_front();
        Box::pin(async move {
            // Let other futures run, like a real network call would.
            tokio::task::yield_now().await;
            match next {
                Some(Scripted::Ok(exchange)) => Ok(exchange),
                Some(Scripted::Status(status, message)) => {
                    Err(TransportError::Status { status, message })
                }
                None => Err(TransportError::Status {
                    status: 500,
                    message: "no scripted reply".to_string(),
                }),
            }
        })
    }
}

/// In-memory task service that behaves like the platform.
#[derive(Default)]
pub struct FakeTaskService {
    tasks: Mutex<Vec<ScheduledTask>>,
    next_id: Mutex<i64>,
    pub saves: Mutex<Vec<TaskPayload>>,
    pub runs: Mutex<Vec<TaskId>>,
    pub toggles: Mutex<Vec<(TaskId, bool)>>,
    pub list_calls: Mutex<usize>,
    pub previews: Mutex<usize>,
    pub fail_next: Mutex<bool>,
}

impl FakeTaskService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next_call(&self) {
        *self.fail_next.lock().unwrap() = true;
    }

    fn check_failure(&self) -> Result<(), TransportError> {
        if std::mem::take(&mut *self.fail_next.lock().unwrap()) {
            return Err(TransportError::Status {
                status: 503,
                message: "service unavailable".to_string(),
            });
        }
        Ok(())
    }

    pub fn run_count(&self) -> usize {
        self.runs.lock().unwrap().len()
    }

    pub fn save_count(&self) -> usize {
        self.saves.lock().unwrap().len()
    }
}

impl TaskService for FakeTaskService {
    fn preview(
        &self,
        question: &str,
        sql_override: Option<&str>,
    ) -> TransportFuture<'_, Result<PreviewResult, TransportError>> {
        let result = self.check_failure().map(|()| {
            *self.previews.lock().unwrap() += 1;
            PreviewResult {
                answer: Some(format!("preview of: {question}")),
                answer_html: None,
                used_sql: Some(
                    sql_override
                        .map_or_else(|| "SELECT 1".to_string(), ToString::to_string),
                ),
                row_count: Some(1),
            }
        });
        Box::pin(async move { result })
    }

    fn save(&self, payload: &TaskPayload) -> TransportFuture<'_, Result<SaveReceipt, TransportError>> {
        let result = self.check_failure().map(|()| {
            self.saves.lock().unwrap().push(payload.clone());
            let id = payload.id.unwrap_or_else(|| {
                let mut next = self.next_id.lock().unwrap();
                *next += 1;
                TaskId(*next)
            });
            let canonical = payload.cron.clone();
            let record = ScheduledTask {
                id,
                form: payload.form.clone(),
                recurrence_canonical: Some(canonical.clone()),
                last_run_at: None,
                last_status: None,
            };
            {
                let mut tasks = self.tasks.lock().unwrap();
                tasks.retain(|t| t.id != id);
                tasks.push(record);
            }
            SaveReceipt {
                id,
                recurrence_canonical: Some(canonical),
            }
        });
        Box::pin(async move { result })
    }

    fn run(&self, id: TaskId) -> TransportFuture<'_, Result<RunResult, TransportError>> {
        let result = self.check_failure().map(|()| {
            self.runs.lock().unwrap().push(id);
            RunResult {
                message: format!("task {id} executed"),
            }
        });
        Box::pin(async move { result })
    }

    fn list(&self) -> TransportFuture<'_, Result<Vec<ScheduledTask>, TransportError>> {
        let result = self.check_failure().map(|()| {
            *self.list_calls.lock().unwrap() += 1;
            self.tasks.lock().unwrap().clone()
        });
        Box::pin(async move { result })
    }

    fn toggle(&self, id: TaskId, is_enabled: bool) -> TransportFuture<'_, Result<(), TransportError>> {
        let result = self.check_failure().map(|()| {
            self.toggles.lock().unwrap().push((id, is_enabled));
            let mut tasks = self.tasks.lock().unwrap();
            for task in tasks.iter_mut().filter(|t| t.id == id) {
                task.form.is_enabled = is_enabled;
            }
        });
        Box::pin(async move { result })
    }

    fn delete(&self, id: TaskId) -> TransportFuture<'_, Result<(), TransportError>> {
        let result = self.check_failure().map(|()| {
            self.tasks.lock().unwrap().retain(|t| t.id != id);
        });
        Box::pin(async move { result })
    }
}
