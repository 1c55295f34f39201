//! Task management endpoints.

use serde::Serialize;
use url::Url;

use crate::agent::transport::{build_http_client, decode_json, ensure_success};
use crate::agent::{TransportError, TransportFuture};
use crate::config::AssistantConfig;

use super::types::{PreviewResult, RunResult, SaveReceipt, ScheduledTask, TaskId, TaskPayload};

/// Persistence and execution contract of the platform's task service.
///
/// Each call is one round trip. Nothing here tracks form state.
pub trait TaskService: Send + Sync {
    /// Dry-run `question` in read-only mode.
    fn preview(
        &self,
        question: &str,
        sql_override: Option<&str>,
    ) -> TransportFuture<'_, Result<PreviewResult, TransportError>>;

    /// Create or update a task.
    fn save(&self, payload: &TaskPayload) -> TransportFuture<'_, Result<SaveReceipt, TransportError>>;

    /// Execute a saved task now.
    fn run(&self, id: TaskId) -> TransportFuture<'_, Result<RunResult, TransportError>>;

    /// All persisted tasks.
    fn list(&self) -> TransportFuture<'_, Result<Vec<ScheduledTask>, TransportError>>;

    /// Persist only the enabled flag.
    fn toggle(&self, id: TaskId, is_enabled: bool) -> TransportFuture<'_, Result<(), TransportError>>;

    /// Remove a task.
    fn delete(&self, id: TaskId) -> TransportFuture<'_, Result<(), TransportError>>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PreviewBody {
    question: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sql_override: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ToggleBody {
    is_enabled: bool,
}

/// reqwest client for the task endpoints under `tasks_path`.
#[derive(Clone, Debug)]
pub struct HttpTaskService {
    client: reqwest::Client,
    base: Url,
}

impl HttpTaskService {
    /// Create a service from configuration.
    ///
    /// # Errors
    /// Returns an error if the tasks URL is invalid or the HTTP client cannot be built.
    pub fn new(config: &AssistantConfig) -> Result<Self, TransportError> {
        let client = build_http_client(config)?;
        Ok(Self::with_client(client, config.tasks_url()?))
    }

    /// Create a service reusing an existing client (and its cookies).
    #[must_use]
    pub const fn with_client(client: reqwest::Client, base: Url) -> Self {
        Self { client, base }
    }

    /// Prefix every task route hangs off.
    #[must_use]
    pub const fn base(&self) -> &Url {
        &self.base
    }

    fn url(&self, segments: &[&str]) -> Result<Url, TransportError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| TransportError::Endpoint(format!("{} cannot carry a path", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

impl TaskService for HttpTaskService {
    fn preview(
        &self,
        question: &str,
        sql_override: Option<&str>,
    ) -> TransportFuture<'_, Result<PreviewResult, TransportError>> {
        let body = PreviewBody {
            question: question.to_string(),
            sql_override: sql_override.map(ToString::to_string),
        };
        Box::pin(async move {
            let url = self.url(&["preview"])?;
            tracing::debug!("Previewing task question");
            let response = self.client.post(url).json(&body).send().await?;
            decode_json(response).await
        })
    }

    fn save(&self, payload: &TaskPayload) -> TransportFuture<'_, Result<SaveReceipt, TransportError>> {
        let payload = payload.clone();
        Box::pin(async move {
            let url = self.url(&[])?;
            let response = self.client.post(url).json(&payload).send().await?;
            let receipt: SaveReceipt = decode_json(response).await?;
            tracing::info!(
                id = %receipt.id,
                canonical = receipt.recurrence_canonical.as_deref().unwrap_or("-"),
                "Task saved"
            );
            Ok(receipt)
        })
    }

    fn run(&self, id: TaskId) -> TransportFuture<'_, Result<RunResult, TransportError>> {
        Box::pin(async move {
            let id_segment = id.to_string();
            let url = self.url(&[id_segment.as_str(), "run"])?;
            tracing::info!(%id, "Running task");
            let response = self.client.post(url).send().await?;
            decode_json(response).await
        })
    }

    fn list(&self) -> TransportFuture<'_, Result<Vec<ScheduledTask>, TransportError>> {
        Box::pin(async move {
            let response = self.client.get(self.url(&[])?).send().await?;
            decode_json(response).await
        })
    }

    fn toggle(&self, id: TaskId, is_enabled: bool) -> TransportFuture<'_, Result<(), TransportError>> {
        Box::pin(async move {
            let id_segment = id.to_string();
            let url = self.url(&[id_segment.as_str(), "toggle"])?;
            tracing::info!(%id, is_enabled, "Toggling task");
            let response = self
                .client
                .post(url)
                .json(&ToggleBody { is_enabled })
                .send()
                .await?;
            ensure_success(response).await
        })
    }

    fn delete(&self, id: TaskId) -> TransportFuture<'_, Result<(), TransportError>> {
        Box::pin(async move {
            let id_segment = id.to_string();
            let url = self.url(&[id_segment.as_str()])?;
            tracing::info!(%id, "Deleting task");
            let response = self.client.delete(url).send().await?;
            ensure_success(response).await
        })
    }
}
