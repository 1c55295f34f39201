//! Request/response primitive to the assistant endpoint.

use std::future::Future;
use std::pin::Pin;

use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use url::Url;
use uuid::Uuid;

use crate::config::AssistantConfig;

use super::error::TransportError;
use super::types::{AgentExchange, AgentRequest, AgentResponseBody};

/// Boxed future type for transport operations.
pub type TransportFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Header carrying the per-request correlation id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// One round trip to the agent.
///
/// Implementations never touch conversation history; the caller owns it.
pub trait AgentTransport: Send + Sync {
    /// Send `request` and decode the answer.
    ///
    /// # Errors
    /// Returns an error on network failure, non-success status or an undecodable body.
    fn send(&self, request: &AgentRequest) -> TransportFuture<'_, Result<AgentExchange, TransportError>>;
}

/// Build the HTTP client shared by the agent transport and the task service.
///
/// The cookie store carries the platform's authentication cookie.
pub(crate) fn build_http_client(config: &AssistantConfig) -> Result<reqwest::Client, TransportError> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

    reqwest::Client::builder()
        .default_headers(headers)
        .timeout(config.request_timeout)
        .connect_timeout(config.connect_timeout)
        .cookie_store(true)
        .gzip(true)
        .brotli(true)
        .deflate(true)
        .build()
        .map_err(|e| TransportError::HttpClient(e.to_string()))
}

fn status_error(status: reqwest::StatusCode, body: &[u8]) -> TransportError {
    // Servers usually still send `{"error": "..."}` on failure.
    let message = serde_json::from_slice::<AgentResponseBody>(body)
        .ok()
        .and_then(|body| body.error)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());
    TransportError::Status {
        status: status.as_u16(),
        message,
    }
}

/// Turn a response into `T`, mapping non-success statuses to [`TransportError::Status`].
pub(crate) async fn decode_json<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, TransportError> {
    let status = response.status();
    let bytes = response.bytes().await?;

    if !status.is_success() {
        return Err(status_error(status, &bytes));
    }

    serde_json::from_slice(&bytes).map_err(|e| TransportError::Decode(e.to_string()))
}

/// Like [`decode_json`] for endpoints whose body is irrelevant (possibly empty).
pub(crate) async fn ensure_success(response: reqwest::Response) -> Result<(), TransportError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let bytes = response.bytes().await?;
    Err(status_error(status, &bytes))
}

/// JSON-over-HTTP transport to the platform's agent endpoint.
#[derive(Clone, Debug)]
pub struct HttpAgentTransport {
    client: reqwest::Client,
    endpoint: Url,
    history_limit: Option<usize>,
}

impl HttpAgentTransport {
    /// Create a transport from configuration.
    ///
    /// # Errors
    /// Returns an error if the endpoint URL is invalid or the HTTP client cannot be built.
    pub fn new(config: &AssistantConfig) -> Result<Self, TransportError> {
        let client = build_http_client(config)?;
        Ok(Self::with_client(client, config.agent_url()?, config.history_limit))
    }

    /// Create a transport reusing an existing client.
    #[must_use]
    pub const fn with_client(client: reqwest::Client, endpoint: Url, history_limit: Option<usize>) -> Self {
        Self {
            client,
            endpoint,
            history_limit,
        }
    }

    /// Endpoint this transport posts to.
    #[must_use]
    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl AgentTransport for HttpAgentTransport {
    fn send(&self, request: &AgentRequest) -> TransportFuture<'_, Result<AgentExchange, TransportError>> {
        let body = request.with_history_limit(self.history_limit);
        Box::pin(async move {
            let request_id = Uuid::new_v4();
            tracing::debug!(
                %request_id,
                conversation = %body.conversation_id,
                history = body.history.len(),
                confirm = body.confirm,
                "Sending agent exchange"
            );

            let response = self
                .client
                .post(self.endpoint.clone())
                .header(REQUEST_ID_HEADER, request_id.to_string())
                .json(&body)
                .send()
                .await
                .inspect_err(|e| tracing::warn!(%request_id, "Agent request failed: {e}"))?;

            let decoded: AgentResponseBody = decode_json(response).await?;
            let exchange = AgentExchange::from(decoded);
            tracing::debug!(
                %request_id,
                pending_write = exchange.pending_write.is_some(),
                "Agent exchange completed"
            );
            Ok(exchange)
        })
    }
}
