//! Configuration for the assistant client.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Environment variable for the platform base URL (e.g. "https://erp.example.com").
pub const BASE_URL_ENV: &str = "MEATFLOW_BASE_URL";
/// Environment variable for the durable session database path.
pub const SESSION_DB_ENV: &str = "MEATFLOW_SESSION_DB";
/// Environment variable capping the history entries sent per exchange.
pub const HISTORY_LIMIT_ENV: &str = "MEATFLOW_HISTORY_LIMIT";
/// Environment variable for the request timeout, in seconds.
pub const TIMEOUT_ENV: &str = "MEATFLOW_TIMEOUT_SECS";

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8080";

/// Errors raised by configuration validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A URL could not be parsed.
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// A value is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Client configuration shared by the agent transport and the task service.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AssistantConfig {
    /// Base URL of the ordering platform.
    pub base_url: String,
    /// Path of the agent exchange endpoint.
    pub agent_path: String,
    /// Path prefix of the task management endpoints.
    pub tasks_path: String,
    /// Request timeout.
    #[serde(with = "duration_serde")]
    pub request_timeout: Duration,
    /// Connection timeout.
    #[serde(with = "duration_serde")]
    pub connect_timeout: Duration,
    /// Maximum number of history entries sent with each exchange. `None` sends everything.
    pub history_limit: Option<usize>,
    /// Durable session store location. `None` keeps the session id in memory.
    pub session_db_path: Option<PathBuf>,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            agent_path: "/api/agent/ask".to_string(),
            tasks_path: "/api/agent/tasks".to_string(),
            // The agent may run a full NL-to-SQL pass before answering.
            request_timeout: Duration::from_secs(120),
            connect_timeout: Duration::from_secs(10),
            history_limit: None,
            session_db_path: None,
        }
    }
}

impl AssistantConfig {
    /// Create a new config with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a config from `MEATFLOW_*` environment variables over the defaults.
    ///
    /// Unparsable numeric values are ignored and the default is kept.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(base_url) = std::env::var(BASE_URL_ENV) {
            config.base_url = base_url;
        }
        if let Ok(path) = std::env::var(SESSION_DB_ENV) {
            config.session_db_path = Some(PathBuf::from(path));
        }
        if let Some(limit) = std::env::var(HISTORY_LIMIT_ENV)
            .ok()
            .and_then(|v| v.parse().ok())
        {
            config.history_limit = Some(limit);
        }
        if let Some(secs) = std::env::var(TIMEOUT_ENV)
            .ok()
            .and_then(|v| v.parse().ok())
        {
            config.request_timeout = Duration::from_secs(secs);
        }
        config
    }

    /// Set the platform base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Cap the history entries sent per exchange.
    #[must_use]
    pub const fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = Some(limit);
        self
    }

    /// Persist the session id in a `SQLite` file.
    #[must_use]
    pub fn with_session_db(mut self, path: impl Into<PathBuf>) -> Self {
        self.session_db_path = Some(path.into());
        self
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    /// Returns an error if a URL does not parse or a value is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.agent_url()?;
        self.tasks_url()?;
        if self.request_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "request_timeout must be > 0".to_string(),
            ));
        }
        if self.connect_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "connect_timeout must be > 0".to_string(),
            ));
        }
        if self.history_limit == Some(0) {
            return Err(ConfigError::Invalid(
                "history_limit must be > 0 when set".to_string(),
            ));
        }
        Ok(())
    }

    /// Full URL of the agent exchange endpoint.
    ///
    /// The path is resolved under the base URL's own path, so a platform
    /// mounted at `https://host/app` is reached at `/app/api/agent/ask`.
    ///
    /// # Errors
    /// Returns an error if the base URL or path does not form a valid URL.
    pub fn agent_url(&self) -> Result<Url, ConfigError> {
        endpoint(&self.base_url, &self.agent_path)
    }

    /// Full URL of the task management prefix, resolved like [`Self::agent_url`].
    ///
    /// # Errors
    /// Returns an error if the base URL or path does not form a valid URL.
    pub fn tasks_url(&self) -> Result<Url, ConfigError> {
        endpoint(&self.base_url, &self.tasks_path)
    }
}

/// Join `path` below the path of `base`, ignoring a leading slash.
fn endpoint(base: &str, path: &str) -> Result<Url, ConfigError> {
    let mut base = Url::parse(base)?;
    if !base.path().ends_with('/') {
        let dir = format!("{}/", base.path());
        base.set_path(&dir);
    }
    Ok(base.join(path.trim_start_matches('/'))?)
}

/// Serde module for Duration serialization.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
