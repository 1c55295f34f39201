//! Startup helpers for the interactive assistant console.
//!
//! Plain lines are questions for the agent. Commands:
//! `/confirm`, `/history`, `/tasks`, `/run <id>`, `/logout`, `/quit`.

use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::agent::transport::build_http_client;
use crate::agent::{AgentTransport, HttpAgentTransport, TransportError};
use crate::config::{AssistantConfig, ConfigError};
use crate::conversation::{AskOutcome, ConversationController};
use crate::session::{InMemorySessionStore, SessionEvent, SessionEvents, SessionStore, SqliteSessionStore};
use crate::tasks::{HttpTaskService, TaskAdminRegistry, TaskId};

/// Failures that stop the console.
#[derive(Debug, Error)]
pub enum StartupError {
    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// HTTP client could not be built.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// Console I/O failed.
    #[error("console I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// One console input line.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Command {
    /// Ask the agent.
    Ask(String),
    /// Confirm the pending write.
    Confirm,
    /// Print the conversation history.
    History,
    /// List scheduled tasks.
    Tasks,
    /// Run a scheduled task now.
    Run(TaskId),
    /// End the session.
    Logout,
    /// Leave the console.
    Quit,
    /// Unrecognized `/` command.
    Unknown(String),
}

impl Command {
    /// Parse a trimmed input line.
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let Some(rest) = line.strip_prefix('/') else {
            return Self::Ask(line.to_string());
        };
        let (name, arg) = rest.split_once(' ').unwrap_or((rest, ""));
        match (name, arg.trim()) {
            ("confirm", "") => Self::Confirm,
            ("history", "") => Self::History,
            ("tasks", "") => Self::Tasks,
            ("run", id) => id.parse().map_or_else(|_| Self::Unknown(line.to_string()), Self::Run),
            ("logout", "") => Self::Logout,
            ("quit" | "exit", "") => Self::Quit,
            _ => Self::Unknown(line.to_string()),
        }
    }
}

/// Run the console (used by the `meatflow_assistant` binary).
///
/// # Returns
/// `ExitCode::SUCCESS` on `/quit` or end of input, `1` on startup failure.
#[must_use]
pub fn run() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting meatflow assistant v{}", env!("CARGO_PKG_VERSION"));

    let config = AssistantConfig::from_env();
    if let Err(e) = config.validate() {
        tracing::error!("Invalid configuration: {e}");
        return ExitCode::from(1);
    }
    tracing::info!("Platform endpoint: {}", config.base_url);

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to create runtime: {e}");
            return ExitCode::from(1);
        }
    };

    if let Err(e) = rt.block_on(run_console(&config)) {
        tracing::error!("Console error: {e}");
        return ExitCode::from(1);
    }

    ExitCode::SUCCESS
}

/// Open the configured session store, falling back to memory if `SQLite` is unavailable.
pub async fn open_session_store(config: &AssistantConfig) -> Arc<dyn SessionStore> {
    let Some(path) = &config.session_db_path else {
        return Arc::new(InMemorySessionStore::new());
    };
    match SqliteSessionStore::open(path).await {
        Ok(store) => Arc::new(store),
        Err(e) => {
            tracing::warn!("Session database {} unavailable, using memory: {e}", path.display());
            Arc::new(InMemorySessionStore::new())
        }
    }
}

/// Wire the collaborators together and serve stdin until `/quit` or EOF.
///
/// # Errors
/// Returns an error if the endpoints are invalid, the HTTP client cannot be
/// built, or the console cannot be read or written.
pub async fn run_console(config: &AssistantConfig) -> Result<(), StartupError> {
    // One client, so the agent and task endpoints share the auth cookie.
    let client = build_http_client(config)?;
    let transport: Arc<dyn AgentTransport> = Arc::new(HttpAgentTransport::with_client(
        client.clone(),
        config.agent_url()?,
        config.history_limit,
    ));
    let registry = TaskAdminRegistry::new(Arc::new(HttpTaskService::with_client(
        client,
        config.tasks_url()?,
    )));

    let store = open_session_store(config).await;
    let controller = Arc::new(ConversationController::start(transport, store.as_ref()).await);
    tracing::info!(conversation = %controller.conversation_id(), "Conversation ready");

    let events = SessionEvents::new();
    let listener = Arc::clone(&controller).listen(events.subscribe());
    events.publish(SessionEvent::Started { user: None });

    let mut out = std::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match Command::parse(&line) {
            Command::Quit => break,
            Command::Logout => {
                events.publish(SessionEvent::Ended);
                writeln!(out, "Session ended.")?;
            }
            command => execute(&command, &controller, &registry, &mut out).await?,
        }
    }

    listener.abort();
    Ok(())
}

async fn execute(
    command: &Command,
    controller: &ConversationController,
    registry: &TaskAdminRegistry,
    out: &mut (impl Write + Send),
) -> std::io::Result<()> {
    match command {
        Command::Ask(question) => match controller.ask(question).await {
            Ok(AskOutcome::Ignored) => {}
            Ok(AskOutcome::Answered(reply)) => writeln!(out, "{}", reply.display())?,
            Ok(AskOutcome::PendingConfirmation(proposal)) => {
                writeln!(out, "{}", proposal.reply.display())?;
                writeln!(out, "! {}", proposal.warning)?;
                writeln!(out, "  {}", proposal.handle.sql())?;
                writeln!(out, "Type /confirm to execute.")?;
            }
            Err(e) => writeln!(out, "error: {e}")?,
        },
        Command::Confirm => match controller.confirm_pending().await {
            Ok(reply) => writeln!(out, "{}", reply.display())?,
            Err(e) => writeln!(out, "error: {e}")?,
        },
        Command::History => {
            for message in controller.history() {
                writeln!(out, "[{}] {}", message.role.as_str(), message.content)?;
            }
        }
        Command::Tasks => match registry.list().await {
            Ok(tasks) => {
                for task in tasks {
                    writeln!(
                        out,
                        "#{} {} [{}] {}{}",
                        task.id,
                        task.form.name,
                        task.form.schedule_kind,
                        task.recurrence_canonical.as_deref().unwrap_or("-"),
                        if task.form.is_enabled { "" } else { " (disabled)" }
                    )?;
                }
            }
            Err(e) => writeln!(out, "error: {e}")?,
        },
        Command::Run(id) => match registry.run(*id).await {
            Ok(result) => writeln!(out, "{}", result.message)?,
            Err(e) => writeln!(out, "error: {e}")?,
        },
        Command::Unknown(line) => writeln!(out, "unknown command: {line}")?,
        Command::Logout | Command::Quit => {}
    }
    out.flush()
}
