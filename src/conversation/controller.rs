//! Conversation controller: message history and ask/confirm rounds.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use crate::agent::{AgentExchange, AgentReply, AgentRequest, AgentTransport, Message};
use crate::session::{ConversationId, SessionEvent, SessionStore, get_or_create_session_id};

use super::error::ConversationError;
use super::gate::{ConfirmationHandle, PENDING_WRITE_WARNING, PendingWriteGate};

/// Observable controller state.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ControllerState {
    /// Ready for a question.
    Idle,
    /// An exchange is in flight; input is disabled.
    Asking,
    /// Last exchange completed with an answer.
    Answered,
    /// Last exchange proposed a write awaiting confirmation.
    PendingConfirmation,
}

/// A proposed write surfaced to the user.
#[derive(Clone, Debug)]
pub struct PendingProposal {
    /// Answer accompanying the proposal, rendered first.
    pub reply: AgentReply,
    /// Warning rendered after the answer.
    pub warning: &'static str,
    /// Confirmation affordance.
    pub handle: ConfirmationHandle,
}

/// Result of [`ConversationController::ask`].
#[derive(Clone, Debug)]
pub enum AskOutcome {
    /// Empty or whitespace-only question; nothing was sent.
    Ignored,
    /// The agent answered.
    Answered(AgentReply),
    /// The agent answered and proposed a write.
    PendingConfirmation(PendingProposal),
}

struct Inner {
    state: ControllerState,
    history: Vec<Message>,
    pending: Option<ConfirmationHandle>,
    /// Bumped when the user session ends; a round begun under an older
    /// session must not touch the new one.
    session: u64,
}

fn lock(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Marks the controller busy for one round trip.
///
/// Dropped without [`InFlight::finish`] (the round failed or the caller's
/// future was cancelled), it puts the controller back to `Idle` so input is
/// never left disabled.
struct InFlight<'a> {
    inner: &'a Mutex<Inner>,
    session: u64,
    finished: bool,
}

impl<'a> InFlight<'a> {
    fn begin(inner: &'a Mutex<Inner>, guard: &mut MutexGuard<'_, Inner>) -> Self {
        guard.state = ControllerState::Asking;
        Self {
            inner,
            session: guard.session,
            finished: false,
        }
    }

    /// Apply a completed round, unless the session ended while it was in flight.
    fn finish<R>(mut self, apply: impl FnOnce(&mut Inner) -> R) -> Result<R, ConversationError> {
        self.finished = true;
        let mut guard = lock(self.inner);
        if guard.session != self.session {
            tracing::info!("Discarding a reply that arrived after the session ended");
            guard.state = ControllerState::Idle;
            return Err(ConversationError::SessionEnded);
        }
        Ok(apply(&mut guard))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.finished {
            let mut inner = lock(self.inner);
            if inner.state == ControllerState::Asking {
                inner.state = ControllerState::Idle;
            }
        }
    }
}

/// Owns one conversation with the agent.
///
/// Methods take `&self` so UI callbacks can share the controller; at most one
/// exchange is in flight at a time and a concurrent `ask` or `confirm` is
/// rejected with [`ConversationError::Busy`].
pub struct ConversationController {
    transport: Arc<dyn AgentTransport>,
    gate: PendingWriteGate,
    conversation_id: ConversationId,
    inner: Mutex<Inner>,
}

impl ConversationController {
    /// Create a controller for an existing conversation id.
    #[must_use]
    pub fn new(transport: Arc<dyn AgentTransport>, conversation_id: ConversationId) -> Self {
        let gate = PendingWriteGate::new(Arc::clone(&transport));
        Self {
            transport,
            gate,
            conversation_id,
            inner: Mutex::new(Inner {
                state: ControllerState::Idle,
                history: Vec::new(),
                pending: None,
                session: 0,
            }),
        }
    }

    /// Create a controller using the conversation id persisted in `store`.
    pub async fn start(transport: Arc<dyn AgentTransport>, store: &dyn SessionStore) -> Self {
        let conversation_id = get_or_create_session_id(store).await;
        Self::new(transport, conversation_id)
    }

    /// Conversation identity sent with each exchange.
    #[must_use]
    pub const fn conversation_id(&self) -> &ConversationId {
        &self.conversation_id
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> ControllerState {
        lock(&self.inner).state
    }

    /// Whether input should be disabled.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.state() == ControllerState::Asking
    }

    /// Copy of the history, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<Message> {
        lock(&self.inner).history.clone()
    }

    /// The outstanding proposal, if any.
    #[must_use]
    pub fn pending_confirmation(&self) -> Option<ConfirmationHandle> {
        lock(&self.inner).pending.clone()
    }

    /// Ask the agent a question.
    ///
    /// Whitespace-only input is ignored without a round trip. A new question
    /// abandons any outstanding proposal. On success the history grows by
    /// exactly two entries.
    ///
    /// # Errors
    /// Returns [`ConversationError::Busy`] while another exchange is in flight,
    /// [`ConversationError::SessionEnded`] if the user logged out before the reply
    /// arrived, or the transport error. In the last two cases the controller
    /// returns to `Idle` and the history is unchanged.
    pub async fn ask(&self, question: &str) -> Result<AskOutcome, ConversationError> {
        let question = question.trim();
        if question.is_empty() {
            return Ok(AskOutcome::Ignored);
        }

        let (request, flight) = {
            let mut inner = lock(&self.inner);
            if inner.state == ControllerState::Asking {
                return Err(ConversationError::Busy);
            }
            if let Some(previous) = inner.pending.take() {
                previous.abandon();
            }
            let request = AgentRequest::new(
                question,
                inner.history.clone(),
                self.conversation_id.clone(),
            );
            let flight = InFlight::begin(&self.inner, &mut inner);
            (request, flight)
        };

        tracing::debug!(conversation = %self.conversation_id, "Asking agent");
        match self.transport.send(&request).await {
            Ok(exchange) => flight.finish(|inner| self.apply_answer(inner, &request, exchange)),
            Err(e) => {
                tracing::warn!(conversation = %self.conversation_id, "Agent exchange failed: {e}");
                drop(flight);
                Err(ConversationError::Transport(e))
            }
        }
    }

    fn apply_answer(&self, inner: &mut Inner, request: &AgentRequest, exchange: AgentExchange) -> AskOutcome {
        record_round(&mut inner.history, &request.question, &exchange.reply);
        match self.gate.propose(request, &exchange) {
            Some(handle) => {
                inner.state = ControllerState::PendingConfirmation;
                inner.pending = Some(handle.clone());
                AskOutcome::PendingConfirmation(PendingProposal {
                    reply: exchange.reply,
                    warning: PENDING_WRITE_WARNING,
                    handle,
                })
            }
            None => {
                inner.state = ControllerState::Answered;
                AskOutcome::Answered(exchange.reply)
            }
        }
    }

    /// Confirm the outstanding proposal.
    ///
    /// The proposal is consumed before the round trip starts; the confirmation
    /// replays the question and history that produced it, not the current history.
    ///
    /// # Errors
    /// Returns [`ConversationError::NothingPending`] when there is no proposal,
    /// [`ConversationError::Busy`] while another exchange is in flight,
    /// [`ConversationError::SessionEnded`] if the user logged out before the reply
    /// arrived, the gate error if the handle was already used, or the transport error.
    pub async fn confirm_pending(&self) -> Result<AgentReply, ConversationError> {
        let (handle, flight) = {
            let mut inner = lock(&self.inner);
            if inner.state == ControllerState::Asking {
                return Err(ConversationError::Busy);
            }
            let handle = inner.pending.take().ok_or(ConversationError::NothingPending)?;
            let flight = InFlight::begin(&self.inner, &mut inner);
            (handle, flight)
        };

        match handle.confirm().await {
            Ok(exchange) => {
                let question = handle.request().question.clone();
                tracing::info!(conversation = %self.conversation_id, "Pending write confirmed");
                flight.finish(|inner| {
                    record_round(&mut inner.history, &question, &exchange.reply);
                    inner.state = ControllerState::Answered;
                    exchange.reply
                })
            }
            Err(e) => {
                tracing::warn!(conversation = %self.conversation_id, "Confirmation failed: {e}");
                drop(flight);
                Err(ConversationError::Gate(e))
            }
        }
    }

    /// React to a login/logout transition.
    ///
    /// `Ended` clears the history and abandons any proposal. A round still in
    /// flight keeps the controller busy until it resolves, and its reply is
    /// then discarded.
    pub fn handle_session_event(&self, event: &SessionEvent) {
        let mut inner = lock(&self.inner);
        match event {
            SessionEvent::Started { user } => {
                tracing::debug!(?user, "Session started");
                if inner.state == ControllerState::Answered {
                    inner.state = ControllerState::Idle;
                }
            }
            SessionEvent::Ended => {
                tracing::info!(conversation = %self.conversation_id, "Session ended, clearing conversation");
                inner.session = inner.session.wrapping_add(1);
                if let Some(pending) = inner.pending.take() {
                    pending.abandon();
                }
                inner.history.clear();
                if inner.state != ControllerState::Asking {
                    inner.state = ControllerState::Idle;
                }
            }
        }
    }

    /// Apply session events from `events` until the channel closes.
    #[must_use]
    pub fn listen(self: Arc<Self>, mut events: broadcast::Receiver<SessionEvent>) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => self.handle_session_event(&event),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!("Missed {skipped} session events");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }
}

fn record_round(history: &mut Vec<Message>, question: &str, reply: &AgentReply) {
    history.push(Message::user(question));
    history.push(Message::assistant(reply.history_text()));
}
