//! Pending-write gate.
//!
//! A mutation proposed by the agent runs only after one explicit confirmation,
//! and that confirmation replays exactly the request that produced the
//! proposal. The handle flips to `Confirmed` before the network call starts,
//! so a slow response cannot be raced into a second submission.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use thiserror::Error;

use crate::agent::{AgentExchange, AgentRequest, AgentTransport, PendingWrite, TransportError};

/// Warning shown alongside every proposed write.
pub const PENDING_WRITE_WARNING: &str =
    "The assistant wants to modify the database. Review the statement and confirm to execute it.";

const PROPOSED: u8 = 0;
const CONFIRMED: u8 = 1;
const ABANDONED: u8 = 2;

/// Lifecycle of a proposal.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ConfirmationState {
    /// Awaiting the user's decision.
    Proposed,
    /// Confirmation sent (or in flight). Terminal.
    Confirmed,
    /// Superseded or dropped without confirming. Terminal.
    Abandoned,
}

/// Errors returned by [`ConfirmationHandle::confirm`].
#[derive(Debug, Error)]
pub enum GateError {
    /// The proposal was already confirmed; nothing was sent.
    #[error("this action was already confirmed")]
    AlreadyConfirmed,
    /// The proposal was abandoned; nothing was sent.
    #[error("this action is no longer pending")]
    Abandoned,
    /// The confirmation round trip failed. The proposal stays consumed.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

struct Proposal {
    transport: Arc<dyn AgentTransport>,
    request: AgentRequest,
    pending: PendingWrite,
    state: AtomicU8,
}

/// Single-use confirmation of one proposed write.
///
/// Clones share state: confirming through any clone consumes them all.
#[derive(Clone)]
pub struct ConfirmationHandle {
    inner: Arc<Proposal>,
}

impl std::fmt::Debug for ConfirmationHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfirmationHandle")
            .field("question", &self.inner.request.question)
            .field("sql", &self.inner.pending.sql)
            .field("state", &self.state())
            .finish()
    }
}

impl ConfirmationHandle {
    /// Current state.
    #[must_use]
    pub fn state(&self) -> ConfirmationState {
        match self.inner.state.load(Ordering::Acquire) {
            PROPOSED => ConfirmationState::Proposed,
            CONFIRMED => ConfirmationState::Confirmed,
            _ => ConfirmationState::Abandoned,
        }
    }

    /// Whether the confirm affordance should still be offered.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.state() == ConfirmationState::Proposed
    }

    /// SQL the agent proposed, for display.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.inner.pending.sql
    }

    /// The request that produced the proposal; replayed verbatim on confirm.
    #[must_use]
    pub fn request(&self) -> &AgentRequest {
        &self.inner.request
    }

    /// Abandon the proposal. No-op once confirmed.
    pub fn abandon(&self) {
        let _ = self.inner.state.compare_exchange(
            PROPOSED,
            ABANDONED,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    /// Send the confirmation. Succeeds in sending at most once per proposal.
    ///
    /// # Errors
    /// Returns [`GateError::AlreadyConfirmed`] or [`GateError::Abandoned`] without any
    /// network call when the proposal is no longer pending, or the transport error
    /// of the single confirmation round trip.
    pub async fn confirm(&self) -> Result<AgentExchange, GateError> {
        match self.inner.state.compare_exchange(
            PROPOSED,
            CONFIRMED,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => {}
            Err(CONFIRMED) => return Err(GateError::AlreadyConfirmed),
            Err(_) => return Err(GateError::Abandoned),
        }

        tracing::info!(
            conversation = %self.inner.request.conversation_id,
            "Confirming pending write"
        );
        let request = self.inner.request.confirmed();
        Ok(self.inner.transport.send(&request).await?)
    }
}

/// Wraps agent-proposed mutations into single-use confirmation handles.
#[derive(Clone)]
pub struct PendingWriteGate {
    transport: Arc<dyn AgentTransport>,
}

impl PendingWriteGate {
    /// Create a gate sending confirmations through `transport`.
    #[must_use]
    pub const fn new(transport: Arc<dyn AgentTransport>) -> Self {
        Self { transport }
    }

    /// Open a confirmation for `exchange` if it proposes a write.
    ///
    /// `request` must be the request that produced `exchange`; it is what the
    /// confirmation will replay.
    #[must_use]
    pub fn propose(&self, request: &AgentRequest, exchange: &AgentExchange) -> Option<ConfirmationHandle> {
        let pending = exchange.pending_write.clone()?;
        tracing::debug!(sql = %pending.sql, "Agent proposed a write");
        Some(ConfirmationHandle {
            inner: Arc::new(Proposal {
                transport: Arc::clone(&self.transport),
                request: request.clone(),
                pending,
                state: AtomicU8::new(PROPOSED),
            }),
        })
    }
}
