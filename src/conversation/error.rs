//! Error types for the conversation controller.

use thiserror::Error;

use crate::agent::TransportError;

use super::gate::GateError;

/// Errors surfaced by [`super::ConversationController`].
#[derive(Debug, Error)]
pub enum ConversationError {
    /// Another exchange is in flight; input is disabled until it completes.
    #[error("an exchange is already in progress")]
    Busy,
    /// Confirm was requested with no outstanding proposal.
    #[error("there is no action awaiting confirmation")]
    NothingPending,
    /// The user session ended while the exchange was in flight; its reply was dropped.
    #[error("the session ended before the reply arrived")]
    SessionEnded,
    /// The round trip failed; render this in place of an answer.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// The confirmation could not be sent.
    #[error(transparent)]
    Gate(#[from] GateError),
}
