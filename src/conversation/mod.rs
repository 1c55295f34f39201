//! Conversation with the agent.
//!
//! - `controller`: history and the `Idle -> Asking -> Answered | PendingConfirmation` rounds
//! - `gate`: single-use confirmation of agent-proposed writes

pub mod controller;
pub mod error;
pub mod gate;

pub use controller::{AskOutcome, ControllerState, ConversationController, PendingProposal};
pub use error::ConversationError;
pub use gate::{
    ConfirmationHandle, ConfirmationState, GateError, PENDING_WRITE_WARNING, PendingWriteGate,
};
