//! Agent transport.
//!
//! One request/response primitive to the assistant endpoint. The response's
//! loosely-typed shape (`answer` / `answerHtml` / `error` / `pendingWrite`) is
//! decoded here, once, into [`AgentExchange`].

pub mod error;
pub mod transport;
pub mod types;

pub use error::TransportError;
pub use transport::{AgentTransport, HttpAgentTransport, REQUEST_ID_HEADER, TransportFuture};
pub use types::{
    AgentExchange, AgentReply, AgentRequest, AgentResponseBody, Message, NO_ANSWER_SENTINEL,
    PendingWrite, RICH_CONTENT_SENTINEL, Role,
};
