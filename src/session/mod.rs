//! Conversation identity for one browser profile.
//!
//! - `ids`: the `ConversationId` newtype and its generator
//! - `store`: key/value session storage (memory or `SQLite`) and `get_or_create_session_id`
//! - `events`: login/logout notifications the conversation core subscribes to

pub mod events;
pub mod ids;
pub mod store;

pub use events::{SessionEvent, SessionEvents};
pub use ids::{ConversationId, ConversationIdError};
pub use store::{
    CONVERSATION_ID_KEY, InMemorySessionStore, SessionStore, SqliteSessionStore, StoreError,
    StoreFuture, StoreResult, get_or_create_session_id,
};
