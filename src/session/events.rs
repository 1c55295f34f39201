//! Session lifecycle events raised by the authentication layer.

use tokio::sync::broadcast;

/// Default capacity of the session event channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Login/logout transitions the conversation core reacts to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    /// A user session started (login, or a page restored with a live session).
    Started {
        /// Authenticated user name, when known.
        user: Option<String>,
    },
    /// The user session ended (logout or expiry).
    Ended,
}

/// Sending side of the session event channel, held by the auth collaborator.
#[derive(Clone, Debug)]
pub struct SessionEvents {
    sender: broadcast::Sender<SessionEvent>,
}

impl Default for SessionEvents {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionEvents {
    /// Create a channel with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Subscribe to future events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    /// Publish an event; returns how many subscribers received it.
    #[allow(clippy::must_use_candidate)]
    pub fn publish(&self, event: SessionEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }
}
