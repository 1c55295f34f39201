//! Conversation identity.

use core::fmt;
use core::str::FromStr;

use chrono::Utc;
use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::{Deserialize, Serialize};

/// Length of the random suffix.
const SUFFIX_LEN: usize = 10;

/// Prefix marking generated conversation ids.
const PREFIX: &str = "conv";

/// Errors returned when parsing a [`ConversationId`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationIdError {
    /// Empty (or whitespace-only) identifier.
    Empty,
    /// Contains a character outside `[A-Za-z0-9_-]`.
    InvalidChar {
        /// The invalid character.
        ch: char,
        /// The index where it was found.
        index: usize,
    },
}

impl fmt::Display for ConversationIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "conversation id must not be empty"),
            Self::InvalidChar { ch, index } => {
                write!(
                    f,
                    "conversation id contains invalid character {ch:?} at index {index}"
                )
            }
        }
    }
}

impl std::error::Error for ConversationIdError {}

/// Opaque, tab-scoped conversation identifier sent with every agent exchange.
///
/// Generated ids look like `conv_1718000000000_k3j9x0a1bq`: a millisecond
/// timestamp prefix keeps them roughly ordered, the random suffix keeps two
/// profiles starting in the same millisecond apart.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    /// Generate a fresh identifier.
    #[must_use]
    pub fn generate() -> Self {
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(SUFFIX_LEN)
            .map(|b| char::from(b).to_ascii_lowercase())
            .collect();
        Self(format!(
            "{PREFIX}_{}_{suffix}",
            Utc::now().timestamp_millis()
        ))
    }

    /// Wrap a stored identifier after checking it.
    ///
    /// # Errors
    /// Returns an error if the value is empty or has characters outside `[A-Za-z0-9_-]`.
    pub fn parse(raw: impl AsRef<str>) -> Result<Self, ConversationIdError> {
        let s = raw.as_ref().trim();
        if s.is_empty() {
            return Err(ConversationIdError::Empty);
        }
        for (index, ch) in s.chars().enumerate() {
            if !(ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-')) {
                return Err(ConversationIdError::InvalidChar { ch, index });
            }
        }
        Ok(Self(s.to_owned()))
    }

    /// Borrow as `&str`.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ConversationId {
    type Err = ConversationIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for ConversationId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}
