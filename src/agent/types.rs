//! Wire and domain types of an agent exchange.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::session::ConversationId;

/// History entry recorded in place of a rich (HTML) answer.
pub const RICH_CONTENT_SENTINEL: &str = "[answer rendered as rich content]";

/// History entry recorded when the agent returned nothing usable.
pub const NO_ANSWER_SENTINEL: &str = "[no answer]";

/// Author of a history entry.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// User question.
    User,
    /// Assistant answer.
    Assistant,
}

impl Role {
    /// Stable string form for the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            _ => Err(value.to_string()),
        }
    }
}

/// One entry of the conversation history replayed to the agent.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Author.
    pub role: Role,
    /// Text content; always plain text.
    pub content: String,
}

impl Message {
    /// Build a user entry.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Build an assistant entry.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A single request to the agent endpoint.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRequest {
    /// Natural-language question; non-empty.
    pub question: String,
    /// History at the time of asking, oldest first.
    pub history: Vec<Message>,
    /// Conversation identity.
    pub conversation_id: ConversationId,
    /// Execute a previously proposed write.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub confirm: bool,
}

impl AgentRequest {
    /// Build a plain (non-confirming) request.
    #[must_use]
    pub fn new(
        question: impl Into<String>,
        history: Vec<Message>,
        conversation_id: ConversationId,
    ) -> Self {
        Self {
            question: question.into(),
            history,
            conversation_id,
            confirm: false,
        }
    }

    /// Same question, history and conversation, with `confirm` set.
    #[must_use]
    pub fn confirmed(&self) -> Self {
        Self {
            confirm: true,
            ..self.clone()
        }
    }

    /// Copy keeping only the most recent `limit` history entries.
    #[must_use]
    pub fn with_history_limit(&self, limit: Option<usize>) -> Self {
        let mut request = self.clone();
        if let Some(limit) = limit
            && request.history.len() > limit
        {
            let skip = request.history.len() - limit;
            request.history.drain(..skip);
        }
        request
    }
}

/// Database mutation proposed by the agent, awaiting confirmation.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct PendingWrite {
    /// The SQL the agent intends to run.
    #[serde(default)]
    pub sql: String,
}

/// Raw response body as sent by the agent endpoint.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentResponseBody {
    /// Plain-text answer.
    #[serde(default)]
    pub answer: Option<String>,
    /// Rich answer.
    #[serde(default)]
    pub answer_html: Option<String>,
    /// Agent-reported failure.
    #[serde(default)]
    pub error: Option<String>,
    /// Proposed mutation.
    #[serde(default)]
    pub pending_write: Option<PendingWrite>,
}

/// What the agent said, decided once at the transport boundary.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AgentReply {
    /// Rich answer; takes precedence over a text answer.
    Html(String),
    /// Plain-text answer.
    Text(String),
    /// The agent answered that it could not help. Rendered like an answer.
    Failure(String),
    /// The response carried none of the above.
    NoAnswer,
}

impl AgentReply {
    /// Text-safe form recorded in history and replayed to the agent.
    #[must_use]
    pub fn history_text(&self) -> &str {
        match self {
            Self::Html(_) => RICH_CONTENT_SENTINEL,
            Self::Text(text) | Self::Failure(text) => text,
            Self::NoAnswer => NO_ANSWER_SENTINEL,
        }
    }

    /// Content to show the user.
    #[must_use]
    pub fn display(&self) -> &str {
        match self {
            Self::Html(text) | Self::Text(text) | Self::Failure(text) => text,
            Self::NoAnswer => NO_ANSWER_SENTINEL,
        }
    }

    /// Whether the agent reported a failure.
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }
}

/// Decoded response of one round trip.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AgentExchange {
    /// The single active reply variant.
    pub reply: AgentReply,
    /// Present only when the agent proposes a mutation.
    pub pending_write: Option<PendingWrite>,
}

impl AgentExchange {
    /// Exchange with a text answer and no proposal.
    #[must_use]
    pub fn answer(text: impl Into<String>) -> Self {
        Self {
            reply: AgentReply::Text(text.into()),
            pending_write: None,
        }
    }

    /// Attach a proposed mutation.
    #[must_use]
    pub fn with_pending_write(mut self, sql: impl Into<String>) -> Self {
        self.pending_write = Some(PendingWrite { sql: sql.into() });
        self
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl From<AgentResponseBody> for AgentExchange {
    fn from(body: AgentResponseBody) -> Self {
        let reply = if let Some(html) = non_empty(body.answer_html) {
            AgentReply::Html(html)
        } else if let Some(text) = non_empty(body.answer) {
            AgentReply::Text(text)
        } else if let Some(error) = non_empty(body.error) {
            AgentReply::Failure(error)
        } else {
            AgentReply::NoAnswer
        };
        Self {
            reply,
            pending_write: body.pending_write,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(json: &str) -> AgentExchange {
        serde_json::from_str::<AgentResponseBody>(json)
            .unwrap()
            .into()
    }

    #[test]
    fn test_html_takes_precedence() {
        let exchange = decode(r#"{"answer":"plain","answerHtml":"<b>rich</b>"}"#);
        assert_eq!(exchange.reply, AgentReply::Html("<b>rich</b>".to_string()));
        assert_eq!(exchange.reply.history_text(), RICH_CONTENT_SENTINEL);
    }

    #[test]
    fn test_error_is_a_reply_not_a_transport_failure() {
        let exchange = decode(r#"{"error":"I cannot answer that"}"#);
        assert!(exchange.reply.is_failure());
        assert_eq!(exchange.reply.history_text(), "I cannot answer that");
    }

    #[test]
    fn test_empty_body_is_no_answer() {
        let exchange = decode(r#"{"answer":""}"#);
        assert_eq!(exchange.reply, AgentReply::NoAnswer);
        assert!(exchange.pending_write.is_none());
    }

    #[test]
    fn test_pending_write_presence_is_kept() {
        let exchange = decode(r#"{"answer":"ok","pendingWrite":{"sql":"UPDATE orders SET x = 1"}}"#);
        assert_eq!(
            exchange.pending_write,
            Some(PendingWrite {
                sql: "UPDATE orders SET x = 1".to_string()
            })
        );
        let bare = decode(r#"{"pendingWrite":{}}"#);
        assert!(bare.pending_write.is_some());
    }

    #[test]
    fn test_request_wire_shape() {
        let id = ConversationId::parse("conv_1_abc").unwrap();
        let request = AgentRequest::new("q", vec![Message::user("hi")], id);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["conversationId"], "conv_1_abc");
        assert_eq!(json["history"][0]["role"], "user");
        assert!(json.get("confirm").is_none());

        let confirmed = serde_json::to_value(request.confirmed()).unwrap();
        assert_eq!(confirmed["confirm"], true);
    }

    #[test]
    fn test_history_limit_keeps_most_recent() {
        let id = ConversationId::parse("conv_1_abc").unwrap();
        let history = vec![
            Message::user("a"),
            Message::assistant("b"),
            Message::user("c"),
        ];
        let request = AgentRequest::new("q", history, id);
        let trimmed = request.with_history_limit(Some(2));
        assert_eq!(trimmed.history, vec![Message::assistant("b"), Message::user("c")]);
        assert_eq!(request.with_history_limit(None).history.len(), 3);
    }
}
