//! Message and History domain types.
//!
//! These are the core value objects that flow through the entire system:
//! a client sends a message → the gateway routes it to a session → the
//! agent loop processes it against the session's history → the provider
//! generates a response.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The role of a message sender in a conversation.
///
/// There is deliberately no system role: the model boundary does not
/// accept one, so the system instruction is folded into the first user
/// message instead (see [`History::push_user`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    User,
    /// The AI assistant
    Assistant,
    /// Tool execution result
    Tool,
}

/// Message content: either plain text or an ordered list of parts.
///
/// Some providers return multi-part content (text interleaved with opaque
/// non-text values); both shapes round-trip through serde untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Content {
    Text(String),
    Parts(Vec<ContentPart>),
}

/// One element of multi-part content.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContentPart {
    Text { text: String },
    Other(serde_json::Value),
}

impl Content {
    /// Extract the renderable text of this content.
    ///
    /// Plain text is returned unchanged. Multi-part content concatenates
    /// each text part with a single space, preserving order and skipping
    /// non-text parts. If no text part exists, falls back to the JSON
    /// representation of the parts.
    pub fn final_text(&self) -> String {
        match self {
            Content::Text(s) => s.clone(),
            Content::Parts(parts) => {
                let texts: Vec<&str> = parts
                    .iter()
                    .filter_map(|p| match p {
                        ContentPart::Text { text } => Some(text.as_str()),
                        ContentPart::Other(_) => None,
                    })
                    .collect();
                if texts.is_empty() {
                    serde_json::to_string(parts).unwrap_or_default()
                } else {
                    texts.join(" ")
                }
            }
        }
    }

    /// Whether this content carries no characters at all.
    pub fn is_empty(&self) -> bool {
        match self {
            Content::Text(s) => s.is_empty(),
            Content::Parts(parts) => parts.is_empty(),
        }
    }
}

impl From<&str> for Content {
    fn from(s: &str) -> Self {
        Content::Text(s.to_string())
    }
}

impl From<String> for Content {
    fn from(s: String) -> Self {
        Content::Text(s)
    }
}

/// A tool call requested by the model, embedded in an assistant message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Unique ID for this tool call (scoped to the message that produced it)
    pub id: String,

    /// Name of the tool to invoke
    pub name: String,

    /// Arguments as a JSON string
    pub arguments: String,
}

/// A single message in a session's history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    pub id: String,

    /// Who sent this message
    pub role: Role,

    /// The content (plain text or ordered parts)
    pub content: Content,

    /// Tool calls requested by the assistant (if any)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallRequest>,

    /// If this is a tool result, which tool call it answers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    /// Timestamp
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Create a new user message.
    pub fn user(content: impl Into<Content>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: Role::User,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
            timestamp: Utc::now(),
        }
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<Content>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: Role::Assistant,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
            timestamp: Utc::now(),
        }
    }

    /// Create a tool result message keyed to the call it answers.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<Content>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: Role::Tool,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: Some(tool_call_id.into()),
            timestamp: Utc::now(),
        }
    }
}

/// An append-only, order-preserving log of one session's messages.
///
/// The history owns the system-instruction-injection rule: the instruction
/// is folded into the *first* user message of the session exactly once.
/// After [`History::clear`] the next user message is treated as a first
/// message again and gets the instruction re-injected.
#[derive(Debug, Clone, Default)]
pub struct History {
    messages: Vec<Message>,
}

impl History {
    /// Create an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message. Order is preserved exactly as produced; no
    /// reordering or deduplication.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Append a user message, injecting `instruction` if this is the first
    /// user message of the session.
    pub fn push_user(&mut self, text: &str, instruction: &str) {
        let is_first_user = !self.messages.iter().any(|m| m.role == Role::User);
        let content = if is_first_user && !instruction.is_empty() {
            format!("{instruction}\n\n{text}")
        } else {
            text.to_string()
        };
        self.messages.push(Message::user(content));
    }

    /// Reset the history to empty.
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// An ordered copy of all messages.
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.clone()
    }

    /// Borrow the ordered messages.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
