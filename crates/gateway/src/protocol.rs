//! The WebSocket wire protocol.
//!
//! Frames are JSON objects tagged by a `type` field. Client frames are
//! `message`, `typing`, and `ping`; server frames are `response`, `error`,
//! `log`, `typing`, and `pong`. Unknown client frames fail to parse and
//! are answered with an `error` frame; the connection stays open.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A frame sent by the client.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    /// A chat message for the agent.
    Message { content: String },
    /// Typing indicator, rebroadcast to the other connected clients.
    Typing { is_typing: bool },
    /// Liveness probe; answered with `pong`.
    Ping,
}

/// A frame sent by the server.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    Response {
        content: String,
        timestamp: DateTime<Utc>,
        client_id: String,
    },
    Error {
        content: String,
        timestamp: DateTime<Utc>,
    },
    Log {
        message: String,
        timestamp: DateTime<Utc>,
        level: String,
    },
    Typing {
        client_id: String,
        is_typing: bool,
        timestamp: DateTime<Utc>,
    },
    Pong {
        timestamp: DateTime<Utc>,
    },
}

impl ServerMessage {
    pub fn response(content: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self::Response {
            content: content.into(),
            timestamp: Utc::now(),
            client_id: client_id.into(),
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self::Error {
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn log(message: impl Into<String>, level: impl Into<String>) -> Self {
        Self::Log {
            message: message.into(),
            timestamp: Utc::now(),
            level: level.into(),
        }
    }

    pub fn typing(client_id: impl Into<String>, is_typing: bool) -> Self {
        Self::Typing {
            client_id: client_id.into(),
            is_typing,
            timestamp: Utc::now(),
        }
    }

    pub fn pong() -> Self {
        Self::Pong {
            timestamp: Utc::now(),
        }
    }
}
