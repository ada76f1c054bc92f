//! Wire types exchanged with the news assistant backend.

use serde::{Deserialize, Serialize};

// =============================================================================
// Domain Types
// =============================================================================

/// Author of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Submitted by the person chatting.
    User,
    /// Produced by the assistant.
    Assistant,
}

/// A citation attached to an assistant reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    /// Article title.
    pub title: String,
    /// Article URL.
    pub link: String,
    /// Publisher label.
    pub source: String,
}

/// A finalized message in a session's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Who wrote the message.
    pub role: Role,
    /// The message text.
    pub content: String,
    /// Citations, only ever present on assistant messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<Source>>,
}

impl Message {
    /// Create a user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            sources: None,
        }
    }

    /// Create an assistant message with optional citations.
    #[must_use]
    pub fn assistant(content: impl Into<String>, sources: Option<Vec<Source>>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            sources,
        }
    }

    /// Whether this message was written by the user.
    #[must_use]
    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }
}

// =============================================================================
// Session API Types
// =============================================================================

/// Response from `POST /api/session`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSessionResponse {
    /// Identifier minted by the backend.
    #[serde(rename = "sessionId")]
    pub session_id: String,
}

/// Response from `GET /api/session/{id}/history`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryResponse {
    /// Persisted history, oldest first.
    #[serde(default)]
    pub history: Vec<Message>,
}

// =============================================================================
// Chat Stream Payloads
// =============================================================================

/// Payload of the default `message` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkPayload {
    /// One fragment of assistant output.
    pub chunk: String,
}

/// Payload of the `sources` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesPayload {
    /// The complete citation set for the reply.
    #[serde(default)]
    pub sources: Vec<Source>,
}

/// Payload of the `complete` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletePayload {
    /// Whether the backend finished the reply.
    pub success: bool,
}
