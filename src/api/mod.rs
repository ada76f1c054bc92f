//! Backend client for the news assistant service.
//!
//! The backend owns retrieval, generation and persistence. This module only
//! speaks its HTTP/SSE contract:
//!
//! - `POST /api/session` mints a session id
//! - `GET /api/session/{id}/history` returns the persisted history
//! - `DELETE /api/session/{id}/history` deletes it
//! - `GET /api/chat?sessionId=..&message=..` streams one assistant turn
//!
//! [`Backend`] is the seam the chat controller depends on; [`Client`] is the
//! `reqwest` implementation.

pub mod client;
pub mod sse;
pub mod types;

pub use client::Client;
pub use sse::{EventStream, StreamEvent};
pub use types::{Message, Role, Source};

use async_trait::async_trait;

use crate::error::Result;

/// Logical operations offered by the backend.
#[async_trait]
pub trait Backend: Send + Sync + std::fmt::Debug {
    /// Mint a new session id.
    async fn create_session(&self) -> Result<String>;

    /// Fetch the persisted history of a session, oldest first.
    async fn fetch_history(&self, session_id: &str) -> Result<Vec<Message>>;

    /// Delete the persisted history of a session.
    async fn delete_history(&self, session_id: &str) -> Result<()>;

    /// Open the server-push stream for one turn.
    async fn open_chat(&self, session_id: &str, message: &str) -> Result<EventStream>;
}
