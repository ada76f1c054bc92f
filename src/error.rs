//! Error types for the chat client.

use std::time::Duration;

use thiserror::Error;

use crate::chat::TurnStatus;

/// Crate error type.
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Local storage I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Backend returned an error response.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message from the backend.
        message: String,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Submitted text was blank.
    #[error("Message is empty")]
    EmptyMessage,

    /// Session id is not in the session list.
    #[error("Unknown session: {0}")]
    UnknownSession(String),

    /// No session is active.
    #[error("No active session")]
    NoActiveSession,

    /// Streaming turn status may only move forward.
    #[error("Invalid turn transition: {from:?} -> {to:?}")]
    InvalidTransition {
        /// Current status.
        from: TurnStatus,
        /// Requested status.
        to: TurnStatus,
    },

    /// Server sent an `error` event or a malformed frame.
    #[error("Stream error: {0}")]
    Stream(String),

    /// Stream ended unexpectedly.
    #[error("Stream ended unexpectedly")]
    StreamEnded,

    /// No stream event arrived within the idle window.
    #[error("Stream idle for {0:?}")]
    IdleTimeout(Duration),
}

/// Result type alias for chat client operations.
pub type Result<T> = std::result::Result<T, Error>;
