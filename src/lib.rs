//! Terminal client for a news question-answering backend.
//!
//! A chat has sessions (created by the backend, listed locally), a message
//! history per session, and at most one streaming turn whose reply arrives
//! over Server-Sent Events.
//!
//! # Architecture
//!
//! - **API**: HTTP client for the backend and the SSE event decoder
//! - **Session**: Locally persisted session list and active-session pointer
//! - **Chat**: Message list, turn state machine, and the stream reconciler
//! - **UI**: Terminal renderers and the interactive shell
//!
//! # Modules
//!
//! - [`api`]: Backend client and wire types
//! - [`session`]: Session store over a key-value backend
//! - [`chat`]: Chat controller and streaming turns
//! - [`ui`]: Terminal view

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::cargo_common_metadata)]
#![allow(clippy::multiple_crate_versions)]
#![allow(clippy::unused_async)]

pub mod api;
pub mod chat;
pub mod config;
pub mod error;
pub mod session;
pub mod telemetry;
pub mod ui;

pub use error::{Error, Result};
