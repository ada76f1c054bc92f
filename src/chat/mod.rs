//! Chat state: message history and the streaming turn lifecycle.
//!
//! # Architecture
//!
//! - [`MessageList`]: ordered messages of the active session
//! - [`StreamingTurn`]: in-progress reply, `Pending -> Streaming -> {Committed, Failed}`
//! - [`StreamReconciler`]: applies stream events to the active turn and
//!   commits or rolls back when it ends
//! - [`ChatController`]: ties sessions, history and turns to a [`Backend`](crate::api::Backend)
//!
//! # Example
//!
//! ```rust
//! use newschat::api::StreamEvent;
//! use newschat::chat::{MessageList, StreamReconciler, TurnEvent, TurnStatus};
//!
//! let mut messages = MessageList::new();
//! let mut reconciler = StreamReconciler::new();
//!
//! let ticket = reconciler.begin("session-1", "Any news?", &mut messages).unwrap();
//! assert_eq!(messages.len(), 1);
//!
//! reconciler.apply(TurnEvent::event(ticket.turn_id, StreamEvent::Chunk("Quiet".into())), &mut messages);
//! reconciler.apply(TurnEvent::event(ticket.turn_id, StreamEvent::Chunk("day.".into())), &mut messages);
//! let outcome = reconciler
//!     .apply(TurnEvent::event(ticket.turn_id, StreamEvent::Complete { success: true }), &mut messages)
//!     .unwrap();
//!
//! assert_eq!(outcome.status, TurnStatus::Committed);
//! assert_eq!(messages.last().unwrap().content, "Quiet day.");
//! ```

mod controller;
mod messages;
mod reconciler;
mod turn;

pub use controller::{ChatController, DEFAULT_IDLE_TIMEOUT, Notice, NoticeLevel, TurnEvents};
pub use messages::MessageList;
pub use reconciler::{StreamReconciler, TurnEvent, TurnOutcome, TurnSignal, TurnTicket};
pub use turn::{FailureReason, StreamingTurn, TurnId, TurnSnapshot, TurnStatus};
