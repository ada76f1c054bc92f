//! Stream reconciliation for one assistant turn at a time.
//!
//! The reconciler owns the single active [`StreamingTurn`]. It applies the
//! events delivered for that turn, commits or discards the buffer when the
//! turn ends, and publishes every change on a `watch` channel so the view
//! never has to poll.
//!
//! Events are tagged with their [`TurnId`]; anything addressed to a turn
//! that is no longer active is dropped, so a cancelled stream can never
//! leak chunks into its successor.

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::messages::MessageList;
use super::turn::{FailureReason, StreamingTurn, TurnId, TurnSnapshot, TurnStatus};
use crate::api::{Message, StreamEvent};
use crate::error::{Error, Result};

/// What the transport delivered for a turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnSignal {
    /// A decoded server event.
    Event(StreamEvent),
    /// The connection failed, closed early, or went idle.
    TransportError(String),
}

/// A signal addressed to one turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnEvent {
    pub turn_id: TurnId,
    pub signal: TurnSignal,
}

impl TurnEvent {
    #[must_use]
    pub fn event(turn_id: TurnId, event: StreamEvent) -> Self {
        Self {
            turn_id,
            signal: TurnSignal::Event(event),
        }
    }

    #[must_use]
    pub fn transport_error(turn_id: TurnId, message: impl Into<String>) -> Self {
        Self {
            turn_id,
            signal: TurnSignal::TransportError(message.into()),
        }
    }
}

/// Everything the transport task needs to drive a turn.
#[derive(Debug, Clone)]
pub struct TurnTicket {
    pub turn_id: TurnId,
    pub session_id: String,
    pub message: String,
    /// Cancelled when the turn ends or is superseded.
    pub cancel: CancellationToken,
}

/// How a turn ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    pub turn_id: TurnId,
    pub session_id: String,
    pub status: TurnStatus,
    pub user_message: String,
    /// The turn carried the session's first message.
    pub first_turn: bool,
    /// The committed assistant message, on success.
    pub reply: Option<Message>,
    pub failure: Option<FailureReason>,
    /// The optimistic user message was removed.
    pub rolled_back: bool,
}

impl TurnOutcome {
    /// Whether the backend reached `complete`, successfully or not.
    #[must_use]
    pub fn reached_completion(&self) -> bool {
        matches!(
            (&self.status, &self.failure),
            (TurnStatus::Committed, _) | (TurnStatus::Failed, Some(FailureReason::Rejected))
        )
    }
}

#[derive(Debug)]
struct ActiveTurn {
    turn: StreamingTurn,
    cancel: CancellationToken,
}

/// Drives at most one streaming turn.
#[derive(Debug)]
pub struct StreamReconciler {
    next_id: u64,
    active: Option<ActiveTurn>,
    snapshots: watch::Sender<Option<TurnSnapshot>>,
}

impl Default for StreamReconciler {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamReconciler {
    #[must_use]
    pub fn new() -> Self {
        let (snapshots, _) = watch::channel(None);
        Self {
            next_id: 1,
            active: None,
            snapshots,
        }
    }

    /// Observe the current turn.
    ///
    /// The value is `None` until the first turn begins; after a turn ends it
    /// holds that turn's terminal snapshot with an emptied buffer.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<TurnSnapshot>> {
        self.snapshots.subscribe()
    }

    /// The active turn, if any.
    #[must_use]
    pub fn active(&self) -> Option<&StreamingTurn> {
        self.active.as_ref().map(|a| &a.turn)
    }

    #[must_use]
    pub fn is_streaming(&self) -> bool {
        self.active().is_some()
    }

    /// Start a turn for `text` in `session_id`.
    ///
    /// Cancels any turn still streaming, then appends the optimistic user
    /// message before returning.
    pub fn begin(
        &mut self,
        session_id: &str,
        text: &str,
        messages: &mut MessageList,
    ) -> Result<TurnTicket> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::EmptyMessage);
        }

        self.cancel(messages);

        let turn_id = TurnId::new(self.next_id);
        self.next_id += 1;

        let first_turn = !messages.has_user_message();
        messages.push_optimistic(turn_id, Message::user(text));

        let mut turn = StreamingTurn::new(turn_id, session_id, text, first_turn);
        turn.advance(TurnStatus::Streaming)?;

        let cancel = CancellationToken::new();
        self.active = Some(ActiveTurn {
            turn,
            cancel: cancel.clone(),
        });
        self.publish_active();

        info!(name: "turn.started", %turn_id, session_id, first_turn, "Turn started");
        Ok(TurnTicket {
            turn_id,
            session_id: session_id.to_string(),
            message: text.to_string(),
            cancel,
        })
    }

    /// Apply one transport signal.
    ///
    /// Returns the outcome when the signal ended the turn. Signals for
    /// turns that are not active are no-ops.
    pub fn apply(&mut self, event: TurnEvent, messages: &mut MessageList) -> Option<TurnOutcome> {
        let Some(active) = self
            .active
            .as_mut()
            .filter(|a| a.turn.id() == event.turn_id)
        else {
            debug!(name: "turn.event.dropped", turn_id = %event.turn_id, "Dropping event for inactive turn");
            return None;
        };

        match event.signal {
            TurnSignal::Event(StreamEvent::Chunk(chunk)) => {
                active.turn.push_chunk(&chunk);
                self.publish_active();
                None
            }
            TurnSignal::Event(StreamEvent::Sources(sources)) => {
                active.turn.replace_sources(sources);
                self.publish_active();
                None
            }
            TurnSignal::Event(StreamEvent::Complete { success: true }) => {
                let active = self.active.take()?;
                Some(self.finish(active, None, messages))
            }
            TurnSignal::Event(StreamEvent::Complete { success: false }) => {
                let active = self.active.take()?;
                Some(self.finish(active, Some(FailureReason::Rejected), messages))
            }
            TurnSignal::TransportError(message) => {
                let active = self.active.take()?;
                Some(self.finish(active, Some(FailureReason::Transport(message)), messages))
            }
        }
    }

    /// Cancel the active turn, closing its transport.
    ///
    /// The buffer is discarded and nothing is committed. The user message
    /// stays, since the backend has already received it.
    pub fn cancel(&mut self, messages: &mut MessageList) -> Option<TurnOutcome> {
        let active = self.active.take()?;
        Some(self.finish(active, Some(FailureReason::Cancelled), messages))
    }

    fn finish(
        &mut self,
        active: ActiveTurn,
        failure: Option<FailureReason>,
        messages: &mut MessageList,
    ) -> TurnOutcome {
        let ActiveTurn { mut turn, cancel } = active;
        cancel.cancel();

        let status = if failure.is_none() {
            TurnStatus::Committed
        } else {
            TurnStatus::Failed
        };
        if let Err(e) = turn.advance(status) {
            warn!(turn_id = %turn.id(), error = %e, "Unexpected turn transition");
        }

        let (content, sources) = turn.take_buffer();
        let reply = (status == TurnStatus::Committed).then(|| {
            let reply = Message::assistant(content, sources);
            messages.commit_reply(turn.id(), reply.clone());
            reply
        });

        let rolled_back = matches!(
            failure,
            Some(FailureReason::Rejected | FailureReason::Transport(_))
        ) && messages.rollback(turn.id());

        match &failure {
            None => info!(
                name: "turn.committed",
                turn_id = %turn.id(),
                session_id = turn.session_id(),
                chunks = turn.chunks(),
                "Turn committed"
            ),
            Some(FailureReason::Cancelled) => info!(
                name: "turn.cancelled",
                turn_id = %turn.id(),
                session_id = turn.session_id(),
                "Turn cancelled"
            ),
            Some(reason) => warn!(
                name: "turn.failed",
                turn_id = %turn.id(),
                session_id = turn.session_id(),
                %reason,
                rolled_back,
                "Turn failed"
            ),
        }

        self.snapshots.send_replace(Some(turn.snapshot()));

        TurnOutcome {
            turn_id: turn.id(),
            session_id: turn.session_id().to_string(),
            status,
            user_message: turn.user_message().to_string(),
            first_turn: turn.is_first_turn(),
            reply,
            failure,
            rolled_back,
        }
    }

    fn publish_active(&self) {
        if let Some(active) = &self.active {
            self.snapshots.send_replace(Some(active.turn.snapshot()));
        }
    }
}
