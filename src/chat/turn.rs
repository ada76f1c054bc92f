//! Streaming turn state.

use std::fmt;

use serde::Serialize;

use crate::api::Source;
use crate::error::{Error, Result};

/// Identifier of one turn, unique per controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TurnId(u64);

impl TurnId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for TurnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "turn-{}", self.0)
    }
}

/// Lifecycle of a streaming turn.
///
/// Status only moves forward: `Pending -> Streaming -> {Committed, Failed}`.
/// A pending turn may also fail directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TurnStatus {
    /// Created, transport not yet opened.
    Pending,
    /// Receiving chunks.
    Streaming,
    /// Reply committed to the message list.
    Committed,
    /// Ended without a reply.
    Failed,
}

impl TurnStatus {
    /// Whether no further transitions are allowed.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Committed | Self::Failed)
    }

    /// Whether `self -> next` is a legal transition.
    #[must_use]
    pub fn can_advance_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Streaming | Self::Failed)
                | (Self::Streaming, Self::Committed | Self::Failed)
        )
    }
}

/// Why a turn ended without a reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum FailureReason {
    /// The backend sent `complete` with `success: false`.
    Rejected,
    /// The connection failed, closed early, or went idle.
    Transport(String),
    /// A newer turn, a session switch, or teardown superseded it.
    Cancelled,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected => f.write_str("the assistant could not answer"),
            Self::Transport(msg) => write!(f, "connection failed: {msg}"),
            Self::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// The in-progress state of one turn.
#[derive(Debug, Clone)]
pub struct StreamingTurn {
    id: TurnId,
    session_id: String,
    user_message: String,
    content: String,
    sources: Option<Vec<Source>>,
    status: TurnStatus,
    chunks: usize,
    first_turn: bool,
}

impl StreamingTurn {
    /// Create a pending turn.
    pub fn new(
        id: TurnId,
        session_id: impl Into<String>,
        user_message: impl Into<String>,
        first_turn: bool,
    ) -> Self {
        Self {
            id,
            session_id: session_id.into(),
            user_message: user_message.into(),
            content: String::new(),
            sources: None,
            status: TurnStatus::Pending,
            chunks: 0,
            first_turn,
        }
    }

    #[must_use]
    pub fn id(&self) -> TurnId {
        self.id
    }

    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    #[must_use]
    pub fn user_message(&self) -> &str {
        &self.user_message
    }

    /// Text accumulated so far.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    #[must_use]
    pub fn sources(&self) -> Option<&[Source]> {
        self.sources.as_deref()
    }

    #[must_use]
    pub fn status(&self) -> TurnStatus {
        self.status
    }

    /// Number of chunks received.
    #[must_use]
    pub fn chunks(&self) -> usize {
        self.chunks
    }

    /// Whether this turn carries the session's first message.
    #[must_use]
    pub fn is_first_turn(&self) -> bool {
        self.first_turn
    }

    /// Move to `next`, rejecting backwards or repeated transitions.
    pub fn advance(&mut self, next: TurnStatus) -> Result<()> {
        if !self.status.can_advance_to(next) {
            return Err(Error::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    /// Append one chunk, separated from the previous one by a single space.
    ///
    /// Ignored unless the turn is streaming; returns whether it applied.
    pub fn push_chunk(&mut self, chunk: &str) -> bool {
        if self.status != TurnStatus::Streaming {
            return false;
        }
        if self.chunks > 0 {
            self.content.push(' ');
        }
        self.content.push_str(chunk);
        self.chunks += 1;
        true
    }

    /// Replace the citation set wholesale.
    pub fn replace_sources(&mut self, sources: Vec<Source>) {
        self.sources = Some(sources);
    }

    /// Move the buffer out, leaving it empty.
    pub(crate) fn take_buffer(&mut self) -> (String, Option<Vec<Source>>) {
        (std::mem::take(&mut self.content), self.sources.take())
    }

    /// Point-in-time view for observers.
    #[must_use]
    pub fn snapshot(&self) -> TurnSnapshot {
        TurnSnapshot {
            turn_id: self.id,
            session_id: self.session_id.clone(),
            status: self.status,
            content: self.content.clone(),
            sources: self.sources.clone(),
            chunks: self.chunks,
        }
    }
}

/// What observers see of the current turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TurnSnapshot {
    pub turn_id: TurnId,
    pub session_id: String,
    pub status: TurnStatus,
    pub content: String,
    pub sources: Option<Vec<Source>>,
    pub chunks: usize,
}

impl TurnSnapshot {
    /// Streaming but nothing received yet.
    #[must_use]
    pub fn is_awaiting_first_chunk(&self) -> bool {
        self.status == TurnStatus::Streaming && self.chunks == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn streaming_turn() -> StreamingTurn {
        let mut turn = StreamingTurn::new(TurnId::new(1), "s", "hi", true);
        turn.advance(TurnStatus::Streaming).unwrap();
        turn
    }

    #[test]
    fn test_transitions_are_one_way() {
        use TurnStatus::*;

        assert!(Pending.can_advance_to(Streaming));
        assert!(Pending.can_advance_to(Failed));
        assert!(Streaming.can_advance_to(Committed));
        assert!(Streaming.can_advance_to(Failed));

        assert!(!Pending.can_advance_to(Committed));
        assert!(!Streaming.can_advance_to(Pending));
        assert!(!Streaming.can_advance_to(Streaming));
        for terminal in [Committed, Failed] {
            for next in [Pending, Streaming, Committed, Failed] {
                assert!(!terminal.can_advance_to(next));
            }
        }
    }

    #[test]
    fn test_advance_out_of_terminal_is_rejected() {
        let mut turn = streaming_turn();
        turn.advance(TurnStatus::Committed).unwrap();

        let err = turn.advance(TurnStatus::Failed).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidTransition {
                from: TurnStatus::Committed,
                to: TurnStatus::Failed
            }
        ));
        assert_eq!(turn.status(), TurnStatus::Committed);
    }

    #[test]
    fn test_chunks_join_with_single_space() {
        let mut turn = streaming_turn();
        for chunk in ["Stocks", "rallied", "today."] {
            assert!(turn.push_chunk(chunk));
        }
        assert_eq!(turn.content(), "Stocks rallied today.");
        assert_eq!(turn.chunks(), 3);
    }

    #[test]
    fn test_chunks_ignored_outside_streaming() {
        let mut turn = StreamingTurn::new(TurnId::new(2), "s", "hi", false);
        assert!(!turn.push_chunk("early"));

        turn.advance(TurnStatus::Streaming).unwrap();
        turn.advance(TurnStatus::Failed).unwrap();
        assert!(!turn.push_chunk("late"));
        assert_eq!(turn.content(), "");
    }

    #[test]
    fn test_sources_are_replaced_not_merged() {
        let mut turn = streaming_turn();
        let a = Source {
            title: "A".into(),
            link: "https://a".into(),
            source: "AP".into(),
        };
        let b = Source {
            title: "B".into(),
            link: "https://b".into(),
            source: "Reuters".into(),
        };
        turn.replace_sources(vec![a.clone(), b.clone()]);
        turn.replace_sources(vec![b.clone()]);
        assert_eq!(turn.sources(), Some(&[b][..]));
    }
}
