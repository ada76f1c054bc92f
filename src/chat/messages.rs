//! Ordered message history of the active session.

use tracing::debug;

use super::turn::TurnId;
use crate::api::Message;

/// Where an entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    /// Loaded from the backend.
    History,
    /// Optimistic user message of a turn.
    Pending(TurnId),
    /// Assistant reply committed by a turn.
    Reply(TurnId),
}

#[derive(Debug, Clone)]
struct Entry {
    message: Message,
    origin: Origin,
}

/// Messages of one session.
///
/// A fetch replaces the list wholesale; local entries are tagged with the
/// turn that produced them so a failed turn removes exactly its own message.
#[derive(Debug, Default)]
pub struct MessageList {
    session_id: Option<String>,
    entries: Vec<Entry>,
    loading: bool,
}

impl MessageList {
    /// Create an empty list bound to no session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Session the list belongs to.
    #[must_use]
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Whether a history fetch is outstanding.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Bind to `session_id` with no messages while its history loads.
    pub fn reset(&mut self, session_id: &str) {
        self.session_id = Some(session_id.to_string());
        self.entries.clear();
        self.loading = true;
    }

    /// Mark the outstanding fetch as finished without touching the entries.
    pub fn finish_loading(&mut self) {
        self.loading = false;
    }

    /// Replace every entry with the backend's history.
    pub fn replace_history(&mut self, session_id: &str, history: Vec<Message>) {
        debug!(session_id, count = history.len(), "Replacing message history");
        self.session_id = Some(session_id.to_string());
        self.entries = history
            .into_iter()
            .map(|message| Entry {
                message,
                origin: Origin::History,
            })
            .collect();
        self.loading = false;
    }

    /// Append the optimistic user message of `turn`.
    pub fn push_optimistic(&mut self, turn: TurnId, message: Message) {
        self.entries.push(Entry {
            message,
            origin: Origin::Pending(turn),
        });
    }

    /// Append the finalized assistant reply of `turn`.
    pub fn commit_reply(&mut self, turn: TurnId, message: Message) {
        self.entries.push(Entry {
            message,
            origin: Origin::Reply(turn),
        });
    }

    /// Remove the optimistic message of `turn` unless it was answered.
    ///
    /// Returns whether a message was removed.
    pub fn rollback(&mut self, turn: TurnId) -> bool {
        if self.entries.iter().any(|e| e.origin == Origin::Reply(turn)) {
            return false;
        }
        let Some(pos) = self
            .entries
            .iter()
            .rposition(|e| e.origin == Origin::Pending(turn))
        else {
            return false;
        };
        self.entries.remove(pos);
        true
    }

    /// Messages in display order.
    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.entries.iter().map(|e| &e.message)
    }

    /// Owned copy of the messages.
    #[must_use]
    pub fn to_vec(&self) -> Vec<Message> {
        self.iter().cloned().collect()
    }

    #[must_use]
    pub fn last(&self) -> Option<&Message> {
        self.entries.last().map(|e| &e.message)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether the session already has a user message.
    #[must_use]
    pub fn has_user_message(&self) -> bool {
        self.iter().any(Message::is_user)
    }
}
