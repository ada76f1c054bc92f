//! Typewriter reveal of the in-progress reply.

use crate::chat::TurnId;

/// Tracks how much of a turn's buffer has been shown.
///
/// The buffer only grows while a turn streams, so the shown prefix stays
/// valid between ticks.
#[derive(Debug, Default)]
pub struct Typewriter {
    turn: Option<TurnId>,
    shown: usize,
    sources_shown: bool,
}

impl Typewriter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reveal up to `max_chars` more characters of `content`.
    ///
    /// Returns the newly revealed text. Switching to another turn starts
    /// over from the beginning.
    pub fn advance<'c>(&mut self, turn: TurnId, content: &'c str, max_chars: usize) -> &'c str {
        self.rebind(turn, content);
        let rest = &content[self.shown..];
        let end = rest
            .char_indices()
            .nth(max_chars)
            .map_or(rest.len(), |(i, _)| i);
        self.shown += end;
        &rest[..end]
    }

    /// Reveal everything not shown yet and forget the turn.
    pub fn flush<'c>(&mut self, turn: TurnId, content: &'c str) -> &'c str {
        self.rebind(turn, content);
        let rest = &content[self.shown..];
        self.reset();
        rest
    }

    /// Whether anything of `turn` has been shown.
    #[must_use]
    pub fn has_shown(&self, turn: TurnId) -> bool {
        self.turn == Some(turn) && self.shown > 0
    }

    /// Whether every character of `content` has been shown for `turn`.
    #[must_use]
    pub fn is_caught_up(&self, turn: TurnId, content: &str) -> bool {
        self.has_shown(turn) && self.shown == content.len()
    }

    /// Whether the sources of `turn` were already printed.
    #[must_use]
    pub fn sources_shown(&self, turn: TurnId) -> bool {
        self.turn == Some(turn) && self.sources_shown
    }

    pub fn mark_sources_shown(&mut self) {
        self.sources_shown = true;
    }

    pub fn reset(&mut self) {
        self.turn = None;
        self.shown = 0;
        self.sources_shown = false;
    }

    fn rebind(&mut self, turn: TurnId, content: &str) {
        if self.turn != Some(turn) || !content.is_char_boundary(self.shown) {
            self.reset();
            self.turn = Some(turn);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reveals_characters_not_bytes() {
        let turn = TurnId::new(1);
        let mut tw = Typewriter::new();

        assert_eq!(tw.advance(turn, "héllo", 2), "hé");
        assert_eq!(tw.advance(turn, "héllo world", 3), "llo");
        assert_eq!(tw.flush(turn, "héllo world"), " world");
        assert!(!tw.has_shown(turn));
    }

    #[test]
    fn test_new_turn_starts_over() {
        let mut tw = Typewriter::new();
        assert_eq!(tw.advance(TurnId::new(1), "abc", 2), "ab");
        assert!(tw.has_shown(TurnId::new(1)));
        assert_eq!(tw.advance(TurnId::new(2), "xyz", 1), "x");
    }

    #[test]
    fn test_catching_up_and_sources_flag() {
        let turn = TurnId::new(1);
        let mut tw = Typewriter::new();
        assert!(!tw.is_caught_up(turn, ""));

        tw.advance(turn, "abc", 2);
        assert!(!tw.is_caught_up(turn, "abc"));
        tw.advance(turn, "abc", 2);
        assert!(tw.is_caught_up(turn, "abc"));

        tw.mark_sources_shown();
        assert!(tw.sources_shown(turn));
        tw.advance(TurnId::new(2), "x", 1);
        assert!(!tw.sources_shown(TurnId::new(2)));
    }

    #[test]
    fn test_caught_up_reveals_nothing() {
        let turn = TurnId::new(1);
        let mut tw = Typewriter::new();
        assert_eq!(tw.advance(turn, "ab", 5), "ab");
        assert_eq!(tw.advance(turn, "ab", 5), "");
    }
}
