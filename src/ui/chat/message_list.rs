//! Transcript rendering.

use colored::Colorize;

use super::formatted::{format_content, render_blocks};
use super::sources::render_sources;
use crate::api::{Message, Role};
use crate::chat::{MessageList, TurnSnapshot};

pub const LOADING_TEXT: &str = "Loading messages...";
pub const WELCOME_TITLE: &str = "Welcome to News Chat!";
pub const WELCOME_SUBTITLE: &str = "Ask me anything about the latest news.";
pub const FETCHING_TEXT: &str = "Fetching response...";

/// Render a single stored message.
///
/// User content is shown verbatim; assistant content is laid out in
/// sections and followed by its sources.
#[must_use]
pub fn render_message(message: &Message) -> String {
    match message.role {
        Role::User => format!("{} {}", "You:".cyan().bold(), message.content),
        Role::Assistant => {
            let mut out = format!(
                "{}\n{}",
                "Assistant:".green().bold(),
                render_blocks(&format_content(&message.content))
            );
            if let Some(sources) = render_sources(message.sources.as_deref()) {
                out.push('\n');
                out.push_str(&sources);
            }
            out
        }
    }
}

/// Render the message area of the active session.
///
/// `turn` is the in-flight turn, if any; its partial reply (or the
/// fetching indicator) follows the stored messages.
#[must_use]
pub fn render_transcript(messages: &MessageList, turn: Option<&TurnSnapshot>) -> String {
    if messages.is_loading() {
        return LOADING_TEXT.dimmed().to_string();
    }
    if messages.is_empty() && turn.is_none() {
        return format!("{}\n{}", WELCOME_TITLE.bold(), WELCOME_SUBTITLE.dimmed());
    }

    let mut parts: Vec<String> = messages.iter().map(render_message).collect();
    if let Some(turn) = turn.filter(|t| !t.status.is_terminal()) {
        parts.push(render_live_turn(turn));
    }
    parts.join("\n\n")
}

fn render_live_turn(turn: &TurnSnapshot) -> String {
    if turn.is_awaiting_first_chunk() || turn.content.is_empty() {
        return FETCHING_TEXT.dimmed().italic().to_string();
    }
    let mut out = format!("{}\n{}", "Assistant:".green().bold(), turn.content);
    if let Some(sources) = render_sources(turn.sources.as_deref()) {
        out.push('\n');
        out.push_str(&sources);
    }
    out
}
