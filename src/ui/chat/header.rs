//! Chat header.

use colored::Colorize;

/// Application name shown in the header.
pub const APP_TITLE: &str = "News Gpt";

/// Header line with the application name and the active session title.
#[must_use]
pub fn render_header(session_title: Option<&str>) -> String {
    let mut line = APP_TITLE.bold().to_string();
    if let Some(title) = session_title.filter(|t| !t.is_empty()) {
        line.push(' ');
        line.push_str(&format!("({title})").dimmed().to_string());
    }
    line
}
