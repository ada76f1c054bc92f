//! Session list.

use colored::Colorize;

use crate::session::{DEFAULT_TITLE, Session};

/// Render the session list, numbering entries from 1 and marking the
/// active one.
#[must_use]
pub fn render_sidebar(sessions: &[Session], active: Option<&str>) -> String {
    if sessions.is_empty() {
        return "No chat history".dimmed().to_string();
    }

    sessions
        .iter()
        .enumerate()
        .map(|(i, session)| {
            let is_active = active == Some(session.id.as_str());
            let title = if session.title.is_empty() {
                DEFAULT_TITLE
            } else {
                session.title.as_str()
            };
            let date = session
                .created_at_utc()
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default();

            let marker = if is_active { ">" } else { " " };
            let title = if is_active {
                title.blue().bold().to_string()
            } else {
                title.to_string()
            };
            format!("{marker} {:>2}. {title}  {}", i + 1, date.dimmed())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sidebar_marks_active_and_falls_back_to_placeholder() {
        colored::control::set_override(false);
        let sessions = vec![
            Session {
                id: "a".into(),
                created_at: 1_700_000_000_000,
                title: "Markets".into(),
                titled: true,
            },
            Session {
                id: "b".into(),
                created_at: 1_700_086_400_000,
                title: String::new(),
                titled: false,
            },
        ];

        let rendered = render_sidebar(&sessions, Some("b"));
        let lines: Vec<_> = rendered.lines().collect();
        assert_eq!(lines[0], "   1. Markets  2023-11-14");
        assert_eq!(lines[1], ">  2. New Chat  2023-11-15");
    }

    #[test]
    fn test_empty_sidebar() {
        colored::control::set_override(false);
        assert_eq!(render_sidebar(&[], None), "No chat history");
    }
}
