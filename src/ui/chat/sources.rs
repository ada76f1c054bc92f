//! Citations under an assistant reply.

use colored::Colorize;

use crate::api::Source;

/// Render the "Sources:" group, or `None` when there is nothing to list.
#[must_use]
pub fn render_sources(sources: Option<&[Source]>) -> Option<String> {
    let sources = sources.filter(|s| !s.is_empty())?;

    let mut out = "Sources:".dimmed().bold().to_string();
    for source in sources {
        out.push_str(&format!(
            "\n  - {} ({})\n    {}",
            source.title,
            source.source.dimmed(),
            source.link.underline()
        ));
    }
    Some(out)
}
