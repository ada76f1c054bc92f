//! Assistant content layout.
//!
//! Replies arrive as plain text where blank lines separate sections and a
//! leading `* ` marks a section heading.

use colored::Colorize;

const HEADING_MARKER: &str = "* ";
const BODY_INDENT: &str = "    ";

/// One laid-out section of an assistant reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// `* Heading` followed by its body lines.
    Section { heading: String, body: Vec<String> },
    /// Lines rendered as they are.
    Lines(Vec<String>),
}

/// Split assistant content into blocks.
#[must_use]
pub fn format_content(content: &str) -> Vec<Block> {
    content
        .split("\n\n")
        .filter(|section| !section.trim().is_empty())
        .map(|section| {
            let mut lines = section.lines();
            let first = lines.next().unwrap_or_default();
            match first.strip_prefix(HEADING_MARKER) {
                Some(heading) => Block::Section {
                    heading: heading.trim().to_string(),
                    body: lines.map(|l| l.trim().to_string()).collect(),
                },
                None => Block::Lines(section.lines().map(str::to_string).collect()),
            }
        })
        .collect()
}

/// Render blocks to terminal text.
#[must_use]
pub fn render_blocks(blocks: &[Block]) -> String {
    blocks
        .iter()
        .map(|block| match block {
            Block::Section { heading, body } => {
                let mut out = heading.bold().to_string();
                for line in body {
                    out.push('\n');
                    out.push_str(BODY_INDENT);
                    out.push_str(line);
                }
                out
            }
            Block::Lines(lines) => lines.join("\n"),
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading_sections_and_plain_lines() {
        let content = "Here is today's summary.\n\n* Markets\nStocks rose.\nBonds fell.\n\n* Weather\nSunny.";
        let blocks = format_content(content);

        assert_eq!(blocks.len(), 3);
        assert_eq!(
            blocks[0],
            Block::Lines(vec!["Here is today's summary.".to_string()])
        );
        assert_eq!(
            blocks[1],
            Block::Section {
                heading: "Markets".to_string(),
                body: vec!["Stocks rose.".to_string(), "Bonds fell.".to_string()],
            }
        );
    }

    #[test]
    fn test_render_indents_section_body() {
        colored::control::set_override(false);
        let rendered = render_blocks(&format_content("* Markets\nStocks rose.\n\nThat's all."));
        assert_eq!(rendered, "Markets\n    Stocks rose.\n\nThat's all.");
    }

    #[test]
    fn test_blank_content_has_no_blocks() {
        assert!(format_content("").is_empty());
        assert!(format_content("\n\n\n\n").is_empty());
    }
}
