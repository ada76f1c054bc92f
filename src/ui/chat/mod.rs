//! Chat view.
//!
//! Pure renderers (header, sidebar, transcript, sources) plus the
//! interactive [`shell`] that wires them to a
//! [`ChatController`](crate::chat::ChatController).

pub mod formatted;
pub mod header;
pub mod input_area;
pub mod message_list;
pub mod reveal;
pub mod shell;
pub mod sidebar;
pub mod sources;

pub use formatted::{Block, format_content, render_blocks};
pub use header::{APP_TITLE, render_header};
pub use input_area::{Command, Input, PLACEHOLDER, parse_input};
pub use message_list::{render_message, render_transcript};
pub use reveal::Typewriter;
pub use shell::run;
pub use sidebar::render_sidebar;
pub use sources::render_sources;
