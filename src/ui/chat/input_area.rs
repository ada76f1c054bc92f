//! Prompt line and slash commands.

use colored::Colorize;

pub const PLACEHOLDER: &str = "Ask about the news...";

pub const HELP_TEXT: &str = "\
Commands:
  /new            start a new chat
  /sessions       list chats
  /switch <n|id>  switch to a chat by number or id
  /clear          clear the current chat
  /history        reload and show the current chat
  /help           show this help
  /quit           exit";

/// A slash command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    New,
    Sessions,
    Switch(String),
    Clear,
    History,
    Help,
    Quit,
    Unknown(String),
}

/// One line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Blank line; ignored.
    Empty,
    Submit(String),
    Command(Command),
}

/// Classify a line typed at the prompt.
#[must_use]
pub fn parse_input(line: &str) -> Input {
    let line = line.trim();
    if line.is_empty() {
        return Input::Empty;
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Input::Submit(line.to_string());
    };

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };
    let command = match name {
        "new" => Command::New,
        "sessions" | "ls" => Command::Sessions,
        "switch" if !arg.is_empty() => Command::Switch(arg.to_string()),
        "clear" => Command::Clear,
        "history" => Command::History,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        _ => Command::Unknown(line.to_string()),
    };
    Input::Command(command)
}

/// The prompt printed before each line of input.
#[must_use]
pub fn render_prompt(streaming: bool) -> String {
    if streaming {
        "… ".dimmed().to_string()
    } else {
        format!("{} ", ">".blue().bold())
    }
}
