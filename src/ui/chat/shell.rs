//! Interactive chat shell.
//!
//! Drives a [`ChatController`] from a line-oriented terminal:
//! - reads prompts and slash commands from stdin
//! - applies transport events as they arrive
//! - reveals the in-progress reply on a fixed tick
//! - prints notices as they are raised

use std::io::{self, Write};
use std::time::Duration;

use colored::Colorize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use super::header::render_header;
use super::input_area::{Command, HELP_TEXT, Input, PLACEHOLDER, parse_input, render_prompt};
use super::message_list::{FETCHING_TEXT, render_transcript};
use super::reveal::Typewriter;
use super::sidebar::render_sidebar;
use super::sources::render_sources;
use crate::chat::{
    ChatController, FailureReason, Notice, NoticeLevel, StreamingTurn, TurnEvents, TurnOutcome,
    TurnStatus,
};
use crate::error::{Error, Result};

/// Characters revealed per tick.
const REVEAL_STEP: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

/// Run the shell until `/quit` or end of input.
///
/// The controller is shut down on the way out, so no transport outlives
/// the shell.
pub async fn run(
    app: &mut ChatController,
    events: &mut TurnEvents,
    reveal_interval: Duration,
) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut notices = app.subscribe_notices();
    let mut tick = tokio::time::interval(reveal_interval);
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut typewriter = Typewriter::new();

    print_screen(app);
    println!("{}", format!("{PLACEHOLDER}  (/help for commands)").dimmed());
    prompt(app)?;

    let result = loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => break Ok(()),
                    Err(e) => break Err(Error::Io(e)),
                };
                if handle_line(app, &line, &mut typewriter).await == Flow::Quit {
                    break Ok(());
                }
                prompt(app)?;
            }
            Some(event) = events.recv() => {
                if let Some(outcome) = app.apply(event).await {
                    print_outcome(&outcome, &mut typewriter)?;
                    prompt(app)?;
                }
            }
            _ = tick.tick(), if app.is_streaming() => {
                reveal(app.active_turn(), &mut typewriter)?;
            }
            notice = notices.recv() => match notice {
                Ok(notice) => print_notice(&notice),
                Err(RecvError::Lagged(skipped)) => debug!(skipped, "Dropped notices"),
                Err(RecvError::Closed) => break Ok(()),
            },
        }
    };

    app.shutdown();
    info!(name: "shell.exit", "Chat shell closed");
    result
}

async fn handle_line(app: &mut ChatController, line: &str, typewriter: &mut Typewriter) -> Flow {
    match parse_input(line) {
        Input::Empty => {}
        Input::Submit(text) => {
            if app.is_streaming() {
                println!();
                typewriter.reset();
            }
            match app.submit(&text) {
                Ok(_) => println!("{}", FETCHING_TEXT.dimmed().italic()),
                Err(e) => print_error(&e),
            }
        }
        Input::Command(command) => return run_command(app, command, typewriter).await,
    }
    Flow::Continue
}

async fn run_command(
    app: &mut ChatController,
    command: Command,
    typewriter: &mut Typewriter,
) -> Flow {
    match command {
        Command::New => {
            typewriter.reset();
            // Failures surface as notices.
            if app.new_chat().await.is_ok() {
                print_screen(app);
            }
        }
        Command::Sessions => {
            println!("{}", render_sidebar(app.sessions(), active_id(app).as_deref()));
        }
        Command::Switch(target) => match resolve_session(app, &target) {
            Some(id) => {
                typewriter.reset();
                match app.select_session(&id).await {
                    Ok(()) => print_screen(app),
                    Err(e) => print_error(&e),
                }
            }
            None => print_error(&Error::UnknownSession(target)),
        },
        Command::Clear => match active_id(app) {
            Some(id) => {
                typewriter.reset();
                if app.clear_history(&id).await.is_ok() {
                    print_screen(app);
                }
            }
            None => print_error(&Error::NoActiveSession),
        },
        Command::History => {
            app.refresh_history().await;
            print_screen(app);
        }
        Command::Help => println!("{HELP_TEXT}"),
        Command::Quit => return Flow::Quit,
        Command::Unknown(raw) => {
            println!("{} {raw} (try /help)", "Unknown command:".yellow());
        }
    }
    Flow::Continue
}

/// Resolve `/switch` input: a 1-based list position or a session id.
fn resolve_session(app: &ChatController, target: &str) -> Option<String> {
    let sessions = app.sessions();
    if let Ok(n) = target.parse::<usize>() {
        if let Some(session) = n.checked_sub(1).and_then(|i| sessions.get(i)) {
            return Some(session.id.clone());
        }
    }
    sessions
        .iter()
        .find(|s| s.id == target)
        .map(|s| s.id.clone())
}

fn active_id(app: &ChatController) -> Option<String> {
    app.active_session().map(|s| s.id.clone())
}

fn reveal(turn: Option<&StreamingTurn>, typewriter: &mut Typewriter) -> Result<()> {
    let Some(turn) = turn else {
        return Ok(());
    };
    let first = !typewriter.has_shown(turn.id());
    let text = typewriter.advance(turn.id(), turn.content(), REVEAL_STEP);
    if !text.is_empty() {
        if first {
            println!("{}", "Assistant:".green().bold());
        }
        print!("{text}");
    }
    if let Some(sources) = live_sources(turn, typewriter) {
        println!();
        println!("{sources}");
    }
    io::stdout().flush()?;
    Ok(())
}

/// Sources to print under the partial reply: once per turn, after the
/// text received so far has been revealed.
fn live_sources(turn: &StreamingTurn, typewriter: &mut Typewriter) -> Option<String> {
    if typewriter.sources_shown(turn.id()) || !typewriter.is_caught_up(turn.id(), turn.content())
    {
        return None;
    }
    let rendered = render_sources(turn.sources())?;
    typewriter.mark_sources_shown();
    Some(rendered)
}

fn print_outcome(outcome: &TurnOutcome, typewriter: &mut Typewriter) -> Result<()> {
    let shown = typewriter.has_shown(outcome.turn_id);
    match (&outcome.status, &outcome.reply) {
        (TurnStatus::Committed, Some(reply)) => {
            if !shown {
                println!("{}", "Assistant:".green().bold());
            }
            let sources_shown = typewriter.sources_shown(outcome.turn_id);
            let rest = typewriter.flush(outcome.turn_id, &reply.content);
            if sources_shown {
                // The cursor already sits below the live sources block.
                if !rest.is_empty() {
                    println!("{rest}");
                }
            } else {
                println!("{rest}");
                if let Some(sources) = render_sources(reply.sources.as_deref()) {
                    println!("{sources}");
                }
            }
        }
        _ => {
            typewriter.reset();
            if shown {
                println!();
            }
            if outcome.failure == Some(FailureReason::Cancelled) {
                println!("{}", "(cancelled)".dimmed());
            }
        }
    }
    io::stdout().flush()?;
    Ok(())
}

fn print_screen(app: &ChatController) {
    let title = app.active_session().map(|s| s.title.as_str());
    let snapshot = app.active_turn().map(StreamingTurn::snapshot);
    println!();
    println!("{}", render_header(title));
    println!("{}", render_transcript(app.messages(), snapshot.as_ref()));
}

fn print_notice(notice: &Notice) {
    match notice.level {
        NoticeLevel::Info => println!("{}", notice.message.blue()),
        NoticeLevel::Error => println!("{}", notice.message.red()),
    }
}

fn print_error(error: &Error) {
    println!("{}", error.to_string().red());
}

fn prompt(app: &ChatController) -> Result<()> {
    print!("{}", render_prompt(app.is_streaming()));
    io::stdout().flush()?;
    Ok(())
}
