//! The chat context: sessions, history, and the active turn.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, error, info, instrument, warn};

use super::messages::MessageList;
use super::reconciler::{StreamReconciler, TurnEvent, TurnOutcome, TurnTicket};
use super::turn::{FailureReason, StreamingTurn, TurnId, TurnSnapshot, TurnStatus};
use crate::api::Backend;
use crate::error::{Error, Result};
use crate::session::{Session, SessionStore};

/// Default idle window before a silent stream is treated as failed.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(60);

/// Severity of a [`Notice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// A transient, user-facing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// Receiving half of the turn event channel.
///
/// Kept apart from [`ChatController`] so a front-end can wait on it while
/// also holding the controller mutably.
#[derive(Debug)]
pub struct TurnEvents {
    rx: mpsc::UnboundedReceiver<TurnEvent>,
}

impl TurnEvents {
    /// Wait for the next transport signal.
    pub async fn recv(&mut self) -> Option<TurnEvent> {
        self.rx.recv().await
    }
}

/// Explicitly constructed chat context.
///
/// Owns the session store, the message list of the active session, and the
/// stream reconciler. Transport tasks only ever send [`TurnEvent`]s back;
/// every mutation happens through `&mut self`.
#[derive(Debug)]
pub struct ChatController {
    backend: Arc<dyn Backend>,
    sessions: SessionStore,
    messages: MessageList,
    reconciler: StreamReconciler,
    events: mpsc::UnboundedSender<TurnEvent>,
    notices: broadcast::Sender<Notice>,
    idle_timeout: Duration,
}

impl ChatController {
    /// Create a controller and the channel its transport tasks report on.
    pub fn new(
        backend: Arc<dyn Backend>,
        sessions: SessionStore,
        idle_timeout: Duration,
    ) -> (Self, TurnEvents) {
        let (events, rx) = mpsc::unbounded_channel();
        let (notices, _) = broadcast::channel(32);
        let controller = Self {
            backend,
            sessions,
            messages: MessageList::new(),
            reconciler: StreamReconciler::new(),
            events,
            notices,
            idle_timeout,
        };
        (controller, TurnEvents { rx })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    #[must_use]
    pub fn sessions(&self) -> &[Session] {
        self.sessions.sessions()
    }

    #[must_use]
    pub fn active_session(&self) -> Option<&Session> {
        self.sessions.active()
    }

    #[must_use]
    pub fn messages(&self) -> &MessageList {
        &self.messages
    }

    #[must_use]
    pub fn active_turn(&self) -> Option<&StreamingTurn> {
        self.reconciler.active()
    }

    #[must_use]
    pub fn is_streaming(&self) -> bool {
        self.reconciler.is_streaming()
    }

    /// Observe the current turn.
    #[must_use]
    pub fn subscribe_turn(&self) -> watch::Receiver<Option<TurnSnapshot>> {
        self.reconciler.subscribe()
    }

    /// Observe user-facing notices.
    #[must_use]
    pub fn subscribe_notices(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Sessions
    // ─────────────────────────────────────────────────────────────────────────

    /// Restore the last active session, or create one if none are stored.
    ///
    /// Fails only when a session had to be created and the backend refused.
    pub async fn start(&mut self) -> Result<()> {
        match self.sessions.restore_active()? {
            Some(id) => {
                info!(name: "session.restored", session_id = %id, "Restored active session");
                self.messages.reset(&id);
                self.refresh_history().await;
                Ok(())
            }
            None => self.create_and_activate().await.map(drop),
        }
    }

    /// Create a fresh session and make it active.
    pub async fn new_chat(&mut self) -> Result<String> {
        self.cancel_turn();
        self.create_and_activate().await
    }

    /// Switch to a known session and load its history.
    pub async fn select_session(&mut self, id: &str) -> Result<()> {
        if self.sessions.get(id).is_none() {
            return Err(Error::UnknownSession(id.to_string()));
        }
        self.cancel_turn();
        self.sessions.select_session(id)?;
        self.messages.reset(id);
        self.refresh_history().await;
        Ok(())
    }

    /// Delete a session's history on the backend, then drop it locally.
    ///
    /// The local entry is only removed once the backend confirmed. When the
    /// active session goes, the most recently created remaining session takes
    /// over, or a new one is created.
    #[instrument(skip(self))]
    pub async fn clear_history(&mut self, session_id: &str) -> Result<()> {
        if self.sessions.get(session_id).is_none() {
            return Err(Error::UnknownSession(session_id.to_string()));
        }
        let was_active = self.sessions.active_id() == Some(session_id);
        if was_active {
            self.cancel_turn();
        }

        if let Err(e) = self.backend.delete_history(session_id).await {
            error!(name: "history.clear.failed", session_id, error = %e, "Failed to clear history");
            self.notify(NoticeLevel::Error, format!("Could not clear chat: {e}"));
            return Err(e);
        }
        self.sessions.remove(session_id)?;
        info!(name: "history.cleared", session_id, "History cleared");
        self.notify(NoticeLevel::Info, "Chat history cleared.".to_string());

        if !was_active {
            return Ok(());
        }
        match self.sessions.most_recent().map(|s| s.id.clone()) {
            Some(next) => {
                self.sessions.select_session(&next)?;
                self.messages.reset(&next);
                self.refresh_history().await;
                Ok(())
            }
            None => self.create_and_activate().await.map(drop),
        }
    }

    async fn create_and_activate(&mut self) -> Result<String> {
        let created = self
            .sessions
            .create_session(self.backend.as_ref())
            .await
            .map(|session| session.id.clone());
        let id = match created {
            Ok(id) => id,
            Err(e) => {
                error!(name: "session.create.failed", error = %e, "Failed to create session");
                self.notify(NoticeLevel::Error, format!("Could not start a new chat: {e}"));
                return Err(e);
            }
        };
        self.messages.replace_history(&id, Vec::new());
        Ok(id)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // History
    // ─────────────────────────────────────────────────────────────────────────

    /// Replace the message list with the backend's history.
    ///
    /// Skipped while a turn is streaming so the optimistic message is never
    /// clobbered; the post-turn refresh catches up. A failed fetch leaves
    /// the current messages untouched. Returns whether the list was replaced.
    pub async fn refresh_history(&mut self) -> bool {
        let Some(id) = self.sessions.active_id().map(str::to_string) else {
            return false;
        };
        if self.reconciler.is_streaming() {
            debug!(session_id = %id, "Skipping history fetch during active turn");
            return false;
        }

        match self.backend.fetch_history(&id).await {
            Ok(history) => {
                self.messages.replace_history(&id, history);
                true
            }
            Err(e) => {
                error!(name: "history.fetch.failed", session_id = %id, error = %e, "Failed to fetch history");
                self.messages.finish_loading();
                self.notify(NoticeLevel::Error, format!("Could not load messages: {e}"));
                false
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Turns
    // ─────────────────────────────────────────────────────────────────────────

    /// Submit `text` to the active session.
    ///
    /// The user message is visible in [`messages`](Self::messages) when this
    /// returns; the reply arrives through [`TurnEvents`] and [`apply`](Self::apply).
    pub fn submit(&mut self, text: &str) -> Result<TurnId> {
        let session_id = self
            .sessions
            .active_id()
            .ok_or(Error::NoActiveSession)?
            .to_string();
        let ticket = self.reconciler.begin(&session_id, text, &mut self.messages)?;
        let turn_id = ticket.turn_id;

        tokio::spawn(pump(
            Arc::clone(&self.backend),
            ticket,
            self.idle_timeout,
            self.events.clone(),
        ));
        Ok(turn_id)
    }

    /// Apply a transport signal and settle the turn if it ended.
    pub async fn apply(&mut self, event: TurnEvent) -> Option<TurnOutcome> {
        let outcome = self.reconciler.apply(event, &mut self.messages)?;
        self.settle(&outcome).await;
        Some(outcome)
    }

    /// Submit `text` and drive the turn to its end.
    pub async fn run_turn(&mut self, text: &str, events: &mut TurnEvents) -> Result<TurnOutcome> {
        let turn_id = self.submit(text)?;
        while let Some(event) = events.recv().await {
            if let Some(outcome) = self.apply(event).await {
                if outcome.turn_id == turn_id {
                    return Ok(outcome);
                }
            }
        }
        Err(Error::StreamEnded)
    }

    /// Cancel the in-flight turn, if any.
    pub fn cancel_turn(&mut self) -> Option<TurnOutcome> {
        self.reconciler.cancel(&mut self.messages)
    }

    /// Tear down: no transport outlives this call.
    pub fn shutdown(&mut self) {
        if self.cancel_turn().is_some() {
            debug!("Cancelled in-flight turn on shutdown");
        }
    }

    async fn settle(&mut self, outcome: &TurnOutcome) {
        if outcome.status == TurnStatus::Committed && outcome.first_turn {
            if let Err(e) = self
                .sessions
                .rename_on_first_message(&outcome.session_id, &outcome.user_message)
            {
                error!(session_id = %outcome.session_id, error = %e, "Failed to update session title");
            }
        }

        match &outcome.failure {
            Some(FailureReason::Rejected) => self.notify(
                NoticeLevel::Error,
                "The assistant could not answer that. Please try again.".to_string(),
            ),
            Some(FailureReason::Transport(msg)) => self.notify(
                NoticeLevel::Error,
                format!("Connection lost: {msg}. Please resend your message."),
            ),
            Some(FailureReason::Cancelled) | None => {}
        }

        if outcome.reached_completion() {
            self.refresh_history().await;
        }
    }

    fn notify(&self, level: NoticeLevel, message: String) {
        // No subscribers is fine; notices are transient.
        let _ = self.notices.send(Notice { level, message });
    }
}

impl Drop for ChatController {
    fn drop(&mut self) {
        self.reconciler.cancel(&mut self.messages);
    }
}

/// Open the stream for one turn and forward its events until it ends.
///
/// Exits silently once the ticket is cancelled; dropping the stream closes
/// the connection.
async fn pump(
    backend: Arc<dyn Backend>,
    ticket: TurnTicket,
    idle_timeout: Duration,
    events: mpsc::UnboundedSender<TurnEvent>,
) {
    let TurnTicket {
        turn_id,
        session_id,
        message,
        cancel,
    } = ticket;

    // The idle window also bounds the wait for response headers.
    let opened = tokio::select! {
        biased;
        () = cancel.cancelled() => return,
        opened = tokio::time::timeout(
            idle_timeout,
            backend.open_chat(&session_id, &message),
        ) => opened,
    };
    let mut stream = match opened {
        Ok(Ok(stream)) => stream,
        Ok(Err(e)) => {
            let _ = events.send(TurnEvent::transport_error(turn_id, e.to_string()));
            return;
        }
        Err(_) => {
            warn!(name: "turn.open.timeout", %turn_id, "Chat stream did not open in time");
            let _ = events.send(TurnEvent::transport_error(
                turn_id,
                Error::IdleTimeout(idle_timeout).to_string(),
            ));
            return;
        }
    };

    loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!(%turn_id, "Closing cancelled stream");
                return;
            }
            next = tokio::time::timeout(idle_timeout, stream.next()) => next,
        };

        let event = match next {
            Ok(Some(Ok(event))) => event,
            Ok(Some(Err(e))) => {
                let _ = events.send(TurnEvent::transport_error(turn_id, e.to_string()));
                return;
            }
            Ok(None) => {
                let _ = events.send(TurnEvent::transport_error(
                    turn_id,
                    Error::StreamEnded.to_string(),
                ));
                return;
            }
            Err(_) => {
                let _ = events.send(TurnEvent::transport_error(
                    turn_id,
                    Error::IdleTimeout(idle_timeout).to_string(),
                ));
                return;
            }
        };

        let terminal = event.is_terminal();
        if events.send(TurnEvent::event(turn_id, event)).is_err() || terminal {
            return;
        }
    }
}
