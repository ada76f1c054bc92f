//! Session descriptors and their local persistence.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::kv::{KeyValueStore, LAST_ACTIVE_KEY, SESSIONS_KEY};
use crate::api::Backend;
use crate::error::{Error, Result};

/// Placeholder title for sessions without a first message.
pub const DEFAULT_TITLE: &str = "New Chat";

/// Maximum number of characters kept from the first message.
pub const TITLE_MAX_CHARS: usize = 50;

/// Marker appended to truncated titles.
const ELLIPSIS: &str = "...";

/// A persisted conversation thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Backend-minted identifier.
    pub id: String,
    /// Creation time in milliseconds since the Unix epoch.
    #[serde(rename = "createdAt")]
    pub created_at: i64,
    /// Display title.
    pub title: String,
    /// Set once the title has been derived from the first message.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub titled: bool,
}

impl Session {
    /// Create a descriptor stamped with the current time.
    #[must_use]
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            created_at: Utc::now().timestamp_millis(),
            title: title.into(),
            titled: false,
        }
    }

    /// Creation time as a UTC timestamp.
    #[must_use]
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.created_at)
    }
}

/// Title policy applied to new and renamed sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleRules {
    /// Title given to freshly created sessions.
    pub default_title: String,
    /// Characters kept from the first message before truncating.
    pub max_chars: usize,
}

impl Default for TitleRules {
    fn default() -> Self {
        Self {
            default_title: DEFAULT_TITLE.to_string(),
            max_chars: TITLE_MAX_CHARS,
        }
    }
}

/// Derive a session title from its first message.
///
/// Keeps the first `max_chars` characters and appends `...` only when
/// something was cut.
///
/// ```rust
/// use newschat::session::derive_title;
///
/// assert_eq!(derive_title("Short question", 50), "Short question");
/// assert_eq!(derive_title("abcdef", 3), "abc...");
/// ```
#[must_use]
pub fn derive_title(text: &str, max_chars: usize) -> String {
    let mut title: String = text.chars().take(max_chars).collect();
    if text.chars().nth(max_chars).is_some() {
        title.push_str(ELLIPSIS);
    }
    title
}

/// The session list plus the last-active pointer.
///
/// The store is an advisory cache: backend history stays authoritative.
#[derive(Debug)]
pub struct SessionStore {
    kv: Box<dyn KeyValueStore>,
    sessions: Vec<Session>,
    active: Option<String>,
    rules: TitleRules,
}

impl SessionStore {
    /// Load sessions and the last-active pointer from `kv`.
    ///
    /// A corrupt session list is logged and replaced by an empty one.
    pub fn load(kv: Box<dyn KeyValueStore>, rules: TitleRules) -> Result<Self> {
        let sessions = match kv.get(SESSIONS_KEY)? {
            Some(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!(error = %e, "Discarding unreadable session list");
                Vec::new()
            }),
            None => Vec::new(),
        };
        let active = kv.get(LAST_ACTIVE_KEY)?.filter(|id| !id.is_empty());

        Ok(Self {
            kv,
            sessions,
            active,
            rules,
        })
    }

    /// All sessions in creation order.
    #[must_use]
    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    /// Get a session by ID.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id == id)
    }

    /// Id of the active session, if it is in the list.
    #[must_use]
    pub fn active_id(&self) -> Option<&str> {
        self.active().map(|s| s.id.as_str())
    }

    /// The active session, if it is in the list.
    #[must_use]
    pub fn active(&self) -> Option<&Session> {
        self.active.as_deref().and_then(|id| self.get(id))
    }

    /// Get the number of sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Check if there are no sessions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// The session with the latest creation time.
    #[must_use]
    pub fn most_recent(&self) -> Option<&Session> {
        self.sessions.iter().max_by_key(|s| s.created_at)
    }

    /// Re-establish the active session after loading.
    ///
    /// Keeps the stored pointer when it names a known session, otherwise
    /// falls back to the most recent one. Returns `None` when the list is
    /// empty and a session has to be created.
    pub fn restore_active(&mut self) -> Result<Option<String>> {
        if let Some(id) = self.active_id() {
            return Ok(Some(id.to_string()));
        }
        let Some(id) = self.most_recent().map(|s| s.id.clone()) else {
            self.active = None;
            return Ok(None);
        };
        self.select_session(&id)?;
        Ok(Some(id))
    }

    /// Mint a session on the backend, append it, and make it active.
    pub async fn create_session(&mut self, backend: &dyn Backend) -> Result<&Session> {
        let id = backend.create_session().await?;
        let session = Session::new(id.clone(), self.rules.default_title.clone());

        self.sessions.retain(|s| s.id != id);
        self.sessions.push(session);
        self.active = Some(id.clone());
        self.persist_sessions()?;
        self.persist_active()?;

        info!(name: "session.created", session_id = %id, "Session created");
        let idx = self.sessions.len() - 1;
        Ok(&self.sessions[idx])
    }

    /// Mark a known session active. History is untouched.
    pub fn select_session(&mut self, id: &str) -> Result<()> {
        if self.get(id).is_none() {
            return Err(Error::UnknownSession(id.to_string()));
        }
        self.active = Some(id.to_string());
        self.persist_active()
    }

    /// Derive the title from the session's first message.
    ///
    /// Fires at most once per session; returns whether the title changed.
    pub fn rename_on_first_message(&mut self, id: &str, text: &str) -> Result<bool> {
        let max_chars = self.rules.max_chars;
        let Some(session) = self.sessions.iter_mut().find(|s| s.id == id) else {
            return Err(Error::UnknownSession(id.to_string()));
        };
        if session.titled {
            return Ok(false);
        }
        session.title = derive_title(text, max_chars);
        session.titled = true;
        info!(name: "session.titled", session_id = %id, title = %session.title, "Session titled");
        self.persist_sessions()?;
        Ok(true)
    }

    /// Remove a session from the list.
    ///
    /// Removing the active session leaves no session active; the caller is
    /// expected to select or create a replacement.
    pub fn remove(&mut self, id: &str) -> Result<Option<Session>> {
        let Some(pos) = self.sessions.iter().position(|s| s.id == id) else {
            return Ok(None);
        };
        let removed = self.sessions.remove(pos);
        if self.active.as_deref() == Some(id) {
            self.active = None;
        }
        self.persist_sessions()?;
        Ok(Some(removed))
    }

    fn persist_sessions(&mut self) -> Result<()> {
        let raw = serde_json::to_string(&self.sessions)?;
        self.kv.set(SESSIONS_KEY, raw)
    }

    fn persist_active(&mut self) -> Result<()> {
        match &self.active {
            Some(id) => self.kv.set(LAST_ACTIVE_KEY, id.clone()),
            None => self.kv.remove(LAST_ACTIVE_KEY),
        }
    }
}
