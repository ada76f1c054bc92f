//! Session list management.
//!
//! This module keeps the list of known chat sessions and the last-active
//! pointer in a local key-value store, under the keys `chatSessions` and
//! `lastActiveSession`.
//!
//! # Architecture
//!
//! - [`Session`]: descriptor of one conversation (id, creation time, title)
//! - [`SessionStore`]: the list plus the active pointer, persisted on change
//! - [`KeyValueStore`]: storage seam, with [`FileKvStore`] and [`MemoryKvStore`]
//!
//! # Example
//!
//! ```rust
//! use newschat::session::{MemoryKvStore, SessionStore, TitleRules};
//!
//! let store = SessionStore::load(Box::new(MemoryKvStore::new()), TitleRules::default()).unwrap();
//! assert!(store.is_empty());
//! assert!(store.active_id().is_none());
//! ```

mod kv;
mod store;

pub use kv::{FileKvStore, KeyValueStore, LAST_ACTIVE_KEY, MemoryKvStore, SESSIONS_KEY};
pub use store::{DEFAULT_TITLE, Session, SessionStore, TITLE_MAX_CHARS, TitleRules, derive_title};
