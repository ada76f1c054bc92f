//! Local key-value persistence.
//!
//! A string-to-string store with the semantics of browser local storage:
//! values are opaque strings, and callers own their encoding.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use tracing::{debug, warn};

use crate::error::Result;

/// Key holding the JSON-encoded session list.
pub const SESSIONS_KEY: &str = "chatSessions";
/// Key holding the raw id of the last active session.
pub const LAST_ACTIVE_KEY: &str = "lastActiveSession";

/// String key-value storage.
pub trait KeyValueStore: Send + std::fmt::Debug {
    /// Read a value.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value, replacing any previous one.
    fn set(&mut self, key: &str, value: String) -> Result<()>;

    /// Delete a value if present.
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// In-memory store, lost on exit.
#[derive(Debug, Default, Clone)]
pub struct MemoryKvStore {
    entries: BTreeMap<String, String>,
}

impl MemoryKvStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKvStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> Result<()> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Store backed by a single JSON object on disk.
///
/// Every write rewrites the file through a temporary sibling and a rename,
/// so a crash never leaves a half-written store behind.
#[derive(Debug)]
pub struct FileKvStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileKvStore {
    /// Open the store at `path`, starting empty if the file does not exist.
    ///
    /// An unreadable or corrupt file is logged and treated as empty; it is
    /// overwritten on the next write.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "Discarding corrupt key-value store");
                BTreeMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        debug!(path = %path.display(), keys = entries.len(), "Opened key-value store");
        Ok(Self { path, entries })
    }

    fn flush(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(&self.entries)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for FileKvStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> Result<()> {
        self.entries.insert(key.to_string(), value);
        self.flush()
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        if self.entries.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");

        let mut store = FileKvStore::open(&path).unwrap();
        assert!(store.get(LAST_ACTIVE_KEY).unwrap().is_none());
        store.set(LAST_ACTIVE_KEY, "abc".into()).unwrap();

        let reopened = FileKvStore::open(&path).unwrap();
        assert_eq!(reopened.get(LAST_ACTIVE_KEY).unwrap().as_deref(), Some("abc"));
    }

    #[test]
    fn test_corrupt_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "{not json").unwrap();

        let mut store = FileKvStore::open(&path).unwrap();
        assert!(store.get(SESSIONS_KEY).unwrap().is_none());

        store.set(SESSIONS_KEY, "[]".into()).unwrap();
        let reopened = FileKvStore::open(&path).unwrap();
        assert_eq!(reopened.get(SESSIONS_KEY).unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn test_memory_store_remove() {
        let mut store = MemoryKvStore::new();
        store.set("k", "v".into()).unwrap();
        store.remove("k").unwrap();
        assert!(store.get("k").unwrap().is_none());
    }
}
