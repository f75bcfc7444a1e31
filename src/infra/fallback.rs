//! JSON-file-backed fallback store.
//!
//! The degraded-mode collaborator: a single JSON map file under a configured
//! directory, loaded once at startup and rewritten through a temp-file +
//! rename on every mutation. Writes are synchronous; the engagement layer
//! treats failures as non-fatal.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing::warn;

use crate::application::engagement::fallback::{FallbackError, FallbackStore};

const STORE_FILE: &str = "fallback.json";

pub struct JsonFileStore {
    path: PathBuf,
    entries: Mutex<HashMap<String, String>>,
}

impl JsonFileStore {
    /// Open (or create) the store under `directory`. An unreadable or
    /// corrupt store file is abandoned and replaced on the next write.
    pub fn open(directory: impl Into<PathBuf>) -> io::Result<Self> {
        let directory = directory.into();
        fs::create_dir_all(&directory)?;
        let path = directory.join(STORE_FILE);

        let entries = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(entries) => entries,
                Err(err) => {
                    warn!(
                        target = "kaze::fallback",
                        path = %path.display(),
                        error = %err,
                        "fallback store file is corrupt; starting empty"
                    );
                    HashMap::new()
                }
            },
            Err(err) if err.kind() == io::ErrorKind::NotFound => HashMap::new(),
            Err(err) => return Err(err),
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    fn persist(&self, entries: &HashMap<String, String>) -> Result<(), FallbackError> {
        let encoded = serde_json::to_vec_pretty(entries)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, encoded)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl FallbackStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), FallbackError> {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(key.to_string(), value.to_string());
        self.persist(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), FallbackError> {
        let mut entries = self.entries.lock().unwrap();
        entries.remove(key);
        self.persist(&entries)
    }

    fn clear(&self) -> Result<(), FallbackError> {
        let mut entries = self.entries.lock().unwrap();
        entries.clear();
        self.persist(&entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = JsonFileStore::open(dir.path()).unwrap();
            store.set("bookmarks_u1", r#"["b1"]"#).unwrap();
        }
        let store = JsonFileStore::open(dir.path()).unwrap();
        assert_eq!(store.get("bookmarks_u1").as_deref(), Some(r#"["b1"]"#));
    }

    #[test]
    fn clear_drops_everything() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        store.set("a", "1").unwrap();
        store.set("b", "2").unwrap();
        store.clear().unwrap();
        assert!(store.get("a").is_none());
        assert!(store.get("b").is_none());
    }

    #[test]
    fn corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(STORE_FILE), "{ nope").unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        assert!(store.get("anything").is_none());
    }

    #[test]
    fn remove_is_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        store.set("a", "1").unwrap();
        store.remove("a").unwrap();
        drop(store);
        let store = JsonFileStore::open(dir.path()).unwrap();
        assert!(store.get("a").is_none());
    }
}
