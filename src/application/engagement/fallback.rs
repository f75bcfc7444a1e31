//! Local fallback snapshots.
//!
//! A synchronous key-value collaborator holding JSON-serialized arrays and
//! maps, keyed `<purpose>_<userId>_<articleId>`. It mirrors remote state on
//! successful reads (remote wins) and absorbs toggles outright when the
//! remote store path fails. Cache-aside: no consistency guarantee beyond
//! eventual convergence once the remote store is reachable again.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::engagement::{ReactionCounts, ReactionKind, StatsSnapshot, adjust_count};

#[derive(Debug, Error)]
pub enum FallbackError {
    #[error("fallback store io: {0}")]
    Io(#[from] std::io::Error),
    #[error("fallback store serialization: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Minimal synchronous KV surface the snapshots are built on. The
/// production implementation is a JSON file store; tests swap in whatever
/// they need.
pub trait FallbackStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), FallbackError>;
    fn remove(&self, key: &str) -> Result<(), FallbackError>;
    fn clear(&self) -> Result<(), FallbackError>;
}

fn reactions_key(user_id: &str, article_id: &str) -> String {
    format!("reactions_{user_id}_{article_id}")
}

fn reaction_counts_key(article_id: &str) -> String {
    format!("reaction_counts_{article_id}")
}

fn bookmarks_key(user_id: &str) -> String {
    format!("bookmarks_{user_id}")
}

fn article_stats_key(article_id: &str) -> String {
    format!("article_stats_{article_id}")
}

/// Typed view over the raw KV store. All writes are best-effort: a failed
/// write is logged and swallowed so the toggle surface never throws.
#[derive(Clone)]
pub struct SnapshotStore {
    store: Arc<dyn FallbackStore>,
}

impl SnapshotStore {
    pub fn new(store: Arc<dyn FallbackStore>) -> Self {
        Self { store }
    }

    fn read_json<T: serde::de::DeserializeOwned + Default>(&self, key: &str) -> T {
        let Some(raw) = self.store.get(key) else {
            return T::default();
        };
        match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(err) => {
                debug!(target = "kaze::fallback", key, error = %err, "discarding unreadable snapshot");
                T::default()
            }
        }
    }

    fn write_json<T: serde::Serialize>(&self, key: &str, value: &T) {
        let encoded = match serde_json::to_string(value) {
            Ok(encoded) => encoded,
            Err(err) => {
                warn!(target = "kaze::fallback", key, error = %err, "snapshot encode failed");
                return;
            }
        };
        if let Err(err) = self.store.set(key, &encoded) {
            warn!(target = "kaze::fallback", key, error = %err, "snapshot write failed");
        }
    }

    pub fn user_reactions(&self, user_id: &str, article_id: &str) -> Vec<ReactionKind> {
        self.read_json(&reactions_key(user_id, article_id))
    }

    pub fn set_user_reactions(&self, user_id: &str, article_id: &str, kinds: &[ReactionKind]) {
        self.write_json(&reactions_key(user_id, article_id), &kinds);
    }

    pub fn reaction_counts(&self, article_id: &str) -> ReactionCounts {
        self.read_json(&reaction_counts_key(article_id))
    }

    pub fn set_reaction_counts(&self, article_id: &str, counts: &ReactionCounts) {
        self.write_json(&reaction_counts_key(article_id), counts);
    }

    pub fn user_bookmarks(&self, user_id: &str) -> Vec<String> {
        self.read_json(&bookmarks_key(user_id))
    }

    pub fn set_user_bookmarks(&self, user_id: &str, article_ids: &[String]) {
        self.write_json(&bookmarks_key(user_id), &article_ids);
    }

    pub fn article_stats(&self, article_id: &str) -> StatsSnapshot {
        self.read_json(&article_stats_key(article_id))
    }

    pub fn set_article_stats(&self, article_id: &str, snapshot: &StatsSnapshot) {
        self.write_json(&article_stats_key(article_id), snapshot);
    }

    /// Local-only counter adjustment with the usual zero floor.
    pub fn adjust_reaction_count(&self, article_id: &str, kind: ReactionKind, delta: i64) -> ReactionCounts {
        let mut counts = self.reaction_counts(article_id);
        counts.set(kind, adjust_count(counts.get(kind), delta));
        self.set_reaction_counts(article_id, &counts);
        counts
    }

    pub fn adjust_bookmark_count(&self, article_id: &str, delta: i64) -> StatsSnapshot {
        let mut snapshot = self.article_stats(article_id);
        snapshot.bookmark_count = adjust_count(snapshot.bookmark_count, delta);
        self.set_article_stats(article_id, &snapshot);
        snapshot
    }

    pub fn bump_view_count(&self, article_id: &str) -> StatsSnapshot {
        let mut snapshot = self.article_stats(article_id);
        snapshot.view_count = snapshot.view_count.saturating_add(1);
        self.set_article_stats(article_id, &snapshot);
        snapshot
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::{FallbackError, FallbackStore};

    /// Plain in-memory store for unit tests.
    #[derive(Default)]
    pub struct MemoryStore {
        entries: Mutex<HashMap<String, String>>,
    }

    impl FallbackStore for MemoryStore {
        fn get(&self, key: &str) -> Option<String> {
            self.entries.lock().unwrap().get(key).cloned()
        }

        fn set(&self, key: &str, value: &str) -> Result<(), FallbackError> {
            self.entries
                .lock()
                .unwrap()
                .insert(key.to_string(), value.to_string());
            Ok(())
        }

        fn remove(&self, key: &str) -> Result<(), FallbackError> {
            self.entries.lock().unwrap().remove(key);
            Ok(())
        }

        fn clear(&self) -> Result<(), FallbackError> {
            self.entries.lock().unwrap().clear();
            Ok(())
        }
    }
}
