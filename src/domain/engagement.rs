//! Engagement records: reactions, bookmarks, and per-article aggregates.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

pub use kaze_api_types::{BookmarkMetadata, ReactionCounts, ReactionKind, ToggleAction};

/// One stored fact that a user reacted to an article with a given kind.
/// Unique per (user, article, kind).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionRecord {
    pub user_id: String,
    pub article_id: String,
    pub kind: ReactionKind,
    pub created_at: OffsetDateTime,
}

/// One stored bookmark, unique per (user, article), carrying an optional
/// metadata snapshot taken at bookmark time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookmarkRecord {
    pub user_id: String,
    pub article_id: String,
    pub metadata: Option<BookmarkMetadata>,
    pub created_at: OffsetDateTime,
}

/// Per-article aggregate tallies. Created lazily on first toggle; counts
/// are adjusted by ±1 per toggle and floored at zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleStatsRecord {
    pub article_id: String,
    pub reaction_counts: ReactionCounts,
    pub bookmark_count: u64,
    pub view_count: u64,
    pub updated_at: OffsetDateTime,
}

impl ArticleStatsRecord {
    /// Zero-valued default used when no aggregate row exists yet.
    pub fn empty(article_id: impl Into<String>) -> Self {
        Self {
            article_id: article_id.into(),
            reaction_counts: ReactionCounts::default(),
            bookmark_count: 0,
            view_count: 0,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    pub fn total_reactions(&self) -> u64 {
        self.reaction_counts.total()
    }
}

/// Locally persisted aggregate snapshot, the degraded stand-in for
/// [`ArticleStatsRecord`] when the remote store is out of reach.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StatsSnapshot {
    pub bookmark_count: u64,
    pub view_count: u64,
}

/// Apply a ±1 adjustment with the zero floor the aggregates guarantee.
pub fn adjust_count(current: u64, delta: i64) -> u64 {
    if delta.is_negative() {
        current.saturating_sub(delta.unsigned_abs())
    } else {
        current.saturating_add(delta as u64)
    }
}
