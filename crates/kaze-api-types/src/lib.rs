//! Wire types shared between the kaze server and API consumers.
//!
//! Everything here is plain serde data: no validation beyond shape, no
//! server-side invariants. The server converts these into its domain types
//! at the HTTP boundary.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// The fixed set of reaction kinds an anonymous reader can leave on an
/// article. Stored lowercase on the wire and in the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionKind {
    Like,
    Helpful,
    Insightful,
    Inspiring,
}

impl ReactionKind {
    pub const ALL: [ReactionKind; 4] = [
        ReactionKind::Like,
        ReactionKind::Helpful,
        ReactionKind::Insightful,
        ReactionKind::Inspiring,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ReactionKind::Like => "like",
            ReactionKind::Helpful => "helpful",
            ReactionKind::Insightful => "insightful",
            ReactionKind::Inspiring => "inspiring",
        }
    }
}

impl fmt::Display for ReactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownReactionKind(pub String);

impl fmt::Display for UnknownReactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown reaction kind `{}`", self.0)
    }
}

impl std::error::Error for UnknownReactionKind {}

impl FromStr for ReactionKind {
    type Err = UnknownReactionKind;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "like" => Ok(ReactionKind::Like),
            "helpful" => Ok(ReactionKind::Helpful),
            "insightful" => Ok(ReactionKind::Insightful),
            "inspiring" => Ok(ReactionKind::Inspiring),
            other => Err(UnknownReactionKind(other.to_string())),
        }
    }
}

/// Per-kind reaction tallies for one article. Counts are floored at zero by
/// the server; negative values never appear on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReactionCounts {
    pub like: u64,
    pub helpful: u64,
    pub insightful: u64,
    pub inspiring: u64,
}

impl ReactionCounts {
    pub fn get(&self, kind: ReactionKind) -> u64 {
        match kind {
            ReactionKind::Like => self.like,
            ReactionKind::Helpful => self.helpful,
            ReactionKind::Insightful => self.insightful,
            ReactionKind::Inspiring => self.inspiring,
        }
    }

    pub fn set(&mut self, kind: ReactionKind, value: u64) {
        match kind {
            ReactionKind::Like => self.like = value,
            ReactionKind::Helpful => self.helpful = value,
            ReactionKind::Insightful => self.insightful = value,
            ReactionKind::Inspiring => self.inspiring = value,
        }
    }

    pub fn total(&self) -> u64 {
        self.like + self.helpful + self.insightful + self.inspiring
    }
}

/// What a toggle request ended up doing. Duplicate adds and removes of
/// absent memberships are reported, not errored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToggleAction {
    Added,
    Removed,
    AlreadyReacted,
    NotReacted,
    AlreadyBookmarked,
    NotBookmarked,
}

/// Explicit direction for a toggle request; omitted means "flip".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToggleDirection {
    Add,
    Remove,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactionToggleRequest {
    pub user_id: String,
    pub reaction_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<ToggleDirection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactionToggleResponse {
    pub success: bool,
    pub action: ToggleAction,
    pub reaction_type: ReactionKind,
    pub reaction_counts: ReactionCounts,
    pub total_reactions: u64,
    /// True when the remote store was unavailable and only the local
    /// fallback snapshot was updated.
    pub degraded: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactionStatusResponse {
    pub reaction_counts: ReactionCounts,
    pub user_reactions: Vec<ReactionKind>,
    pub total_reactions: u64,
    pub degraded: bool,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub last_updated: Option<OffsetDateTime>,
}

/// Snapshot of article metadata stored alongside a bookmark so saved lists
/// can render without a CMS round trip.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookmarkMetadata {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eyecatch: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookmarkToggleRequest {
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<ToggleDirection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BookmarkMetadata>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookmarkToggleResponse {
    pub success: bool,
    pub action: ToggleAction,
    pub bookmark_count: u64,
    pub degraded: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookmarkStatusResponse {
    pub is_bookmarked: bool,
    pub bookmark_count: u64,
    pub view_count: u64,
    pub degraded: bool,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub last_updated: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookmarkListResponse {
    pub article_ids: Vec<String>,
    pub degraded: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewResponse {
    pub view_count: u64,
    pub degraded: bool,
}

/// Event categories the CMS webhook delivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WebhookEventType {
    New,
    Edit,
    Delete,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookPayload {
    pub service: String,
    pub api: String,
    pub id: String,
    #[serde(rename = "type")]
    pub event: WebhookEventType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookResponse {
    pub success: bool,
    /// `deleted`, `not_found`, or `ignored`.
    pub action: String,
    pub article_id: Option<String>,
}

/// Result of a stats/CMS reconciliation sweep.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CleanupSummary {
    pub stats_total: u64,
    pub cms_total: u64,
    pub orphaned: u64,
    pub deleted: u64,
    pub failed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleSummary {
    pub id: String,
    pub title: String,
    pub description: String,
    pub categories: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eyecatch: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub published_at: Option<OffsetDateTime>,
    pub reading_minutes: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleDetail {
    pub id: String,
    pub title: String,
    pub description: String,
    pub content: String,
    pub categories: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eyecatch: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub published_at: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub revised_at: Option<OffsetDateTime>,
    pub reading_minutes: u32,
    pub reading_label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleListResponse {
    pub articles: Vec<ArticleSummary>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}
