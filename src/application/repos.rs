//! Repository traits describing the remote engagement store.
//!
//! Three logical collections keyed by user + article (+ kind): reactions,
//! bookmarks, and per-article aggregate stats. The aggregate adjustments are
//! transactional read-modify-write operations: implementations must read the
//! current row (missing row == zero default), apply the floored delta, and
//! write back under a transaction so concurrent toggles on the same article
//! never lose updates.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::engagement::{
    ArticleStatsRecord, BookmarkMetadata, BookmarkRecord, ReactionKind, ReactionRecord,
};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct CreateReactionParams {
    pub user_id: String,
    pub article_id: String,
    pub kind: ReactionKind,
}

#[derive(Debug, Clone)]
pub struct CreateBookmarkParams {
    pub user_id: String,
    pub article_id: String,
    pub metadata: Option<BookmarkMetadata>,
}

#[async_trait]
pub trait ReactionsRepo: Send + Sync {
    /// All kinds this user has active on the article.
    async fn list_kinds(
        &self,
        user_id: &str,
        article_id: &str,
    ) -> Result<Vec<ReactionKind>, RepoError>;

    async fn find(
        &self,
        user_id: &str,
        article_id: &str,
        kind: ReactionKind,
    ) -> Result<Option<ReactionRecord>, RepoError>;

    async fn create(&self, params: CreateReactionParams) -> Result<ReactionRecord, RepoError>;

    /// Delete all records matching the triple; returns how many went away.
    async fn delete(
        &self,
        user_id: &str,
        article_id: &str,
        kind: ReactionKind,
    ) -> Result<u64, RepoError>;

    /// Remove every reaction on an article (CMS-side article deletion).
    async fn delete_for_article(&self, article_id: &str) -> Result<u64, RepoError>;
}

#[async_trait]
pub trait BookmarksRepo: Send + Sync {
    async fn find(
        &self,
        user_id: &str,
        article_id: &str,
    ) -> Result<Option<BookmarkRecord>, RepoError>;

    async fn list_article_ids(&self, user_id: &str) -> Result<Vec<String>, RepoError>;

    async fn create(&self, params: CreateBookmarkParams) -> Result<BookmarkRecord, RepoError>;

    async fn delete(&self, user_id: &str, article_id: &str) -> Result<u64, RepoError>;

    async fn delete_for_article(&self, article_id: &str) -> Result<u64, RepoError>;
}

#[async_trait]
pub trait StatsRepo: Send + Sync {
    async fn find(&self, article_id: &str) -> Result<Option<ArticleStatsRecord>, RepoError>;

    /// Adjust one reaction counter by ±1 under a per-article transaction,
    /// creating the aggregate row when absent. Returns the resulting record.
    async fn adjust_reaction(
        &self,
        article_id: &str,
        kind: ReactionKind,
        delta: i64,
    ) -> Result<ArticleStatsRecord, RepoError>;

    /// Adjust the bookmark counter by ±1, same transactional contract.
    async fn adjust_bookmarks(
        &self,
        article_id: &str,
        delta: i64,
    ) -> Result<ArticleStatsRecord, RepoError>;

    /// Increment the view counter by one.
    async fn record_view(&self, article_id: &str) -> Result<ArticleStatsRecord, RepoError>;

    /// Every article id with an aggregate row, for reconciliation sweeps.
    async fn list_article_ids(&self) -> Result<Vec<String>, RepoError>;

    async fn delete(&self, article_id: &str) -> Result<bool, RepoError>;
}
