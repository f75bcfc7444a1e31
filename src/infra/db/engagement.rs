//! Repository implementations for the three engagement collections.
//!
//! Aggregate adjustments follow the transactional read-modify-write contract
//! of `StatsRepo`: the row is read `FOR UPDATE` (absent row reads as the
//! zero-valued default), mutated in memory with the zero floor applied, and
//! upserted before commit. Row locking serializes toggles per article only;
//! different articles never contend.

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::application::repos::{
    BookmarksRepo, CreateBookmarkParams, CreateReactionParams, ReactionsRepo, RepoError, StatsRepo,
};
use crate::domain::engagement::{
    ArticleStatsRecord, BookmarkMetadata, BookmarkRecord, ReactionCounts, ReactionKind,
    ReactionRecord, adjust_count,
};

use super::{PostgresRepositories, map_sqlx_error};

fn parse_kind(raw: &str) -> Result<ReactionKind, RepoError> {
    raw.parse::<ReactionKind>()
        .map_err(RepoError::from_persistence)
}

fn non_negative(value: i64) -> u64 {
    value.max(0) as u64
}

fn to_db_count(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[derive(sqlx::FromRow)]
struct ReactionRow {
    user_id: String,
    article_id: String,
    kind: String,
    created_at: OffsetDateTime,
}

impl ReactionRow {
    fn into_record(self) -> Result<ReactionRecord, RepoError> {
        Ok(ReactionRecord {
            kind: parse_kind(&self.kind)?,
            user_id: self.user_id,
            article_id: self.article_id,
            created_at: self.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct BookmarkRow {
    user_id: String,
    article_id: String,
    title: Option<String>,
    categories: Option<Vec<String>>,
    eyecatch: Option<String>,
    created_at: OffsetDateTime,
}

impl From<BookmarkRow> for BookmarkRecord {
    fn from(row: BookmarkRow) -> Self {
        let metadata = match (&row.title, &row.categories, &row.eyecatch) {
            (None, None, None) => None,
            _ => Some(BookmarkMetadata {
                title: row.title.unwrap_or_default(),
                categories: row.categories.unwrap_or_default(),
                eyecatch: row.eyecatch,
            }),
        };
        Self {
            user_id: row.user_id,
            article_id: row.article_id,
            metadata,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct StatsRow {
    article_id: String,
    like_count: i64,
    helpful_count: i64,
    insightful_count: i64,
    inspiring_count: i64,
    bookmark_count: i64,
    view_count: i64,
    updated_at: OffsetDateTime,
}

impl From<StatsRow> for ArticleStatsRecord {
    fn from(row: StatsRow) -> Self {
        Self {
            article_id: row.article_id,
            reaction_counts: ReactionCounts {
                like: non_negative(row.like_count),
                helpful: non_negative(row.helpful_count),
                insightful: non_negative(row.insightful_count),
                inspiring: non_negative(row.inspiring_count),
            },
            bookmark_count: non_negative(row.bookmark_count),
            view_count: non_negative(row.view_count),
            updated_at: row.updated_at,
        }
    }
}

const STATS_COLUMNS: &str = "article_id, like_count, helpful_count, insightful_count, \
     inspiring_count, bookmark_count, view_count, updated_at";

#[async_trait]
impl ReactionsRepo for PostgresRepositories {
    async fn list_kinds(
        &self,
        user_id: &str,
        article_id: &str,
    ) -> Result<Vec<ReactionKind>, RepoError> {
        let rows: Vec<String> = sqlx::query_scalar(
            "SELECT kind FROM reactions WHERE user_id = $1 AND article_id = $2 ORDER BY created_at",
        )
        .bind(user_id)
        .bind(article_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        rows.iter().map(|raw| parse_kind(raw)).collect()
    }

    async fn find(
        &self,
        user_id: &str,
        article_id: &str,
        kind: ReactionKind,
    ) -> Result<Option<ReactionRecord>, RepoError> {
        let row: Option<ReactionRow> = sqlx::query_as(
            "SELECT user_id, article_id, kind, created_at FROM reactions \
             WHERE user_id = $1 AND article_id = $2 AND kind = $3",
        )
        .bind(user_id)
        .bind(article_id)
        .bind(kind.as_str())
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        row.map(ReactionRow::into_record).transpose()
    }

    async fn create(&self, params: CreateReactionParams) -> Result<ReactionRecord, RepoError> {
        let row: ReactionRow = sqlx::query_as(
            "INSERT INTO reactions (user_id, article_id, kind) VALUES ($1, $2, $3) \
             RETURNING user_id, article_id, kind, created_at",
        )
        .bind(&params.user_id)
        .bind(&params.article_id)
        .bind(params.kind.as_str())
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        row.into_record()
    }

    async fn delete(
        &self,
        user_id: &str,
        article_id: &str,
        kind: ReactionKind,
    ) -> Result<u64, RepoError> {
        let result = sqlx::query(
            "DELETE FROM reactions WHERE user_id = $1 AND article_id = $2 AND kind = $3",
        )
        .bind(user_id)
        .bind(article_id)
        .bind(kind.as_str())
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }

    async fn delete_for_article(&self, article_id: &str) -> Result<u64, RepoError> {
        let result = sqlx::query("DELETE FROM reactions WHERE article_id = $1")
            .bind(article_id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl BookmarksRepo for PostgresRepositories {
    async fn find(
        &self,
        user_id: &str,
        article_id: &str,
    ) -> Result<Option<BookmarkRecord>, RepoError> {
        let row: Option<BookmarkRow> = sqlx::query_as(
            "SELECT user_id, article_id, title, categories, eyecatch, created_at \
             FROM bookmarks WHERE user_id = $1 AND article_id = $2",
        )
        .bind(user_id)
        .bind(article_id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(BookmarkRecord::from))
    }

    async fn list_article_ids(&self, user_id: &str) -> Result<Vec<String>, RepoError> {
        sqlx::query_scalar(
            "SELECT article_id FROM bookmarks WHERE user_id = $1 ORDER BY created_at",
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn create(&self, params: CreateBookmarkParams) -> Result<BookmarkRecord, RepoError> {
        let (title, categories, eyecatch) = match params.metadata {
            Some(metadata) => (
                Some(metadata.title),
                Some(metadata.categories),
                metadata.eyecatch,
            ),
            None => (None, None, None),
        };

        let row: BookmarkRow = sqlx::query_as(
            "INSERT INTO bookmarks (user_id, article_id, title, categories, eyecatch) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING user_id, article_id, title, categories, eyecatch, created_at",
        )
        .bind(&params.user_id)
        .bind(&params.article_id)
        .bind(title)
        .bind(categories)
        .bind(eyecatch)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(BookmarkRecord::from(row))
    }

    async fn delete(&self, user_id: &str, article_id: &str) -> Result<u64, RepoError> {
        let result = sqlx::query("DELETE FROM bookmarks WHERE user_id = $1 AND article_id = $2")
            .bind(user_id)
            .bind(article_id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }

    async fn delete_for_article(&self, article_id: &str) -> Result<u64, RepoError> {
        let result = sqlx::query("DELETE FROM bookmarks WHERE article_id = $1")
            .bind(article_id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }
}

impl PostgresRepositories {
    /// Shared read-modify-write path for all aggregate mutations.
    async fn mutate_stats<F>(
        &self,
        article_id: &str,
        mutate: F,
    ) -> Result<ArticleStatsRecord, RepoError>
    where
        F: FnOnce(&mut ArticleStatsRecord) + Send,
    {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        let row: Option<StatsRow> = sqlx::query_as(&format!(
            "SELECT {STATS_COLUMNS} FROM article_stats WHERE article_id = $1 FOR UPDATE"
        ))
        .bind(article_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        let mut stats = row
            .map(ArticleStatsRecord::from)
            .unwrap_or_else(|| ArticleStatsRecord::empty(article_id));

        mutate(&mut stats);
        stats.updated_at = OffsetDateTime::now_utc();

        sqlx::query(
            "INSERT INTO article_stats (article_id, like_count, helpful_count, \
             insightful_count, inspiring_count, bookmark_count, view_count, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             ON CONFLICT (article_id) DO UPDATE SET \
                 like_count = EXCLUDED.like_count, \
                 helpful_count = EXCLUDED.helpful_count, \
                 insightful_count = EXCLUDED.insightful_count, \
                 inspiring_count = EXCLUDED.inspiring_count, \
                 bookmark_count = EXCLUDED.bookmark_count, \
                 view_count = EXCLUDED.view_count, \
                 updated_at = EXCLUDED.updated_at",
        )
        .bind(article_id)
        .bind(to_db_count(stats.reaction_counts.like))
        .bind(to_db_count(stats.reaction_counts.helpful))
        .bind(to_db_count(stats.reaction_counts.insightful))
        .bind(to_db_count(stats.reaction_counts.inspiring))
        .bind(to_db_count(stats.bookmark_count))
        .bind(to_db_count(stats.view_count))
        .bind(stats.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(stats)
    }
}

#[async_trait]
impl StatsRepo for PostgresRepositories {
    async fn find(&self, article_id: &str) -> Result<Option<ArticleStatsRecord>, RepoError> {
        let row: Option<StatsRow> = sqlx::query_as(&format!(
            "SELECT {STATS_COLUMNS} FROM article_stats WHERE article_id = $1"
        ))
        .bind(article_id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(ArticleStatsRecord::from))
    }

    async fn adjust_reaction(
        &self,
        article_id: &str,
        kind: ReactionKind,
        delta: i64,
    ) -> Result<ArticleStatsRecord, RepoError> {
        self.mutate_stats(article_id, |stats| {
            let current = stats.reaction_counts.get(kind);
            stats.reaction_counts.set(kind, adjust_count(current, delta));
        })
        .await
    }

    async fn adjust_bookmarks(
        &self,
        article_id: &str,
        delta: i64,
    ) -> Result<ArticleStatsRecord, RepoError> {
        self.mutate_stats(article_id, |stats| {
            stats.bookmark_count = adjust_count(stats.bookmark_count, delta);
        })
        .await
    }

    async fn record_view(&self, article_id: &str) -> Result<ArticleStatsRecord, RepoError> {
        self.mutate_stats(article_id, |stats| {
            stats.view_count = stats.view_count.saturating_add(1);
        })
        .await
    }

    async fn list_article_ids(&self) -> Result<Vec<String>, RepoError> {
        sqlx::query_scalar("SELECT article_id FROM article_stats ORDER BY article_id")
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)
    }

    async fn delete(&self, article_id: &str) -> Result<bool, RepoError> {
        let result = sqlx::query("DELETE FROM article_stats WHERE article_id = $1")
            .bind(article_id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }
}
