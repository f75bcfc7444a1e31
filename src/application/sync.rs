//! CMS ↔ stats reconciliation.
//!
//! Article deletion happens in the CMS, which knows nothing about the
//! engagement store. Two paths keep the stats collection from accumulating
//! rows for dead articles: the CMS delete webhook, and a full reconciliation
//! sweep run on demand (HTTP or the `cleanup` CLI subcommand).

use std::collections::HashSet;
use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use kaze_api_types::{CleanupSummary, WebhookEventType, WebhookPayload};

use crate::application::articles::{ArticleError, ArticleService};
use crate::application::repos::{BookmarksRepo, ReactionsRepo, RepoError, StatsRepo};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Content(#[from] ArticleError),
}

/// What a webhook delivery amounted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// The article's stats row and membership records are gone.
    Deleted { article_id: String },
    /// Delete event for an article we had no stats for.
    NotFound { article_id: String },
    /// Not a blog-delete event; acknowledged and skipped.
    Ignored,
}

#[derive(Clone)]
pub struct StatsSyncService {
    stats: Arc<dyn StatsRepo>,
    reactions: Arc<dyn ReactionsRepo>,
    bookmarks: Arc<dyn BookmarksRepo>,
}

impl StatsSyncService {
    pub fn new(
        stats: Arc<dyn StatsRepo>,
        reactions: Arc<dyn ReactionsRepo>,
        bookmarks: Arc<dyn BookmarksRepo>,
    ) -> Self {
        Self {
            stats,
            reactions,
            bookmarks,
        }
    }

    /// Act on a CMS webhook delivery. Only `blogs` delete events mutate
    /// anything; everything else is acknowledged as ignored.
    pub async fn handle_webhook(&self, payload: &WebhookPayload) -> Result<WebhookOutcome, SyncError> {
        if payload.api != "blogs" || payload.event != WebhookEventType::Delete {
            info!(
                target = "kaze::sync",
                api = %payload.api,
                event = ?payload.event,
                "webhook acknowledged without action"
            );
            return Ok(WebhookOutcome::Ignored);
        }

        let article_id = payload.id.as_str();
        let had_stats = self.purge_article(article_id).await?;

        if had_stats {
            info!(target = "kaze::sync", article = article_id, "purged stats for deleted article");
            Ok(WebhookOutcome::Deleted {
                article_id: article_id.to_string(),
            })
        } else {
            Ok(WebhookOutcome::NotFound {
                article_id: article_id.to_string(),
            })
        }
    }

    /// Delete stats orphaned by CMS-side article deletions. One article at a
    /// time; individual failures are counted, not fatal to the sweep.
    pub async fn cleanup(&self, articles: &ArticleService) -> Result<CleanupSummary, SyncError> {
        let stats_ids = self.stats.list_article_ids().await?;
        let cms_ids: HashSet<String> = articles.all_ids().await?.into_iter().collect();

        let orphaned: Vec<&String> = stats_ids
            .iter()
            .filter(|id| !cms_ids.contains(id.as_str()))
            .collect();

        let mut summary = CleanupSummary {
            stats_total: stats_ids.len() as u64,
            cms_total: cms_ids.len() as u64,
            orphaned: orphaned.len() as u64,
            ..CleanupSummary::default()
        };

        for article_id in orphaned {
            match self.purge_article(article_id).await {
                Ok(_) => summary.deleted += 1,
                Err(err) => {
                    warn!(
                        target = "kaze::sync",
                        article = %article_id,
                        error = %err,
                        "failed to purge orphaned article"
                    );
                    summary.failed += 1;
                }
            }
        }

        info!(
            target = "kaze::sync",
            stats_total = summary.stats_total,
            cms_total = summary.cms_total,
            orphaned = summary.orphaned,
            deleted = summary.deleted,
            failed = summary.failed,
            "cleanup sweep finished"
        );

        Ok(summary)
    }

    async fn purge_article(&self, article_id: &str) -> Result<bool, SyncError> {
        let had_stats = self.stats.delete(article_id).await?;
        self.reactions.delete_for_article(article_id).await?;
        self.bookmarks.delete_for_article(article_id).await?;
        Ok(had_stats)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use time::OffsetDateTime;

    use super::*;
    use crate::application::articles::{ArticleQuery, ContentError, ContentSource};
    use crate::application::repos::{CreateBookmarkParams, CreateReactionParams};
    use crate::domain::articles::{ArticlePage, ArticleRecord};
    use crate::domain::engagement::{
        ArticleStatsRecord, BookmarkRecord, ReactionKind, ReactionRecord,
    };

    #[derive(Default)]
    struct RecordingStatsRepo {
        ids: Vec<String>,
        deleted: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl StatsRepo for RecordingStatsRepo {
        async fn find(&self, _article_id: &str) -> Result<Option<ArticleStatsRecord>, RepoError> {
            Ok(None)
        }

        async fn adjust_reaction(
            &self,
            _article_id: &str,
            _kind: ReactionKind,
            _delta: i64,
        ) -> Result<ArticleStatsRecord, RepoError> {
            unreachable!("not used in these tests")
        }

        async fn adjust_bookmarks(
            &self,
            _article_id: &str,
            _delta: i64,
        ) -> Result<ArticleStatsRecord, RepoError> {
            unreachable!("not used in these tests")
        }

        async fn record_view(&self, _article_id: &str) -> Result<ArticleStatsRecord, RepoError> {
            unreachable!("not used in these tests")
        }

        async fn list_article_ids(&self) -> Result<Vec<String>, RepoError> {
            Ok(self.ids.clone())
        }

        async fn delete(&self, article_id: &str) -> Result<bool, RepoError> {
            self.deleted.lock().unwrap().push(article_id.to_string());
            Ok(self.ids.iter().any(|id| id == article_id))
        }
    }

    #[derive(Default)]
    struct NoopReactionsRepo;

    #[async_trait]
    impl ReactionsRepo for NoopReactionsRepo {
        async fn list_kinds(
            &self,
            _user_id: &str,
            _article_id: &str,
        ) -> Result<Vec<ReactionKind>, RepoError> {
            Ok(Vec::new())
        }

        async fn find(
            &self,
            _user_id: &str,
            _article_id: &str,
            _kind: ReactionKind,
        ) -> Result<Option<ReactionRecord>, RepoError> {
            Ok(None)
        }

        async fn create(&self, _params: CreateReactionParams) -> Result<ReactionRecord, RepoError> {
            unreachable!("not used in these tests")
        }

        async fn delete(
            &self,
            _user_id: &str,
            _article_id: &str,
            _kind: ReactionKind,
        ) -> Result<u64, RepoError> {
            Ok(0)
        }

        async fn delete_for_article(&self, _article_id: &str) -> Result<u64, RepoError> {
            Ok(0)
        }
    }

    #[derive(Default)]
    struct NoopBookmarksRepo;

    #[async_trait]
    impl BookmarksRepo for NoopBookmarksRepo {
        async fn find(
            &self,
            _user_id: &str,
            _article_id: &str,
        ) -> Result<Option<BookmarkRecord>, RepoError> {
            Ok(None)
        }

        async fn list_article_ids(&self, _user_id: &str) -> Result<Vec<String>, RepoError> {
            Ok(Vec::new())
        }

        async fn create(&self, _params: CreateBookmarkParams) -> Result<BookmarkRecord, RepoError> {
            unreachable!("not used in these tests")
        }

        async fn delete(&self, _user_id: &str, _article_id: &str) -> Result<u64, RepoError> {
            Ok(0)
        }

        async fn delete_for_article(&self, _article_id: &str) -> Result<u64, RepoError> {
            Ok(0)
        }
    }

    struct FixedSource {
        ids: Vec<String>,
    }

    #[async_trait]
    impl ContentSource for FixedSource {
        async fn list_articles(&self, query: &ArticleQuery) -> Result<ArticlePage, ContentError> {
            let offset = query.offset.unwrap_or(0) as usize;
            let limit = query.limit.unwrap_or(10) as usize;
            let articles = self
                .ids
                .iter()
                .skip(offset)
                .take(limit)
                .map(|id| ArticleRecord {
                    id: id.clone(),
                    title: id.clone(),
                    description: String::new(),
                    content: String::new(),
                    categories: Vec::new(),
                    eyecatch: None,
                    published_at: Some(OffsetDateTime::UNIX_EPOCH),
                    revised_at: None,
                })
                .collect();
            Ok(ArticlePage {
                articles,
                total: self.ids.len() as u64,
                offset: offset as u64,
                limit: limit as u64,
            })
        }

        async fn get_article(&self, _id: &str) -> Result<ArticleRecord, ContentError> {
            Err(ContentError::NotFound)
        }
    }

    fn service(stats: Arc<RecordingStatsRepo>) -> StatsSyncService {
        StatsSyncService::new(
            stats,
            Arc::new(NoopReactionsRepo),
            Arc::new(NoopBookmarksRepo),
        )
    }

    fn payload(api: &str, event: WebhookEventType, id: &str) -> WebhookPayload {
        WebhookPayload {
            service: "demo".to_string(),
            api: api.to_string(),
            id: id.to_string(),
            event,
        }
    }

    #[tokio::test]
    async fn webhook_ignores_non_delete_events() {
        let stats = Arc::new(RecordingStatsRepo::default());
        let sync = service(stats.clone());

        let outcome = sync
            .handle_webhook(&payload("blogs", WebhookEventType::Edit, "b1"))
            .await
            .unwrap();
        assert_eq!(outcome, WebhookOutcome::Ignored);
        assert!(stats.deleted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn webhook_purges_on_blog_delete() {
        let stats = Arc::new(RecordingStatsRepo {
            ids: vec!["b1".to_string()],
            ..RecordingStatsRepo::default()
        });
        let sync = service(stats.clone());

        let outcome = sync
            .handle_webhook(&payload("blogs", WebhookEventType::Delete, "b1"))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            WebhookOutcome::Deleted {
                article_id: "b1".to_string()
            }
        );
        assert_eq!(stats.deleted.lock().unwrap().as_slice(), ["b1".to_string()]);
    }

    #[tokio::test]
    async fn cleanup_removes_only_orphans() {
        let stats = Arc::new(RecordingStatsRepo {
            ids: vec!["kept".to_string(), "orphan".to_string()],
            ..RecordingStatsRepo::default()
        });
        let sync = service(stats.clone());
        let articles = ArticleService::new(Arc::new(FixedSource {
            ids: vec!["kept".to_string()],
        }));

        let summary = sync.cleanup(&articles).await.unwrap();
        assert_eq!(summary.stats_total, 2);
        assert_eq!(summary.cms_total, 1);
        assert_eq!(summary.orphaned, 1);
        assert_eq!(summary.deleted, 1);
        assert_eq!(summary.failed, 0);
        assert_eq!(
            stats.deleted.lock().unwrap().as_slice(),
            ["orphan".to_string()]
        );
    }
}
