//! The engagement toggle engine.
//!
//! Flips reaction/bookmark membership for an anonymous session and keeps the
//! per-article aggregates consistent. The remote store is the source of
//! truth while reachable; every remote failure is absorbed here and turned
//! into a local-fallback mutation, so no method of [`EngagementService`]
//! ever returns an error. Callers read the `degraded` flag instead.

pub mod fallback;

use std::sync::Arc;

use metrics::counter;
use time::OffsetDateTime;
use tracing::warn;

use kaze_api_types::ToggleDirection;

use crate::application::repos::{
    BookmarksRepo, CreateBookmarkParams, CreateReactionParams, ReactionsRepo, RepoError, StatsRepo,
};
use crate::domain::engagement::{
    ArticleStatsRecord, BookmarkMetadata, ReactionCounts, ReactionKind, StatsSnapshot,
    ToggleAction,
};
use crate::domain::identity::{ArticleId, SessionId};

use fallback::{FallbackStore, SnapshotStore};

/// Handles to the three remote collections.
#[derive(Clone)]
pub struct RemoteStores {
    pub reactions: Arc<dyn ReactionsRepo>,
    pub bookmarks: Arc<dyn BookmarksRepo>,
    pub stats: Arc<dyn StatsRepo>,
}

/// Chosen once at startup and injected; there is no per-call capability
/// probing. `LocalOnly` serves deployments without a configured database.
#[derive(Clone)]
pub enum EngagementBackend {
    Remote(RemoteStores),
    LocalOnly,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionToggle {
    pub action: ToggleAction,
    pub kind: ReactionKind,
    pub counts: ReactionCounts,
    pub degraded: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionStatus {
    pub counts: ReactionCounts,
    pub user_reactions: Vec<ReactionKind>,
    pub degraded: bool,
    pub last_updated: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookmarkToggle {
    pub action: ToggleAction,
    pub bookmark_count: u64,
    pub degraded: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookmarkStatus {
    pub bookmarked: bool,
    pub bookmark_count: u64,
    pub view_count: u64,
    pub degraded: bool,
    pub last_updated: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookmarkList {
    pub article_ids: Vec<String>,
    pub degraded: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewCount {
    pub view_count: u64,
    pub degraded: bool,
}

#[derive(Clone)]
pub struct EngagementService {
    backend: EngagementBackend,
    snapshots: SnapshotStore,
}

impl EngagementService {
    pub fn new(backend: EngagementBackend, store: Arc<dyn FallbackStore>) -> Self {
        Self {
            backend,
            snapshots: SnapshotStore::new(store),
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self.backend, EngagementBackend::Remote(_))
    }

    /// Flip (or force, when `direction` is given) a reaction membership and
    /// its aggregate counter.
    pub async fn toggle_reaction(
        &self,
        user: &SessionId,
        article: &ArticleId,
        kind: ReactionKind,
        direction: Option<ToggleDirection>,
    ) -> ReactionToggle {
        counter!("kaze_toggle_total", "target" => "reaction").increment(1);
        match &self.backend {
            EngagementBackend::Remote(stores) => {
                match self
                    .remote_toggle_reaction(stores, user, article, kind, direction)
                    .await
                {
                    Ok(result) => result,
                    Err(err) => {
                        warn!(
                            target = "kaze::engagement",
                            user = %user,
                            article = %article,
                            kind = %kind,
                            error = %err,
                            "reaction toggle degraded to local fallback"
                        );
                        counter!("kaze_fallback_total", "target" => "reaction").increment(1);
                        self.local_toggle_reaction(user, article, kind, direction)
                    }
                }
            }
            EngagementBackend::LocalOnly => {
                self.local_toggle_reaction(user, article, kind, direction)
            }
        }
    }

    async fn remote_toggle_reaction(
        &self,
        stores: &RemoteStores,
        user: &SessionId,
        article: &ArticleId,
        kind: ReactionKind,
        direction: Option<ToggleDirection>,
    ) -> Result<ReactionToggle, RepoError> {
        let mut kinds = stores.reactions.list_kinds(user.as_str(), article.as_str()).await?;
        let present = kinds.contains(&kind);

        let (action, stats) = match (direction, present) {
            (Some(ToggleDirection::Add), true) => {
                (ToggleAction::AlreadyReacted, self.read_stats(stores, article).await?)
            }
            (Some(ToggleDirection::Remove), false) => {
                (ToggleAction::NotReacted, self.read_stats(stores, article).await?)
            }
            (_, true) => {
                stores
                    .reactions
                    .delete(user.as_str(), article.as_str(), kind)
                    .await?;
                kinds.retain(|k| *k != kind);
                let stats = stores
                    .stats
                    .adjust_reaction(article.as_str(), kind, -1)
                    .await?;
                (ToggleAction::Removed, stats)
            }
            (_, false) => {
                let created = stores
                    .reactions
                    .create(CreateReactionParams {
                        user_id: user.as_str().to_string(),
                        article_id: article.as_str().to_string(),
                        kind,
                    })
                    .await;
                match created {
                    Ok(_) => {
                        kinds.push(kind);
                        let stats = stores
                            .stats
                            .adjust_reaction(article.as_str(), kind, 1)
                            .await?;
                        (ToggleAction::Added, stats)
                    }
                    // A concurrent toggle won the insert race; report the
                    // duplicate as a no-op rather than an error.
                    Err(RepoError::Duplicate { .. }) => (
                        ToggleAction::AlreadyReacted,
                        self.read_stats(stores, article).await?,
                    ),
                    Err(err) => return Err(err),
                }
            }
        };

        self.snapshots
            .set_user_reactions(user.as_str(), article.as_str(), &kinds);
        self.snapshots
            .set_reaction_counts(article.as_str(), &stats.reaction_counts);

        Ok(ReactionToggle {
            action,
            kind,
            counts: stats.reaction_counts,
            degraded: false,
        })
    }

    fn local_toggle_reaction(
        &self,
        user: &SessionId,
        article: &ArticleId,
        kind: ReactionKind,
        direction: Option<ToggleDirection>,
    ) -> ReactionToggle {
        let mut kinds = self.snapshots.user_reactions(user.as_str(), article.as_str());
        let present = kinds.contains(&kind);

        let (action, counts) = match (direction, present) {
            (Some(ToggleDirection::Add), true) => (
                ToggleAction::AlreadyReacted,
                self.snapshots.reaction_counts(article.as_str()),
            ),
            (Some(ToggleDirection::Remove), false) => (
                ToggleAction::NotReacted,
                self.snapshots.reaction_counts(article.as_str()),
            ),
            (_, true) => {
                kinds.retain(|k| *k != kind);
                let counts = self
                    .snapshots
                    .adjust_reaction_count(article.as_str(), kind, -1);
                (ToggleAction::Removed, counts)
            }
            (_, false) => {
                kinds.push(kind);
                let counts = self
                    .snapshots
                    .adjust_reaction_count(article.as_str(), kind, 1);
                (ToggleAction::Added, counts)
            }
        };

        self.snapshots
            .set_user_reactions(user.as_str(), article.as_str(), &kinds);

        ReactionToggle {
            action,
            kind,
            counts,
            degraded: true,
        }
    }

    /// Current per-kind counts plus the caller's own active kinds.
    pub async fn reaction_status(
        &self,
        user: Option<&SessionId>,
        article: &ArticleId,
    ) -> ReactionStatus {
        match &self.backend {
            EngagementBackend::Remote(stores) => {
                match self.remote_reaction_status(stores, user, article).await {
                    Ok(status) => status,
                    Err(err) => {
                        warn!(
                            target = "kaze::engagement",
                            article = %article,
                            error = %err,
                            "reaction status degraded to local snapshot"
                        );
                        self.local_reaction_status(user, article)
                    }
                }
            }
            EngagementBackend::LocalOnly => self.local_reaction_status(user, article),
        }
    }

    async fn remote_reaction_status(
        &self,
        stores: &RemoteStores,
        user: Option<&SessionId>,
        article: &ArticleId,
    ) -> Result<ReactionStatus, RepoError> {
        let stats = self.read_stats(stores, article).await?;
        let user_reactions = match user {
            Some(user) => {
                let kinds = stores
                    .reactions
                    .list_kinds(user.as_str(), article.as_str())
                    .await?;
                self.snapshots
                    .set_user_reactions(user.as_str(), article.as_str(), &kinds);
                kinds
            }
            None => Vec::new(),
        };

        self.snapshots
            .set_reaction_counts(article.as_str(), &stats.reaction_counts);

        let last_updated =
            (stats.updated_at != OffsetDateTime::UNIX_EPOCH).then_some(stats.updated_at);

        Ok(ReactionStatus {
            counts: stats.reaction_counts,
            user_reactions,
            degraded: false,
            last_updated,
        })
    }

    fn local_reaction_status(
        &self,
        user: Option<&SessionId>,
        article: &ArticleId,
    ) -> ReactionStatus {
        ReactionStatus {
            counts: self.snapshots.reaction_counts(article.as_str()),
            user_reactions: user
                .map(|user| self.snapshots.user_reactions(user.as_str(), article.as_str()))
                .unwrap_or_default(),
            degraded: true,
            last_updated: None,
        }
    }

    /// Flip (or force) a bookmark membership and its aggregate counter.
    pub async fn toggle_bookmark(
        &self,
        user: &SessionId,
        article: &ArticleId,
        metadata: Option<BookmarkMetadata>,
        direction: Option<ToggleDirection>,
    ) -> BookmarkToggle {
        counter!("kaze_toggle_total", "target" => "bookmark").increment(1);
        match &self.backend {
            EngagementBackend::Remote(stores) => {
                match self
                    .remote_toggle_bookmark(stores, user, article, metadata, direction)
                    .await
                {
                    Ok(result) => result,
                    Err(err) => {
                        warn!(
                            target = "kaze::engagement",
                            user = %user,
                            article = %article,
                            error = %err,
                            "bookmark toggle degraded to local fallback"
                        );
                        counter!("kaze_fallback_total", "target" => "bookmark").increment(1);
                        self.local_toggle_bookmark(user, article, direction)
                    }
                }
            }
            EngagementBackend::LocalOnly => self.local_toggle_bookmark(user, article, direction),
        }
    }

    async fn remote_toggle_bookmark(
        &self,
        stores: &RemoteStores,
        user: &SessionId,
        article: &ArticleId,
        metadata: Option<BookmarkMetadata>,
        direction: Option<ToggleDirection>,
    ) -> Result<BookmarkToggle, RepoError> {
        let mut ids = stores.bookmarks.list_article_ids(user.as_str()).await?;
        let present = ids.iter().any(|id| id == article.as_str());

        let (action, stats) = match (direction, present) {
            (Some(ToggleDirection::Add), true) => (
                ToggleAction::AlreadyBookmarked,
                self.read_stats(stores, article).await?,
            ),
            (Some(ToggleDirection::Remove), false) => (
                ToggleAction::NotBookmarked,
                self.read_stats(stores, article).await?,
            ),
            (_, true) => {
                stores
                    .bookmarks
                    .delete(user.as_str(), article.as_str())
                    .await?;
                ids.retain(|id| id != article.as_str());
                let stats = stores.stats.adjust_bookmarks(article.as_str(), -1).await?;
                (ToggleAction::Removed, stats)
            }
            (_, false) => {
                let created = stores
                    .bookmarks
                    .create(CreateBookmarkParams {
                        user_id: user.as_str().to_string(),
                        article_id: article.as_str().to_string(),
                        metadata,
                    })
                    .await;
                match created {
                    Ok(_) => {
                        ids.push(article.as_str().to_string());
                        let stats = stores.stats.adjust_bookmarks(article.as_str(), 1).await?;
                        (ToggleAction::Added, stats)
                    }
                    Err(RepoError::Duplicate { .. }) => (
                        ToggleAction::AlreadyBookmarked,
                        self.read_stats(stores, article).await?,
                    ),
                    Err(err) => return Err(err),
                }
            }
        };

        self.snapshots.set_user_bookmarks(user.as_str(), &ids);
        self.sync_stats_snapshot(article, &stats);

        Ok(BookmarkToggle {
            action,
            bookmark_count: stats.bookmark_count,
            degraded: false,
        })
    }

    fn local_toggle_bookmark(
        &self,
        user: &SessionId,
        article: &ArticleId,
        direction: Option<ToggleDirection>,
    ) -> BookmarkToggle {
        let mut ids = self.snapshots.user_bookmarks(user.as_str());
        let present = ids.iter().any(|id| id == article.as_str());

        let (action, snapshot) = match (direction, present) {
            (Some(ToggleDirection::Add), true) => (
                ToggleAction::AlreadyBookmarked,
                self.snapshots.article_stats(article.as_str()),
            ),
            (Some(ToggleDirection::Remove), false) => (
                ToggleAction::NotBookmarked,
                self.snapshots.article_stats(article.as_str()),
            ),
            (_, true) => {
                ids.retain(|id| id != article.as_str());
                let snapshot = self.snapshots.adjust_bookmark_count(article.as_str(), -1);
                (ToggleAction::Removed, snapshot)
            }
            (_, false) => {
                ids.push(article.as_str().to_string());
                let snapshot = self.snapshots.adjust_bookmark_count(article.as_str(), 1);
                (ToggleAction::Added, snapshot)
            }
        };

        self.snapshots.set_user_bookmarks(user.as_str(), &ids);

        BookmarkToggle {
            action,
            bookmark_count: snapshot.bookmark_count,
            degraded: true,
        }
    }

    pub async fn bookmark_status(
        &self,
        user: Option<&SessionId>,
        article: &ArticleId,
    ) -> BookmarkStatus {
        match &self.backend {
            EngagementBackend::Remote(stores) => {
                match self.remote_bookmark_status(stores, user, article).await {
                    Ok(status) => status,
                    Err(err) => {
                        warn!(
                            target = "kaze::engagement",
                            article = %article,
                            error = %err,
                            "bookmark status degraded to local snapshot"
                        );
                        self.local_bookmark_status(user, article)
                    }
                }
            }
            EngagementBackend::LocalOnly => self.local_bookmark_status(user, article),
        }
    }

    async fn remote_bookmark_status(
        &self,
        stores: &RemoteStores,
        user: Option<&SessionId>,
        article: &ArticleId,
    ) -> Result<BookmarkStatus, RepoError> {
        let stats = self.read_stats(stores, article).await?;
        let bookmarked = match user {
            Some(user) => stores
                .bookmarks
                .find(user.as_str(), article.as_str())
                .await?
                .is_some(),
            None => false,
        };

        self.sync_stats_snapshot(article, &stats);

        let last_updated =
            (stats.updated_at != OffsetDateTime::UNIX_EPOCH).then_some(stats.updated_at);

        Ok(BookmarkStatus {
            bookmarked,
            bookmark_count: stats.bookmark_count,
            view_count: stats.view_count,
            degraded: false,
            last_updated,
        })
    }

    fn local_bookmark_status(
        &self,
        user: Option<&SessionId>,
        article: &ArticleId,
    ) -> BookmarkStatus {
        let snapshot = self.snapshots.article_stats(article.as_str());
        let bookmarked = user
            .map(|user| {
                self.snapshots
                    .user_bookmarks(user.as_str())
                    .iter()
                    .any(|id| id == article.as_str())
            })
            .unwrap_or(false);

        BookmarkStatus {
            bookmarked,
            bookmark_count: snapshot.bookmark_count,
            view_count: snapshot.view_count,
            degraded: true,
            last_updated: None,
        }
    }

    /// Every article id the user has bookmarked.
    pub async fn list_bookmarks(&self, user: &SessionId) -> BookmarkList {
        match &self.backend {
            EngagementBackend::Remote(stores) => {
                match stores.bookmarks.list_article_ids(user.as_str()).await {
                    Ok(ids) => {
                        self.snapshots.set_user_bookmarks(user.as_str(), &ids);
                        BookmarkList {
                            article_ids: ids,
                            degraded: false,
                        }
                    }
                    Err(err) => {
                        warn!(
                            target = "kaze::engagement",
                            user = %user,
                            error = %err,
                            "bookmark list degraded to local snapshot"
                        );
                        BookmarkList {
                            article_ids: self.snapshots.user_bookmarks(user.as_str()),
                            degraded: true,
                        }
                    }
                }
            }
            EngagementBackend::LocalOnly => BookmarkList {
                article_ids: self.snapshots.user_bookmarks(user.as_str()),
                degraded: true,
            },
        }
    }

    /// Count one page view against the article's aggregate.
    pub async fn record_view(&self, article: &ArticleId) -> ViewCount {
        match &self.backend {
            EngagementBackend::Remote(stores) => {
                match stores.stats.record_view(article.as_str()).await {
                    Ok(stats) => {
                        self.sync_stats_snapshot(article, &stats);
                        ViewCount {
                            view_count: stats.view_count,
                            degraded: false,
                        }
                    }
                    Err(err) => {
                        warn!(
                            target = "kaze::engagement",
                            article = %article,
                            error = %err,
                            "view recording degraded to local snapshot"
                        );
                        counter!("kaze_fallback_total", "target" => "view").increment(1);
                        ViewCount {
                            view_count: self.snapshots.bump_view_count(article.as_str()).view_count,
                            degraded: true,
                        }
                    }
                }
            }
            EngagementBackend::LocalOnly => ViewCount {
                view_count: self.snapshots.bump_view_count(article.as_str()).view_count,
                degraded: true,
            },
        }
    }

    async fn read_stats(
        &self,
        stores: &RemoteStores,
        article: &ArticleId,
    ) -> Result<ArticleStatsRecord, RepoError> {
        Ok(stores
            .stats
            .find(article.as_str())
            .await?
            .unwrap_or_else(|| ArticleStatsRecord::empty(article.as_str())))
    }

    fn sync_stats_snapshot(&self, article: &ArticleId, stats: &ArticleStatsRecord) {
        self.snapshots.set_article_stats(
            article.as_str(),
            &StatsSnapshot {
                bookmark_count: stats.bookmark_count,
                view_count: stats.view_count,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::fallback::testing::MemoryStore;
    use super::*;

    fn local_service() -> EngagementService {
        EngagementService::new(EngagementBackend::LocalOnly, Arc::new(MemoryStore::default()))
    }

    fn ids() -> (SessionId, ArticleId) {
        (
            SessionId::new("u1").unwrap(),
            ArticleId::new("b1").unwrap(),
        )
    }

    #[tokio::test]
    async fn local_only_toggle_round_trips() {
        let service = local_service();
        let (user, article) = ids();

        let first = service
            .toggle_reaction(&user, &article, ReactionKind::Like, None)
            .await;
        assert_eq!(first.action, ToggleAction::Added);
        assert_eq!(first.counts.like, 1);
        assert!(first.degraded);

        let second = service
            .toggle_reaction(&user, &article, ReactionKind::Like, None)
            .await;
        assert_eq!(second.action, ToggleAction::Removed);
        assert_eq!(second.counts.like, 0);
    }

    #[tokio::test]
    async fn local_only_forced_add_is_a_noop_when_present() {
        let service = local_service();
        let (user, article) = ids();

        service
            .toggle_reaction(&user, &article, ReactionKind::Like, Some(ToggleDirection::Add))
            .await;
        let dup = service
            .toggle_reaction(&user, &article, ReactionKind::Like, Some(ToggleDirection::Add))
            .await;
        assert_eq!(dup.action, ToggleAction::AlreadyReacted);
        assert_eq!(dup.counts.like, 1);
    }

    #[tokio::test]
    async fn local_only_remove_from_zero_stays_at_zero() {
        let service = local_service();
        let (user, article) = ids();

        let result = service
            .toggle_reaction(
                &user,
                &article,
                ReactionKind::Helpful,
                Some(ToggleDirection::Remove),
            )
            .await;
        assert_eq!(result.action, ToggleAction::NotReacted);
        assert_eq!(result.counts.helpful, 0);
    }

    #[tokio::test]
    async fn local_only_bookmark_status_reflects_toggle() {
        let service = local_service();
        let (user, article) = ids();

        let toggled = service.toggle_bookmark(&user, &article, None, None).await;
        assert_eq!(toggled.action, ToggleAction::Added);
        assert_eq!(toggled.bookmark_count, 1);

        let status = service.bookmark_status(Some(&user), &article).await;
        assert!(status.bookmarked);
        assert!(status.degraded);
        assert_eq!(status.bookmark_count, 1);

        let list = service.list_bookmarks(&user).await;
        assert_eq!(list.article_ids, vec!["b1".to_string()]);
    }

    #[tokio::test]
    async fn local_only_views_accumulate() {
        let service = local_service();
        let (_, article) = ids();

        assert_eq!(service.record_view(&article).await.view_count, 1);
        assert_eq!(service.record_view(&article).await.view_count, 2);
    }
}
