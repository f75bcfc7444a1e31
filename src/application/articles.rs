//! Read-side article access over the headless CMS.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::application::reading_time::{self, ReadingTime};
use crate::application::recommend::related_articles;
use crate::domain::articles::{ArticlePage, ArticleRecord};

/// Page size used when sweeping the whole CMS catalog.
const CATALOG_PAGE_SIZE: u64 = 100;
/// Candidate pool consulted when scoring related articles.
const RELATED_CANDIDATE_POOL: u64 = 100;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("cms request failed: {0}")]
    Transport(String),
    #[error("cms responded with status {status}")]
    Status { status: u16 },
    #[error("cms response could not be decoded: {0}")]
    Decode(String),
    #[error("article not found")]
    NotFound,
}

#[derive(Debug, Clone, Default)]
pub struct ArticleQuery {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub category: Option<String>,
    pub search: Option<String>,
}

/// Port to the CMS list API. Implemented over HTTP in `infra::cms`.
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn list_articles(&self, query: &ArticleQuery) -> Result<ArticlePage, ContentError>;
    async fn get_article(&self, id: &str) -> Result<ArticleRecord, ContentError>;
}

#[derive(Debug, Error)]
pub enum ArticleError {
    #[error(transparent)]
    Content(#[from] ContentError),
}

#[derive(Clone)]
pub struct ArticleService {
    source: Arc<dyn ContentSource>,
}

impl ArticleService {
    pub fn new(source: Arc<dyn ContentSource>) -> Self {
        Self { source }
    }

    pub async fn list(&self, query: &ArticleQuery) -> Result<ArticlePage, ArticleError> {
        self.source
            .list_articles(query)
            .await
            .map_err(ArticleError::from)
    }

    pub async fn detail(&self, id: &str) -> Result<(ArticleRecord, ReadingTime), ArticleError> {
        let article = self.source.get_article(id).await?;
        let reading = reading_time::estimate(&article.content);
        Ok((article, reading))
    }

    /// Related articles for `id`, scored against a bounded candidate pool.
    pub async fn related(&self, id: &str, limit: usize) -> Result<Vec<ArticleRecord>, ArticleError> {
        let current = self.source.get_article(id).await?;
        let candidates = self
            .source
            .list_articles(&ArticleQuery {
                limit: Some(RELATED_CANDIDATE_POOL),
                ..ArticleQuery::default()
            })
            .await?;
        Ok(related_articles(&current, &candidates.articles, limit))
    }

    /// Every article id the CMS currently knows, paged through in full.
    pub async fn all_ids(&self) -> Result<Vec<String>, ArticleError> {
        let mut ids = Vec::new();
        let mut offset = 0;

        loop {
            let page = self
                .source
                .list_articles(&ArticleQuery {
                    limit: Some(CATALOG_PAGE_SIZE),
                    offset: Some(offset),
                    ..ArticleQuery::default()
                })
                .await?;

            let fetched = page.articles.len() as u64;
            ids.extend(page.articles.into_iter().map(|article| article.id));

            offset += fetched;
            if fetched == 0 || offset >= page.total {
                break;
            }
        }

        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct PagedSource {
        ids: Vec<String>,
    }

    #[async_trait]
    impl ContentSource for PagedSource {
        async fn list_articles(&self, query: &ArticleQuery) -> Result<ArticlePage, ContentError> {
            let offset = query.offset.unwrap_or(0) as usize;
            let limit = query.limit.unwrap_or(10) as usize;
            let slice: Vec<ArticleRecord> = self
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
                    published_at: None,
                    revised_at: None,
                })
                .collect();
            Ok(ArticlePage {
                articles: slice,
                total: self.ids.len() as u64,
                offset: offset as u64,
                limit: limit as u64,
            })
        }

        async fn get_article(&self, id: &str) -> Result<ArticleRecord, ContentError> {
            if self.ids.iter().any(|known| known == id) {
                Ok(ArticleRecord {
                    id: id.to_string(),
                    title: id.to_string(),
                    description: String::new(),
                    content: String::new(),
                    categories: Vec::new(),
                    eyecatch: None,
                    published_at: None,
                    revised_at: None,
                })
            } else {
                Err(ContentError::NotFound)
            }
        }
    }

    #[tokio::test]
    async fn all_ids_pages_through_the_catalog() {
        let ids: Vec<String> = (0..250).map(|i| format!("a{i}")).collect();
        let service = ArticleService::new(Arc::new(PagedSource { ids: ids.clone() }));
        assert_eq!(service.all_ids().await.unwrap(), ids);
    }

    #[tokio::test]
    async fn all_ids_handles_empty_catalog() {
        let service = ArticleService::new(Arc::new(PagedSource { ids: Vec::new() }));
        assert!(service.all_ids().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn detail_attaches_reading_time() {
        let service = ArticleService::new(Arc::new(PagedSource {
            ids: vec!["b1".to_string()],
        }));
        let (article, reading) = service.detail("b1").await.unwrap();
        assert_eq!(article.id, "b1");
        assert_eq!(reading.minutes, 1);
    }
}
