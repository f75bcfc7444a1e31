//! Article content as delivered by the headless CMS.
//!
//! The CMS owns authoring and storage; these records are read-side only.

use time::OffsetDateTime;

/// Full article body plus metadata, as returned by the CMS detail endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleRecord {
    pub id: String,
    pub title: String,
    pub description: String,
    pub content: String,
    pub categories: Vec<String>,
    pub eyecatch: Option<String>,
    pub published_at: Option<OffsetDateTime>,
    pub revised_at: Option<OffsetDateTime>,
}

/// One page of a CMS list query.
#[derive(Debug, Clone)]
pub struct ArticlePage {
    pub articles: Vec<ArticleRecord>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}
