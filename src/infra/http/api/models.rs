//! Query types and domain → wire conversions for the API handlers.

use serde::Deserialize;

use kaze_api_types::{ArticleDetail, ArticleSummary};

use crate::application::reading_time::{self, ReadingTime};
use crate::domain::articles::ArticleRecord;
use crate::domain::error::DomainError;

use super::error::ApiError;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct ArticleListQuery {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub category: Option<String>,
    pub q: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct RelatedQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct UserQuery {
    pub user_id: Option<String>,
}

pub fn domain_to_bad_request(err: DomainError) -> ApiError {
    ApiError::bad_request("invalid identifier", Some(err.to_string()))
}

pub fn article_to_summary(article: ArticleRecord) -> ArticleSummary {
    let reading = reading_time::estimate(&article.content);
    ArticleSummary {
        id: article.id,
        title: article.title,
        description: article.description,
        categories: article.categories,
        eyecatch: article.eyecatch,
        published_at: article.published_at,
        reading_minutes: reading.minutes,
    }
}

pub fn article_to_detail(article: ArticleRecord, reading: ReadingTime) -> ArticleDetail {
    ArticleDetail {
        id: article.id,
        title: article.title,
        description: article.description,
        content: article.content,
        categories: article.categories,
        eyecatch: article.eyecatch,
        published_at: article.published_at,
        revised_at: article.revised_at,
        reading_minutes: reading.minutes,
        reading_label: reading.label,
    }
}
