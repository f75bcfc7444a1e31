//! HTTP client for the headless CMS list API.
//!
//! Speaks the microCMS wire format: API-key header authentication, a
//! `blogs` endpoint, and `{contents, totalCount, offset, limit}` list
//! envelopes with camelCase fields.

use std::time::Duration;

use async_trait::async_trait;
use metrics::counter;
use reqwest::StatusCode;
use serde::Deserialize;
use time::OffsetDateTime;
use url::Url;

use crate::application::articles::{ArticleQuery, ContentError, ContentSource};
use crate::config::CmsSettings;
use crate::domain::articles::{ArticlePage, ArticleRecord};
use crate::infra::error::InfraError;

const API_KEY_HEADER: &str = "X-MICROCMS-API-KEY";
const ARTICLES_ENDPOINT: &str = "blogs";

pub struct CmsClient {
    http: reqwest::Client,
    base: Url,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct CmsImage {
    url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CmsArticle {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    category: Vec<String>,
    #[serde(default)]
    eyecatch: Option<CmsImage>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    published_at: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    revised_at: Option<OffsetDateTime>,
}

impl From<CmsArticle> for ArticleRecord {
    fn from(article: CmsArticle) -> Self {
        Self {
            id: article.id,
            title: article.title,
            description: article.description,
            content: article.content,
            categories: article.category,
            eyecatch: article.eyecatch.map(|image| image.url),
            published_at: article.published_at,
            revised_at: article.revised_at,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CmsListResponse {
    contents: Vec<CmsArticle>,
    total_count: u64,
    offset: u64,
    limit: u64,
}

impl CmsClient {
    pub fn new(settings: &CmsSettings) -> Result<Self, InfraError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds.get()))
            .build()
            .map_err(|err| {
                InfraError::configuration(format!("failed to build cms http client: {err}"))
            })?;

        Ok(Self {
            http,
            base: settings.base_url.clone(),
            api_key: settings.api_key.clone(),
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ContentError> {
        let mut url = self.base.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| ContentError::Transport("cms base url cannot be a base".into()))?;
            path.pop_if_empty();
            for segment in segments {
                path.push(segment);
            }
        }
        Ok(url)
    }

    async fn fetch(&self, url: Url) -> Result<reqwest::Response, ContentError> {
        let response = self
            .http
            .get(url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(|err| {
                counter!("kaze_cms_request_total", "outcome" => "transport_error").increment(1);
                ContentError::Transport(err.to_string())
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            counter!("kaze_cms_request_total", "outcome" => "not_found").increment(1);
            return Err(ContentError::NotFound);
        }
        if !status.is_success() {
            counter!("kaze_cms_request_total", "outcome" => "status_error").increment(1);
            return Err(ContentError::Status {
                status: status.as_u16(),
            });
        }

        counter!("kaze_cms_request_total", "outcome" => "ok").increment(1);
        Ok(response)
    }
}

#[async_trait]
impl ContentSource for CmsClient {
    async fn list_articles(&self, query: &ArticleQuery) -> Result<ArticlePage, ContentError> {
        let mut url = self.endpoint(&[ARTICLES_ENDPOINT])?;
        {
            let mut params = url.query_pairs_mut();
            params.append_pair("orders", "-publishedAt");
            if let Some(limit) = query.limit {
                params.append_pair("limit", &limit.to_string());
            }
            if let Some(offset) = query.offset {
                params.append_pair("offset", &offset.to_string());
            }
            if let Some(category) = query.category.as_deref() {
                params.append_pair("filters", &format!("category[contains]{category}"));
            }
            if let Some(search) = query.search.as_deref() {
                params.append_pair("q", search);
            }
        }

        let response = self.fetch(url).await?;
        let body: CmsListResponse = response
            .json()
            .await
            .map_err(|err| ContentError::Decode(err.to_string()))?;

        Ok(ArticlePage {
            articles: body.contents.into_iter().map(ArticleRecord::from).collect(),
            total: body.total_count,
            offset: body.offset,
            limit: body.limit,
        })
    }

    async fn get_article(&self, id: &str) -> Result<ArticleRecord, ContentError> {
        let url = self.endpoint(&[ARTICLES_ENDPOINT, id])?;
        let response = self.fetch(url).await?;
        let article: CmsArticle = response
            .json()
            .await
            .map_err(|err| ContentError::Decode(err.to_string()))?;

        Ok(ArticleRecord::from(article))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_envelope_decodes_camel_case() {
        let raw = r#"{
            "contents": [{
                "id": "b1",
                "title": "Hello",
                "description": "first post",
                "content": "<p>body</p>",
                "category": ["rust"],
                "eyecatch": {"url": "https://img.example/b1.png", "height": 720, "width": 1280},
                "publishedAt": "2025-11-02T09:00:00Z",
                "revisedAt": "2025-11-03T09:00:00Z"
            }],
            "totalCount": 1,
            "offset": 0,
            "limit": 10
        }"#;

        let parsed: CmsListResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.total_count, 1);
        let article = ArticleRecord::from(parsed.contents.into_iter().next().unwrap());
        assert_eq!(article.id, "b1");
        assert_eq!(article.categories, vec!["rust".to_string()]);
        assert_eq!(
            article.eyecatch.as_deref(),
            Some("https://img.example/b1.png")
        );
        assert!(article.published_at.is_some());
    }

    #[test]
    fn missing_optional_fields_default() {
        let raw = r#"{"contents": [{"id": "b2"}], "totalCount": 1, "offset": 0, "limit": 10}"#;
        let parsed: CmsListResponse = serde_json::from_str(raw).unwrap();
        let article = ArticleRecord::from(parsed.contents.into_iter().next().unwrap());
        assert_eq!(article.title, "");
        assert!(article.categories.is_empty());
        assert!(article.eyecatch.is_none());
        assert!(article.published_at.is_none());
    }
}
