//! CMS-backed article handlers plus the view counter.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;

use kaze_api_types::{ArticleDetail, ArticleListResponse, ArticleSummary, ViewResponse};

use crate::application::articles::{ArticleError, ArticleQuery, ArticleService, ContentError};
use crate::domain::identity::ArticleId;

use super::super::error::{ApiError, codes};
use super::super::models::{
    ArticleListQuery, RelatedQuery, article_to_detail, article_to_summary, domain_to_bad_request,
};
use super::super::state::ApiState;

const DEFAULT_RELATED_LIMIT: usize = 6;
const MAX_RELATED_LIMIT: usize = 20;

fn require_cms(state: &ApiState) -> Result<Arc<ArticleService>, ApiError> {
    state.articles.clone().ok_or_else(ApiError::cms_unavailable)
}

fn article_error_to_api(err: ArticleError) -> ApiError {
    match err {
        ArticleError::Content(ContentError::NotFound) => ApiError::not_found("article not found"),
        ArticleError::Content(inner) => ApiError::new(
            StatusCode::BAD_GATEWAY,
            codes::CMS_ERROR,
            "CMS request failed",
            Some(inner.to_string()),
        ),
    }
}

pub async fn list_articles(
    State(state): State<ApiState>,
    Query(query): Query<ArticleListQuery>,
) -> Result<Json<ArticleListResponse>, ApiError> {
    let articles = require_cms(&state)?;

    let page = articles
        .list(&ArticleQuery {
            limit: query.limit,
            offset: query.offset,
            category: query.category,
            search: query.q,
        })
        .await
        .map_err(article_error_to_api)?;

    Ok(Json(ArticleListResponse {
        articles: page
            .articles
            .into_iter()
            .map(article_to_summary)
            .collect(),
        total: page.total,
        offset: page.offset,
        limit: page.limit,
    }))
}

pub async fn get_article(
    State(state): State<ApiState>,
    Path(article_id): Path<String>,
) -> Result<Json<ArticleDetail>, ApiError> {
    let articles = require_cms(&state)?;
    let article = ArticleId::new(article_id).map_err(domain_to_bad_request)?;

    let (record, reading) = articles
        .detail(article.as_str())
        .await
        .map_err(article_error_to_api)?;

    Ok(Json(article_to_detail(record, reading)))
}

pub async fn related_articles(
    State(state): State<ApiState>,
    Path(article_id): Path<String>,
    Query(query): Query<RelatedQuery>,
) -> Result<Json<Vec<ArticleSummary>>, ApiError> {
    let articles = require_cms(&state)?;
    let article = ArticleId::new(article_id).map_err(domain_to_bad_request)?;
    let limit = query
        .limit
        .unwrap_or(DEFAULT_RELATED_LIMIT)
        .clamp(1, MAX_RELATED_LIMIT);

    let related = articles
        .related(article.as_str(), limit)
        .await
        .map_err(article_error_to_api)?;

    Ok(Json(related.into_iter().map(article_to_summary).collect()))
}

pub async fn record_view(
    State(state): State<ApiState>,
    Path(article_id): Path<String>,
) -> Result<Json<ViewResponse>, ApiError> {
    let article = ArticleId::new(article_id).map_err(domain_to_bad_request)?;

    let result = state.engagement.record_view(&article).await;

    Ok(Json(ViewResponse {
        view_count: result.view_count,
        degraded: result.degraded,
    }))
}
