//! Bookmark toggle, status, and listing handlers.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};

use kaze_api_types::{
    BookmarkListResponse, BookmarkStatusResponse, BookmarkToggleRequest, BookmarkToggleResponse,
};

use crate::domain::identity::{ArticleId, SessionId};

use super::super::error::ApiError;
use super::super::models::{UserQuery, domain_to_bad_request};
use super::super::state::ApiState;

pub async fn toggle_bookmark(
    State(state): State<ApiState>,
    Path(article_id): Path<String>,
    Json(payload): Json<BookmarkToggleRequest>,
) -> Result<Response, ApiError> {
    let article = ArticleId::new(article_id).map_err(domain_to_bad_request)?;
    let user = SessionId::new(payload.user_id).map_err(domain_to_bad_request)?;

    if !state.rate_limiter.allow(user.as_str(), "bookmarks") {
        metrics::counter!("kaze_rate_limited_total", "route" => "bookmarks").increment(1);
        return Ok(ApiError::rate_limited(state.rate_limiter.retry_after_secs()));
    }

    let result = state
        .engagement
        .toggle_bookmark(&user, &article, payload.metadata, payload.action)
        .await;

    Ok(Json(BookmarkToggleResponse {
        success: true,
        action: result.action,
        bookmark_count: result.bookmark_count,
        degraded: result.degraded,
    })
    .into_response())
}

pub async fn bookmark_status(
    State(state): State<ApiState>,
    Path(article_id): Path<String>,
    Query(query): Query<UserQuery>,
) -> Result<Json<BookmarkStatusResponse>, ApiError> {
    let article = ArticleId::new(article_id).map_err(domain_to_bad_request)?;
    let user = query
        .user_id
        .map(SessionId::new)
        .transpose()
        .map_err(domain_to_bad_request)?;

    let status = state.engagement.bookmark_status(user.as_ref(), &article).await;

    Ok(Json(BookmarkStatusResponse {
        is_bookmarked: status.bookmarked,
        bookmark_count: status.bookmark_count,
        view_count: status.view_count,
        degraded: status.degraded,
        last_updated: status.last_updated,
    }))
}

pub async fn list_bookmarks(
    State(state): State<ApiState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<BookmarkListResponse>, ApiError> {
    let user = query
        .user_id
        .ok_or_else(|| ApiError::bad_request("user_id is required", None))
        .and_then(|raw| SessionId::new(raw).map_err(domain_to_bad_request))?;

    let list = state.engagement.list_bookmarks(&user).await;

    Ok(Json(BookmarkListResponse {
        article_ids: list.article_ids,
        degraded: list.degraded,
    }))
}
