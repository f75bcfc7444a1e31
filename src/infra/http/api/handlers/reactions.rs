//! Reaction toggle and status handlers.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};

use kaze_api_types::{ReactionKind, ReactionStatusResponse, ReactionToggleRequest, ReactionToggleResponse};

use crate::domain::identity::{ArticleId, SessionId};

use super::super::error::ApiError;
use super::super::models::{UserQuery, domain_to_bad_request};
use super::super::state::ApiState;

pub async fn toggle_reaction(
    State(state): State<ApiState>,
    Path(article_id): Path<String>,
    Json(payload): Json<ReactionToggleRequest>,
) -> Result<Response, ApiError> {
    let article = ArticleId::new(article_id).map_err(domain_to_bad_request)?;
    let user = SessionId::new(payload.user_id).map_err(domain_to_bad_request)?;
    let kind: ReactionKind = payload
        .reaction_type
        .parse()
        .map_err(|err: kaze_api_types::UnknownReactionKind| {
            ApiError::bad_request("invalid reaction type", Some(err.to_string()))
        })?;

    if !state.rate_limiter.allow(user.as_str(), "reactions") {
        metrics::counter!("kaze_rate_limited_total", "route" => "reactions").increment(1);
        return Ok(ApiError::rate_limited(state.rate_limiter.retry_after_secs()));
    }

    let result = state
        .engagement
        .toggle_reaction(&user, &article, kind, payload.action)
        .await;

    Ok(Json(ReactionToggleResponse {
        success: true,
        action: result.action,
        reaction_type: result.kind,
        total_reactions: result.counts.total(),
        reaction_counts: result.counts,
        degraded: result.degraded,
    })
    .into_response())
}

pub async fn reaction_status(
    State(state): State<ApiState>,
    Path(article_id): Path<String>,
    Query(query): Query<UserQuery>,
) -> Result<Json<ReactionStatusResponse>, ApiError> {
    let article = ArticleId::new(article_id).map_err(domain_to_bad_request)?;
    let user = query
        .user_id
        .map(SessionId::new)
        .transpose()
        .map_err(domain_to_bad_request)?;

    let status = state.engagement.reaction_status(user.as_ref(), &article).await;

    Ok(Json(ReactionStatusResponse {
        total_reactions: status.counts.total(),
        reaction_counts: status.counts,
        user_reactions: status.user_reactions,
        degraded: status.degraded,
        last_updated: status.last_updated,
    }))
}
