//! CMS webhook and reconciliation handlers, both guarded by the shared
//! secret when one is configured.

use axum::Json;
use axum::http::HeaderMap;
use axum::extract::State;

use kaze_api_types::{CleanupSummary, WebhookPayload, WebhookResponse};

use crate::application::sync::WebhookOutcome;

use super::super::error::{ApiError, codes};
use super::super::state::ApiState;

fn authorize(state: &ApiState, headers: &HeaderMap) -> Result<(), ApiError> {
    match state.sync_secret.as_ref() {
        Some(secret) if !secret.verify_headers(headers) => Err(ApiError::unauthorized()),
        _ => Ok(()),
    }
}

pub async fn cms_webhook(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(payload): Json<WebhookPayload>,
) -> Result<Json<WebhookResponse>, ApiError> {
    authorize(&state, &headers)?;

    let sync = state.sync.as_ref().ok_or_else(ApiError::sync_unavailable)?;

    let outcome = sync.handle_webhook(&payload).await.map_err(|err| {
        ApiError::new(
            axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            codes::SYNC_FAILED,
            "Webhook processing failed",
            Some(err.to_string()),
        )
    })?;

    let response = match outcome {
        WebhookOutcome::Deleted { article_id } => WebhookResponse {
            success: true,
            action: "deleted".to_string(),
            article_id: Some(article_id),
        },
        WebhookOutcome::NotFound { article_id } => WebhookResponse {
            success: true,
            action: "not_found".to_string(),
            article_id: Some(article_id),
        },
        WebhookOutcome::Ignored => WebhookResponse {
            success: true,
            action: "ignored".to_string(),
            article_id: None,
        },
    };

    Ok(Json(response))
}

pub async fn run_cleanup(
    State(state): State<ApiState>,
    headers: HeaderMap,
) -> Result<Json<CleanupSummary>, ApiError> {
    authorize(&state, &headers)?;

    let sync = state.sync.as_ref().ok_or_else(ApiError::sync_unavailable)?;
    let articles = state.articles.as_ref().ok_or_else(ApiError::cms_unavailable)?;

    let summary = sync.cleanup(articles).await.map_err(|err| {
        ApiError::new(
            axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            codes::SYNC_FAILED,
            "Cleanup sweep failed",
            Some(err.to_string()),
        )
    })?;

    Ok(Json(summary))
}
