//! Liveness probe with a backend reachability check.

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use super::super::state::ApiState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub backend: &'static str,
    pub database: &'static str,
    pub cms: &'static str,
}

pub async fn health(State(state): State<ApiState>) -> Json<HealthResponse> {
    let database = match state.db.as_ref() {
        Some(db) => match db.health_check().await {
            Ok(()) => "ok",
            Err(_) => "unreachable",
        },
        None => "absent",
    };

    Json(HealthResponse {
        status: "ok",
        backend: if state.engagement.is_remote() {
            "remote"
        } else {
            "local_only"
        },
        database,
        cms: if state.articles.is_some() {
            "configured"
        } else {
            "absent"
        },
    })
}
