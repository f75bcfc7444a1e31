pub mod auth;
pub mod error;
pub mod handlers;
pub mod models;
pub mod rate_limit;
pub mod state;

pub use state::ApiState;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};

use crate::infra::http::middleware::{log_responses, set_request_context};

pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/v1/articles", get(handlers::list_articles))
        .route("/api/v1/articles/{id}", get(handlers::get_article))
        .route(
            "/api/v1/articles/{id}/related",
            get(handlers::related_articles),
        )
        .route("/api/v1/articles/{id}/view", post(handlers::record_view))
        .route(
            "/api/v1/reactions/{article_id}",
            get(handlers::reaction_status).post(handlers::toggle_reaction),
        )
        .route("/api/v1/bookmarks", get(handlers::list_bookmarks))
        .route(
            "/api/v1/bookmarks/{article_id}",
            get(handlers::bookmark_status).post(handlers::toggle_bookmark),
        )
        .route("/api/v1/webhooks/cms", post(handlers::cms_webhook))
        .route("/api/v1/sync/cleanup", post(handlers::run_cleanup))
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}
