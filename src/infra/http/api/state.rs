use std::sync::Arc;

use crate::application::articles::ArticleService;
use crate::application::engagement::EngagementService;
use crate::application::sync::StatsSyncService;
use crate::infra::db::PostgresRepositories;

use super::auth::SharedSecret;
use super::rate_limit::ApiRateLimiter;

#[derive(Clone)]
pub struct ApiState {
    pub engagement: Arc<EngagementService>,
    /// Present only when a CMS is configured.
    pub articles: Option<Arc<ArticleService>>,
    /// Present only when the remote store backend is active.
    pub sync: Option<Arc<StatsSyncService>>,
    pub db: Option<Arc<PostgresRepositories>>,
    pub rate_limiter: Arc<ApiRateLimiter>,
    pub sync_secret: Option<Arc<SharedSecret>>,
}
