use std::{process, sync::Arc, time::Duration};

use kaze::{
    application::{
        articles::ArticleService,
        engagement::{EngagementBackend, EngagementService, RemoteStores, fallback::FallbackStore},
        error::AppError,
        repos::{BookmarksRepo, ReactionsRepo, StatsRepo},
        sync::StatsSyncService,
    },
    config,
    infra::{
        cms::CmsClient,
        db::PostgresRepositories,
        error::InfraError,
        fallback::JsonFileStore,
        http::{self, ApiState},
        http::api::{auth::SharedSecret, rate_limit::ApiRateLimiter},
        telemetry,
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Cleanup(_) => run_cleanup(settings).await,
    }
}

struct ApplicationContext {
    api_state: ApiState,
}

async fn connect_repositories(
    settings: &config::Settings,
) -> Result<Option<Arc<PostgresRepositories>>, AppError> {
    let Some(url) = settings.database.url.as_ref() else {
        return Ok(None);
    };

    let pool = PostgresRepositories::connect(url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    Ok(Some(Arc::new(PostgresRepositories::new(pool))))
}

fn build_article_service(
    settings: &config::Settings,
) -> Result<Option<Arc<ArticleService>>, AppError> {
    let Some(cms) = settings.cms.as_ref() else {
        return Ok(None);
    };

    let client = Arc::new(CmsClient::new(cms).map_err(AppError::from)?);
    Ok(Some(Arc::new(ArticleService::new(client))))
}

async fn build_application_context(
    settings: &config::Settings,
) -> Result<ApplicationContext, AppError> {
    let fallback: Arc<dyn FallbackStore> = Arc::new(
        JsonFileStore::open(settings.fallback.directory.clone())
            .map_err(|err| AppError::from(InfraError::Io(err)))?,
    );

    let repositories = connect_repositories(settings).await?;

    let backend = match repositories.clone() {
        Some(repos) => {
            info!(target = "kaze::startup", "engagement backend: remote store");
            let reactions: Arc<dyn ReactionsRepo> = repos.clone();
            let bookmarks: Arc<dyn BookmarksRepo> = repos.clone();
            let stats: Arc<dyn StatsRepo> = repos;
            EngagementBackend::Remote(RemoteStores {
                reactions,
                bookmarks,
                stats,
            })
        }
        None => {
            info!(
                target = "kaze::startup",
                "no database configured; engagement backend: local-only fallback"
            );
            EngagementBackend::LocalOnly
        }
    };

    let engagement = Arc::new(EngagementService::new(backend, fallback));
    let articles = build_article_service(settings)?;
    if articles.is_none() {
        info!(
            target = "kaze::startup",
            "no CMS configured; article routes will report unavailability"
        );
    }

    let sync = repositories.clone().map(|repos| {
        let reactions: Arc<dyn ReactionsRepo> = repos.clone();
        let bookmarks: Arc<dyn BookmarksRepo> = repos.clone();
        let stats: Arc<dyn StatsRepo> = repos;
        Arc::new(StatsSyncService::new(stats, reactions, bookmarks))
    });

    let rate_limiter = Arc::new(ApiRateLimiter::new(
        Duration::from_secs(settings.rate_limit.window_seconds.get() as u64),
        settings.rate_limit.max_requests.get(),
    ));

    let sync_secret = settings
        .sync
        .secret
        .as_deref()
        .map(|secret| Arc::new(SharedSecret::new(secret)));

    Ok(ApplicationContext {
        api_state: ApiState {
            engagement,
            articles,
            sync,
            db: repositories,
            rate_limiter,
            sync_secret,
        },
    })
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let app = build_application_context(&settings).await?;

    let router = http::build_router(app.api_state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "kaze::startup",
        addr = %settings.server.addr,
        "listening"
    );

    axum::serve(listener, router.into_make_service())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    Ok(())
}

async fn run_cleanup(settings: config::Settings) -> Result<(), AppError> {
    let app = build_application_context(&settings).await?;

    let sync = app
        .api_state
        .sync
        .as_ref()
        .ok_or_else(|| AppError::validation("cleanup requires a configured database url"))?;
    let articles = app
        .api_state
        .articles
        .as_ref()
        .ok_or_else(|| AppError::validation("cleanup requires a configured CMS"))?;

    info!(target = "kaze::cleanup", "starting reconciliation sweep");

    let summary = sync
        .cleanup(articles)
        .await
        .map_err(|err| AppError::unexpected(format!("cleanup failed: {err}")))?;

    let rendered = serde_json::to_string_pretty(&summary)
        .map_err(|err| AppError::unexpected(format!("failed to render summary: {err}")))?;
    println!("{rendered}");

    Ok(())
}
