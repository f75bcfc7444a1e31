//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{
    net::SocketAddr,
    num::{NonZeroU32, NonZeroU64},
    path::PathBuf,
    str::FromStr,
};

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "kaze";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 8;
const DEFAULT_FALLBACK_DIR: &str = "fallback";
const DEFAULT_RATE_LIMIT_WINDOW_SECS: u32 = 60;
const DEFAULT_RATE_LIMIT_MAX_REQUESTS: u32 = 120;
const DEFAULT_CMS_TIMEOUT_SECS: u64 = 10;

/// Command-line arguments for the kaze binary.
#[derive(Debug, Parser)]
#[command(name = "kaze", version, about = "kaze blog engagement server")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "KAZE_CONFIG_FILE", value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the HTTP service.
    Serve(Box<ServeArgs>),
    /// Reconcile the stats store against the CMS catalog once and exit.
    Cleanup(CleanupArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    #[command(flatten)]
    pub database: DatabaseOverride,

    #[command(flatten)]
    pub cms: CmsOverride,

    /// Override the fallback store directory.
    #[arg(long = "fallback-directory", value_name = "PATH")]
    pub fallback_directory: Option<PathBuf>,

    /// Override the rate limit window size.
    #[arg(long = "rate-limit-window-seconds", value_name = "SECONDS")]
    pub rate_limit_window_seconds: Option<u32>,

    /// Override the rate limit request ceiling.
    #[arg(long = "rate-limit-max-requests", value_name = "COUNT")]
    pub rate_limit_max_requests: Option<u32>,

    /// Override the shared secret guarding webhook and sync routes.
    #[arg(long = "sync-secret", value_name = "SECRET", hide_env_values = true, env = "KAZE_SYNC_SECRET")]
    pub sync_secret: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct DatabaseOverride {
    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,

    /// Override the database pool size.
    #[arg(long = "database-max-connections", value_name = "COUNT")]
    pub database_max_connections: Option<u32>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct CmsOverride {
    /// Override the CMS base URL (takes precedence over the service domain).
    #[arg(long = "cms-base-url", value_name = "URL")]
    pub cms_base_url: Option<String>,

    /// Override the CMS service domain (expands to <domain>.microcms.io).
    #[arg(long = "cms-service-domain", value_name = "DOMAIN")]
    pub cms_service_domain: Option<String>,

    /// Override the CMS API key.
    #[arg(long = "cms-api-key", value_name = "KEY", hide_env_values = true, env = "KAZE_CMS_API_KEY")]
    pub cms_api_key: Option<String>,

    /// Override the CMS request timeout.
    #[arg(long = "cms-timeout-seconds", value_name = "SECONDS")]
    pub cms_timeout_seconds: Option<u64>,
}

#[derive(Debug, Args, Clone)]
pub struct CleanupArgs {
    #[command(flatten)]
    pub database: DatabaseOverride,

    #[command(flatten)]
    pub cms: CmsOverride,
}

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub database: DatabaseSettings,
    pub cms: Option<CmsSettings>,
    pub fallback: FallbackSettings,
    pub rate_limit: RateLimitSettings,
    pub sync: SyncSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub max_connections: NonZeroU32,
}

#[derive(Debug, Clone)]
pub struct CmsSettings {
    pub base_url: Url,
    pub api_key: String,
    pub timeout_seconds: NonZeroU64,
}

#[derive(Debug, Clone)]
pub struct FallbackSettings {
    pub directory: PathBuf,
}

#[derive(Debug, Clone)]
pub struct RateLimitSettings {
    pub window_seconds: NonZeroU32,
    pub max_requests: NonZeroU32,
}

#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub secret: Option<String>,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Parse CLI arguments, then load settings with them applied.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let cli = CliArgs::parse();
    let settings = load(&cli)?;
    Ok((cli, settings))
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("KAZE").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Cleanup(args)) => {
            raw.apply_database_override(&args.database);
            raw.apply_cms_override(&args.cms);
        }
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    database: RawDatabaseSettings,
    cms: RawCmsSettings,
    fallback: RawFallbackSettings,
    rate_limit: RawRateLimitSettings,
    sync: RawSyncSettings,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDatabaseSettings {
    url: Option<String>,
    max_connections: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCmsSettings {
    base_url: Option<String>,
    service_domain: Option<String>,
    api_key: Option<String>,
    timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawFallbackSettings {
    directory: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRateLimitSettings {
    window_seconds: Option<u32>,
    max_requests: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSyncSettings {
    secret: Option<String>,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(directory) = overrides.fallback_directory.as_ref() {
            self.fallback.directory = Some(directory.clone());
        }
        if let Some(window) = overrides.rate_limit_window_seconds {
            self.rate_limit.window_seconds = Some(window);
        }
        if let Some(max) = overrides.rate_limit_max_requests {
            self.rate_limit.max_requests = Some(max);
        }
        if let Some(secret) = overrides.sync_secret.as_ref() {
            self.sync.secret = Some(secret.clone());
        }

        self.apply_database_override(&overrides.database);
        self.apply_cms_override(&overrides.cms);
    }

    fn apply_database_override(&mut self, overrides: &DatabaseOverride) {
        if let Some(url) = overrides.database_url.as_ref() {
            self.database.url = Some(url.clone());
        }
        if let Some(max) = overrides.database_max_connections {
            self.database.max_connections = Some(max);
        }
    }

    fn apply_cms_override(&mut self, overrides: &CmsOverride) {
        if let Some(url) = overrides.cms_base_url.as_ref() {
            self.cms.base_url = Some(url.clone());
        }
        if let Some(domain) = overrides.cms_service_domain.as_ref() {
            self.cms.service_domain = Some(domain.clone());
        }
        if let Some(key) = overrides.cms_api_key.as_ref() {
            self.cms.api_key = Some(key.clone());
        }
        if let Some(timeout) = overrides.cms_timeout_seconds {
            self.cms.timeout_seconds = Some(timeout);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            database,
            cms,
            fallback,
            rate_limit,
            sync,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            database: build_database_settings(database)?,
            cms: build_cms_settings(cms)?,
            fallback: build_fallback_settings(fallback),
            rate_limit: build_rate_limit_settings(rate_limit)?,
            sync: SyncSettings {
                secret: sync.secret.and_then(non_empty),
            },
        })
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());
    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    Ok(ServerSettings { addr })
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    format!("{host}:{port}")
        .parse()
        .map_err(|err| format!("failed to parse `{host}:{port}`: {err}"))
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_database_settings(database: RawDatabaseSettings) -> Result<DatabaseSettings, LoadError> {
    let url = database.url.and_then(non_empty);

    let max_value = database
        .max_connections
        .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS);
    let max_connections = NonZeroU32::new(max_value).ok_or_else(|| {
        LoadError::invalid("database.max_connections", "must be greater than zero")
    })?;

    Ok(DatabaseSettings {
        url,
        max_connections,
    })
}

fn build_cms_settings(cms: RawCmsSettings) -> Result<Option<CmsSettings>, LoadError> {
    let api_key = cms.api_key.and_then(non_empty);
    let base_url = cms.base_url.and_then(non_empty);
    let service_domain = cms.service_domain.and_then(non_empty);

    let base = match (base_url, service_domain) {
        (Some(url), _) => Some(url),
        (None, Some(domain)) => Some(format!("https://{domain}.microcms.io/api/v1")),
        (None, None) => None,
    };

    let (Some(base), Some(api_key)) = (base, api_key) else {
        // CMS access is optional; article routes report unavailability.
        return Ok(None);
    };

    let base_url = Url::parse(&base)
        .map_err(|err| LoadError::invalid("cms.base_url", format!("failed to parse: {err}")))?;

    let timeout_value = cms.timeout_seconds.unwrap_or(DEFAULT_CMS_TIMEOUT_SECS);
    let timeout_seconds = NonZeroU64::new(timeout_value)
        .ok_or_else(|| LoadError::invalid("cms.timeout_seconds", "must be greater than zero"))?;

    Ok(Some(CmsSettings {
        base_url,
        api_key,
        timeout_seconds,
    }))
}

fn build_fallback_settings(fallback: RawFallbackSettings) -> FallbackSettings {
    FallbackSettings {
        directory: fallback
            .directory
            .unwrap_or_else(|| PathBuf::from(DEFAULT_FALLBACK_DIR)),
    }
}

fn build_rate_limit_settings(
    rate_limit: RawRateLimitSettings,
) -> Result<RateLimitSettings, LoadError> {
    let window_value = rate_limit
        .window_seconds
        .unwrap_or(DEFAULT_RATE_LIMIT_WINDOW_SECS);
    let window_seconds = NonZeroU32::new(window_value).ok_or_else(|| {
        LoadError::invalid("rate_limit.window_seconds", "must be greater than zero")
    })?;

    let max_value = rate_limit
        .max_requests
        .unwrap_or(DEFAULT_RATE_LIMIT_MAX_REQUESTS);
    let max_requests = NonZeroU32::new(max_value).ok_or_else(|| {
        LoadError::invalid("rate_limit.max_requests", "must be greater than zero")
    })?;

    Ok(RateLimitSettings {
        window_seconds,
        max_requests,
    })
}

#[cfg(test)]
mod tests;
