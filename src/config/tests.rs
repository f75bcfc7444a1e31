use super::*;

fn bare_cli() -> CliArgs {
    CliArgs {
        config_file: None,
        command: None,
    }
}

fn serve_cli(overrides: ServeOverrides) -> CliArgs {
    CliArgs {
        config_file: None,
        command: Some(Command::Serve(Box::new(ServeArgs { overrides }))),
    }
}

#[test]
fn defaults_resolve_without_any_sources() {
    let settings = load(&bare_cli()).expect("defaults load");
    assert_eq!(settings.server.addr.port(), DEFAULT_PORT);
    assert!(settings.database.url.is_none());
    assert!(settings.cms.is_none());
    assert!(settings.sync.secret.is_none());
    assert_eq!(
        settings.fallback.directory,
        PathBuf::from(DEFAULT_FALLBACK_DIR)
    );
}

#[test]
fn serve_overrides_take_precedence() {
    let overrides = ServeOverrides {
        server_port: Some(8080),
        log_json: Some(true),
        database: DatabaseOverride {
            database_url: Some("postgres://localhost/kaze".to_string()),
            database_max_connections: Some(4),
        },
        ..ServeOverrides::default()
    };

    let settings = load(&serve_cli(overrides)).expect("overridden load");
    assert_eq!(settings.server.addr.port(), 8080);
    assert!(matches!(settings.logging.format, LogFormat::Json));
    assert_eq!(
        settings.database.url.as_deref(),
        Some("postgres://localhost/kaze")
    );
    assert_eq!(settings.database.max_connections.get(), 4);
}

#[test]
fn cms_requires_key_and_location() {
    // Key without any URL or domain: no CMS access.
    let overrides = ServeOverrides {
        cms: CmsOverride {
            cms_api_key: Some("secret".to_string()),
            ..CmsOverride::default()
        },
        ..ServeOverrides::default()
    };
    let settings = load(&serve_cli(overrides)).expect("load");
    assert!(settings.cms.is_none());

    // Domain plus key expands to the hosted endpoint.
    let overrides = ServeOverrides {
        cms: CmsOverride {
            cms_api_key: Some("secret".to_string()),
            cms_service_domain: Some("demo".to_string()),
            ..CmsOverride::default()
        },
        ..ServeOverrides::default()
    };
    let settings = load(&serve_cli(overrides)).expect("load");
    let cms = settings.cms.expect("cms configured");
    assert_eq!(cms.base_url.as_str(), "https://demo.microcms.io/api/v1");
}

#[test]
fn explicit_base_url_wins_over_service_domain() {
    let overrides = ServeOverrides {
        cms: CmsOverride {
            cms_api_key: Some("secret".to_string()),
            cms_service_domain: Some("demo".to_string()),
            cms_base_url: Some("http://localhost:4100/api/v1".to_string()),
            ..CmsOverride::default()
        },
        ..ServeOverrides::default()
    };
    let settings = load(&serve_cli(overrides)).expect("load");
    let cms = settings.cms.expect("cms configured");
    assert_eq!(cms.base_url.as_str(), "http://localhost:4100/api/v1");
}

#[test]
fn zero_port_is_rejected() {
    let overrides = ServeOverrides {
        server_port: Some(0),
        ..ServeOverrides::default()
    };
    let err = load(&serve_cli(overrides)).expect_err("zero port must fail");
    assert!(matches!(err, LoadError::Invalid { key: "server.port", .. }));
}

#[test]
fn blank_secret_reads_as_absent() {
    let overrides = ServeOverrides {
        sync_secret: Some("   ".to_string()),
        ..ServeOverrides::default()
    };
    let settings = load(&serve_cli(overrides)).expect("load");
    assert!(settings.sync.secret.is_none());
}
