//! Tests for configuration file loading and router construction from it.

use std::io::Write;
use std::time::Duration;

use async_trait::async_trait;

use huginn::{Config, ExecutionHandle, HuginnError, Rationale, RouterBuilder, RoutingRequest};

struct Noop;

#[async_trait]
impl ExecutionHandle for Noop {}

const CONFIG: &str = r#"
builtin_models = false

[routing]
default_model = "local-small"
failover_error_rate = 0.3
health_ttl_secs = 5

[cache]
idle_threshold_secs = 600
sweep_interval_secs = 60

[[models]]
[models.descriptor]
id = "local-small"
provider = "ollama"
capabilities = ["text-generation"]
performance_score = 40.0
[models.configuration]
id = "local-small"
connection = { base_url = "http://localhost:11434" }
limits = { max_context_length = 8192, cost_per_thousand_tokens = 0.0 }

[[models]]
[models.descriptor]
id = "hosted-large"
provider = "openai"
capabilities = ["text-generation", "function-calling"]
performance_score = 90.0
[models.configuration]
id = "hosted-large"
limits = { max_context_length = 128000, cost_per_thousand_tokens = 0.0025 }
"#;

#[test]
fn load_explicit_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::File::create(&path)
        .unwrap()
        .write_all(CONFIG.as_bytes())
        .unwrap();

    let config = Config::load(Some(path.as_path())).unwrap();
    assert_eq!(config.routing.default_model, "local-small");
    assert_eq!(config.models.len(), 2);

    let router = config.router_config();
    assert_eq!(router.failover_error_rate, 0.3);
    assert_eq!(router.health_ttl, Duration::from_secs(5));

    let cache = config.cache_config();
    assert_eq!(cache.idle_threshold, Duration::from_secs(600));
    assert_eq!(cache.sweep_interval, Duration::from_secs(60));
}

#[test]
fn missing_explicit_path_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");
    assert!(matches!(
        Config::load_or_default(Some(path.as_path())),
        Err(HuginnError::Configuration(_))
    ));
}

#[test]
fn malformed_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[routing]\nfailover_error_rate = \"high\"\n").unwrap();

    let err = Config::load(Some(path.as_path())).unwrap_err();
    assert!(err.to_string().contains("Failed to parse config file"));
}

#[test]
fn invalid_model_entry_fails_builder() {
    let config = Config::from_toml_str(
        r#"
        [[models]]
        [models.descriptor]
        id = "a"
        provider = "openai"
        [models.configuration]
        id = "b"
    "#,
    )
    .unwrap();
    assert!(matches!(
        RouterBuilder::<Noop>::from_config(&config),
        Err(HuginnError::Validation(_))
    ));
}

#[tokio::test]
async fn router_from_config_routes_configured_models() {
    let config = Config::from_toml_str(CONFIG).unwrap();
    let router = RouterBuilder::<Noop>::from_config(&config)
        .unwrap()
        .build()
        .unwrap();

    assert_eq!(router.registry().len(), 2);
    assert!(!router.registry().contains("gpt-4o-mini"));
    assert_eq!(router.cache().config().idle_threshold, Duration::from_secs(600));

    let decision = router
        .resolve(&RoutingRequest::new("hello").tools(true))
        .await
        .unwrap();
    assert_eq!(decision.resolved(), "hosted-large");

    let decision = router
        .resolve(&RoutingRequest::new("hello").model("nope"))
        .await
        .unwrap();
    assert_eq!(decision.resolved(), "local-small");
    assert_eq!(decision.rationale(), Rationale::Fallback);

    router.shutdown().await.unwrap();
}

#[tokio::test]
async fn builtin_models_are_registered_by_default() {
    let config = Config::default();
    let router = RouterBuilder::<Noop>::from_config(&config)
        .unwrap()
        .without_sweeper()
        .build()
        .unwrap();
    assert!(router.registry().contains("gpt-4o-mini"));
    assert!(router.audit().is_ok());
}
