//! Builder for configuring router instances

use std::sync::Arc;

use tracing::{info, warn};

use super::{HealthGate, Router, RouterConfig};
use crate::backend::{BackendFactory, BackendTable, ExecutionHandle, HealthCollector};
use crate::cache::{HealthCache, InstanceCache, InstanceCacheConfig};
use crate::config::Config;
use crate::{HuginnError, ModelRegistry, Result, SelectionEngine};

/// Builder for configuring router instances.
pub struct RouterBuilder<H: ExecutionHandle> {
    registry: Option<Arc<ModelRegistry>>,
    config: RouterConfig,
    cache_config: InstanceCacheConfig,
    backends: BackendTable<H>,
    health_collector: Option<Arc<dyn HealthCollector>>,
    sweeper: bool,
}

impl<H: ExecutionHandle> Default for RouterBuilder<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: ExecutionHandle> RouterBuilder<H> {
    pub fn new() -> Self {
        Self {
            registry: None,
            config: RouterConfig::default(),
            cache_config: InstanceCacheConfig::default(),
            backends: BackendTable::new(),
            health_collector: None,
            sweeper: true,
        }
    }

    /// Start from a loaded [`Config`].
    ///
    /// Builds a registry holding the compiled-in models (unless
    /// `builtin_models = false`) followed by the configured `models`, and
    /// takes the routing and cache sections. A configured model that fails
    /// validation is an error.
    pub fn from_config(config: &Config) -> Result<Self> {
        let registry = if config.builtin_models {
            ModelRegistry::with_builtin_defaults()
        } else {
            ModelRegistry::new()
        };
        registry.register_all(config.models.iter().cloned())?;

        Ok(Self::new()
            .registry(Arc::new(registry))
            .config(config.router_config())
            .cache_config(config.cache_config()))
    }

    /// Use an existing registry (default: compiled-in models).
    pub fn registry(mut self, registry: Arc<ModelRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Set the routing configuration.
    pub fn config(mut self, config: RouterConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the model used when routing falls back.
    pub fn default_model(mut self, id: impl Into<String>) -> Self {
        self.config.default_model = id.into();
        self
    }

    /// Set the instance cache policy.
    pub fn cache_config(mut self, config: InstanceCacheConfig) -> Self {
        self.cache_config = config;
        self
    }

    /// Register the factory that builds handles for its provider.
    /// A later factory for the same provider replaces the earlier one.
    pub fn backend(mut self, factory: Arc<dyn BackendFactory<H>>) -> Self {
        self.backends.insert(factory);
        self
    }

    /// Consult `collector` before routing to a model.
    pub fn health_collector(mut self, collector: Arc<dyn HealthCollector>) -> Self {
        self.health_collector = Some(collector);
        self
    }

    /// Do not start the background idle sweep. Idle instances are then only
    /// released by [`InstanceCache::sweep_idle`], eviction or shutdown.
    pub fn without_sweeper(mut self) -> Self {
        self.sweeper = false;
        self
    }

    /// Build the router.
    ///
    /// Starts the idle sweep (requires a Tokio runtime) and audits the
    /// default model. A failed audit is logged, not returned: routing only
    /// fails once a fallback is actually needed.
    pub fn build(self) -> Result<Router<H>> {
        let rate = self.config.failover_error_rate;
        if !(0.0..=1.0).contains(&rate) {
            return Err(HuginnError::Configuration(format!(
                "failover_error_rate must be within 0.0..=1.0, got {rate}"
            )));
        }

        let registry = match self.registry {
            Some(registry) => registry,
            None => Arc::new(ModelRegistry::with_builtin_defaults()),
        };

        let cache = Arc::new(InstanceCache::new(self.cache_config));
        if self.sweeper {
            cache.start_sweeper()?;
        }

        let health = self.health_collector.map(|collector| HealthGate {
            collector,
            readings: HealthCache::new(self.config.health_ttl),
        });

        let router = Router {
            registry,
            cache,
            backends: self.backends,
            selector: SelectionEngine::new(),
            health,
            config: self.config,
        };

        if let Err(e) = router.audit() {
            warn!(error = %e, "configuration audit failed");
        }
        for descriptor in router.registry.list() {
            if !router.backends.supports(&descriptor.provider) {
                warn!(
                    model = %descriptor.id,
                    provider = %descriptor.provider,
                    "no backend for provider, model cannot be instantiated"
                );
            }
        }

        info!(
            models = router.registry.len(),
            providers = ?router.backends.providers(),
            default_model = %router.config.default_model,
            "router ready"
        );
        Ok(router)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Noop;

    #[async_trait]
    impl ExecutionHandle for Noop {}

    #[test]
    fn out_of_range_error_rate_is_rejected() {
        let result = Router::<Noop>::builder()
            .registry(Arc::new(ModelRegistry::new()))
            .config(RouterConfig::default().failover_error_rate(1.5))
            .without_sweeper()
            .build();
        assert!(matches!(result, Err(HuginnError::Configuration(_))));
    }

    #[test]
    fn failed_audit_still_builds() {
        let router = Router::<Noop>::builder()
            .registry(Arc::new(ModelRegistry::new()))
            .default_model("missing")
            .without_sweeper()
            .build()
            .unwrap();
        assert!(matches!(
            router.audit(),
            Err(HuginnError::FatalConfiguration(_))
        ));
    }

    #[test]
    fn default_registry_holds_builtin_models() {
        let router = Router::<Noop>::builder().without_sweeper().build().unwrap();
        assert!(router.registry().contains("gpt-4o-mini"));
        assert!(router.audit().is_ok());
    }

    #[test]
    fn from_config_respects_builtin_flag() {
        let config = Config::from_toml_str(
            r#"
            builtin_models = false

            [routing]
            default_model = "local"

            [[models]]
            [models.descriptor]
            id = "local"
            provider = "ollama"
            capabilities = ["text-generation"]
            [models.configuration]
            id = "local"
        "#,
        )
        .unwrap();

        let router = RouterBuilder::<Noop>::from_config(&config)
            .unwrap()
            .without_sweeper()
            .build()
            .unwrap();
        assert_eq!(router.registry().len(), 1);
        assert_eq!(router.config().default_model, "local");
        assert!(router.audit().is_ok());
    }
}
