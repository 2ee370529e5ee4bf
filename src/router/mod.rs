//! Request routing: resolve a model, then obtain its execution handle.
//!
//! # Resolution
//!
//! ```text
//! RoutingRequest
//!       │
//!       ▼
//!  explicit model? ──no──► auto-select ──found──► Resolved (auto)
//!       │                       │
//!      yes                  NoSuitableModel / error
//!       │                       │
//!  usable? ──yes──► Resolved (explicit)
//!       │                       │
//!       no ─────────────────────┤
//!                               ▼
//!                     default model usable? ──yes──► Resolved (fallback)
//!                               │
//!                               no ──► FatalConfiguration
//! ```
//!
//! A model is *usable* when it is registered, available, enabled and, if
//! a [`HealthCollector`] is configured, not above the failover error rate.
//! An unusable explicit model is never replaced by auto-selection: the
//! request goes straight to the default with [`Rationale::Fallback`].
//! Auto-selection only runs when no explicit model was asked for.
//! Explicit downgrades and fallbacks are logged, never surfaced as errors.
//! The fallback default is not health-checked; it is the last resort.
//!
//! # Instances
//!
//! [`Router::obtain`] always goes through the [`InstanceCache`]. On a miss
//! the creator reads the model's configuration from the registry and asks
//! the provider's [`BackendFactory`](crate::BackendFactory) for a handle.

mod builder;
mod criteria;

pub use builder::RouterBuilder;
pub use criteria::estimate_tokens;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::backend::{BackendTable, ExecutionHandle, HealthCollector};
use crate::cache::{HealthCache, InstanceCache};
use crate::telemetry;
use crate::{
    Capability, HuginnError, ModelConfiguration, ModelDescriptor, ModelEntry, ModelRegistry,
    Rationale, Result, RoutingDecision, RoutingRequest, SelectionCriteria, SelectionEngine,
};

/// Routing policy, read once at construction.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Model substituted when the requested or selected model is unusable.
    pub default_model: String,
    /// Error rate above which a model is not routed to. Default: 0.5.
    pub failover_error_rate: f64,
    /// How long health readings are cached. Default: 10 seconds.
    pub health_ttl: Duration,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            default_model: "gpt-4o-mini".to_string(),
            failover_error_rate: 0.5,
            health_ttl: Duration::from_secs(10),
        }
    }
}

impl RouterConfig {
    /// Create a config with the given default model.
    pub fn new(default_model: impl Into<String>) -> Self {
        Self {
            default_model: default_model.into(),
            ..Self::default()
        }
    }

    /// Set the failover error rate threshold.
    pub fn failover_error_rate(mut self, rate: f64) -> Self {
        self.failover_error_rate = rate;
        self
    }

    /// Set the health reading TTL.
    pub fn health_ttl(mut self, ttl: Duration) -> Self {
        self.health_ttl = ttl;
        self
    }
}

/// Why a model cannot be routed to.
#[derive(Debug)]
enum Unusable {
    NotRegistered,
    Unavailable,
    Disabled,
    Unhealthy(f64),
}

impl fmt::Display for Unusable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unusable::NotRegistered => f.write_str("not registered"),
            Unusable::Unavailable => f.write_str("unavailable"),
            Unusable::Disabled => f.write_str("disabled"),
            Unusable::Unhealthy(rate) => write!(f, "error rate {rate:.2} above threshold"),
        }
    }
}

struct HealthGate {
    collector: Arc<dyn HealthCollector>,
    readings: HealthCache,
}

/// Orchestrates model resolution and instance retrieval.
///
/// Shared across request handlers (typically behind an `Arc`); all
/// methods take `&self` and may run concurrently.
pub struct Router<H: ExecutionHandle> {
    registry: Arc<ModelRegistry>,
    cache: Arc<InstanceCache<H>>,
    backends: BackendTable<H>,
    selector: SelectionEngine,
    health: Option<HealthGate>,
    config: RouterConfig,
}

impl<H: ExecutionHandle> Router<H> {
    /// Create a new builder for configuring the router.
    pub fn builder() -> RouterBuilder<H> {
        RouterBuilder::new()
    }

    // ========================================================================
    // Resolution
    // ========================================================================

    /// Decide which model serves `request`.
    ///
    /// Only fails with [`HuginnError::FatalConfiguration`], when the
    /// default model is needed and is itself unusable.
    #[instrument(skip(self, request), fields(requested = ?request.model))]
    pub async fn resolve(&self, request: &RoutingRequest) -> Result<RoutingDecision> {
        let requested = request.model.clone();
        let decision = match request.explicit_model() {
            Some(id) => match self.check_usable(id).await {
                Ok(()) => RoutingDecision::new(requested, id, Rationale::Explicit),
                Err(reason) => {
                    warn!(model = %id, %reason, "requested model unusable, falling back to default");
                    self.fallback(requested)?
                }
            },
            None => match self.auto_select(request).await {
                Ok(id) => RoutingDecision::new(requested, id, Rationale::Auto),
                Err(e) => {
                    if matches!(e, HuginnError::NoSuitableModel) {
                        metrics::counter!(telemetry::SELECTION_FAILURES_TOTAL).increment(1);
                    }
                    warn!(error = %e, "auto-selection failed, falling back to default");
                    self.fallback(requested)?
                }
            },
        };

        metrics::counter!(
            telemetry::ROUTING_DECISIONS_TOTAL,
            "rationale" => decision.rationale().as_str()
        )
        .increment(1);
        debug!(
            resolved = %decision.resolved(),
            rationale = %decision.rationale(),
            "request routed"
        );
        Ok(decision)
    }

    /// Pick the best usable model for `request` without falling back.
    ///
    /// Candidates are the available, enabled, healthy text-generation
    /// models, in registration order.
    pub async fn auto_select(&self, request: &RoutingRequest) -> Result<String> {
        let criteria = SelectionCriteria::from(request);
        let mut candidates = Vec::new();
        for entry in self.registry.candidates(Capability::TextGeneration) {
            if let Some(rate) = self.unhealthy_rate(entry.id()).await {
                debug!(model = %entry.id(), rate, "skipping unhealthy candidate");
                continue;
            }
            candidates.push(entry);
        }
        self.selector
            .pick(&candidates, &criteria)
            .map(|entry| entry.id().to_string())
    }

    /// Check the configured default model.
    ///
    /// Fails with [`HuginnError::FatalConfiguration`] if it is not
    /// registered, unavailable or disabled. Run at startup as a
    /// configuration audit; the router also runs it before every fallback.
    pub fn audit(&self) -> Result<()> {
        let id = &self.config.default_model;
        let reason = match self.registry.entry(id) {
            Err(_) => Unusable::NotRegistered,
            Ok(entry) if !entry.descriptor.available => Unusable::Unavailable,
            Ok(entry) if !entry.configuration.enabled => Unusable::Disabled,
            Ok(_) => return Ok(()),
        };
        Err(HuginnError::FatalConfiguration(format!(
            "default model '{id}' is {reason}"
        )))
    }

    fn fallback(&self, requested: Option<String>) -> Result<RoutingDecision> {
        self.audit()?;
        Ok(RoutingDecision::new(
            requested,
            self.config.default_model.clone(),
            Rationale::Fallback,
        ))
    }

    async fn check_usable(&self, id: &str) -> std::result::Result<(), Unusable> {
        let entry = self
            .registry
            .entry(id)
            .map_err(|_| Unusable::NotRegistered)?;
        if !entry.descriptor.available {
            return Err(Unusable::Unavailable);
        }
        if !entry.configuration.enabled {
            return Err(Unusable::Disabled);
        }
        if let Some(rate) = self.unhealthy_rate(id).await {
            return Err(Unusable::Unhealthy(rate));
        }
        Ok(())
    }

    /// The model's error rate if it is above the failover threshold.
    ///
    /// Fails open: no collector, no data, or an unreachable collector all
    /// count as healthy.
    async fn unhealthy_rate(&self, model: &str) -> Option<f64> {
        let gate = self.health.as_ref()?;
        let reading = match gate.readings.get(model) {
            Some(reading) => reading,
            None => match gate.collector.error_rate(model).await {
                Ok(reading) => {
                    gate.readings.insert(model, reading);
                    reading
                }
                Err(e) => {
                    metrics::counter!(telemetry::HEALTH_PROBE_FAILURES_TOTAL).increment(1);
                    warn!(model = %model, error = %e, "health collector unreachable, assuming healthy");
                    None
                }
            },
        };
        reading.filter(|rate| *rate > self.config.failover_error_rate)
    }

    // ========================================================================
    // Instances
    // ========================================================================

    /// Get the execution handle for a resolved model, creating it if needed.
    #[instrument(skip(self, decision), fields(model = %decision.resolved()))]
    pub async fn obtain(&self, decision: &RoutingDecision) -> Result<Arc<H>> {
        self.cache
            .get_or_create(decision.resolved(), |id| self.create_instance(id))
            .await
    }

    /// [`obtain`](Self::obtain) that stops promptly with
    /// [`HuginnError::Cancelled`] when `cancel` fires. A cancelled creation
    /// leaves nothing in the cache.
    pub async fn obtain_with_cancel(
        &self,
        decision: &RoutingDecision,
        cancel: &CancellationToken,
    ) -> Result<Arc<H>> {
        self.cache
            .get_or_create_with_cancel(decision.resolved(), |id| self.create_instance(id), cancel)
            .await
    }

    /// Resolve `request` and obtain the handle in one call.
    pub async fn route(&self, request: &RoutingRequest) -> Result<(RoutingDecision, Arc<H>)> {
        let decision = self.resolve(request).await?;
        let handle = self.obtain(&decision).await?;
        Ok((decision, handle))
    }

    async fn create_instance(&self, id: String) -> Result<H> {
        let entry = self.registry.entry(&id)?;
        let provider = entry.descriptor.provider.clone();
        let factory = self.backends.get(&provider)?;

        match factory.create(&entry.configuration).await {
            Ok(handle) => {
                metrics::counter!(telemetry::INSTANCES_CREATED_TOTAL, "provider" => provider.clone())
                    .increment(1);
                info!(model = %id, provider = %provider, "instance created");
                Ok(handle)
            }
            Err(e) => {
                metrics::counter!(
                    telemetry::INSTANCE_CREATION_FAILURES_TOTAL,
                    "provider" => provider.clone()
                )
                .increment(1);
                warn!(model = %id, provider = %provider, error = %e, "instance creation failed");
                Err(HuginnError::CreationFailed {
                    model: id,
                    reason: e.to_string(),
                })
            }
        }
    }

    // ========================================================================
    // Administration
    // ========================================================================

    /// Register a model. See [`ModelRegistry::register`].
    pub fn register(
        &self,
        descriptor: ModelDescriptor,
        configuration: ModelConfiguration,
    ) -> Result<()> {
        self.registry.register(descriptor, configuration)
    }

    /// Replace a model's configuration and evict its cached instance, so
    /// the next [`obtain`](Self::obtain) builds from the new settings.
    pub async fn update_configuration(
        &self,
        id: &str,
        configuration: ModelConfiguration,
    ) -> Result<()> {
        self.registry.update_configuration(id, configuration)?;
        self.evict_quietly(id).await;
        Ok(())
    }

    /// Remove a model from the registry and evict its cached instance.
    pub async fn deregister(&self, id: &str) -> Result<ModelEntry> {
        let removed = self.registry.remove(id)?;
        if let Some(gate) = &self.health {
            gate.readings.invalidate(id);
        }
        self.evict_quietly(id).await;
        Ok(removed)
    }

    async fn evict_quietly(&self, id: &str) {
        // Release failures are already logged and counted by the cache.
        if let Err(e) = self.cache.evict(id).await {
            debug!(model = %id, error = %e, "eviction after administrative change failed");
        }
    }

    /// Stop the idle sweep and release every cached handle.
    pub async fn shutdown(&self) -> Result<()> {
        self.cache.shutdown().await
    }

    /// The model registry.
    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    /// The instance cache.
    pub fn cache(&self) -> &Arc<InstanceCache<H>> {
        &self.cache
    }

    /// The routing configuration.
    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Provider ids with a registered backend factory.
    pub fn providers(&self) -> Vec<&str> {
        self.backends.providers()
    }
}

impl<H: ExecutionHandle> fmt::Debug for Router<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("config", &self.config)
            .field("models", &self.registry.len())
            .field("backends", &self.backends)
            .field("health", &self.health.is_some())
            .finish()
    }
}
