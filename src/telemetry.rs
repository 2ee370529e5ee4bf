//! Telemetry metric name constants.
//!
//! Centralised metric names for huginn operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `huginn_`. Counters end in `_total`.
//!
//! # Common labels
//!
//! - `rationale`: routing outcome: "explicit", "auto" or "fallback"
//! - `provider`: provider id of the model being instantiated
//! - `reason`: eviction cause: "idle", "explicit" or "shutdown"

/// Total routing decisions produced by the router.
///
/// Labels: `rationale`.
pub const ROUTING_DECISIONS_TOTAL: &str = "huginn_routing_decisions_total";

/// Total auto-selections that found no suitable model.
pub const SELECTION_FAILURES_TOTAL: &str = "huginn_selection_failures_total";

/// Total instance cache hits.
pub const INSTANCE_CACHE_HITS_TOTAL: &str = "huginn_instance_cache_hits_total";

/// Total instance cache misses (each miss runs the creator once).
pub const INSTANCE_CACHE_MISSES_TOTAL: &str = "huginn_instance_cache_misses_total";

/// Total execution handles created by backend factories.
///
/// Labels: `provider`.
pub const INSTANCES_CREATED_TOTAL: &str = "huginn_instances_created_total";

/// Total backend factory failures.
///
/// Labels: `provider`.
pub const INSTANCE_CREATION_FAILURES_TOTAL: &str = "huginn_instance_creation_failures_total";

/// Total cached instances evicted.
///
/// Labels: `reason` ("idle" | "explicit" | "shutdown").
pub const INSTANCES_EVICTED_TOTAL: &str = "huginn_instances_evicted_total";

/// Total handle releases that returned an error.
pub const INSTANCE_RELEASE_FAILURES_TOTAL: &str = "huginn_instance_release_failures_total";

/// Total health collector queries that failed (treated as healthy).
pub const HEALTH_PROBE_FAILURES_TOTAL: &str = "huginn_health_probe_failures_total";
