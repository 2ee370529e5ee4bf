//! Tests for metrics integration.
//!
//! Uses `metrics_util::debugging::DebuggingRecorder` to capture and assert
//! on emitted metrics without needing a real exporter.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use metrics_util::MetricKind;
use metrics_util::debugging::{DebugValue, DebuggingRecorder, Snapshotter};

use huginn::telemetry;
use huginn::{
    BackendFactory, Capability, ExecutionHandle, HealthCollector, HuginnError,
    ModelConfiguration, ModelDescriptor, ModelRegistry, Result, Router, RoutingRequest,
};

// ============================================================================
// Mock backends
// ============================================================================

struct MockHandle;

#[async_trait]
impl ExecutionHandle for MockHandle {}

struct MockFactory {
    provider: &'static str,
    fail: bool,
}

#[async_trait]
impl BackendFactory<MockHandle> for MockFactory {
    fn provider(&self) -> &str {
        self.provider
    }

    async fn create(&self, _config: &ModelConfiguration) -> Result<MockHandle> {
        if self.fail {
            return Err(HuginnError::Backend("connection refused".into()));
        }
        Ok(MockHandle)
    }
}

struct UnreachableHealth;

#[async_trait]
impl HealthCollector for UnreachableHealth {
    async fn error_rate(&self, _model: &str) -> Result<Option<f64>> {
        Err(HuginnError::Backend("collector unreachable".into()))
    }
}

// ============================================================================
// Snapshot type alias for readability
// ============================================================================

type SnapshotVec = Vec<(
    metrics_util::CompositeKey,
    Option<metrics::Unit>,
    Option<metrics::SharedString>,
    DebugValue,
)>;

// ============================================================================
// Helpers
// ============================================================================

/// Sum all counter values matching a given metric name.
fn counter_total(snapshot: &SnapshotVec, name: &str) -> u64 {
    counter_where(snapshot, name, |_| true)
}

/// Sum counter values for `name` carrying the label `key=value`.
fn counter_labeled(snapshot: &SnapshotVec, name: &str, key: &str, value: &str) -> u64 {
    counter_where(snapshot, name, |k| {
        k.key()
            .labels()
            .any(|label| label.key() == key && label.value() == value)
    })
}

fn counter_where(
    snapshot: &SnapshotVec,
    name: &str,
    filter: impl Fn(&metrics_util::CompositeKey) -> bool,
) -> u64 {
    snapshot
        .iter()
        .filter(|(key, _, _, _)| key.kind() == MetricKind::Counter && key.key().name() == name)
        .filter(|(key, _, _, _)| filter(key))
        .map(|(_, _, _, value)| match value {
            DebugValue::Counter(v) => *v,
            _ => 0,
        })
        .sum()
}

fn registry() -> Arc<ModelRegistry> {
    let registry = ModelRegistry::new();
    for (id, provider, score) in [("fast-a", "openai", 90.0), ("cheap-b", "ollama", 40.0)] {
        registry
            .register(
                ModelDescriptor::new(id, provider)
                    .with_capability(Capability::TextGeneration)
                    .with_performance_score(score),
                ModelConfiguration::new(id),
            )
            .unwrap();
    }
    Arc::new(registry)
}

fn router(ollama_fails: bool) -> Router<MockHandle> {
    Router::<MockHandle>::builder()
        .registry(registry())
        .default_model("fast-a")
        .backend(Arc::new(MockFactory {
            provider: "openai",
            fail: false,
        }))
        .backend(Arc::new(MockFactory {
            provider: "ollama",
            fail: ollama_fails,
        }))
        .without_sweeper()
        .build()
        .unwrap()
}

/// Runs async code within a local recorder scope on the multi-thread runtime.
///
/// `block_in_place` ensures the sync `with_local_recorder` closure stays
/// on the current thread while `block_on` drives the inner async work.
fn record<T>(fut: impl Future<Output = T>) -> (T, SnapshotVec) {
    let recorder = DebuggingRecorder::new();
    let snapshotter: Snapshotter = recorder.snapshotter();
    let output = metrics::with_local_recorder(&recorder, || {
        tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(fut))
    });
    (output, snapshotter.snapshot().into_vec())
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn routing_decisions_are_labeled_by_rationale() {
    let ((), snapshot) = record(async {
        let router = router(false);
        router.resolve(&RoutingRequest::new("hi")).await.unwrap();
        router
            .resolve(&RoutingRequest::new("hi").model("cheap-b"))
            .await
            .unwrap();
        router
            .resolve(&RoutingRequest::new("hi").model("unknown-x"))
            .await
            .unwrap();
    });

    let name = telemetry::ROUTING_DECISIONS_TOTAL;
    assert_eq!(counter_total(&snapshot, name), 3);
    assert_eq!(counter_labeled(&snapshot, name, "rationale", "auto"), 1);
    assert_eq!(counter_labeled(&snapshot, name, "rationale", "explicit"), 1);
    assert_eq!(counter_labeled(&snapshot, name, "rationale", "fallback"), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn selection_failure_is_counted() {
    let ((), snapshot) = record(async {
        let router = router(false);
        router
            .resolve(&RoutingRequest::new("hi").images(true))
            .await
            .unwrap();
    });

    assert_eq!(counter_total(&snapshot, telemetry::SELECTION_FAILURES_TOTAL), 1);
    assert_eq!(
        counter_labeled(
            &snapshot,
            telemetry::ROUTING_DECISIONS_TOTAL,
            "rationale",
            "fallback"
        ),
        1
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn cache_hits_misses_and_creations() {
    let ((), snapshot) = record(async {
        let router = router(false);
        let request = RoutingRequest::new("hi");
        router.route(&request).await.unwrap();
        router.route(&request).await.unwrap();
        router.route(&request).await.unwrap();
    });

    assert_eq!(counter_total(&snapshot, telemetry::INSTANCE_CACHE_MISSES_TOTAL), 1);
    assert_eq!(counter_total(&snapshot, telemetry::INSTANCE_CACHE_HITS_TOTAL), 2);
    assert_eq!(
        counter_labeled(
            &snapshot,
            telemetry::INSTANCES_CREATED_TOTAL,
            "provider",
            "openai"
        ),
        1
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn creation_failures_are_counted() {
    let (result, snapshot) = record(async {
        let router = router(true);
        router
            .route(&RoutingRequest::new("hi").model("cheap-b"))
            .await
            .map(|_| ())
    });
    assert!(matches!(result, Err(HuginnError::CreationFailed { .. })));

    assert_eq!(
        counter_labeled(
            &snapshot,
            telemetry::INSTANCE_CREATION_FAILURES_TOTAL,
            "provider",
            "ollama"
        ),
        1
    );
    assert_eq!(counter_total(&snapshot, telemetry::INSTANCES_CREATED_TOTAL), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn evictions_are_labeled_by_reason() {
    let ((), snapshot) = record(async {
        let router = router(false);
        router
            .route(&RoutingRequest::new("hi").model("cheap-b"))
            .await
            .unwrap();
        router.route(&RoutingRequest::new("hi")).await.unwrap();
        router.deregister("cheap-b").await.unwrap();
        router.shutdown().await.unwrap();
    });

    let name = telemetry::INSTANCES_EVICTED_TOTAL;
    assert_eq!(counter_labeled(&snapshot, name, "reason", "explicit"), 1);
    assert_eq!(counter_labeled(&snapshot, name, "reason", "shutdown"), 1);
    assert_eq!(
        counter_total(&snapshot, telemetry::INSTANCE_RELEASE_FAILURES_TOTAL),
        0
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn unreachable_health_collector_is_counted() {
    let ((), snapshot) = record(async {
        let router = Router::<MockHandle>::builder()
            .registry(registry())
            .default_model("fast-a")
            .health_collector(Arc::new(UnreachableHealth))
            .without_sweeper()
            .build()
            .unwrap();
        router
            .resolve(&RoutingRequest::new("hi").model("cheap-b"))
            .await
            .unwrap();
    });

    assert_eq!(counter_total(&snapshot, telemetry::HEALTH_PROBE_FAILURES_TOTAL), 1);
}

#[tokio::test]
async fn metrics_are_noop_without_recorder() {
    // Verify no panics when no recorder is installed.
    let router = router(false);
    router.route(&RoutingRequest::new("hi")).await.unwrap();
    router.shutdown().await.unwrap();
}
