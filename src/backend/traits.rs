//! Collaborator traits the orchestration core depends on.
//!
//! The core never talks to a model provider itself. It resolves a model,
//! asks a [`BackendFactory`] for an [`ExecutionHandle`] built from that
//! model's configuration, caches the handle, and gives it to the caller.
//!
//! # Example
//!
//! ```ignore
//! struct OpenAiBackend { http: reqwest::Client }
//!
//! #[async_trait]
//! impl BackendFactory<OpenAiHandle> for OpenAiBackend {
//!     fn provider(&self) -> &str {
//!         "openai"
//!     }
//!
//!     async fn create(&self, config: &ModelConfiguration) -> Result<OpenAiHandle> {
//!         OpenAiHandle::connect(&self.http, config).await
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::{ModelConfiguration, Result};

// ============================================================================
// Execution handle
// ============================================================================

/// A live, reusable object for issuing generation calls against one model.
///
/// The core treats handles as opaque. It only shares them (behind `Arc`)
/// and releases them when they are evicted from the instance cache.
#[async_trait]
pub trait ExecutionHandle: Send + Sync + 'static {
    /// Release backend resources (connections, sessions).
    ///
    /// Called exactly once, when the handle leaves the instance cache.
    /// Callers may still hold clones of the `Arc`; a released handle is
    /// expected to refuse new work. Default: nothing to release.
    async fn release(&self) -> Result<()> {
        Ok(())
    }
}

// ============================================================================
// Backend factory
// ============================================================================

/// Builds execution handles for one provider.
///
/// Possibly slow and possibly failing. Errors are reported to callers of
/// [`Router::obtain`](crate::Router::obtain) as
/// [`CreationFailed`](crate::HuginnError::CreationFailed).
#[async_trait]
pub trait BackendFactory<H: ExecutionHandle>: Send + Sync {
    /// Provider id this factory serves (matches
    /// [`ModelDescriptor::provider`](crate::ModelDescriptor::provider)).
    fn provider(&self) -> &str;

    /// Build a handle for the given model configuration.
    async fn create(&self, config: &ModelConfiguration) -> Result<H>;
}

// ============================================================================
// Health collector
// ============================================================================

/// Source of per-model health readings.
///
/// Optional. When unreachable (returns `Err`), the router assumes the
/// model is healthy.
#[async_trait]
pub trait HealthCollector: Send + Sync {
    /// Recent error rate in `[0.0, 1.0]`, or `None` if there is no data.
    async fn error_rate(&self, model: &str) -> Result<Option<f64>>;
}
