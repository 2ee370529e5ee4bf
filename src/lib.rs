//! Huginn - In-process model orchestration for LLM backends
//!
//! This crate decides *which* model serves a request and hands back a
//! live, shared execution handle for it. It does not talk to providers
//! itself: callers plug in a [`BackendFactory`] per provider and receive
//! whatever [`ExecutionHandle`] type that factory builds.
//!
//! The pieces:
//!
//! - [`ModelRegistry`] holds model descriptors and configurations and
//!   maintains a [`CapabilityIndex`] over them.
//! - [`SelectionEngine`] picks the best candidate for a set of
//!   [`SelectionCriteria`].
//! - [`InstanceCache`] keeps one handle per model, created lazily and
//!   released after an idle period.
//! - [`Router`] ties them together: explicit model, auto-selection, or
//!   fallback to the configured default.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use huginn::{BackendFactory, ExecutionHandle, ModelConfiguration, Router, RoutingRequest};
//!
//! struct Client { base_url: Option<String> }
//!
//! #[async_trait]
//! impl ExecutionHandle for Client {}
//!
//! struct OpenAi;
//!
//! #[async_trait]
//! impl BackendFactory<Client> for OpenAi {
//!     fn provider(&self) -> &str {
//!         "openai"
//!     }
//!
//!     async fn create(&self, config: &ModelConfiguration) -> huginn::Result<Client> {
//!         Ok(Client { base_url: config.connection.base_url.clone() })
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> huginn::Result<()> {
//!     let router = Router::<Client>::builder()
//!         .backend(Arc::new(OpenAi))
//!         .build()?;
//!
//!     let request = RoutingRequest::new("Summarize this thread").tools(true);
//!     let (decision, _client) = router.route(&request).await?;
//!     println!("{} ({})", decision.resolved(), decision.rationale());
//!
//!     router.shutdown().await
//! }
//! ```

pub mod backend;
pub mod cache;
pub mod config;
pub mod error;
pub mod registry;
pub mod router;
pub mod selection;
pub mod telemetry;
pub mod types;

// Re-export main types at crate root
pub use backend::{BackendFactory, BackendTable, ExecutionHandle, HealthCollector};
pub use cache::{HealthCache, InstanceCache, InstanceCacheConfig};
pub use config::Config;
pub use error::{HuginnError, Result};
pub use registry::{CapabilityIndex, ModelRegistry};
pub use router::{Router, RouterBuilder, RouterConfig};
pub use selection::SelectionEngine;

// Re-export all types
pub use types::{
    Capability, ConnectionParams, ModelConfiguration, ModelDescriptor, ModelEntry, ModelLimits,
    PerformancePriority, Rationale, RoutingDecision, RoutingRequest, SelectionCriteria,
};
