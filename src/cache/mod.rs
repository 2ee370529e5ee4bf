//! Caching subsystem.
//!
//! Two independent caches:
//!
//! - [`InstanceCache`]: live execution handles, one per model id, created
//!   lazily, refreshed on every hit, and released by an idle sweep, an
//!   explicit eviction, or shutdown. See [`instance`] module docs for the
//!   locking scheme.
//!
//! - [`HealthCache`]: short-TTL store of health collector readings,
//!   consulted by the [`Router`](crate::Router) before routing to a model.

pub mod health;
pub mod instance;

pub use health::HealthCache;
pub use instance::{InstanceCache, InstanceCacheConfig};
