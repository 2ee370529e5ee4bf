//! Model registry: registered descriptor/configuration pairs plus the
//! derived [`CapabilityIndex`].
//!
//! Every mutation validates its input first, then applies all changes
//! (descriptor, configuration and index) under a single write lock, so
//! concurrent readers see either the old registration or the new one,
//! never a mix.
//!
//! The registry can be seeded with a compiled-in set of well-known models
//! via [`ModelRegistry::with_builtin_defaults`].

mod index;

pub use index::CapabilityIndex;

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info, warn};

use crate::{
    Capability, HuginnError, ModelConfiguration, ModelDescriptor, ModelEntry, Result,
};

#[derive(Debug)]
struct Registered {
    /// Registration order; kept across re-registration.
    seq: u64,
    entry: ModelEntry,
}

#[derive(Debug, Default)]
struct RegistryState {
    models: HashMap<String, Registered>,
    index: CapabilityIndex,
    next_seq: u64,
}

/// Thread-safe registry of model descriptors and configurations.
///
/// Constructed once and shared (typically behind an `Arc`); all methods
/// take `&self`.
#[derive(Debug, Default)]
pub struct ModelRegistry {
    state: RwLock<RegistryState>,
}

impl ModelRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry pre-populated with the built-in seed models.
    ///
    /// The seed is compiled in. If it fails to parse, or an entry fails
    /// validation, the problem is logged and the remaining entries are
    /// still registered.
    pub fn with_builtin_defaults() -> Self {
        let registry = Self::new();
        match serde_json::from_str::<Vec<ModelEntry>>(BUILTIN_SEED) {
            Ok(entries) => {
                for entry in entries {
                    let id = entry.descriptor.id.clone();
                    if let Err(e) = registry.register(entry.descriptor, entry.configuration) {
                        warn!(model = %id, error = %e, "skipping invalid built-in model");
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "failed to parse built-in model seed");
            }
        }
        registry
    }

    /// Register a model, replacing any prior registration with the same id.
    ///
    /// Fails with [`HuginnError::Validation`] if either id or the provider
    /// is empty, or if the two ids disagree. Nothing is mutated on failure.
    pub fn register(
        &self,
        descriptor: ModelDescriptor,
        configuration: ModelConfiguration,
    ) -> Result<()> {
        validate_pair(&descriptor, &configuration)?;

        let id = descriptor.id.clone();
        let mut state = self.write();
        state.index.reindex(&id, &descriptor.capabilities);

        let entry = ModelEntry::new(descriptor, configuration);
        let replaced = if let Some(existing) = state.models.get_mut(&id) {
            existing.entry = entry;
            true
        } else {
            let seq = state.next_seq;
            state.next_seq += 1;
            state.models.insert(id.clone(), Registered { seq, entry });
            false
        };
        drop(state);

        if replaced {
            debug!(model = %id, "model re-registered");
        } else {
            info!(model = %id, "model registered");
        }
        Ok(())
    }

    /// Register a batch of entries, stopping at the first invalid one.
    ///
    /// Entries before the invalid one stay registered.
    pub fn register_all(&self, entries: impl IntoIterator<Item = ModelEntry>) -> Result<()> {
        for entry in entries {
            self.register(entry.descriptor, entry.configuration)?;
        }
        Ok(())
    }

    /// Replace a model's configuration. The descriptor and capability
    /// index are untouched.
    pub fn update_configuration(&self, id: &str, configuration: ModelConfiguration) -> Result<()> {
        if configuration.id != id {
            return Err(HuginnError::Validation(format!(
                "configuration id '{}' does not match model id '{id}'",
                configuration.id
            )));
        }
        let mut state = self.write();
        let registered = state
            .models
            .get_mut(id)
            .ok_or_else(|| HuginnError::NotFound(id.to_string()))?;
        registered.entry.configuration = configuration;
        drop(state);

        debug!(model = %id, "model configuration updated");
        Ok(())
    }

    /// Remove a model's descriptor, configuration and index entries.
    ///
    /// Returns the removed pair. Cached instances are not touched here;
    /// see [`Router::deregister`](crate::Router::deregister).
    pub fn remove(&self, id: &str) -> Result<ModelEntry> {
        let mut state = self.write();
        let removed = state
            .models
            .remove(id)
            .ok_or_else(|| HuginnError::NotFound(id.to_string()))?;
        state.index.remove(id);
        drop(state);

        info!(model = %id, "model removed");
        Ok(removed.entry)
    }

    /// Get a model's descriptor.
    pub fn descriptor(&self, id: &str) -> Result<ModelDescriptor> {
        self.entry(id).map(|e| e.descriptor)
    }

    /// Get a model's configuration.
    pub fn configuration(&self, id: &str) -> Result<ModelConfiguration> {
        self.entry(id).map(|e| e.configuration)
    }

    /// Get a model's descriptor and configuration as one snapshot.
    pub fn entry(&self, id: &str) -> Result<ModelEntry> {
        self.read()
            .models
            .get(id)
            .map(|r| r.entry.clone())
            .ok_or_else(|| HuginnError::NotFound(id.to_string()))
    }

    /// Whether `id` is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.read().models.contains_key(id)
    }

    /// Available descriptors carrying `tag`, in insertion order.
    pub fn query_by_capability(&self, tag: Capability) -> Vec<ModelDescriptor> {
        let state = self.read();
        state
            .index
            .ids(tag)
            .iter()
            .filter_map(|id| state.models.get(id))
            .filter(|r| r.entry.descriptor.available)
            .map(|r| r.entry.descriptor.clone())
            .collect()
    }

    /// Available and enabled models carrying `tag`, in insertion order.
    ///
    /// This is the candidate set handed to the selection engine.
    pub fn candidates(&self, tag: Capability) -> Vec<ModelEntry> {
        let state = self.read();
        state
            .index
            .ids(tag)
            .iter()
            .filter_map(|id| state.models.get(id))
            .filter(|r| r.entry.is_usable())
            .map(|r| r.entry.clone())
            .collect()
    }

    /// All registered descriptors, in registration order.
    pub fn list(&self) -> Vec<ModelDescriptor> {
        let state = self.read();
        let mut registered: Vec<&Registered> = state.models.values().collect();
        registered.sort_by_key(|r| r.seq);
        registered
            .into_iter()
            .map(|r| r.entry.descriptor.clone())
            .collect()
    }

    /// Capability tags that currently index at least one model.
    pub fn capabilities(&self) -> Vec<Capability> {
        self.read().index.tags()
    }

    /// Number of registered models.
    pub fn len(&self) -> usize {
        self.read().models.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.read().models.is_empty()
    }

    // Writes are validated before the lock is taken, so a poisoned lock
    // never guards a half-applied registration.
    fn read(&self) -> RwLockReadGuard<'_, RegistryState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistryState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn validate_pair(descriptor: &ModelDescriptor, configuration: &ModelConfiguration) -> Result<()> {
    if descriptor.id.trim().is_empty() {
        return Err(HuginnError::Validation("descriptor id is empty".into()));
    }
    if descriptor.provider.trim().is_empty() {
        return Err(HuginnError::Validation(format!(
            "provider is empty for model '{}'",
            descriptor.id
        )));
    }
    if configuration.id.trim().is_empty() {
        return Err(HuginnError::Validation(format!(
            "configuration id is empty for model '{}'",
            descriptor.id
        )));
    }
    if descriptor.id != configuration.id {
        return Err(HuginnError::Validation(format!(
            "descriptor id '{}' does not match configuration id '{}'",
            descriptor.id, configuration.id
        )));
    }
    Ok(())
}

/// Raw JSON seed data compiled into the binary.
const BUILTIN_SEED: &str = include_str!("seed.json");
