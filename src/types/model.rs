//! Model descriptor and configuration types.
//!
//! A model is registered as a pair: an immutable [`ModelDescriptor`]
//! (what the model *is*) and a mutable [`ModelConfiguration`] (how it is
//! reached and what it costs). Both carry the same identifier.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::Capability;

/// Immutable metadata about a backend model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    /// Unique, stable model identifier (e.g. "gpt-4o-mini").
    pub id: String,
    /// Human-readable name.
    #[serde(default)]
    pub name: String,
    /// Owning provider id (e.g. "openai", "ollama").
    pub provider: String,
    /// Capabilities this model supports. Duplicates are ignored.
    #[serde(default)]
    pub capabilities: Vec<Capability>,
    /// Relative performance score; higher is better.
    #[serde(default)]
    pub performance_score: f64,
    /// Whether the model currently accepts traffic.
    #[serde(default = "default_true")]
    pub available: bool,
}

impl ModelDescriptor {
    /// Create a descriptor with required fields. Available by default.
    pub fn new(id: impl Into<String>, provider: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            provider: provider.into(),
            capabilities: Vec::new(),
            performance_score: 0.0,
            available: true,
        }
    }

    /// Set the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Add a capability to this model.
    pub fn with_capability(mut self, cap: Capability) -> Self {
        if !self.capabilities.contains(&cap) {
            self.capabilities.push(cap);
        }
        self
    }

    /// Set the performance score.
    pub fn with_performance_score(mut self, score: f64) -> Self {
        self.performance_score = score;
        self
    }

    /// Set the availability flag.
    pub fn with_available(mut self, available: bool) -> Self {
        self.available = available;
        self
    }

    /// Whether this model advertises `cap`.
    pub fn supports(&self, cap: Capability) -> bool {
        self.capabilities.contains(&cap)
    }
}

/// Provider connection parameters. Opaque to the orchestration core;
/// interpreted only by the backend factory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectionParams {
    /// Base URL of the provider endpoint.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Name of the environment variable holding the API key.
    #[serde(default)]
    pub api_key_env: Option<String>,
    /// Request timeout hint for the backend, in seconds.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Provider-specific extras.
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

/// Usage limits and pricing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelLimits {
    /// Maximum context length in tokens.
    #[serde(default = "default_context_length")]
    pub max_context_length: usize,
    /// Cost in USD per thousand tokens.
    #[serde(default)]
    pub cost_per_thousand_tokens: f64,
}

impl Default for ModelLimits {
    fn default() -> Self {
        Self {
            max_context_length: default_context_length(),
            cost_per_thousand_tokens: 0.0,
        }
    }
}

/// Mutable operational settings for a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfiguration {
    /// Must equal the owning descriptor's id.
    pub id: String,
    #[serde(default)]
    pub connection: ConnectionParams,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub limits: ModelLimits,
}

impl ModelConfiguration {
    /// Create an enabled configuration with default limits.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            connection: ConnectionParams::default(),
            enabled: true,
            limits: ModelLimits::default(),
        }
    }

    /// Set the connection parameters.
    pub fn with_connection(mut self, connection: ConnectionParams) -> Self {
        self.connection = connection;
        self
    }

    /// Set the enabled flag.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the maximum context length.
    pub fn with_max_context_length(mut self, tokens: usize) -> Self {
        self.limits.max_context_length = tokens;
        self
    }

    /// Set the cost per thousand tokens.
    pub fn with_cost_per_thousand_tokens(mut self, cost: f64) -> Self {
        self.limits.cost_per_thousand_tokens = cost;
        self
    }
}

/// A descriptor and its configuration, as one snapshot.
///
/// This is the unit of registration and the candidate type consumed by
/// [`SelectionEngine`](crate::SelectionEngine).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelEntry {
    pub descriptor: ModelDescriptor,
    pub configuration: ModelConfiguration,
}

impl ModelEntry {
    /// Pair a descriptor with its configuration.
    pub fn new(descriptor: ModelDescriptor, configuration: ModelConfiguration) -> Self {
        Self {
            descriptor,
            configuration,
        }
    }

    /// Model identifier.
    pub fn id(&self) -> &str {
        &self.descriptor.id
    }

    /// Whether the model is both available and enabled.
    pub fn is_usable(&self) -> bool {
        self.descriptor.available && self.configuration.enabled
    }
}

fn default_true() -> bool {
    true
}

fn default_context_length() -> usize {
    4096
}
