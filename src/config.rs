//! Configuration loading.
//!
//! Configuration is loaded from TOML files with the following resolution order:
//! 1. explicit path (if provided)
//! 2. `~/.huginn/config.toml` (user)
//! 3. `/etc/huginn/config.toml` (system)
//!
//! Every key is optional. A file is read once at construction and never
//! polled; sections convert into the runtime [`RouterConfig`] and
//! [`InstanceCacheConfig`].
//!
//! ```toml
//! [routing]
//! default_model = "gpt-4o-mini"
//! failover_error_rate = 0.5
//! health_ttl_secs = 10
//!
//! [cache]
//! idle_threshold_secs = 1800
//! sweep_interval_secs = 300
//!
//! [[models]]
//! [models.descriptor]
//! id = "qwen2.5:14b"
//! provider = "ollama"
//! capabilities = ["text-generation", "streaming"]
//! performance_score = 60.0
//! [models.configuration]
//! id = "qwen2.5:14b"
//! connection = { base_url = "http://localhost:11434" }
//! limits = { max_context_length = 32768, cost_per_thousand_tokens = 0.0 }
//! ```

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{HuginnError, InstanceCacheConfig, ModelEntry, Result, RouterConfig};

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub routing: RoutingSection,
    #[serde(default)]
    pub cache: CacheSection,
    /// Register the compiled-in model seed before `models` (default: true).
    #[serde(default = "default_true")]
    pub builtin_models: bool,
    /// Additional models registered at startup.
    #[serde(default)]
    pub models: Vec<ModelEntry>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            routing: RoutingSection::default(),
            cache: CacheSection::default(),
            builtin_models: true,
            models: Vec::new(),
        }
    }
}

/// Routing policy.
#[derive(Debug, Clone, Deserialize)]
pub struct RoutingSection {
    /// Model substituted when selection fails (default: "gpt-4o-mini").
    #[serde(default = "default_model")]
    pub default_model: String,
    /// Error rate above which a model is skipped (default: 0.5).
    #[serde(default = "default_failover_error_rate")]
    pub failover_error_rate: f64,
    /// How long health readings are cached, in seconds (default: 10).
    #[serde(default = "default_health_ttl")]
    pub health_ttl_secs: u64,
}

impl Default for RoutingSection {
    fn default() -> Self {
        Self {
            default_model: default_model(),
            failover_error_rate: default_failover_error_rate(),
            health_ttl_secs: default_health_ttl(),
        }
    }
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_failover_error_rate() -> f64 {
    0.5
}

fn default_health_ttl() -> u64 {
    10
}

/// Instance cache policy.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheSection {
    /// Idle time before a cached instance is evicted, in seconds (default: 1800).
    #[serde(default = "default_idle_threshold")]
    pub idle_threshold_secs: u64,
    /// Interval between idle sweeps, in seconds (default: 300).
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            idle_threshold_secs: default_idle_threshold(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

fn default_idle_threshold() -> u64 {
    30 * 60
}

fn default_sweep_interval() -> u64 {
    5 * 60
}

fn default_true() -> bool {
    true
}

impl From<&RoutingSection> for RouterConfig {
    fn from(section: &RoutingSection) -> Self {
        RouterConfig::new(section.default_model.clone())
            .failover_error_rate(section.failover_error_rate)
            .health_ttl(Duration::from_secs(section.health_ttl_secs))
    }
}

impl From<&CacheSection> for InstanceCacheConfig {
    fn from(section: &CacheSection) -> Self {
        InstanceCacheConfig::new()
            .idle_threshold(Duration::from_secs(section.idle_threshold_secs))
            .sweep_interval(Duration::from_secs(section.sweep_interval_secs))
    }
}

impl Config {
    /// Load configuration from the standard locations.
    ///
    /// Resolution order:
    /// 1. Explicit path (if provided)
    /// 2. `~/.huginn/config.toml`
    /// 3. `/etc/huginn/config.toml`
    ///
    /// Fails if no file is found.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let path = Self::resolve_config_path(explicit_path)?.ok_or_else(|| {
            HuginnError::Configuration(
                "No config file found. Create ~/.huginn/config.toml or /etc/huginn/config.toml"
                    .to_string(),
            )
        })?;
        Self::load_from_file(&path)
    }

    /// Like [`load`](Self::load), but falls back to [`Config::default`]
    /// when no file exists in the standard locations. An explicit path
    /// that does not exist is still an error.
    pub fn load_or_default(explicit_path: Option<&Path>) -> Result<Self> {
        match Self::resolve_config_path(explicit_path)? {
            Some(path) => Self::load_from_file(&path),
            None => Ok(Self::default()),
        }
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| HuginnError::Configuration(format!("Failed to parse config: {e}")))
    }

    /// Runtime router settings.
    pub fn router_config(&self) -> RouterConfig {
        RouterConfig::from(&self.routing)
    }

    /// Runtime instance cache settings.
    pub fn cache_config(&self) -> InstanceCacheConfig {
        InstanceCacheConfig::from(&self.cache)
    }

    fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            HuginnError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            HuginnError::Configuration(format!("Failed to parse config file {path:?}: {e}"))
        })
    }

    /// Resolve the config file path. `Ok(None)` = nothing in the standard
    /// locations.
    fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Some(path.to_path_buf()));
            }
            return Err(HuginnError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        // User config
        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".huginn").join("config.toml");
            if user_config.exists() {
                return Ok(Some(user_config));
            }
        }

        // System config
        let system_config = PathBuf::from("/etc/huginn/config.toml");
        if system_config.exists() {
            return Ok(Some(system_config));
        }

        Ok(None)
    }
}
