//! Provider-id-keyed table of backend factories.
//!
//! Populated at startup. Looking up a provider with no factory is a
//! data-driven [`HuginnError::Unsupported`], not a control-flow default.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::traits::{BackendFactory, ExecutionHandle};
use crate::{HuginnError, Result};

/// Strategy table: provider id → factory.
pub struct BackendTable<H: ExecutionHandle> {
    factories: HashMap<String, Arc<dyn BackendFactory<H>>>,
}

impl<H: ExecutionHandle> BackendTable<H> {
    /// Create an empty table.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a factory under its own provider id, replacing any
    /// previous factory for that provider.
    pub fn insert(&mut self, factory: Arc<dyn BackendFactory<H>>) {
        self.factories.insert(factory.provider().to_string(), factory);
    }

    /// Look up the factory for `provider`.
    pub fn get(&self, provider: &str) -> Result<Arc<dyn BackendFactory<H>>> {
        self.factories
            .get(provider)
            .cloned()
            .ok_or_else(|| HuginnError::Unsupported {
                provider: provider.to_string(),
            })
    }

    /// Whether a factory is registered for `provider`.
    pub fn supports(&self, provider: &str) -> bool {
        self.factories.contains_key(provider)
    }

    /// Registered provider ids, sorted.
    pub fn providers(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl<H: ExecutionHandle> Default for BackendTable<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: ExecutionHandle> fmt::Debug for BackendTable<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendTable")
            .field("providers", &self.providers())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ModelConfiguration;
    use async_trait::async_trait;

    struct Handle;
    impl ExecutionHandle for Handle {}

    struct Factory(&'static str);

    #[async_trait]
    impl BackendFactory<Handle> for Factory {
        fn provider(&self) -> &str {
            self.0
        }

        async fn create(&self, _config: &ModelConfiguration) -> Result<Handle> {
            Ok(Handle)
        }
    }

    #[test]
    fn unknown_provider_is_unsupported() {
        let table = BackendTable::<Handle>::new();
        let err = table.get("openai").err().unwrap();
        assert!(matches!(err, HuginnError::Unsupported { provider } if provider == "openai"));
    }

    #[test]
    fn insert_keys_by_provider() {
        let mut table = BackendTable::new();
        table.insert(Arc::new(Factory("ollama")));
        table.insert(Arc::new(Factory("anthropic")));

        assert!(table.supports("ollama"));
        assert_eq!(table.providers(), ["anthropic", "ollama"]);
        assert_eq!(table.get("ollama").unwrap().provider(), "ollama");
    }
}
