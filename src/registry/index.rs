//! Capability index: capability tag → insertion-ordered model ids.
//!
//! Derived from [`ModelRegistry`](super::ModelRegistry) contents and only
//! ever mutated by it, under the registry's write lock.

use std::collections::HashMap;

use crate::Capability;

/// Mapping from capability tag to the ids of models carrying it.
///
/// Each per-tag list is an insertion-ordered set: an id appears at most
/// once, in the order it first gained the tag.
#[derive(Debug, Clone, Default)]
pub struct CapabilityIndex {
    by_tag: HashMap<Capability, Vec<String>>,
}

impl CapabilityIndex {
    /// Ids carrying `tag`, in insertion order.
    pub fn ids(&self, tag: Capability) -> &[String] {
        self.by_tag.get(&tag).map(Vec::as_slice).unwrap_or_default()
    }

    /// Whether `id` is indexed under `tag`.
    pub fn contains(&self, tag: Capability, id: &str) -> bool {
        self.ids(tag).iter().any(|i| i == id)
    }

    /// Tags that currently index at least one model.
    pub fn tags(&self) -> Vec<Capability> {
        let mut tags: Vec<_> = self
            .by_tag
            .iter()
            .filter(|(_, ids)| !ids.is_empty())
            .map(|(tag, _)| *tag)
            .collect();
        tags.sort();
        tags
    }

    /// Make `id`'s entries match `capabilities` exactly: stale tags are
    /// dropped, new tags are appended, existing positions are kept.
    pub(crate) fn reindex(&mut self, id: &str, capabilities: &[Capability]) {
        for (tag, ids) in self.by_tag.iter_mut() {
            if !capabilities.contains(tag) {
                ids.retain(|i| i != id);
            }
        }
        for tag in capabilities {
            let ids = self.by_tag.entry(*tag).or_default();
            if !ids.iter().any(|i| i == id) {
                ids.push(id.to_string());
            }
        }
    }

    /// Drop `id` from every tag.
    pub(crate) fn remove(&mut self, id: &str) {
        for ids in self.by_tag.values_mut() {
            ids.retain(|i| i != id);
        }
    }
}
