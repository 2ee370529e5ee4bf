//! Multi-criteria model selection.
//!
//! [`SelectionEngine::pick`] filters a candidate set against
//! [`SelectionCriteria`] and orders what remains:
//!
//! 1. drop candidates missing any required capability
//! 2. narrow to preferred providers, but only if at least one matches
//! 3. drop candidates above the cost ceiling
//! 4. drop candidates below the minimum context length
//! 5. order by priority: `Cost` ascending by cost per thousand tokens,
//!    everything else descending by performance score
//!
//! Sorting is stable, so ties keep the candidates' input order. Feed the
//! engine candidates in registration order (as
//! [`ModelRegistry::candidates`](crate::ModelRegistry::candidates) does)
//! and selection is deterministic.

use std::cmp::Ordering;

use tracing::debug;

use crate::{HuginnError, ModelEntry, PerformancePriority, Result, SelectionCriteria};

/// Stateless scorer over candidate models.
#[derive(Debug, Clone, Copy, Default)]
pub struct SelectionEngine;

impl SelectionEngine {
    pub fn new() -> Self {
        Self
    }

    /// Return the best candidate for `criteria`.
    ///
    /// Fails with [`HuginnError::NoSuitableModel`] if every candidate is
    /// filtered out.
    pub fn pick<'a>(
        &self,
        candidates: &'a [ModelEntry],
        criteria: &SelectionCriteria,
    ) -> Result<&'a ModelEntry> {
        let best = self
            .rank(candidates, criteria)
            .into_iter()
            .next()
            .ok_or(HuginnError::NoSuitableModel)?;
        debug!(
            model = %best.id(),
            priority = ?criteria.performance_priority,
            considered = candidates.len(),
            "selected model"
        );
        Ok(best)
    }

    /// Every candidate that satisfies `criteria`, best first.
    pub fn rank<'a>(
        &self,
        candidates: &'a [ModelEntry],
        criteria: &SelectionCriteria,
    ) -> Vec<&'a ModelEntry> {
        let mut matching: Vec<&ModelEntry> = candidates
            .iter()
            .filter(|c| {
                criteria
                    .required_capabilities
                    .iter()
                    .all(|cap| c.descriptor.supports(*cap))
            })
            .collect();

        if !criteria.preferred_providers.is_empty() {
            let preferred: Vec<&ModelEntry> = matching
                .iter()
                .copied()
                .filter(|c| criteria.preferred_providers.contains(&c.descriptor.provider))
                .collect();
            if !preferred.is_empty() {
                matching = preferred;
            }
        }

        if let Some(max_cost) = criteria.max_cost_per_thousand_tokens {
            matching.retain(|c| c.configuration.limits.cost_per_thousand_tokens <= max_cost);
        }
        if let Some(min_context) = criteria.min_context_length {
            matching.retain(|c| c.configuration.limits.max_context_length >= min_context);
        }

        matching.sort_by(|a, b| compare(a, b, criteria.performance_priority));
        matching
    }
}

fn compare(a: &ModelEntry, b: &ModelEntry, priority: PerformancePriority) -> Ordering {
    match priority {
        PerformancePriority::Cost => a
            .configuration
            .limits
            .cost_per_thousand_tokens
            .total_cmp(&b.configuration.limits.cost_per_thousand_tokens),
        PerformancePriority::Speed | PerformancePriority::Quality | PerformancePriority::Balanced => {
            b.descriptor
                .performance_score
                .total_cmp(&a.descriptor.performance_score)
        }
    }
}
