//! Selection criteria used to pick a model automatically.

use serde::{Deserialize, Serialize};

use super::Capability;

/// What the selection engine should optimise for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformancePriority {
    /// Prefer the highest performance score.
    Speed,
    /// Prefer the highest performance score.
    Quality,
    /// Prefer the lowest cost per thousand tokens.
    Cost,
    /// Prefer the highest performance score.
    #[default]
    Balanced,
}

impl PerformancePriority {
    /// Map a request-provided hint onto a priority.
    ///
    /// `"realtime"` → `Speed`, `"batch"` → `Quality`,
    /// `"cost-sensitive"` → `Cost`; anything else is `Balanced`.
    /// Matching is case-insensitive.
    pub fn from_hint(hint: &str) -> Self {
        match hint.trim().to_ascii_lowercase().as_str() {
            "realtime" => Self::Speed,
            "batch" => Self::Quality,
            "cost-sensitive" => Self::Cost,
            _ => Self::Balanced,
        }
    }
}

/// Constraints and priorities for automatic model selection.
///
/// ```rust
/// # use huginn::{Capability, PerformancePriority, SelectionCriteria};
/// let criteria = SelectionCriteria::new()
///     .require(Capability::TextGeneration)
///     .max_cost_per_thousand_tokens(0.002)
///     .priority(PerformancePriority::Cost);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectionCriteria {
    /// Every listed capability must be supported. Empty = no constraint.
    #[serde(default)]
    pub required_capabilities: Vec<Capability>,
    /// Providers to narrow to when any candidate matches.
    #[serde(default)]
    pub preferred_providers: Vec<String>,
    /// Upper bound on cost per thousand tokens.
    #[serde(default)]
    pub max_cost_per_thousand_tokens: Option<f64>,
    /// Lower bound on max context length.
    #[serde(default)]
    pub min_context_length: Option<usize>,
    #[serde(default)]
    pub performance_priority: PerformancePriority,
}

impl SelectionCriteria {
    /// Create criteria with no constraints and `Balanced` priority.
    pub fn new() -> Self {
        Self::default()
    }

    /// Require a capability.
    pub fn require(mut self, cap: Capability) -> Self {
        if !self.required_capabilities.contains(&cap) {
            self.required_capabilities.push(cap);
        }
        self
    }

    /// Add a preferred provider.
    pub fn prefer_provider(mut self, provider: impl Into<String>) -> Self {
        self.preferred_providers.push(provider.into());
        self
    }

    /// Set the cost ceiling.
    pub fn max_cost_per_thousand_tokens(mut self, cost: f64) -> Self {
        self.max_cost_per_thousand_tokens = Some(cost);
        self
    }

    /// Set the minimum context length.
    pub fn min_context_length(mut self, tokens: usize) -> Self {
        self.min_context_length = Some(tokens);
        self
    }

    /// Set the performance priority.
    pub fn priority(mut self, priority: PerformancePriority) -> Self {
        self.performance_priority = priority;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hints_map_to_priorities() {
        assert_eq!(PerformancePriority::from_hint("realtime"), PerformancePriority::Speed);
        assert_eq!(PerformancePriority::from_hint("BATCH"), PerformancePriority::Quality);
        assert_eq!(
            PerformancePriority::from_hint("cost-sensitive"),
            PerformancePriority::Cost
        );
        assert_eq!(PerformancePriority::from_hint("whatever"), PerformancePriority::Balanced);
    }

    #[test]
    fn require_deduplicates() {
        let c = SelectionCriteria::new()
            .require(Capability::TextGeneration)
            .require(Capability::TextGeneration);
        assert_eq!(c.required_capabilities, vec![Capability::TextGeneration]);
    }
}
