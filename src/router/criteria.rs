//! Derive selection criteria from the shape of a request.

use crate::{Capability, PerformancePriority, RoutingRequest, SelectionCriteria};

/// Rough characters-per-token ratio used for context estimates.
const CHARS_PER_TOKEN: usize = 4;

/// Estimated prompt size (tokens) from which the context length matters.
const LONG_CONTENT_TOKENS: usize = 1024;

/// Floor for the context requirement of long prompts.
const MIN_LONG_CONTEXT: usize = 4096;

/// Rough token estimate for `content`.
pub fn estimate_tokens(content: &str) -> usize {
    content.chars().count() / CHARS_PER_TOKEN
}

impl From<&RoutingRequest> for SelectionCriteria {
    /// Text generation is always required; tool use, streaming and images
    /// add their capabilities. Long prompts require a context of twice the
    /// estimate (room for the response), never less than 4096 tokens.
    fn from(request: &RoutingRequest) -> Self {
        let mut criteria = SelectionCriteria::new().require(Capability::TextGeneration);
        if request.tools {
            criteria = criteria.require(Capability::FunctionCalling);
        }
        if request.stream {
            criteria = criteria.require(Capability::Streaming);
        }
        if request.images {
            criteria = criteria.require(Capability::Vision);
        }

        let estimate = estimate_tokens(&request.content);
        if estimate >= LONG_CONTENT_TOKENS {
            criteria = criteria.min_context_length((estimate * 2).max(MIN_LONG_CONTEXT));
        }

        if let Some(hint) = &request.priority_hint {
            criteria = criteria.priority(PerformancePriority::from_hint(hint));
        }
        criteria.preferred_providers = request.preferred_providers.clone();
        criteria.max_cost_per_thousand_tokens = request.max_cost_per_thousand_tokens;
        criteria
    }
}
