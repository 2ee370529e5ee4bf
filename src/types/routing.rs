//! Routing request and decision types.

use std::fmt;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// Model names that ask the router to choose.
const AUTO_MODEL_NAMES: &[&str] = &["auto", "default"];

/// The shape of an inference request, as seen by the router.
///
/// Only the parts that influence model choice are captured; the payload
/// itself is forwarded to the execution handle by the caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoutingRequest {
    /// Explicit model id, `"auto"`/`"default"`, or `None`.
    #[serde(default)]
    pub model: Option<String>,
    /// Prompt content, used to estimate the context length needed.
    #[serde(default)]
    pub content: String,
    /// The request carries tool definitions.
    #[serde(default)]
    pub tools: bool,
    /// The caller wants a streamed response.
    #[serde(default)]
    pub stream: bool,
    /// The request carries image input.
    #[serde(default)]
    pub images: bool,
    /// Priority hint ("realtime", "batch", "cost-sensitive").
    #[serde(default)]
    pub priority_hint: Option<String>,
    #[serde(default)]
    pub preferred_providers: Vec<String>,
    #[serde(default)]
    pub max_cost_per_thousand_tokens: Option<f64>,
}

impl RoutingRequest {
    /// Create a request for the given prompt content.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }

    /// Name a model explicitly.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Mark the request as using tools.
    pub fn tools(mut self, tools: bool) -> Self {
        self.tools = tools;
        self
    }

    /// Mark the request as streamed.
    pub fn stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    /// Mark the request as carrying images.
    pub fn images(mut self, images: bool) -> Self {
        self.images = images;
        self
    }

    /// Set the priority hint.
    pub fn priority_hint(mut self, hint: impl Into<String>) -> Self {
        self.priority_hint = Some(hint.into());
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

    /// The explicitly requested model id, if the request names a concrete one.
    pub fn explicit_model(&self) -> Option<&str> {
        self.model
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .filter(|m| !AUTO_MODEL_NAMES.iter().any(|a| m.eq_ignore_ascii_case(a)))
    }
}

/// Why a routing decision resolved the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rationale {
    /// The explicitly requested model was usable.
    Explicit,
    /// The selection engine picked the model.
    Auto,
    /// The configured default model was substituted.
    Fallback,
}

impl Rationale {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rationale::Explicit => "explicit",
            Rationale::Auto => "auto",
            Rationale::Fallback => "fallback",
        }
    }
}

impl fmt::Display for Rationale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of routing one request. Immutable once produced; only the
/// router constructs one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutingDecision {
    requested: Option<String>,
    resolved: String,
    rationale: Rationale,
    decided_at: SystemTime,
}

impl RoutingDecision {
    pub(crate) fn new(
        requested: Option<String>,
        resolved: impl Into<String>,
        rationale: Rationale,
    ) -> Self {
        Self {
            requested,
            resolved: resolved.into(),
            rationale,
            decided_at: SystemTime::now(),
        }
    }

    /// The model id the request asked for, verbatim.
    pub fn requested(&self) -> Option<&str> {
        self.requested.as_deref()
    }

    /// The model id that will serve the request.
    pub fn resolved(&self) -> &str {
        &self.resolved
    }

    pub fn rationale(&self) -> Rationale {
        self.rationale
    }

    pub fn decided_at(&self) -> SystemTime {
        self.decided_at
    }
}
