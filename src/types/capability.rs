//! Capability tags a model may advertise.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::HuginnError;

/// A tagged feature a model may support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    /// Free-form text generation (chat or completion).
    TextGeneration,
    /// Tool / function calling.
    FunctionCalling,
    /// Incremental (streamed) responses.
    Streaming,
    /// Text embeddings.
    Embedding,
    /// Image input.
    Vision,
}

impl Capability {
    /// Every capability, in declaration order.
    pub const ALL: [Capability; 5] = [
        Capability::TextGeneration,
        Capability::FunctionCalling,
        Capability::Streaming,
        Capability::Embedding,
        Capability::Vision,
    ];

    /// Stable string form (matches the serde representation).
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::TextGeneration => "text-generation",
            Capability::FunctionCalling => "function-calling",
            Capability::Streaming => "streaming",
            Capability::Embedding => "embedding",
            Capability::Vision => "vision",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Capability {
    type Err = HuginnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Capability::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| HuginnError::Validation(format!("unknown capability '{s}'")))
    }
}
