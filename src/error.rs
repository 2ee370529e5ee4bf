//! Huginn error types

/// Huginn error types
#[derive(Debug, thiserror::Error)]
pub enum HuginnError {
    // Registration / lookup errors
    /// Malformed registration input. Rejected before any state is touched.
    #[error("validation error: {0}")]
    Validation(String),

    #[error("model not found: {0}")]
    NotFound(String),

    // Selection errors
    /// Every candidate was filtered out by the selection criteria.
    #[error("no suitable model for the given criteria")]
    NoSuitableModel,

    // Instance errors
    /// The backend factory failed while populating the instance cache.
    #[error("failed to create instance for model '{model}': {reason}")]
    CreationFailed { model: String, reason: String },

    /// No backend factory is registered for this provider.
    #[error("no backend registered for provider '{provider}'")]
    Unsupported { provider: String },

    /// Error raised by a backend factory or an execution handle.
    #[error("backend error: {0}")]
    Backend(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("instance cache has been shut down")]
    ShutDown,

    // Configuration errors
    /// The configured default model is itself unusable.
    #[error("fatal configuration error: {0}")]
    FatalConfiguration(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    // Data errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for Huginn operations
pub type Result<T> = std::result::Result<T, HuginnError>;
