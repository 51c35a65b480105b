//! Error types for the guild resource lifecycle layer
//!
//! Runtime conditions (cache misses, expired entries, an empty sample history)
//! are never errors here; they resolve to `None`, `false` or zeroed values.
//! Everything below is a contract violation by the caller or a startup fault.

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the lifecycle layer
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid configuration value
    #[error("Invalid configuration for {field}: {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    /// Duration parse error
    #[error("Failed to parse duration: {0}")]
    DurationParse(String),

    /// Configuration document could not be decoded
    #[error("Failed to decode configuration: {0}")]
    ConfigDecode(#[from] serde_yaml::Error),

    // =========================================================================
    // Contract Violations
    // =========================================================================
    /// A per-call TTL of zero was supplied
    #[error("TTL must be greater than zero (entity {entity_id}, field {field})")]
    ZeroTtl { entity_id: String, field: String },

    /// A cooldown config with no scopes or a zero duration was supplied
    #[error("Invalid cooldown config: {0}")]
    InvalidCooldown(String),

    // =========================================================================
    // Runtime Environment Errors
    // =========================================================================
    /// Background timers require a Tokio runtime
    #[error("No Tokio runtime available to spawn background task '{task}'")]
    RuntimeUnavailable { task: &'static str },

    /// The current process could not be resolved for memory sampling
    #[error("Process lookup failed: {0}")]
    ProcessLookup(String),

    /// Report serialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for [`Error::InvalidConfig`]
    pub(crate) fn invalid_config(field: &'static str, reason: impl Into<String>) -> Self {
        Error::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }
}
