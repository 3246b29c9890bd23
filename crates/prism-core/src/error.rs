//! Error taxonomy shared across the Prism crates.

use thiserror::Error;

/// Result type for Prism operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while deriving keys, walking includes, or
/// resolving fragments.
#[derive(Debug, Error)]
pub enum Error {
    /// Policy or identity misconfiguration. Fatal; surfaced to the caller
    /// and never retried.
    #[error("Configuration error for '{type_name}': {reason}")]
    Configuration {
        type_name: String,
        reason: String,
    },

    /// The cache backend could not be reached. Callers may degrade to
    /// direct computation of every key (bypass mode) or abort.
    #[error("Cache store '{store}' unavailable: {reason}")]
    CacheUnavailable { store: String, reason: String },

    /// Malformed include specification. Rejected before any backend call.
    #[error("Invalid include spec '{spec}': {reason}")]
    InvalidIncludeSpec { spec: String, reason: String },

    /// A single fragment's compute-on-miss failed. Isolated to its key;
    /// sibling keys are unaffected.
    #[error("Producer failed for key '{key}': {source}")]
    Producer {
        key: String,
        #[source]
        source: anyhow::Error,
    },

    /// Fragment bytes could not be serialized for the store.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for a configuration error.
    pub fn configuration(type_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Configuration {
            type_name: type_name.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for an invalid include spec error.
    pub fn invalid_include(spec: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidIncludeSpec {
            spec: spec.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for a per-key producer error.
    pub fn producer(key: impl Into<String>, source: anyhow::Error) -> Self {
        Self::Producer {
            key: key.into(),
            source,
        }
    }

    /// Check if this error is recoverable via bypass-to-direct-compute.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::CacheUnavailable { .. })
    }
}
