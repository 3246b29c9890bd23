//! Cache resolution configuration.

use std::time::Duration;

/// Behavior knobs for [`crate::MultiFetchCache`].
///
/// Constructed explicitly and passed by reference; there is no ambient
/// global cache configuration.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Time-to-live applied to written fragments when the owning policy
    /// sets none.
    pub default_ttl: Option<Duration>,
    /// When the store is unreachable, compute every key directly instead
    /// of failing the resolve.
    pub bypass_on_unavailable: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: None,
            bypass_on_unavailable: false,
        }
    }
}

impl CacheConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default fragment time-to-live.
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = Some(ttl);
        self
    }

    /// Degrade to direct computation when the store is unreachable.
    pub fn with_bypass_on_unavailable(mut self) -> Self {
        self.bypass_on_unavailable = true;
        self
    }
}
