//! Adapter-scoped cache key derivation.

use prism_cache::{CacheKeyBuilder, FragmentKey};
use prism_core::{ResourceDescriptor, Result, Serializable};

use crate::adapter::Adapter;

/// Binds key derivation to an output adapter.
///
/// Every key derived through the binding carries the adapter's namespace
/// discriminator, so rendering the same object under two adapters never
/// reads or overwrites the other's cache entry even though both share
/// the object's identity and version token.
#[derive(Debug, Clone)]
pub struct AdapterCacheBinding {
    builder: CacheKeyBuilder,
}

impl AdapterCacheBinding {
    /// Create a binding for the active adapter.
    pub fn new(adapter: &dyn Adapter) -> Self {
        Self {
            builder: CacheKeyBuilder::new(adapter.namespace()),
        }
    }

    /// The adapter namespace keys are scoped to.
    pub fn namespace(&self) -> &str {
        self.builder.namespace()
    }

    /// Derive the adapter-scoped fragment key for one object.
    pub fn key(
        &self,
        object: &dyn Serializable,
        descriptor: &ResourceDescriptor,
    ) -> Result<FragmentKey> {
        self.builder.key(object, descriptor)
    }
}
