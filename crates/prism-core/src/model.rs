//! Handles to serializable domain objects.
//!
//! Accessors are plain trait methods, dispatched virtually through
//! `ObjectRef` handles held by the walk and render pipeline; no accessor
//! code is generated at runtime.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;

/// The cached unit: the serialized attribute map of exactly one object
/// under exactly one adapter namespace, excluding association payloads.
pub type Fragment = serde_json::Map<String, Value>;

/// Shared handle to a domain object participating in serialization.
pub type ObjectRef = Arc<dyn Serializable>;

/// A domain object that can be serialized into a document.
///
/// Implementations expose a stable identity, an optional monotonically
/// increasing version signal, and accessors for the attributes and
/// associations declared on the type's `ResourceDescriptor`.
pub trait Serializable: Send + Sync {
    /// The type name under which this object's descriptor is registered.
    fn type_name(&self) -> &'static str;

    /// The object's stable identity, if it has one.
    ///
    /// Objects of cache-enabled types must resolve an identity; key
    /// derivation fails with a configuration error otherwise.
    fn identity(&self) -> Option<String>;

    /// The object's last-modified signal, used as the cache version token.
    ///
    /// Returning `None` yields a key without a version segment, trading
    /// staleness risk for availability.
    fn version(&self) -> Option<DateTime<Utc>>;

    /// Read one declared attribute by accessor name.
    ///
    /// Failures here (lazy loads, upstream fetches) surface as per-key
    /// producer errors and never abort sibling fragments.
    fn attribute(&self, name: &str) -> anyhow::Result<Value>;

    /// Read one declared association by accessor name.
    fn association(&self, name: &str) -> anyhow::Result<Association>;
}

/// The value of an association edge.
pub enum Association {
    /// A to-one edge; `None` when the reference is unset.
    One(Option<ObjectRef>),
    /// A to-many edge, in the collection's iteration order.
    Many(Vec<ObjectRef>),
}

impl Association {
    /// Number of referenced objects.
    pub fn len(&self) -> usize {
        match self {
            Self::One(target) => usize::from(target.is_some()),
            Self::Many(targets) => targets.len(),
        }
    }

    /// Check if the edge references no objects.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate the referenced objects in order.
    pub fn members(&self) -> impl Iterator<Item = &ObjectRef> {
        let slice: &[ObjectRef] = match self {
            Self::One(Some(target)) => std::slice::from_ref(target),
            Self::One(None) => &[],
            Self::Many(targets) => targets.as_slice(),
        };
        slice.iter()
    }
}
