//! Cache key derivation.
//!
//! Keys must be byte-identical across renders of an unchanged object;
//! that determinism is what makes the batched multi-fetch able to hit.

use chrono::{DateTime, Utc};
use prism_core::{key_prefix, Error, ResourceDescriptor, Result, Serializable};

use crate::digest;

/// Fixed-precision rendering of the version signal, so two renders of an
/// unchanged object always format identically.
const VERSION_FORMAT: &str = "%Y%m%d%H%M%S%9f";

/// A derived cache key for one object's fragment under one adapter
/// namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FragmentKey(String);

impl FragmentKey {
    /// Wrap an already-derived key string.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The key string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume and return the inner string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for FragmentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for FragmentKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Derives stable, version-aware cache keys:
/// `"{namespace}/{prefix}/{id}[-{version}][-{digest}]"`.
///
/// The namespace is the active output adapter's discriminator; folding it
/// into every key keeps incompatible representations of the same object
/// from sharing a cache slot.
#[derive(Debug, Clone)]
pub struct CacheKeyBuilder {
    namespace: String,
}

impl CacheKeyBuilder {
    /// Create a builder scoped to an adapter namespace.
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    /// The adapter namespace this builder scopes keys to.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Derive the fragment key for one object.
    ///
    /// The prefix is the policy's explicit `key_prefix` when configured,
    /// otherwise the lower-cased, underscored, singular type name. The
    /// version segment is omitted for objects with no version signal.
    /// Fails with a configuration error when the type's policy enables
    /// caching but the object resolves no identity.
    pub fn key(&self, object: &dyn Serializable, descriptor: &ResourceDescriptor) -> Result<FragmentKey> {
        let policy = descriptor.policy();
        let id = object.identity().ok_or_else(|| {
            Error::configuration(
                descriptor.type_name(),
                "caching enabled but object resolves no identity",
            )
        })?;

        let prefix = match &policy.key_prefix {
            Some(prefix) => prefix.clone(),
            None => key_prefix(descriptor.type_name()),
        };

        let mut key = format!("{}/{}/{}", self.namespace, prefix, id);
        if let Some(version) = object.version() {
            key.push('-');
            key.push_str(&version_token(&version));
        }
        if policy.require_digest {
            match digest::definition_digest(descriptor.type_name(), descriptor.digest_source()) {
                Some(digest) => {
                    key.push('-');
                    key.push_str(&digest);
                }
                None => digest::warn_missing_digest(descriptor.type_name()),
            }
        }
        Ok(FragmentKey(key))
    }
}

fn version_token(version: &DateTime<Utc>) -> String {
    version.format(VERSION_FORMAT).to_string()
}
