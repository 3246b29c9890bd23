//! Definition digests for cache keys.
//!
//! A digest protects against stale cache entries after a fragment's
//! *producing logic* changes, independent of the data. The digest source
//! is supplied when a type's descriptor is registered; computed digests
//! are memoized process-wide. Concurrent population is an idempotent
//! overwrite, so the map needs no coordination beyond its lock.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;
use sha2::{Digest, Sha256};

/// Digest length in hex characters appended to cache keys.
const DIGEST_LEN: usize = 16;

static DIGESTS: Lazy<RwLock<HashMap<String, Arc<str>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

static WARNED: Lazy<RwLock<HashSet<String>>> = Lazy::new(|| RwLock::new(HashSet::new()));

/// The memoized definition digest for a type, computing it on first use.
///
/// Returns `None` when the descriptor carries no digest source. A policy
/// that requires a digest degrades to digest-less keys in that case,
/// with a warning logged once per type; digest trouble never fails
/// request handling.
pub fn definition_digest(type_name: &str, source: Option<&str>) -> Option<Arc<str>> {
    let source = match source {
        Some(source) => source,
        None => return None,
    };
    if let Ok(map) = DIGESTS.read() {
        if let Some(digest) = map.get(type_name) {
            return Some(Arc::clone(digest));
        }
    }
    let digest: Arc<str> = Arc::from(compute_digest(source));
    if let Ok(mut map) = DIGESTS.write() {
        map.insert(type_name.to_string(), Arc::clone(&digest));
    }
    Some(digest)
}

/// Log the digest-missing degradation, once per type.
pub fn warn_missing_digest(type_name: &str) {
    if let Ok(mut warned) = WARNED.write() {
        if !warned.insert(type_name.to_string()) {
            return;
        }
    }
    tracing::warn!(
        type_name,
        "digest required but no digest source registered; caching without a digest"
    );
}

fn compute_digest(source: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    let mut digest = hex::encode(hasher.finalize());
    digest.truncate(DIGEST_LEN);
    digest
}
