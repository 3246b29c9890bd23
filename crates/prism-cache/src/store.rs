//! Cache store boundary.
//!
//! The pipeline assumes string-keyed byte storage with batched reads and
//! writes and optional expiry. Everything else (eviction, replication,
//! transport) belongs to the store implementation.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use prism_core::{Error, Result};

/// Batched key-value store for serialized fragments.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Store name, used in error reports and logs.
    fn name(&self) -> &str;

    /// Fetch every present key in one round trip.
    ///
    /// Absent keys are simply missing from the returned map.
    async fn multi_get(&self, keys: &[String]) -> Result<HashMap<String, Vec<u8>>>;

    /// Write a batch of entries in one round trip, with an optional
    /// time-to-live applying to the whole batch.
    async fn multi_set(&self, entries: Vec<(String, Vec<u8>)>, ttl: Option<Duration>)
        -> Result<()>;
}

#[derive(Debug, Clone)]
struct StoredEntry {
    bytes: Vec<u8>,
    expires_at: Option<Instant>,
}

impl StoredEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// In-process cache store.
///
/// Backs tests and single-node deployments; production setups plug a
/// networked store behind the same trait.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, StoredEntry>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .map(|entries| entries.values().filter(|e| !e.is_expired(now)).count())
            .unwrap_or(0)
    }

    /// Check if the store holds no live entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry.
    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
    }

    fn unavailable(&self) -> Error {
        Error::CacheUnavailable {
            store: self.name().to_string(),
            reason: "store lock poisoned".to_string(),
        }
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn multi_get(&self, keys: &[String]) -> Result<HashMap<String, Vec<u8>>> {
        let now = Instant::now();
        let entries = self.entries.read().map_err(|_| self.unavailable())?;
        let mut found = HashMap::new();
        for key in keys {
            if let Some(entry) = entries.get(key) {
                if !entry.is_expired(now) {
                    found.insert(key.clone(), entry.bytes.clone());
                }
            }
        }
        Ok(found)
    }

    async fn multi_set(
        &self,
        batch: Vec<(String, Vec<u8>)>,
        ttl: Option<Duration>,
    ) -> Result<()> {
        let expires_at = ttl.map(|ttl| Instant::now() + ttl);
        let mut entries = self.entries.write().map_err(|_| self.unavailable())?;
        for (key, bytes) in batch {
            entries.insert(key, StoredEntry { bytes, expires_at });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[tokio::test]
    async fn test_multi_get_returns_only_present_keys() {
        let store = MemoryStore::new();
        store
            .multi_set(vec![("a".into(), b"1".to_vec())], None)
            .await
            .unwrap();

        let found = store.multi_get(&keys(&["a", "b"])).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found["a"], b"1");
    }

    #[tokio::test]
    async fn test_multi_set_batches_entries() {
        let store = MemoryStore::new();
        store
            .multi_set(
                vec![("a".into(), b"1".to_vec()), ("b".into(), b"2".to_vec())],
                None,
            )
            .await
            .unwrap();
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_expired_entries_are_misses() {
        let store = MemoryStore::new();
        store
            .multi_set(
                vec![("a".into(), b"1".to_vec())],
                Some(Duration::from_secs(0)),
            )
            .await
            .unwrap();

        let found = store.multi_get(&keys(&["a"])).await.unwrap();
        assert!(found.is_empty());
    }
}
