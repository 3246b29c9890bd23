//! Batched fragment resolution.
//!
//! A resolve issues exactly one batched read for the whole key set,
//! computes only the misses, and writes the computed fragments back in a
//! batch. Round trips stay bounded regardless of graph size.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use prism_core::{Error, Fragment, Result};

use crate::config::CacheConfig;
use crate::key::FragmentKey;
use crate::store::CacheStore;

/// One key to resolve, with its policy's ttl override.
#[derive(Debug, Clone)]
pub struct ResolveRequest {
    /// The derived fragment key.
    pub key: FragmentKey,
    /// Time-to-live for this fragment; falls back to the config default.
    pub ttl: Option<Duration>,
}

impl ResolveRequest {
    /// Create a request with no ttl override.
    pub fn new(key: FragmentKey) -> Self {
        Self { key, ttl: None }
    }

    /// Set the ttl override.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    fn effective_ttl(&self, config: &CacheConfig) -> Option<Duration> {
        self.ttl.or(config.default_ttl)
    }
}

/// How a key's slot was resolved.
#[derive(Debug)]
pub enum FragmentSlot {
    /// Served from the store.
    Hit(Fragment),
    /// Computed by the producer on miss.
    Computed(Fragment),
    /// The producer failed for this key; sibling keys are unaffected.
    Failed(Error),
}

impl FragmentSlot {
    /// The resolved fragment, if resolution succeeded.
    pub fn fragment(&self) -> Option<&Fragment> {
        match self {
            Self::Hit(fragment) | Self::Computed(fragment) => Some(fragment),
            Self::Failed(_) => None,
        }
    }

    /// Check if this slot was served from the store.
    pub fn is_hit(&self) -> bool {
        matches!(self, Self::Hit(_))
    }
}

/// Resolves a set of fragment keys against a store in one batched pass.
pub struct MultiFetchCache<S: CacheStore + ?Sized> {
    store: Arc<S>,
    config: CacheConfig,
}

impl<S: CacheStore + ?Sized> MultiFetchCache<S> {
    /// Create a cache over a store.
    pub fn new(store: Arc<S>, config: CacheConfig) -> Self {
        Self { store, config }
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Resolve every requested key.
    ///
    /// Duplicate keys are collapsed before anything else, so the
    /// producer runs at most once per unique key. Every unique key
    /// appears in the returned map exactly once; a producer failure
    /// occupies its slot as [`FragmentSlot::Failed`] rather than being
    /// silently omitted.
    ///
    /// When the store is unreachable this fails with a recoverable
    /// error, or, with bypass enabled, computes every key directly and
    /// skips the write-back.
    pub async fn resolve<F>(
        &self,
        requests: &[ResolveRequest],
        mut producer: F,
    ) -> Result<HashMap<String, FragmentSlot>>
    where
        F: FnMut(&FragmentKey) -> Result<Fragment>,
    {
        let unique = dedupe(requests);
        let key_strings: Vec<String> = unique
            .iter()
            .map(|r| r.key.as_str().to_string())
            .collect();

        let found = match self.store.multi_get(&key_strings).await {
            Ok(found) => found,
            Err(err) if err.is_recoverable() && self.config.bypass_on_unavailable => {
                tracing::warn!(
                    store = self.store.name(),
                    error = %err,
                    "cache store unreachable; bypassing to direct computation"
                );
                return Ok(compute_all(&unique, &mut producer));
            }
            Err(err) => return Err(err),
        };

        let mut slots = HashMap::with_capacity(unique.len());
        let mut writes: HashMap<Option<Duration>, Vec<(String, Vec<u8>)>> = HashMap::new();
        let mut hits = 0usize;
        let mut failed = 0usize;

        for request in &unique {
            let key_str = request.key.as_str();
            if let Some(bytes) = found.get(key_str) {
                match serde_json::from_slice::<Fragment>(bytes) {
                    Ok(fragment) => {
                        hits += 1;
                        slots.insert(key_str.to_string(), FragmentSlot::Hit(fragment));
                        continue;
                    }
                    Err(err) => {
                        tracing::warn!(
                            key = key_str,
                            error = %err,
                            "cached fragment bytes corrupt; recomputing"
                        );
                    }
                }
            }

            match producer(&request.key) {
                Ok(fragment) => {
                    let bytes = serde_json::to_vec(&fragment)?;
                    writes
                        .entry(request.effective_ttl(&self.config))
                        .or_default()
                        .push((key_str.to_string(), bytes));
                    slots.insert(key_str.to_string(), FragmentSlot::Computed(fragment));
                }
                Err(err) => {
                    failed += 1;
                    slots.insert(
                        key_str.to_string(),
                        FragmentSlot::Failed(as_producer_error(key_str, err)),
                    );
                }
            }
        }

        let computed = unique.len() - hits - failed;
        for (ttl, entries) in writes {
            match self.store.multi_set(entries, ttl).await {
                Ok(()) => {}
                Err(err) if err.is_recoverable() && self.config.bypass_on_unavailable => {
                    tracing::warn!(
                        store = self.store.name(),
                        error = %err,
                        "cache write-back failed; serving computed fragments uncached"
                    );
                }
                Err(err) => return Err(err),
            }
        }

        tracing::debug!(
            store = self.store.name(),
            requested = requests.len(),
            unique = unique.len(),
            hits,
            computed,
            failed,
            "fragment resolve complete"
        );
        Ok(slots)
    }
}

fn dedupe(requests: &[ResolveRequest]) -> Vec<ResolveRequest> {
    let mut seen = HashSet::new();
    requests
        .iter()
        .filter(|r| seen.insert(r.key.as_str().to_string()))
        .cloned()
        .collect()
}

fn compute_all<F>(unique: &[ResolveRequest], producer: &mut F) -> HashMap<String, FragmentSlot>
where
    F: FnMut(&FragmentKey) -> Result<Fragment>,
{
    let mut slots = HashMap::with_capacity(unique.len());
    for request in unique {
        let key_str = request.key.as_str().to_string();
        let slot = match producer(&request.key) {
            Ok(fragment) => FragmentSlot::Computed(fragment),
            Err(err) => FragmentSlot::Failed(as_producer_error(&key_str, err)),
        };
        slots.insert(key_str, slot);
    }
    slots
}

fn as_producer_error(key: &str, err: Error) -> Error {
    match err {
        err @ Error::Producer { .. } => err,
        other => Error::producer(key, anyhow::Error::new(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use serde_json::json;

    fn fragment(field: &str) -> Fragment {
        let mut map = Fragment::new();
        map.insert(field.into(), json!(true));
        map
    }

    fn requests(keys: &[&str]) -> Vec<ResolveRequest> {
        keys.iter()
            .map(|k| ResolveRequest::new(FragmentKey::new(*k)))
            .collect()
    }

    struct DownStore;

    #[async_trait]
    impl CacheStore for DownStore {
        fn name(&self) -> &str {
            "down"
        }

        async fn multi_get(&self, _keys: &[String]) -> Result<HashMap<String, Vec<u8>>> {
            Err(Error::CacheUnavailable {
                store: "down".into(),
                reason: "connection refused".into(),
            })
        }

        async fn multi_set(
            &self,
            _entries: Vec<(String, Vec<u8>)>,
            _ttl: Option<Duration>,
        ) -> Result<()> {
            Err(Error::CacheUnavailable {
                store: "down".into(),
                reason: "connection refused".into(),
            })
        }
    }

    #[tokio::test]
    async fn test_misses_are_computed_and_written_back() {
        let store = Arc::new(MemoryStore::new());
        let cache = MultiFetchCache::new(Arc::clone(&store), CacheConfig::new());

        let mut calls = 0;
        let resolved = cache
            .resolve(&requests(&["a", "b"]), |key| {
                calls += 1;
                Ok(fragment(key.as_str()))
            })
            .await
            .unwrap();

        assert_eq!(calls, 2);
        assert_eq!(resolved.len(), 2);
        assert!(resolved.values().all(|s| !s.is_hit()));
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_second_resolve_hits_without_producer() {
        let store = Arc::new(MemoryStore::new());
        let cache = MultiFetchCache::new(Arc::clone(&store), CacheConfig::new());

        cache
            .resolve(&requests(&["a"]), |key| Ok(fragment(key.as_str())))
            .await
            .unwrap();

        let resolved = cache
            .resolve(&requests(&["a"]), |_| panic!("producer must not run"))
            .await
            .unwrap();
        assert!(resolved["a"].is_hit());
    }

    #[tokio::test]
    async fn test_duplicate_keys_produce_once() {
        let store = Arc::new(MemoryStore::new());
        let cache = MultiFetchCache::new(store, CacheConfig::new());

        let mut calls = 0;
        let resolved = cache
            .resolve(&requests(&["a", "a", "a"]), |key| {
                calls += 1;
                Ok(fragment(key.as_str()))
            })
            .await
            .unwrap();

        assert_eq!(calls, 1);
        assert_eq!(resolved.len(), 1);
    }

    #[tokio::test]
    async fn test_producer_failure_is_isolated() {
        let store = Arc::new(MemoryStore::new());
        let cache = MultiFetchCache::new(Arc::clone(&store), CacheConfig::new());

        let resolved = cache
            .resolve(&requests(&["good", "bad"]), |key| {
                if key.as_str() == "bad" {
                    Err(Error::producer(key.as_str(), anyhow::anyhow!("boom")))
                } else {
                    Ok(fragment("ok"))
                }
            })
            .await
            .unwrap();

        assert!(resolved["good"].fragment().is_some());
        assert!(matches!(resolved["bad"], FragmentSlot::Failed(_)));
        // Only the successful fragment is written back.
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_recomputed() {
        let store = Arc::new(MemoryStore::new());
        store
            .multi_set(vec![("a".into(), b"not json".to_vec())], None)
            .await
            .unwrap();
        let cache = MultiFetchCache::new(Arc::clone(&store), CacheConfig::new());

        let mut calls = 0;
        let resolved = cache
            .resolve(&requests(&["a"]), |key| {
                calls += 1;
                Ok(fragment(key.as_str()))
            })
            .await
            .unwrap();

        assert_eq!(calls, 1);
        assert!(resolved["a"].fragment().is_some());
    }

    #[tokio::test]
    async fn test_unreachable_store_fails_without_bypass() {
        let cache = MultiFetchCache::new(Arc::new(DownStore), CacheConfig::new());
        let result = cache
            .resolve(&requests(&["a"]), |key| Ok(fragment(key.as_str())))
            .await;
        assert!(matches!(result, Err(Error::CacheUnavailable { .. })));
    }

    #[tokio::test]
    async fn test_bypass_computes_every_key() {
        let cache = MultiFetchCache::new(
            Arc::new(DownStore),
            CacheConfig::new().with_bypass_on_unavailable(),
        );

        let mut calls = 0;
        let resolved = cache
            .resolve(&requests(&["a", "b"]), |key| {
                calls += 1;
                Ok(fragment(key.as_str()))
            })
            .await
            .unwrap();

        assert_eq!(calls, 2);
        assert_eq!(resolved.len(), 2);
    }

    #[tokio::test]
    async fn test_ttl_override_groups_writes() {
        let store = Arc::new(MemoryStore::new());
        let cache = MultiFetchCache::new(Arc::clone(&store), CacheConfig::new());

        let reqs = vec![
            ResolveRequest::new(FragmentKey::new("a")).with_ttl(Duration::from_secs(60)),
            ResolveRequest::new(FragmentKey::new("b")),
        ];
        cache
            .resolve(&reqs, |key| Ok(fragment(key.as_str())))
            .await
            .unwrap();
        assert_eq!(store.len(), 2);
    }
}
