//! The render pipeline: walk, resolve, assemble.

use std::collections::HashMap;
use std::sync::Arc;

use prism_cache::{CacheConfig, CacheStore, FragmentSlot, MultiFetchCache, ResolveRequest};
use prism_core::{DescriptorRegistry, Error, Fragment, IncludeTree, ObjectRef, Result};
use serde_json::Value;

use crate::adapter::Adapter;
use crate::assemble::CollectionAssembler;
use crate::binding::AdapterCacheBinding;
use crate::walker::IncludeTreeWalker;

/// Counters for one render request.
#[derive(Debug, Default)]
pub struct RenderStats {
    /// Fragments served from the cache store.
    pub cache_hits: usize,
    /// Fragments computed on cache miss and written back.
    pub computed: usize,
    /// Fragments of cache-disabled types, computed directly.
    pub direct: usize,
    /// Per-key producer failures; the matching document slots render as
    /// null or absent members.
    pub failures: Vec<Error>,
}

/// A rendered document plus its resolution counters.
#[derive(Debug)]
pub struct RenderOutput {
    /// The assembled document.
    pub document: Value,
    /// Resolution counters for this request.
    pub stats: RenderStats,
}

/// Renders objects into documents through the fragment cache.
///
/// The pipeline runs on the requesting task: the walk and assembly are
/// synchronous, and the only suspension points are the batched store
/// calls (one per distinct store) plus any per-miss computation.
pub struct Renderer {
    registry: Arc<DescriptorRegistry>,
    adapter: Arc<dyn Adapter>,
    store: Arc<dyn CacheStore>,
    named_stores: HashMap<String, Arc<dyn CacheStore>>,
    config: CacheConfig,
}

impl Renderer {
    /// Create a renderer over a registry, adapter, and default store.
    pub fn new(
        registry: Arc<DescriptorRegistry>,
        adapter: impl Adapter + 'static,
        store: Arc<dyn CacheStore>,
    ) -> Self {
        Self {
            registry,
            adapter: Arc::new(adapter),
            store,
            named_stores: HashMap::new(),
            config: CacheConfig::new(),
        }
    }

    /// Replace the cache configuration.
    pub fn with_config(mut self, config: CacheConfig) -> Self {
        self.config = config;
        self
    }

    /// Register a store that policies can route to by name.
    pub fn with_named_store(
        mut self,
        name: impl Into<String>,
        store: Arc<dyn CacheStore>,
    ) -> Self {
        self.named_stores.insert(name.into(), store);
        self
    }

    /// Render a single object.
    pub async fn render(&self, root: ObjectRef, include: &IncludeTree) -> Result<RenderOutput> {
        self.execute(std::slice::from_ref(&root), include, false).await
    }

    /// Render an ordered collection.
    ///
    /// The output sequence matches the input order; hit/miss status
    /// never reorders members.
    pub async fn render_collection(
        &self,
        roots: &[ObjectRef],
        include: &IncludeTree,
    ) -> Result<RenderOutput> {
        self.execute(roots, include, true).await
    }

    async fn execute(
        &self,
        roots: &[ObjectRef],
        include: &IncludeTree,
        collection: bool,
    ) -> Result<RenderOutput> {
        let binding = AdapterCacheBinding::new(self.adapter.as_ref());
        let walker = IncludeTreeWalker::new(&self.registry, self.adapter.namespace());
        let nodes = walker.expand(roots, include)?;

        // Derive a key per cacheable node and group the requests by
        // target store; duplicates collapse inside the resolve.
        let mut node_key: Vec<Option<String>> = vec![None; nodes.len()];
        let mut groups: HashMap<Option<String>, Vec<ResolveRequest>> = HashMap::new();
        let mut key_to_node: HashMap<String, usize> = HashMap::new();
        let mut direct = Vec::new();

        for (index, node) in nodes.iter().enumerate() {
            if node.cycle {
                continue;
            }
            let descriptor = self.registry.expect(node.type_name)?;
            let policy = descriptor.policy();
            if !policy.enabled {
                direct.push(index);
                continue;
            }
            let key = binding.key(node.object.as_ref(), descriptor)?;
            let key_str = key.as_str().to_string();
            let mut request = ResolveRequest::new(key);
            if let Some(ttl) = policy.ttl {
                request = request.with_ttl(ttl);
            }
            groups.entry(policy.store.clone()).or_default().push(request);
            key_to_node.entry(key_str.clone()).or_insert(index);
            node_key[index] = Some(key_str);
        }

        let mut stats = RenderStats::default();
        let mut by_key: HashMap<String, Fragment> = HashMap::new();
        for (store_name, requests) in groups {
            let store = self.store_for(store_name.as_deref())?;
            let cache = MultiFetchCache::new(store, self.config.clone());
            let resolved = cache
                .resolve(&requests, |key| {
                    let index = *key_to_node.get(key.as_str()).ok_or_else(|| {
                        Error::producer(key.as_str(), anyhow::anyhow!("no object mapped to key"))
                    })?;
                    let node = &nodes[index];
                    let descriptor = self.registry.expect(node.type_name)?;
                    descriptor.attributes_fragment(node.object.as_ref())
                })
                .await?;
            for (key_str, slot) in resolved {
                match slot {
                    FragmentSlot::Hit(fragment) => {
                        stats.cache_hits += 1;
                        by_key.insert(key_str, fragment);
                    }
                    FragmentSlot::Computed(fragment) => {
                        stats.computed += 1;
                        by_key.insert(key_str, fragment);
                    }
                    FragmentSlot::Failed(error) => stats.failures.push(error),
                }
            }
        }

        let mut fragments: HashMap<usize, Fragment> = HashMap::new();
        for (index, key) in node_key.iter().enumerate() {
            if let Some(key) = key {
                if let Some(fragment) = by_key.get(key) {
                    fragments.insert(index, fragment.clone());
                }
            }
        }
        for index in direct {
            let node = &nodes[index];
            let descriptor = self.registry.expect(node.type_name)?;
            match descriptor.attributes_fragment(node.object.as_ref()) {
                Ok(fragment) => {
                    stats.direct += 1;
                    fragments.insert(index, fragment);
                }
                Err(error) => stats.failures.push(error),
            }
        }

        let assembler = CollectionAssembler::new(&self.registry, self.adapter.as_ref());
        let document = if collection {
            assembler.assemble_collection(&nodes, &fragments, include)?
        } else {
            assembler.assemble_one(&nodes, &fragments, include)?
        };

        tracing::debug!(
            namespace = self.adapter.namespace(),
            nodes = nodes.len(),
            hits = stats.cache_hits,
            computed = stats.computed,
            direct = stats.direct,
            failed = stats.failures.len(),
            "render complete"
        );
        Ok(RenderOutput { document, stats })
    }

    fn store_for(&self, name: Option<&str>) -> Result<Arc<dyn CacheStore>> {
        match name {
            None => Ok(Arc::clone(&self.store)),
            Some(name) => self.named_stores.get(name).cloned().ok_or_else(|| {
                Error::configuration(name, "policy routes to a store that was never registered")
            }),
        }
    }
}
