//! Fragment caching for the Prism serialization pipeline.
//!
//! This crate provides:
//! - `CacheKeyBuilder` / `FragmentKey` - Stable, version-aware key derivation
//! - `CacheStore` - Pluggable batched key-value store boundary
//! - `MemoryStore` - In-process store for tests and single-node setups
//! - `MultiFetchCache` - One batched round trip per resolve, compute on miss
//! - `CacheConfig` - Resolution behavior (ttl, bypass on unavailable)
//!
//! # Example
//!
//! ```ignore
//! use prism_cache::{CacheConfig, CacheKeyBuilder, MemoryStore, MultiFetchCache};
//!
//! let builder = CacheKeyBuilder::new("attributes");
//! let key = builder.key(post.as_ref(), registry.expect("Post")?)?;
//!
//! let cache = MultiFetchCache::new(store, CacheConfig::new());
//! let resolved = cache.resolve(&requests, |key| produce(key)).await?;
//! ```

mod config;
mod digest;
mod key;
mod multi;
mod store;

pub use config::*;
pub use digest::*;
pub use key::*;
pub use multi::*;
pub use store::*;
