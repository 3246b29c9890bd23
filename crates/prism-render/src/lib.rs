//! Document rendering over the Prism fragment cache.
//!
//! This crate provides:
//! - `Adapter` trait - Output-format collaborator (namespace + document shape)
//! - `AttributesAdapter` / `LinkedDocumentAdapter` - Built-in output shapes
//! - `AdapterCacheBinding` - Adapter-scoped cache key derivation
//! - `IncludeTreeWalker` - Expansion of a root and include spec into walk nodes
//! - `CollectionAssembler` - Pure document assembly from resolved fragments
//! - `Renderer` - The walk → resolve → assemble pipeline
//!
//! # Example
//!
//! ```ignore
//! use prism_core::IncludeTree;
//! use prism_render::{AttributesAdapter, Renderer};
//!
//! let renderer = Renderer::new(registry, AttributesAdapter, store);
//! let include = IncludeTree::parse("comments.author")?;
//! let output = renderer.render(post, &include).await?;
//! println!("{}", output.document);
//! ```

mod adapter;
mod assemble;
mod binding;
mod render;
mod walker;

pub use adapter::*;
pub use assemble::*;
pub use binding::*;
pub use render::*;
pub use walker::*;

#[cfg(test)]
pub(crate) mod fixtures;
