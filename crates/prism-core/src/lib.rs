//! Core abstractions for the Prism serialization pipeline.
//!
//! This crate provides the fundamental types and traits:
//! - `Serializable` trait - Handle to a domain object (identity, version, accessors)
//! - `ResourceDescriptor` / `DescriptorRegistry` - Per-type serialization metadata
//! - `FragmentPolicy` - Per-type fragment cache configuration
//! - `IncludeSpec` / `IncludeTree` - Sparse association selection
//! - `Error` - Shared error taxonomy

mod descriptor;
mod error;
mod include;
mod inflect;
mod model;
mod policy;

pub use descriptor::*;
pub use error::*;
pub use include::*;
pub use inflect::*;
pub use model::*;
pub use policy::*;
