//! Static per-type serialization metadata.
//!
//! Descriptors replace the original runtime method synthesis with a
//! table built once at startup: each registered type maps to an ordered
//! attribute list, an ordered association list, a fragment policy, and
//! an optional digest source.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::inflect;
use crate::model::{Fragment, Serializable};
use crate::policy::FragmentPolicy;

/// A declared attribute: accessor name plus output key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeDef {
    /// Accessor name on the object.
    pub name: String,
    /// Key under which the value appears in the fragment.
    pub key: String,
}

/// Association cardinality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    /// References at most one object.
    One,
    /// References an ordered collection of objects.
    Many,
}

/// A declared association edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssociationDef {
    /// Accessor name on the object.
    pub name: String,
    /// Key under which the edge appears in the document.
    pub key: String,
    /// Registered type name of the edge's target.
    pub target: String,
    /// Edge cardinality.
    pub cardinality: Cardinality,
}

/// Serialization metadata for one registered type.
#[derive(Debug, Clone)]
pub struct ResourceDescriptor {
    type_name: String,
    resource_type: String,
    attributes: Vec<AttributeDef>,
    associations: Vec<AssociationDef>,
    policy: FragmentPolicy,
    digest_source: Option<String>,
}

impl ResourceDescriptor {
    /// Start building a descriptor for the named type.
    pub fn builder(type_name: impl Into<String>) -> ResourceDescriptorBuilder {
        ResourceDescriptorBuilder::new(type_name)
    }

    /// The type name this descriptor is registered under.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// The resource type emitted in documents; inferred from the type
    /// name (lower-cased, underscored, singular) unless overridden.
    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    /// Declared attributes in declaration order.
    pub fn attributes(&self) -> &[AttributeDef] {
        &self.attributes
    }

    /// Declared associations in declaration order.
    pub fn associations(&self) -> &[AssociationDef] {
        &self.associations
    }

    /// Look up a declared association by accessor name.
    pub fn association(&self, name: &str) -> Option<&AssociationDef> {
        self.associations.iter().find(|a| a.name == name)
    }

    /// The fragment cache policy for this type.
    pub fn policy(&self) -> &FragmentPolicy {
        &self.policy
    }

    /// The registration-time digest source, if one was provided.
    pub fn digest_source(&self) -> Option<&str> {
        self.digest_source.as_deref()
    }

    /// Serialize the object's declared attributes into a fragment,
    /// honoring the policy's `only`/`except` field selection.
    ///
    /// Associations are never part of the fragment; they are separately
    /// keyed and resolved.
    pub fn attributes_fragment(&self, object: &dyn Serializable) -> Result<Fragment> {
        let mut fragment = Fragment::new();
        for attr in &self.attributes {
            if !self.policy.allows(&attr.key) {
                continue;
            }
            let value = object.attribute(&attr.name).map_err(|source| {
                Error::producer(format!("{}/{}", self.type_name, attr.name), source)
            })?;
            fragment.insert(attr.key.clone(), value);
        }
        Ok(fragment)
    }
}

/// Builder for [`ResourceDescriptor`].
#[derive(Debug, Clone)]
pub struct ResourceDescriptorBuilder {
    type_name: String,
    resource_type: Option<String>,
    attributes: Vec<AttributeDef>,
    associations: Vec<AssociationDef>,
    policy: FragmentPolicy,
    digest_source: Option<String>,
}

impl ResourceDescriptorBuilder {
    /// Create a builder for the named type.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            resource_type: None,
            attributes: Vec::new(),
            associations: Vec::new(),
            policy: FragmentPolicy::disabled(),
            digest_source: None,
        }
    }

    /// Start from a parent descriptor's declarations.
    ///
    /// The attribute and association tables and the policy are duplicated;
    /// later calls extend or replace only this builder's copies.
    pub fn inherit_from(mut self, parent: &ResourceDescriptor) -> Self {
        self.attributes = parent.attributes.clone();
        self.associations = parent.associations.clone();
        self.policy = parent.policy.inherit();
        self.digest_source = parent.digest_source.clone();
        self
    }

    /// Override the emitted resource type.
    pub fn resource_type(mut self, resource_type: impl Into<String>) -> Self {
        self.resource_type = Some(resource_type.into());
        self
    }

    /// Declare an attribute.
    pub fn attribute(self, name: impl Into<String>) -> Self {
        let name = name.into();
        let key = name.clone();
        self.attribute_as(name, key)
    }

    /// Declare an attribute emitted under a different key.
    pub fn attribute_as(mut self, name: impl Into<String>, key: impl Into<String>) -> Self {
        self.attributes.push(AttributeDef {
            name: name.into(),
            key: key.into(),
        });
        self
    }

    /// Declare a to-one association.
    pub fn has_one(self, name: impl Into<String>, target: impl Into<String>) -> Self {
        let name = name.into();
        let key = name.clone();
        self.has_one_as(name, target, key)
    }

    /// Declare a to-one association emitted under a different key.
    pub fn has_one_as(
        mut self,
        name: impl Into<String>,
        target: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        self.associations.push(AssociationDef {
            name: name.into(),
            key: key.into(),
            target: target.into(),
            cardinality: Cardinality::One,
        });
        self
    }

    /// Declare a to-many association.
    pub fn has_many(self, name: impl Into<String>, target: impl Into<String>) -> Self {
        let name = name.into();
        let key = name.clone();
        self.has_many_as(name, target, key)
    }

    /// Declare a to-many association emitted under a different key.
    pub fn has_many_as(
        mut self,
        name: impl Into<String>,
        target: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        self.associations.push(AssociationDef {
            name: name.into(),
            key: key.into(),
            target: target.into(),
            cardinality: Cardinality::Many,
        });
        self
    }

    /// Set the fragment cache policy.
    pub fn policy(mut self, policy: FragmentPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Provide the source text digested into version-aware cache keys.
    pub fn digest_source(mut self, source: impl Into<String>) -> Self {
        self.digest_source = Some(source.into());
        self
    }

    /// Build the descriptor.
    pub fn build(self) -> ResourceDescriptor {
        let resource_type = self
            .resource_type
            .unwrap_or_else(|| inflect::key_prefix(&self.type_name));
        ResourceDescriptor {
            type_name: self.type_name,
            resource_type,
            attributes: self.attributes,
            associations: self.associations,
            policy: self.policy,
            digest_source: self.digest_source,
        }
    }
}

/// Registry of descriptors, built once at startup and shared read-only.
#[derive(Debug, Default)]
pub struct DescriptorRegistry {
    descriptors: HashMap<String, ResourceDescriptor>,
}

impl DescriptorRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor under its type name.
    ///
    /// Re-registering a type replaces the previous descriptor.
    pub fn register(&mut self, descriptor: ResourceDescriptor) -> &mut Self {
        self.descriptors
            .insert(descriptor.type_name.clone(), descriptor);
        self
    }

    /// Look up a descriptor by type name.
    pub fn get(&self, type_name: &str) -> Option<&ResourceDescriptor> {
        self.descriptors.get(type_name)
    }

    /// Look up a descriptor, failing with a configuration error when the
    /// type was never registered.
    pub fn expect(&self, type_name: &str) -> Result<&ResourceDescriptor> {
        self.get(type_name)
            .ok_or_else(|| Error::configuration(type_name, "no descriptor registered"))
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Check if no types are registered.
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post_descriptor() -> ResourceDescriptor {
        ResourceDescriptor::builder("Post")
            .attribute("title")
            .attribute_as("body", "content")
            .has_many("comments", "Comment")
            .has_one_as("author", "Author", "writer")
            .policy(FragmentPolicy::enabled())
            .build()
    }

    #[test]
    fn test_resource_type_is_inferred() {
        let descriptor = ResourceDescriptor::builder("BlogPosts").build();
        assert_eq!(descriptor.resource_type(), "blog_post");
    }

    #[test]
    fn test_resource_type_override() {
        let descriptor = ResourceDescriptor::builder("Post")
            .resource_type("article")
            .build();
        assert_eq!(descriptor.resource_type(), "article");
    }

    #[test]
    fn test_declaration_order_preserved() {
        let descriptor = post_descriptor();
        let keys: Vec<_> = descriptor.attributes().iter().map(|a| a.key.as_str()).collect();
        assert_eq!(keys, ["title", "content"]);
        let assoc: Vec<_> = descriptor
            .associations()
            .iter()
            .map(|a| a.key.as_str())
            .collect();
        assert_eq!(assoc, ["comments", "writer"]);
    }

    #[test]
    fn test_inherit_from_copies_tables() {
        let parent = post_descriptor();
        let child = ResourceDescriptor::builder("FeaturedPost")
            .inherit_from(&parent)
            .attribute("pinned_at")
            .build();
        assert_eq!(child.attributes().len(), 3);
        assert_eq!(parent.attributes().len(), 2);
        assert_eq!(child.associations().len(), parent.associations().len());
    }

    #[test]
    fn test_registry_lookup() {
        let mut registry = DescriptorRegistry::new();
        registry.register(post_descriptor());
        assert!(registry.get("Post").is_some());
        assert!(registry.get("Missing").is_none());
        assert!(matches!(
            registry.expect("Missing"),
            Err(Error::Configuration { .. })
        ));
    }
}
