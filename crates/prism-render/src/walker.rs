//! Include-tree expansion.
//!
//! The walker turns a root object (or collection) and an include
//! specification into the flat, ordered set of nodes the cache layer
//! resolves in one pass. Traversal is depth-first in association
//! declaration order; cycles are cut per path so walking a cyclic graph
//! terminates while shared targets still appear once per distinct path.

use std::collections::HashSet;
use std::sync::Arc;

use prism_core::{
    DescriptorRegistry, Error, IncludeTree, ObjectRef, Result, Serializable,
};

/// One object discovered by the walk.
#[derive(Clone)]
pub struct WalkNode {
    /// Handle to the object.
    pub object: ObjectRef,
    /// The object's registered type name.
    pub type_name: &'static str,
    /// Index of the parent node, `None` for roots.
    pub parent: Option<usize>,
    /// Accessor name of the association on the parent that produced this
    /// node.
    pub association: Option<String>,
    /// True when traversal was cut here because the object is already on
    /// the current path; the node renders as linkage only.
    pub cycle: bool,
}

/// Walk identity: (type, id, namespace), falling back to the handle's
/// address for objects with no identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Marker {
    type_name: &'static str,
    identity: MarkerIdentity,
    namespace: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum MarkerIdentity {
    Id(String),
    Ptr(usize),
}

#[derive(Default)]
struct WalkPath {
    on_path: HashSet<Marker>,
}

impl WalkPath {
    fn enter(&mut self, marker: Marker) -> bool {
        self.on_path.insert(marker)
    }

    fn leave(&mut self, marker: &Marker) {
        self.on_path.remove(marker);
    }
}

/// Expands roots into the ordered node set reachable through included
/// associations.
pub struct IncludeTreeWalker<'a> {
    registry: &'a DescriptorRegistry,
    namespace: &'a str,
}

impl<'a> IncludeTreeWalker<'a> {
    /// Create a walker over a descriptor registry, scoped to an adapter
    /// namespace.
    pub fn new(registry: &'a DescriptorRegistry, namespace: &'a str) -> Self {
        Self {
            registry,
            namespace,
        }
    }

    /// Expand the roots depth-first.
    ///
    /// Each root is walked with its own path state, so two collection
    /// members sharing an association target both emit the target; the
    /// cache layer collapses the duplicate keys before fetching.
    /// Include names that match no declared association fail with
    /// `InvalidIncludeSpec` before any backend work happens.
    pub fn expand(&self, roots: &[ObjectRef], include: &IncludeTree) -> Result<Vec<WalkNode>> {
        let mut nodes = Vec::new();
        for root in roots {
            let mut path = WalkPath::default();
            self.visit(root, include, None, None, &mut path, &mut nodes)?;
        }
        Ok(nodes)
    }

    fn visit(
        &self,
        object: &ObjectRef,
        include: &IncludeTree,
        parent: Option<usize>,
        association: Option<String>,
        path: &mut WalkPath,
        nodes: &mut Vec<WalkNode>,
    ) -> Result<()> {
        let type_name = object.type_name();
        let descriptor = self.registry.expect(type_name)?;

        for selected in include.nodes() {
            if descriptor.association(selected.name()).is_none() {
                return Err(Error::invalid_include(
                    selected.name(),
                    format!("'{type_name}' declares no association '{}'", selected.name()),
                ));
            }
        }

        let marker = self.marker(object);
        if !path.enter(marker.clone()) {
            nodes.push(WalkNode {
                object: Arc::clone(object),
                type_name,
                parent,
                association,
                cycle: true,
            });
            return Ok(());
        }

        let index = nodes.len();
        nodes.push(WalkNode {
            object: Arc::clone(object),
            type_name,
            parent,
            association,
            cycle: false,
        });

        for assoc in descriptor.associations() {
            let subtree = match include.child(&assoc.name) {
                Some(subtree) => subtree,
                None => continue,
            };
            let edge = object.association(&assoc.name).map_err(|source| {
                Error::producer(format!("{type_name}/{}", assoc.name), source)
            })?;
            for member in edge.members() {
                self.visit(
                    member,
                    subtree,
                    Some(index),
                    Some(assoc.name.clone()),
                    path,
                    nodes,
                )?;
            }
        }

        path.leave(&marker);
        Ok(())
    }

    fn marker(&self, object: &ObjectRef) -> Marker {
        let identity = match object.identity() {
            Some(id) => MarkerIdentity::Id(id),
            None => MarkerIdentity::Ptr(Arc::as_ptr(object) as *const () as usize),
        };
        Marker {
            type_name: object.type_name(),
            identity,
            namespace: self.namespace.to_string(),
        }
    }
}
