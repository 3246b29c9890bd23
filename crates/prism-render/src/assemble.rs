//! Document assembly.
//!
//! Assembly is a pure fold over the walker's node list and the resolved
//! fragment set; it holds no cache-store dependency. Association
//! sub-documents merge in declaration order, and collections keep their
//! input order regardless of which fragments hit or missed.

use std::collections::{HashMap, HashSet};

use prism_core::{DescriptorRegistry, Fragment, IncludeTree, Result, Serializable};
use serde_json::Value;

use crate::adapter::{Adapter, AssociationDoc};
use crate::walker::WalkNode;

/// Assembles final documents from resolved fragments.
pub struct CollectionAssembler<'a> {
    registry: &'a DescriptorRegistry,
    adapter: &'a dyn Adapter,
}

struct Assembly<'a> {
    nodes: &'a [WalkNode],
    fragments: &'a HashMap<usize, Fragment>,
    children: Vec<Vec<usize>>,
    included: Vec<Value>,
    included_seen: HashSet<(String, String)>,
}

impl<'a> CollectionAssembler<'a> {
    /// Create an assembler for one render request.
    pub fn new(registry: &'a DescriptorRegistry, adapter: &'a dyn Adapter) -> Self {
        Self { registry, adapter }
    }

    /// Assemble a single-object document.
    ///
    /// A root whose fragment failed renders as null; the failure is
    /// reported by the resolution layer, never silently dropped here.
    pub fn assemble_one(
        &self,
        nodes: &[WalkNode],
        fragments: &HashMap<usize, Fragment>,
        include: &IncludeTree,
    ) -> Result<Value> {
        let mut assembly = Assembly::new(nodes, fragments);
        let primary = match assembly.roots().first() {
            Some(&root) => self.build(&mut assembly, root, include)?.unwrap_or(Value::Null),
            None => Value::Null,
        };
        Ok(self.adapter.finalize(primary, assembly.included))
    }

    /// Assemble an ordered collection document.
    ///
    /// Output order matches input order; a member whose fragment failed
    /// holds its position as null.
    pub fn assemble_collection(
        &self,
        nodes: &[WalkNode],
        fragments: &HashMap<usize, Fragment>,
        include: &IncludeTree,
    ) -> Result<Value> {
        let mut assembly = Assembly::new(nodes, fragments);
        let mut members = Vec::new();
        for root in assembly.roots() {
            let doc = self.build(&mut assembly, root, include)?.unwrap_or(Value::Null);
            members.push(doc);
        }
        Ok(self.adapter.finalize(Value::Array(members), assembly.included))
    }

    /// Build one node's document, returning `None` when its fragment is
    /// unresolved.
    fn build(
        &self,
        assembly: &mut Assembly<'_>,
        index: usize,
        include: &IncludeTree,
    ) -> Result<Option<Value>> {
        let node = &assembly.nodes[index];
        let descriptor = self.registry.expect(node.type_name)?;
        let id = node.object.identity();
        let resource_type = descriptor.resource_type().to_string();

        if node.cycle {
            return Ok(Some(self.adapter.reference(id.as_deref(), &resource_type)));
        }
        let fragment = match assembly.fragments.get(&index) {
            Some(fragment) => fragment.clone(),
            None => return Ok(None),
        };

        let by_association = assembly.children_by_association(index);
        let mut associations = Vec::new();
        for assoc in descriptor.associations() {
            let subtree = match include.child(&assoc.name) {
                Some(subtree) => subtree,
                None => continue,
            };
            let member_indices = by_association
                .get(assoc.name.as_str())
                .cloned()
                .unwrap_or_default();
            let mut docs = Vec::new();
            for member in member_indices {
                if let Some(doc) = self.member_doc(assembly, member, subtree)? {
                    docs.push(doc);
                }
            }
            let payload = match assoc.cardinality {
                prism_core::Cardinality::One => {
                    AssociationDoc::One(docs.into_iter().next().unwrap_or(Value::Null))
                }
                prism_core::Cardinality::Many => AssociationDoc::Many(docs),
            };
            associations.push((assoc.key.clone(), payload));
        }

        Ok(Some(self.adapter.resource_object(
            id.as_deref(),
            &resource_type,
            &fragment,
            &associations,
        )))
    }

    /// The payload a parent embeds (or links) for one association member.
    fn member_doc(
        &self,
        assembly: &mut Assembly<'_>,
        index: usize,
        include: &IncludeTree,
    ) -> Result<Option<Value>> {
        let node = &assembly.nodes[index];
        if node.cycle {
            return self.build(assembly, index, include);
        }
        let doc = match self.build(assembly, index, include)? {
            Some(doc) => doc,
            None => return Ok(None),
        };
        if self.adapter.embeds_associations() {
            return Ok(Some(doc));
        }

        let node = &assembly.nodes[index];
        let descriptor = self.registry.expect(node.type_name)?;
        let id = node.object.identity();
        assembly.push_included(descriptor.resource_type(), id.as_deref(), doc);
        Ok(Some(
            self.adapter.reference(id.as_deref(), descriptor.resource_type()),
        ))
    }
}

impl<'a> Assembly<'a> {
    fn new(nodes: &'a [WalkNode], fragments: &'a HashMap<usize, Fragment>) -> Self {
        let mut children = vec![Vec::new(); nodes.len()];
        for (index, node) in nodes.iter().enumerate() {
            if let Some(parent) = node.parent {
                children[parent].push(index);
            }
        }
        Self {
            nodes,
            fragments,
            children,
            included: Vec::new(),
            included_seen: HashSet::new(),
        }
    }

    fn roots(&self) -> Vec<usize> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.parent.is_none())
            .map(|(index, _)| index)
            .collect()
    }

    fn children_by_association(&self, index: usize) -> HashMap<&'a str, Vec<usize>> {
        let mut grouped: HashMap<&str, Vec<usize>> = HashMap::new();
        for &child in &self.children[index] {
            if let Some(name) = self.nodes[child].association.as_deref() {
                grouped.entry(name).or_default().push(child);
            }
        }
        grouped
    }

    fn push_included(&mut self, resource_type: &str, id: Option<&str>, doc: Value) {
        if let Some(id) = id {
            if !self
                .included_seen
                .insert((resource_type.to_string(), id.to_string()))
            {
                return;
            }
        }
        self.included.push(doc);
    }
}
