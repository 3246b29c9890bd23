//! Output-format adapters.
//!
//! An adapter supplies two things: the namespace discriminator folded
//! into every cache key, and the document-shape transform applied to
//! resolved fragments. The same object rendered under two adapters never
//! shares a cache slot.

use prism_core::Fragment;
use serde_json::{json, Map, Value};

/// An association's assembled payload, as handed to the adapter.
#[derive(Debug, Clone)]
pub enum AssociationDoc {
    /// A to-one payload; `Value::Null` when the reference is unset or
    /// its fragment failed.
    One(Value),
    /// A to-many payload in collection order.
    Many(Vec<Value>),
}

/// Output-format collaborator.
pub trait Adapter: Send + Sync {
    /// Namespace discriminator folded into every cache key derived for
    /// this adapter.
    fn namespace(&self) -> &'static str;

    /// Whether association documents embed inline in their parent
    /// (`true`), or collect into a document-level side list (`false`).
    fn embeds_associations(&self) -> bool;

    /// Resource linkage for an association target that is not embedded
    /// (side-listed documents and cycle-cut references).
    fn reference(&self, id: Option<&str>, resource_type: &str) -> Value {
        json!({ "id": id, "type": resource_type })
    }

    /// Shape one object's document from its attribute fragment and
    /// association payloads, in association-declaration order.
    fn resource_object(
        &self,
        id: Option<&str>,
        resource_type: &str,
        attributes: &Fragment,
        associations: &[(String, AssociationDoc)],
    ) -> Value;

    /// Final document from the primary payload and any side-collected
    /// documents.
    fn finalize(&self, primary: Value, included: Vec<Value>) -> Value;
}

/// Flat adapter: each object renders as its attribute map with
/// association sub-documents embedded in place.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttributesAdapter;

impl Adapter for AttributesAdapter {
    fn namespace(&self) -> &'static str {
        "attributes"
    }

    fn embeds_associations(&self) -> bool {
        true
    }

    fn resource_object(
        &self,
        _id: Option<&str>,
        _resource_type: &str,
        attributes: &Fragment,
        associations: &[(String, AssociationDoc)],
    ) -> Value {
        let mut object = attributes.clone();
        for (key, doc) in associations {
            let value = match doc {
                AssociationDoc::One(value) => value.clone(),
                AssociationDoc::Many(values) => Value::Array(values.clone()),
            };
            object.insert(key.clone(), value);
        }
        Value::Object(object)
    }

    fn finalize(&self, primary: Value, _included: Vec<Value>) -> Value {
        primary
    }
}

/// Linked-resource adapter: each object renders as
/// `{id, type, attributes, relationships}` with `{id, type}` linkage in
/// relationships and full association documents collected into a
/// deduplicated `included` list.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinkedDocumentAdapter;

impl Adapter for LinkedDocumentAdapter {
    fn namespace(&self) -> &'static str {
        "linked"
    }

    fn embeds_associations(&self) -> bool {
        false
    }

    fn resource_object(
        &self,
        id: Option<&str>,
        resource_type: &str,
        attributes: &Fragment,
        associations: &[(String, AssociationDoc)],
    ) -> Value {
        let mut object = Map::new();
        object.insert("id".into(), id.map_or(Value::Null, |id| json!(id)));
        object.insert("type".into(), json!(resource_type));
        if !attributes.is_empty() {
            object.insert("attributes".into(), Value::Object(attributes.clone()));
        }
        let mut relationships = Map::new();
        for (key, doc) in associations {
            let data = match doc {
                AssociationDoc::One(value) => value.clone(),
                AssociationDoc::Many(values) => Value::Array(values.clone()),
            };
            relationships.insert(key.clone(), json!({ "data": data }));
        }
        if !relationships.is_empty() {
            object.insert("relationships".into(), Value::Object(relationships));
        }
        Value::Object(object)
    }

    fn finalize(&self, primary: Value, included: Vec<Value>) -> Value {
        let mut document = Map::new();
        document.insert("data".into(), primary);
        if !included.is_empty() {
            document.insert("included".into(), Value::Array(included));
        }
        Value::Object(document)
    }
}
