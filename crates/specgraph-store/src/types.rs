//! Wire types exchanged with a graph store.
//!
//! Every object in the store has two identities: a version-specific ID that
//! changes on every edit, and a canonical ID that stays stable for the life of
//! the entity. Stores accept either variant on input and may return either
//! variant in edge endpoints.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Generic property bag attached to objects and relationships.
pub type Properties = serde_json::Map<String, serde_json::Value>;

/// Identifier of a stored object or relationship.
///
/// The same newtype carries both identity variants; which one a value holds
/// is only known by asking the store or an identity index built from a
/// traversal result.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(pub String);

impl ObjectId {
    /// Create a new object ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for the empty ID some stores use for "not set"
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ObjectId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ObjectId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for ObjectId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A node as returned by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphObject {
    /// Version-specific ID. Changes every time the object is updated.
    pub id: ObjectId,

    /// Stable ID shared by every version of the object.
    pub canonical_id: ObjectId,

    /// Entity type name (e.g. "Task", "Spec").
    #[serde(rename = "type")]
    pub object_type: String,

    /// Object properties.
    #[serde(default)]
    pub properties: Properties,

    /// Free-form labels.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
}

impl GraphObject {
    /// Look up a string property, treating non-strings as absent.
    pub fn str_property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(serde_json::Value::as_str)
    }

    /// True if `id` names this object under either identity variant.
    pub fn is_identified_by(&self, id: &ObjectId) -> bool {
        self.id == *id || self.canonical_id == *id
    }
}

/// Payload for creating an object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewObject {
    /// Entity type name.
    #[serde(rename = "type")]
    pub object_type: String,

    /// Initial properties.
    #[serde(default)]
    pub properties: Properties,

    /// Initial labels.
    #[serde(default)]
    pub labels: Vec<String>,
}

impl NewObject {
    /// Start a new object of the given type with no properties.
    pub fn new(object_type: impl Into<String>) -> Self {
        Self {
            object_type: object_type.into(),
            properties: Properties::new(),
            labels: Vec::new(),
        }
    }

    /// Set a property (builder style).
    #[must_use]
    pub fn with_property(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.properties.insert(key.to_string(), value.into());
        self
    }
}

/// A stored relationship between two objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    /// Relationship ID.
    pub id: ObjectId,

    /// Relationship type name (e.g. "blocks").
    #[serde(rename = "type")]
    pub rel_type: String,

    /// Source endpoint, in whichever identity variant the store chose.
    pub src_id: ObjectId,

    /// Destination endpoint, in whichever identity variant the store chose.
    pub dst_id: ObjectId,

    /// Relationship properties.
    #[serde(default)]
    pub properties: Properties,
}

/// Traversal direction relative to the root objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Follow edges from source to destination.
    #[default]
    Outgoing,
    /// Follow edges from destination to source.
    Incoming,
    /// Follow edges either way.
    Both,
}

/// A bounded graph traversal request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpandRequest {
    /// Objects to start from (either identity variant).
    pub root_ids: Vec<ObjectId>,

    /// Which way edges are followed.
    pub direction: Direction,

    /// Maximum number of hops from a root.
    pub max_depth: usize,

    /// Maximum number of nodes in the result, roots included.
    pub max_nodes: usize,

    /// Maximum number of edges in the result.
    pub max_edges: usize,

    /// Relationship types to follow. Empty means all types.
    #[serde(default)]
    pub relationship_types: Vec<String>,
}

impl ExpandRequest {
    /// True if this request follows relationships of `rel_type`.
    pub fn follows(&self, rel_type: &str) -> bool {
        self.relationship_types.is_empty() || self.relationship_types.iter().any(|t| t == rel_type)
    }
}

/// An edge returned by a traversal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExpandEdge {
    /// Relationship type name.
    #[serde(rename = "type")]
    pub rel_type: String,

    /// Source endpoint (either identity variant).
    pub src_id: ObjectId,

    /// Destination endpoint (either identity variant).
    pub dst_id: ObjectId,
}

/// Result of a bounded traversal.
///
/// When a budget is hit the result is silently partial: some nodes are
/// missing and edges may point at nodes that are not in `nodes`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpandResponse {
    /// Nodes reached, roots first.
    pub nodes: Vec<GraphObject>,

    /// Edges traversed.
    pub edges: Vec<ExpandEdge>,

    /// Set when any budget cut the traversal short.
    #[serde(default)]
    pub truncated: bool,
}

/// Options for [`GraphStore::list_objects`](crate::GraphStore::list_objects).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListObjectsOptions {
    /// Only objects of this type.
    pub object_type: Option<String>,

    /// Only objects whose string properties equal these values.
    #[serde(default)]
    pub property_filters: Vec<(String, String)>,

    /// Maximum number of objects to return.
    pub limit: Option<usize>,
}

impl ListObjectsOptions {
    /// List every object of `object_type`.
    pub fn of_type(object_type: impl Into<String>) -> Self {
        Self {
            object_type: Some(object_type.into()),
            ..Self::default()
        }
    }
}

/// Options for [`GraphStore::list_relationships`](crate::GraphStore::list_relationships).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListRelationshipsOptions {
    /// Only relationships of this type.
    pub rel_type: Option<String>,

    /// Only relationships leaving this object (either variant).
    pub src_id: Option<ObjectId>,

    /// Only relationships entering this object (either variant).
    pub dst_id: Option<ObjectId>,

    /// Maximum number of relationships to return.
    pub limit: Option<usize>,
}

/// Relationships touching a single object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectEdges {
    /// Relationships whose source is the object.
    pub outgoing: Vec<Relationship>,

    /// Relationships whose destination is the object.
    pub incoming: Vec<Relationship>,
}
