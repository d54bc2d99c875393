//! Dual-identity resolution for traversal results.
//!
//! Every stored entity has a version-specific ID that changes on each edit and
//! a canonical ID that never changes. A traversal result may name the same
//! entity by either variant, and different edges in the same result may
//! disagree. Before any calculation runs, a result is passed through an
//! [`IdentityIndex`] and [`canonicalize_edges`] so that every endpoint that
//! names a node in the result uses that node's primary ID.
//!
//! # Primary ID
//!
//! The primary ID of a node is its canonical ID (its [`EntityIdentity::key`]).
//! Nodes that come back without a canonical ID fall back to their version ID.
//!
//! Indexes are built per fetch and dropped with the request. Nothing is cached.

use crate::domain::{GraphObject, ObjectId};
use serde::{Deserialize, Serialize};
use specgraph_store::ExpandEdge;
use std::collections::HashMap;
use tracing::debug;

/// Stable key plus the current version pointer of one entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityIdentity {
    /// Canonical ID; stable across edits.
    pub key: ObjectId,

    /// Version-specific ID at fetch time, when it differs from the key.
    pub version: Option<ObjectId>,
}

impl EntityIdentity {
    /// Identity of a fetched object.
    pub fn of(object: &GraphObject) -> Self {
        if object.canonical_id.is_empty() {
            return Self {
                key: object.id.clone(),
                version: None,
            };
        }

        let version = (!object.id.is_empty() && object.id != object.canonical_id)
            .then(|| object.id.clone());

        Self {
            key: object.canonical_id.clone(),
            version,
        }
    }

    /// True if `id` is either variant of this identity.
    pub fn matches(&self, id: &ObjectId) -> bool {
        self.key == *id || self.version.as_ref() == Some(id)
    }

    /// The variants of this identity, key first.
    pub fn variants(&self) -> impl Iterator<Item = &ObjectId> {
        std::iter::once(&self.key).chain(self.version.as_ref())
    }
}

/// Arena of fetched nodes with a translation table from both ID variants to
/// the node's slot.
#[derive(Debug, Clone, Default)]
pub struct IdentityIndex {
    nodes: Vec<GraphObject>,
    identities: Vec<EntityIdentity>,
    slots: HashMap<ObjectId, usize>,
}

impl IdentityIndex {
    /// Index a set of nodes.
    ///
    /// When the same entity appears more than once, the first occurrence wins.
    pub fn build(nodes: Vec<GraphObject>) -> Self {
        let mut index = Self::default();

        for node in nodes {
            let identity = EntityIdentity::of(&node);
            if identity.variants().any(|id| index.slots.contains_key(id)) {
                debug!(key = %identity.key, "Skipping duplicate node in traversal result");
                continue;
            }

            let slot = index.nodes.len();
            for id in identity.variants() {
                index.slots.insert(id.clone(), slot);
            }
            index.nodes.push(node);
            index.identities.push(identity);
        }

        index
    }

    /// Node named by either variant.
    pub fn get(&self, id: &ObjectId) -> Option<&GraphObject> {
        self.slots.get(id).map(|&slot| &self.nodes[slot])
    }

    /// Identity of the node named by either variant.
    pub fn identity(&self, id: &ObjectId) -> Option<&EntityIdentity> {
        self.slots.get(id).map(|&slot| &self.identities[slot])
    }

    /// Primary ID of the node named by either variant.
    pub fn primary_id(&self, id: &ObjectId) -> Option<&ObjectId> {
        self.identity(id).map(|identity| &identity.key)
    }

    /// True if either variant names a node in the index.
    pub fn contains(&self, id: &ObjectId) -> bool {
        self.slots.contains_key(id)
    }

    /// Nodes with their identities, in fetch order.
    pub fn iter(&self) -> impl Iterator<Item = (&EntityIdentity, &GraphObject)> {
        self.identities.iter().zip(self.nodes.iter())
    }

    /// Number of distinct entities indexed.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when no nodes were indexed.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Rewrite edge endpoints to primary IDs, in place.
///
/// Endpoints that name no node in `index` are left exactly as they were.
/// Returns the number of endpoints that could not be resolved.
pub fn canonicalize_edges(edges: &mut [ExpandEdge], index: &IdentityIndex) -> usize {
    let mut unresolved = 0;

    for edge in edges.iter_mut() {
        for endpoint in [&mut edge.src_id, &mut edge.dst_id] {
            match index.primary_id(endpoint) {
                Some(primary) if *primary != *endpoint => *endpoint = primary.clone(),
                Some(_) => {}
                None => unresolved += 1,
            }
        }
    }

    unresolved
}

/// Both ID variants of a single entity.
///
/// Used to match edges against an entity that may not be present in the
/// node set (for instance when it was cut by a traversal budget).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdSet {
    ids: Vec<ObjectId>,
}

impl IdSet {
    /// Every known variant of `id`.
    ///
    /// If `id` names an indexed node, all of that node's variants are
    /// included; otherwise the set contains only `id` itself.
    pub fn for_id(id: &ObjectId, index: &IdentityIndex) -> Self {
        let mut ids = vec![id.clone()];
        if let Some(identity) = index.identity(id) {
            for variant in identity.variants() {
                if !ids.contains(variant) {
                    ids.push(variant.clone());
                }
            }
        }
        Self { ids }
    }

    /// True if `id` is in the set.
    pub fn contains(&self, id: &ObjectId) -> bool {
        self.ids.contains(id)
    }

    /// The variants in the set.
    pub fn iter(&self) -> impl Iterator<Item = &ObjectId> {
        self.ids.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Properties;

    fn node(version: &str, canonical: &str) -> GraphObject {
        GraphObject {
            id: ObjectId::new(version),
            canonical_id: ObjectId::new(canonical),
            object_type: "Task".to_string(),
            properties: Properties::new(),
            labels: vec![],
        }
    }

    fn edge(src: &str, dst: &str) -> ExpandEdge {
        ExpandEdge {
            rel_type: "blocks".to_string(),
            src_id: ObjectId::new(src),
            dst_id: ObjectId::new(dst),
        }
    }

    #[test]
    fn test_identity_of_versioned_node() {
        let identity = EntityIdentity::of(&node("v1", "c1"));
        assert_eq!(identity.key, ObjectId::new("c1"));
        assert_eq!(identity.version, Some(ObjectId::new("v1")));
        assert!(identity.matches(&ObjectId::new("v1")));
        assert!(identity.matches(&ObjectId::new("c1")));
        assert!(!identity.matches(&ObjectId::new("v0")));
    }

    #[test]
    fn test_identity_without_canonical_falls_back_to_version() {
        let identity = EntityIdentity::of(&node("v1", ""));
        assert_eq!(identity.key, ObjectId::new("v1"));
        assert_eq!(identity.version, None);
    }

    #[test]
    fn test_index_lookup_by_either_variant() {
        let index = IdentityIndex::build(vec![node("v1", "c1"), node("v2", "c2")]);

        assert_eq!(index.len(), 2);
        assert_eq!(index.get(&ObjectId::new("v1")), index.get(&ObjectId::new("c1")));
        assert_eq!(
            index.primary_id(&ObjectId::new("v2")),
            Some(&ObjectId::new("c2"))
        );
        assert!(index.get(&ObjectId::new("v3")).is_none());
    }

    #[test]
    fn test_index_skips_duplicate_entity() {
        let index = IdentityIndex::build(vec![node("v1", "c1"), node("v1", "c1")]);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_canonicalize_mixed_variants() {
        let index = IdentityIndex::build(vec![node("v1", "c1"), node("v2", "c2")]);
        let mut edges = vec![edge("v1", "c2"), edge("c1", "v2")];

        let unresolved = canonicalize_edges(&mut edges, &index);

        assert_eq!(unresolved, 0);
        assert_eq!(edges[0], edges[1]);
        assert_eq!(edges[0].src_id, ObjectId::new("c1"));
        assert_eq!(edges[0].dst_id, ObjectId::new("c2"));
    }

    #[test]
    fn test_canonicalize_leaves_unknown_endpoints() {
        let index = IdentityIndex::build(vec![node("v1", "c1")]);
        let mut edges = vec![edge("gone", "v1")];

        let unresolved = canonicalize_edges(&mut edges, &index);

        assert_eq!(unresolved, 1);
        assert_eq!(edges[0].src_id, ObjectId::new("gone"));
        assert_eq!(edges[0].dst_id, ObjectId::new("c1"));
    }

    #[test]
    fn test_id_set_covers_both_variants() {
        let index = IdentityIndex::build(vec![node("v1", "c1")]);

        let set = IdSet::for_id(&ObjectId::new("v1"), &index);
        assert!(set.contains(&ObjectId::new("c1")));
        assert!(set.contains(&ObjectId::new("v1")));

        let unknown = IdSet::for_id(&ObjectId::new("x"), &index);
        assert_eq!(unknown.iter().count(), 1);
    }
}
