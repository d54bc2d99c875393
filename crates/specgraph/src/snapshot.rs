//! Point-in-time view of a traversal result.
//!
//! A [`Snapshot`] is what the pure calculators read. Building one indexes the
//! nodes by both identity variants, canonicalizes every edge endpoint and
//! groups edges by source and relationship type.

use crate::domain::{ArtifactStatus, EntityType, GraphObject, ObjectId, RelType};
use crate::identity::{IdSet, IdentityIndex, canonicalize_edges};
use specgraph_store::{ExpandEdge, ExpandResponse};
use std::collections::HashMap;
use tracing::debug;

/// Canonicalized traversal result with edge adjacency.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    index: IdentityIndex,
    edges: Vec<ExpandEdge>,
    /// src -> relationship type -> destinations, in edge order
    adjacency: HashMap<ObjectId, HashMap<String, Vec<ObjectId>>>,
    truncated: bool,
}

impl Snapshot {
    /// Index and canonicalize a traversal result.
    pub fn from_response(response: ExpandResponse) -> Self {
        let index = IdentityIndex::build(response.nodes);
        let mut edges = response.edges;
        let unresolved = canonicalize_edges(&mut edges, &index);

        if response.truncated || unresolved > 0 {
            debug!(
                nodes = index.len(),
                edges = edges.len(),
                unresolved,
                truncated = response.truncated,
                "Partial traversal result"
            );
        }

        let mut adjacency: HashMap<ObjectId, HashMap<String, Vec<ObjectId>>> = HashMap::new();
        for edge in &edges {
            let targets = adjacency
                .entry(edge.src_id.clone())
                .or_default()
                .entry(edge.rel_type.clone())
                .or_default();
            if !targets.contains(&edge.dst_id) {
                targets.push(edge.dst_id.clone());
            }
        }

        Self {
            index,
            edges,
            adjacency,
            truncated: response.truncated,
        }
    }

    /// The identity index over the snapshot's nodes.
    pub fn index(&self) -> &IdentityIndex {
        &self.index
    }

    /// Canonicalized edges, in traversal order.
    pub fn edges(&self) -> &[ExpandEdge] {
        &self.edges
    }

    /// True if the store reported that a budget cut the traversal short.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Node named by either identity variant.
    pub fn object(&self, id: &ObjectId) -> Option<&GraphObject> {
        self.index.get(id)
    }

    /// Primary ID for `id`, or `id` itself when the node is not in the snapshot.
    pub fn primary_id<'a>(&'a self, id: &'a ObjectId) -> &'a ObjectId {
        self.index.primary_id(id).unwrap_or(id)
    }

    /// Destinations of `rel` edges leaving `src`, without duplicates.
    ///
    /// `src` may be either identity variant, and may name a node that is not
    /// in the snapshot.
    pub fn targets(&self, src: &ObjectId, rel: RelType) -> Vec<&ObjectId> {
        let mut found: Vec<&ObjectId> = Vec::new();
        for variant in IdSet::for_id(src, &self.index).iter() {
            let Some(by_type) = self.adjacency.get(variant) else {
                continue;
            };
            for dst in by_type.get(rel.as_str()).into_iter().flatten() {
                if !found.contains(&dst) {
                    found.push(dst);
                }
            }
        }
        found
    }

    /// Status of a workflow artifact.
    ///
    /// Nodes that are not in the snapshot read as draft.
    pub fn artifact_status(&self, id: &ObjectId) -> ArtifactStatus {
        self.object(id).map_or(ArtifactStatus::Draft, ArtifactStatus::of)
    }

    /// Nodes of the given type.
    pub fn objects_of_type(&self, entity_type: EntityType) -> impl Iterator<Item = &GraphObject> {
        self.index
            .iter()
            .map(|(_, object)| object)
            .filter(move |object| entity_type.matches(object))
    }
}
