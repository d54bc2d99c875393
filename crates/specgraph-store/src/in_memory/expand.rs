//! Bounded breadth-first traversal.

use super::inner::InMemoryStoreInner;
use crate::error::{Result, StoreError};
use crate::types::{Direction, ExpandRequest, ExpandResponse, ObjectId};
use std::collections::HashSet;

/// Run a bounded BFS over the stored relationships.
///
/// Relationships are scanned in creation order, so results are deterministic.
/// When the node budget is exhausted, edges to unreached nodes are still
/// emitted (while the edge budget lasts) and dangle, as they do on the
/// remote store.
pub(super) fn expand_impl(
    inner: &InMemoryStoreInner,
    request: &ExpandRequest,
) -> Result<ExpandResponse> {
    if request.root_ids.is_empty() {
        return Err(StoreError::InvalidRequest(
            "expand requires at least one root".to_string(),
        ));
    }

    let mut response = ExpandResponse::default();
    let mut visited: HashSet<ObjectId> = HashSet::new();
    let mut emitted: HashSet<usize> = HashSet::new();
    let mut frontier: Vec<ObjectId> = Vec::new();

    for root in &request.root_ids {
        let (canonical, _) = inner.resolve_or_not_found(root)?;
        if visited.contains(&canonical) {
            continue;
        }
        if response.nodes.len() >= request.max_nodes {
            response.truncated = true;
            continue;
        }
        response.nodes.push(inner.object(&canonical)?.to_graph_object());
        visited.insert(canonical.clone());
        frontier.push(canonical);
    }

    for _depth in 0..request.max_depth {
        let mut next = Vec::new();

        for current in &frontier {
            for (index, rel) in inner.relationships.iter().enumerate() {
                if emitted.contains(&index) || !request.follows(&rel.rel_type) {
                    continue;
                }

                let neighbor = match request.direction {
                    Direction::Outgoing if rel.src == *current => &rel.dst,
                    Direction::Incoming if rel.dst == *current => &rel.src,
                    Direction::Both if rel.src == *current => &rel.dst,
                    Direction::Both if rel.dst == *current => &rel.src,
                    _ => continue,
                };

                if response.edges.len() >= request.max_edges {
                    response.truncated = true;
                    continue;
                }

                if !visited.contains(neighbor) {
                    if response.nodes.len() < request.max_nodes {
                        response.nodes.push(inner.object(neighbor)?.to_graph_object());
                        visited.insert(neighbor.clone());
                        next.push(neighbor.clone());
                    } else {
                        response.truncated = true;
                    }
                }

                emitted.insert(index);
                response.edges.push(inner.render_edge(rel));
            }
        }

        if next.is_empty() {
            break;
        }
        frontier = next;
    }

    Ok(response)
}
