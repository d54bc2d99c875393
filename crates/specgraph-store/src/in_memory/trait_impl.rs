//! `GraphStore` trait implementation for the in-memory store.

use super::InMemoryGraphStore;
use super::expand::expand_impl;
use crate::error::{Result, StoreError};
use crate::store::GraphStore;
use crate::types::{
    ExpandRequest, ExpandResponse, GraphObject, ListObjectsOptions, ListRelationshipsOptions,
    NewObject, ObjectEdges, ObjectId, Properties, Relationship,
};
use async_trait::async_trait;
use tracing::debug;

#[async_trait]
impl GraphStore for InMemoryGraphStore {
    async fn expand(&self, request: &ExpandRequest) -> Result<ExpandResponse> {
        let inner = self.inner.lock().await;
        let response = expand_impl(&inner, request)?;

        debug!(
            roots = request.root_ids.len(),
            max_depth = request.max_depth,
            nodes = response.nodes.len(),
            edges = response.edges.len(),
            truncated = response.truncated,
            "Expanded graph"
        );

        Ok(response)
    }

    async fn get_object(&self, id: &ObjectId) -> Result<GraphObject> {
        let inner = self.inner.lock().await;
        let (canonical, _) = inner.resolve_or_not_found(id)?;
        Ok(inner.object(&canonical)?.to_graph_object())
    }

    async fn get_objects(&self, ids: &[ObjectId]) -> Result<Vec<GraphObject>> {
        let inner = self.inner.lock().await;
        Ok(ids
            .iter()
            .filter_map(|id| inner.resolve(id))
            .filter_map(|(canonical, _)| inner.objects.get(&canonical))
            .map(|object| object.to_graph_object())
            .collect())
    }

    async fn list_objects(&self, options: &ListObjectsOptions) -> Result<Vec<GraphObject>> {
        let inner = self.inner.lock().await;
        let limit = options.limit.unwrap_or(usize::MAX);

        Ok(inner
            .creation_order
            .iter()
            .filter_map(|canonical| inner.objects.get(canonical))
            .filter(|object| {
                options
                    .object_type
                    .as_ref()
                    .is_none_or(|t| object.object_type == *t)
            })
            .filter(|object| {
                options.property_filters.iter().all(|(key, value)| {
                    object
                        .properties
                        .get(key)
                        .and_then(serde_json::Value::as_str)
                        == Some(value.as_str())
                })
            })
            .take(limit)
            .map(|object| object.to_graph_object())
            .collect())
    }

    async fn count_objects(&self, object_type: &str) -> Result<usize> {
        let inner = self.inner.lock().await;
        Ok(inner
            .objects
            .values()
            .filter(|object| object.object_type == object_type)
            .count())
    }

    async fn list_relationships(
        &self,
        options: &ListRelationshipsOptions,
    ) -> Result<Vec<Relationship>> {
        let inner = self.inner.lock().await;

        // An endpoint filter that names an unknown object matches nothing.
        let src = match &options.src_id {
            Some(id) => match inner.resolve(id) {
                Some((canonical, _)) => Some(canonical),
                None => return Ok(Vec::new()),
            },
            None => None,
        };
        let dst = match &options.dst_id {
            Some(id) => match inner.resolve(id) {
                Some((canonical, _)) => Some(canonical),
                None => return Ok(Vec::new()),
            },
            None => None,
        };

        Ok(inner
            .relationships
            .iter()
            .filter(|rel| options.rel_type.as_ref().is_none_or(|t| rel.rel_type == *t))
            .filter(|rel| src.as_ref().is_none_or(|s| rel.src == *s))
            .filter(|rel| dst.as_ref().is_none_or(|d| rel.dst == *d))
            .take(options.limit.unwrap_or(usize::MAX))
            .map(|rel| inner.render_relationship(rel))
            .collect())
    }

    async fn get_object_edges(&self, id: &ObjectId) -> Result<ObjectEdges> {
        let inner = self.inner.lock().await;
        let (canonical, _) = inner.resolve_or_not_found(id)?;

        let mut edges = ObjectEdges::default();
        for rel in &inner.relationships {
            if rel.src == canonical {
                edges.outgoing.push(inner.render_relationship(rel));
            }
            if rel.dst == canonical {
                edges.incoming.push(inner.render_relationship(rel));
            }
        }
        Ok(edges)
    }

    async fn create_object(&self, new_object: NewObject) -> Result<GraphObject> {
        if new_object.object_type.is_empty() {
            return Err(StoreError::InvalidRequest(
                "object type must not be empty".to_string(),
            ));
        }

        let mut inner = self.inner.lock().await;
        let object = inner.insert_object(new_object)?;
        debug!(id = %object.canonical_id, object_type = %object.object_type, "Created object");
        Ok(object)
    }

    async fn update_object(&self, id: &ObjectId, properties: Properties) -> Result<GraphObject> {
        let mut inner = self.inner.lock().await;
        let object = inner.apply_update(id, properties)?;
        debug!(id = %object.canonical_id, version = %object.id, "Updated object");
        Ok(object)
    }

    async fn create_relationship(
        &self,
        rel_type: &str,
        src_id: &ObjectId,
        dst_id: &ObjectId,
        properties: Properties,
    ) -> Result<Relationship> {
        let mut inner = self.inner.lock().await;
        let rel = inner.insert_relationship(rel_type, src_id, dst_id, properties)?;
        debug!(rel_type, src = %rel.src_id, dst = %rel.dst_id, "Created relationship");
        Ok(rel)
    }
}
