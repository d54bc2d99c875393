//! Core in-memory store data structures.
//!
//! This module contains the inner store that holds all data and is wrapped in
//! `Arc<Mutex<>>` by [`InMemoryGraphStore`](super::InMemoryGraphStore).

use crate::error::{Result, StoreError};
use crate::id_generation::{IdGenerator, IdKind};
use crate::types::{ExpandEdge, GraphObject, NewObject, ObjectId, Properties, Relationship};
use std::collections::HashMap;

/// Which identity variant a relationship endpoint was created with.
///
/// The store renders the endpoint back in the same variant, which is how the
/// remote store ends up returning edges whose endpoints mix canonical and
/// version-specific IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum EndpointRef {
    Canonical,
    Version,
}

/// Current state of one object.
#[derive(Debug, Clone)]
pub(super) struct StoredObject {
    pub(super) canonical_id: ObjectId,
    pub(super) version_id: ObjectId,
    pub(super) object_type: String,
    pub(super) properties: Properties,
    pub(super) labels: Vec<String>,
}

impl StoredObject {
    pub(super) fn to_graph_object(&self) -> GraphObject {
        GraphObject {
            id: self.version_id.clone(),
            canonical_id: self.canonical_id.clone(),
            object_type: self.object_type.clone(),
            properties: self.properties.clone(),
            labels: self.labels.clone(),
        }
    }
}

/// A relationship with endpoints stored by canonical ID.
#[derive(Debug, Clone)]
pub(super) struct StoredRelationship {
    pub(super) id: ObjectId,
    pub(super) rel_type: String,
    pub(super) src: ObjectId,
    pub(super) dst: ObjectId,
    pub(super) src_ref: EndpointRef,
    pub(super) dst_ref: EndpointRef,
    pub(super) properties: Properties,
}

/// Inner store (not thread-safe).
pub(crate) struct InMemoryStoreInner {
    /// Objects keyed by canonical ID.
    pub(super) objects: HashMap<ObjectId, StoredObject>,

    /// Canonical IDs in creation order, so listings are deterministic.
    pub(super) creation_order: Vec<ObjectId>,

    /// Every version ID ever issued, mapped to its canonical ID.
    ///
    /// Old versions keep resolving to the current state of the object.
    pub(super) versions: HashMap<ObjectId, ObjectId>,

    /// Relationships in creation order.
    pub(super) relationships: Vec<StoredRelationship>,

    pub(super) id_generator: IdGenerator,
}

impl InMemoryStoreInner {
    /// Create a new empty store
    pub(crate) fn new(prefix: &str) -> Self {
        Self {
            objects: HashMap::new(),
            creation_order: Vec::new(),
            versions: HashMap::new(),
            relationships: Vec::new(),
            id_generator: IdGenerator::new(prefix),
        }
    }

    /// Resolve either identity variant to the canonical ID, remembering which
    /// variant was given.
    pub(super) fn resolve(&self, id: &ObjectId) -> Option<(ObjectId, EndpointRef)> {
        if self.objects.contains_key(id) {
            return Some((id.clone(), EndpointRef::Canonical));
        }
        self.versions
            .get(id)
            .map(|canonical| (canonical.clone(), EndpointRef::Version))
    }

    pub(super) fn resolve_or_not_found(&self, id: &ObjectId) -> Result<(ObjectId, EndpointRef)> {
        self.resolve(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    pub(super) fn object(&self, canonical: &ObjectId) -> Result<&StoredObject> {
        self.objects
            .get(canonical)
            .ok_or_else(|| StoreError::NotFound(canonical.to_string()))
    }

    pub(super) fn insert_object(&mut self, new_object: NewObject) -> Result<GraphObject> {
        let canonical_id = ObjectId(
            self.id_generator
                .generate(IdKind::Canonical, &new_object.object_type)?,
        );
        let version_id = ObjectId(
            self.id_generator
                .generate(IdKind::Version, &new_object.object_type)?,
        );

        let stored = StoredObject {
            canonical_id: canonical_id.clone(),
            version_id: version_id.clone(),
            object_type: new_object.object_type,
            properties: new_object.properties,
            labels: new_object.labels,
        };
        let rendered = stored.to_graph_object();

        self.versions.insert(version_id, canonical_id.clone());
        self.creation_order.push(canonical_id.clone());
        self.objects.insert(canonical_id, stored);

        Ok(rendered)
    }

    /// Merge properties into an object and mint a new version ID.
    pub(super) fn apply_update(
        &mut self,
        id: &ObjectId,
        properties: Properties,
    ) -> Result<GraphObject> {
        let (canonical, _) = self.resolve_or_not_found(id)?;
        let object_type = self.object(&canonical)?.object_type.clone();
        let version_id = ObjectId(self.id_generator.generate(IdKind::Version, &object_type)?);
        self.versions.insert(version_id.clone(), canonical.clone());

        let stored = self
            .objects
            .get_mut(&canonical)
            .ok_or_else(|| StoreError::NotFound(canonical.to_string()))?;

        for (key, value) in properties {
            if value.is_null() {
                stored.properties.remove(&key);
            } else {
                stored.properties.insert(key, value);
            }
        }
        stored.version_id = version_id;

        Ok(stored.to_graph_object())
    }

    pub(super) fn insert_relationship(
        &mut self,
        rel_type: &str,
        src_id: &ObjectId,
        dst_id: &ObjectId,
        properties: Properties,
    ) -> Result<Relationship> {
        if rel_type.is_empty() {
            return Err(StoreError::InvalidRequest(
                "relationship type must not be empty".to_string(),
            ));
        }

        let (src, src_ref) = self.resolve_or_not_found(src_id)?;
        let (dst, dst_ref) = self.resolve_or_not_found(dst_id)?;
        let id = ObjectId(self.id_generator.generate(IdKind::Relationship, rel_type)?);

        let stored = StoredRelationship {
            id,
            rel_type: rel_type.to_string(),
            src,
            dst,
            src_ref,
            dst_ref,
            properties,
        };
        let rendered = self.render_relationship(&stored);
        self.relationships.push(stored);

        Ok(rendered)
    }

    /// Render an endpoint in the variant it was created with.
    ///
    /// Version-style endpoints always point at the object's current version.
    pub(super) fn render_endpoint(&self, canonical: &ObjectId, style: EndpointRef) -> ObjectId {
        match (style, self.objects.get(canonical)) {
            (EndpointRef::Version, Some(object)) => object.version_id.clone(),
            _ => canonical.clone(),
        }
    }

    pub(super) fn render_relationship(&self, rel: &StoredRelationship) -> Relationship {
        Relationship {
            id: rel.id.clone(),
            rel_type: rel.rel_type.clone(),
            src_id: self.render_endpoint(&rel.src, rel.src_ref),
            dst_id: self.render_endpoint(&rel.dst, rel.dst_ref),
            properties: rel.properties.clone(),
        }
    }

    pub(super) fn render_edge(&self, rel: &StoredRelationship) -> ExpandEdge {
        ExpandEdge {
            rel_type: rel.rel_type.clone(),
            src_id: self.render_endpoint(&rel.src, rel.src_ref),
            dst_id: self.render_endpoint(&rel.dst, rel.dst_ref),
        }
    }
}
