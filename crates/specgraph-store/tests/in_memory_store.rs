//! Integration tests for the in-memory graph store.
//!
//! These cover the identity model (canonical vs version IDs), relationship
//! rendering, listing filters and the budgets honoured by `expand`.

use rstest::rstest;
use specgraph_store::{
    Direction, ExpandRequest, GraphStore, InMemoryGraphStore, ListObjectsOptions,
    ListRelationshipsOptions, NewObject, ObjectId, Properties, StoreError,
};

fn props(pairs: &[(&str, &str)]) -> Properties {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), serde_json::Value::from(*v)))
        .collect()
}

fn request(root: &ObjectId, depth: usize, nodes: usize, edges: usize) -> ExpandRequest {
    ExpandRequest {
        root_ids: vec![root.clone()],
        direction: Direction::Outgoing,
        max_depth: depth,
        max_nodes: nodes,
        max_edges: edges,
        relationship_types: vec![],
    }
}

// ========== Identity Tests ==========

#[tokio::test]
async fn test_create_object_has_distinct_identities() {
    let store = InMemoryGraphStore::new("sg");

    let obj = store.create_object(NewObject::new("Spec")).await.unwrap();

    assert_ne!(obj.id, obj.canonical_id);
    assert!(obj.id.as_str().starts_with("sg-v"));
    assert!(obj.canonical_id.as_str().starts_with("sg-c"));
}

#[tokio::test]
async fn test_update_mints_new_version() {
    let store = InMemoryGraphStore::new("sg");
    let obj = store.create_object(NewObject::new("Spec")).await.unwrap();

    let updated = store
        .update_object(&obj.id, props(&[("status", "ready")]))
        .await
        .unwrap();

    assert_eq!(updated.canonical_id, obj.canonical_id);
    assert_ne!(updated.id, obj.id);
    assert_eq!(updated.str_property("status"), Some("ready"));
}

#[rstest]
#[case::by_canonical(true)]
#[case::by_version(false)]
#[tokio::test]
async fn test_get_object_accepts_either_variant(#[case] by_canonical: bool) {
    let store = InMemoryGraphStore::new("sg");
    let obj = store.create_object(NewObject::new("Task")).await.unwrap();
    let id = if by_canonical { &obj.canonical_id } else { &obj.id };

    let fetched = store.get_object(id).await.unwrap();

    assert_eq!(fetched, obj);
}

#[tokio::test]
async fn test_superseded_version_resolves_to_current_state() {
    let store = InMemoryGraphStore::new("sg");
    let obj = store.create_object(NewObject::new("Task")).await.unwrap();
    let updated = store
        .update_object(&obj.canonical_id, props(&[("status", "completed")]))
        .await
        .unwrap();

    let fetched = store.get_object(&obj.id).await.unwrap();

    assert_eq!(fetched.id, updated.id);
    assert_eq!(fetched.str_property("status"), Some("completed"));
}

#[tokio::test]
async fn test_update_with_null_removes_property() {
    let store = InMemoryGraphStore::new("sg");
    let obj = store
        .create_object(NewObject::new("Task").with_property("status", "pending"))
        .await
        .unwrap();

    let mut removal = Properties::new();
    removal.insert("status".to_string(), serde_json::Value::Null);
    let updated = store.update_object(&obj.id, removal).await.unwrap();

    assert!(updated.properties.get("status").is_none());
}

#[tokio::test]
async fn test_get_missing_object_is_not_found() {
    let store = InMemoryGraphStore::new("sg");

    let err = store.get_object(&ObjectId::new("sg-cnope1")).await.unwrap_err();

    assert!(matches!(err, StoreError::NotFound(_)));
}

// ========== Relationship Tests ==========

#[tokio::test]
async fn test_relationship_renders_caller_variant() {
    let store = InMemoryGraphStore::new("sg");
    let a = store.create_object(NewObject::new("Task")).await.unwrap();
    let b = store.create_object(NewObject::new("Task")).await.unwrap();

    let rel = store
        .create_relationship("blocks", &a.canonical_id, &b.id, Properties::new())
        .await
        .unwrap();

    assert_eq!(rel.src_id, a.canonical_id);
    assert_eq!(rel.dst_id, b.id);
}

#[tokio::test]
async fn test_version_endpoint_follows_current_version() {
    let store = InMemoryGraphStore::new("sg");
    let a = store.create_object(NewObject::new("Task")).await.unwrap();
    let b = store.create_object(NewObject::new("Task")).await.unwrap();
    store
        .create_relationship("blocks", &a.id, &b.id, Properties::new())
        .await
        .unwrap();

    let b2 = store
        .update_object(&b.id, props(&[("status", "blocked")]))
        .await
        .unwrap();
    let rels = store
        .list_relationships(&ListRelationshipsOptions {
            rel_type: Some("blocks".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(rels.len(), 1);
    assert_eq!(rels[0].dst_id, b2.id);
}

#[tokio::test]
async fn test_relationship_to_missing_object_fails() {
    let store = InMemoryGraphStore::new("sg");
    let a = store.create_object(NewObject::new("Task")).await.unwrap();

    let err = store
        .create_relationship("blocks", &a.id, &ObjectId::new("missing"), Properties::new())
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::NotFound(_)));
    assert_eq!(store.relationship_count().await, 0);
}

#[tokio::test]
async fn test_object_edges_split_by_direction() {
    let store = InMemoryGraphStore::new("sg");
    let a = store.create_object(NewObject::new("Task")).await.unwrap();
    let b = store.create_object(NewObject::new("Task")).await.unwrap();
    let c = store.create_object(NewObject::new("Task")).await.unwrap();
    store
        .create_relationship("blocks", &a.id, &b.id, Properties::new())
        .await
        .unwrap();
    store
        .create_relationship("blocks", &b.id, &c.id, Properties::new())
        .await
        .unwrap();

    let edges = store.get_object_edges(&b.canonical_id).await.unwrap();

    assert_eq!(edges.incoming.len(), 1);
    assert_eq!(edges.outgoing.len(), 1);
    assert_eq!(edges.incoming[0].src_id, a.id);
    assert_eq!(edges.outgoing[0].dst_id, c.id);
}

// ========== Listing Tests ==========

#[tokio::test]
async fn test_list_and_count_by_type() {
    let store = InMemoryGraphStore::new("sg");
    for _ in 0..3 {
        store.create_object(NewObject::new("Pattern")).await.unwrap();
    }
    store.create_object(NewObject::new("Constitution")).await.unwrap();

    assert_eq!(store.count_objects("Pattern").await.unwrap(), 3);
    assert_eq!(store.count_objects("Context").await.unwrap(), 0);

    let limited = store
        .list_objects(&ListObjectsOptions {
            limit: Some(2),
            ..ListObjectsOptions::of_type("Pattern")
        })
        .await
        .unwrap();
    assert_eq!(limited.len(), 2);
}

#[tokio::test]
async fn test_list_objects_property_filter() {
    let store = InMemoryGraphStore::new("sg");
    store
        .create_object(NewObject::new("Change").with_property("name", "add-login"))
        .await
        .unwrap();
    store
        .create_object(NewObject::new("Change").with_property("name", "fix-cache"))
        .await
        .unwrap();

    let found = store
        .list_objects(&ListObjectsOptions {
            property_filters: vec![("name".to_string(), "fix-cache".to_string())],
            ..ListObjectsOptions::of_type("Change")
        })
        .await
        .unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].str_property("name"), Some("fix-cache"));
}

// ========== Expand Tests ==========

/// Builds root -> a -> b -> c, returning all four objects.
async fn chain(store: &InMemoryGraphStore) -> Vec<specgraph_store::GraphObject> {
    let mut objects = Vec::new();
    for _ in 0..4 {
        objects.push(store.create_object(NewObject::new("Task")).await.unwrap());
    }
    for pair in objects.windows(2) {
        store
            .create_relationship("blocks", &pair[0].id, &pair[1].canonical_id, Properties::new())
            .await
            .unwrap();
    }
    objects
}

#[tokio::test]
async fn test_expand_respects_depth() {
    let store = InMemoryGraphStore::new("sg");
    let objects = chain(&store).await;

    let response = store
        .expand(&request(&objects[0].canonical_id, 2, 100, 100))
        .await
        .unwrap();

    assert_eq!(response.nodes.len(), 3);
    assert_eq!(response.edges.len(), 2);
    assert!(!response.truncated);
}

#[tokio::test]
async fn test_expand_node_budget_leaves_dangling_edge() {
    let store = InMemoryGraphStore::new("sg");
    let objects = chain(&store).await;

    let response = store
        .expand(&request(&objects[0].id, 3, 2, 100))
        .await
        .unwrap();

    assert_eq!(response.nodes.len(), 2);
    assert!(response.truncated);
    // The edge to the third object is still reported even though its node is not.
    assert!(
        response
            .edges
            .iter()
            .any(|e| e.dst_id == objects[2].canonical_id)
    );
}

#[tokio::test]
async fn test_expand_edge_budget() {
    let store = InMemoryGraphStore::new("sg");
    let objects = chain(&store).await;

    let response = store
        .expand(&request(&objects[0].id, 3, 100, 1))
        .await
        .unwrap();

    assert_eq!(response.edges.len(), 1);
    assert!(response.truncated);
}

#[tokio::test]
async fn test_expand_filters_relationship_types() {
    let store = InMemoryGraphStore::new("sg");
    let change = store.create_object(NewObject::new("Change")).await.unwrap();
    let task = store.create_object(NewObject::new("Task")).await.unwrap();
    let spec = store.create_object(NewObject::new("Spec")).await.unwrap();
    store
        .create_relationship("has_task", &change.id, &task.id, Properties::new())
        .await
        .unwrap();
    store
        .create_relationship("has_spec", &change.id, &spec.id, Properties::new())
        .await
        .unwrap();

    let mut req = request(&change.id, 1, 100, 100);
    req.relationship_types = vec!["has_task".to_string()];
    let response = store.expand(&req).await.unwrap();

    assert_eq!(response.nodes.len(), 2);
    assert_eq!(response.edges.len(), 1);
    assert_eq!(response.edges[0].rel_type, "has_task");
}

#[tokio::test]
async fn test_expand_both_directions() {
    let store = InMemoryGraphStore::new("sg");
    let objects = chain(&store).await;

    let mut req = request(&objects[1].id, 1, 100, 100);
    req.direction = Direction::Both;
    let response = store.expand(&req).await.unwrap();

    assert_eq!(response.nodes.len(), 3);
    assert_eq!(response.edges.len(), 2);
}

#[tokio::test]
async fn test_expand_without_roots_is_invalid() {
    let store = InMemoryGraphStore::new("sg");

    let req = ExpandRequest {
        root_ids: vec![],
        direction: Direction::Outgoing,
        max_depth: 1,
        max_nodes: 10,
        max_edges: 10,
        relationship_types: vec![],
    };

    assert!(matches!(
        store.expand(&req).await,
        Err(StoreError::InvalidRequest(_))
    ));
}
