//! Common test utilities shared across integration tests.

#![allow(dead_code)]

use specgraph::domain::{EntityType, GraphObject, RelType};
use specgraph::{EngineConfig, Workflow};
use specgraph_store::{GraphStore, InMemoryGraphStore, NewObject, Properties};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Route engine logs to the test harness. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("specgraph=debug")),
        )
        .with_test_writer()
        .try_init();
}

/// An in-memory project with a workflow over it.
pub struct Project {
    pub store: Arc<InMemoryGraphStore>,
    pub workflow: Workflow,
}

impl Project {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// A project whose workflow runs with custom traversal budgets.
    pub fn with_config(config: EngineConfig) -> Self {
        init_tracing();
        let store = Arc::new(InMemoryGraphStore::new("sg"));
        let workflow = Workflow::new(store.clone(), config);
        Self { store, workflow }
    }

    /// Create an entity with a name and optional status.
    pub async fn entity(
        &self,
        entity_type: EntityType,
        name: &str,
        status: Option<&str>,
    ) -> GraphObject {
        let mut new_object = NewObject::new(entity_type.as_str()).with_property("name", name);
        if let Some(status) = status {
            new_object = new_object.with_property("status", status);
        }
        self.store.create_object(new_object).await.unwrap()
    }

    /// Create a task directly, bypassing generation.
    pub async fn task(&self, number: &str, status: &str, points: u32) -> GraphObject {
        self.store
            .create_object(
                NewObject::new("Task")
                    .with_property("number", number)
                    .with_property("description", format!("task {number}"))
                    .with_property("status", status)
                    .with_property("complexity_points", points),
            )
            .await
            .unwrap()
    }

    /// Link by the source's version ID and the target's canonical ID, the
    /// mix the remote store tends to return.
    pub async fn link(&self, rel: RelType, src: &GraphObject, dst: &GraphObject) {
        self.store
            .create_relationship(rel.as_str(), &src.id, &dst.canonical_id, Properties::new())
            .await
            .unwrap();
    }

    /// Link by canonical IDs on both ends.
    pub async fn link_canonical(&self, rel: RelType, src: &GraphObject, dst: &GraphObject) {
        self.store
            .create_relationship(
                rel.as_str(),
                &src.canonical_id,
                &dst.canonical_id,
                Properties::new(),
            )
            .await
            .unwrap();
    }

    /// Set an entity's status, minting a new version.
    pub async fn set_status(&self, object: &GraphObject, status: &str) -> GraphObject {
        let mut properties = Properties::new();
        properties.insert("status".to_string(), status.into());
        self.store
            .update_object(&object.canonical_id, properties)
            .await
            .unwrap()
    }

    /// A constitution and a pattern, so new changes are not blocked.
    pub async fn seed_project(&self) {
        self.entity(EntityType::Constitution, "principles", None).await;
        self.entity(EntityType::Pattern, "repository", None).await;
    }

    /// A change whose proposal, spec tree and design are all ready.
    pub async fn change_ready_for_tasks(&self, name: &str) -> GraphObject {
        let change = self.entity(EntityType::Change, name, Some("active")).await;
        let proposal = self.entity(EntityType::Proposal, "proposal", Some("ready")).await;
        let spec = self.entity(EntityType::Spec, "spec", Some("ready")).await;
        let requirement = self
            .entity(EntityType::Requirement, "requirement", Some("ready"))
            .await;
        let scenario = self.entity(EntityType::Scenario, "scenario", Some("ready")).await;
        let design = self.entity(EntityType::Design, "design", Some("ready")).await;

        self.link(RelType::HasProposal, &change, &proposal).await;
        self.link(RelType::HasSpec, &change, &spec).await;
        self.link_canonical(RelType::HasRequirement, &spec, &requirement).await;
        self.link(RelType::HasScenario, &requirement, &scenario).await;
        self.link(RelType::HasDesign, &change, &design).await;

        change
    }
}
