//! Request-scoped workflow operations.
//!
//! [`Workflow`] is the surface the transport layer calls. It owns nothing but
//! a handle to the store and the engine configuration; every operation
//! builds its own [`GuardContext`](crate::guards::GuardContext) and
//! [`Snapshot`](crate::snapshot::Snapshot)s and drops them on return.
//!
//! # Example
//!
//! ```
//! use specgraph::{EngineConfig, Workflow};
//! use specgraph_store::InMemoryGraphStore;
//! use std::sync::Arc;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let store = Arc::new(InMemoryGraphStore::new("sg"));
//!     let workflow = Workflow::new(store, EngineConfig::default());
//!
//!     let outcome = workflow.check_new_change("add-login", false).await?;
//!     // No constitution in an empty project
//!     assert!(outcome.blocked);
//!     Ok(())
//! }
//! ```
//!
//! # Policy versus failure
//!
//! Guard findings never surface as `Err`. Operations that run guards return
//! [`Guarded`], and [`Workflow::mark_ready`] reports unready children in its
//! report. `Err` is reserved for store failures and malformed requests.

mod cancel;
mod changes;
mod tasks;

pub use cancel::{CancellationHandle, CancellationSignal, cancellation};
pub use changes::{
    ArchivedChange, ArtifactOverview, ArtifactSummary, ChangeStatusReport, MarkReadyReport,
};
pub use tasks::{
    AssignedTask, AvailableTasks, CompletedTask, CriticalPathReport, GeneratedTasks,
    TaskCompletion, TaskDefinition,
};

use crate::config::EngineConfig;
use crate::domain::{EntityType, GraphObject, ObjectId};
use crate::error::{Error, Result};
use crate::guards::Outcome;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use specgraph_store::GraphStore;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// The result of an operation gated by guards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Guarded<T> {
    /// Guards blocked the operation; nothing was written.
    Blocked(Outcome),
    /// The operation ran. `outcome` carries any advisories.
    Proceeded {
        /// What the operation produced
        value: T,
        /// The guard run that let it through
        outcome: Outcome,
    },
}

impl<T> Guarded<T> {
    /// True if guards stopped the operation.
    pub fn is_blocked(&self) -> bool {
        matches!(self, Guarded::Blocked(_))
    }

    /// The guard outcome in either case.
    pub fn outcome(&self) -> &Outcome {
        match self {
            Guarded::Blocked(outcome) | Guarded::Proceeded { outcome, .. } => outcome,
        }
    }

    /// The produced value, if the operation ran.
    pub fn value(&self) -> Option<&T> {
        match self {
            Guarded::Blocked(_) => None,
            Guarded::Proceeded { value, .. } => Some(value),
        }
    }

    /// Consume into the produced value, if the operation ran.
    pub fn into_value(self) -> Option<T> {
        match self {
            Guarded::Blocked(_) => None,
            Guarded::Proceeded { value, .. } => Some(value),
        }
    }
}

/// Entity counts across the whole graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSummary {
    /// Count per entity type name
    pub counts: BTreeMap<String, usize>,
    /// Sum of all counts
    pub total: usize,
}

/// Workflow operations over a shared graph store.
#[derive(Clone)]
pub struct Workflow {
    store: Arc<dyn GraphStore>,
    config: EngineConfig,
}

impl fmt::Debug for Workflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workflow")
            .field("store", &"<dyn GraphStore>")
            .field("config", &self.config)
            .finish()
    }
}

impl Workflow {
    /// Create a workflow over `store`.
    pub fn new(store: Arc<dyn GraphStore>, config: EngineConfig) -> Self {
        Self { store, config }
    }

    /// The engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The underlying store.
    pub fn store(&self) -> &dyn GraphStore {
        self.store.as_ref()
    }

    /// Count every entity type concurrently and merge the results.
    ///
    /// # Errors
    ///
    /// Propagates the first store failure.
    pub async fn graph_summary(&self) -> Result<GraphSummary> {
        let store = self.store();
        let counts = try_join_all(EntityType::ALL.into_iter().map(|entity_type| async move {
            let count = store.count_objects(entity_type.as_str()).await?;
            Ok::<_, Error>((entity_type.as_str().to_string(), count))
        }))
        .await?;

        let summary = GraphSummary {
            total: counts.iter().map(|(_, count)| count).sum(),
            counts: counts.into_iter().collect(),
        };

        debug!(total = summary.total, "Summarized graph");
        Ok(summary)
    }

    /// Fetch an object and check its entity type.
    async fn fetch(&self, id: &ObjectId, expected: EntityType) -> Result<GraphObject> {
        let object = self.store.get_object(id).await?;
        if !expected.matches(&object) {
            return Err(Error::UnexpectedType {
                id: id.clone(),
                expected: expected.to_string(),
                actual: object.object_type,
            });
        }
        Ok(object)
    }
}
