//! Specgraph - workflow guards and task dependency analysis over a versioned
//! graph store.
//!
//! The engine reads a change's artifacts and tasks through bounded
//! traversals of a [`GraphStore`](specgraph_store::GraphStore), reconciles
//! the store's dual identities, and answers:
//!
//! - may this operation proceed ([`guards`])
//! - is this artifact tree ready ([`readiness`])
//! - which tasks can start, what is the critical path, what did a
//!   completion unblock ([`tasks`])
//!
//! [`Workflow`] ties these together into request-scoped operations.
//!
//! # Example
//!
//! ```
//! use specgraph::tasks::{TaskGraph, TaskRecord};
//! use specgraph::identity::EntityIdentity;
//! use specgraph::domain::{ObjectId, TaskStatus};
//!
//! let task = |id: &str, points| TaskRecord {
//!     identity: EntityIdentity { key: ObjectId::new(id), version: None },
//!     number: id.to_string(),
//!     description: String::new(),
//!     task_type: None,
//!     status: Some(TaskStatus::Pending),
//!     complexity_points: points,
//!     started_at: None,
//!     tags: vec![],
//! };
//!
//! let mut graph = TaskGraph::new(vec![task("1", 2), task("2", 3), task("3", 5)]);
//! graph.add_blocks(&ObjectId::new("1"), &ObjectId::new("2"));
//! graph.add_blocks(&ObjectId::new("2"), &ObjectId::new("3"));
//!
//! let critical = graph.critical_path().unwrap();
//! assert_eq!(critical.cost, 10);
//! assert_eq!(graph.available().len(), 1);
//! ```

#![forbid(unsafe_code)]

pub mod config;
pub mod domain;
pub mod error;
pub mod guards;
pub mod identity;
pub mod populate;
pub mod readiness;
pub mod snapshot;
pub mod tasks;
pub mod transitions;
pub mod workflow;

pub use config::{EngineConfig, TraversalBudget, TraversalConfig};
pub use error::{Error, Result};
pub use guards::{Guard, GuardContext, GuardResult, GuardSet, Outcome, Runner, Severity};
pub use snapshot::Snapshot;
pub use tasks::{CriticalPath, Progress, TaskGraph, TaskRecord, TaskSummary};
pub use workflow::{CancellationHandle, CancellationSignal, Guarded, Workflow, cancellation};
