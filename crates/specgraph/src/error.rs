//! Error types for specgraph operations.
//!
//! Only upstream failures and invalid requests are errors. Policy findings
//! (a failed guard, an unready child, a blocked task) are reported as data in
//! the operation's result.

use crate::domain::ObjectId;
use std::io;
use thiserror::Error;

/// The error type for specgraph operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The graph store failed or could not find a referenced object.
    #[error("Store error: {0}")]
    Store(#[from] specgraph_store::StoreError),

    /// An object had a different entity type than the operation needs.
    #[error("Object {id} is a {actual}, expected {expected}")]
    UnexpectedType {
        /// The object that was fetched
        id: ObjectId,
        /// What the operation needed
        expected: String,
        /// What the store returned
        actual: String,
    },

    /// A request argument was rejected before touching the store.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A status change that the state machine does not allow.
    #[error("Invalid status transition from '{from}' to '{to}'")]
    InvalidTransition {
        /// Current status
        from: String,
        /// Requested status
        to: String,
    },

    /// The entity already has the requested status.
    #[error("{id} is already {status}")]
    AlreadyInState {
        /// The entity
        id: ObjectId,
        /// Its current status
        status: String,
    },

    /// The `blocks` graph contains a cycle.
    #[error("Dependency cycle between tasks: {}", format_cycle(.task_ids))]
    DependencyCycle {
        /// The tasks on the cycle, in order
        task_ids: Vec<String>,
    },

    /// A batch operation was cancelled part-way through.
    ///
    /// Work already applied stays in the store.
    #[error(
        "Cancelled after creating {created_objects} objects and \
         {created_relationships} relationships"
    )]
    Cancelled {
        /// Objects created before cancellation
        created_objects: usize,
        /// Relationships created before cancellation
        created_relationships: usize,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error occurred.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

fn format_cycle(task_ids: &[String]) -> String {
    task_ids.join(" -> ")
}

/// A specialized Result type for specgraph operations.
pub type Result<T> = std::result::Result<T, Error>;
