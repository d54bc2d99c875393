//! Versioned graph-store contract for specgraph.
//!
//! This crate defines what the engine needs from an external graph store:
//! the wire types ([`GraphObject`], [`ExpandRequest`], [`ExpandResponse`], ...)
//! and the object-safe [`GraphStore`] trait. It also ships
//! [`InMemoryGraphStore`], a reference store that mimics the remote store's
//! dual identity model closely enough to exercise the engine end to end.
//!
//! # Example
//!
//! ```
//! use specgraph_store::{GraphStore, InMemoryGraphStore, NewObject};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let store = InMemoryGraphStore::new("sg");
//!
//!     let change = store
//!         .create_object(NewObject::new("Change").with_property("name", "add-login"))
//!         .await?;
//!     let updated = store
//!         .update_object(&change.canonical_id, Default::default())
//!         .await?;
//!
//!     assert_eq!(change.canonical_id, updated.canonical_id);
//!     assert_ne!(change.id, updated.id);
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod id_generation;
pub mod in_memory;
pub mod store;
pub mod types;

pub use error::{Result, StoreError};
pub use in_memory::InMemoryGraphStore;
pub use store::GraphStore;
pub use types::{
    Direction, ExpandEdge, ExpandRequest, ExpandResponse, GraphObject, ListObjectsOptions,
    ListRelationshipsOptions, NewObject, ObjectEdges, ObjectId, Properties, Relationship,
};
