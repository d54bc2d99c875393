//! In-memory graph store with versioned identities.
//!
//! This store is **ephemeral**: all data lives in RAM and is lost when the
//! value is dropped. It exists so the engine can be exercised end to end
//! without a remote store, and it reproduces the remote store's identity
//! behavior faithfully:
//!
//! - every object has a canonical ID and a current version ID, and every
//!   update mints a new version ID
//! - every method accepts either variant (including superseded versions)
//! - relationships remember which variant the caller used for each endpoint
//!   and render it back that way, so traversal results mix variants
//! - `expand` honours depth, node and edge budgets and truncates silently
//!
//! # Architecture
//!
//! - `HashMap<ObjectId, StoredObject>` keyed by canonical ID
//! - `HashMap<ObjectId, ObjectId>` from every issued version ID to its canonical ID
//! - `Vec<StoredRelationship>` in creation order, endpoints stored canonically
//! - [`IdGenerator`](crate::id_generation::IdGenerator) for all IDs
//!
//! # Thread Safety
//!
//! The inner store sits behind `Arc<Mutex<>>` (tokio). Every operation takes
//! the lock once, so each call is atomic with respect to other calls.

mod expand;
mod inner;
mod trait_impl;

use inner::InMemoryStoreInner;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Thread-safe in-memory graph store.
///
/// Cloning is cheap and clones share the same data.
#[derive(Clone)]
pub struct InMemoryGraphStore {
    inner: Arc<Mutex<InMemoryStoreInner>>,
}

impl InMemoryGraphStore {
    /// Create an empty store whose IDs start with `prefix`.
    ///
    /// # Example
    ///
    /// ```
    /// use specgraph_store::InMemoryGraphStore;
    ///
    /// let store = InMemoryGraphStore::new("sg");
    /// ```
    pub fn new(prefix: &str) -> Self {
        Self {
            inner: Arc::new(Mutex::new(InMemoryStoreInner::new(prefix))),
        }
    }

    /// Number of objects currently stored.
    pub async fn object_count(&self) -> usize {
        self.inner.lock().await.objects.len()
    }

    /// Number of relationships currently stored.
    pub async fn relationship_count(&self) -> usize {
        self.inner.lock().await.relationships.len()
    }
}

impl std::fmt::Debug for InMemoryGraphStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryGraphStore").finish_non_exhaustive()
    }
}
