//! The graph-store contract.
//!
//! The engine never owns data. Everything it reasons about is fetched through
//! [`GraphStore`] as a point-in-time snapshot, and every mutation it performs
//! is a single call on the same trait. The trait is object-safe so callers
//! can hold an `Arc<dyn GraphStore>` and swap the remote client for the
//! in-memory reference store in tests.

use crate::error::Result;
use crate::types::{
    ExpandRequest, ExpandResponse, GraphObject, ListObjectsOptions, ListRelationshipsOptions,
    NewObject, ObjectEdges, ObjectId, Properties, Relationship,
};
use async_trait::async_trait;

/// Versioned graph-store client.
///
/// # Method Categories
///
/// - **Traversal**: `expand`
/// - **Reads**: `get_object`, `get_objects`, `list_objects`, `count_objects`,
///   `list_relationships`, `get_object_edges`
/// - **Writes**: `create_object`, `update_object`, `create_relationship`
///
/// # Identity
///
/// Every method taking an [`ObjectId`] accepts either the version-specific or
/// the canonical variant. Returned edge endpoints may use either variant, and
/// callers must not assume which.
///
/// # Errors
///
/// All methods return [`StoreError`](crate::StoreError):
/// - `NotFound`: a referenced object does not exist
/// - `InvalidRequest`: the request itself was malformed
/// - `Unavailable`: the store could not answer
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`. There is no optimistic locking:
/// concurrent writers race and the last write wins.
#[async_trait]
pub trait GraphStore: Send + Sync {
    // ========== Traversal ==========

    /// Bounded breadth-first traversal from `request.root_ids`.
    ///
    /// Budgets are hard caps. Hitting one returns a partial result with
    /// `truncated` set and no error.
    async fn expand(&self, request: &ExpandRequest) -> Result<ExpandResponse>;

    // ========== Reads ==========

    /// Fetch one object by either identity variant.
    ///
    /// Returns the current version of the object.
    async fn get_object(&self, id: &ObjectId) -> Result<GraphObject>;

    /// Fetch several objects. IDs that do not resolve are skipped.
    async fn get_objects(&self, ids: &[ObjectId]) -> Result<Vec<GraphObject>>;

    /// List objects matching the given options.
    async fn list_objects(&self, options: &ListObjectsOptions) -> Result<Vec<GraphObject>>;

    /// Count objects of a type.
    async fn count_objects(&self, object_type: &str) -> Result<usize>;

    /// List relationships matching the given options.
    async fn list_relationships(
        &self,
        options: &ListRelationshipsOptions,
    ) -> Result<Vec<Relationship>>;

    /// Relationships entering and leaving an object.
    async fn get_object_edges(&self, id: &ObjectId) -> Result<ObjectEdges>;

    // ========== Writes ==========

    /// Create an object. The new object's version and canonical IDs differ.
    async fn create_object(&self, new_object: NewObject) -> Result<GraphObject>;

    /// Merge `properties` into an object, producing a new version.
    ///
    /// A `null` value removes the property. The canonical ID is unchanged;
    /// the returned object carries the new version ID.
    async fn update_object(&self, id: &ObjectId, properties: Properties) -> Result<GraphObject>;

    /// Create a typed relationship from `src_id` to `dst_id`.
    async fn create_relationship(
        &self,
        rel_type: &str,
        src_id: &ObjectId,
        dst_id: &ObjectId,
        properties: Properties,
    ) -> Result<Relationship>;
}
