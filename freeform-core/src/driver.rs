//! The storage driver boundary.
//!
//! Everything above this trait speaks in collections, documents, and dotted
//! field paths; everything below it is a concrete store. Drivers are
//! synchronous and must be shareable across entity clones, so implementations
//! carry their own interior locking.

use std::fmt::Debug;

use bson::{Document, oid::ObjectId};

use crate::{
    error::{MapperError, MapperResult},
    query::FindSpec,
};

/// Index ordering, parsed strictly: only the tokens `"asc"` and `"desc"` are
/// accepted. This is deliberately narrower than query sorting, which is
/// forgiving; a typo in an index definition should fail loudly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexDirection {
    Ascending,
    Descending,
}

impl IndexDirection {
    pub fn parse(token: &str) -> MapperResult<Self> {
        match token {
            "asc" => Ok(IndexDirection::Ascending),
            "desc" => Ok(IndexDirection::Descending),
            other => Err(MapperError::IndexDirection(other.to_string())),
        }
    }
}

/// A synchronous document store.
///
/// Documents returned by `find` and `find_by_id` carry their identifier under
/// `"_id"` as an `ObjectId`. Dotted keys in the `sets` argument of
/// `set_fields` address nested fields, with numeric segments indexing into
/// arrays and padding them with nulls when writing past the end.
pub trait Driver: Send + Sync + Debug {
    /// Inserts a document, minting and returning its identifier.
    fn insert(&self, collection: &str, document: Document) -> MapperResult<ObjectId>;

    /// Runs a find, honoring the spec's filter, sort, skip, limit, and
    /// projection.
    fn find(&self, collection: &str, spec: &FindSpec) -> MapperResult<Vec<Document>>;

    fn find_by_id(&self, collection: &str, id: &ObjectId) -> MapperResult<Option<Document>>;

    /// Applies path-qualified field writes to one document. A missing
    /// document is a silent no-op.
    fn set_fields(&self, collection: &str, id: &ObjectId, sets: Document) -> MapperResult<()>;

    /// Adds `amount` to an integer field, treating a missing field as zero,
    /// and returns the new value.
    fn increment(
        &self,
        collection: &str,
        id: &ObjectId,
        field: &str,
        amount: i64,
    ) -> MapperResult<i64>;

    /// Deletes one document. Idempotent.
    fn delete(&self, collection: &str, id: &ObjectId) -> MapperResult<()>;

    fn count(&self, collection: &str, filter: &Document) -> MapperResult<u64>;

    fn create_index(
        &self,
        collection: &str,
        field: &str,
        direction: IndexDirection,
    ) -> MapperResult<()>;

    /// Drops a whole collection. Idempotent.
    fn drop_collection(&self, collection: &str) -> MapperResult<()>;
}

/// Builds a configured driver, typically from a
/// [`ConnectionConfig`](crate::config::ConnectionConfig).
pub trait DriverBuilder {
    type Driver: Driver;

    fn build(self) -> MapperResult<Self::Driver>;
}
