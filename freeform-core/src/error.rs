//! Error types and result types for mapper operations.
//!
//! Missing fields and not-found lookups are never errors; they surface as
//! `None`. Use [`MapperResult<T>`] as the return type for fallible operations.

use bson::error::Error as BsonError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Represents all possible errors raised by the mapping layer.
///
/// Store-driver failures outside this taxonomy (network, auth, constraint)
/// are carried through unmodified in the `Driver` variant; the mapper never
/// retries or suppresses them.
#[derive(Error, Debug)]
pub enum MapperError {
    /// A connection or configuration setter received an unusable value.
    #[error("Connection error: {0}")]
    Connection(String),
    /// An index declaration received a direction outside the two recognized tokens.
    #[error("Index direction should be \"asc\" or \"desc\", got {0:?}")]
    IndexDirection(String),
    /// A wrapped fragment names a type that has not been registered.
    #[error("Cannot resolve wrapped type {0:?}")]
    UnresolvedType(String),
    /// An operation that requires a persisted entity was called on an unsaved one.
    #[error("Entity of kind {0:?} has no identifier yet")]
    MissingIdentifier(String),
    /// Value encoding exceeded the nesting limit; the graph is cyclic or degenerate.
    #[error("Nested value exceeds the maximum encoding depth of {0}")]
    DepthExceeded(usize),
    /// Serialization/deserialization error when converting between document formats.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// An error propagated from the underlying store driver.
    #[error("Driver error: {0}")]
    Driver(String),
}

/// A specialized `Result` type for mapper operations.
pub type MapperResult<T> = Result<T, MapperError>;

impl From<BsonError> for MapperError {
    fn from(err: BsonError) -> Self {
        MapperError::Serialization(err.to_string())
    }
}

impl From<SerdeJsonError> for MapperError {
    fn from(err: SerdeJsonError) -> Self {
        MapperError::Serialization(err.to_string())
    }
}
