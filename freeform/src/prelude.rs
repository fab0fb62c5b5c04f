//! Convenient re-exports of commonly used types from freeform.
//!
//! ```ignore
//! use freeform::prelude::*;
//! ```

pub use freeform_core::{
    collection::Collection,
    config::{ConnectionConfig, ConnectionConfigBuilder},
    driver::{Driver, DriverBuilder, IndexDirection},
    embed::{EmbeddedDoc, EmbeddedList},
    entity::Entity,
    error::{MapperError, MapperResult},
    mapper::Mapper,
    query::{Cursor, FindSpec, Query, SortDirection, SortSpec},
    value::{CLASS_KEY, EMBED_KEY, Value},
    wrap::{Foreign, Wrap, wrap},
};
