//! Core abstractions for a schemaless document-object mapper.
//!
//! The pieces fit together like this: a [`mapper::Mapper`] owns a
//! [`driver::Driver`] plus the binding and wrapper registries; it hands out
//! [`collection::Collection`] handles, which create and find
//! [`entity::Entity`] values; field access moves through [`value::Value`],
//! which surfaces nested structure as live [`embed::EmbeddedDoc`] and
//! [`embed::EmbeddedList`] handles writing back through their root.
//!
//! Storage backends live in separate crates implementing [`driver::Driver`].

pub mod collection;
pub mod config;
pub mod driver;
pub mod embed;
pub mod entity;
pub mod error;
pub mod mapper;
pub mod query;
pub mod value;
pub mod wrap;

pub use collection::Collection;
pub use config::ConnectionConfig;
pub use driver::{Driver, DriverBuilder, IndexDirection};
pub use embed::{EmbeddedDoc, EmbeddedList};
pub use entity::Entity;
pub use error::{MapperError, MapperResult};
pub use mapper::Mapper;
pub use query::{Cursor, FindSpec, Query, SortDirection, SortSpec};
pub use value::{CLASS_KEY, EMBED_KEY, Value};
pub use wrap::{Foreign, Wrap, wrap};
