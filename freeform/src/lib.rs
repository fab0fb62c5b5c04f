//! A schemaless document-object mapper.
//!
//! This crate is the primary entry point for users of the freeform mapper.
//! It re-exports the core modules and provides convenient access to storage
//! drivers.
//!
//! # Features
//!
//! - **No schema** - Any field can be read or written on any entity at any time
//! - **Lazy inserts, eager writes** - Nothing is stored until the first field is
//!   set; after that every write goes straight to the store, touching only the
//!   field that changed
//! - **Live embedding** - Nested documents and arrays are handles that write
//!   through their root, to any depth
//! - **Foreign objects** - Plain Serde types store as class-tagged fragments and
//!   come back as themselves
//!
//! # Quick Start
//!
//! ```ignore
//! use freeform::{prelude::*, memory::MemoryDriver};
//!
//! fn main() -> MapperResult<()> {
//!     let mapper = Mapper::new(MemoryDriver::new());
//!     let notes = mapper.collection("Note");
//!
//!     // Nothing hits the store yet.
//!     let note = notes.create();
//!     assert!(note.id().is_none());
//!
//!     // The first write inserts; every later write is a one-field update.
//!     note.set("title", "groceries")?;
//!     note.set("pinned", true)?;
//!
//!     let found = notes.query().filter("title", "groceries").first()?;
//!     assert_eq!(found.as_ref(), Some(&note));
//!     Ok(())
//! }
//! ```
//!
//! # Drivers
//!
//! - [`memory`] - Fast in-process storage for development and testing

pub mod prelude;

pub use freeform_core::{
    collection, config, driver, embed, entity, error, mapper, query, value, wrap,
};

// Re-export BSON types for convenience
pub use bson;

/// In-memory storage driver implementations.
#[cfg(feature = "memory")]
pub mod memory {
    pub use freeform_memory::{MemoryDriver, MemoryDriverBuilder};
}
