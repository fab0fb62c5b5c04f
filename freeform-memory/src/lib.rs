//! An in-memory storage driver for the freeform mapper.
//!
//! Useful for tests and for code that wants mapper semantics without an
//! external store. Behavior mirrors what a real document store would do:
//! path-qualified field updates, null-padded array writes, insertion-order
//! results, and operator-document filters.

mod evaluator;
mod store;

pub use store::{MemoryDriver, MemoryDriverBuilder};
