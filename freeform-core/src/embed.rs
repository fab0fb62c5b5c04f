//! Embedded containers.
//!
//! Sub-documents and arrays inside an entity are not detached copies: reading
//! one yields a live handle bound to the owning root entity by a dotted path.
//! Mutating the handle issues a granular, path-qualified write against the
//! root's backing document, so sibling fields at every level are untouched.
//! Containers nest to any depth; a handle three levels down still writes
//! through the same root.

use bson::{Bson, Document};

use crate::{
    entity::Entity,
    error::MapperResult,
    value::{self, EMBED_KEY, Value, is_meta_key},
};

/// A keyed container at a path inside a root entity's document.
#[derive(Clone, Debug, PartialEq)]
pub struct EmbeddedDoc {
    root: Entity,
    path: String,
}

impl EmbeddedDoc {
    pub(crate) fn new(root: Entity, path: String) -> Self {
        EmbeddedDoc { root, path }
    }

    /// The dotted path from the root entity to this container.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The embedded kind tag, when this container was stored by embedding an
    /// entity of that kind.
    pub fn kind(&self) -> Option<String> {
        self.root.with_fields(|fields| {
            match value::get_path(fields, &self.qualify(EMBED_KEY)) {
                Some(Bson::String(kind)) => Some(kind.clone()),
                _ => None,
            }
        })
    }

    pub fn get(&self, field: &str) -> MapperResult<Option<Value>> {
        if is_meta_key(field) {
            return Ok(None);
        }
        let child = self.qualify(field);
        let raw = self
            .root
            .with_fields(|fields| value::get_path(fields, &child).cloned());
        match raw {
            Some(raw) => Value::decode(&self.root, child, &raw).map(Some),
            None => Ok(None),
        }
    }

    /// Writes one field of this container through the owning root.
    pub fn set(&self, field: &str, value: impl Into<Value>) -> MapperResult<()> {
        let encoded = value.into().encode()?;
        self.root.write_path(&self.qualify(field), encoded)
    }

    pub fn keys(&self) -> Vec<String> {
        self.root.with_fields(|fields| {
            match value::get_path(fields, &self.path) {
                Some(Bson::Document(doc)) => doc
                    .keys()
                    .filter(|key| !is_meta_key(key))
                    .cloned()
                    .collect(),
                _ => Vec::new(),
            }
        })
    }

    pub fn values(&self) -> MapperResult<Vec<Value>> {
        self.keys()
            .into_iter()
            .map(|key| {
                let child = self.qualify(&key);
                let raw = self
                    .root
                    .with_fields(|fields| value::get_path(fields, &child).cloned());
                // keys() just saw the field, but the root is shared
                match raw {
                    Some(raw) => Value::decode(&self.root, child, &raw),
                    None => Ok(Value::Scalar(Bson::Null)),
                }
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.keys().len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys().is_empty()
    }

    /// Exports the container as a plain document, metadata keys included so
    /// the export re-embeds faithfully.
    pub(crate) fn snapshot(&self) -> Document {
        self.root.with_fields(|fields| {
            match value::get_path(fields, &self.path) {
                Some(Bson::Document(doc)) => doc.clone(),
                _ => Document::new(),
            }
        })
    }

    fn qualify(&self, field: &str) -> String {
        format!("{}.{}", self.path, field)
    }
}

/// An ordered container at a path inside a root entity's document.
#[derive(Clone, Debug, PartialEq)]
pub struct EmbeddedList {
    root: Entity,
    path: String,
}

impl EmbeddedList {
    pub(crate) fn new(root: Entity, path: String) -> Self {
        EmbeddedList { root, path }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.root.with_fields(|fields| {
            match value::get_path(fields, &self.path) {
                Some(Bson::Array(items)) => items.len(),
                _ => 0,
            }
        })
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> MapperResult<Option<Value>> {
        let child = format!("{}.{}", self.path, index);
        let raw = self
            .root
            .with_fields(|fields| value::get_path(fields, &child).cloned());
        match raw {
            Some(raw) => Value::decode(&self.root, child, &raw).map(Some),
            None => Ok(None),
        }
    }

    /// Writes the element at `index` through the owning root. Writing past
    /// the end pads the stored array with nulls.
    pub fn set(&self, index: usize, value: impl Into<Value>) -> MapperResult<()> {
        let encoded = value.into().encode()?;
        self.root
            .write_path(&format!("{}.{}", self.path, index), encoded)
    }

    /// Appends an element, returning its index.
    pub fn push(&self, value: impl Into<Value>) -> MapperResult<usize> {
        let index = self.len();
        self.set(index, value)?;
        Ok(index)
    }

    pub fn values(&self) -> MapperResult<Vec<Value>> {
        (0..self.len())
            .map(|index| {
                self.get(index)
                    .map(|value| value.unwrap_or(Value::Scalar(Bson::Null)))
            })
            .collect()
    }

    pub(crate) fn snapshot(&self) -> Vec<Bson> {
        self.root.with_fields(|fields| {
            match value::get_path(fields, &self.path) {
                Some(Bson::Array(items)) => items.clone(),
                _ => Vec::new(),
            }
        })
    }
}
