//! The tagged value model shared by entities, embedded containers, and the
//! wrapper codec.
//!
//! Every field read or write moves through [`Value`]. Encoding turns a value
//! into the BSON that lands in the store; decoding inspects the shape of a
//! stored BSON value and dispatches on the reserved metadata keys: a document
//! carrying [`CLASS_KEY`] is a wrapped foreign-object fragment, any other
//! document is an embedded keyed container (class-aware when it carries
//! [`EMBED_KEY`]), an array is an embedded ordered container, and everything
//! else is a store-native scalar passed through untouched.

use bson::{Bson, Document, oid::ObjectId};

use crate::{
    embed::{EmbeddedDoc, EmbeddedList},
    entity::Entity,
    error::{MapperError, MapperResult},
    wrap::Foreign,
};

/// Reserved key tagging a wrapped foreign-object fragment with its type name.
///
/// The metadata keys use moderately obscure Unicode symbols to reduce the odds
/// of colliding with user field names. If you somehow have single-character
/// keys from the 'CIRCLED LATIN SMALL LETTER' set in your collections, change
/// these constants and stay consistent about it.
pub const CLASS_KEY: &str = "ⓒ";

/// Reserved key tagging an embedded entity sub-document with its kind.
pub const EMBED_KEY: &str = "ⓔ";

/// Nesting limit for value encoding. The embedding and wrapping protocols
/// assume acyclic graphs; anything deeper than this is rejected.
pub(crate) const MAX_DEPTH: usize = 64;

pub(crate) fn is_meta_key(key: &str) -> bool {
    key == "_id" || key == CLASS_KEY || key == EMBED_KEY
}

/// A field value as seen through the dynamic attribute interface.
///
/// The `Scalar`, `Doc`, `List`, and `Object` variants are produced by
/// decoding; `Entity` and `Array` exist on the encode side so callers can
/// assign mapped entities and heterogeneous list literals directly.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// A store-native scalar, or a raw document/array passed through as-is.
    Scalar(Bson),
    /// A mapped entity assigned as a field value; embeds as a kind-tagged
    /// sub-document with its identifier stripped.
    Entity(Entity),
    /// A live keyed container bound to a root entity by path.
    Doc(EmbeddedDoc),
    /// A live ordered container bound to a root entity by path.
    List(EmbeddedList),
    /// A list literal of further values.
    Array(Vec<Value>),
    /// A reconstructed foreign object; re-encodes as its original fragment.
    Object(Foreign),
}

impl Value {
    /// Wraps a foreign object through the codec, producing a value that
    /// stores as a class-tagged fragment.
    pub fn object<T: crate::wrap::Wrap>(value: &T) -> MapperResult<Value> {
        Ok(Value::Scalar(crate::wrap::wrap(value)?))
    }

    pub(crate) fn encode(&self) -> MapperResult<Bson> {
        self.encode_at(0)
    }

    fn encode_at(&self, depth: usize) -> MapperResult<Bson> {
        if depth > MAX_DEPTH {
            return Err(MapperError::DepthExceeded(MAX_DEPTH));
        }

        match self {
            Value::Scalar(raw) => Ok(raw.clone()),
            Value::Entity(entity) => Ok(Bson::Document(entity.embed_document())),
            Value::Doc(embedded) => Ok(Bson::Document(embedded.snapshot())),
            Value::List(embedded) => Ok(Bson::Array(embedded.snapshot())),
            Value::Array(items) => Ok(Bson::Array(
                items
                    .iter()
                    .map(|item| item.encode_at(depth + 1))
                    .collect::<MapperResult<Vec<Bson>>>()?,
            )),
            Value::Object(foreign) => Ok(Bson::Document(foreign.fragment().clone())),
        }
    }

    /// Decodes a raw stored value found at `path` under `root`.
    pub(crate) fn decode(root: &Entity, path: String, raw: &Bson) -> MapperResult<Value> {
        match raw {
            Bson::Document(doc) if doc.contains_key(CLASS_KEY) => {
                Ok(Value::Object(root.mapper().unwrap_fragment(doc)?))
            }
            Bson::Document(_) => Ok(Value::Doc(EmbeddedDoc::new(root.clone(), path))),
            Bson::Array(_) => Ok(Value::List(EmbeddedList::new(root.clone(), path))),
            other => Ok(Value::Scalar(other.clone())),
        }
    }

    pub fn as_scalar(&self) -> Option<&Bson> {
        match self {
            Value::Scalar(raw) => Some(raw),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self.as_scalar() {
            Some(Bson::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self.as_scalar() {
            Some(Bson::Int32(n)) => Some(*n as i64),
            Some(Bson::Int64(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self.as_scalar() {
            Some(Bson::Double(n)) => Some(*n),
            Some(Bson::Int32(n)) => Some(*n as f64),
            Some(Bson::Int64(n)) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.as_scalar() {
            Some(Bson::Boolean(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn as_doc(&self) -> Option<&EmbeddedDoc> {
        match self {
            Value::Doc(embedded) => Some(embedded),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&EmbeddedList> {
        match self {
            Value::List(embedded) => Some(embedded),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Foreign> {
        match self {
            Value::Object(foreign) => Some(foreign),
            _ => None,
        }
    }

    /// Downcasts a reconstructed foreign object to its concrete type.
    pub fn downcast_ref<T: crate::wrap::Wrap>(&self) -> Option<&T> {
        self.as_object()?.downcast_ref::<T>()
    }
}

impl From<Bson> for Value {
    fn from(raw: Bson) -> Self {
        Value::Scalar(raw)
    }
}

impl From<Entity> for Value {
    fn from(entity: Entity) -> Self {
        Value::Entity(entity)
    }
}

impl From<EmbeddedDoc> for Value {
    fn from(embedded: EmbeddedDoc) -> Self {
        Value::Doc(embedded)
    }
}

impl From<EmbeddedList> for Value {
    fn from(embedded: EmbeddedList) -> Self {
        Value::List(embedded)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<Foreign> for Value {
    fn from(foreign: Foreign) -> Self {
        Value::Object(foreign)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Scalar(Bson::String(value.to_string()))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Scalar(Bson::String(value))
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Scalar(Bson::Int32(value))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Scalar(Bson::Int64(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Scalar(Bson::Double(value))
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Scalar(Bson::Boolean(value))
    }
}

impl From<ObjectId> for Value {
    fn from(value: ObjectId) -> Self {
        Value::Scalar(Bson::ObjectId(value))
    }
}

impl From<bson::DateTime> for Value {
    fn from(value: bson::DateTime) -> Self {
        Value::Scalar(Bson::DateTime(value))
    }
}

impl From<chrono::DateTime<chrono::Utc>> for Value {
    fn from(value: chrono::DateTime<chrono::Utc>) -> Self {
        Value::Scalar(Bson::DateTime(bson::DateTime::from_chrono(value)))
    }
}

impl From<Document> for Value {
    fn from(value: Document) -> Self {
        Value::Scalar(Bson::Document(value))
    }
}

/// Reads the value at a dotted path, with numeric segments indexing arrays.
pub fn get_path<'a>(doc: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut segments = path.split('.');
    let mut current = doc.get(segments.next()?)?;

    for segment in segments {
        current = match current {
            Bson::Document(inner) => inner.get(segment)?,
            Bson::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }

    Some(current)
}

/// Writes `value` at a dotted path, creating intermediate documents as
/// needed. Numeric segments address arrays, padding with `Null` up to the
/// target index the way the store's own nested-path `$set` does.
pub fn set_path(doc: &mut Document, path: &str, value: Bson) {
    match path.split_once('.') {
        None => {
            doc.insert(path, value);
        }
        Some((head, rest)) => {
            if !matches!(doc.get(head), Some(Bson::Document(_)) | Some(Bson::Array(_))) {
                doc.insert(head, empty_container_for(rest));
            }
            match doc.get_mut(head) {
                Some(Bson::Document(inner)) => set_path(inner, rest, value),
                Some(Bson::Array(items)) => set_path_in_array(items, rest, value),
                _ => {}
            }
        }
    }
}

fn set_path_in_array(items: &mut Vec<Bson>, path: &str, value: Bson) {
    let (head, rest) = match path.split_once('.') {
        Some((head, rest)) => (head, Some(rest)),
        None => (path, None),
    };
    let Ok(index) = head.parse::<usize>() else {
        return;
    };
    if items.len() <= index {
        items.resize(index + 1, Bson::Null);
    }

    match rest {
        None => items[index] = value,
        Some(rest) => {
            if !matches!(items[index], Bson::Document(_) | Bson::Array(_)) {
                items[index] = empty_container_for(rest);
            }
            match &mut items[index] {
                Bson::Document(inner) => set_path(inner, rest, value),
                Bson::Array(inner) => set_path_in_array(inner, rest, value),
                _ => {}
            }
        }
    }
}

fn empty_container_for(rest: &str) -> Bson {
    let next_is_index = rest
        .split('.')
        .next()
        .map(|segment| segment.parse::<usize>().is_ok())
        .unwrap_or(false);

    if next_is_index {
        Bson::Array(Vec::new())
    } else {
        Bson::Document(Document::new())
    }
}
