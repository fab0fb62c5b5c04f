//! The foreign-object wrapper codec.
//!
//! Plain Rust types can be stored inside mapped documents without becoming
//! entities themselves: implementing [`Wrap`] lets a type serialize into a
//! document fragment tagged with [`CLASS_KEY`](crate::CLASS_KEY), and a
//! registration on the [`Mapper`](crate::mapper::Mapper) lets the tag resolve
//! back to the concrete type on read. Unregistered tags surface as
//! [`MapperError::UnresolvedType`] rather than partially-decoded data.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use bson::{Bson, Document, de::deserialize_from_bson, ser::serialize_to_bson};
use serde::{Serialize, de::DeserializeOwned};

use crate::error::{MapperError, MapperResult};
use crate::value::CLASS_KEY;

/// A type that can be stored inside mapped documents as a class-tagged
/// fragment.
///
/// The type must serialize to a document shape (a struct or map, not a bare
/// scalar or sequence). `TYPE_NAME` is the tag written into the fragment and
/// must be stable across program versions for stored data to remain
/// readable.
pub trait Wrap: Serialize + DeserializeOwned + Send + Sync + 'static {
    const TYPE_NAME: &'static str;
}

/// Serializes a wrappable value into its tagged fragment.
pub fn wrap<T: Wrap>(value: &T) -> MapperResult<Bson> {
    let serialized = serialize_to_bson(value)?;
    let Bson::Document(fields) = serialized else {
        return Err(MapperError::Serialization(format!(
            "wrapped type {:?} must serialize to a document",
            T::TYPE_NAME
        )));
    };

    let mut fragment = Document::new();
    fragment.insert(CLASS_KEY, T::TYPE_NAME);
    for (key, raw) in fields {
        fragment.insert(key, raw);
    }
    Ok(Bson::Document(fragment))
}

pub(crate) type UnwrapFn = fn(Document) -> MapperResult<Arc<dyn Any + Send + Sync>>;

pub(crate) fn unwrap_thunk<T: Wrap>(fields: Document) -> MapperResult<Arc<dyn Any + Send + Sync>> {
    let value: T = deserialize_from_bson(Bson::Document(fields))?;
    Ok(Arc::new(value))
}

/// A foreign object reconstructed from a class-tagged fragment.
///
/// Keeps both the live object and the original fragment, so re-assigning the
/// value writes back exactly the bytes that were read.
#[derive(Clone)]
pub struct Foreign {
    type_name: String,
    fragment: Document,
    object: Arc<dyn Any + Send + Sync>,
}

impl Foreign {
    pub(crate) fn new(
        type_name: String,
        fragment: Document,
        object: Arc<dyn Any + Send + Sync>,
    ) -> Self {
        Foreign {
            type_name,
            fragment,
            object,
        }
    }

    /// The tag the fragment was stored under.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn downcast_ref<T: Wrap>(&self) -> Option<&T> {
        self.object.downcast_ref::<T>()
    }

    pub(crate) fn fragment(&self) -> &Document {
        &self.fragment
    }
}

/// Fragment equality: the live object is a cache decoded from the fragment,
/// so two foreigns are equal iff they carry the same tag and fragment.
impl PartialEq for Foreign {
    fn eq(&self, other: &Self) -> bool {
        self.type_name == other.type_name && self.fragment == other.fragment
    }
}

impl fmt::Debug for Foreign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Foreign")
            .field("type_name", &self.type_name)
            .field("fragment", &self.fragment)
            .finish()
    }
}
