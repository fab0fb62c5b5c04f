//! The mapper: driver handle plus the binding and wrapper registries.
//!
//! A [`Mapper`] is a cheaply-cloneable handle; every clone shares the same
//! driver, kind-to-collection bindings, and wrapped-type registrations.
//! Entities and collections hold a clone, which is how a write deep inside an
//! embedded container finds its way to the store.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard};

use bson::Document;
use tracing::info;

use crate::{
    collection::Collection,
    driver::Driver,
    error::{MapperError, MapperResult},
    value::CLASS_KEY,
    wrap::{Foreign, UnwrapFn, Wrap, unwrap_thunk},
};

#[derive(Clone, Debug)]
struct Binding {
    collection: String,
    hydrate_as: String,
}

#[derive(Debug)]
struct MapperInner {
    driver: RwLock<Box<dyn Driver>>,
    bindings: RwLock<HashMap<String, Binding>>,
    wraps: RwLock<HashMap<&'static str, UnwrapFn>>,
}

#[derive(Clone, Debug)]
pub struct Mapper {
    inner: Arc<MapperInner>,
}

impl Mapper {
    pub fn new(driver: impl Driver + 'static) -> Self {
        Mapper {
            inner: Arc::new(MapperInner {
                driver: RwLock::new(Box::new(driver)),
                bindings: RwLock::new(HashMap::new()),
                wraps: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Swaps the driver out from under every existing handle. Bindings and
    /// wrapped-type registrations survive the swap.
    pub fn connect(&self, driver: impl Driver + 'static) {
        info!("switching storage driver");
        *self
            .inner
            .driver
            .write()
            .expect("driver lock poisoned") = Box::new(driver);
    }

    /// Resolves the collection handle for a kind. Unbound kinds fall through
    /// to a collection of the same name, hydrating as themselves.
    pub fn collection(&self, kind: &str) -> Collection {
        let binding = self
            .inner
            .bindings
            .read()
            .expect("binding lock poisoned")
            .get(kind)
            .cloned()
            .unwrap_or_else(|| Binding {
                collection: kind.to_string(),
                hydrate_as: kind.to_string(),
            });
        Collection::resolve(
            self.clone(),
            kind.to_string(),
            binding.collection,
            binding.hydrate_as,
        )
    }

    /// Binds a kind to a collection. Results found through the bound kind
    /// hydrate as `hydrate_as` when given, otherwise as the kind itself, so
    /// several kinds can share one collection while reading back under one
    /// canonical kind.
    pub fn collects(&self, kind: &str, collection: &str, hydrate_as: Option<&str>) {
        self.inner
            .bindings
            .write()
            .expect("binding lock poisoned")
            .insert(
                kind.to_string(),
                Binding {
                    collection: collection.to_string(),
                    hydrate_as: hydrate_as.unwrap_or(kind).to_string(),
                },
            );
    }

    /// Registers a wrappable type so stored fragments tagged with its
    /// `TYPE_NAME` can be reconstructed on read.
    pub fn register_wrap<T: Wrap>(&self) {
        self.inner
            .wraps
            .write()
            .expect("wrap lock poisoned")
            .insert(T::TYPE_NAME, unwrap_thunk::<T>);
    }

    /// Clears bindings and wrapped-type registrations. The driver and its
    /// data are untouched.
    pub fn reset(&self) {
        self.inner
            .bindings
            .write()
            .expect("binding lock poisoned")
            .clear();
        self.inner
            .wraps
            .write()
            .expect("wrap lock poisoned")
            .clear();
    }

    pub(crate) fn driver(&self) -> RwLockReadGuard<'_, Box<dyn Driver>> {
        self.inner.driver.read().expect("driver lock poisoned")
    }

    /// Reconstructs a class-tagged fragment through the wrapper registry.
    pub(crate) fn unwrap_fragment(&self, fragment: &Document) -> MapperResult<Foreign> {
        let type_name = match fragment.get(CLASS_KEY) {
            Some(bson::Bson::String(name)) => name.clone(),
            _ => {
                return Err(MapperError::Serialization(
                    "wrapped fragment has a non-string class tag".to_string(),
                ));
            }
        };
        let thunk = self
            .inner
            .wraps
            .read()
            .expect("wrap lock poisoned")
            .get(type_name.as_str())
            .copied()
            .ok_or_else(|| MapperError::UnresolvedType(type_name.clone()))?;

        let mut fields = fragment.clone();
        fields.remove(CLASS_KEY);
        let object = thunk(fields)?;
        Ok(Foreign::new(type_name, fragment.clone(), object))
    }
}
