//! Dynamic attribute entities.
//!
//! An [`Entity`] is a handle on one document in one collection. It carries no
//! schema: any field name can be read or written at any time. Writes are
//! eager and granular, touching only the field that changed; the first write
//! to an entity that has never been saved performs the insert that mints its
//! identifier. Reads are served from the in-memory field cache, which is
//! refreshed wholesale only on request.
//!
//! Clones of an entity share state, so a write through one clone is visible
//! through the others.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use bson::{Bson, Document, oid::ObjectId};
use tracing::debug;

use crate::{
    collection::Collection,
    error::{MapperError, MapperResult},
    mapper::Mapper,
    value::{self, EMBED_KEY, Value, is_meta_key},
};

#[derive(Debug)]
struct EntityState {
    id: Option<ObjectId>,
    fields: Document,
}

/// A single schemaless document, addressed by kind and identifier.
#[derive(Clone, Debug)]
pub struct Entity {
    mapper: Mapper,
    kind: String,
    collection: String,
    state: Arc<RwLock<EntityState>>,
}

impl Entity {
    pub(crate) fn unsaved(collection: &Collection) -> Self {
        Entity {
            mapper: collection.mapper().clone(),
            kind: collection.hydrate_as().to_string(),
            collection: collection.name().to_string(),
            state: Arc::new(RwLock::new(EntityState {
                id: None,
                fields: Document::new(),
            })),
        }
    }

    pub(crate) fn persisted(collection: &Collection, id: ObjectId, fields: Document) -> Self {
        Entity {
            mapper: collection.mapper().clone(),
            kind: collection.hydrate_as().to_string(),
            collection: collection.name().to_string(),
            state: Arc::new(RwLock::new(EntityState {
                id: Some(id),
                fields,
            })),
        }
    }

    /// The kind this entity was created or hydrated as.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// The collection backing this entity.
    pub fn collection_name(&self) -> &str {
        &self.collection
    }

    /// The store identifier, present once the first write has happened.
    pub fn id(&self) -> Option<ObjectId> {
        self.read_state().id
    }

    /// Whether the entity is backed by a stored document yet.
    pub fn is_saved(&self) -> bool {
        self.read_state().id.is_some()
    }

    /// Reads a field. Metadata keys and the identifier are not addressable
    /// here; use [`Entity::id`] and [`Entity::kind`] instead.
    pub fn get(&self, field: &str) -> MapperResult<Option<Value>> {
        if is_meta_key(field) {
            return Ok(None);
        }
        let raw = {
            let state = self.read_state();
            state.fields.get(field).cloned()
        };
        match raw {
            Some(raw) => Value::decode(self, field.to_string(), &raw).map(Some),
            None => Ok(None),
        }
    }

    /// Writes a field. The store write happens immediately; for an unsaved
    /// entity this is the insert that mints the identifier.
    pub fn set(&self, field: &str, value: impl Into<Value>) -> MapperResult<()> {
        let encoded = value.into().encode()?;
        self.write_path(field, encoded)
    }

    /// Performs one granular write at a dotted path, updating the cache only
    /// after the store write succeeds. Called with plain field names for root
    /// sets and with qualified paths by the embedded containers.
    pub(crate) fn write_path(&self, path: &str, encoded: Bson) -> MapperResult<()> {
        let mut state = self.write_state();
        match state.id {
            None => {
                let mut fields = state.fields.clone();
                value::set_path(&mut fields, path, encoded);
                let id = self
                    .mapper
                    .driver()
                    .insert(&self.collection, fields.clone())?;
                debug!(kind = %self.kind, %id, "first write inserted document");
                state.id = Some(id);
                state.fields = fields;
            }
            Some(id) => {
                let mut sets = Document::new();
                sets.insert(path, encoded.clone());
                self.mapper.driver().set_fields(&self.collection, &id, sets)?;
                value::set_path(&mut state.fields, path, encoded);
            }
        }
        Ok(())
    }

    /// Atomically increments an integer field in the store and returns the
    /// new value. The entity must have been saved.
    pub fn increment(&self, field: &str, amount: i64) -> MapperResult<i64> {
        let mut state = self.write_state();
        let id = state
            .id
            .ok_or_else(|| MapperError::MissingIdentifier(self.kind.clone()))?;
        let updated = self
            .mapper
            .driver()
            .increment(&self.collection, &id, field, amount)?;
        value::set_path(&mut state.fields, field, Bson::Int64(updated));
        Ok(updated)
    }

    /// Increments a field by one.
    pub fn incr(&self, field: &str) -> MapperResult<i64> {
        self.increment(field, 1)
    }

    /// Replaces the field cache with the document as currently stored. A
    /// no-op for unsaved entities.
    pub fn refresh(&self) -> MapperResult<()> {
        let mut state = self.write_state();
        let Some(id) = state.id else {
            return Ok(());
        };
        if let Some(mut fields) = self.mapper.driver().find_by_id(&self.collection, &id)? {
            fields.remove("_id");
            state.fields = fields;
        }
        Ok(())
    }

    /// Deletes the backing document and clears the handle. The entity reverts
    /// to unsaved; a later write would insert a fresh document.
    pub fn remove(&self) -> MapperResult<()> {
        let mut state = self.write_state();
        let Some(id) = state.id else {
            return Ok(());
        };
        self.mapper.driver().delete(&self.collection, &id)?;
        debug!(kind = %self.kind, %id, "removed document");
        state.id = None;
        state.fields = Document::new();
        Ok(())
    }

    /// The user-visible field names, excluding metadata keys.
    pub fn keys(&self) -> Vec<String> {
        self.read_state()
            .fields
            .keys()
            .filter(|key| !is_meta_key(key))
            .cloned()
            .collect()
    }

    /// The decoded values for [`Entity::keys`], in the same order.
    pub fn values(&self) -> MapperResult<Vec<Value>> {
        let pairs: Vec<(String, Bson)> = {
            let state = self.read_state();
            state
                .fields
                .iter()
                .filter(|(key, _)| !is_meta_key(key))
                .map(|(key, raw)| (key.clone(), raw.clone()))
                .collect()
        };
        pairs
            .into_iter()
            .map(|(key, raw)| Value::decode(self, key, &raw))
            .collect()
    }

    /// Exports the cached fields as a plain document, with the identifier and
    /// embedding tags stripped at every level. Class tags on wrapped
    /// fragments are kept, since the fragment is not readable without them.
    pub fn to_document(&self) -> Document {
        let fields = self.read_state().fields.clone();
        strip_embed_meta(fields)
    }

    /// Exports the cached fields as JSON.
    pub fn to_json(&self) -> MapperResult<serde_json::Value> {
        Ok(serde_json::to_value(self.to_document())?)
    }

    /// The sub-document this entity embeds as when assigned to another
    /// entity's field: its fields tagged with the kind, minus the identifier.
    pub(crate) fn embed_document(&self) -> Document {
        let mut embedded = Document::new();
        embedded.insert(EMBED_KEY, self.kind.clone());
        for (key, raw) in self.read_state().fields.iter() {
            if key != "_id" {
                embedded.insert(key, raw.clone());
            }
        }
        embedded
    }

    pub(crate) fn mapper(&self) -> &Mapper {
        &self.mapper
    }

    /// Runs `f` over the cached fields without cloning them.
    pub(crate) fn with_fields<R>(&self, f: impl FnOnce(&Document) -> R) -> R {
        f(&self.read_state().fields)
    }

    /// Folds `sets` into the cache after a store write made elsewhere.
    pub(crate) fn merge_cached(&self, sets: Document) {
        let mut state = self.write_state();
        for (path, raw) in sets {
            value::set_path(&mut state.fields, &path, raw);
        }
    }

    fn read_state(&self) -> RwLockReadGuard<'_, EntityState> {
        self.state.read().expect("entity state lock poisoned")
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, EntityState> {
        self.state.write().expect("entity state lock poisoned")
    }
}

/// Identity equality: two entities are the same iff both have been saved and
/// carry the same identifier. Unsaved entities equal nothing, themselves
/// included.
impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        match (self.id(), other.id()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

fn strip_embed_meta(fields: Document) -> Document {
    let mut out = Document::new();
    for (key, raw) in fields {
        if key == "_id" || key == EMBED_KEY {
            continue;
        }
        out.insert(key, strip_embed_meta_bson(raw));
    }
    out
}

fn strip_embed_meta_bson(raw: Bson) -> Bson {
    match raw {
        Bson::Document(doc) if doc.contains_key(crate::value::CLASS_KEY) => Bson::Document(doc),
        Bson::Document(doc) => Bson::Document(strip_embed_meta(doc)),
        Bson::Array(items) => Bson::Array(items.into_iter().map(strip_embed_meta_bson).collect()),
        other => other,
    }
}
