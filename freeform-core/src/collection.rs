//! Collection handles.
//!
//! A [`Collection`] is the entry point for creating, finding, and upserting
//! entities of one kind. Handles are resolved through the
//! [`Mapper`](crate::mapper::Mapper)'s binding registry, so a kind can back
//! onto a differently-named collection and hydrate results under yet another
//! kind.

use bson::{Document, oid::ObjectId};
use tracing::debug;

use crate::{
    driver::IndexDirection,
    entity::Entity,
    error::{MapperError, MapperResult},
    mapper::Mapper,
    query::Query,
};

#[derive(Clone, Debug)]
pub struct Collection {
    mapper: Mapper,
    kind: String,
    name: String,
    hydrate_as: String,
}

impl Collection {
    pub(crate) fn resolve(mapper: Mapper, kind: String, name: String, hydrate_as: String) -> Self {
        Collection {
            mapper,
            kind,
            name,
            hydrate_as,
        }
    }

    /// The kind this handle was resolved for.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// The backing collection name in the store.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The kind results hydrate as.
    pub fn hydrate_as(&self) -> &str {
        &self.hydrate_as
    }

    /// Creates an unsaved entity. Nothing is written until its first field
    /// is set.
    pub fn create(&self) -> Entity {
        Entity::unsaved(self)
    }

    /// Creates an entity from an initial field map, inserting it
    /// immediately. An empty map behaves like [`Collection::create`].
    pub fn create_with(&self, fields: Document) -> MapperResult<Entity> {
        if fields.is_empty() {
            return Ok(self.create());
        }
        let id = self.mapper.driver().insert(&self.name, fields.clone())?;
        debug!(collection = %self.name, %id, "created document");
        Ok(Entity::persisted(self, id, fields))
    }

    /// Turns a stored document into an entity. The document must carry an
    /// `ObjectId` under `"_id"`.
    pub fn hydrate(&self, mut document: Document) -> MapperResult<Entity> {
        match document.remove("_id") {
            Some(bson::Bson::ObjectId(id)) => Ok(Entity::persisted(self, id, document)),
            _ => Err(MapperError::Serialization(format!(
                "stored document in {:?} has no ObjectId identifier",
                self.name
            ))),
        }
    }

    pub fn find_by_id(&self, id: &ObjectId) -> MapperResult<Option<Entity>> {
        match self.mapper.driver().find_by_id(&self.name, id)? {
            Some(document) => self.hydrate(document).map(Some),
            None => Ok(None),
        }
    }

    /// Finds the first document matching a filter, in store order.
    pub fn find_first(&self, filter: Document) -> MapperResult<Option<Entity>> {
        self.query().filter_all(filter).first()
    }

    /// Upserts by named key fields. When a document matching `document`'s
    /// values for every key exists, its remaining fields are overwritten with
    /// `document`'s and the result returned; otherwise `document` is inserted
    /// whole. A key missing from `document` forces the insert path.
    ///
    /// The find and the write are separate store operations, so concurrent
    /// upserts of the same keys can race into duplicate documents.
    pub fn update(&self, keys: &[&str], document: Document) -> MapperResult<Entity> {
        let mut filter = Document::new();
        for key in keys {
            match document.get(*key) {
                Some(value) => {
                    filter.insert(*key, value.clone());
                }
                None => return self.create_with(document),
            }
        }

        match self.find_first(filter)? {
            Some(existing) => {
                let mut sets = Document::new();
                for (field, value) in document.iter() {
                    if !keys.contains(&field.as_str()) {
                        sets.insert(field, value.clone());
                    }
                }
                if !sets.is_empty() {
                    let id = existing
                        .id()
                        .ok_or_else(|| MapperError::MissingIdentifier(self.hydrate_as.clone()))?;
                    self.mapper.driver().set_fields(&self.name, &id, sets.clone())?;
                    existing.merge_cached(sets);
                }
                Ok(existing)
            }
            None => self.create_with(document),
        }
    }

    /// Starts a query against this collection.
    pub fn query(&self) -> Query {
        Query::new(self.clone())
    }

    /// All documents in the collection, hydrated.
    pub fn all(&self) -> MapperResult<Vec<Entity>> {
        self.query().all()
    }

    pub fn count(&self, filter: Document) -> MapperResult<u64> {
        self.mapper.driver().count(&self.name, &filter)
    }

    /// Declares an index. `direction` must be `"asc"` or `"desc"`; anything
    /// else is an error rather than a silent default.
    pub fn index(&self, field: &str, direction: &str) -> MapperResult<()> {
        let direction = IndexDirection::parse(direction)?;
        self.mapper.driver().create_index(&self.name, field, direction)
    }

    /// Drops the backing collection and everything in it.
    pub fn drop(&self) -> MapperResult<()> {
        debug!(collection = %self.name, "dropping collection");
        self.mapper.driver().drop_collection(&self.name)
    }

    pub(crate) fn mapper(&self) -> &Mapper {
        &self.mapper
    }
}
