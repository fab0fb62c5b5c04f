//! The in-memory driver.
//!
//! Collections are vectors of `(id, fields)` rows in insertion order, which
//! is the order an unsorted find returns. Fields are stored without the
//! identifier; materialized results put `"_id"` back in front, matching what
//! an external store would return.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use bson::{Bson, Document, doc, oid::ObjectId};
use tracing::trace;

use freeform_core::{
    config::ConnectionConfig,
    driver::{Driver, DriverBuilder, IndexDirection},
    error::{MapperError, MapperResult},
    query::{FindSpec, SortDirection},
    value::{get_path, set_path},
};

use crate::evaluator;

type Rows = Vec<(ObjectId, Document)>;

/// A process-local, lock-protected document store.
#[derive(Debug, Clone)]
pub struct MemoryDriver {
    database: String,
    collections: Arc<RwLock<HashMap<String, Rows>>>,
    indexes: Arc<RwLock<HashMap<String, Vec<(String, IndexDirection)>>>>,
}

impl MemoryDriver {
    pub fn new() -> Self {
        Self::named(ConnectionConfig::default_database())
    }

    pub fn named(database: impl Into<String>) -> Self {
        MemoryDriver {
            database: database.into(),
            collections: Arc::new(RwLock::new(HashMap::new())),
            indexes: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    /// The indexes declared on a collection, in declaration order.
    pub fn indexes(&self, collection: &str) -> Vec<(String, IndexDirection)> {
        self.indexes
            .read()
            .expect("index lock poisoned")
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    fn read_collections(&self) -> RwLockReadGuard<'_, HashMap<String, Rows>> {
        self.collections.read().expect("collection lock poisoned")
    }

    fn write_collections(&self) -> RwLockWriteGuard<'_, HashMap<String, Rows>> {
        self.collections.write().expect("collection lock poisoned")
    }
}

impl Default for MemoryDriver {
    fn default() -> Self {
        Self::new()
    }
}

fn materialize(id: &ObjectId, fields: &Document) -> Document {
    let mut full = doc! { "_id": *id };
    for (key, raw) in fields.iter() {
        full.insert(key, raw.clone());
    }
    full
}

fn apply_projection(mut document: Document, projection: &[String]) -> Document {
    let mut projected = Document::new();
    if let Some(id) = document.remove("_id") {
        projected.insert("_id", id);
    }
    for field in projection {
        if let Some(raw) = document.remove(field) {
            projected.insert(field, raw);
        }
    }
    projected
}

impl Driver for MemoryDriver {
    fn insert(&self, collection: &str, mut document: Document) -> MapperResult<ObjectId> {
        // identifiers are always minted here
        document.remove("_id");
        let id = ObjectId::new();
        trace!(db = %self.database, collection, %id, "insert");
        self.write_collections()
            .entry(collection.to_string())
            .or_default()
            .push((id, document));
        Ok(id)
    }

    fn find(&self, collection: &str, spec: &FindSpec) -> MapperResult<Vec<Document>> {
        let collections = self.read_collections();
        let Some(rows) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        let mut matched: Vec<Document> = rows
            .iter()
            .map(|(id, fields)| materialize(id, fields))
            .filter(|document| evaluator::matches(document, &spec.filter))
            .collect();
        trace!(db = %self.database, collection, matched = matched.len(), "find");

        if !spec.sort.is_empty() {
            let null = Bson::Null;
            matched.sort_by(|a, b| {
                for (field, direction) in &spec.sort {
                    let left = get_path(a, field).unwrap_or(&null);
                    let right = get_path(b, field).unwrap_or(&null);
                    let ord = match direction {
                        SortDirection::Ascending => evaluator::compare(left, right),
                        SortDirection::Descending => evaluator::compare(right, left),
                    };
                    if ord != std::cmp::Ordering::Equal {
                        return ord;
                    }
                }
                std::cmp::Ordering::Equal
            });
        }

        let results = matched
            .into_iter()
            .skip(spec.skip.unwrap_or(0))
            .take(spec.limit.unwrap_or(usize::MAX))
            .map(|document| match &spec.projection {
                Some(projection) => apply_projection(document, projection),
                None => document,
            })
            .collect();
        Ok(results)
    }

    fn find_by_id(&self, collection: &str, id: &ObjectId) -> MapperResult<Option<Document>> {
        Ok(self
            .read_collections()
            .get(collection)
            .and_then(|rows| rows.iter().find(|(row_id, _)| row_id == id))
            .map(|(row_id, fields)| materialize(row_id, fields)))
    }

    fn set_fields(&self, collection: &str, id: &ObjectId, sets: Document) -> MapperResult<()> {
        let mut collections = self.write_collections();
        let row = collections
            .get_mut(collection)
            .and_then(|rows| rows.iter_mut().find(|(row_id, _)| row_id == id));
        if let Some((_, fields)) = row {
            trace!(db = %self.database, collection, %id, fields = sets.len(), "set");
            for (path, raw) in sets {
                set_path(fields, &path, raw);
            }
        }
        Ok(())
    }

    fn increment(
        &self,
        collection: &str,
        id: &ObjectId,
        field: &str,
        amount: i64,
    ) -> MapperResult<i64> {
        let mut collections = self.write_collections();
        let row = collections
            .get_mut(collection)
            .and_then(|rows| rows.iter_mut().find(|(row_id, _)| row_id == id));
        let Some((_, fields)) = row else {
            return Err(MapperError::Driver(format!(
                "no document {id} in {collection:?}"
            )));
        };

        let current = match get_path(fields, field) {
            None | Some(Bson::Null) => 0,
            Some(Bson::Int32(n)) => *n as i64,
            Some(Bson::Int64(n)) => *n,
            Some(_) => {
                return Err(MapperError::Driver(format!(
                    "cannot increment non-integer field {field:?}"
                )));
            }
        };
        let updated = current + amount;
        set_path(fields, field, Bson::Int64(updated));
        Ok(updated)
    }

    fn delete(&self, collection: &str, id: &ObjectId) -> MapperResult<()> {
        if let Some(rows) = self.write_collections().get_mut(collection) {
            rows.retain(|(row_id, _)| row_id != id);
        }
        Ok(())
    }

    fn count(&self, collection: &str, filter: &Document) -> MapperResult<u64> {
        let collections = self.read_collections();
        let Some(rows) = collections.get(collection) else {
            return Ok(0);
        };
        let count = rows
            .iter()
            .map(|(id, fields)| materialize(id, fields))
            .filter(|document| evaluator::matches(document, filter))
            .count();
        Ok(count as u64)
    }

    fn create_index(
        &self,
        collection: &str,
        field: &str,
        direction: IndexDirection,
    ) -> MapperResult<()> {
        let mut indexes = self.indexes.write().expect("index lock poisoned");
        let entries = indexes.entry(collection.to_string()).or_default();
        match entries.iter_mut().find(|(name, _)| name == field) {
            Some(entry) => entry.1 = direction,
            None => entries.push((field.to_string(), direction)),
        }
        Ok(())
    }

    fn drop_collection(&self, collection: &str) -> MapperResult<()> {
        self.write_collections().remove(collection);
        self.indexes
            .write()
            .expect("index lock poisoned")
            .remove(collection);
        Ok(())
    }
}

/// Builds a [`MemoryDriver`] from connection settings. Only the database
/// name is meaningful; the rest of the config is accepted for interface
/// parity with drivers that actually dial out.
#[derive(Debug, Default)]
pub struct MemoryDriverBuilder {
    config: ConnectionConfig,
}

impl MemoryDriverBuilder {
    pub fn new(config: ConnectionConfig) -> Self {
        MemoryDriverBuilder { config }
    }
}

impl DriverBuilder for MemoryDriverBuilder {
    type Driver = MemoryDriver;

    fn build(self) -> MapperResult<MemoryDriver> {
        Ok(MemoryDriver::named(self.config.database().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn driver() -> MemoryDriver {
        MemoryDriver::named("test")
    }

    #[test]
    fn insert_mints_an_id_and_find_by_id_returns_it() {
        let driver = driver();
        let id = driver.insert("things", doc! { "name": "one" }).unwrap();

        let found = driver.find_by_id("things", &id).unwrap().unwrap();
        assert_eq!(found.get("_id"), Some(&Bson::ObjectId(id)));
        assert_eq!(found.get("name"), Some(&Bson::String("one".to_string())));

        let other = ObjectId::new();
        assert!(driver.find_by_id("things", &other).unwrap().is_none());
    }

    #[test]
    fn unsorted_find_returns_insertion_order() {
        let driver = driver();
        for n in 0..4 {
            driver.insert("things", doc! { "n": n }).unwrap();
        }

        let found = driver.find("things", &FindSpec::default()).unwrap();
        let ns: Vec<i32> = found
            .iter()
            .filter_map(|d| match d.get("n") {
                Some(Bson::Int32(n)) => Some(*n),
                _ => None,
            })
            .collect();
        assert_eq!(ns, vec![0, 1, 2, 3]);
    }

    #[test]
    fn find_applies_sort_skip_and_limit() {
        let driver = driver();
        for (group, n) in [("a", 2), ("b", 1), ("a", 1), ("b", 2)] {
            driver.insert("things", doc! { "group": group, "n": n }).unwrap();
        }

        let spec = FindSpec {
            sort: vec![
                ("group".to_string(), SortDirection::Ascending),
                ("n".to_string(), SortDirection::Descending),
            ],
            skip: Some(1),
            limit: Some(2),
            ..FindSpec::default()
        };
        let found = driver.find("things", &spec).unwrap();
        let rows: Vec<(String, i32)> = found
            .iter()
            .map(|d| {
                let group = match d.get("group") {
                    Some(Bson::String(s)) => s.clone(),
                    _ => String::new(),
                };
                let n = match d.get("n") {
                    Some(Bson::Int32(n)) => *n,
                    _ => 0,
                };
                (group, n)
            })
            .collect();
        assert_eq!(rows, vec![("a".to_string(), 1), ("b".to_string(), 2)]);
    }

    #[test]
    fn projection_keeps_the_id_and_named_fields() {
        let driver = driver();
        driver
            .insert("things", doc! { "keep": 1, "drop": 2 })
            .unwrap();

        let spec = FindSpec {
            projection: Some(vec!["keep".to_string()]),
            ..FindSpec::default()
        };
        let found = driver.find("things", &spec).unwrap();
        assert_eq!(found.len(), 1);
        assert!(found[0].get("_id").is_some());
        assert_eq!(found[0].get("keep"), Some(&Bson::Int32(1)));
        assert!(found[0].get("drop").is_none());
    }

    #[test]
    fn set_fields_targets_nested_paths() {
        let driver = driver();
        let id = driver
            .insert("things", doc! { "nested": { "keep": true, "change": 1 } })
            .unwrap();

        driver
            .set_fields("things", &id, doc! { "nested.change": 2, "fresh.leaf": "x" })
            .unwrap();

        let found = driver.find_by_id("things", &id).unwrap().unwrap();
        assert_eq!(get_path(&found, "nested.keep"), Some(&Bson::Boolean(true)));
        assert_eq!(get_path(&found, "nested.change"), Some(&Bson::Int32(2)));
        assert_eq!(
            get_path(&found, "fresh.leaf"),
            Some(&Bson::String("x".to_string()))
        );
    }

    #[test]
    fn increment_starts_missing_fields_at_zero() {
        let driver = driver();
        let id = driver.insert("things", doc! { "name": "c" }).unwrap();

        assert_eq!(driver.increment("things", &id, "hits", 1).unwrap(), 1);
        assert_eq!(driver.increment("things", &id, "hits", 3).unwrap(), 4);
        assert!(driver.increment("things", &id, "name", 1).is_err());
    }

    #[test]
    fn delete_and_drop_are_idempotent() {
        let driver = driver();
        let id = driver.insert("things", doc! { "n": 1 }).unwrap();

        driver.delete("things", &id).unwrap();
        driver.delete("things", &id).unwrap();
        assert_eq!(driver.count("things", &Document::new()).unwrap(), 0);

        driver.drop_collection("things").unwrap();
        driver.drop_collection("things").unwrap();
        driver.drop_collection("never_existed").unwrap();
    }

    #[test]
    fn indexes_record_fields_and_directions() {
        let driver = driver();
        driver
            .create_index("things", "name", IndexDirection::Ascending)
            .unwrap();
        driver
            .create_index("things", "name", IndexDirection::Descending)
            .unwrap();
        driver
            .create_index("things", "age", IndexDirection::Ascending)
            .unwrap();

        assert_eq!(
            driver.indexes("things"),
            vec![
                ("name".to_string(), IndexDirection::Descending),
                ("age".to_string(), IndexDirection::Ascending),
            ]
        );
    }
}
