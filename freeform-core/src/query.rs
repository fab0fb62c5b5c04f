//! Query building and cursors.
//!
//! A [`Query`] accumulates find criteria through a chained builder and only
//! touches the store when [`run`](Query::run), [`all`](Query::all),
//! [`first`](Query::first), or [`count`](Query::count) is called. Sort
//! criteria accumulate across calls instead of replacing each other, with a
//! repeated field updating its direction in place. The [`with`](Query::with)
//! method dispatches dynamically: a recognized option name configures the
//! find, anything else becomes a filter term.

use bson::{Bson, Document};

use crate::{
    collection::Collection,
    entity::Entity,
    error::MapperResult,
};

/// Option names recognized by [`Query::with`]. Everything else is treated as
/// a filter field.
pub const FIND_OPTIONS: &[&str] = &[
    "projection",
    "distinct",
    "skip",
    "limit",
    "sort",
    "hint",
    "snapshot",
    "count",
];

/// Query sort ordering. Parsing is forgiving: several spellings map to each
/// direction and anything unrecognized falls back to ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn parse(token: &str) -> Self {
        match token.to_ascii_lowercase().as_str() {
            "desc" | "descending" | "down" | "-1" => SortDirection::Descending,
            _ => SortDirection::Ascending,
        }
    }
}

/// One or more `(field, direction)` sort terms, convertible from the shapes
/// callers naturally have on hand.
#[derive(Debug, Clone, Default)]
pub struct SortSpec(pub(crate) Vec<(String, SortDirection)>);

impl From<&str> for SortSpec {
    fn from(field: &str) -> Self {
        SortSpec(vec![(field.to_string(), SortDirection::Ascending)])
    }
}

impl From<String> for SortSpec {
    fn from(field: String) -> Self {
        SortSpec(vec![(field, SortDirection::Ascending)])
    }
}

impl From<(&str, &str)> for SortSpec {
    fn from((field, token): (&str, &str)) -> Self {
        SortSpec(vec![(field.to_string(), SortDirection::parse(token))])
    }
}

impl From<(&str, SortDirection)> for SortSpec {
    fn from((field, direction): (&str, SortDirection)) -> Self {
        SortSpec(vec![(field.to_string(), direction)])
    }
}

impl From<Vec<(&str, &str)>> for SortSpec {
    fn from(terms: Vec<(&str, &str)>) -> Self {
        SortSpec(
            terms
                .into_iter()
                .map(|(field, token)| (field.to_string(), SortDirection::parse(token)))
                .collect(),
        )
    }
}

impl From<Vec<(String, SortDirection)>> for SortSpec {
    fn from(terms: Vec<(String, SortDirection)>) -> Self {
        SortSpec(terms)
    }
}

/// The fully-assembled find criteria handed to a driver.
#[derive(Debug, Clone, Default)]
pub struct FindSpec {
    pub filter: Document,
    pub sort: Vec<(String, SortDirection)>,
    pub skip: Option<usize>,
    pub limit: Option<usize>,
    pub projection: Option<Vec<String>>,
    /// Recognized options the mapper itself does not interpret, passed
    /// through for drivers that do.
    pub extra: Document,
}

/// A lazily-executed find against one collection.
#[derive(Debug, Clone)]
pub struct Query {
    collection: Collection,
    spec: FindSpec,
}

impl Query {
    pub(crate) fn new(collection: Collection) -> Self {
        Query {
            collection,
            spec: FindSpec::default(),
        }
    }

    /// Adds one filter term. Repeating a field overwrites its previous
    /// criterion.
    pub fn filter(mut self, field: impl Into<String>, value: impl Into<Bson>) -> Self {
        self.spec.filter.insert(field.into(), value.into());
        self
    }

    /// Merges a whole filter document into the criteria.
    pub fn filter_all(mut self, filter: Document) -> Self {
        for (field, value) in filter {
            self.spec.filter.insert(field, value);
        }
        self
    }

    /// Adds sort terms. Terms accumulate across calls; naming a field again
    /// updates its direction without changing its position.
    pub fn sort(mut self, terms: impl Into<SortSpec>) -> Self {
        for (field, direction) in terms.into().0 {
            match self.spec.sort.iter_mut().find(|(f, _)| *f == field) {
                Some(term) => term.1 = direction,
                None => self.spec.sort.push((field, direction)),
            }
        }
        self
    }

    pub fn skip(mut self, n: usize) -> Self {
        self.spec.skip = Some(n);
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.spec.limit = Some(n);
        self
    }

    pub fn projection(mut self, fields: &[&str]) -> Self {
        self.spec.projection = Some(fields.iter().map(|f| f.to_string()).collect());
        self
    }

    /// Dynamic dispatch on a name: a recognized find option configures the
    /// query, any other name becomes a filter term on that field.
    pub fn with(mut self, name: &str, value: impl Into<Bson>) -> Self {
        let value = value.into();
        match name {
            "skip" => {
                if let Some(n) = bson_usize(&value) {
                    self.spec.skip = Some(n);
                }
            }
            "limit" => {
                if let Some(n) = bson_usize(&value) {
                    self.spec.limit = Some(n);
                }
            }
            "sort" => return self.sort(sort_terms_from_bson(&value)),
            "projection" => {
                if let Bson::Array(items) = &value {
                    self.spec.projection = Some(
                        items
                            .iter()
                            .filter_map(|item| match item {
                                Bson::String(field) => Some(field.clone()),
                                _ => None,
                            })
                            .collect(),
                    );
                }
            }
            _ if FIND_OPTIONS.contains(&name) => {
                self.spec.extra.insert(name, value);
            }
            _ => {
                self.spec.filter.insert(name, value);
            }
        }
        self
    }

    /// Issues the find. Each call re-executes against the store, so a cursor
    /// is never stale.
    pub fn run(&self) -> MapperResult<Cursor> {
        let documents = self
            .collection
            .mapper()
            .driver()
            .find(self.collection.name(), &self.spec)?;
        Ok(Cursor {
            documents: documents.into_iter(),
            collection: self.collection.clone(),
        })
    }

    /// Runs the find and hydrates every result.
    pub fn all(&self) -> MapperResult<Vec<Entity>> {
        Ok(self.run()?.collect())
    }

    /// Runs the find limited to one result.
    pub fn first(&self) -> MapperResult<Option<Entity>> {
        let mut narrowed = self.clone();
        narrowed.spec.limit = Some(1);
        Ok(narrowed.run()?.next())
    }

    /// Counts matches without hydrating them. Sort, skip, and limit are
    /// ignored; only the filter applies.
    pub fn count(&self) -> MapperResult<u64> {
        self.collection
            .mapper()
            .driver()
            .count(self.collection.name(), &self.spec.filter)
    }
}

fn bson_usize(value: &Bson) -> Option<usize> {
    match value {
        Bson::Int32(n) if *n >= 0 => Some(*n as usize),
        Bson::Int64(n) if *n >= 0 => Some(*n as usize),
        _ => None,
    }
}

fn sort_terms_from_bson(value: &Bson) -> SortSpec {
    match value {
        Bson::String(field) => SortSpec(vec![(field.clone(), SortDirection::Ascending)]),
        Bson::Document(terms) => SortSpec(
            terms
                .iter()
                .map(|(field, direction)| {
                    let direction = match direction {
                        Bson::Int32(n) if *n < 0 => SortDirection::Descending,
                        Bson::Int64(n) if *n < 0 => SortDirection::Descending,
                        Bson::String(token) => SortDirection::parse(token),
                        _ => SortDirection::Ascending,
                    };
                    (field.clone(), direction)
                })
                .collect(),
        ),
        _ => SortSpec::default(),
    }
}

/// An iterator over find results, hydrating entities on demand. Documents
/// that lack a usable identifier are skipped.
pub struct Cursor {
    documents: std::vec::IntoIter<Document>,
    collection: Collection,
}

impl Iterator for Cursor {
    type Item = Entity;

    fn next(&mut self) -> Option<Entity> {
        loop {
            let document = self.documents.next()?;
            if let Ok(entity) = self.collection.hydrate(document) {
                return Some(entity);
            }
        }
    }
}
