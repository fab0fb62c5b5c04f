//! Filter matching and value ordering for the in-memory driver.
//!
//! Filters follow the store's query shape: a plain value means equality, a
//! document whose keys start with `$` applies comparison operators. Ordering
//! ranks values by type first and compares within a type second, so sorting a
//! mixed-type field is deterministic.

use std::cmp::Ordering;

use bson::{Bson, Document, oid::ObjectId};

pub(crate) fn matches(document: &Document, filter: &Document) -> bool {
    filter.iter().all(|(field, expected)| {
        let actual = freeform_core::value::get_path(document, field);
        match expected {
            Bson::Document(ops) if is_operator_doc(ops) => apply_operators(actual, ops),
            other => actual.is_some_and(|actual| Comparable::from(actual) == Comparable::from(other)),
        }
    })
}

fn is_operator_doc(doc: &Document) -> bool {
    doc.keys().next().is_some_and(|key| key.starts_with('$'))
}

fn apply_operators(actual: Option<&Bson>, ops: &Document) -> bool {
    ops.iter().all(|(op, operand)| match op.as_str() {
        "$exists" => {
            let wanted = matches!(operand, Bson::Boolean(true)) || matches!(operand, Bson::Int32(n) if *n != 0);
            actual.is_some() == wanted
        }
        "$eq" => actual.is_some_and(|a| Comparable::from(a) == Comparable::from(operand)),
        "$ne" => !actual.is_some_and(|a| Comparable::from(a) == Comparable::from(operand)),
        "$gt" => ordered(actual, operand).is_some_and(|ord| ord == Ordering::Greater),
        "$gte" => ordered(actual, operand).is_some_and(|ord| ord != Ordering::Less),
        "$lt" => ordered(actual, operand).is_some_and(|ord| ord == Ordering::Less),
        "$lte" => ordered(actual, operand).is_some_and(|ord| ord != Ordering::Greater),
        "$in" => match operand {
            Bson::Array(choices) => actual.is_some_and(|a| {
                choices
                    .iter()
                    .any(|choice| Comparable::from(a) == Comparable::from(choice))
            }),
            _ => false,
        },
        // unrecognized operators match nothing
        _ => false,
    })
}

/// Range operators only apply when both sides share a type rank.
fn ordered(actual: Option<&Bson>, operand: &Bson) -> Option<Ordering> {
    let a = Comparable::from(actual?);
    let b = Comparable::from(operand);
    if a.rank() != b.rank() {
        return None;
    }
    Some(a.cmp(&b))
}

/// Total, type-ranked ordering over document values, for multi-key sorting.
pub(crate) fn compare(a: &Bson, b: &Bson) -> Ordering {
    Comparable::from(a).cmp(&Comparable::from(b))
}

enum Comparable<'a> {
    Null,
    Bool(bool),
    Number(f64),
    String(&'a str),
    Id(&'a ObjectId),
    DateTime(bson::DateTime),
    Array(&'a [Bson]),
    Doc(&'a Document),
    Other(&'a Bson),
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(raw: &'a Bson) -> Self {
        match raw {
            Bson::Null => Comparable::Null,
            Bson::Boolean(b) => Comparable::Bool(*b),
            Bson::Int32(n) => Comparable::Number(*n as f64),
            Bson::Int64(n) => Comparable::Number(*n as f64),
            Bson::Double(n) => Comparable::Number(*n),
            Bson::String(s) => Comparable::String(s),
            Bson::ObjectId(id) => Comparable::Id(id),
            Bson::DateTime(dt) => Comparable::DateTime(*dt),
            Bson::Array(items) => Comparable::Array(items),
            Bson::Document(doc) => Comparable::Doc(doc),
            other => Comparable::Other(other),
        }
    }
}

impl Comparable<'_> {
    fn rank(&self) -> u8 {
        match self {
            Comparable::Null => 0,
            Comparable::Bool(_) => 1,
            Comparable::Number(_) => 2,
            Comparable::String(_) => 3,
            Comparable::Id(_) => 4,
            Comparable::DateTime(_) => 5,
            Comparable::Array(_) => 6,
            Comparable::Doc(_) => 7,
            Comparable::Other(_) => 8,
        }
    }

    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => Ordering::Equal,
            (Comparable::Bool(a), Comparable::Bool(b)) => a.cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => {
                a.partial_cmp(b).unwrap_or(Ordering::Equal)
            }
            (Comparable::String(a), Comparable::String(b)) => a.cmp(b),
            (Comparable::Id(a), Comparable::Id(b)) => a.bytes().cmp(&b.bytes()),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.cmp(b),
            (Comparable::Array(a), Comparable::Array(b)) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    let ord = compare(x, y);
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                a.len().cmp(&b.len())
            }
            // documents and exotic types have no useful order within rank
            (Comparable::Doc(_), Comparable::Doc(_)) => Ordering::Equal,
            (Comparable::Other(_), Comparable::Other(_)) => Ordering::Equal,
            (a, b) => a.rank().cmp(&b.rank()),
        }
    }
}

impl PartialEq for Comparable<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Doc(a), Comparable::Doc(b)) => a == b,
            (Comparable::Other(a), Comparable::Other(b)) => a == b,
            _ => self.rank() == other.rank() && self.cmp(other) == Ordering::Equal,
        }
    }
}
