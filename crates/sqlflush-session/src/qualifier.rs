//! Row qualifiers for UPDATE and DELETE.

use sqlflush_core::{DbEntity, ObjectId, Value};

/// One attribute of the original snapshot used in a WHERE clause.
#[derive(Debug, Clone, PartialEq)]
pub struct QualifierEntry {
    pub attribute: String,
    pub value: Value,
    /// Included only when optimistic locking is enabled
    pub lock: bool,
}

/// Original values identifying a row: its primary key and, for optimistic
/// locking, the lock attributes as they were read.
///
/// Which entries are NULL is part of the statement shape, since a NULL
/// renders as `IS NULL` instead of a bound parameter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Qualifier {
    entries: Vec<QualifierEntry>,
}

impl Qualifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Qualifier over the key of a permanent id. Temporary ids give an empty
    /// qualifier.
    pub fn from_id(id: &ObjectId) -> Self {
        let mut qualifier = Self::new();
        for (attribute, value) in id.key_pairs() {
            qualifier.push(attribute.clone(), value.clone(), false);
        }
        qualifier
    }

    /// Qualifier for a row of `entity` from its id and a snapshot lookup for
    /// lock attributes.
    pub fn for_row<'a>(
        entity: &DbEntity,
        id: &ObjectId,
        snapshot: impl Fn(&str) -> Option<&'a Value>,
    ) -> Self {
        let mut qualifier = Self::from_id(id);
        for attribute in entity.lock_attributes() {
            let value = snapshot(&attribute.name).cloned().unwrap_or(Value::Null);
            qualifier.push(attribute.name.clone(), value, true);
        }
        qualifier
    }

    fn push(&mut self, attribute: String, value: Value, lock: bool) {
        match self.entries.iter_mut().find(|e| e.attribute == attribute) {
            Some(entry) => {
                entry.value = value;
                entry.lock = lock;
            }
            None => self.entries.push(QualifierEntry {
                attribute,
                value,
                lock,
            }),
        }
    }

    /// Add a key attribute.
    pub fn key(mut self, attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(attribute.into(), value.into(), false);
        self
    }

    /// Add an optimistic lock attribute.
    pub fn lock(mut self, attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(attribute.into(), value.into(), true);
        self
    }

    /// Entries in order, skipping lock entries unless `with_locking`.
    pub fn entries(&self, with_locking: bool) -> impl Iterator<Item = &QualifierEntry> {
        self.entries.iter().filter(move |e| with_locking || !e.lock)
    }

    pub fn get(&self, attribute: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|e| e.attribute == attribute)
            .map(|e| &e.value)
    }

    /// Attributes whose snapshot value is NULL.
    pub fn null_attributes(&self, with_locking: bool) -> Vec<&str> {
        self.entries(with_locking)
            .filter(|e| e.value.is_null())
            .map(|e| e.attribute.as_str())
            .collect()
    }

    /// Whether any lock attribute is present.
    pub fn has_lock_attributes(&self) -> bool {
        self.entries.iter().any(|e| e.lock)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
