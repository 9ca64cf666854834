//! Persistent object identifiers.
//!
//! An [`ObjectId`] names one row: the entity plus either a temporary key
//! (objects not yet inserted) or the permanent primary key values.

use crate::value::Value;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_TEMPORARY: AtomicU64 = AtomicU64::new(1);

/// Key part of an [`ObjectId`].
#[derive(Debug, Clone)]
pub enum IdKey {
    /// Process-unique placeholder for a row that has no primary key yet.
    Temporary(u64),
    /// Primary key values sorted by attribute name.
    Permanent(Vec<(String, Value)>),
}

/// Identity of a row within a flush.
///
/// Equality and hashing only look at the entity and the key the id was
/// created with. Keys generated during a flush are tracked separately by the
/// flush context, so an id never changes its hash while stored in a map.
#[derive(Debug, Clone)]
pub struct ObjectId {
    entity: String,
    key: IdKey,
}

impl ObjectId {
    /// A fresh temporary id.
    pub fn temporary(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            key: IdKey::Temporary(NEXT_TEMPORARY.fetch_add(1, Ordering::Relaxed)),
        }
    }

    /// A permanent id from primary key pairs; order of `pairs` is irrelevant.
    pub fn permanent<I, K, V>(entity: impl Into<String>, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut key: Vec<(String, Value)> = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        key.sort_by(|a, b| a.0.cmp(&b.0));
        Self {
            entity: entity.into(),
            key: IdKey::Permanent(key),
        }
    }

    /// Shorthand for a single-column permanent id.
    pub fn of(entity: impl Into<String>, attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::permanent(entity, [(attribute.into(), value.into())])
    }

    /// Entity name.
    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn key(&self) -> &IdKey {
        &self.key
    }

    pub fn is_temporary(&self) -> bool {
        matches!(self.key, IdKey::Temporary(_))
    }

    /// Value of one primary key attribute, if the id is permanent.
    pub fn key_value(&self, attribute: &str) -> Option<&Value> {
        match &self.key {
            IdKey::Temporary(_) => None,
            IdKey::Permanent(pairs) => pairs
                .iter()
                .find(|(name, _)| name == attribute)
                .map(|(_, v)| v),
        }
    }

    /// Primary key pairs, empty for temporary ids.
    pub fn key_pairs(&self) -> &[(String, Value)] {
        match &self.key {
            IdKey::Temporary(_) => &[],
            IdKey::Permanent(pairs) => pairs,
        }
    }
}

impl PartialEq for ObjectId {
    fn eq(&self, other: &Self) -> bool {
        if self.entity != other.entity {
            return false;
        }
        match (&self.key, &other.key) {
            (IdKey::Temporary(a), IdKey::Temporary(b)) => a == b,
            (IdKey::Permanent(a), IdKey::Permanent(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b)
                        .all(|((ka, va), (kb, vb))| ka == kb && va.key_eq(vb))
            }
            _ => false,
        }
    }
}

impl Eq for ObjectId {}

impl Hash for ObjectId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.entity.hash(state);
        match &self.key {
            IdKey::Temporary(n) => {
                0u8.hash(state);
                n.hash(state);
            }
            IdKey::Permanent(pairs) => {
                1u8.hash(state);
                for (name, value) in pairs {
                    name.hash(state);
                    value.hash_key(state);
                }
            }
        }
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.key {
            IdKey::Temporary(n) => write!(f, "<{}:TEMP#{}>", self.entity, n),
            IdKey::Permanent(pairs) => {
                write!(f, "<{}", self.entity)?;
                for (name, value) in pairs {
                    write!(f, ", {}={:?}", name, value)?;
                }
                write!(f, ">")
            }
        }
    }
}
