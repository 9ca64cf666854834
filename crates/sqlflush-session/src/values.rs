//! Per-row value snapshots.

use crate::context::FlushContext;
use sqlflush_core::{DbEntity, ObjectId, Result, Value};

/// Where a column value comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueSource {
    /// A value known when the change was recorded.
    Value(Value),
    /// A foreign key read from another row's key at binding time, once that
    /// row has been inserted and its key is known.
    Deferred { id: ObjectId, attribute: String },
}

impl ValueSource {
    /// Produce the value to bind.
    pub fn resolve(&self, ctx: &FlushContext) -> Result<Value> {
        match self {
            ValueSource::Value(value) => Ok(value.clone()),
            ValueSource::Deferred { id, attribute } => ctx.resolve(id, attribute),
        }
    }

    /// The concrete value, if not deferred.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            ValueSource::Value(value) => Some(value),
            ValueSource::Deferred { .. } => None,
        }
    }
}

impl From<Value> for ValueSource {
    fn from(value: Value) -> Self {
        ValueSource::Value(value)
    }
}

/// Attribute values touched by one row change.
///
/// Insertion order is kept: it is the order attributes were first touched,
/// and the order UPDATE statements list them in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Values {
    entries: Vec<(String, ValueSource)>,
    flattened: Vec<(String, ObjectId)>,
}

impl Values {
    pub fn new() -> Self {
        Self::default()
    }

    fn put(&mut self, attribute: String, source: ValueSource) {
        match self.entries.iter_mut().find(|(name, _)| *name == attribute) {
            Some((_, slot)) => *slot = source,
            None => self.entries.push((attribute, source)),
        }
    }

    /// Set an attribute value. A later value for the same attribute wins but
    /// keeps the original position.
    pub fn add_value(&mut self, attribute: impl Into<String>, value: impl Into<Value>) {
        self.put(attribute.into(), ValueSource::Value(value.into()));
    }

    /// Set an attribute to the key `id_attribute` of the row `id`.
    pub fn add_deferred(
        &mut self,
        attribute: impl Into<String>,
        id: ObjectId,
        id_attribute: impl Into<String>,
    ) {
        self.put(
            attribute.into(),
            ValueSource::Deferred {
                id,
                attribute: id_attribute.into(),
            },
        );
    }

    /// Builder form of [`Values::add_value`].
    pub fn with(mut self, attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        self.add_value(attribute, value);
        self
    }

    /// Builder form of [`Values::add_deferred`].
    pub fn with_deferred(
        mut self,
        attribute: impl Into<String>,
        id: ObjectId,
        id_attribute: impl Into<String>,
    ) -> Self {
        self.add_deferred(attribute, id, id_attribute);
        self
    }

    /// Record the row a relationship path points at. The first path segment
    /// names a to-one relationship of the row's entity; its join columns are
    /// then bound from the key of `id`.
    pub fn add_flattened_id(&mut self, path: impl Into<String>, id: ObjectId) {
        let path = path.into();
        match self.flattened.iter_mut().find(|(p, _)| *p == path) {
            Some((_, slot)) => *slot = id,
            None => self.flattened.push((path, id)),
        }
    }

    pub fn flattened_id(&self, path: &str) -> Option<&ObjectId> {
        self.flattened
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, id)| id)
    }

    pub fn flattened_ids(&self) -> impl Iterator<Item = (&str, &ObjectId)> {
        self.flattened.iter().map(|(p, id)| (p.as_str(), id))
    }

    /// Row referenced through the relationship `name`, if a flattened path
    /// starts with it.
    pub fn flattened_target(&self, relationship: &str) -> Option<&ObjectId> {
        self.flattened
            .iter()
            .find(|(path, _)| path.split('.').next() == Some(relationship))
            .map(|(_, id)| id)
    }

    /// Deferred source for an untouched join column of `entity`, read from
    /// the flattened target of the relationship owning the column.
    pub fn flattened_source(&self, entity: &DbEntity, attribute: &str) -> Option<ValueSource> {
        entity
            .relationships()
            .iter()
            .filter(|relationship| !relationship.to_many)
            .find_map(|relationship| {
                let join = relationship.joins.iter().find(|j| j.source == attribute)?;
                let id = self.flattened_target(&relationship.name)?;
                Some(ValueSource::Deferred {
                    id: id.clone(),
                    attribute: join.target.clone(),
                })
            })
    }

    pub fn get(&self, attribute: &str) -> Option<&ValueSource> {
        self.entries
            .iter()
            .find(|(name, _)| name == attribute)
            .map(|(_, source)| source)
    }

    pub fn contains(&self, attribute: &str) -> bool {
        self.get(attribute).is_some()
    }

    /// Touched attributes in first-touched order.
    pub fn updated_attributes(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ValueSource)> {
        self.entries.iter().map(|(name, source)| (name.as_str(), source))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no attribute was touched. Flattened ids are not counted.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fold a later change record for the same row into this one.
    ///
    /// Later values win, newly touched attributes are appended, and flattened
    /// ids are unioned.
    pub fn merge(&mut self, other: Values) {
        for (attribute, source) in other.entries {
            self.put(attribute, source);
        }
        for (path, id) in other.flattened {
            self.add_flattened_id(path, id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_later_value_wins_in_place() {
        let mut values = Values::new().with("a", 1_i64).with("b", 2_i64);
        values.add_value("a", 3_i64);
        let attrs: Vec<_> = values.updated_attributes().collect();
        assert_eq!(attrs, vec!["a", "b"]);
        assert_eq!(
            values.get("a"),
            Some(&ValueSource::Value(Value::BigInt(3)))
        );
    }

    #[test]
    fn test_merge_unions_attributes_and_flattened_ids() {
        let artist = ObjectId::temporary("artist");
        let gallery = ObjectId::of("gallery", "id", 9_i64);

        let mut first = Values::new().with("title", "Sunflowers");
        first.add_flattened_id("artist.gallery", gallery.clone());

        let mut second = Values::new()
            .with_deferred("artist_id", artist.clone(), "id")
            .with("title", "Irises");
        second.add_flattened_id("exhibits", artist.clone());

        first.merge(second);
        let attrs: Vec<_> = first.updated_attributes().collect();
        assert_eq!(attrs, vec!["title", "artist_id"]);
        assert_eq!(
            first.get("title").and_then(ValueSource::as_value),
            Some(&Value::Text("Irises".to_string()))
        );
        assert_eq!(first.flattened_id("artist.gallery"), Some(&gallery));
        assert_eq!(first.flattened_id("exhibits"), Some(&artist));
        assert_eq!(first.flattened_ids().count(), 2);
    }

    #[test]
    fn test_flattened_source_follows_relationship_joins() {
        use sqlflush_core::{DbAttribute, DbJoin, DbRelationship, SqlType};

        let entity = DbEntity::new("painting")
            .with_attribute(DbAttribute::new("id", SqlType::BigInt).primary_key())
            .with_attribute(DbAttribute::new("artist_id", SqlType::BigInt))
            .with_relationship(DbRelationship::to_one(
                "artist",
                "artist",
                vec![DbJoin::new("artist_id", "id")],
            ))
            .with_relationship(DbRelationship::to_many(
                "exhibits",
                "exhibit",
                vec![DbJoin::new("id", "painting_id")],
            ));
        let artist = ObjectId::temporary("artist");
        let mut values = Values::new();
        values.add_flattened_id("artist.gallery", artist.clone());
        values.add_flattened_id("exhibits", ObjectId::temporary("exhibit"));

        assert_eq!(values.flattened_target("artist"), Some(&artist));
        assert_eq!(values.flattened_target("art"), None);
        assert_eq!(
            values.flattened_source(&entity, "artist_id"),
            Some(ValueSource::Deferred {
                id: artist,
                attribute: "id".to_string(),
            })
        );
        // to-many joins never feed this row's columns
        assert_eq!(values.flattened_source(&entity, "id"), None);
        assert_eq!(values.flattened_source(&entity, "title"), None);
    }

    #[test]
    fn test_empty() {
        let mut values = Values::new();
        values.add_flattened_id("x", ObjectId::temporary("x"));
        assert!(values.is_empty());
        assert_eq!(values.len(), 0);
    }
}
