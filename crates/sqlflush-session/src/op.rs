//! Row operations produced by flush preparation.

use crate::qualifier::Qualifier;
use crate::values::Values;
use sqlflush_core::error::TranslationErrorKind;
use sqlflush_core::{DbEntity, Error, ObjectId, Result};
use std::fmt;
use std::sync::Arc;

/// What a row operation does to its row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DbRowOpKind {
    Insert,
    Update,
    Delete,
}

impl DbRowOpKind {
    /// Execution order of the kind: inserts, then updates, then deletes.
    pub const fn rank(self) -> usize {
        match self {
            DbRowOpKind::Insert => 0,
            DbRowOpKind::Update => 1,
            DbRowOpKind::Delete => 2,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            DbRowOpKind::Insert => "INSERT",
            DbRowOpKind::Update => "UPDATE",
            DbRowOpKind::Delete => "DELETE",
        }
    }
}

impl fmt::Display for DbRowOpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One pending change to one table row.
///
/// Inserts carry [`Values`]. Updates carry both the changed values and the
/// [`Qualifier`] snapshot the row was read with. Deletes carry only a
/// qualifier, plus optionally the last known values so that reflexive
/// ordering can see the row's foreign keys.
#[derive(Debug, Clone)]
pub struct DbRowOp {
    kind: DbRowOpKind,
    entity: Arc<DbEntity>,
    id: ObjectId,
    values: Values,
    qualifier: Qualifier,
}

impl DbRowOp {
    pub fn insert(entity: Arc<DbEntity>, id: ObjectId, values: Values) -> Self {
        Self {
            kind: DbRowOpKind::Insert,
            entity,
            id,
            values,
            qualifier: Qualifier::new(),
        }
    }

    pub fn update(entity: Arc<DbEntity>, id: ObjectId, values: Values, qualifier: Qualifier) -> Self {
        Self {
            kind: DbRowOpKind::Update,
            entity,
            id,
            values,
            qualifier,
        }
    }

    pub fn delete(entity: Arc<DbEntity>, id: ObjectId, qualifier: Qualifier) -> Self {
        Self {
            kind: DbRowOpKind::Delete,
            entity,
            id,
            values: Values::new(),
            qualifier,
        }
    }

    /// Attach the row's last known values to a delete.
    pub fn with_values(mut self, values: Values) -> Self {
        self.values = values;
        self
    }

    pub fn kind(&self) -> DbRowOpKind {
        self.kind
    }

    pub fn entity(&self) -> &Arc<DbEntity> {
        &self.entity
    }

    pub fn entity_name(&self) -> &str {
        &self.entity.name
    }

    pub fn id(&self) -> &ObjectId {
        &self.id
    }

    pub fn values(&self) -> &Values {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut Values {
        &mut self.values
    }

    pub fn qualifier(&self) -> &Qualifier {
        &self.qualifier
    }

    /// Combine this operation with a later one for the same row.
    ///
    /// Returns `None` when the two cancel out: a row inserted and deleted in
    /// the same flush never reaches the database.
    pub fn merge(mut self, later: DbRowOp) -> Result<Option<DbRowOp>> {
        if self.id != later.id {
            return Err(self.conflict(&later, "operations target different rows"));
        }
        use DbRowOpKind::{Delete, Insert, Update};
        match (self.kind, later.kind) {
            (Insert, Insert | Update) | (Update, Update) => {
                self.values.merge(later.values);
                Ok(Some(self))
            }
            (Insert, Delete) => Ok(None),
            (Update, Delete) => {
                // the WHERE clause must match the row as it was read
                let mut values = self.values;
                values.merge(later.values);
                Ok(Some(DbRowOp::delete(self.entity, self.id, self.qualifier).with_values(values)))
            }
            (Delete, Delete) => Ok(Some(self)),
            (Delete, Insert | Update) | (Update, Insert) => {
                let message = format!("{} cannot follow {}", later.kind, self.kind);
                Err(self.conflict(&later, &message))
            }
        }
    }

    fn conflict(&self, later: &DbRowOp, message: &str) -> Error {
        Error::translation(
            TranslationErrorKind::ConflictingOperations,
            Some(self.entity_name()),
            format!("{message}: {} and {}", self.id, later.id),
        )
    }
}

impl fmt::Display for DbRowOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlflush_core::{DbAttribute, SqlType, Value};

    fn artist() -> Arc<DbEntity> {
        Arc::new(
            DbEntity::new("artist")
                .with_attribute(DbAttribute::new("id", SqlType::BigInt).primary_key())
                .with_attribute(DbAttribute::new("name", SqlType::Text)),
        )
    }

    #[test]
    fn test_kind_rank() {
        assert!(DbRowOpKind::Insert.rank() < DbRowOpKind::Update.rank());
        assert!(DbRowOpKind::Update.rank() < DbRowOpKind::Delete.rank());
        assert_eq!(DbRowOpKind::Delete.to_string(), "DELETE");
    }

    #[test]
    fn test_insert_then_update_stays_insert() {
        let id = ObjectId::temporary("artist");
        let insert = DbRowOp::insert(artist(), id.clone(), Values::new().with("name", "Monet"));
        let update = DbRowOp::update(
            artist(),
            id,
            Values::new().with("name", "Manet"),
            Qualifier::new(),
        );
        let merged = insert.merge(update).unwrap().unwrap();
        assert_eq!(merged.kind(), DbRowOpKind::Insert);
        assert_eq!(
            merged.values().get("name").and_then(|v| v.as_value()),
            Some(&Value::Text("Manet".to_string()))
        );
    }

    #[test]
    fn test_insert_then_delete_cancels() {
        let id = ObjectId::temporary("artist");
        let insert = DbRowOp::insert(artist(), id.clone(), Values::new());
        let delete = DbRowOp::delete(artist(), id, Qualifier::new());
        assert!(insert.merge(delete).unwrap().is_none());
    }

    #[test]
    fn test_update_then_delete_keeps_original_qualifier() {
        let id = ObjectId::of("artist", "id", 1_i64);
        let update = DbRowOp::update(
            artist(),
            id.clone(),
            Values::new().with("name", "x"),
            Qualifier::from_id(&id).lock("name", "original"),
        );
        let delete = DbRowOp::delete(artist(), id, Qualifier::new().key("id", 1_i64));
        let merged = update.merge(delete).unwrap().unwrap();
        assert_eq!(merged.kind(), DbRowOpKind::Delete);
        assert_eq!(
            merged.qualifier().get("name"),
            Some(&Value::Text("original".to_string()))
        );
        assert!(merged.values().contains("name"));
    }

    #[test]
    fn test_delete_then_update_conflicts() {
        let id = ObjectId::of("artist", "id", 1_i64);
        let delete = DbRowOp::delete(artist(), id.clone(), Qualifier::from_id(&id));
        let update = DbRowOp::update(artist(), id.clone(), Values::new(), Qualifier::from_id(&id));
        let err = delete.merge(update).unwrap_err();
        assert!(matches!(
            err,
            Error::Translation(ref e) if e.kind == TranslationErrorKind::ConflictingOperations
        ));
    }

    #[test]
    fn test_merge_requires_same_row() {
        let a = DbRowOp::insert(artist(), ObjectId::temporary("artist"), Values::new());
        let b = DbRowOp::insert(artist(), ObjectId::temporary("artist"), Values::new());
        assert!(a.merge(b).is_err());
    }
}
