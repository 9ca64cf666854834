//! Ordering of row operations for execution.
//!
//! Operations run in three phases, INSERT then UPDATE then DELETE. Within
//! the insert and update phases masters go before the rows referencing them;
//! deletes run children first. Rows of a reflexive entity are additionally
//! ordered among themselves.

use crate::entity_sorter::{EntitySorter, GraphEntitySorter};
use crate::op::{DbRowOp, DbRowOpKind};
use sqlflush_core::{EntityResolver, Result};
use std::fmt::Debug;
use std::sync::Arc;

/// Puts a flush's operations in executable order.
pub trait DbRowOpSorter: Debug + Send + Sync {
    /// Sort `ops` in place.
    fn sort(&self, ops: &mut [DbRowOp]) -> Result<()>;

    fn sorted(&self, mut ops: Vec<DbRowOp>) -> Result<Vec<DbRowOp>> {
        self.sort(&mut ops)?;
        Ok(ops)
    }
}

/// Sorter combining kind order, entity rank and reflexive row order.
#[derive(Debug, Clone)]
pub struct DefaultDbRowOpSorter {
    entity_sorter: Arc<dyn EntitySorter>,
}

impl DefaultDbRowOpSorter {
    pub fn new(entity_sorter: Arc<dyn EntitySorter>) -> Self {
        Self { entity_sorter }
    }

    /// Sorter ranking the entities of `resolver` by their relationships.
    pub fn from_resolver(resolver: &EntityResolver) -> Result<Self> {
        Ok(Self::new(Arc::new(GraphEntitySorter::new(resolver)?)))
    }

    fn sort_key(&self, op: &DbRowOp) -> (usize, usize) {
        let rank = self.entity_sorter.entity_rank(op.entity_name());
        let rank = match op.kind() {
            DbRowOpKind::Delete => usize::MAX - rank,
            DbRowOpKind::Insert | DbRowOpKind::Update => rank,
        };
        (op.kind().rank(), rank)
    }
}

impl DbRowOpSorter for DefaultDbRowOpSorter {
    #[tracing::instrument(level = "debug", skip(self, ops), fields(ops = ops.len()))]
    fn sort(&self, ops: &mut [DbRowOp]) -> Result<()> {
        ops.sort_by_cached_key(|op| self.sort_key(op));

        let mut reflexive_runs = 0_usize;
        let mut start = 0;
        while start < ops.len() {
            let head = &ops[start];
            let end = start
                + ops[start..]
                    .iter()
                    .take_while(|op| op.kind() == head.kind() && op.entity_name() == head.entity_name())
                    .count();
            let run = &mut ops[start..end];
            if run.len() > 1
                && run[0].kind() != DbRowOpKind::Update
                && self.entity_sorter.is_reflexive(run[0].entity_name())
            {
                self.entity_sorter.sort_reflexive(run)?;
                reflexive_runs += 1;
            }
            start = end;
        }

        tracing::debug!(reflexive_runs, "Sorted row operations");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qualifier::Qualifier;
    use crate::values::Values;
    use sqlflush_core::{DbAttribute, DbEntity, DbJoin, DbRelationship, ObjectId, SqlType};

    fn resolver() -> EntityResolver {
        let mut resolver = EntityResolver::new();
        resolver
            .register(
                DbEntity::new("painting")
                    .with_attribute(DbAttribute::new("id", SqlType::BigInt).primary_key())
                    .with_attribute(DbAttribute::new("artist_id", SqlType::BigInt))
                    .with_relationship(DbRelationship::to_one(
                        "artist",
                        "artist",
                        vec![DbJoin::new("artist_id", "id")],
                    )),
            )
            .unwrap();
        resolver
            .register(
                DbEntity::new("artist")
                    .with_attribute(DbAttribute::new("id", SqlType::BigInt).primary_key())
                    .with_attribute(DbAttribute::new("mentor_id", SqlType::BigInt))
                    .with_relationship(DbRelationship::to_one(
                        "mentor",
                        "artist",
                        vec![DbJoin::new("mentor_id", "id")],
                    )),
            )
            .unwrap();
        resolver
    }

    fn insert(resolver: &EntityResolver, entity: &str, values: Values) -> DbRowOp {
        DbRowOp::insert(resolver.require(entity).unwrap(), ObjectId::temporary(entity), values)
    }

    fn delete(resolver: &EntityResolver, entity: &str, key: i64) -> DbRowOp {
        let id = ObjectId::of(entity, "id", key);
        DbRowOp::delete(resolver.require(entity).unwrap(), id.clone(), Qualifier::from_id(&id))
    }

    fn describe(ops: &[DbRowOp]) -> Vec<String> {
        ops.iter()
            .map(|op| format!("{} {}", op.kind(), op.entity_name()))
            .collect()
    }

    #[test]
    fn test_kind_then_entity_order() {
        let resolver = resolver();
        let sorter = DefaultDbRowOpSorter::from_resolver(&resolver).unwrap();
        let ops = vec![
            delete(&resolver, "artist", 1),
            insert(&resolver, "painting", Values::new()),
            delete(&resolver, "painting", 2),
            insert(&resolver, "artist", Values::new()),
        ];
        let ops = sorter.sorted(ops).unwrap();
        assert_eq!(
            describe(&ops),
            vec![
                "INSERT artist",
                "INSERT painting",
                "DELETE painting",
                "DELETE artist"
            ]
        );
    }

    #[test]
    fn test_reflexive_run_sorted() {
        let resolver = resolver();
        let sorter = DefaultDbRowOpSorter::from_resolver(&resolver).unwrap();
        let mentor = ObjectId::temporary("artist");
        let student = DbRowOp::insert(
            resolver.require("artist").unwrap(),
            ObjectId::temporary("artist"),
            Values::new().with_deferred("mentor_id", mentor.clone(), "id"),
        );
        let mentor_row = DbRowOp::insert(resolver.require("artist").unwrap(), mentor.clone(), Values::new());

        let ops = sorter.sorted(vec![student, mentor_row]).unwrap();
        assert_eq!(ops[0].id(), &mentor);
    }

    #[test]
    fn test_sort_is_stable_within_entity() {
        let resolver = resolver();
        let sorter = DefaultDbRowOpSorter::from_resolver(&resolver).unwrap();
        let ops = vec![
            insert(&resolver, "painting", Values::new().with("id", 1_i64)),
            insert(&resolver, "painting", Values::new().with("id", 2_i64)),
            insert(&resolver, "painting", Values::new().with("id", 3_i64)),
        ];
        let ops = sorter.sorted(ops).unwrap();
        let keys: Vec<_> = ops
            .iter()
            .map(|op| op.values().get("id").and_then(|v| v.as_value()).cloned())
            .collect();
        assert_eq!(
            keys,
            vec![
                Some(sqlflush_core::Value::BigInt(1)),
                Some(sqlflush_core::Value::BigInt(2)),
                Some(sqlflush_core::Value::BigInt(3))
            ]
        );
    }
}
