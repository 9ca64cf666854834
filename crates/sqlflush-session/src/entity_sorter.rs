//! Entity-level ordering derived from relationship metadata.

use crate::graph::DbRowOpGraph;
use crate::op::{DbRowOp, DbRowOpKind};
use crate::values::ValueSource;
use sqlflush_core::{DbRelationship, EntityResolver, Error, ObjectId, Result, Value};
use std::collections::{HashMap, HashSet};
use std::fmt::Debug;

/// Source of entity ordering for [`crate::DefaultDbRowOpSorter`].
pub trait EntitySorter: Debug + Send + Sync {
    /// Position of the entity in dependency order. Masters rank lower than
    /// the entities referencing them.
    fn entity_rank(&self, entity: &str) -> usize;

    /// Whether rows of the entity can reference other rows of the same entity.
    fn is_reflexive(&self, entity: &str) -> bool;

    /// Reorder a run of operations on one reflexive entity so referenced rows
    /// are inserted first and deleted last.
    fn sort_reflexive(&self, run: &mut [DbRowOp]) -> Result<()>;
}

/// [`EntitySorter`] backed by a dependency graph over registered entities.
#[derive(Debug, Clone, Default)]
pub struct GraphEntitySorter {
    ranks: HashMap<String, usize>,
    reflexive: HashSet<String>,
}

impl GraphEntitySorter {
    /// Rank every entity of the resolver.
    ///
    /// Relationships of an entity to itself are left out of the graph and
    /// handled per row by [`EntitySorter::sort_reflexive`].
    #[tracing::instrument(level = "debug", skip(resolver))]
    pub fn new(resolver: &EntityResolver) -> Result<Self> {
        let mut graph = DbRowOpGraph::new();
        let mut reflexive = HashSet::new();
        for entity in resolver.entities() {
            graph.add_vertex(entity.name.clone());
            if entity.is_reflexive() {
                reflexive.insert(entity.name.clone());
            }
        }
        for entity in resolver.entities() {
            for relationship in entity.relationships() {
                if relationship.is_reflexive(&entity.name) {
                    continue;
                }
                if let Some(dependency) = entity.dependency(relationship) {
                    graph.add(dependency.dependent, dependency.master);
                }
            }
        }

        let ranks: HashMap<String, usize> = graph
            .top_sort()?
            .into_iter()
            .enumerate()
            .map(|(rank, name)| (name, rank))
            .collect();
        tracing::debug!(
            entities = ranks.len(),
            reflexive = reflexive.len(),
            "Ranked entities"
        );
        Ok(Self { ranks, reflexive })
    }
}

impl EntitySorter for GraphEntitySorter {
    fn entity_rank(&self, entity: &str) -> usize {
        self.ranks.get(entity).copied().unwrap_or(usize::MAX)
    }

    fn is_reflexive(&self, entity: &str) -> bool {
        self.reflexive.contains(entity)
    }

    #[tracing::instrument(level = "trace", skip(self, run), fields(rows = run.len()))]
    fn sort_reflexive(&self, run: &mut [DbRowOp]) -> Result<()> {
        let Some(first) = run.first() else {
            return Ok(());
        };
        let deleting = first.kind() == DbRowOpKind::Delete;
        let entity = std::sync::Arc::clone(first.entity());
        let relationships: Vec<&DbRelationship> = entity.reflexive_relationships().collect();

        let mut graph = DbRowOpGraph::new();
        for a in 0..run.len() {
            graph.add_vertex(a);
            for relationship in &relationships {
                for b in 0..run.len() {
                    if a != b && references(&run[a], &run[b], relationship) {
                        // a referencing row is deleted before the row it references
                        if deleting {
                            graph.add(b, a);
                        } else {
                            graph.add(a, b);
                        }
                    }
                }
            }
        }

        let order = graph.try_sort().map_err(|remaining| {
            Error::cycle(remaining.into_iter().map(|i| run[i].id().to_string()).collect())
        })?;
        tracing::trace!(entity = %entity.name, ?order, "Sorted reflexive run");
        permute(run, &order);
        Ok(())
    }
}

/// Foreign key of `row` as seen through one join column.
enum ForeignKey<'a> {
    Deferred(&'a ObjectId),
    Value(&'a Value),
}

fn foreign_key<'a>(row: &'a DbRowOp, attribute: &str) -> Option<ForeignKey<'a>> {
    match row.values().get(attribute) {
        Some(ValueSource::Deferred { id, .. }) => Some(ForeignKey::Deferred(id)),
        Some(ValueSource::Value(value)) => Some(ForeignKey::Value(value)),
        None => row.qualifier().get(attribute).map(ForeignKey::Value),
    }
    .filter(|fk| !matches!(fk, ForeignKey::Value(v) if v.is_null()))
}

fn key_value<'a>(row: &'a DbRowOp, attribute: &str) -> Option<&'a Value> {
    row.id()
        .key_value(attribute)
        .or_else(|| row.values().get(attribute).and_then(ValueSource::as_value))
        .or_else(|| row.qualifier().get(attribute))
}

/// Whether `row` points at `target` through `relationship`, either by a
/// flattened id or through every join column.
fn references(row: &DbRowOp, target: &DbRowOp, relationship: &DbRelationship) -> bool {
    if row.values().flattened_target(&relationship.name) == Some(target.id()) {
        return true;
    }
    !relationship.joins.is_empty()
        && relationship.joins.iter().all(|join| {
            match foreign_key(row, &join.source) {
                Some(ForeignKey::Deferred(id)) => id == target.id(),
                Some(ForeignKey::Value(value)) => {
                    key_value(target, &join.target).is_some_and(|key| key.key_eq(value))
                }
                None => false,
            }
        })
}

/// Reorder `run` so position `k` holds the element previously at `order[k]`.
fn permute<T>(run: &mut [T], order: &[usize]) {
    for (k, &target) in order.iter().enumerate() {
        let mut source = target;
        // earlier swaps moved that element; follow it
        while source < k {
            source = order[source];
        }
        run.swap(k, source);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qualifier::Qualifier;
    use crate::values::Values;
    use sqlflush_core::{DbAttribute, DbEntity, DbJoin, SqlType};
    use std::sync::Arc;

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
                    .with_relationship(DbRelationship::to_many(
                        "paintings",
                        "painting",
                        vec![DbJoin::new("id", "artist_id")],
                    )),
            )
            .unwrap();
        resolver
            .register(
                DbEntity::new("category")
                    .with_attribute(DbAttribute::new("id", SqlType::BigInt).primary_key())
                    .with_attribute(DbAttribute::new("parent_id", SqlType::BigInt))
                    .with_relationship(DbRelationship::to_one(
                        "parent",
                        "category",
                        vec![DbJoin::new("parent_id", "id")],
                    )),
            )
            .unwrap();
        resolver
    }

    #[test]
    fn test_masters_rank_first() {
        let sorter = GraphEntitySorter::new(&resolver()).unwrap();
        assert!(sorter.entity_rank("artist") < sorter.entity_rank("painting"));
        assert_eq!(sorter.entity_rank("unknown"), usize::MAX);
        assert!(sorter.is_reflexive("category"));
        assert!(!sorter.is_reflexive("artist"));
    }

    #[test]
    fn test_entity_cycle_is_fatal() {
        let mut resolver = EntityResolver::new();
        resolver
            .register(
                DbEntity::new("a")
                    .with_attribute(DbAttribute::new("b_id", SqlType::BigInt))
                    .with_relationship(DbRelationship::to_one("b", "b", vec![DbJoin::new("b_id", "id")])),
            )
            .unwrap();
        resolver
            .register(
                DbEntity::new("b")
                    .with_attribute(DbAttribute::new("a_id", SqlType::BigInt))
                    .with_relationship(DbRelationship::to_one("a", "a", vec![DbJoin::new("a_id", "id")])),
            )
            .unwrap();
        assert!(GraphEntitySorter::new(&resolver).unwrap_err().is_cycle());
    }

    fn category(resolver: &EntityResolver) -> Arc<DbEntity> {
        resolver.require("category").unwrap()
    }

    #[test]
    fn test_reflexive_inserts_parent_first() {
        let resolver = resolver();
        let sorter = GraphEntitySorter::new(&resolver).unwrap();
        let root = ObjectId::temporary("category");
        let child = ObjectId::temporary("category");
        let grandchild = ObjectId::temporary("category");

        let mut run = vec![
            DbRowOp::insert(
                category(&resolver),
                grandchild.clone(),
                Values::new().with_deferred("parent_id", child.clone(), "id"),
            ),
            DbRowOp::insert(
                category(&resolver),
                child.clone(),
                Values::new().with_deferred("parent_id", root.clone(), "id"),
            ),
            DbRowOp::insert(category(&resolver), root.clone(), Values::new()),
        ];
        sorter.sort_reflexive(&mut run).unwrap();
        let ids: Vec<_> = run.iter().map(|op| op.id().clone()).collect();
        assert_eq!(ids, vec![root, child, grandchild]);
    }

    #[test]
    fn test_reflexive_deletes_children_first() {
        let resolver = resolver();
        let sorter = GraphEntitySorter::new(&resolver).unwrap();
        let parent = ObjectId::of("category", "id", 1_i64);
        let child = ObjectId::of("category", "id", 2_i64);

        let mut run = vec![
            DbRowOp::delete(category(&resolver), parent.clone(), Qualifier::from_id(&parent)),
            DbRowOp::delete(category(&resolver), child.clone(), Qualifier::from_id(&child))
                .with_values(Values::new().with("parent_id", 1_i64)),
        ];
        sorter.sort_reflexive(&mut run).unwrap();
        assert_eq!(run[0].id(), &child);
        assert_eq!(run[1].id(), &parent);
    }

    #[test]
    fn test_reflexive_order_from_flattened_id() {
        let resolver = resolver();
        let sorter = GraphEntitySorter::new(&resolver).unwrap();
        let parent = ObjectId::temporary("category");
        let child = ObjectId::temporary("category");

        let mut values = Values::new();
        values.add_flattened_id("parent", parent.clone());
        let mut run = vec![
            DbRowOp::insert(category(&resolver), child.clone(), values),
            DbRowOp::insert(category(&resolver), parent.clone(), Values::new()),
        ];
        sorter.sort_reflexive(&mut run).unwrap();
        assert_eq!(run[0].id(), &parent);
        assert_eq!(run[1].id(), &child);
    }

    #[test]
    fn test_reflexive_cycle_names_rows() {
        let resolver = resolver();
        let sorter = GraphEntitySorter::new(&resolver).unwrap();
        let a = ObjectId::of("category", "id", 1_i64);
        let b = ObjectId::of("category", "id", 2_i64);
        let mut run = vec![
            DbRowOp::insert(category(&resolver), a, Values::new().with("parent_id", 2_i64)),
            DbRowOp::insert(category(&resolver), b, Values::new().with("parent_id", 1_i64)),
        ];
        let err = sorter.sort_reflexive(&mut run).unwrap_err();
        assert!(err.is_cycle());
        assert!(err.to_string().contains("category"));
    }

    #[test]
    fn test_permute() {
        let mut items = vec!['a', 'b', 'c', 'd'];
        permute(&mut items, &[2, 0, 3, 1]);
        assert_eq!(items, vec!['c', 'a', 'd', 'b']);
    }
}
