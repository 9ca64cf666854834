//! Flush planning and execution.
//!
//! A flush turns the row operations collected for a commit into batches of
//! parameterized statements:
//! - operations on the same row are coalesced into one
//! - operations are sorted (INSERT parents first, UPDATE, DELETE children first)
//! - contiguous operations with the same statement shape are batched
//!
//! Executing a plan hands each bound row to a [`BatchExecutor`], which owns
//! the database connection.

use crate::context::FlushContext;
use crate::entity_sorter::GraphEntitySorter;
use crate::op::{DbRowOp, DbRowOpKind};
use crate::sorter::{DbRowOpSorter, DefaultDbRowOpSorter};
use crate::translator::{BatchQuery, BatchShape, DbAttributeBinding, batch_translator};
use serde::Serialize;
use sqlflush_core::error::ExecutionErrorKind;
use sqlflush_core::{EntityResolver, Error, FlushConfig, ObjectId, Result, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Outcome of executing one bound row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowResult {
    /// Rows affected by the statement.
    pub affected: u64,
    /// Key values generated by the database, for inserts.
    pub generated_keys: Vec<(String, Value)>,
}

impl RowResult {
    pub fn affected(affected: u64) -> Self {
        Self {
            affected,
            generated_keys: Vec::new(),
        }
    }

    /// Add a generated key value.
    pub fn with_key(mut self, attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        self.generated_keys.push((attribute.into(), value.into()));
        self
    }
}

/// Runs statements against the database.
pub trait BatchExecutor {
    /// Execute `sql` once with `bindings`.
    ///
    /// When `want_generated_keys` is set the result must carry the key
    /// values the database generated for the inserted row.
    fn execute_row(
        &mut self,
        sql: &str,
        bindings: &[DbAttributeBinding],
        want_generated_keys: bool,
    ) -> Result<RowResult>;
}

/// Result of executing a flush plan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FlushResult {
    /// Number of rows inserted.
    pub inserted: usize,
    /// Number of rows updated.
    pub updated: usize,
    /// Number of rows deleted, including soft deletes.
    pub deleted: usize,
    /// Number of statements prepared.
    pub batches: usize,
}

impl FlushResult {
    /// Create a new empty result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of row operations.
    pub fn total(&self) -> usize {
        self.inserted + self.updated + self.deleted
    }

    fn count(&mut self, kind: DbRowOpKind) {
        match kind {
            DbRowOpKind::Insert => self.inserted += 1,
            DbRowOpKind::Update => self.updated += 1,
            DbRowOpKind::Delete => self.deleted += 1,
        }
    }
}

/// Merge operations targeting the same row, keeping first-seen order.
///
/// Updates left without any changed attribute are dropped.
pub fn coalesce(ops: Vec<DbRowOp>) -> Result<Vec<DbRowOp>> {
    let total = ops.len();
    let mut index: HashMap<ObjectId, usize> = HashMap::new();
    let mut merged: Vec<Option<DbRowOp>> = Vec::with_capacity(total);

    for op in ops {
        match index.get(op.id()) {
            Some(&i) => {
                merged[i] = match merged[i].take() {
                    Some(previous) => previous.merge(op)?,
                    // an insert and delete cancelled out; start over
                    None => Some(op),
                };
            }
            None => {
                index.insert(op.id().clone(), merged.len());
                merged.push(Some(op));
            }
        }
    }

    let ops: Vec<DbRowOp> = merged
        .into_iter()
        .flatten()
        .filter(|op| {
            let noop = op.kind() == DbRowOpKind::Update && op.values().is_empty();
            if noop {
                tracing::debug!(row = %op, "Dropping update without changes");
            }
            !noop
        })
        .collect();
    tracing::debug!(before = total, after = ops.len(), "Coalesced row operations");
    Ok(ops)
}

/// Plans flushes: coalescing, ordering and batching of row operations.
#[derive(Debug, Clone)]
pub struct FlushAction {
    config: FlushConfig,
    resolver: Arc<EntityResolver>,
    sorter: Arc<dyn DbRowOpSorter>,
}

impl FlushAction {
    pub fn new(config: FlushConfig, resolver: Arc<EntityResolver>, sorter: Arc<dyn DbRowOpSorter>) -> Self {
        Self {
            config,
            resolver,
            sorter,
        }
    }

    /// Flush action ordering entities by the resolver's relationships.
    pub fn with_default_sorter(config: FlushConfig, resolver: Arc<EntityResolver>) -> Result<Self> {
        let entity_sorter = GraphEntitySorter::new(&resolver)?;
        let sorter = DefaultDbRowOpSorter::new(Arc::new(entity_sorter));
        Ok(Self::new(config, resolver, Arc::new(sorter)))
    }

    pub fn config(&self) -> &FlushConfig {
        &self.config
    }

    /// Coalesce, sort and batch `ops`.
    #[tracing::instrument(level = "info", skip(self, ops), fields(ops = ops.len()))]
    pub fn plan(&self, ops: Vec<DbRowOp>) -> Result<FlushPlan> {
        self.config.validate()?;
        for op in &ops {
            self.resolver.require(op.entity_name())?;
        }

        let mut ops = coalesce(ops)?;
        self.sorter.sort(&mut ops)?;

        let limit = self.config.batch_limit();
        let mut batches = Vec::new();
        let mut current: Vec<DbRowOp> = Vec::new();
        let mut current_shape: Option<BatchShape> = None;
        for op in ops {
            let shape = BatchShape::of(&op, &self.config);
            let full = limit.is_some_and(|limit| current.len() >= limit);
            if full || current_shape.as_ref() != Some(&shape) {
                if let Some(first) = current.first() {
                    let entity = Arc::clone(first.entity());
                    batches.push(BatchQuery::from_rows(entity, std::mem::take(&mut current))?);
                }
                current_shape = Some(shape);
            }
            current.push(op);
        }
        if let Some(first) = current.first() {
            let entity = Arc::clone(first.entity());
            batches.push(BatchQuery::from_rows(entity, current)?);
        }

        tracing::info!(
            batches = batches.len(),
            inserts = batches.iter().filter(|b| b.kind() == DbRowOpKind::Insert).count(),
            updates = batches.iter().filter(|b| b.kind() == DbRowOpKind::Update).count(),
            deletes = batches.iter().filter(|b| b.kind() == DbRowOpKind::Delete).count(),
            "Planned flush"
        );
        Ok(FlushPlan { batches })
    }

    /// Plan `ops` and execute the plan.
    pub fn run(
        &self,
        ops: Vec<DbRowOp>,
        executor: &mut dyn BatchExecutor,
        ctx: &mut FlushContext,
    ) -> Result<FlushResult> {
        self.plan(ops)?.execute(executor, ctx)
    }
}

/// Ordered batches of a flush.
#[derive(Debug, Clone, Default)]
pub struct FlushPlan {
    batches: Vec<BatchQuery>,
}

impl FlushPlan {
    pub fn batches(&self) -> &[BatchQuery] {
        &self.batches
    }

    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// Operations in execution order.
    pub fn ops(&self) -> impl Iterator<Item = &DbRowOp> {
        self.batches.iter().flat_map(BatchQuery::rows)
    }

    /// Execute every batch in order.
    ///
    /// Stops at the first error; the caller is expected to roll back.
    #[tracing::instrument(level = "info", skip(self, executor, ctx), fields(batches = self.batches.len()))]
    pub fn execute(&self, executor: &mut dyn BatchExecutor, ctx: &mut FlushContext) -> Result<FlushResult> {
        let mut result = FlushResult::new();

        for batch in &self.batches {
            let mut translator = batch_translator(batch, ctx.config())?;
            let sql = translator.sql()?.to_string();
            let want_keys = translator.wants_generated_keys();
            let locking = translator.uses_optimistic_lock();
            ctx.stats_mut().statements += 1;
            result.batches += 1;
            tracing::debug!(
                entity = %batch.entity().name,
                kind = %batch.kind(),
                rows = batch.len(),
                "Executing batch"
            );

            for row in batch.rows() {
                let bindings = translator.update_bindings(row, ctx)?;
                let outcome = executor.execute_row(&sql, bindings, want_keys)?;
                ctx.stats_mut().rows_bound += 1;

                if want_keys {
                    if outcome.generated_keys.is_empty() {
                        return Err(Error::execution(
                            ExecutionErrorKind::MissingGeneratedKeys,
                            Some(&sql),
                            format!("no generated keys returned for {row}"),
                        ));
                    }
                    ctx.record_generated_keys(row.id(), outcome.generated_keys);
                } else if outcome.affected == 0 && row.kind() != DbRowOpKind::Insert {
                    if locking {
                        return Err(Error::execution(
                            ExecutionErrorKind::UpdateCount,
                            Some(&sql),
                            format!("{row} matched no rows, it was changed or removed concurrently"),
                        ));
                    }
                    tracing::warn!(row = %row, "Statement affected no rows");
                }
                result.count(row.kind());
            }
        }

        tracing::info!(
            inserted = result.inserted,
            updated = result.updated,
            deleted = result.deleted,
            batches = result.batches,
            "Flush complete"
        );
        Ok(result)
    }
}
