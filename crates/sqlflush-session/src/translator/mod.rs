//! Translation of homogeneous row batches into parameterized SQL.
//!
//! A batch holds rows of one entity and one kind that share a
//! [`BatchShape`], so a single statement serves every row. The translator
//! generates that statement once and afterwards only repopulates the values
//! of its [`DbAttributeBinding`] array for each row.

mod delete;
mod insert;
mod soft_delete;
mod update;

pub use delete::DeleteBatchTranslator;
pub use insert::InsertBatchTranslator;
pub use soft_delete::SoftDeleteBatchTranslator;
pub use update::UpdateBatchTranslator;

use crate::context::FlushContext;
use crate::op::{DbRowOp, DbRowOpKind};
use sqlflush_core::error::TranslationErrorKind;
use sqlflush_core::{DbEntity, Error, FlushConfig, Result, SqlType, Value};
use sqlflush_query::{ExprBuilder, SqlBuilder, SqlTree, Statement};
use std::sync::Arc;

// ==================== Batch Queries ====================

/// Rows to insert into one table.
#[derive(Debug, Clone)]
pub struct InsertBatchQuery {
    entity: Arc<DbEntity>,
    rows: Vec<DbRowOp>,
}

/// Rows of one table to update with the same column set.
#[derive(Debug, Clone)]
pub struct UpdateBatchQuery {
    entity: Arc<DbEntity>,
    rows: Vec<DbRowOp>,
}

/// Rows to delete from one table.
#[derive(Debug, Clone)]
pub struct DeleteBatchQuery {
    entity: Arc<DbEntity>,
    rows: Vec<DbRowOp>,
}

macro_rules! batch_query_accessors {
    ($($query:ident),*) => {$(
        impl $query {
            pub fn new(entity: Arc<DbEntity>, rows: Vec<DbRowOp>) -> Self {
                Self { entity, rows }
            }

            pub fn entity(&self) -> &Arc<DbEntity> {
                &self.entity
            }

            pub fn rows(&self) -> &[DbRowOp] {
                &self.rows
            }

            fn first_row(&self) -> Result<&DbRowOp> {
                self.rows.first().ok_or_else(|| {
                    Error::translation(
                        TranslationErrorKind::EmptyBatch,
                        Some(&self.entity.name),
                        "batch has no rows",
                    )
                })
            }
        }
    )*};
}

batch_query_accessors!(InsertBatchQuery, UpdateBatchQuery, DeleteBatchQuery);

/// A batch of row operations ready for translation.
#[derive(Debug, Clone)]
pub enum BatchQuery {
    Insert(InsertBatchQuery),
    Update(UpdateBatchQuery),
    Delete(DeleteBatchQuery),
}

impl BatchQuery {
    /// Wrap rows in the batch type matching the first row's kind.
    pub fn from_rows(entity: Arc<DbEntity>, rows: Vec<DbRowOp>) -> Result<Self> {
        let Some(first) = rows.first() else {
            return Err(Error::translation(
                TranslationErrorKind::EmptyBatch,
                Some(&entity.name),
                "batch has no rows",
            ));
        };
        Ok(match first.kind() {
            DbRowOpKind::Insert => BatchQuery::Insert(InsertBatchQuery::new(entity, rows)),
            DbRowOpKind::Update => BatchQuery::Update(UpdateBatchQuery::new(entity, rows)),
            DbRowOpKind::Delete => BatchQuery::Delete(DeleteBatchQuery::new(entity, rows)),
        })
    }

    pub fn kind(&self) -> DbRowOpKind {
        match self {
            BatchQuery::Insert(_) => DbRowOpKind::Insert,
            BatchQuery::Update(_) => DbRowOpKind::Update,
            BatchQuery::Delete(_) => DbRowOpKind::Delete,
        }
    }

    pub fn entity(&self) -> &Arc<DbEntity> {
        match self {
            BatchQuery::Insert(q) => q.entity(),
            BatchQuery::Update(q) => q.entity(),
            BatchQuery::Delete(q) => q.entity(),
        }
    }

    pub fn rows(&self) -> &[DbRowOp] {
        match self {
            BatchQuery::Insert(q) => q.rows(),
            BatchQuery::Update(q) => q.rows(),
            BatchQuery::Delete(q) => q.rows(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows().is_empty()
    }
}

// ==================== Batch Shape ====================

/// One qualifier column of a batch shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualifierColumn {
    pub attribute: String,
    /// Rendered as `IS NULL` without a binding
    pub is_null: bool,
}

/// Everything about a row that affects the SQL text generated for it.
///
/// Rows with equal shapes can share one statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchShape {
    pub kind: DbRowOpKind,
    pub entity: String,
    /// Updated attributes, in order (UPDATE only)
    pub columns: Vec<String>,
    pub qualifier: Vec<QualifierColumn>,
}

impl BatchShape {
    pub fn of(row: &DbRowOp, config: &FlushConfig) -> Self {
        let columns = match row.kind() {
            DbRowOpKind::Update => row.values().updated_attributes().map(str::to_string).collect(),
            DbRowOpKind::Insert | DbRowOpKind::Delete => Vec::new(),
        };
        let qualifier = match row.kind() {
            DbRowOpKind::Insert => Vec::new(),
            DbRowOpKind::Update | DbRowOpKind::Delete => row
                .qualifier()
                .entries(config.use_optimistic_locking)
                .map(|e| QualifierColumn {
                    attribute: e.attribute.clone(),
                    is_null: e.value.is_null(),
                })
                .collect(),
        };
        Self {
            kind: row.kind(),
            entity: row.entity_name().to_string(),
            columns,
            qualifier,
        }
    }
}

// ==================== Bindings ====================

/// Which part of the statement a binding belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingRole {
    /// VALUES or SET
    Value,
    /// WHERE
    Qualifier,
}

/// One statement parameter, repopulated for every row of the batch.
#[derive(Debug, Clone, PartialEq)]
pub struct DbAttributeBinding {
    /// 1-based parameter position
    pub position: usize,
    pub attribute: String,
    pub sql_type: SqlType,
    pub value: Value,
    pub role: BindingRole,
}

// ==================== Translator ====================

/// Generates the SQL of one batch and the per-row parameter bindings.
pub trait BatchTranslator {
    /// The statement text, generated on first call.
    fn sql(&mut self) -> Result<&str>;

    /// Bind the values of `row`. The array keeps its length and order across
    /// rows; only values change.
    fn update_bindings(&mut self, row: &DbRowOp, ctx: &FlushContext) -> Result<&[DbAttributeBinding]>;

    fn bindings(&self) -> &[DbAttributeBinding];

    /// Whether the executor should return generated keys for each row.
    fn wants_generated_keys(&self) -> bool {
        false
    }

    /// Whether a row count of zero means a concurrent modification.
    fn uses_optimistic_lock(&self) -> bool {
        false
    }
}

/// Pick the translator for a batch.
///
/// Deletes become soft deletes when configured and the entity maps the flag
/// column; otherwise rows are deleted for real.
pub fn batch_translator(query: &BatchQuery, config: &FlushConfig) -> Result<Box<dyn BatchTranslator>> {
    Ok(match query {
        BatchQuery::Insert(q) => Box::new(InsertBatchTranslator::new(q, config)?),
        BatchQuery::Update(q) => Box::new(UpdateBatchTranslator::new(q, config)?),
        BatchQuery::Delete(q) => match &config.soft_delete {
            Some(soft) if q.entity().attribute(&soft.column).is_some() => {
                Box::new(SoftDeleteBatchTranslator::new(q, config)?)
            }
            Some(soft) => {
                tracing::debug!(
                    entity = %q.entity().name,
                    column = %soft.column,
                    "Entity has no soft delete column, deleting rows"
                );
                Box::new(DeleteBatchTranslator::new(q, config)?)
            }
            None => Box::new(DeleteBatchTranslator::new(q, config)?),
        },
    })
}

// ==================== Shared Machinery ====================

/// A statement tree plus the bindings its placeholders correspond to.
#[derive(Debug, Clone)]
struct Template {
    entity: Arc<DbEntity>,
    config: FlushConfig,
    shape: BatchShape,
    tree: SqlTree,
    sql: Option<String>,
    bindings: Vec<DbAttributeBinding>,
}

/// Collects placeholder expressions and their bindings in emission order.
#[derive(Debug, Default)]
struct BindingPlan {
    bindings: Vec<DbAttributeBinding>,
}

impl BindingPlan {
    fn slot(&mut self, entity: &DbEntity, attribute: &str, role: BindingRole) -> Result<ExprBuilder> {
        let sql_type = entity
            .attribute(attribute)
            .map(|a| a.sql_type.clone())
            .ok_or_else(|| unknown_attribute(entity, attribute))?;
        self.bindings.push(DbAttributeBinding {
            position: self.bindings.len() + 1,
            attribute: attribute.to_string(),
            sql_type,
            value: Value::Null,
            role,
        });
        Ok(SqlBuilder::bound(attribute, Value::Null))
    }

    /// WHERE condition over the shape's qualifier columns.
    fn qualifier(&mut self, entity: &DbEntity, shape: &BatchShape) -> Result<ExprBuilder> {
        if shape.qualifier.is_empty() {
            return Err(Error::translation(
                TranslationErrorKind::EmptyQualifier,
                Some(&entity.name),
                format!("{} needs at least one qualifier attribute", shape.kind),
            ));
        }
        let mut conditions = Vec::with_capacity(shape.qualifier.len());
        for column in &shape.qualifier {
            let target = SqlBuilder::column(column.attribute.as_str());
            conditions.push(if column.is_null {
                target.is_null()
            } else {
                target.eq(self.slot(entity, &column.attribute, BindingRole::Qualifier)?)
            });
        }
        Ok(SqlBuilder::and(conditions))
    }
}

impl Template {
    fn new(
        entity: Arc<DbEntity>,
        config: &FlushConfig,
        shape: BatchShape,
        tree: SqlTree,
        plan: BindingPlan,
    ) -> Self {
        Self {
            entity,
            config: config.clone(),
            shape,
            tree,
            sql: None,
            bindings: plan.bindings,
        }
    }

    fn sql(&mut self) -> Result<&str> {
        let sql = match self.sql.take() {
            Some(sql) => sql,
            None => {
                let statement = sqlflush_query::render(self.tree.clone(), &self.config)?;
                self.check_params(&statement)?;
                tracing::debug!(
                    entity = %self.entity.name,
                    kind = %self.shape.kind,
                    bindings = self.bindings.len(),
                    sql = %statement.sql,
                    "Generated batch SQL"
                );
                statement.sql
            }
        };
        Ok(self.sql.insert(sql).as_str())
    }

    /// The generated placeholders must line up with the planned bindings.
    fn check_params(&self, statement: &Statement) -> Result<()> {
        let aligned = statement.params.len() == self.bindings.len()
            && statement.params.iter().zip(&self.bindings).all(|(param, binding)| {
                param.position == binding.position
                    && param.attribute.as_deref() == Some(binding.attribute.as_str())
            });
        if aligned {
            Ok(())
        } else {
            Err(Error::translation(
                TranslationErrorKind::ShapeMismatch,
                Some(&self.entity.name),
                format!(
                    "statement has {} parameters for {} bindings",
                    statement.params.len(),
                    self.bindings.len()
                ),
            ))
        }
    }

    fn check_row(&self, row: &DbRowOp) -> Result<()> {
        if row.kind() != self.shape.kind {
            return Err(Error::translation(
                TranslationErrorKind::UnsupportedBatch,
                Some(&self.entity.name),
                format!("{row} placed in a {} batch", self.shape.kind),
            ));
        }
        let shape = BatchShape::of(row, &self.config);
        if shape != self.shape {
            return Err(Error::translation(
                TranslationErrorKind::ShapeMismatch,
                Some(&self.entity.name),
                format!("{row} does not match the batch statement"),
            ));
        }
        Ok(())
    }

    /// Values must name mapped attributes.
    fn check_attributes(&self, row: &DbRowOp) -> Result<()> {
        match row
            .values()
            .updated_attributes()
            .find(|name| self.entity.attribute(name).is_none())
        {
            Some(name) => Err(unknown_attribute(&self.entity, name)),
            None => Ok(()),
        }
    }

    fn set(&mut self, index: usize, value: Value) -> Result<()> {
        let native = self.config.native_booleans();
        let binding = &mut self.bindings[index];
        binding.value = binding.sql_type.coerce(value, native)?;
        Ok(())
    }

    /// Fill qualifier bindings from the row's snapshot.
    fn bind_qualifier(&mut self, row: &DbRowOp) -> Result<()> {
        for index in 0..self.bindings.len() {
            if self.bindings[index].role != BindingRole::Qualifier {
                continue;
            }
            let value = row
                .qualifier()
                .get(&self.bindings[index].attribute)
                .cloned()
                .unwrap_or(Value::Null);
            self.set(index, value)?;
        }
        Ok(())
    }

    /// Whether rows shaped like `row` are qualified by lock attributes.
    fn uses_optimistic_lock(config: &FlushConfig, row: &DbRowOp) -> bool {
        config.use_optimistic_locking && row.qualifier().has_lock_attributes()
    }
}

fn unknown_attribute(entity: &DbEntity, attribute: &str) -> Error {
    Error::translation(
        TranslationErrorKind::UnknownAttribute,
        Some(&entity.name),
        format!("attribute '{attribute}' is not mapped"),
    )
}
