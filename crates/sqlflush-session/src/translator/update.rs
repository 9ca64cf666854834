use super::{
    BatchShape, BatchTranslator, BindingPlan, BindingRole, DbAttributeBinding, Template, UpdateBatchQuery,
};
use crate::context::FlushContext;
use crate::op::DbRowOp;
use sqlflush_core::{FlushConfig, Result, Value};
use sqlflush_query::SqlBuilder;

/// `UPDATE t SET a = ?, ... WHERE <qualifier>` for rows changing the same
/// attributes.
#[derive(Debug, Clone)]
pub struct UpdateBatchTranslator {
    template: Template,
    locking: bool,
}

impl UpdateBatchTranslator {
    pub fn new(query: &UpdateBatchQuery, config: &FlushConfig) -> Result<Self> {
        let first = query.first_row()?;
        let entity = query.entity();
        let shape = BatchShape::of(first, config);

        let mut plan = BindingPlan::default();
        let mut update = SqlBuilder::update(entity.name.as_str());
        for column in &shape.columns {
            let slot = plan.slot(entity, column, BindingRole::Value)?;
            update = update.set(column.as_str(), slot);
        }
        let tree = update.where_(plan.qualifier(entity, &shape)?).build()?;

        let locking = Template::uses_optimistic_lock(config, first);
        Ok(Self {
            template: Template::new(std::sync::Arc::clone(entity), config, shape, tree, plan),
            locking,
        })
    }
}

impl BatchTranslator for UpdateBatchTranslator {
    fn sql(&mut self) -> Result<&str> {
        self.template.sql()
    }

    fn update_bindings(&mut self, row: &DbRowOp, ctx: &FlushContext) -> Result<&[DbAttributeBinding]> {
        self.template.sql()?;
        self.template.check_row(row)?;

        for index in 0..self.template.bindings.len() {
            if self.template.bindings[index].role != BindingRole::Value {
                continue;
            }
            let value = match row.values().get(&self.template.bindings[index].attribute) {
                Some(source) => source.resolve(ctx)?,
                None => Value::Null,
            };
            self.template.set(index, value)?;
        }
        self.template.bind_qualifier(row)?;
        tracing::trace!(row = %row, "Bound update row");
        Ok(&self.template.bindings)
    }

    fn bindings(&self) -> &[DbAttributeBinding] {
        &self.template.bindings
    }

    fn uses_optimistic_lock(&self) -> bool {
        self.locking
    }
}
