use super::{BatchShape, BatchTranslator, BindingPlan, DbAttributeBinding, DeleteBatchQuery, Template};
use crate::context::FlushContext;
use crate::op::DbRowOp;
use sqlflush_core::{FlushConfig, Result};
use sqlflush_query::SqlBuilder;

/// `DELETE FROM t WHERE <qualifier>`.
#[derive(Debug, Clone)]
pub struct DeleteBatchTranslator {
    template: Template,
    locking: bool,
}

impl DeleteBatchTranslator {
    pub fn new(query: &DeleteBatchQuery, config: &FlushConfig) -> Result<Self> {
        let first = query.first_row()?;
        let entity = query.entity();
        let shape = BatchShape::of(first, config);

        let mut plan = BindingPlan::default();
        let condition = plan.qualifier(entity, &shape)?;
        let tree = SqlBuilder::delete(entity.name.as_str()).where_(condition).build()?;

        let locking = Template::uses_optimistic_lock(config, first);
        Ok(Self {
            template: Template::new(std::sync::Arc::clone(entity), config, shape, tree, plan),
            locking,
        })
    }
}

impl BatchTranslator for DeleteBatchTranslator {
    fn sql(&mut self) -> Result<&str> {
        self.template.sql()
    }

    fn update_bindings(&mut self, row: &DbRowOp, _ctx: &FlushContext) -> Result<&[DbAttributeBinding]> {
        self.template.sql()?;
        self.template.check_row(row)?;
        self.template.bind_qualifier(row)?;
        tracing::trace!(row = %row, "Bound delete row");
        Ok(&self.template.bindings)
    }

    fn bindings(&self) -> &[DbAttributeBinding] {
        &self.template.bindings
    }

    fn uses_optimistic_lock(&self) -> bool {
        self.locking
    }
}
