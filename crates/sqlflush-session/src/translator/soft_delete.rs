use super::{BatchShape, BatchTranslator, BindingPlan, BindingRole, DbAttributeBinding, DeleteBatchQuery, Template};
use crate::context::FlushContext;
use crate::op::DbRowOp;
use sqlflush_core::error::TranslationErrorKind;
use sqlflush_core::{Error, FlushConfig, Result, Value};
use sqlflush_query::SqlBuilder;

/// Marks rows deleted instead of removing them:
/// `UPDATE t SET flag = ? WHERE <delete qualifier>`.
///
/// The WHERE clause is the one the hard delete would use.
#[derive(Debug, Clone)]
pub struct SoftDeleteBatchTranslator {
    template: Template,
    deleted_value: Value,
    locking: bool,
}

impl SoftDeleteBatchTranslator {
    pub fn new(query: &DeleteBatchQuery, config: &FlushConfig) -> Result<Self> {
        let entity = query.entity();
        let Some(soft) = config
            .soft_delete
            .as_ref()
            .filter(|soft| entity.attribute(&soft.column).is_some())
        else {
            return Err(Error::translation(
                TranslationErrorKind::MissingSoftDeleteColumn,
                Some(&entity.name),
                "soft delete is not configured for a mapped column",
            ));
        };
        let first = query.first_row()?;
        let shape = BatchShape::of(first, config);

        let mut plan = BindingPlan::default();
        let flag = plan.slot(entity, &soft.column, BindingRole::Value)?;
        let condition = plan.qualifier(entity, &shape)?;
        let tree = SqlBuilder::update(entity.name.as_str())
            .set(soft.column.as_str(), flag)
            .where_(condition)
            .build()?;

        let locking = Template::uses_optimistic_lock(config, first);
        Ok(Self {
            template: Template::new(std::sync::Arc::clone(entity), config, shape, tree, plan),
            deleted_value: soft.deleted_value.clone(),
            locking,
        })
    }
}

impl BatchTranslator for SoftDeleteBatchTranslator {
    fn sql(&mut self) -> Result<&str> {
        self.template.sql()
    }

    fn update_bindings(&mut self, row: &DbRowOp, _ctx: &FlushContext) -> Result<&[DbAttributeBinding]> {
        self.template.sql()?;
        self.template.check_row(row)?;
        // the flag is always the first slot
        self.template.set(0, self.deleted_value.clone())?;
        self.template.bind_qualifier(row)?;
        tracing::trace!(row = %row, "Bound soft delete row");
        Ok(&self.template.bindings)
    }

    fn bindings(&self) -> &[DbAttributeBinding] {
        &self.template.bindings
    }

    fn uses_optimistic_lock(&self) -> bool {
        self.locking
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qualifier::Qualifier;
    use crate::translator::DeleteBatchTranslator;
    use crate::translator::fixtures::{delete, painting};
    use sqlflush_core::{Dialect, ObjectId, SoftDeleteConfig};

    fn where_clause(sql: &str) -> &str {
        sql.split_once(" WHERE ").map_or("", |(_, w)| w)
    }

    #[test]
    fn test_soft_delete_shares_hard_delete_qualifier() {
        let config = FlushConfig::new(Dialect::Postgres).soft_delete(SoftDeleteConfig::new("deleted"));
        let id = ObjectId::of("painting", "id", 5_i64);
        let row = DbRowOp::delete(painting(), id.clone(), Qualifier::from_id(&id).lock("version", 3_i32));
        let query = DeleteBatchQuery::new(painting(), vec![row.clone()]);

        let mut soft = SoftDeleteBatchTranslator::new(&query, &config).unwrap();
        let mut hard = DeleteBatchTranslator::new(&query, &config).unwrap();
        let soft_sql = soft.sql().unwrap().to_string();
        assert_eq!(
            soft_sql,
            "UPDATE painting SET deleted = $1 WHERE id = $2 AND version = $3"
        );
        // placeholders are numbered differently, the column pattern is the same
        assert_eq!(
            where_clause(&soft_sql).replace(['$', '1', '2', '3'], ""),
            where_clause(hard.sql().unwrap()).replace(['$', '1', '2', '3'], "")
        );

        let bindings = soft.update_bindings(&row, &FlushContext::new(config)).unwrap();
        assert_eq!(bindings[0].value, Value::Bool(true));
        assert_eq!(bindings[1].value, Value::BigInt(5));
        assert_eq!(bindings[2].value, Value::Int(3));
        assert!(soft.uses_optimistic_lock());
    }

    #[test]
    fn test_custom_deleted_value_coerced() {
        let config = FlushConfig::new(Dialect::Oracle)
            .soft_delete(SoftDeleteConfig::new("deleted").deleted_value(true));
        let row = delete(9);
        let mut t = SoftDeleteBatchTranslator::new(&DeleteBatchQuery::new(painting(), vec![row.clone()]), &config)
            .unwrap();
        let bindings = t.update_bindings(&row, &FlushContext::new(config)).unwrap();
        assert_eq!(bindings[0].value, Value::SmallInt(1));
    }

    #[test]
    fn test_missing_column_rejected() {
        let config = FlushConfig::new(Dialect::Postgres).soft_delete(SoftDeleteConfig::new("archived"));
        let err = SoftDeleteBatchTranslator::new(&DeleteBatchQuery::new(painting(), vec![delete(1)]), &config)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Translation(ref e) if e.kind == TranslationErrorKind::MissingSoftDeleteColumn
        ));
    }
}
