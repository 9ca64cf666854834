use super::{BatchShape, BatchTranslator, BindingPlan, BindingRole, DbAttributeBinding, InsertBatchQuery, Template};
use crate::context::FlushContext;
use crate::op::DbRowOp;
use sqlflush_core::{DbAttribute, FlushConfig, Result, Value};
use sqlflush_query::SqlBuilder;

/// `INSERT INTO t (cols) VALUES (?, ...)` over every insertable attribute.
#[derive(Debug, Clone)]
pub struct InsertBatchTranslator {
    template: Template,
    generated_keys: bool,
}

/// Generated columns are left to the database, except a generated primary
/// key when the driver cannot return it.
fn is_insertable(attribute: &DbAttribute, config: &FlushConfig) -> bool {
    !(attribute.generated && (!attribute.primary_key || config.generated_keys_enabled()))
}

impl InsertBatchTranslator {
    pub fn new(query: &InsertBatchQuery, config: &FlushConfig) -> Result<Self> {
        let first = query.first_row()?;
        let entity = query.entity();

        let mut plan = BindingPlan::default();
        let mut insert = SqlBuilder::insert(entity.name.as_str());
        for attribute in entity.attributes().iter().filter(|a| is_insertable(a, config)) {
            let slot = plan.slot(entity, &attribute.name, BindingRole::Value)?;
            insert = insert.column(attribute.name.as_str()).value(slot);
        }
        let tree = insert.build()?;

        let generated_keys = config.generated_keys_enabled()
            && entity.primary_keys().any(|pk| pk.generated);
        Ok(Self {
            template: Template::new(
                std::sync::Arc::clone(entity),
                config,
                BatchShape::of(first, config),
                tree,
                plan,
            ),
            generated_keys,
        })
    }
}

impl BatchTranslator for InsertBatchTranslator {
    fn sql(&mut self) -> Result<&str> {
        self.template.sql()
    }

    fn update_bindings(&mut self, row: &DbRowOp, ctx: &FlushContext) -> Result<&[DbAttributeBinding]> {
        self.template.sql()?;
        self.template.check_row(row)?;
        self.template.check_attributes(row)?;

        for index in 0..self.template.bindings.len() {
            let attribute = self.template.bindings[index].attribute.clone();
            let entity = &self.template.entity;
            let value = if let Some(source) = row.values().get(&attribute) {
                source.resolve(ctx)?
            } else if let Some(source) = row.values().flattened_source(entity, &attribute) {
                source.resolve(ctx)?
            } else if entity.attribute(&attribute).is_some_and(|a| a.primary_key) {
                ctx.resolve(row.id(), &attribute)?
            } else {
                Value::Null
            };
            self.template.set(index, value)?;
        }
        tracing::trace!(row = %row, "Bound insert row");
        Ok(&self.template.bindings)
    }

    fn bindings(&self) -> &[DbAttributeBinding] {
        &self.template.bindings
    }

    fn wants_generated_keys(&self) -> bool {
        self.generated_keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translator::fixtures::painting;
    use crate::values::Values;
    use sqlflush_core::{DbEntity, Dialect, Error, ObjectId, SqlType};
    use sqlflush_core::error::TranslationErrorKind;
    use std::sync::Arc;

    fn insert(values: Values) -> DbRowOp {
        DbRowOp::insert(painting(), ObjectId::temporary("painting"), values)
    }

    fn translator(config: &FlushConfig, rows: Vec<DbRowOp>) -> InsertBatchTranslator {
        InsertBatchTranslator::new(&InsertBatchQuery::new(painting(), rows), config).unwrap()
    }

    fn attributes(bindings: &[DbAttributeBinding]) -> Vec<String> {
        bindings.iter().map(|b| b.attribute.clone()).collect()
    }

    #[test]
    fn test_generated_pk_excluded_when_keys_supported() {
        let config = FlushConfig::new(Dialect::Postgres).supports_generated_keys(true);
        let mut t = translator(&config, vec![insert(Values::new())]);
        assert_eq!(
            t.sql().unwrap(),
            "INSERT INTO painting (title, artist_id, price, version, deleted) VALUES ($1, $2, $3, $4, $5)"
        );
        assert!(t.wants_generated_keys());
    }

    #[test]
    fn test_generated_pk_included_without_key_support() {
        let config = FlushConfig::new(Dialect::Postgres).supports_generated_keys(false);
        let mut t = translator(&config, vec![insert(Values::new())]);
        assert!(t.sql().unwrap().starts_with("INSERT INTO painting (id, title"));
        assert!(!t.wants_generated_keys());
    }

    #[test]
    fn test_bindings_stable_across_rows() {
        let config = FlushConfig::new(Dialect::Sqlite).supports_generated_keys(true);
        let rows = vec![
            insert(Values::new().with("title", "Water Lilies").with("price", 10.5)),
            insert(Values::new().with("deleted", true)),
            insert(Values::new().with("artist_id", 3_i64).with("title", "Haystacks")),
        ];
        let mut t = translator(&config, rows.clone());
        let sql = t.sql().unwrap().to_string();
        let ctx = FlushContext::new(config.clone());

        let mut shapes = Vec::new();
        for row in &rows {
            let bindings = t.update_bindings(row, &ctx).unwrap();
            shapes.push(attributes(bindings));
        }
        assert!(shapes.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(t.sql().unwrap(), sql);

        // last row bound; missing values are NULL
        let bound = t.bindings();
        assert_eq!(bound[0].value, Value::Text("Haystacks".to_string()));
        assert_eq!(bound[1].value, Value::BigInt(3));
        assert_eq!(bound[2].value, Value::Null);
        assert!(bound.iter().all(|b| b.role == BindingRole::Value));
        let positions: Vec<_> = bound.iter().map(|b| b.position).collect();
        assert_eq!(positions, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_boolean_coerced_without_native_booleans() {
        let config = FlushConfig::new(Dialect::SqlServer);
        let row = insert(Values::new().with("deleted", true));
        let mut t = translator(&config, vec![row.clone()]);
        let ctx = FlushContext::new(config.clone());
        let bindings = t.update_bindings(&row, &ctx).unwrap();
        assert_eq!(bindings[4].value, Value::SmallInt(1));
    }

    #[test]
    fn test_deferred_fk_resolves_from_context() {
        let config = FlushConfig::new(Dialect::Postgres);
        let artist = ObjectId::temporary("artist");
        let row = insert(Values::new().with_deferred("artist_id", artist.clone(), "id"));
        let mut t = translator(&config, vec![row.clone()]);

        let mut ctx = FlushContext::new(config.clone());
        assert!(t.update_bindings(&row, &ctx).is_err());
        ctx.record_generated_keys(&artist, vec![("id".to_string(), Value::BigInt(11))]);
        let bindings = t.update_bindings(&row, &ctx).unwrap();
        assert_eq!(bindings[1].attribute, "artist_id");
        assert_eq!(bindings[1].value, Value::BigInt(11));
    }

    #[test]
    fn test_flattened_id_binds_join_column() {
        let config = FlushConfig::new(Dialect::Postgres);
        let artist = ObjectId::temporary("artist");
        let mut values = Values::new().with("title", "Olympia");
        values.add_flattened_id("artist", artist.clone());
        let row = insert(values);
        let mut t = translator(&config, vec![row.clone()]);

        let mut ctx = FlushContext::new(config.clone());
        ctx.record_generated_keys(&artist, vec![("id".to_string(), Value::BigInt(21))]);
        let bindings = t.update_bindings(&row, &ctx).unwrap();
        assert_eq!(bindings[1].attribute, "artist_id");
        assert_eq!(bindings[1].value, Value::BigInt(21));

        // an explicit value still wins over the flattened id
        let mut values = Values::new().with("artist_id", 4_i64);
        values.add_flattened_id("artist", artist);
        let bindings = t.update_bindings(&insert(values), &ctx).unwrap();
        assert_eq!(bindings[1].value, Value::BigInt(4));
    }

    #[test]
    fn test_assigned_pk_taken_from_permanent_id() {
        let entity = Arc::new(
            DbEntity::new("gallery")
                .with_attribute(sqlflush_core::DbAttribute::new("code", SqlType::Text).primary_key())
                .with_attribute(sqlflush_core::DbAttribute::new("name", SqlType::Text)),
        );
        let row = DbRowOp::insert(
            Arc::clone(&entity),
            ObjectId::of("gallery", "code", "LVR"),
            Values::new().with("name", "Louvre"),
        );
        let config = FlushConfig::new(Dialect::Mysql);
        let mut t = InsertBatchTranslator::new(&InsertBatchQuery::new(entity, vec![row.clone()]), &config).unwrap();
        assert_eq!(t.sql().unwrap(), "INSERT INTO gallery (code, name) VALUES (?, ?)");
        let ctx = FlushContext::new(config);
        let bindings = t.update_bindings(&row, &ctx).unwrap();
        assert_eq!(bindings[0].value, Value::Text("LVR".to_string()));
    }

    #[test]
    fn test_unknown_attribute_rejected() {
        let config = FlushConfig::new(Dialect::Postgres);
        let row = insert(Values::new().with("colour", "blue"));
        let mut t = translator(&config, vec![row.clone()]);
        let err = t.update_bindings(&row, &FlushContext::new(config)).unwrap_err();
        assert!(matches!(
            err,
            Error::Translation(ref e) if e.kind == TranslationErrorKind::UnknownAttribute
        ));
    }
}
