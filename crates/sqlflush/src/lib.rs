//! sqlflush - ordering and SQL translation for ORM flushes.
//!
//! sqlflush is the part of an object-relational mapper that runs when a
//! unit of work commits. It takes row operations and produces:
//!
//! - an execution order that respects foreign keys, including rows of a
//!   table referencing the same table
//! - batches of rows that share one parameterized statement
//! - SQL adapted to the target database
//! - per-row parameter bindings, with database-generated keys flowing into
//!   the foreign keys of rows inserted later
//!
//! # Quick Start
//!
//! ```
//! use sqlflush::prelude::*;
//! use std::sync::Arc;
//!
//! let mut resolver = EntityResolver::new();
//! let artist = resolver
//!     .register(
//!         DbEntity::new("artist")
//!             .with_attribute(DbAttribute::new("id", SqlType::BigInt).primary_key())
//!             .with_attribute(DbAttribute::new("name", SqlType::Text)),
//!     )
//!     .unwrap();
//!
//! let config = FlushConfig::new(Dialect::Postgres);
//! let action = FlushAction::with_default_sorter(config.clone(), Arc::new(resolver)).unwrap();
//! let id = ObjectId::of("artist", "id", 1_i64);
//! let op = DbRowOp::delete(artist, id.clone(), Qualifier::from_id(&id));
//!
//! let plan = action.plan(vec![op]).unwrap();
//! let mut translator = batch_translator(&plan.batches()[0], &config).unwrap();
//! assert_eq!(translator.sql().unwrap(), "DELETE FROM artist WHERE id = $1");
//! ```
//!
//! # Statement builders
//!
//! The same builders the translators use are available for ad-hoc SQL:
//!
//! ```
//! use sqlflush::prelude::*;
//!
//! let tree = SqlBuilder::select([SqlBuilder::column("name")])
//!     .where_(SqlBuilder::column("id").eq(7_i64))
//!     .from(SqlBuilder::table("artist"))
//!     .limit(5)
//!     .build()
//!     .unwrap();
//! let statement = sqlflush::render(tree, &FlushConfig::new(Dialect::SqlServer)).unwrap();
//! assert_eq!(statement.sql, "SELECT TOP 5 name FROM artist WHERE id = ?");
//! ```

pub use sqlflush_core::{
    DbAttribute, DbEntity, DbJoin, DbRelationship, Dependency, Dialect, EntityResolver, Error,
    FlushConfig, IdKey, IdentifierQuoting, ObjectId, PlaceholderStyle, Result, SoftDeleteConfig,
    SqlType, Value,
};
pub use sqlflush_core::error;

pub use sqlflush_query::{
    CaseWhenBuilder, DeleteBuilder, ExprBuilder, InsertBuilder, JoinKind, NodeId, NodeKind,
    Operator, ParamSlot, SelectBuilder, SqlBuilder, SqlGenerator, SqlTree, SqlTreeProcessor,
    Statement, SuppressAliasVisitor, UpdateBuilder, WhenBuilder, processor_for, render,
};

pub use sqlflush_session::{
    BatchExecutor, BatchQuery, BatchShape, BatchTranslator, BindingRole, DbAttributeBinding,
    DbRowOp, DbRowOpGraph, DbRowOpKind, DbRowOpSorter, DefaultDbRowOpSorter, EntitySorter,
    FlushAction, FlushContext, FlushPlan, FlushResult, FlushStats, GraphEntitySorter, Qualifier,
    RowResult, ValueSource, Values, batch_translator, coalesce,
};

/// Commonly used items.
pub mod prelude {
    pub use crate::{
        // Metadata
        DbAttribute,
        DbEntity,
        DbJoin,
        DbRelationship,
        Dialect,
        EntityResolver,
        Error,
        FlushConfig,
        ObjectId,
        Result,
        SoftDeleteConfig,
        SqlType,
        Value,
        // SQL trees
        ExprBuilder,
        SqlBuilder,
        SqlTree,
        SqlTreeProcessor,
        // Flush
        BatchExecutor,
        BatchTranslator,
        DbAttributeBinding,
        DbRowOp,
        DbRowOpKind,
        DbRowOpSorter,
        FlushAction,
        FlushContext,
        FlushResult,
        Qualifier,
        RowResult,
        Values,
        batch_translator,
    };
}

#[cfg(test)]
mod tests {
    use super::prelude::*;

    #[test]
    fn test_prelude_covers_a_flush() {
        let mut resolver = EntityResolver::new();
        let entity = resolver
            .register(
                DbEntity::new("gallery")
                    .with_attribute(DbAttribute::new("id", SqlType::Integer).primary_key())
                    .with_attribute(DbAttribute::new("city", SqlType::Text)),
            )
            .unwrap();
        let config = FlushConfig::new(Dialect::Oracle);
        let action = FlushAction::with_default_sorter(config, std::sync::Arc::new(resolver)).unwrap();
        let id = ObjectId::of("gallery", "id", 1);
        let op = DbRowOp::update(
            entity,
            id.clone(),
            Values::new().with("city", "Paris"),
            Qualifier::from_id(&id),
        );
        let plan = action.plan(vec![op]).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.batches()[0].kind(), DbRowOpKind::Update);
    }
}
