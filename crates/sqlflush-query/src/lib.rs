//! SQL tree construction and rendering for sqlflush.
//!
//! `sqlflush-query` is the **statement construction layer**. Batch translators
//! describe statements with the fluent builders, the dialect processor
//! rewrites the resulting tree, and the generator renders SQL text plus
//! parameter slots.
//!
//! # Pipeline
//!
//! - **Builders**: [`SqlBuilder`] produces statement builders whose clauses
//!   live in fixed slots and render in canonical order.
//! - **Tree**: [`SqlTree`] is an arena of [`node::Node`]s with parent links.
//! - **Processors**: [`processor_for`] returns the per-dialect rewrite pass.
//! - **Generation**: [`SqlGenerator`] renders placeholders and quoting.

pub mod alias;
pub mod builder;
pub mod case_when;
pub mod generator;
pub mod node;
pub mod processor;

pub use alias::SuppressAliasVisitor;
pub use builder::{
    DeleteBuilder, ExprBuilder, InsertBuilder, SelectBuilder, SqlBuilder, UpdateBuilder,
};
pub use case_when::{CaseWhenBuilder, WhenBuilder};
pub use generator::{ParamSlot, SqlGenerator, Statement};
pub use node::{JoinKind, NodeId, NodeKind, Operator, SqlTree};
pub use processor::{
    Db2Processor, DefaultProcessor, MysqlProcessor, OracleProcessor, PostgresProcessor,
    SqlServerProcessor, SqlTreeProcessor, SqliteProcessor, processor_for,
};

use sqlflush_core::{FlushConfig, Result};

/// Process a tree for the configured dialect and render it.
pub fn render(mut tree: SqlTree, config: &FlushConfig) -> Result<Statement> {
    processor_for(config.dialect).process(&mut tree);
    SqlGenerator::from_config(config).generate(&tree)
}
