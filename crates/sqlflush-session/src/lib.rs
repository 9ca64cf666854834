//! Row operation ordering and batch translation for sqlflush.
//!
//! `sqlflush-session` is the **flush layer**. It takes the row operations a
//! commit produced and turns them into ordered, bound, dialect-correct
//! statements.
//!
//! # Pipeline
//!
//! - **Coalescing**: [`flush::coalesce`] folds operations on the same row.
//! - **Sorting**: [`DefaultDbRowOpSorter`] orders operations by kind and
//!   entity dependencies, and reflexive rows among themselves.
//! - **Batching**: [`FlushAction::plan`] groups rows sharing a statement
//!   shape into [`BatchQuery`]s.
//! - **Translation**: a [`BatchTranslator`] generates one statement per batch
//!   and rebinds its parameters for every row.
//! - **Execution**: [`FlushPlan::execute`] hands bound rows to a
//!   [`BatchExecutor`] and feeds generated keys back through
//!   [`FlushContext`].
//!
//! # Example
//!
//! ```
//! use sqlflush_core::{DbAttribute, DbEntity, Dialect, EntityResolver, FlushConfig, ObjectId, SqlType};
//! use sqlflush_session::{DbRowOp, FlushAction, Values};
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
//! let action = FlushAction::with_default_sorter(FlushConfig::new(Dialect::Mysql), Arc::new(resolver)).unwrap();
//! let op = DbRowOp::insert(artist, ObjectId::of("artist", "id", 1_i64), Values::new().with("name", "Monet"));
//! let plan = action.plan(vec![op]).unwrap();
//! assert_eq!(plan.len(), 1);
//! ```

pub mod context;
pub mod entity_sorter;
pub mod flush;
pub mod graph;
pub mod op;
pub mod qualifier;
pub mod sorter;
pub mod translator;
pub mod values;

pub use context::{FlushContext, FlushStats};
pub use entity_sorter::{EntitySorter, GraphEntitySorter};
pub use flush::{BatchExecutor, FlushAction, FlushPlan, FlushResult, RowResult, coalesce};
pub use graph::DbRowOpGraph;
pub use op::{DbRowOp, DbRowOpKind};
pub use qualifier::{Qualifier, QualifierEntry};
pub use sorter::{DbRowOpSorter, DefaultDbRowOpSorter};
pub use translator::{
    BatchQuery, BatchShape, BatchTranslator, BindingRole, DbAttributeBinding, DeleteBatchQuery,
    DeleteBatchTranslator, InsertBatchQuery, InsertBatchTranslator, QualifierColumn,
    SoftDeleteBatchTranslator, UpdateBatchQuery, UpdateBatchTranslator, batch_translator,
};
pub use values::{ValueSource, Values};
