//! Core types for sqlflush.
//!
//! This crate provides the foundational abstractions the flush engine works on:
//!
//! - `Value` and `SqlType` for dynamically typed parameter values
//! - `DbEntity` and friends for table mapping metadata
//! - `ObjectId` for row identity
//! - `Dialect` and identifier quoting
//! - `FlushConfig` for engine settings
//! - `Error` shared by every sqlflush crate

pub mod config;
pub mod dialect;
pub mod entity;
pub mod error;
pub mod identifiers;
pub mod object_id;
pub mod types;
pub mod value;

pub use config::{FlushConfig, SoftDeleteConfig};
pub use dialect::{Dialect, PlaceholderStyle};
pub use entity::{DbAttribute, DbEntity, DbJoin, DbRelationship, Dependency, EntityResolver};
pub use error::{
    BuilderError, BuilderErrorKind, ConfigError, Error, ExecutionError, ExecutionErrorKind,
    GraphError, GraphErrorKind, MappingError, MappingErrorKind, Result, TranslationError,
    TranslationErrorKind,
};
pub use identifiers::{IdentifierQuoting, is_plain_identifier, quote_ident};
pub use object_id::{IdKey, ObjectId};
pub use types::SqlType;
pub use value::Value;
