//! Error types for flush ordering and SQL translation.

use std::fmt;

/// The primary error type for all flush operations.
#[derive(Debug)]
pub enum Error {
    /// Dependency graph could not be ordered
    Graph(GraphError),
    /// SQL builder used out of protocol
    Builder(BuilderError),
    /// Batch could not be translated into SQL
    Translation(TranslationError),
    /// Mapping metadata is inconsistent
    Mapping(MappingError),
    /// Configuration errors
    Config(ConfigError),
    /// Errors reported by the statement execution layer
    Execution(ExecutionError),
    /// Serialization/deserialization errors
    Serde(String),
    /// Custom error with message
    Custom(String),
}

#[derive(Debug, Clone)]
pub struct GraphError {
    pub kind: GraphErrorKind,
    /// Debug renderings of the vertices left over when sorting stopped.
    pub vertices: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphErrorKind {
    /// A cycle prevents topological ordering
    CycleDetected,
}

#[derive(Debug, Clone)]
pub struct BuilderError {
    pub kind: BuilderErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuilderErrorKind {
    /// WHEN without a matching THEN
    MissingThen,
    /// CASE with no WHEN branches
    EmptyCase,
    /// A statement slot that must be filled is empty
    MissingClause,
}

#[derive(Debug, Clone)]
pub struct TranslationError {
    pub kind: TranslationErrorKind,
    pub entity: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslationErrorKind {
    /// Attribute referenced by a row is not mapped on the entity
    UnknownAttribute,
    /// Row does not have the shape the statement was generated for
    ShapeMismatch,
    /// UPDATE/DELETE without any qualifying attribute
    EmptyQualifier,
    /// Soft delete requested but the entity lacks the flag column
    MissingSoftDeleteColumn,
    /// Batch contains no rows
    EmptyBatch,
    /// Row kind does not match the batch it was placed in
    UnsupportedBatch,
    /// A deferred value could not be resolved
    UnresolvedValue,
    /// Value cannot be converted to the column type
    TypeMismatch,
    /// Two change records for the same row cannot be combined
    ConflictingOperations,
}

#[derive(Debug, Clone)]
pub struct MappingError {
    pub kind: MappingErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingErrorKind {
    /// Entity name not registered
    UnknownEntity,
    /// Relationship points at an unknown target
    UnknownTarget,
    /// Duplicate entity name
    DuplicateEntity,
}

#[derive(Debug)]
pub struct ConfigError {
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug)]
pub struct ExecutionError {
    pub kind: ExecutionErrorKind,
    pub sql: Option<String>,
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionErrorKind {
    /// Statement affected an unexpected number of rows (optimistic locking)
    UpdateCount,
    /// Generated keys were requested but not returned
    MissingGeneratedKeys,
    /// Driver-level failure
    Database,
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Build a cycle error from the vertices that could not be ordered.
    pub fn cycle(vertices: Vec<String>) -> Self {
        Error::Graph(GraphError {
            kind: GraphErrorKind::CycleDetected,
            vertices,
        })
    }

    /// Build a builder protocol error.
    pub fn builder(kind: BuilderErrorKind, message: impl Into<String>) -> Self {
        Error::Builder(BuilderError {
            kind,
            message: message.into(),
        })
    }

    /// Build a translation error scoped to an entity.
    pub fn translation(
        kind: TranslationErrorKind,
        entity: Option<&str>,
        message: impl Into<String>,
    ) -> Self {
        Error::Translation(TranslationError {
            kind,
            entity: entity.map(str::to_string),
            message: message.into(),
        })
    }

    /// Build a mapping error.
    pub fn mapping(kind: MappingErrorKind, message: impl Into<String>) -> Self {
        Error::Mapping(MappingError {
            kind,
            message: message.into(),
        })
    }

    /// Build an execution error for a statement.
    pub fn execution(
        kind: ExecutionErrorKind,
        sql: Option<&str>,
        message: impl Into<String>,
    ) -> Self {
        Error::Execution(ExecutionError {
            kind,
            sql: sql.map(str::to_string),
            message: message.into(),
            source: None,
        })
    }

    /// Everything raised while ordering or translating aborts the flush.
    ///
    /// Only driver-level execution failures may be worth retrying, and that
    /// decision belongs to the execution layer.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Error::Execution(ExecutionError {
                kind: ExecutionErrorKind::Database,
                ..
            })
        )
    }

    /// Is this a dependency cycle?
    pub fn is_cycle(&self) -> bool {
        matches!(
            self,
            Error::Graph(GraphError {
                kind: GraphErrorKind::CycleDetected,
                ..
            })
        )
    }

    /// Get the SQL that caused this error, if available
    pub fn sql(&self) -> Option<&str> {
        match self {
            Error::Execution(e) => e.sql.as_deref(),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Graph(e) => write!(
                f,
                "Dependency cycle detected among: {}",
                e.vertices.join(", ")
            ),
            Error::Builder(e) => write!(f, "SQL builder error: {}", e.message),
            Error::Translation(e) => {
                if let Some(entity) = &e.entity {
                    write!(f, "Translation error for '{}': {}", entity, e.message)
                } else {
                    write!(f, "Translation error: {}", e.message)
                }
            }
            Error::Mapping(e) => write!(f, "Mapping error: {}", e.message),
            Error::Config(e) => write!(f, "Configuration error: {}", e.message),
            Error::Execution(e) => {
                if let Some(sql) = &e.sql {
                    write!(f, "Execution error: {} (SQL: {})", e.message, sql)
                } else {
                    write!(f, "Execution error: {}", e.message)
                }
            }
            Error::Serde(msg) => write!(f, "Serialization error: {}", msg),
            Error::Custom(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Config(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Execution(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serde(e.to_string())
    }
}
