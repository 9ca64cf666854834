//! Flush configuration.
//!
//! Settings can be built in code with the setter methods or parsed from JSON:
//!
//! ```
//! use sqlflush_core::{Dialect, FlushConfig};
//!
//! let config = FlushConfig::from_json(r#"{"dialect": "mysql", "max_batch_size": 50}"#).unwrap();
//! assert_eq!(config.dialect, Dialect::Mysql);
//! assert_eq!(config.max_batch_size, 50);
//! ```

use crate::dialect::Dialect;
use crate::error::{ConfigError, Error, Result};
use crate::identifiers::IdentifierQuoting;
use crate::value::Value;
use serde::{Deserialize, Serialize};

/// Soft delete settings: deletes become updates of a flag column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoftDeleteConfig {
    /// Flag column name
    pub column: String,
    /// Value written to the flag column
    #[serde(default = "default_deleted_value")]
    pub deleted_value: Value,
}

fn default_deleted_value() -> Value {
    Value::Bool(true)
}

impl SoftDeleteConfig {
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            deleted_value: default_deleted_value(),
        }
    }

    /// Value written on delete (default `true`).
    pub fn deleted_value(mut self, value: impl Into<Value>) -> Self {
        self.deleted_value = value.into();
        self
    }
}

/// Settings for ordering and translating a flush.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlushConfig {
    /// Target SQL dialect
    pub dialect: Dialect,
    /// Override the dialect's generated keys capability
    pub supports_generated_keys: Option<bool>,
    /// Whether rows of the same shape share one statement (default: true)
    pub supports_batch_updates: bool,
    /// Maximum rows per batch, 0 for unlimited (default: 1000)
    pub max_batch_size: usize,
    /// Identifier quoting strategy
    pub identifier_quoting: IdentifierQuoting,
    /// Soft delete settings, hard deletes when absent
    pub soft_delete: Option<SoftDeleteConfig>,
    /// Whether lock attributes are added to UPDATE/DELETE qualifiers (default: true)
    pub use_optimistic_locking: bool,
}

impl Default for FlushConfig {
    fn default() -> Self {
        Self {
            dialect: Dialect::default(),
            supports_generated_keys: None,
            supports_batch_updates: true,
            max_batch_size: 1000,
            identifier_quoting: IdentifierQuoting::default(),
            soft_delete: None,
            use_optimistic_locking: true,
        }
    }
}

impl FlushConfig {
    /// Create a configuration for a dialect with default settings.
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            ..Self::default()
        }
    }

    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Override the generated keys capability.
    pub fn supports_generated_keys(mut self, supported: bool) -> Self {
        self.supports_generated_keys = Some(supported);
        self
    }

    /// Enable or disable multi-row batches.
    pub fn supports_batch_updates(mut self, supported: bool) -> Self {
        self.supports_batch_updates = supported;
        self
    }

    /// Set the maximum batch size.
    pub fn max_batch_size(mut self, size: usize) -> Self {
        self.max_batch_size = size;
        self
    }

    /// Set the identifier quoting strategy.
    pub fn identifier_quoting(mut self, quoting: IdentifierQuoting) -> Self {
        self.identifier_quoting = quoting;
        self
    }

    /// Enable soft deletes.
    pub fn soft_delete(mut self, soft_delete: SoftDeleteConfig) -> Self {
        self.soft_delete = Some(soft_delete);
        self
    }

    /// Enable or disable optimistic locking qualifiers.
    pub fn use_optimistic_locking(mut self, enabled: bool) -> Self {
        self.use_optimistic_locking = enabled;
        self
    }

    /// Whether generated keys are read back after inserts.
    pub fn generated_keys_enabled(&self) -> bool {
        self.supports_generated_keys
            .unwrap_or_else(|| self.dialect.supports_generated_keys())
    }

    /// Whether boolean values are bound natively.
    pub fn native_booleans(&self) -> bool {
        self.dialect.supports_native_booleans()
    }

    /// Check the configuration for inconsistent settings.
    pub fn validate(&self) -> Result<()> {
        if let Some(soft) = &self.soft_delete {
            if soft.column.trim().is_empty() {
                return Err(Error::Config(ConfigError {
                    message: "soft delete column name must not be empty".to_string(),
                    source: None,
                }));
            }
            if soft.deleted_value.is_null() {
                return Err(Error::Config(ConfigError {
                    message: format!(
                        "soft delete value for column '{}' must not be NULL",
                        soft.column
                    ),
                    source: None,
                }));
            }
        }
        Ok(())
    }

    /// Rows per batch after applying `supports_batch_updates`, `None` for unlimited.
    pub fn batch_limit(&self) -> Option<usize> {
        if !self.supports_batch_updates {
            Some(1)
        } else if self.max_batch_size == 0 {
            None
        } else {
            Some(self.max_batch_size)
        }
    }
}
