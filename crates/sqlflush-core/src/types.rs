//! SQL type definitions and binding-time value conversion.

use crate::error::{Error, Result, TranslationErrorKind};
use crate::value::Value;
use serde::{Deserialize, Serialize};

/// SQL data types a mapped attribute can have.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SqlType {
    // Integer types
    SmallInt,
    Integer,
    BigInt,

    // Floating point
    Double,

    // Fixed precision
    Decimal { precision: u8, scale: u8 },

    // Boolean
    Boolean,

    // String types
    Char(u32),
    VarChar(u32),
    Text,

    // Binary types
    Blob,

    // Date/time types
    Date,
    Timestamp,

    // UUID
    Uuid,

    // JSON
    Json,

    // Custom type name
    Custom(String),
}

impl SqlType {
    /// Get the SQL type name for this type.
    pub fn sql_name(&self) -> String {
        match self {
            SqlType::SmallInt => "SMALLINT".to_string(),
            SqlType::Integer => "INTEGER".to_string(),
            SqlType::BigInt => "BIGINT".to_string(),
            SqlType::Double => "DOUBLE PRECISION".to_string(),
            SqlType::Decimal { precision, scale } => format!("DECIMAL({}, {})", precision, scale),
            SqlType::Boolean => "BOOLEAN".to_string(),
            SqlType::Char(len) => format!("CHAR({})", len),
            SqlType::VarChar(len) => format!("VARCHAR({})", len),
            SqlType::Text => "TEXT".to_string(),
            SqlType::Blob => "BLOB".to_string(),
            SqlType::Date => "DATE".to_string(),
            SqlType::Timestamp => "TIMESTAMP".to_string(),
            SqlType::Uuid => "UUID".to_string(),
            SqlType::Json => "JSON".to_string(),
            SqlType::Custom(name) => name.clone(),
        }
    }

    /// Check if this type is an integer type.
    pub const fn is_integer(&self) -> bool {
        matches!(self, SqlType::SmallInt | SqlType::Integer | SqlType::BigInt)
    }

    /// Check if this type is text-based.
    pub const fn is_text(&self) -> bool {
        matches!(self, SqlType::Char(_) | SqlType::VarChar(_) | SqlType::Text)
    }

    /// Convert a value into the representation bound for this column.
    ///
    /// `native_booleans` is false for dialects that store booleans as
    /// integers; those receive `1`/`0`.
    pub fn coerce(&self, value: Value, native_booleans: bool) -> Result<Value> {
        if value.is_null() {
            return Ok(Value::Null);
        }

        match self {
            SqlType::Boolean => match value.as_bool() {
                Some(b) if native_booleans => Ok(Value::Bool(b)),
                Some(b) => Ok(Value::SmallInt(i16::from(b))),
                None => Err(self.mismatch(&value)),
            },
            SqlType::SmallInt => {
                let v = value.as_i64().ok_or_else(|| self.mismatch(&value))?;
                i16::try_from(v)
                    .map(Value::SmallInt)
                    .map_err(|_| self.mismatch(&value))
            }
            SqlType::Integer => {
                let v = value.as_i64().ok_or_else(|| self.mismatch(&value))?;
                i32::try_from(v)
                    .map(Value::Int)
                    .map_err(|_| self.mismatch(&value))
            }
            SqlType::BigInt => value
                .as_i64()
                .map(Value::BigInt)
                .ok_or_else(|| self.mismatch(&value)),
            SqlType::Double => value
                .as_f64()
                .map(Value::Double)
                .ok_or_else(|| self.mismatch(&value)),
            SqlType::Decimal { .. } => match value {
                Value::Decimal(_) => Ok(value),
                Value::Double(d) => Ok(Value::Decimal(d.to_string())),
                other => other
                    .as_i64()
                    .map(|i| Value::Decimal(i.to_string()))
                    .ok_or_else(|| self.mismatch(&other)),
            },
            SqlType::Char(_) | SqlType::VarChar(_) | SqlType::Text => match value {
                Value::Text(_) => Ok(value),
                Value::Decimal(s) => Ok(Value::Text(s)),
                Value::SmallInt(_) | Value::Int(_) | Value::BigInt(_) => {
                    Ok(Value::Text(value.as_i64().unwrap_or_default().to_string()))
                }
                other => Err(self.mismatch(&other)),
            },
            _ => Ok(value),
        }
    }

    fn mismatch(&self, value: &Value) -> Error {
        Error::translation(
            TranslationErrorKind::TypeMismatch,
            None,
            format!(
                "cannot bind {} value to {} column",
                value.type_name(),
                self.sql_name()
            ),
        )
    }
}
