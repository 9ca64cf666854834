//! Dynamic SQL values.

use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// A value bound to a statement parameter or held in a row snapshot.
///
/// Integers keep their width so the binding layer can tell an `INTEGER`
/// lock column from a `BIGINT` key; [`Value::key_eq`] compares them by number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    SmallInt(i16),
    Int(i32),
    BigInt(i64),
    Double(f64),
    /// Exact decimal, kept as text
    Decimal(String),
    Text(String),
    Bytes(Vec<u8>),
    /// Days since 1970-01-01
    Date(i32),
    /// Microseconds since the epoch
    Timestamp(i64),
    Uuid([u8; 16]),
    Json(serde_json::Value),
}

impl Value {
    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// SQL type name used in conversion errors.
    pub const fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Bool(_) => "BOOLEAN",
            Value::SmallInt(_) => "SMALLINT",
            Value::Int(_) => "INTEGER",
            Value::BigInt(_) => "BIGINT",
            Value::Double(_) => "DOUBLE",
            Value::Decimal(_) => "DECIMAL",
            Value::Text(_) => "TEXT",
            Value::Bytes(_) => "BLOB",
            Value::Date(_) => "DATE",
            Value::Timestamp(_) => "TIMESTAMP",
            Value::Uuid(_) => "UUID",
            Value::Json(_) => "JSON",
        }
    }

    /// Try to convert this value to a bool.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            Value::SmallInt(v) => Some(*v != 0),
            Value::Int(v) => Some(*v != 0),
            Value::BigInt(v) => Some(*v != 0),
            _ => None,
        }
    }

    /// Try to convert this value to an i64.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::SmallInt(v) => Some(i64::from(*v)),
            Value::Int(v) => Some(i64::from(*v)),
            Value::BigInt(v) => Some(*v),
            Value::Bool(v) => Some(i64::from(*v)),
            Value::Decimal(s) | Value::Text(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Try to convert this value to an f64.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(v) => Some(*v),
            Value::SmallInt(v) => Some(f64::from(*v)),
            Value::Int(v) => Some(f64::from(*v)),
            Value::BigInt(v) => Some(*v as f64),
            Value::Decimal(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Compare two values as key material.
    ///
    /// Integers of different widths compare equal when numerically equal, so a
    /// foreign key stored as `Int` matches a primary key stored as `BigInt`.
    /// Doubles compare by value with `0.0 == -0.0`, and NaN equals itself.
    pub fn key_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Double(a), Value::Double(b)) => double_key(*a) == double_key(*b),
            _ => match (self.integer_key(), other.integer_key()) {
                (Some(a), Some(b)) => a == b,
                _ => self == other,
            },
        }
    }

    fn integer_key(&self) -> Option<i64> {
        match self {
            Value::SmallInt(v) => Some(i64::from(*v)),
            Value::Int(v) => Some(i64::from(*v)),
            Value::BigInt(v) => Some(*v),
            _ => None,
        }
    }

    /// Feed this value into a hasher, consistent with [`Value::key_eq`].
    pub fn hash_key<H: Hasher>(&self, state: &mut H) {
        match self {
            Value::Null => 0u8.hash(state),
            Value::Bool(b) => {
                1u8.hash(state);
                b.hash(state);
            }
            Value::SmallInt(_) | Value::Int(_) | Value::BigInt(_) => {
                2u8.hash(state);
                self.integer_key().hash(state);
            }
            Value::Double(d) => {
                3u8.hash(state);
                double_key(*d).hash(state);
            }
            Value::Decimal(s) => {
                4u8.hash(state);
                s.hash(state);
            }
            Value::Text(s) => {
                5u8.hash(state);
                s.hash(state);
            }
            Value::Bytes(b) => {
                6u8.hash(state);
                b.hash(state);
            }
            Value::Date(d) => {
                7u8.hash(state);
                d.hash(state);
            }
            Value::Timestamp(t) => {
                8u8.hash(state);
                t.hash(state);
            }
            Value::Uuid(u) => {
                9u8.hash(state);
                u.hash(state);
            }
            Value::Json(j) => {
                10u8.hash(state);
                j.to_string().hash(state);
            }
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Value::SmallInt(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::BigInt(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::Json(v)
    }
}

impl From<[u8; 16]> for Value {
    fn from(v: [u8; 16]) -> Self {
        Value::Uuid(v)
    }
}

/// Bit pattern of a double with both zeros and all NaNs collapsed.
fn double_key(d: f64) -> u64 {
    if d == 0.0 {
        0.0f64.to_bits()
    } else if d.is_nan() {
        f64::NAN.to_bits()
    } else {
        d.to_bits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn key_hash(v: &Value) -> u64 {
        let mut hasher = DefaultHasher::new();
        v.hash_key(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_from_option() {
        assert_eq!(Value::from(Some(5_i64)), Value::BigInt(5));
        assert_eq!(Value::from(None::<i64>), Value::Null);
    }

    #[test]
    fn test_as_i64() {
        assert_eq!(Value::Int(7).as_i64(), Some(7));
        assert_eq!(Value::Text("12".to_string()).as_i64(), Some(12));
        assert_eq!(Value::Bytes(vec![1]).as_i64(), None);
    }

    #[test]
    fn test_key_eq_across_integer_widths() {
        assert!(Value::Int(3).key_eq(&Value::BigInt(3)));
        assert!(!Value::Int(3).key_eq(&Value::BigInt(4)));
        assert!(Value::Text("a".into()).key_eq(&Value::Text("a".into())));
        assert!(!Value::Text("1".into()).key_eq(&Value::Int(1)));
    }

    #[test]
    fn test_double_keys_agree_with_hash() {
        let zero = Value::Double(0.0);
        let negative_zero = Value::Double(-0.0);
        assert!(zero.key_eq(&negative_zero));
        assert_eq!(key_hash(&zero), key_hash(&negative_zero));

        let nan = Value::Double(f64::NAN);
        assert!(nan.key_eq(&Value::Double(-f64::NAN)));
        assert_eq!(key_hash(&nan), key_hash(&Value::Double(-f64::NAN)));

        assert!(!Value::Double(1.5).key_eq(&Value::Double(2.5)));
        assert!(!Value::Double(1.0).key_eq(&Value::Int(1)));
    }

    #[test]
    fn test_hash_key_consistent_with_key_eq() {
        assert_eq!(key_hash(&Value::SmallInt(9)), key_hash(&Value::BigInt(9)));
        assert_ne!(key_hash(&Value::BigInt(9)), key_hash(&Value::Text("9".into())));
    }

    #[test]
    fn test_type_name() {
        assert_eq!(Value::Null.type_name(), "NULL");
        assert_eq!(Value::Bool(true).type_name(), "BOOLEAN");
        assert_eq!(Value::Json(serde_json::json!({})).type_name(), "JSON");
    }
}
