//! Conversion between mapper values and `rusqlite` values.

use objectsql_core::Value;
use rusqlite::types::{Value as SqlValue, ValueRef};

/// Converts a stored value into the owned form `rusqlite` binds.
pub(crate) fn to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Integer(v) => SqlValue::Integer(*v),
        Value::Real(v) => SqlValue::Real(*v),
        Value::Text(v) => SqlValue::Text(v.clone()),
        Value::Blob(v) => SqlValue::Blob(v.clone()),
    }
}

/// Reads a result column. Text that is not valid UTF-8 is replaced lossily.
pub(crate) fn from_sql(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(v) => Value::Integer(v),
        ValueRef::Real(v) => Value::Real(v),
        ValueRef::Text(v) => Value::Text(String::from_utf8_lossy(v).into_owned()),
        ValueRef::Blob(v) => Value::Blob(v.to_vec()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_and_blob_conversion() {
        assert_eq!(to_sql(&Value::from("a")), SqlValue::Text("a".into()));
        assert_eq!(from_sql(ValueRef::Blob(&[1, 2])), Value::Blob(vec![1, 2]));
        assert_eq!(from_sql(ValueRef::Text(b"caf\xc3\xa9")), Value::from("café"));
        assert_eq!(from_sql(ValueRef::Null), Value::Null);
    }
}
