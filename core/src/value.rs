//! Stored and typed values.
//!
//! [`Value`] is what the engine stores and binds. [`HostValue`] is the typed
//! form a mapped property reads and writes. [`ColumnType`] connects a Rust
//! field type to both.

use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeDelta, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoercionError;
use crate::types::HostKind;

/// A value that can be bound to a statement parameter or read from a
/// result column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// SQL NULL.
    Null,
    /// 64-bit signed integer.
    Integer(i64),
    /// 64-bit float.
    Real(f64),
    /// UTF-8 text.
    Text(String),
    /// Binary blob.
    Blob(Vec<u8>),
}

impl Value {
    /// Returns `true` for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Short description used in coercion error messages.
    pub fn describe(&self) -> String {
        match self {
            Self::Null => "NULL".to_string(),
            Self::Integer(v) => format!("INTEGER {v}"),
            Self::Real(v) => format!("REAL {v}"),
            Self::Text(v) => format!("TEXT '{v}'"),
            Self::Blob(v) => format!("BLOB ({} bytes)", v.len()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Integer(v) => write!(f, "{v}"),
            Self::Real(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
            Self::Blob(v) => {
                for byte in v {
                    write!(f, "{byte:02X}")?;
                }
                Ok(())
            }
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Real(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Self::Blob(v)
    }
}

/// Typed value exchanged with mapped properties.
#[derive(Debug, Clone, PartialEq)]
pub enum HostValue {
    /// Absent value.
    Null,
    /// Boolean.
    Bool(bool),
    /// Any signed integer width, enumerations included.
    Int(i64),
    /// Any unsigned integer width.
    UInt(u64),
    /// `f32` or `f64`.
    Float(f64),
    /// Fixed-point decimal.
    Decimal(Decimal),
    /// Unique identifier.
    Guid(Uuid),
    /// Instant in UTC.
    DateTime(DateTime<Utc>),
    /// Instant with its own offset.
    DateTimeOffset(DateTime<FixedOffset>),
    /// Signed duration.
    TimeSpan(TimeDelta),
    /// String.
    Text(String),
    /// Byte sequence.
    Bytes(Vec<u8>),
}

impl HostValue {
    /// Returns `true` for [`HostValue::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Short description used in coercion error messages.
    pub fn describe(&self) -> String {
        match self {
            Self::Null => "null".to_string(),
            Self::Bool(v) => format!("bool {v}"),
            Self::Int(v) => format!("int {v}"),
            Self::UInt(v) => format!("uint {v}"),
            Self::Float(v) => format!("float {v}"),
            Self::Decimal(v) => format!("decimal {v}"),
            Self::Guid(v) => format!("guid {v}"),
            Self::DateTime(v) => format!("datetime {v}"),
            Self::DateTimeOffset(v) => format!("datetimeoffset {v}"),
            Self::TimeSpan(v) => format!("timespan {v}"),
            Self::Text(v) => format!("text '{v}'"),
            Self::Bytes(v) => format!("bytes ({} bytes)", v.len()),
        }
    }

    fn mismatch<T>(self, target: &str) -> Result<T, CoercionError> {
        Err(CoercionError::new(self.describe(), target))
    }
}

impl fmt::Display for HostValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::UInt(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Decimal(v) => write!(f, "{v}"),
            Self::Guid(v) => write!(f, "{v}"),
            Self::DateTime(v) => write!(f, "{}", v.to_rfc3339()),
            Self::DateTimeOffset(v) => write!(f, "{}", v.to_rfc3339()),
            Self::TimeSpan(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
            Self::Bytes(v) => {
                for byte in v {
                    write!(f, "{byte:02X}")?;
                }
                Ok(())
            }
        }
    }
}

macro_rules! host_value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for HostValue {
                fn from(v: $ty) -> Self {
                    Self::$variant(v.into())
                }
            }
        )*
    };
}

host_value_from! {
    bool => Bool,
    i8 => Int, i16 => Int, i32 => Int, i64 => Int,
    u8 => UInt, u16 => UInt, u32 => UInt, u64 => UInt,
    f32 => Float, f64 => Float,
    Decimal => Decimal,
    Uuid => Guid,
    DateTime<Utc> => DateTime,
    DateTime<FixedOffset> => DateTimeOffset,
    TimeDelta => TimeSpan,
    String => Text,
    Vec<u8> => Bytes,
}

impl From<&str> for HostValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl<T: Into<HostValue>> From<Option<T>> for HostValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// A Rust type usable as a mapped column.
///
/// `KIND` selects storage type inference and the coercion target;
/// `NULLABLE` is the default nullability of the column.
///
/// Integer-backed enumerations implement it through [`enum_column!`](crate::enum_column).
pub trait ColumnType: Sized + Send + Sync + 'static {
    /// Host kind token.
    const KIND: HostKind;
    /// Whether the column accepts NULL by default.
    const NULLABLE: bool = false;

    /// Reads the typed value.
    fn to_host(&self) -> HostValue;

    /// Builds the field value from a typed value already coerced to `KIND`.
    ///
    /// # Errors
    ///
    /// Returns a [`CoercionError`] when the value does not fit the type.
    fn from_host(value: HostValue) -> Result<Self, CoercionError>;
}

impl ColumnType for bool {
    const KIND: HostKind = HostKind::Bool;

    fn to_host(&self) -> HostValue {
        HostValue::Bool(*self)
    }

    fn from_host(value: HostValue) -> Result<Self, CoercionError> {
        match value {
            HostValue::Bool(v) => Ok(v),
            other => other.mismatch("bool"),
        }
    }
}

macro_rules! signed_column {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl ColumnType for $ty {
                const KIND: HostKind = HostKind::$kind;

                fn to_host(&self) -> HostValue {
                    HostValue::Int(i64::from(*self))
                }

                fn from_host(value: HostValue) -> Result<Self, CoercionError> {
                    match value {
                        HostValue::Int(v) => <$ty>::try_from(v)
                            .map_err(|_| CoercionError::new(format!("int {v}"), stringify!($ty))),
                        other => other.mismatch(stringify!($ty)),
                    }
                }
            }
        )*
    };
}

signed_column!(i8 => I8, i16 => I16, i32 => I32, i64 => I64);

macro_rules! unsigned_column {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl ColumnType for $ty {
                const KIND: HostKind = HostKind::$kind;

                fn to_host(&self) -> HostValue {
                    HostValue::UInt(u64::from(*self))
                }

                fn from_host(value: HostValue) -> Result<Self, CoercionError> {
                    match value {
                        HostValue::UInt(v) => <$ty>::try_from(v)
                            .map_err(|_| CoercionError::new(format!("uint {v}"), stringify!($ty))),
                        other => other.mismatch(stringify!($ty)),
                    }
                }
            }
        )*
    };
}

unsigned_column!(u8 => U8, u16 => U16, u32 => U32, u64 => U64);

impl ColumnType for f32 {
    const KIND: HostKind = HostKind::F32;

    fn to_host(&self) -> HostValue {
        HostValue::Float(f64::from(*self))
    }

    fn from_host(value: HostValue) -> Result<Self, CoercionError> {
        match value {
            #[allow(clippy::cast_possible_truncation)]
            HostValue::Float(v) => Ok(v as f32),
            other => other.mismatch("f32"),
        }
    }
}

impl ColumnType for f64 {
    const KIND: HostKind = HostKind::F64;

    fn to_host(&self) -> HostValue {
        HostValue::Float(*self)
    }

    fn from_host(value: HostValue) -> Result<Self, CoercionError> {
        match value {
            HostValue::Float(v) => Ok(v),
            other => other.mismatch("f64"),
        }
    }
}

impl ColumnType for Decimal {
    const KIND: HostKind = HostKind::Decimal;

    fn to_host(&self) -> HostValue {
        HostValue::Decimal(*self)
    }

    fn from_host(value: HostValue) -> Result<Self, CoercionError> {
        match value {
            HostValue::Decimal(v) => Ok(v),
            other => other.mismatch("decimal"),
        }
    }
}

impl ColumnType for Uuid {
    const KIND: HostKind = HostKind::Guid;

    fn to_host(&self) -> HostValue {
        HostValue::Guid(*self)
    }

    fn from_host(value: HostValue) -> Result<Self, CoercionError> {
        match value {
            HostValue::Guid(v) => Ok(v),
            other => other.mismatch("guid"),
        }
    }
}

impl ColumnType for DateTime<Utc> {
    const KIND: HostKind = HostKind::DateTime;

    fn to_host(&self) -> HostValue {
        HostValue::DateTime(*self)
    }

    fn from_host(value: HostValue) -> Result<Self, CoercionError> {
        match value {
            HostValue::DateTime(v) => Ok(v),
            HostValue::DateTimeOffset(v) => Ok(v.with_timezone(&Utc)),
            other => other.mismatch("datetime"),
        }
    }
}

impl ColumnType for NaiveDateTime {
    const KIND: HostKind = HostKind::DateTime;

    fn to_host(&self) -> HostValue {
        HostValue::DateTime(self.and_utc())
    }

    fn from_host(value: HostValue) -> Result<Self, CoercionError> {
        match value {
            HostValue::DateTime(v) => Ok(v.naive_utc()),
            HostValue::DateTimeOffset(v) => Ok(v.naive_utc()),
            other => other.mismatch("datetime"),
        }
    }
}

impl ColumnType for DateTime<FixedOffset> {
    const KIND: HostKind = HostKind::DateTimeOffset;

    fn to_host(&self) -> HostValue {
        HostValue::DateTimeOffset(*self)
    }

    fn from_host(value: HostValue) -> Result<Self, CoercionError> {
        match value {
            HostValue::DateTimeOffset(v) => Ok(v),
            HostValue::DateTime(v) => Ok(v.fixed_offset()),
            other => other.mismatch("datetimeoffset"),
        }
    }
}

impl ColumnType for TimeDelta {
    const KIND: HostKind = HostKind::TimeSpan;

    fn to_host(&self) -> HostValue {
        HostValue::TimeSpan(*self)
    }

    fn from_host(value: HostValue) -> Result<Self, CoercionError> {
        match value {
            HostValue::TimeSpan(v) => Ok(v),
            other => other.mismatch("timespan"),
        }
    }
}

impl ColumnType for String {
    const KIND: HostKind = HostKind::Text;
    const NULLABLE: bool = true;

    fn to_host(&self) -> HostValue {
        HostValue::Text(self.clone())
    }

    fn from_host(value: HostValue) -> Result<Self, CoercionError> {
        match value {
            HostValue::Text(v) => Ok(v),
            HostValue::Null => Ok(String::new()),
            other => other.mismatch("string"),
        }
    }
}

impl ColumnType for Vec<u8> {
    const KIND: HostKind = HostKind::Bytes;
    const NULLABLE: bool = true;

    fn to_host(&self) -> HostValue {
        HostValue::Bytes(self.clone())
    }

    fn from_host(value: HostValue) -> Result<Self, CoercionError> {
        match value {
            HostValue::Bytes(v) => Ok(v),
            HostValue::Null => Ok(Vec::new()),
            other => other.mismatch("bytes"),
        }
    }
}

impl<T: ColumnType> ColumnType for Option<T> {
    const KIND: HostKind = T::KIND;
    const NULLABLE: bool = true;

    fn to_host(&self) -> HostValue {
        self.as_ref().map_or(HostValue::Null, ColumnType::to_host)
    }

    fn from_host(value: HostValue) -> Result<Self, CoercionError> {
        match value {
            HostValue::Null => Ok(None),
            other => T::from_host(other).map(Some),
        }
    }
}

/// Implements [`ColumnType`] for an integer-backed enumeration or flag set.
///
/// The type must be `Copy`, convert into `i64` with `From`, and back with
/// `TryFrom<i64>`.
///
/// # Examples
///
/// ```
/// use objectsql_core::{enum_column, ColumnType, HostValue};
///
/// #[derive(Debug, Clone, Copy, PartialEq)]
/// enum Status { Active = 1, Archived = 2 }
///
/// impl From<Status> for i64 {
///     fn from(s: Status) -> i64 { s as i64 }
/// }
///
/// impl TryFrom<i64> for Status {
///     type Error = ();
///     fn try_from(v: i64) -> Result<Self, ()> {
///         match v { 1 => Ok(Status::Active), 2 => Ok(Status::Archived), _ => Err(()) }
///     }
/// }
///
/// enum_column!(Status);
///
/// assert_eq!(Status::Archived.to_host(), HostValue::Int(2));
/// assert_eq!(Status::from_host(HostValue::Int(1)).unwrap(), Status::Active);
/// assert!(Status::from_host(HostValue::Int(7)).is_err());
/// ```
#[macro_export]
macro_rules! enum_column {
    ($ty:ty) => {
        impl $crate::ColumnType for $ty {
            const KIND: $crate::HostKind = $crate::HostKind::Enum;

            fn to_host(&self) -> $crate::HostValue {
                $crate::HostValue::Int(i64::from(*self))
            }

            fn from_host(
                value: $crate::HostValue,
            ) -> ::std::result::Result<Self, $crate::CoercionError> {
                match value {
                    $crate::HostValue::Int(v) => <$ty as ::std::convert::TryFrom<i64>>::try_from(v)
                        .map_err(|_| $crate::CoercionError::new(format!("int {v}"), stringify!($ty))),
                    other => Err($crate::CoercionError::new(other.describe(), stringify!($ty))),
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_narrow_integer_out_of_range() {
        assert_eq!(i8::from_host(HostValue::Int(-128)).unwrap(), -128);
        assert!(i8::from_host(HostValue::Int(300)).is_err());
        assert!(u16::from_host(HostValue::UInt(70_000)).is_err());
    }

    #[test]
    fn test_option_maps_null() {
        assert_eq!(Option::<i32>::from_host(HostValue::Null).unwrap(), None);
        assert_eq!(Some(5_i32).to_host(), HostValue::Int(5));
        assert_eq!(None::<i32>.to_host(), HostValue::Null);
        assert!(i32::from_host(HostValue::Null).is_err());
    }

    #[test]
    fn test_string_null_is_empty() {
        assert_eq!(String::from_host(HostValue::Null).unwrap(), "");
        assert!(<String as ColumnType>::NULLABLE);
        assert!(!<i64 as ColumnType>::NULLABLE);
    }

    #[test]
    fn test_value_display() {
        assert_eq!(Value::Blob(vec![0xAB, 0x01]).to_string(), "AB01");
        assert_eq!(Value::Null.to_string(), "NULL");
    }
}
