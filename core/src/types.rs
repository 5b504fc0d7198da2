//! Type tokens shared by the column model, the coercion layer and the engine.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::options::{DateTimeFormat, TypeOptions};

/// Storage class of a column as declared to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StorageType {
    /// 64-bit signed integer.
    Integer,
    /// 64-bit IEEE float.
    Real,
    /// UTF-8 text.
    Text,
    /// Raw bytes.
    Blob,
}

impl StorageType {
    /// Returns the SQL type name used in column definitions.
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Integer => "INTEGER",
            Self::Real => "REAL",
            Self::Text => "TEXT",
            Self::Blob => "BLOB",
        }
    }

    /// Derives the storage type of a declared column type using the
    /// engine's affinity rules.
    ///
    /// # Examples
    ///
    /// ```
    /// use objectsql_core::StorageType;
    ///
    /// assert_eq!(StorageType::from_declared("BIGINT"), StorageType::Integer);
    /// assert_eq!(StorageType::from_declared("varchar(20)"), StorageType::Text);
    /// assert_eq!(StorageType::from_declared(""), StorageType::Blob);
    /// assert_eq!(StorageType::from_declared("DOUBLE"), StorageType::Real);
    /// ```
    pub fn from_declared(declared: &str) -> Self {
        let upper = declared.to_ascii_uppercase();
        if upper.contains("INT") {
            Self::Integer
        } else if upper.contains("CHAR") || upper.contains("CLOB") || upper.contains("TEXT") {
            Self::Text
        } else if upper.is_empty() || upper.contains("BLOB") {
            Self::Blob
        } else if upper.contains("REAL") || upper.contains("FLOA") || upper.contains("DOUB") {
            Self::Real
        } else {
            Self::Text
        }
    }
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Host-side type token of a mapped property.
///
/// Drives storage type inference and the direction of value coercion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HostKind {
    /// `bool`
    Bool,
    /// `i8`
    I8,
    /// `i16`
    I16,
    /// `i32`
    I32,
    /// `i64`
    I64,
    /// `u8`
    U8,
    /// `u16`
    U16,
    /// `u32`
    U32,
    /// `u64`
    U64,
    /// `f32`
    F32,
    /// `f64`
    F64,
    /// Fixed-point decimal.
    Decimal,
    /// 128-bit unique identifier.
    Guid,
    /// Instant in UTC.
    DateTime,
    /// Instant carrying its own UTC offset.
    DateTimeOffset,
    /// Signed duration.
    TimeSpan,
    /// Integer-backed enumeration or flag set.
    Enum,
    /// UTF-8 string.
    Text,
    /// Byte sequence.
    Bytes,
    /// Collection serialized as JSON text.
    Json,
    /// Another mapped object, bound through its primary key.
    Reference,
    /// User type without an inferable storage class.
    Custom,
}

impl HostKind {
    /// Infers the storage type for this host kind under `options`.
    ///
    /// Returns `None` for [`HostKind::Custom`], which needs an explicit
    /// storage type on the property.
    pub fn storage_type(self, options: &TypeOptions) -> Option<StorageType> {
        let storage = match self {
            Self::Bool
            | Self::I8
            | Self::I16
            | Self::I32
            | Self::I64
            | Self::U8
            | Self::U16
            | Self::U32
            | Self::U64
            | Self::Enum => StorageType::Integer,
            Self::F32 | Self::F64 => StorageType::Real,
            Self::Bytes => StorageType::Blob,
            Self::Guid if options.guid_as_blob => StorageType::Blob,
            Self::Decimal if options.decimal_as_blob => StorageType::Blob,
            Self::TimeSpan if options.timespan_as_ticks => StorageType::Integer,
            Self::DateTime | Self::DateTimeOffset => match options.date_time_format {
                DateTimeFormat::Ticks
                | DateTimeFormat::FileTime
                | DateTimeFormat::FileTimeUtc
                | DateTimeFormat::UnixTimeSeconds
                | DateTimeFormat::UnixTimeMilliseconds => StorageType::Integer,
                DateTimeFormat::OleAutomation | DateTimeFormat::JulianDayNumbers => {
                    StorageType::Real
                }
                DateTimeFormat::Rfc1123
                | DateTimeFormat::RoundTrip
                | DateTimeFormat::Iso8601
                | DateTimeFormat::EngineNative => StorageType::Text,
            },
            Self::Custom => return None,
            Self::Guid
            | Self::Decimal
            | Self::TimeSpan
            | Self::Text
            | Self::Json
            | Self::Reference => StorageType::Text,
        };
        Some(storage)
    }
}

/// Rule used to fill a column value automatically before it is saved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AutomaticValue {
    /// Caller supplies the value.
    #[default]
    None,
    /// A new random identifier on every save.
    NewGuid,
    /// A new random identifier when the current one is nil.
    NewGuidIfEmpty,
    /// A random number on every save.
    Random,
    /// A random number when the current value is zero.
    RandomIfZero,
    /// The current UTC time on every save.
    CurrentTime,
    /// The current UTC time when the value is unset.
    CurrentTimeIfNotSet,
    /// The host name on every save.
    MachineName,
    /// The host name when the value is empty.
    MachineNameIfNull,
    /// The current user name on every save.
    UserName,
    /// The current user name when the value is empty.
    UserNameIfNull,
}

/// Engine conflict resolution clause applied to generated INSERT and UPDATE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictResolution {
    /// Engine default; no clause is emitted.
    #[default]
    Abort,
    /// `OR ROLLBACK`
    Rollback,
    /// `OR FAIL`
    Fail,
    /// `OR IGNORE`
    Ignore,
    /// `OR REPLACE`
    Replace,
}

impl ConflictResolution {
    /// Returns the clause to place after `INSERT`/`UPDATE`, including a
    /// leading space, or an empty string for the engine default.
    pub fn clause(self) -> &'static str {
        match self {
            Self::Abort => "",
            Self::Rollback => " OR ROLLBACK",
            Self::Fail => " OR FAIL",
            Self::Ignore => " OR IGNORE",
            Self::Replace => " OR REPLACE",
        }
    }
}

/// Ordering of a primary key or index column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortDirection {
    /// No explicit direction.
    #[default]
    Unspecified,
    /// `ASC`
    Ascending,
    /// `DESC`
    Descending,
}

impl SortDirection {
    /// Returns the SQL keyword with a leading space, or an empty string.
    pub fn clause(self) -> &'static str {
        match self {
            Self::Unspecified => "",
            Self::Ascending => " ASC",
            Self::Descending => " DESC",
        }
    }
}

/// Column metadata as reported by the live database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveColumn {
    /// Ordinal position.
    pub cid: i64,
    /// Column name.
    pub name: String,
    /// Declared type text (may be empty).
    pub declared_type: String,
    /// Whether the column is declared `NOT NULL`.
    pub not_null: bool,
    /// Default value expression text, without surrounding parentheses.
    pub default_value: Option<String>,
    /// 1-based position in the primary key, 0 when not part of it.
    pub primary_key: i64,
}

impl LiveColumn {
    /// Storage type derived from the declared type.
    pub fn storage_type(&self) -> StorageType {
        StorageType::from_declared(&self.declared_type)
    }
}

/// Index metadata as reported by the live database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveIndex {
    /// Index name.
    pub name: String,
    /// Original `CREATE INDEX` text; `None` for automatic indices.
    pub sql: Option<String>,
    /// Indexed column names in key order.
    pub columns: Vec<String>,
    /// Whether the index enforces uniqueness.
    pub is_unique: bool,
}

/// Table metadata as reported by the live database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveTable {
    /// Table name.
    pub name: String,
    /// Original `CREATE TABLE` text.
    pub sql: Option<String>,
    /// Virtual table module (e.g. `fts5`), when the table is virtual.
    pub module: Option<String>,
    /// Columns in ordinal order.
    pub columns: Vec<LiveColumn>,
    /// Indices defined on the table.
    pub indices: Vec<LiveIndex>,
}

impl LiveTable {
    /// Finds a column by name, ignoring case.
    pub fn column(&self, name: &str) -> Option<&LiveColumn> {
        self.columns.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Finds an index by name, ignoring case.
    pub fn index(&self, name: &str) -> Option<&LiveIndex> {
        self.indices.iter().find(|i| i.name.eq_ignore_ascii_case(name))
    }

    /// Whether the table is a virtual table.
    pub fn is_virtual(&self) -> bool {
        self.module.is_some()
    }

    /// Whether the table is backed by a full-text search module.
    pub fn is_fts(&self) -> bool {
        self.module
            .as_deref()
            .is_some_and(|m| m.to_ascii_lowercase().starts_with("fts"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inference_follows_type_options() {
        let mut options = TypeOptions::default();
        assert_eq!(HostKind::Guid.storage_type(&options), Some(StorageType::Text));
        assert_eq!(HostKind::Bool.storage_type(&options), Some(StorageType::Integer));
        assert_eq!(HostKind::Custom.storage_type(&options), None);

        options.guid_as_blob = true;
        options.decimal_as_blob = true;
        options.timespan_as_ticks = true;
        options.date_time_format = DateTimeFormat::OleAutomation;
        assert_eq!(HostKind::Guid.storage_type(&options), Some(StorageType::Blob));
        assert_eq!(HostKind::Decimal.storage_type(&options), Some(StorageType::Blob));
        assert_eq!(HostKind::TimeSpan.storage_type(&options), Some(StorageType::Integer));
        assert_eq!(HostKind::DateTime.storage_type(&options), Some(StorageType::Real));
    }

    #[test]
    fn test_conflict_clause() {
        assert_eq!(ConflictResolution::Abort.clause(), "");
        assert_eq!(ConflictResolution::Replace.clause(), " OR REPLACE");
    }
}
