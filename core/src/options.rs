//! Database-wide configuration.
//!
//! Three option groups drive the mapper: [`TypeOptions`] (how host values are
//! represented in storage), [`SaveOptions`] (schema synchronization and upsert
//! behavior) and [`DatabaseOptions`] (connection settings plus the other two).
//! All of them can be loaded from and saved to YAML.
//!
//! # Example YAML
//!
//! ```yaml
//! busy_timeout_ms: 5000
//! foreign_keys: true
//! threading: serialized
//! type_options:
//!   guid_as_blob: true
//!   date_time_format: unix_time_milliseconds
//! save_options:
//!   delete_unused_columns: true
//!   conflict_resolution: replace
//! ```

use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::ConflictResolution;

/// Storage representation of date/time values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateTimeFormat {
    /// 100-nanosecond intervals since 0001-01-01 (INTEGER).
    Ticks,
    /// 100-nanosecond intervals since 1601-01-01 (INTEGER).
    FileTime,
    /// Same as [`FileTime`](Self::FileTime), always UTC (INTEGER).
    FileTimeUtc,
    /// Seconds since the Unix epoch (INTEGER).
    UnixTimeSeconds,
    /// Milliseconds since the Unix epoch (INTEGER).
    UnixTimeMilliseconds,
    /// Days since 1899-12-30 (REAL).
    OleAutomation,
    /// Julian day numbers (REAL).
    JulianDayNumbers,
    /// `Sun, 06 Nov 1994 08:49:37 GMT` (TEXT).
    Rfc1123,
    /// RFC 3339 with 7 fractional digits, offset preserved (TEXT).
    #[default]
    RoundTrip,
    /// RFC 3339 with millisecond precision, offset preserved (TEXT).
    Iso8601,
    /// `YYYY-MM-DD HH:MM:SS.SSS` in UTC, as the engine's date functions use (TEXT).
    EngineNative,
}

/// Text layout of unique identifiers stored as TEXT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuidFormat {
    /// 32 hex digits.
    Digits,
    /// Hyphen-separated groups.
    #[default]
    Hyphens,
    /// Hyphenated, wrapped in braces.
    Braces,
    /// Hyphenated, wrapped in parentheses.
    Parentheses,
}

/// Controls how host values are represented in storage.
///
/// Affects both the storage type inferred for a column and the value
/// coercion in either direction, so changing it on an existing database
/// shows up as schema drift.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypeOptions {
    /// Store identifiers as 16-byte blobs instead of text.
    pub guid_as_blob: bool,
    /// Text layout of identifiers when not stored as blobs.
    pub guid_format: GuidFormat,
    /// Store durations as 100-nanosecond ticks instead of `[-][d.]hh:mm:ss[.fffffff]` text.
    pub timespan_as_ticks: bool,
    /// Store decimals as their 16-byte binary form instead of text.
    pub decimal_as_blob: bool,
    /// Representation of date/time values.
    pub date_time_format: DateTimeFormat,
    /// Separator joining the parts of a composite key bound for a reference.
    pub key_separator: String,
}

impl Default for TypeOptions {
    fn default() -> Self {
        Self {
            guid_as_blob: false,
            guid_format: GuidFormat::default(),
            timespan_as_ticks: false,
            decimal_as_blob: false,
            date_time_format: DateTimeFormat::default(),
            key_separator: "|".to_string(),
        }
    }
}

/// Controls schema synchronization and the upsert performed by a save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveOptions {
    /// Bring the live table in line with the mapped type before saving.
    pub synchronize_schema: bool,
    /// Create declared indices that are missing.
    pub synchronize_indices: bool,
    /// Rebuild the table to drop live columns the type no longer maps.
    pub delete_unused_columns: bool,
    /// Wrap each save in a savepoint.
    pub use_transaction: bool,
    /// Run the create-and-copy phase of a rebuild inside a transaction.
    pub use_transaction_for_schema_synchronization: bool,
    /// Skip the UPDATE attempt and insert directly.
    pub dont_try_update: bool,
    /// Conflict clause applied to generated INSERT and UPDATE statements.
    pub conflict_resolution: ConflictResolution,
    /// Do not call the object event hooks.
    pub object_events_disabled: bool,
    /// Prefix of temporary tables created by a rebuild.
    pub temp_table_prefix: String,
    /// Check that the database accepts writes before dropping the old table.
    pub preflight_migration_check: bool,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            synchronize_schema: true,
            synchronize_indices: true,
            delete_unused_columns: false,
            use_transaction: false,
            use_transaction_for_schema_synchronization: true,
            dont_try_update: false,
            conflict_resolution: ConflictResolution::default(),
            object_events_disabled: false,
            temp_table_prefix: "__objectsql_temp".to_string(),
            preflight_migration_check: true,
        }
    }
}

/// Threading mode requested from the engine when opening a connection.
///
/// The mapper surfaces this setting but does not enforce it; sharing a
/// connection across threads is the caller's responsibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreadingMode {
    /// Use whatever the engine was compiled with.
    #[default]
    Default,
    /// No mutexes on the connection.
    MultiThread,
    /// Full mutexing on the connection.
    Serialized,
}

/// Connection-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseOptions {
    /// Busy timeout forwarded verbatim to the engine.
    pub busy_timeout_ms: Option<u64>,
    /// Enables foreign key enforcement when set.
    pub foreign_keys: Option<bool>,
    /// Journal mode pragma value (e.g. `wal`).
    pub journal_mode: Option<String>,
    /// Threading mode used for the open flags.
    pub threading: ThreadingMode,
    /// Value representation options.
    pub type_options: TypeOptions,
    /// Default save options.
    pub save_options: SaveOptions,
}

impl DatabaseOptions {
    /// Loads options from a YAML file. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](crate::ModelError::IoError) if the file cannot be
    /// read, or [`YamlError`](crate::ModelError::YamlError) if parsing fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let options = serde_yaml::from_reader(reader)?;
        Ok(options)
    }

    /// Saves the options as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](crate::ModelError::IoError) if the file cannot be
    /// written, or [`YamlError`](crate::ModelError::YamlError) if
    /// serialization fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = r#"
busy_timeout_ms: 250
type_options:
  guid_as_blob: true
  date_time_format: unix_time_milliseconds
save_options:
  delete_unused_columns: true
  conflict_resolution: replace
"#;
        let options: DatabaseOptions = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(options.busy_timeout_ms, Some(250));
        assert!(options.type_options.guid_as_blob);
        assert_eq!(
            options.type_options.date_time_format,
            DateTimeFormat::UnixTimeMilliseconds
        );
        assert_eq!(options.type_options.key_separator, "|");
        assert!(options.save_options.delete_unused_columns);
        assert!(options.save_options.synchronize_schema);
        assert_eq!(
            options.save_options.conflict_resolution,
            ConflictResolution::Replace
        );
    }

    #[test]
    fn test_save_and_load_roundtrip_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("objectsql.yml");

        let mut options = DatabaseOptions::default();
        options.journal_mode = Some("wal".into());
        options.threading = ThreadingMode::Serialized;
        options.type_options.guid_format = GuidFormat::Braces;
        options.save(&path).unwrap();

        let loaded = DatabaseOptions::load(&path).unwrap();
        assert_eq!(loaded, options);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let err = DatabaseOptions::load("/nonexistent/objectsql.yml").unwrap_err();
        assert_eq!(err.code(), 1101);
    }
}
