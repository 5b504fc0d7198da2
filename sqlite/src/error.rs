//! Error types for the engine layer.
//!
//! Engine failures keep the `rusqlite` error (and with it the native result
//! code and message). The two benign races the mapper tolerates are
//! recognized by explicit predicates over that error, never by catching
//! everything.

use objectsql_core::ModelError;
use rusqlite::ErrorCode;
use thiserror::Error;

/// Errors raised while synchronizing, saving or loading.
#[derive(Debug, Error)]
pub enum SqliteError {
    /// The engine rejected an operation.
    #[error("OSQL2001: database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    /// A caller-supplied statement argument could not be converted.
    #[error("OSQL2002: cannot bind argument {index}: {reason}")]
    Bind {
        /// 1-based parameter index.
        index: usize,
        /// Human-readable explanation.
        reason: String,
    },

    /// A named table does not exist.
    #[error("OSQL2003: table '{0}' does not exist")]
    TableNotFound(String),

    /// A keyed operation was requested on a table without primary key.
    #[error("OSQL2005: table '{0}' has no primary key")]
    NoPrimaryKey(String),

    /// The old table was dropped but the rebuilt table could not be renamed.
    ///
    /// The rows live on in `temp_table`; nothing is retried automatically.
    #[error(
        "OSQL2101: migration of table '{table}' stopped after dropping it; rows are kept in '{temp_table}' ({source})"
    )]
    MigrationWindow {
        /// Table being rebuilt.
        table: String,
        /// Temporary table holding the migrated rows.
        temp_table: String,
        /// Error returned by the rename.
        source: rusqlite::Error,
    },

    /// The database would not accept the drop and rename of a rebuild.
    #[error("OSQL2102: migration of table '{table}' not attempted: {reason}")]
    MigrationPreflight {
        /// Table being rebuilt.
        table: String,
        /// Human-readable explanation.
        reason: String,
    },

    /// Building or configuring the mapped model failed.
    #[error(transparent)]
    Model(#[from] ModelError),
}

impl SqliteError {
    /// Stable numeric code, identical to the `OSQLnnnn` prefix of the message.
    pub fn code(&self) -> u32 {
        match self {
            Self::DatabaseError(_) => 2001,
            Self::Bind { .. } => 2002,
            Self::TableNotFound(_) => 2003,
            Self::NoPrimaryKey(_) => 2005,
            Self::MigrationWindow { .. } => 2101,
            Self::MigrationPreflight { .. } => 2102,
            Self::Model(err) => err.code(),
        }
    }

    /// Native error code carried by an engine error, if any.
    pub fn native_code(&self) -> Option<ErrorCode> {
        match self {
            Self::DatabaseError(err) | Self::MigrationWindow { source: err, .. } => {
                err.sqlite_error_code()
            }
            _ => None,
        }
    }
}

/// Whether `err` reports that a table already exists.
pub fn is_table_already_exists(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(_, Some(message)) if message.contains("already exists")
    )
}

/// Whether `err` is a constraint violation.
pub fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    err.sqlite_error_code() == Some(ErrorCode::ConstraintViolation)
}

/// Convenience alias for results with [`SqliteError`].
pub type Result<T> = std::result::Result<T, SqliteError>;
