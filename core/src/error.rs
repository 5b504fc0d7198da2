//! Error types for the object-table model.
//!
//! Configuration problems are detected when a mapped type is built and are
//! fatal to that build. Value conversion failures are reported separately as
//! [`CoercionError`] so callers can decide whether to leave a property at its
//! default or to abort.

use thiserror::Error;

/// Errors raised while building or configuring an object table.
#[derive(Debug, Error)]
pub enum ModelError {
    /// The mapped type exposes no column that would be persisted.
    #[error("OSQL1001: table '{0}' has no persistable columns")]
    NoColumns(String),

    /// Two properties resolve to the same column name (case-insensitive).
    #[error("OSQL1002: duplicate column '{column}' in table '{table}'")]
    DuplicateColumn {
        /// Table being built.
        table: String,
        /// Offending column name.
        column: String,
    },

    /// Two table-level index declarations share a name.
    #[error("OSQL1003: duplicate index '{index}' in table '{table}'")]
    DuplicateIndex {
        /// Table being built.
        table: String,
        /// Offending index name.
        index: String,
    },

    /// The storage type of a column could not be derived from its host type.
    #[error("OSQL1004: storage type of column '{column}' in table '{table}' cannot be inferred")]
    UnknownStorageType {
        /// Table being built.
        table: String,
        /// Column without a storage type.
        column: String,
    },

    /// A table, column, index or collation name is not a usable identifier.
    #[error("OSQL1005: invalid identifier '{0}'")]
    InvalidIdentifier(String),

    /// Auto-increment was requested on a column that is not the row identifier.
    #[error(
        "OSQL1006: column '{column}' in table '{table}' auto-increments but is not the sole INTEGER primary key"
    )]
    InvalidAutoIncrement {
        /// Table being built.
        table: String,
        /// Offending column name.
        column: String,
    },

    /// An index references a column the table does not map.
    #[error("OSQL1007: index '{index}' references unknown column '{column}'")]
    UnknownIndexColumn {
        /// Index name.
        index: String,
        /// Missing column name.
        column: String,
    },

    /// Table-level settings contradict each other.
    #[error("OSQL1008: invalid table '{table}': {reason}")]
    InvalidTable {
        /// Table being built.
        table: String,
        /// Human-readable explanation.
        reason: String,
    },

    /// Configuration file could not be read or written.
    #[error("OSQL1101: I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Configuration file is not valid YAML for the expected options.
    #[error("OSQL1102: YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// A value could not be converted.
    #[error(transparent)]
    Coercion(#[from] CoercionError),
}

impl ModelError {
    /// Stable numeric code, identical to the `OSQLnnnn` prefix of the message.
    pub fn code(&self) -> u32 {
        match self {
            Self::NoColumns(_) => 1001,
            Self::DuplicateColumn { .. } => 1002,
            Self::DuplicateIndex { .. } => 1003,
            Self::UnknownStorageType { .. } => 1004,
            Self::InvalidIdentifier(_) => 1005,
            Self::InvalidAutoIncrement { .. } => 1006,
            Self::UnknownIndexColumn { .. } => 1007,
            Self::InvalidTable { .. } => 1008,
            Self::IoError(_) => 1101,
            Self::YamlError(_) => 1102,
            Self::Coercion(_) => CoercionError::CODE,
        }
    }
}

/// A value could not be converted between its stored and typed forms.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("OSQL1201: cannot convert {from} to {to}")]
pub struct CoercionError {
    /// Description of the source value.
    pub from: String,
    /// Description of the requested target.
    pub to: String,
}

impl CoercionError {
    /// Stable numeric code of every coercion failure.
    pub const CODE: u32 = 1201;

    /// Creates a coercion error from a source and target description.
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Convenience alias for results with [`ModelError`].
pub type Result<T> = std::result::Result<T, ModelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_match_message_prefix() {
        let errors = vec![
            ModelError::NoColumns("t".into()),
            ModelError::DuplicateColumn {
                table: "t".into(),
                column: "c".into(),
            },
            ModelError::InvalidIdentifier(String::new()),
            ModelError::Coercion(CoercionError::new("TEXT 'x'", "I32")),
        ];
        for err in errors {
            let prefix = format!("OSQL{}", err.code());
            assert!(err.to_string().starts_with(&prefix), "{err}");
        }
    }
}
