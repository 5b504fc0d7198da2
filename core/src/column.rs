//! The object column model: one mapped property.
//!
//! An [`ObjectColumn`] carries the column's schema attributes together with
//! the accessor closures used to read the property from an instance and to
//! write a stored value back onto it. Columns are created by the
//! [`TableBuilder`](crate::TableBuilder) and never change afterwards.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::coerce;
use crate::error::CoercionError;
use crate::options::TypeOptions;
use crate::sql::{literal, normalize_default, quote_identifier};
use crate::types::{AutomaticValue, HostKind, LiveColumn, SortDirection, StorageType};
use crate::value::{HostValue, Value};

/// Reads a property value from an instance.
pub type Getter<T> = Arc<dyn Fn(&T) -> HostValue + Send + Sync>;

/// Writes a typed value onto an instance.
pub type Setter<T> = Arc<dyn Fn(&mut T, HostValue) -> Result<(), CoercionError> + Send + Sync>;

/// Reads the primary key tuple of a referenced mapped object, if any.
pub type KeyGetter<T> = Arc<dyn Fn(&T, &TypeOptions) -> Option<Vec<HostValue>> + Send + Sync>;

/// How a column obtains the value it binds.
#[derive(Clone)]
pub(crate) enum Accessor<T> {
    /// The property value itself.
    Value(Getter<T>),
    /// The primary key of the mapped object the property refers to.
    Reference(KeyGetter<T>),
}

/// Default value of a column.
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    /// A literal, coerced like any other value of the column.
    Literal(HostValue),
    /// A SQL expression evaluated by the engine (an intrinsic default).
    Expression(String),
}

/// One mapped property of an [`ObjectTable`](crate::ObjectTable).
pub struct ObjectColumn<T> {
    pub(crate) name: String,
    pub(crate) property: String,
    pub(crate) storage_type: StorageType,
    pub(crate) host_kind: HostKind,
    pub(crate) is_primary_key: bool,
    pub(crate) primary_key_direction: SortDirection,
    pub(crate) is_unique: bool,
    pub(crate) is_nullable: bool,
    pub(crate) is_row_id: bool,
    pub(crate) auto_increments: bool,
    pub(crate) automatic_value: AutomaticValue,
    pub(crate) default_value: Option<DefaultValue>,
    pub(crate) check_expression: Option<String>,
    pub(crate) collation: Option<String>,
    pub(crate) insert_only: bool,
    pub(crate) update_only: bool,
    pub(crate) is_computed: bool,
    pub(crate) sort_order: Option<i32>,
    pub(crate) accessor: Accessor<T>,
    pub(crate) setter: Option<Setter<T>>,
}

impl<T> fmt::Debug for ObjectColumn<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectColumn")
            .field("name", &self.name)
            .field("storage_type", &self.storage_type)
            .field("host_kind", &self.host_kind)
            .field("is_primary_key", &self.is_primary_key)
            .field("is_row_id", &self.is_row_id)
            .field("is_nullable", &self.is_nullable)
            .field("auto_increments", &self.auto_increments)
            .field("is_computed", &self.is_computed)
            .finish_non_exhaustive()
    }
}

impl<T> ObjectColumn<T> {
    /// Column name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the property the column maps.
    pub fn property(&self) -> &str {
        &self.property
    }

    /// Declared storage type.
    pub fn storage_type(&self) -> StorageType {
        self.storage_type
    }

    /// Host kind of the property.
    pub fn host_kind(&self) -> HostKind {
        self.host_kind
    }

    /// Whether the column is part of the primary key.
    pub fn is_primary_key(&self) -> bool {
        self.is_primary_key
    }

    /// Whether the column aliases the engine's row identifier.
    pub fn is_row_id(&self) -> bool {
        self.is_row_id
    }

    /// Whether the column carries a `UNIQUE` constraint.
    pub fn is_unique(&self) -> bool {
        self.is_unique
    }

    /// Whether the column accepts NULL.
    pub fn is_nullable(&self) -> bool {
        self.is_nullable
    }

    /// Whether the property has no setter.
    pub fn is_read_only(&self) -> bool {
        self.setter.is_none()
    }

    /// Whether the engine assigns the value (`AUTOINCREMENT` row identifier).
    pub fn auto_increments(&self) -> bool {
        self.auto_increments
    }

    /// Automatic value rule applied before saving.
    pub fn automatic_value(&self) -> AutomaticValue {
        self.automatic_value
    }

    /// Whether the column is excluded from persistence.
    pub fn is_computed(&self) -> bool {
        self.is_computed
    }

    /// Whether the column is only written by INSERT.
    pub fn is_insert_only(&self) -> bool {
        self.insert_only
    }

    /// Whether the column is only written by UPDATE.
    pub fn is_update_only(&self) -> bool {
        self.update_only
    }

    /// Default value, if any.
    pub fn default_value(&self) -> Option<&DefaultValue> {
        self.default_value.as_ref()
    }

    /// Whether a default value is declared.
    pub fn has_default_value(&self) -> bool {
        self.default_value.is_some()
    }

    /// Whether the default is a SQL expression rather than a literal.
    pub fn is_default_value_intrinsic(&self) -> bool {
        matches!(self.default_value, Some(DefaultValue::Expression(_)))
    }

    /// `CHECK` expression, if any.
    pub fn check_expression(&self) -> Option<&str> {
        self.check_expression.as_deref()
    }

    /// Collation name, if any.
    pub fn collation(&self) -> Option<&str> {
        self.collation.as_deref()
    }

    /// Whether the column is written to the table at all.
    pub fn is_persisted(&self) -> bool {
        !self.is_computed
    }

    /// Whether the value is assigned by the engine and must never be bound
    /// explicitly.
    pub fn is_engine_assigned(&self) -> bool {
        self.auto_increments && self.is_row_id
    }

    /// Whether `ALTER TABLE ... ADD COLUMN` can add this column to a table
    /// that already holds rows.
    pub fn is_addable(&self) -> bool {
        !self.is_primary_key
            && !self.is_unique
            && !self.is_default_value_intrinsic()
            && (self.is_nullable || self.has_default_value())
    }

    /// Reads the property value of `instance`.
    ///
    /// Reference columns yield the referenced object's key: the single key
    /// value, or all key values joined with the configured separator.
    pub fn value(&self, instance: &T, options: &TypeOptions) -> HostValue {
        match &self.accessor {
            Accessor::Value(get) => get(instance),
            Accessor::Reference(keys) => match keys(instance, options) {
                None => HostValue::Null,
                Some(mut parts) if parts.len() == 1 => parts.remove(0),
                Some(parts) => HostValue::Text(
                    parts
                        .iter()
                        .map(|part| coerce::to_storage(part, options).to_string())
                        .collect::<Vec<_>>()
                        .join(&options.key_separator),
                ),
            },
        }
    }

    /// Returns the stored value to bind for `instance`.
    ///
    /// A nullable column whose value equals its literal default binds NULL.
    pub fn value_for_bind(&self, instance: &T, options: &TypeOptions) -> Value {
        let value = coerce::to_storage(&self.value(instance, options), options);
        if self.is_nullable
            && let Some(DefaultValue::Literal(default)) = &self.default_value
            && coerce::to_storage(default, options) == value
        {
            return Value::Null;
        }
        value
    }

    /// Coerces a stored value to the property's type and writes it.
    ///
    /// Returns `Ok(false)` when the property is read-only.
    ///
    /// # Errors
    ///
    /// Returns the [`CoercionError`] when the value cannot be converted;
    /// the instance is left unchanged in that case.
    pub fn set_stored_value(
        &self,
        instance: &mut T,
        value: &Value,
        options: &TypeOptions,
    ) -> Result<bool, CoercionError> {
        let Some(set) = &self.setter else {
            return Ok(false);
        };
        let host = coerce::from_storage(value, self.host_kind, options)?;
        set(instance, host)?;
        Ok(true)
    }

    /// Writes a typed value onto the property.
    ///
    /// Returns `Ok(false)` when the property is read-only.
    ///
    /// # Errors
    ///
    /// Returns the [`CoercionError`] when the value does not fit the
    /// property type.
    pub fn set_value(&self, instance: &mut T, value: HostValue) -> Result<bool, CoercionError> {
        match &self.setter {
            Some(set) => set(instance, value).map(|()| true),
            None => Ok(false),
        }
    }

    /// Applies the column's automatic value rule to `instance`.
    ///
    /// Returns `Ok(true)` when a value was written.
    ///
    /// # Errors
    ///
    /// Returns the [`CoercionError`] when the generated value does not fit
    /// the property type.
    pub fn apply_automatic_value(
        &self,
        instance: &mut T,
        options: &TypeOptions,
    ) -> Result<bool, CoercionError> {
        if self.automatic_value == AutomaticValue::None || self.setter.is_none() {
            return Ok(false);
        }
        let current = self.value(instance, options);
        let generated = match self.automatic_value {
            AutomaticValue::None => None,
            AutomaticValue::NewGuid => Some(HostValue::Guid(Uuid::new_v4())),
            AutomaticValue::NewGuidIfEmpty => match current {
                HostValue::Null => Some(HostValue::Guid(Uuid::new_v4())),
                HostValue::Guid(id) if id.is_nil() => Some(HostValue::Guid(Uuid::new_v4())),
                _ => None,
            },
            AutomaticValue::Random => Some(self.random_value()),
            AutomaticValue::RandomIfZero => match current {
                HostValue::Null | HostValue::Int(0) | HostValue::UInt(0) => Some(self.random_value()),
                HostValue::Float(v) if v == 0.0 => Some(self.random_value()),
                _ => None,
            },
            AutomaticValue::CurrentTime => Some(HostValue::DateTime(Utc::now())),
            AutomaticValue::CurrentTimeIfNotSet => match current {
                HostValue::Null => Some(HostValue::DateTime(Utc::now())),
                HostValue::DateTime(v) if v == DateTime::UNIX_EPOCH => {
                    Some(HostValue::DateTime(Utc::now()))
                }
                _ => None,
            },
            AutomaticValue::MachineName => Some(HostValue::Text(machine_name())),
            AutomaticValue::MachineNameIfNull => is_blank(&current).then(|| HostValue::Text(machine_name())),
            AutomaticValue::UserName => Some(HostValue::Text(user_name())),
            AutomaticValue::UserNameIfNull => is_blank(&current).then(|| HostValue::Text(user_name())),
        };
        match generated {
            Some(value) => self.set_value(instance, value),
            None => Ok(false),
        }
    }

    /// A random value that fits the column's host kind.
    fn random_value(&self) -> HostValue {
        match self.host_kind {
            HostKind::I8 => HostValue::Int(i64::from(rand::random::<i8>())),
            HostKind::I16 => HostValue::Int(i64::from(rand::random::<i16>())),
            HostKind::I32 => HostValue::Int(i64::from(rand::random::<i32>())),
            HostKind::U8 => HostValue::UInt(u64::from(rand::random::<u8>())),
            HostKind::U16 => HostValue::UInt(u64::from(rand::random::<u16>())),
            HostKind::U32 => HostValue::UInt(u64::from(rand::random::<u32>())),
            HostKind::U64 => HostValue::UInt(rand::random::<u64>()),
            HostKind::F32 | HostKind::F64 => HostValue::Float(rand::random::<f64>()),
            HostKind::Guid => HostValue::Guid(Uuid::new_v4()),
            HostKind::Bool => HostValue::Bool(rand::random::<bool>()),
            _ => HostValue::Int(rand::random::<i64>()),
        }
    }

    /// Renders the column's default clause value, if any.
    pub fn default_value_sql(&self, options: &TypeOptions) -> Option<String> {
        match self.default_value.as_ref()? {
            DefaultValue::Literal(value) => Some(literal(&coerce::to_storage(value, options))),
            DefaultValue::Expression(expression) => Some(format!("({expression})")),
        }
    }

    /// Renders the column definition fragment.
    ///
    /// Clauses appear in a fixed order: type, `PRIMARY KEY` (inline only
    /// when `inline_primary_key`), `AUTOINCREMENT`, `UNIQUE`, `CHECK`,
    /// `NOT NULL`, `DEFAULT`, `COLLATE`.
    pub fn create_column_sql(&self, inline_primary_key: bool, options: &TypeOptions) -> String {
        let mut sql = format!("{} {}", quote_identifier(&self.name), self.storage_type.as_sql());
        if inline_primary_key && self.is_primary_key {
            sql.push_str(" PRIMARY KEY");
            sql.push_str(self.primary_key_direction.clause());
            if self.auto_increments {
                sql.push_str(" AUTOINCREMENT");
            }
        }
        if self.is_unique {
            sql.push_str(" UNIQUE");
        }
        if let Some(check) = &self.check_expression {
            sql.push_str(&format!(" CHECK ({check})"));
        }
        if !self.is_nullable {
            sql.push_str(" NOT NULL");
        }
        if let Some(default) = self.default_value_sql(options) {
            sql.push_str(" DEFAULT ");
            sql.push_str(&default);
        }
        if let Some(collation) = &self.collation {
            sql.push_str(" COLLATE ");
            sql.push_str(&quote_identifier(collation));
        }
        sql
    }

    /// Whether the live column matches this column: name (case-insensitive),
    /// nullability, default value, primary key membership and storage type.
    pub fn is_synchronized_with(&self, live: &LiveColumn, options: &TypeOptions) -> bool {
        if !self.name.eq_ignore_ascii_case(&live.name) {
            return false;
        }
        if live.not_null == self.is_nullable {
            return false;
        }
        if (live.primary_key > 0) != self.is_primary_key {
            return false;
        }
        if live.storage_type() != self.storage_type {
            return false;
        }
        let ours = self.default_value_sql(options).map(|d| normalize_default(&d));
        let theirs = live.default_value.as_deref().map(normalize_default);
        ours == theirs
    }
}

fn is_blank(value: &HostValue) -> bool {
    match value {
        HostValue::Null => true,
        HostValue::Text(text) => text.is_empty(),
        _ => false,
    }
}

fn machine_name() -> String {
    std::env::var("HOSTNAME")
        .or_else(|_| std::env::var("COMPUTERNAME"))
        .ok()
        .or_else(|| {
            std::fs::read_to_string("/etc/hostname")
                .ok()
                .map(|s| s.trim().to_string())
        })
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}

fn user_name() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_default()
}
