//! The object table: columns and indices of one mapped type, plus the SQL
//! and value plumbing needed to save and load its instances.
//!
//! An [`ObjectTable`] is produced once per type by the
//! [`TableBuilder`](crate::TableBuilder) and is immutable afterwards. It does
//! not talk to the engine itself; the engine layer executes the statements it
//! renders and feeds result rows back through [`RowSource`].

use std::fmt;

use tracing::warn;

use crate::column::ObjectColumn;
use crate::index::ObjectIndex;
use crate::options::{SaveOptions, TypeOptions};
use crate::sql::quote_identifier;
use crate::types::StorageType;
use crate::value::{HostValue, Value};

/// Read access to one result row by column name.
pub trait RowSource {
    /// Returns the value of the named column, or `None` when the row has no
    /// such column.
    fn try_get_column_value(&self, name: &str) -> Option<Value>;
}

/// Statements and bind values computed for one save call.
#[derive(Debug, Clone, PartialEq)]
pub struct SavePlan {
    /// `UPDATE` statement, when an update should be attempted first.
    pub update_sql: Option<String>,
    /// Values for the `SET` list followed by the primary key values.
    pub update_values: Vec<Value>,
    /// `INSERT` statement.
    pub insert_sql: String,
    /// Values for the insert column list.
    pub insert_values: Vec<Value>,
    /// Primary key tuple of the instance.
    pub primary_key: Vec<Value>,
}

/// The mapped model of one type.
pub struct ObjectTable<T> {
    pub(crate) name: String,
    pub(crate) module: Option<String>,
    pub(crate) module_arguments: Vec<String>,
    pub(crate) disable_row_id: bool,
    pub(crate) columns: Vec<ObjectColumn<T>>,
    pub(crate) indices: Vec<ObjectIndex>,
    pub(crate) type_options: TypeOptions,
}

impl<T> fmt::Debug for ObjectTable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectTable")
            .field("name", &self.name)
            .field("module", &self.module)
            .field("disable_row_id", &self.disable_row_id)
            .field("columns", &self.columns)
            .field("indices", &self.indices)
            .finish_non_exhaustive()
    }
}

impl<T> ObjectTable<T> {
    /// Table name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All columns in their final order, computed ones included.
    pub fn columns(&self) -> &[ObjectColumn<T>] {
        &self.columns
    }

    /// Declared indices.
    pub fn indices(&self) -> &[ObjectIndex] {
        &self.indices
    }

    /// Type options the table was built with.
    pub fn type_options(&self) -> &TypeOptions {
        &self.type_options
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

    /// Whether the table is declared `WITHOUT ROWID`.
    pub fn is_without_row_id(&self) -> bool {
        self.disable_row_id
    }

    /// Finds a column by name, ignoring case.
    pub fn column(&self, name: &str) -> Option<&ObjectColumn<T>> {
        self.columns.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Columns written to the table.
    pub fn persisted_columns(&self) -> impl Iterator<Item = &ObjectColumn<T>> {
        self.columns.iter().filter(|c| c.is_persisted())
    }

    /// Primary key columns in column order.
    pub fn primary_key_columns(&self) -> impl Iterator<Item = &ObjectColumn<T>> {
        self.persisted_columns().filter(|c| c.is_primary_key)
    }

    /// Whether the table declares a primary key.
    pub fn has_primary_key(&self) -> bool {
        self.primary_key_columns().next().is_some()
    }

    /// The column aliasing the engine row identifier, if any.
    pub fn row_id_column(&self) -> Option<&ObjectColumn<T>> {
        self.persisted_columns().find(|c| c.is_row_id)
    }

    fn quoted_name(&self) -> String {
        quote_identifier(&self.name)
    }

    /// Renders the `CREATE TABLE` statement.
    pub fn create_sql(&self) -> String {
        self.create_sql_named(&self.name)
    }

    /// Renders the `CREATE TABLE` statement under another table name.
    ///
    /// Used by the rebuild path to create the temporary table with the new
    /// schema.
    pub fn create_sql_named(&self, name: &str) -> String {
        if let Some(module) = &self.module {
            let mut parts: Vec<String> = self
                .persisted_columns()
                .map(|c| quote_identifier(&c.name))
                .collect();
            parts.extend(self.module_arguments.iter().cloned());
            return format!(
                "CREATE VIRTUAL TABLE {} USING {}({})",
                quote_identifier(name),
                module,
                parts.join(", ")
            );
        }

        let pk_count = self.primary_key_columns().count();
        let mut parts: Vec<String> = self
            .persisted_columns()
            .map(|c| c.create_column_sql(pk_count == 1, &self.type_options))
            .collect();
        if pk_count > 1 {
            let keys: Vec<String> = self
                .primary_key_columns()
                .map(|c| format!("{}{}", quote_identifier(&c.name), c.primary_key_direction.clause()))
                .collect();
            parts.push(format!("PRIMARY KEY ({})", keys.join(", ")));
        }

        let mut sql = format!("CREATE TABLE {} ({})", quote_identifier(name), parts.join(", "));
        if self.disable_row_id {
            sql.push_str(" WITHOUT ROWID");
        }
        sql
    }

    /// Renders `ALTER TABLE ... ADD COLUMN` for one column.
    pub fn add_column_sql(&self, column: &ObjectColumn<T>) -> String {
        format!(
            "ALTER TABLE {} ADD COLUMN {}",
            self.quoted_name(),
            column.create_column_sql(false, &self.type_options)
        )
    }

    /// Renders the full-scan copy from this table into `target`.
    ///
    /// `columns` must exist in both tables.
    pub fn copy_rows_sql(&self, target: &str, columns: &[&str]) -> String {
        let list: Vec<String> = columns.iter().map(|c| quote_identifier(c)).collect();
        let list = list.join(", ");
        format!(
            "INSERT INTO {} ({list}) SELECT {list} FROM {} WHERE true",
            quote_identifier(target),
            self.quoted_name()
        )
    }

    /// `"a" = ? AND "b" = ?` over the primary key columns.
    pub fn primary_key_where_sql(&self) -> String {
        let terms: Vec<String> = self
            .primary_key_columns()
            .map(|c| format!("{} = ?", quote_identifier(&c.name)))
            .collect();
        terms.join(" AND ")
    }

    /// `SELECT * FROM "table"`.
    pub fn select_sql(&self) -> String {
        format!("SELECT * FROM {}", self.quoted_name())
    }

    /// Selects one row by primary key. `None` without a primary key.
    pub fn select_by_primary_key_sql(&self) -> Option<String> {
        self.has_primary_key()
            .then(|| format!("{} WHERE {}", self.select_sql(), self.primary_key_where_sql()))
    }

    /// Deletes one row by primary key. `None` without a primary key.
    pub fn delete_sql(&self) -> Option<String> {
        self.has_primary_key().then(|| {
            format!(
                "DELETE FROM {} WHERE {}",
                self.quoted_name(),
                self.primary_key_where_sql()
            )
        })
    }

    /// Deletes every row.
    pub fn delete_all_sql(&self) -> String {
        format!("DELETE FROM {}", self.quoted_name())
    }

    /// Counts rows.
    pub fn count_sql(&self) -> String {
        format!("SELECT count(*) FROM {}", self.quoted_name())
    }

    /// Primary key values of `instance` in column order, typed.
    pub fn primary_key_values(&self, instance: &T) -> Vec<HostValue> {
        self.primary_key_columns()
            .map(|c| c.value(instance, &self.type_options))
            .collect()
    }

    /// Primary key values of `instance` in column order, ready to bind.
    pub fn primary_key_bind_values(&self, instance: &T) -> Vec<Value> {
        self.primary_key_columns()
            .map(|c| c.value_for_bind(instance, &self.type_options))
            .collect()
    }

    /// Fills automatic values on `instance` before it is saved.
    ///
    /// # Errors
    ///
    /// Returns the first [`CoercionError`](crate::CoercionError) raised by a
    /// generated value that does not fit its property.
    pub fn apply_automatic_values(&self, instance: &mut T) -> Result<(), crate::CoercionError> {
        for column in self.persisted_columns() {
            column.apply_automatic_value(instance, &self.type_options)?;
        }
        Ok(())
    }

    /// Computes the statements and bind values for saving `instance`.
    ///
    /// The update list leaves out computed, engine-assigned, primary key and
    /// insert-only columns. The insert list leaves out computed,
    /// engine-assigned and update-only columns.
    pub fn save_plan(&self, instance: &T, options: &SaveOptions) -> SavePlan {
        let conflict = options.conflict_resolution.clause();
        let table = self.quoted_name();

        let mut set_terms = Vec::new();
        let mut update_values = Vec::new();
        let mut insert_columns = Vec::new();
        let mut insert_values = Vec::new();
        for column in self.persisted_columns() {
            if column.is_engine_assigned() {
                continue;
            }
            let value = column.value_for_bind(instance, &self.type_options);
            if !column.is_primary_key && !column.insert_only {
                set_terms.push(format!("{} = ?", quote_identifier(&column.name)));
                update_values.push(value.clone());
            }
            if !column.update_only {
                insert_columns.push(quote_identifier(&column.name));
                insert_values.push(value);
            }
        }

        let primary_key = self.primary_key_bind_values(instance);
        let unsaved_row_id = self
            .row_id_column()
            .filter(|c| c.auto_increments)
            .is_some_and(|c| is_unset_row_id(&c.value_for_bind(instance, &self.type_options)));

        let update_sql = (!primary_key.is_empty()
            && !set_terms.is_empty()
            && !options.dont_try_update
            && !unsaved_row_id)
            .then(|| {
                update_values.extend(primary_key.iter().cloned());
                format!(
                    "UPDATE{conflict} {table} SET {} WHERE {}",
                    set_terms.join(", "),
                    self.primary_key_where_sql()
                )
            });
        if update_sql.is_none() {
            update_values.clear();
        }

        let insert_sql = if insert_columns.is_empty() {
            format!("INSERT{conflict} INTO {table} DEFAULT VALUES")
        } else {
            let placeholders = vec!["?"; insert_columns.len()].join(", ");
            format!(
                "INSERT{conflict} INTO {table} ({}) VALUES ({placeholders})",
                insert_columns.join(", ")
            )
        };

        SavePlan {
            update_sql,
            update_values,
            insert_sql,
            insert_values,
            primary_key,
        }
    }

    /// Writes the engine-assigned row identifier back onto `instance`.
    ///
    /// Returns `true` when the table has an auto-incrementing row identifier
    /// column with a setter.
    pub fn set_row_id(&self, instance: &mut T, row_id: i64) -> bool {
        let Some(column) = self.row_id_column().filter(|c| c.auto_increments) else {
            return false;
        };
        match column.set_stored_value(instance, &Value::Integer(row_id), &self.type_options) {
            Ok(written) => written,
            Err(err) => {
                warn!(table = %self.name, column = %column.name, error = %err, "cannot assign row id");
                false
            }
        }
    }

    /// Copies every available column of `row` onto `instance`.
    ///
    /// Columns missing from the row are left untouched. A value that cannot
    /// be converted leaves the property at its previous value. Returns the
    /// number of properties written.
    pub fn load_into(&self, row: &impl RowSource, instance: &mut T) -> usize {
        let mut written = 0;
        for column in self.columns.iter().filter(|c| c.setter.is_some()) {
            let Some(value) = row.try_get_column_value(&column.name) else {
                continue;
            };
            match column.set_stored_value(instance, &value, &self.type_options) {
                Ok(true) => written += 1,
                Ok(false) => {}
                Err(err) => {
                    warn!(
                        table = %self.name,
                        column = %column.name,
                        error = %err,
                        "leaving property at its previous value"
                    );
                }
            }
        }
        written
    }

    /// Creates a default instance and loads `row` into it.
    pub fn create_instance(&self, row: &impl RowSource) -> T
    where
        T: Default,
    {
        let mut instance = T::default();
        self.load_into(row, &mut instance);
        instance
    }

    /// Persisted column names in order.
    pub fn column_names(&self) -> Vec<&str> {
        self.persisted_columns().map(|c| c.name.as_str()).collect()
    }

    /// Storage types of the persisted columns in order.
    pub fn storage_types(&self) -> Vec<StorageType> {
        self.persisted_columns().map(|c| c.storage_type).collect()
    }
}

fn is_unset_row_id(value: &Value) -> bool {
    matches!(value, Value::Null | Value::Integer(0))
}
