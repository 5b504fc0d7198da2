//! The [`Database`] facade.
//!
//! Owns the connection, the per-type object table cache and the bind
//! registry, and routes typed saves and loads to the object table model.
//! The introspection methods (`tables`, `get_table`, `table_rows`,
//! `load_rows`, `execute_non_query`, `execute_scalar`) are raw passthroughs
//! and never synchronize schema.
//!
//! # Example
//!
//! ```
//! use objectsql_core::{Mapped, TableDef};
//! use objectsql_sqlite::Database;
//!
//! #[derive(Debug, Default)]
//! struct Note {
//!     id: i64,
//!     text: String,
//! }
//!
//! impl Mapped for Note {
//!     fn describe(table: &mut TableDef<Self>) {
//!         table.column("Id", |n| &n.id, |n| &mut n.id).primary_key().auto_increment();
//!         table.column("Text", |n| &n.text, |n| &mut n.text);
//!     }
//! }
//!
//! let db = Database::open_in_memory().unwrap();
//! let mut note = Note { id: 0, text: "hello".into() };
//! assert!(db.save(&mut note).unwrap());
//! assert_eq!(note.id, 1);
//!
//! let loaded: Vec<Note> = db.load_all().unwrap();
//! assert_eq!(loaded[0].text, "hello");
//! ```

use std::any::{Any, TypeId};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use objectsql_core::{
    DatabaseOptions, LiveTable, Mapped, ObjectTable, SaveOptions, TableBuilder, ThreadingMode, Value,
    sql::quote_identifier,
};
use rusqlite::{Connection, OpenFlags, Transaction};
use tracing::{debug, info};

use crate::error::{Result, SqliteError};
use crate::executor::in_savepoint;
use crate::migration::{self, SyncReport};
use crate::query::{self, Row};
use crate::registry::{BindArg, BindRegistry};
use crate::save;
use crate::schema;

type CachedTable = Arc<dyn Any + Send + Sync>;

/// A connection plus the mapping state attached to it.
pub struct Database {
    conn: Connection,
    path: Option<PathBuf>,
    options: DatabaseOptions,
    tables: RwLock<HashMap<TypeId, CachedTable>>,
    synchronized: Mutex<HashSet<TypeId>>,
    registry: BindRegistry,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("path", &self.path)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Database {
    /// Opens (or creates) a database file with default options.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, DatabaseOptions::default())
    }

    /// Opens (or creates) a database file.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteError::DatabaseError`] if the file cannot be opened
    /// or a connection setting is rejected.
    pub fn open_with(path: impl AsRef<Path>, options: DatabaseOptions) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open_with_flags(&path, open_flags(options.threading))?;
        Self::from_connection(conn, Some(path), options)
    }

    /// Opens a private in-memory database with default options.
    pub fn open_in_memory() -> Result<Self> {
        Self::open_in_memory_with(DatabaseOptions::default())
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory_with(options: DatabaseOptions) -> Result<Self> {
        let conn = Connection::open_in_memory_with_flags(open_flags(options.threading))?;
        Self::from_connection(conn, None, options)
    }

    fn from_connection(conn: Connection, path: Option<PathBuf>, options: DatabaseOptions) -> Result<Self> {
        if let Some(ms) = options.busy_timeout_ms {
            conn.busy_timeout(Duration::from_millis(ms))?;
        }
        if let Some(on) = options.foreign_keys {
            conn.pragma_update(None, "foreign_keys", on)?;
        }
        if let Some(mode) = &options.journal_mode {
            let applied: String =
                conn.pragma_update_and_check(None, "journal_mode", mode, |row| row.get(0))?;
            debug!(requested = %mode, applied = %applied, "journal mode");
        }
        info!(path = ?path, threading = ?options.threading, "opened database");
        Ok(Self {
            conn,
            path,
            options,
            tables: RwLock::new(HashMap::new()),
            synchronized: Mutex::new(HashSet::new()),
            registry: BindRegistry::default(),
        })
    }

    /// Underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// File path, `None` for in-memory databases.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Options the database was opened with.
    pub fn options(&self) -> &DatabaseOptions {
        &self.options
    }

    /// Registry used to convert statement arguments.
    pub fn bind_registry(&self) -> &BindRegistry {
        &self.registry
    }

    /// Returns the cached object table of `T`, building it on first use.
    ///
    /// Concurrent first uses may each build the table; the first one
    /// stored is returned to everyone.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteError::Model`] when `T` cannot be mapped.
    pub fn table<T: Mapped>(&self) -> Result<Arc<ObjectTable<T>>> {
        let key = TypeId::of::<T>();
        let cached = self
            .tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned();
        if let Some(table) = cached.and_then(|t| t.downcast::<ObjectTable<T>>().ok()) {
            return Ok(table);
        }

        let built = Arc::new(TableBuilder::new(&self.options.type_options).build::<T>()?);
        debug!(table = built.name(), "built object table");
        let stored = self
            .tables
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key)
            .or_insert_with(|| built.clone() as CachedTable)
            .clone();
        Ok(stored.downcast::<ObjectTable<T>>().unwrap_or(built))
    }

    /// Synchronizes the table of `T` with the database's save options.
    pub fn synchronize_schema<T: Mapped>(&self) -> Result<SyncReport> {
        self.synchronize_schema_with::<T>(&self.options.save_options)
    }

    /// Synchronizes the table of `T`.
    ///
    /// # Errors
    ///
    /// See [`migration::synchronize`].
    pub fn synchronize_schema_with<T: Mapped>(&self, options: &SaveOptions) -> Result<SyncReport> {
        let table = self.table::<T>()?;
        let report = migration::synchronize(&self.conn, &*table, options)?;
        self.synchronized
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(TypeId::of::<T>());
        Ok(report)
    }

    /// Synchronizes `T` once per database unless synchronization is off.
    fn ensure_synchronized<T: Mapped>(&self, options: &SaveOptions) -> Result<()> {
        if !options.synchronize_schema {
            return Ok(());
        }
        let done = self
            .synchronized
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&TypeId::of::<T>());
        if !done {
            self.synchronize_schema_with::<T>(options)?;
        }
        Ok(())
    }

    /// Saves `instance` with the database's save options.
    pub fn save<T: Mapped>(&self, instance: &mut T) -> Result<bool> {
        self.save_with(instance, &self.options.save_options)
    }

    /// Saves `instance`, inserting or updating as needed.
    ///
    /// Returns `true` when a row changed.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteError`] for mapping, synchronization or engine
    /// failures. A concurrent insert of the same row is not an error.
    pub fn save_with<T: Mapped>(&self, instance: &mut T, options: &SaveOptions) -> Result<bool> {
        self.ensure_synchronized::<T>(options)?;
        let table = self.table::<T>()?;
        save::save(&self.conn, &*table, instance, options)
    }

    /// Saves every instance inside one transaction and returns how many
    /// changed a row.
    pub fn save_all<T: Mapped>(&self, instances: &mut [T]) -> Result<usize> {
        let options = &self.options.save_options;
        self.ensure_synchronized::<T>(options)?;
        let table = self.table::<T>()?;
        in_savepoint(&self.conn, "objectsql_save_all", || {
            let mut changed = 0;
            for instance in instances.iter_mut() {
                if save::save(&self.conn, &*table, instance, options)? {
                    changed += 1;
                }
            }
            Ok(changed)
        })
    }

    /// Runs `sql` and materializes each row as `T`.
    pub fn load<T: Mapped>(&self, sql: &str, args: &[&dyn BindArg]) -> Result<Vec<T>> {
        let table = self.table::<T>()?;
        let args = self.bind(args)?;
        let rows = query::load_rows(&self.conn, sql, &args, None)?;
        Ok(rows.iter().map(|row| self.materialize(&*table, row)).collect())
    }

    /// Loads every row of `T`'s table.
    pub fn load_all<T: Mapped>(&self) -> Result<Vec<T>> {
        let table = self.table::<T>()?;
        let rows = query::load_rows(&self.conn, &table.select_sql(), &[], None)?;
        Ok(rows.iter().map(|row| self.materialize(&*table, row)).collect())
    }

    /// Loads the row of `T` with the given primary key values.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteError::NoPrimaryKey`] when `T` has no primary key.
    pub fn load_by_primary_key<T: Mapped>(&self, keys: &[&dyn BindArg]) -> Result<Option<T>> {
        let table = self.table::<T>()?;
        let sql = table
            .select_by_primary_key_sql()
            .ok_or_else(|| SqliteError::NoPrimaryKey(table.name().to_string()))?;
        let args = self.bind(keys)?;
        let rows = query::load_rows(&self.conn, &sql, &args, Some(1))?;
        Ok(rows.first().map(|row| self.materialize(&*table, row)))
    }

    /// Counts the rows of `T`'s table.
    pub fn count<T: Mapped>(&self) -> Result<i64> {
        let table = self.table::<T>()?;
        match query::execute_scalar(&self.conn, &table.count_sql(), &[])? {
            Value::Integer(count) => Ok(count),
            _ => Ok(0),
        }
    }

    /// Deletes the row of `instance` by primary key. Returns `true` when a
    /// row was removed.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteError::NoPrimaryKey`] when `T` has no primary key.
    pub fn delete<T: Mapped>(&self, instance: &T) -> Result<bool> {
        let table = self.table::<T>()?;
        let sql = table
            .delete_sql()
            .ok_or_else(|| SqliteError::NoPrimaryKey(table.name().to_string()))?;
        let keys = table.primary_key_bind_values(instance);
        Ok(query::execute_non_query(&self.conn, &sql, &keys)? > 0)
    }

    /// Deletes every row of `T`'s table and returns the number removed.
    pub fn delete_all<T: Mapped>(&self) -> Result<usize> {
        let table = self.table::<T>()?;
        query::execute_non_query(&self.conn, &table.delete_all_sql(), &[])
    }

    fn materialize<T: Mapped>(&self, table: &ObjectTable<T>, row: &Row) -> T {
        let mut instance: T = table.create_instance(row);
        if !self.options.save_options.object_events_disabled {
            instance.on_loaded();
        }
        instance
    }

    fn bind(&self, args: &[&dyn BindArg]) -> Result<Vec<Value>> {
        self.registry.bind_all(args, &self.options.type_options)
    }

    /// Live descriptors of every user table.
    pub fn tables(&self) -> Result<Vec<LiveTable>> {
        schema::load_tables(&self.conn)
    }

    /// Live descriptor of one table.
    pub fn get_table(&self, name: &str) -> Result<Option<LiveTable>> {
        schema::load_table(&self.conn, name)
    }

    /// Whether a table exists.
    pub fn table_exists(&self, name: &str) -> Result<bool> {
        schema::table_exists(&self.conn, name)
    }

    /// Reads up to `max_rows` rows of a table (all when `None`).
    ///
    /// # Errors
    ///
    /// Returns [`SqliteError::TableNotFound`] when the table does not exist.
    pub fn table_rows(&self, name: &str, max_rows: Option<usize>) -> Result<Vec<Row>> {
        let table = self
            .get_table(name)?
            .ok_or_else(|| SqliteError::TableNotFound(name.to_string()))?;
        let sql = format!("SELECT * FROM {}", quote_identifier(&table.name));
        query::load_rows(&self.conn, &sql, &[], max_rows)
    }

    /// Runs a query and returns name/value rows.
    pub fn load_rows(&self, sql: &str, args: &[&dyn BindArg]) -> Result<Vec<Row>> {
        let args = self.bind(args)?;
        query::load_rows(&self.conn, sql, &args, None)
    }

    /// Runs a statement and returns the number of changed rows.
    pub fn execute_non_query(&self, sql: &str, args: &[&dyn BindArg]) -> Result<usize> {
        let args = self.bind(args)?;
        query::execute_non_query(&self.conn, sql, &args)
    }

    /// Returns the first column of the first row, or NULL.
    pub fn execute_scalar(&self, sql: &str, args: &[&dyn BindArg]) -> Result<Value> {
        let args = self.bind(args)?;
        query::execute_scalar(&self.conn, sql, &args)
    }

    /// Drops a table if it exists. Returns `true` when it existed.
    ///
    /// Every mapped type is synchronized again on its next save.
    pub fn delete_table(&self, name: &str) -> Result<bool> {
        let Some(table) = self.get_table(name)? else {
            return Ok(false);
        };
        self.conn
            .execute_batch(&format!("DROP TABLE {}", quote_identifier(&table.name)))?;
        self.synchronized
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        info!(table = %table.name, "dropped table");
        Ok(true)
    }

    /// Rebuilds the database file to reclaim free pages.
    pub fn vacuum(&self) -> Result<()> {
        self.conn.execute_batch("VACUUM")?;
        Ok(())
    }

    /// Starts a transaction; it rolls back unless committed.
    pub fn begin_transaction(&self) -> Result<Transaction<'_>> {
        Ok(self.conn.unchecked_transaction()?)
    }
}

fn open_flags(threading: ThreadingMode) -> OpenFlags {
    let flags = OpenFlags::default();
    match threading {
        ThreadingMode::Default => flags,
        ThreadingMode::MultiThread => {
            (flags - OpenFlags::SQLITE_OPEN_FULL_MUTEX) | OpenFlags::SQLITE_OPEN_NO_MUTEX
        }
        ThreadingMode::Serialized => {
            (flags - OpenFlags::SQLITE_OPEN_NO_MUTEX) | OpenFlags::SQLITE_OPEN_FULL_MUTEX
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_flags_follow_threading_mode() {
        let serialized = open_flags(ThreadingMode::Serialized);
        assert!(serialized.contains(OpenFlags::SQLITE_OPEN_FULL_MUTEX));
        assert!(!serialized.contains(OpenFlags::SQLITE_OPEN_NO_MUTEX));
        let multi = open_flags(ThreadingMode::MultiThread);
        assert!(multi.contains(OpenFlags::SQLITE_OPEN_NO_MUTEX));
        assert!(!multi.contains(OpenFlags::SQLITE_OPEN_FULL_MUTEX));
    }

    #[test]
    fn test_connection_settings_applied() {
        let options = DatabaseOptions {
            busy_timeout_ms: Some(250),
            foreign_keys: Some(true),
            ..DatabaseOptions::default()
        };
        let db = Database::open_in_memory_with(options).unwrap();
        let fk: i64 = db
            .connection()
            .pragma_query_value(None, "foreign_keys", |row| row.get(0))
            .unwrap();
        assert_eq!(fk, 1);
        let timeout: i64 = db
            .connection()
            .pragma_query_value(None, "busy_timeout", |row| row.get(0))
            .unwrap();
        assert_eq!(timeout, 250);
        assert!(db.path().is_none());
    }
}
