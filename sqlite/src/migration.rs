//! Schema synchronization against the live database.
//!
//! [`synchronize`] loads the live table, lets the model pick a
//! [`SyncAction`] and executes it:
//!
//! - **Create** runs `CREATE TABLE`. Losing a creation race to another
//!   connection is tolerated.
//! - **AlterAdd** runs one `ALTER TABLE ... ADD COLUMN` per new column.
//! - **RebuildMigrate** creates a temporary table with the new schema,
//!   copies the rows, drops the old table and renames the temporary one.
//!   Live indices whose columns survive are recreated afterwards.
//!
//! Declared indices are then created if missing. Indices are never dropped.
//!
//! # Failure during a rebuild
//!
//! If creating or filling the temporary table fails, the temporary table is
//! dropped (best effort) and the original error is returned. If the old
//! table was dropped but the rename fails, the rows only exist in the
//! temporary table; [`SqliteError::MigrationWindow`] names it and nothing
//! is retried.

use objectsql_core::{LiveTable, ObjectTable, SaveOptions, SyncAction};
use rusqlite::{Connection, MAIN_DB};
use serde::Serialize;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::{Result, SqliteError, is_table_already_exists};
use crate::executor::in_savepoint;
use crate::schema;

const SYNC_SAVEPOINT: &str = "objectsql_sync";

/// Outcome of one synchronization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Table that was synchronized.
    pub table: String,
    /// Action selected for the table.
    pub action: SyncAction,
    /// Every DDL statement executed, indices included.
    pub statements: Vec<String>,
    /// Names of the indices created.
    pub indices_created: Vec<String>,
    /// Temporary table used by a rebuild.
    pub temp_table: Option<String>,
}

impl SyncReport {
    fn new(table: &str, action: SyncAction) -> Self {
        Self {
            table: table.to_string(),
            action,
            statements: Vec::new(),
            indices_created: Vec::new(),
            temp_table: None,
        }
    }

    /// Whether no statement was executed.
    pub fn is_unchanged(&self) -> bool {
        self.statements.is_empty()
    }

    fn run(&mut self, conn: &Connection, sql: &str) -> rusqlite::Result<()> {
        debug!(sql, "schema statement");
        conn.execute_batch(sql)?;
        self.statements.push(sql.to_string());
        Ok(())
    }
}

/// Brings the live table in line with `table`.
///
/// # Errors
///
/// Returns [`SqliteError::DatabaseError`] for engine failures,
/// [`SqliteError::MigrationPreflight`] when a rebuild was refused before
/// touching the old table, and [`SqliteError::MigrationWindow`] when the old
/// table is gone but the rebuilt one could not take its name.
pub fn synchronize<T>(
    conn: &Connection,
    table: &ObjectTable<T>,
    options: &SaveOptions,
) -> Result<SyncReport> {
    let live = schema::load_table(conn, table.name())?;
    let action = table.sync_action(live.as_ref(), options);
    let mut report = SyncReport::new(table.name(), action.clone());

    match (&action, &live) {
        (SyncAction::NoOp, _) => {}
        (SyncAction::Create, _) => create(conn, table, &mut report)?,
        (SyncAction::AlterAdd(columns), _) => {
            for name in columns {
                if let Some(column) = table.column(name) {
                    report.run(conn, &table.add_column_sql(column))?;
                }
            }
            info!(table = table.name(), columns = ?columns, "added columns");
        }
        (SyncAction::RebuildMigrate, Some(live)) => rebuild(conn, table, live, options, &mut report)?,
        (SyncAction::RebuildMigrate, None) => create(conn, table, &mut report)?,
    }

    if options.synchronize_indices && !table.is_virtual() {
        let live = if report.statements.is_empty() {
            live
        } else {
            schema::load_table(conn, table.name())?
        };
        for index in table.missing_indices(live.as_ref()) {
            report.run(conn, &index.create_sql(table.name()))?;
            report.indices_created.push(index.name.clone());
        }
        if !report.indices_created.is_empty() {
            info!(table = table.name(), indices = ?report.indices_created, "created indices");
        }
    }

    Ok(report)
}

fn create<T>(conn: &Connection, table: &ObjectTable<T>, report: &mut SyncReport) -> Result<()> {
    match report.run(conn, &table.create_sql()) {
        Ok(()) => {
            info!(table = table.name(), "created table");
            Ok(())
        }
        Err(err) if is_table_already_exists(&err) => {
            warn!(table = table.name(), "table was created concurrently");
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

fn rebuild<T>(
    conn: &Connection,
    table: &ObjectTable<T>,
    live: &LiveTable,
    options: &SaveOptions,
    report: &mut SyncReport,
) -> Result<()> {
    let temp = format!(
        "{}_{}_{}",
        options.temp_table_prefix,
        table.name(),
        Uuid::new_v4().simple()
    );
    let copied = table.copyable_columns(live);
    info!(table = table.name(), temp_table = %temp, columns = copied.len(), "rebuilding table");
    report.temp_table = Some(temp.clone());

    let filled = if options.use_transaction_for_schema_synchronization {
        in_savepoint(conn, SYNC_SAVEPOINT, || fill_temp_table(conn, table, &temp, &copied, report))
    } else {
        fill_temp_table(conn, table, &temp, &copied, report)
    };
    if let Err(err) = filled {
        drop_temp_table(conn, &temp);
        return Err(err);
    }

    if options.preflight_migration_check
        && let Err(err) = preflight(conn, table.name())
    {
        drop_temp_table(conn, &temp);
        return Err(err);
    }

    let quoted = objectsql_core::sql::quote_identifier(table.name());
    if let Err(err) = report.run(conn, &format!("DROP TABLE {quoted}")) {
        drop_temp_table(conn, &temp);
        return Err(err.into());
    }

    let rename = format!(
        "ALTER TABLE {} RENAME TO {quoted}",
        objectsql_core::sql::quote_identifier(&temp)
    );
    if let Err(source) = report.run(conn, &rename) {
        error!(
            table = table.name(),
            temp_table = %temp,
            error = %source,
            "table dropped but rename failed; rows remain in the temporary table"
        );
        return Err(SqliteError::MigrationWindow {
            table: table.name().to_string(),
            temp_table: temp,
            source,
        });
    }

    for index in &live.indices {
        let Some(sql) = &index.sql else {
            continue;
        };
        if index.columns.iter().all(|c| table.column(c).is_some_and(|c| c.is_persisted())) {
            report.run(conn, sql)?;
        } else {
            info!(table = table.name(), index = %index.name, "not restoring index over removed columns");
        }
    }
    Ok(())
}

fn fill_temp_table<T>(
    conn: &Connection,
    table: &ObjectTable<T>,
    temp: &str,
    columns: &[&str],
    report: &mut SyncReport,
) -> Result<()> {
    report.run(conn, &table.create_sql_named(temp))?;
    if !columns.is_empty() {
        report.run(conn, &table.copy_rows_sql(temp, columns))?;
    }
    Ok(())
}

/// Refuses the destructive part of a rebuild on a database that will not
/// accept writes.
fn preflight(conn: &Connection, table: &str) -> Result<()> {
    let refuse = |reason: &str| SqliteError::MigrationPreflight {
        table: table.to_string(),
        reason: reason.to_string(),
    };
    if conn.is_readonly(MAIN_DB)? {
        return Err(refuse("database is read-only"));
    }
    let query_only: i64 = conn.pragma_query_value(None, "query_only", |row| row.get(0))?;
    if query_only != 0 {
        return Err(refuse("connection is query-only"));
    }
    Ok(())
}

fn drop_temp_table(conn: &Connection, temp: &str) {
    let sql = format!("DROP TABLE IF EXISTS {}", objectsql_core::sql::quote_identifier(temp));
    if let Err(err) = conn.execute_batch(&sql) {
        warn!(temp_table = %temp, error = %err, "could not remove temporary table");
    }
}
