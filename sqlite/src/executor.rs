//! The statement execution seam used by the save path.
//!
//! Saving only needs three engine primitives. Keeping them behind a trait
//! lets the upsert logic run against a scripted executor in tests.

use objectsql_core::Value;
use rusqlite::{Connection, params_from_iter};
use tracing::{debug, warn};

use crate::convert;
use crate::error::Result;

/// Executes statements for the save path.
pub trait Executor {
    /// Runs one statement with positional arguments and returns the number
    /// of changed rows.
    fn execute(&self, sql: &str, values: &[Value]) -> rusqlite::Result<usize>;

    /// Runs one or more statements without arguments.
    fn execute_batch(&self, sql: &str) -> rusqlite::Result<()>;

    /// Row identifier of the most recent successful insert.
    fn last_insert_rowid(&self) -> i64;
}

impl Executor for Connection {
    fn execute(&self, sql: &str, values: &[Value]) -> rusqlite::Result<usize> {
        debug!(sql, args = values.len(), "execute");
        let mut stmt = self.prepare_cached(sql)?;
        stmt.execute(params_from_iter(values.iter().map(convert::to_sql)))
    }

    fn execute_batch(&self, sql: &str) -> rusqlite::Result<()> {
        debug!(sql, "execute batch");
        Connection::execute_batch(self, sql)
    }

    fn last_insert_rowid(&self) -> i64 {
        Connection::last_insert_rowid(self)
    }
}

/// Runs `body` inside `SAVEPOINT name`, releasing it on success and rolling
/// back to it on failure.
///
/// Savepoints nest, so this works both in autocommit mode and inside a
/// transaction the caller already opened.
pub(crate) fn in_savepoint<E, R>(executor: &E, name: &str, body: impl FnOnce() -> Result<R>) -> Result<R>
where
    E: Executor + ?Sized,
{
    executor.execute_batch(&format!("SAVEPOINT {name}"))?;
    match body() {
        Ok(value) => {
            executor.execute_batch(&format!("RELEASE {name}"))?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = executor.execute_batch(&format!("ROLLBACK TO {name}; RELEASE {name}")) {
                warn!(savepoint = name, error = %rollback_err, "could not roll back savepoint");
            }
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SqliteError;

    #[test]
    fn test_savepoint_nests_inside_open_transaction() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (v INTEGER)").unwrap();
        let tx = conn.unchecked_transaction().unwrap();

        in_savepoint(&conn, "outer", || {
            Executor::execute(&conn, "INSERT INTO t VALUES (?)", &[Value::Integer(1)])?;
            Ok(())
        })
        .unwrap();
        let err = in_savepoint(&conn, "outer", || {
            Executor::execute(&conn, "INSERT INTO t VALUES (?)", &[Value::Integer(2)])?;
            Err::<(), _>(SqliteError::TableNotFound("t".into()))
        })
        .unwrap_err();
        assert_eq!(err.code(), 2003);
        tx.commit().unwrap();

        let values: i64 = conn.query_row("SELECT sum(v) FROM t", [], |row| row.get(0)).unwrap();
        assert_eq!(values, 1);
    }
}
