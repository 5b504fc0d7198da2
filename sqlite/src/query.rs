//! Raw query execution and name/value rows.
//!
//! [`Row`] is what raw SQL passthroughs return and what typed loading reads
//! from: an ordered list of column names with their values, looked up by
//! name without regard to case.

use objectsql_core::{RowSource, Value};
use rusqlite::{Connection, OptionalExtension, params_from_iter};
use serde::ser::{Serialize, SerializeMap, Serializer};
use tracing::debug;

use crate::convert;
use crate::error::Result;

/// One result row.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl Row {
    /// Creates a row from parallel name and value lists.
    pub fn new(columns: Vec<String>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    /// Column names in result order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Values in result order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Whether the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Value of the named column, ignoring case.
    ///
    /// A name without a value (a row built from a shorter value list)
    /// yields `None`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
            .and_then(|i| self.values.get(i))
    }

    /// Iterates `(name, value)` pairs in result order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(String::as_str).zip(&self.values)
    }
}

impl RowSource for Row {
    fn try_get_column_value(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Runs a query and collects every row, up to `max_rows` when given.
pub fn load_rows(
    conn: &Connection,
    sql: &str,
    args: &[Value],
    max_rows: Option<usize>,
) -> Result<Vec<Row>> {
    debug!(sql, args = args.len(), "query");
    let mut stmt = conn.prepare(sql)?;
    let columns: Vec<String> = stmt.column_names().iter().map(|c| (*c).to_string()).collect();
    let mut rows = stmt.query(params_from_iter(args.iter().map(convert::to_sql)))?;

    let mut loaded = Vec::new();
    while max_rows.is_none_or(|max| loaded.len() < max) {
        let Some(row) = rows.next()? else {
            break;
        };
        let values = (0..columns.len())
            .map(|i| row.get_ref(i).map(convert::from_sql))
            .collect::<rusqlite::Result<Vec<_>>>()?;
        loaded.push(Row::new(columns.clone(), values));
    }
    Ok(loaded)
}

/// Runs a statement and returns the number of changed rows.
pub fn execute_non_query(conn: &Connection, sql: &str, args: &[Value]) -> Result<usize> {
    debug!(sql, args = args.len(), "execute");
    let mut stmt = conn.prepare(sql)?;
    Ok(stmt.execute(params_from_iter(args.iter().map(convert::to_sql)))?)
}

/// Returns the first column of the first row, or NULL when there is no row.
pub fn execute_scalar(conn: &Connection, sql: &str, args: &[Value]) -> Result<Value> {
    debug!(sql, args = args.len(), "scalar");
    let mut stmt = conn.prepare(sql)?;
    let value = stmt
        .query_row(params_from_iter(args.iter().map(convert::to_sql)), |row| {
            row.get_ref(0).map(convert::from_sql)
        })
        .optional()?;
    Ok(value.unwrap_or(Value::Null))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            r#"
CREATE TABLE "T" ("Id" INTEGER, "Name" TEXT, "Data" BLOB);
INSERT INTO "T" VALUES (1, 'one', X'01'), (2, 'two', NULL), (3, 'three', NULL);
"#,
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_load_rows_with_limit_and_args() {
        let conn = sample();
        let rows = load_rows(&conn, r#"SELECT * FROM "T" ORDER BY "Id""#, &[], Some(2)).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("name"), Some(&Value::from("one")));
        assert_eq!(rows[0].get("DATA"), Some(&Value::Blob(vec![1])));
        assert_eq!(rows[1].get("Data"), Some(&Value::Null));
        assert!(rows[0].get("Missing").is_none());

        let rows = load_rows(
            &conn,
            r#"SELECT "Name" FROM "T" WHERE "Id" > ?"#,
            &[Value::Integer(1)],
            None,
        )
        .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].columns(), ["Name".to_string()]);
    }

    #[test]
    fn test_row_serializes_as_map() {
        let row = Row::new(
            vec!["Id".into(), "Name".into(), "Gone".into()],
            vec![Value::Integer(1), Value::from("one"), Value::Null],
        );
        assert_eq!(
            serde_json::to_string(&row).unwrap(),
            r#"{"Id":1,"Name":"one","Gone":null}"#
        );
    }

    #[test]
    fn test_row_with_missing_values() {
        let row = Row::new(vec!["Id".into(), "Name".into()], vec![Value::Integer(1)]);
        assert_eq!(row.get("id"), Some(&Value::Integer(1)));
        assert_eq!(row.get("Name"), None);
        assert_eq!(row.iter().count(), 1);
    }

    #[test]
    fn test_scalar_and_non_query() {
        let conn = sample();
        assert_eq!(
            execute_scalar(&conn, r#"SELECT count(*) FROM "T""#, &[]).unwrap(),
            Value::Integer(3)
        );
        assert_eq!(
            execute_scalar(&conn, r#"SELECT "Name" FROM "T" WHERE "Id" = 99"#, &[]).unwrap(),
            Value::Null
        );
        assert_eq!(
            execute_non_query(&conn, r#"DELETE FROM "T" WHERE "Id" >= ?"#, &[Value::Integer(2)]).unwrap(),
            2
        );
    }
}
