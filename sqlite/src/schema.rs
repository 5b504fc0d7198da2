//! Live schema introspection.
//!
//! Reads table, column and index metadata from the catalog and the
//! table-valued pragma functions. Table names are matched without regard
//! to case, as the engine does.

use std::sync::LazyLock;

use objectsql_core::{LiveColumn, LiveIndex, LiveTable};
use regex::Regex;
use rusqlite::{Connection, OptionalExtension};

use crate::error::Result;

static VIRTUAL_MODULE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)^\s*CREATE\s+VIRTUAL\s+TABLE\s+.+?\s+USING\s+([A-Za-z_][A-Za-z0-9_]*)"#)
        .expect("static regex must compile")
});

/// Returns the module of a `CREATE VIRTUAL TABLE` statement.
pub(crate) fn virtual_module(sql: &str) -> Option<String> {
    VIRTUAL_MODULE
        .captures(sql)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Whether a table with this name exists.
pub fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT count(*) FROM sqlite_master WHERE type = 'table' AND name = ?1 COLLATE NOCASE",
        [name],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Names of all user tables, sorted.
pub fn table_names(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(names)
}

/// Loads the metadata of one table, or `None` when it does not exist.
pub fn load_table(conn: &Connection, name: &str) -> Result<Option<LiveTable>> {
    let found: Option<(String, Option<String>)> = conn
        .query_row(
            "SELECT name, sql FROM sqlite_master WHERE type = 'table' AND name = ?1 COLLATE NOCASE",
            [name],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;
    let Some((name, sql)) = found else {
        return Ok(None);
    };

    let columns = load_columns(conn, &name)?;
    let indices = load_indices(conn, &name)?;
    let module = sql.as_deref().and_then(virtual_module);
    Ok(Some(LiveTable {
        name,
        sql,
        module,
        columns,
        indices,
    }))
}

/// Loads the metadata of every user table.
pub fn load_tables(conn: &Connection) -> Result<Vec<LiveTable>> {
    let mut tables = Vec::new();
    for name in table_names(conn)? {
        if let Some(table) = load_table(conn, &name)? {
            tables.push(table);
        }
    }
    Ok(tables)
}

fn load_columns(conn: &Connection, table: &str) -> Result<Vec<LiveColumn>> {
    let mut stmt = conn.prepare(
        r#"SELECT cid, name, type, "notnull", dflt_value, pk FROM pragma_table_info(?1) ORDER BY cid"#,
    )?;
    let columns = stmt
        .query_map([table], |row| {
            Ok(LiveColumn {
                cid: row.get(0)?,
                name: row.get(1)?,
                declared_type: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                not_null: row.get::<_, i64>(3)? != 0,
                default_value: row.get(4)?,
                primary_key: row.get(5)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(columns)
}

fn load_indices(conn: &Connection, table: &str) -> Result<Vec<LiveIndex>> {
    let mut stmt = conn.prepare(r#"SELECT name, "unique" FROM pragma_index_list(?1) ORDER BY seq"#)?;
    let entries = stmt
        .query_map([table], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? != 0)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut indices = Vec::with_capacity(entries.len());
    for (name, is_unique) in entries {
        let sql: Option<String> = conn
            .query_row(
                "SELECT sql FROM sqlite_master WHERE type = 'index' AND name = ?1",
                [&name],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()?
            .flatten();
        let mut stmt = conn.prepare("SELECT name FROM pragma_index_info(?1) ORDER BY seqno")?;
        let columns = stmt
            .query_map([&name], |row| row.get::<_, Option<String>>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?
            .into_iter()
            .flatten()
            .collect();
        indices.push(LiveIndex {
            name,
            sql,
            columns,
            is_unique,
        });
    }
    Ok(indices)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_virtual_module_detection() {
        assert_eq!(
            virtual_module("CREATE VIRTUAL TABLE \"Docs\" USING fts5(\"Body\")").as_deref(),
            Some("fts5")
        );
        assert_eq!(virtual_module("create virtual table x using rtree(id, a, b)").as_deref(), Some("rtree"));
        assert_eq!(virtual_module("CREATE TABLE t (a)"), None);
    }

    #[test]
    fn test_load_table_reads_columns_and_indices() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            r#"
CREATE TABLE "Person" ("Id" INTEGER PRIMARY KEY NOT NULL, "Name" TEXT DEFAULT 'x', "Age" INTEGER);
CREATE INDEX "IX_Person_Name" ON "Person" ("Name" DESC, "Age");
"#,
        )
        .unwrap();

        assert!(table_exists(&conn, "person").unwrap());
        assert!(!table_exists(&conn, "Missing").unwrap());

        let table = load_table(&conn, "PERSON").unwrap().unwrap();
        assert_eq!(table.name, "Person");
        assert!(table.module.is_none());
        assert_eq!(table.columns.len(), 3);
        assert_eq!(table.columns[0].primary_key, 1);
        assert!(table.columns[0].not_null);
        assert_eq!(table.columns[1].default_value.as_deref(), Some("'x'"));
        assert_eq!(table.indices.len(), 1);
        assert_eq!(table.indices[0].columns, vec!["Name", "Age"]);
        assert!(table.indices[0].sql.is_some());

        assert_eq!(table_names(&conn).unwrap(), vec!["Person"]);
        assert!(load_table(&conn, "Missing").unwrap().is_none());
    }
}
