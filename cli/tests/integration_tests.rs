use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use objectsql_core::{Mapped, TableDef};
use objectsql_sqlite::Database;

#[derive(Debug, Default)]
struct Book {
    id: i64,
    title: String,
    pages: i32,
}

impl Mapped for Book {
    fn describe(table: &mut TableDef<Self>) {
        table.column("Id", |b| &b.id, |b| &mut b.id).primary_key().auto_increment();
        table
            .column("Title", |b| &b.title, |b| &mut b.title)
            .nullable(false)
            .index("IX_Book_Title");
        table.column("Pages", |b| &b.pages, |b| &mut b.pages);
    }
}

/// Writes a database with three books and returns its path.
fn seeded_database(dir: &Path) -> PathBuf {
    let path = dir.join("books.db");
    let db = Database::open(&path).expect("failed to open database");
    for (title, pages) in [("Dune", 412), ("Emma", 474), ("Ubik", 202)] {
        let mut book = Book {
            id: 0,
            title: title.to_string(),
            pages,
        };
        db.save(&mut book).expect("failed to save book");
    }
    path
}

fn run(db: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_objectsql"))
        .arg(db)
        .args(args)
        .output()
        .expect("failed to run objectsql")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_tables_lists_mapped_table() {
    let dir = tempfile::tempdir().unwrap();
    let db = seeded_database(dir.path());

    let output = run(&db, &["tables"]);
    assert!(output.status.success(), "{output:?}");
    assert!(stdout(&output).contains("Book: 3 column(s), 1 index(es)"));

    let output = run(&db, &["tables", "--format", "json"]);
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let names: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|t| t["name"].as_str())
        .collect();
    assert_eq!(names, vec!["Book"]);
}

#[test]
fn test_columns_shows_live_schema() {
    let dir = tempfile::tempdir().unwrap();
    let db = seeded_database(dir.path());

    let output = run(&db, &["columns", "book"]);
    assert!(output.status.success(), "{output:?}");
    let text = stdout(&output);
    assert!(text.contains("Id INTEGER PRIMARY KEY NOT NULL"), "{text}");
    assert!(text.contains("Title TEXT NOT NULL"), "{text}");
    assert!(text.contains("INDEX IX_Book_Title (Title)"), "{text}");

    let output = run(&db, &["columns", "Book", "--format", "yaml"]);
    assert!(output.status.success());
    let yaml: serde_yaml::Value = serde_yaml::from_slice(&output.stdout).unwrap();
    assert_eq!(yaml["name"].as_str(), Some("Book"));
    assert_eq!(yaml["columns"].as_sequence().map(Vec::len), Some(3));
}

#[test]
fn test_rows_respects_max() {
    let dir = tempfile::tempdir().unwrap();
    let db = seeded_database(dir.path());

    let output = run(&db, &["rows", "Book", "--max", "2", "--format", "json"]);
    assert!(output.status.success(), "{output:?}");
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let rows = json.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["Title"], "Dune");
    assert_eq!(rows[1]["Pages"], 474);
}

#[test]
fn test_query_exec_and_scalar_bind_arguments() {
    let dir = tempfile::tempdir().unwrap();
    let db = seeded_database(dir.path());

    let output = run(
        &db,
        &["query", r#"SELECT "Title" FROM "Book" WHERE "Pages" > ? ORDER BY "Id""#, "300"],
    );
    assert!(output.status.success(), "{output:?}");
    assert_eq!(stdout(&output), "Title\nDune\nEmma\n(2 row(s))\n");

    let output = run(&db, &["exec", r#"DELETE FROM "Book" WHERE "Title" = ?"#, "Emma"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output), "1 row(s) changed.\n");

    let output = run(&db, &["scalar", r#"SELECT count(*) FROM "Book""#]);
    assert!(output.status.success());
    assert_eq!(stdout(&output).trim(), "2");
}

#[test]
fn test_drop_and_vacuum() {
    let dir = tempfile::tempdir().unwrap();
    let db = seeded_database(dir.path());

    let output = run(&db, &["drop", "Book"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("Dropped table 'Book'."));

    let output = run(&db, &["drop", "Book"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("does not exist"));

    let output = run(&db, &["vacuum"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("Vacuum complete."));
}

#[test]
fn test_missing_table_exits_with_error() {
    let dir = tempfile::tempdir().unwrap();
    let db = seeded_database(dir.path());

    let output = run(&db, &["rows", "Nope"]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error:"), "{stderr}");
    assert!(stderr.contains("OSQL2003"), "{stderr}");
}

#[test]
fn test_options_file_is_loaded() {
    let dir = tempfile::tempdir().unwrap();
    let db = seeded_database(dir.path());
    let options = dir.path().join("options.yaml");
    fs::write(&options, "busy_timeout_ms: 1000\nforeign_keys: true\n").unwrap();

    let output = run(
        &db,
        &["--options", options.to_str().unwrap(), "scalar", "PRAGMA foreign_keys"],
    );
    assert!(output.status.success(), "{output:?}");
    assert_eq!(stdout(&output).trim(), "1");

    fs::write(&options, "threading: [not, a, mode]\n").unwrap();
    let output = run(&db, &["--options", options.to_str().unwrap(), "tables"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to load options"));
}
