use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use objectsql_core::{DatabaseOptions, LiveTable, Value};
use objectsql_sqlite::{BindArg, Database, Row};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

/// CLI-specific output format enum with clap argument parsing support.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliOutputFormat {
    Json,
    Yaml,
    Table,
}

#[derive(Debug, Parser)]
#[command(name = "objectsql")]
#[command(about = "Inspect and query databases written by objectsql", version)]
struct Cli {
    /// Database file to open.
    db: PathBuf,
    /// YAML file with database options.
    #[arg(long, global = true)]
    options: Option<PathBuf>,
    /// Output format.
    #[arg(long, global = true, default_value = "table")]
    format: CliOutputFormat,
    /// Log generated statements (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List tables with their column and index counts.
    Tables,
    /// Show the live columns and indices of one table.
    Columns(TableArgs),
    /// Print the rows of one table.
    Rows(RowsArgs),
    /// Run a query and print the resulting rows.
    Query(SqlArgs),
    /// Run a statement and print the number of changed rows.
    Exec(SqlArgs),
    /// Run a query and print the first column of the first row.
    Scalar(SqlArgs),
    /// Drop a table if it exists.
    Drop(TableArgs),
    /// Rebuild the database file to reclaim free pages.
    Vacuum,
}

#[derive(Debug, Args)]
struct TableArgs {
    /// Table name (case-insensitive).
    table: String,
}

#[derive(Debug, Args)]
struct RowsArgs {
    /// Table name (case-insensitive).
    table: String,
    /// Maximum number of rows to print.
    #[arg(long)]
    max: Option<usize>,
}

#[derive(Debug, Args)]
struct SqlArgs {
    /// SQL text with `?` placeholders.
    sql: String,
    /// Positional arguments. Integers and reals are bound as numbers,
    /// `null` as NULL, anything else as text.
    #[arg(allow_hyphen_values = true)]
    args: Vec<String>,
}

#[derive(Debug, Serialize)]
struct TableSummary<'a> {
    name: &'a str,
    module: Option<&'a str>,
    columns: usize,
    indices: usize,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = open_database(&cli).and_then(|db| match &cli.command {
        Command::Tables => run_tables(&db, cli.format),
        Command::Columns(args) => run_columns(&db, args, cli.format),
        Command::Rows(args) => run_rows(&db, args, cli.format),
        Command::Query(args) => run_query(&db, args, cli.format),
        Command::Exec(args) => run_exec(&db, args),
        Command::Scalar(args) => run_scalar(&db, args, cli.format),
        Command::Drop(args) => run_drop(&db, args),
        Command::Vacuum => run_vacuum(&db),
    });

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn open_database(cli: &Cli) -> Result<Database, String> {
    let options = match &cli.options {
        Some(path) => DatabaseOptions::load(path)
            .map_err(|e| format!("Failed to load options '{}': {e}", path.display()))?,
        None => DatabaseOptions::default(),
    };
    Database::open_with(&cli.db, options)
        .map_err(|e| format!("Failed to open database '{}': {e}", cli.db.display()))
}

fn run_tables(db: &Database, format: CliOutputFormat) -> Result<(), String> {
    let tables = db
        .tables()
        .map_err(|e| format!("Failed to list tables: {e}"))?;
    let summaries: Vec<TableSummary<'_>> = tables
        .iter()
        .map(|t| TableSummary {
            name: &t.name,
            module: t.module.as_deref(),
            columns: t.columns.len(),
            indices: t.indices.len(),
        })
        .collect();

    match format {
        CliOutputFormat::Table => {
            for summary in &summaries {
                let kind = summary
                    .module
                    .map(|m| format!(" [{m}]"))
                    .unwrap_or_default();
                println!(
                    "{}{kind}: {} column(s), {} index(es)",
                    summary.name, summary.columns, summary.indices
                );
            }
            Ok(())
        }
        other => print_serialized(&summaries, other),
    }
}

fn run_columns(db: &Database, args: &TableArgs, format: CliOutputFormat) -> Result<(), String> {
    let table = find_table(db, &args.table)?;
    match format {
        CliOutputFormat::Table => {
            println!("{}", format_live_table(&table));
            Ok(())
        }
        other => print_serialized(&table, other),
    }
}

fn run_rows(db: &Database, args: &RowsArgs, format: CliOutputFormat) -> Result<(), String> {
    let rows = db
        .table_rows(&args.table, args.max)
        .map_err(|e| format!("Failed to read '{}': {e}", args.table))?;
    print_rows(&rows, format)
}

fn run_query(db: &Database, args: &SqlArgs, format: CliOutputFormat) -> Result<(), String> {
    let values = parse_args(&args.args);
    let rows = db
        .load_rows(&args.sql, &bind_refs(&values))
        .map_err(|e| format!("Query failed: {e}"))?;
    print_rows(&rows, format)
}

fn run_exec(db: &Database, args: &SqlArgs) -> Result<(), String> {
    let values = parse_args(&args.args);
    let changed = db
        .execute_non_query(&args.sql, &bind_refs(&values))
        .map_err(|e| format!("Statement failed: {e}"))?;
    println!("{changed} row(s) changed.");
    Ok(())
}

fn run_scalar(db: &Database, args: &SqlArgs, format: CliOutputFormat) -> Result<(), String> {
    let values = parse_args(&args.args);
    let value = db
        .execute_scalar(&args.sql, &bind_refs(&values))
        .map_err(|e| format!("Query failed: {e}"))?;
    match format {
        CliOutputFormat::Table => {
            println!("{value}");
            Ok(())
        }
        other => print_serialized(&value, other),
    }
}

fn run_drop(db: &Database, args: &TableArgs) -> Result<(), String> {
    let dropped = db
        .delete_table(&args.table)
        .map_err(|e| format!("Failed to drop '{}': {e}", args.table))?;
    if dropped {
        println!("Dropped table '{}'.", args.table);
    } else {
        println!("Table '{}' does not exist.", args.table);
    }
    Ok(())
}

fn run_vacuum(db: &Database) -> Result<(), String> {
    db.vacuum().map_err(|e| format!("Vacuum failed: {e}"))?;
    println!("Vacuum complete.");
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn find_table(db: &Database, name: &str) -> Result<LiveTable, String> {
    db.get_table(name)
        .map_err(|e| format!("Failed to read table '{name}': {e}"))?
        .ok_or_else(|| format!("Table '{name}' not found"))
}

/// Maps command-line arguments to bindable values.
fn parse_args(args: &[String]) -> Vec<Value> {
    args.iter()
        .map(|arg| {
            if arg.eq_ignore_ascii_case("null") {
                Value::Null
            } else if let Ok(v) = arg.parse::<i64>() {
                Value::Integer(v)
            } else if let Some(v) = arg.parse::<f64>().ok().filter(|v| v.is_finite()) {
                Value::Real(v)
            } else {
                Value::Text(arg.clone())
            }
        })
        .collect()
}

fn bind_refs(values: &[Value]) -> Vec<&dyn BindArg> {
    values.iter().map(|v| v as &dyn BindArg).collect()
}

fn print_rows(rows: &[Row], format: CliOutputFormat) -> Result<(), String> {
    match format {
        CliOutputFormat::Table => {
            println!("{}", format_rows(rows));
            Ok(())
        }
        other => print_serialized(rows, other),
    }
}

fn print_serialized<T: Serialize + ?Sized>(value: &T, format: CliOutputFormat) -> Result<(), String> {
    let output = match format {
        CliOutputFormat::Json => serde_json::to_string_pretty(value)
            .map_err(|e| format!("JSON serialization failed: {e}"))?,
        CliOutputFormat::Yaml => {
            serde_yaml::to_string(value).map_err(|e| format!("YAML serialization failed: {e}"))?
        }
        CliOutputFormat::Table => return Err("table output is not structured".to_string()),
    };
    println!("{}", output.trim_end());
    Ok(())
}

/// Tab-separated rows under a header line.
fn format_rows(rows: &[Row]) -> String {
    let Some(first) = rows.first() else {
        return "(no rows)".to_string();
    };
    let mut lines = vec![first.columns().join("\t")];
    for row in rows {
        let cells: Vec<String> = row.values().iter().map(Value::to_string).collect();
        lines.push(cells.join("\t"));
    }
    lines.push(format!("({} row(s))", rows.len()));
    lines.join("\n")
}

fn format_live_table(table: &LiveTable) -> String {
    let mut lines = vec![match &table.module {
        Some(module) => format!("{} (virtual, {module})", table.name),
        None => table.name.clone(),
    }];
    for column in &table.columns {
        let mut line = format!("  {} {}", column.name, column.declared_type);
        if column.primary_key > 0 {
            line.push_str(" PRIMARY KEY");
        }
        if column.not_null {
            line.push_str(" NOT NULL");
        }
        if let Some(default) = &column.default_value {
            line.push_str(&format!(" DEFAULT {default}"));
        }
        lines.push(line);
    }
    for index in &table.indices {
        let unique = if index.is_unique { "UNIQUE " } else { "" };
        lines.push(format!(
            "  {unique}INDEX {} ({})",
            index.name,
            index.columns.join(", ")
        ));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_args_picks_value_kinds() {
        let args = ["42", "1.5", "NULL", "abc", "-7"].map(String::from);
        assert_eq!(
            parse_args(&args),
            vec![
                Value::Integer(42),
                Value::Real(1.5),
                Value::Null,
                Value::from("abc"),
                Value::Integer(-7),
            ]
        );
    }

    #[test]
    fn test_format_rows() {
        let rows = vec![
            Row::new(vec!["Id".into(), "Name".into()], vec![Value::Integer(1), Value::from("a")]),
            Row::new(vec!["Id".into(), "Name".into()], vec![Value::Integer(2), Value::Null]),
        ];
        assert_eq!(format_rows(&rows), "Id\tName\n1\ta\n2\tNULL\n(2 row(s))");
        assert_eq!(format_rows(&[]), "(no rows)");
    }
}
