//! SQLite engine layer for `objectsql-core` object tables.
//!
//! The core crate decides what a table should look like and which
//! statements a save needs. This crate runs them on a [`rusqlite`]
//! connection.
//!
//! # Architecture
//!
//! - **`database`**: the [`Database`] facade (typed saves and loads, plus
//!   raw introspection passthroughs)
//! - **`schema`**: reads live tables, columns and indices from the engine
//! - **`migration`**: create, add-column and rebuild synchronization
//! - **`save`**: the update-then-insert algorithm with its race retry
//! - **`registry`**: conversion of caller-supplied statement arguments
//! - **`query`**: raw statements returning name/value [`Row`]s
//!
//! # Quick start
//!
//! ```no_run
//! use objectsql_core::{Mapped, TableDef};
//! use objectsql_sqlite::Database;
//!
//! #[derive(Debug, Default)]
//! struct Setting {
//!     key: String,
//!     value: Option<String>,
//! }
//!
//! impl Mapped for Setting {
//!     fn describe(table: &mut TableDef<Self>) {
//!         table.column("Key", |s| &s.key, |s| &mut s.key).primary_key();
//!         table.column("Value", |s| &s.value, |s| &mut s.value);
//!     }
//! }
//!
//! let db = Database::open("settings.db").unwrap();
//! db.save(&mut Setting { key: "theme".into(), value: Some("dark".into()) }).unwrap();
//!
//! let theme: Option<Setting> = db.load_by_primary_key(&[&"theme"]).unwrap();
//! println!("{:?}", theme.and_then(|s| s.value));
//! ```

mod convert;
mod database;
mod error;
mod executor;
mod migration;
mod query;
mod registry;
mod save;
pub mod schema;

pub use database::Database;
pub use error::{Result, SqliteError, is_constraint_violation, is_table_already_exists};
pub use executor::Executor;
pub use migration::{SyncReport, synchronize};
pub use query::Row;
pub use registry::{BindArg, BindRegistry};
pub use save::save;
