//! Object-table model for mapping Rust types onto SQLite tables.
//!
//! This crate holds everything that does not need a live connection:
//!
//! - [`ColumnType`], [`HostValue`] and [`Value`]: typed and stored values,
//!   converted by the [`coerce`] module under [`TypeOptions`].
//! - [`Mapped`], [`TableDef`] and [`TableBuilder`]: declaring a type's
//!   properties and deriving its [`ObjectTable`].
//! - [`ObjectTable`], [`ObjectColumn`] and [`ObjectIndex`]: the immutable
//!   model, which renders DDL/DML and computes a [`SavePlan`] per save.
//! - [`SchemaDiff`] and [`SyncAction`]: comparing the model with a
//!   [`LiveTable`] and choosing between create, add-column and rebuild.
//!
//! The `objectsql-sqlite` crate executes what this crate decides.
//!
//! # Example
//!
//! ```
//! use objectsql_core::*;
//!
//! #[derive(Debug, Default)]
//! struct Event {
//!     id: i64,
//!     title: String,
//!     at: Option<chrono::DateTime<chrono::Utc>>,
//! }
//!
//! impl Mapped for Event {
//!     fn describe(table: &mut TableDef<Self>) {
//!         table.name("Events");
//!         table.column("Id", |e| &e.id, |e| &mut e.id).primary_key().auto_increment();
//!         table.column("Title", |e| &e.title, |e| &mut e.title).nullable(false);
//!         table.column("At", |e| &e.at, |e| &mut e.at);
//!     }
//! }
//!
//! let table = TableBuilder::new(&TypeOptions::default()).build::<Event>().unwrap();
//! assert_eq!(
//!     table.create_sql(),
//!     r#"CREATE TABLE "Events" ("Id" INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL, "Title" TEXT NOT NULL, "At" TEXT)"#
//! );
//! assert_eq!(table.sync_action(None, &SaveOptions::default()), SyncAction::Create);
//! ```

mod builder;
mod column;
mod error;
mod index;
mod options;
mod table;
mod types;
mod value;

pub mod coerce;
pub mod sql;
pub mod sync;

pub use builder::{Mapped, PropertyDef, TableBuilder, TableDef};
pub use column::{DefaultValue, Getter, KeyGetter, ObjectColumn, Setter};
pub use error::{CoercionError, ModelError, Result};
pub use index::{IndexColumn, ObjectIndex};
pub use options::{DatabaseOptions, DateTimeFormat, GuidFormat, SaveOptions, ThreadingMode, TypeOptions};
pub use sync::{SchemaDiff, SyncAction};
pub use table::{ObjectTable, RowSource, SavePlan};
pub use types::{
    AutomaticValue, ConflictResolution, HostKind, LiveColumn, LiveIndex, LiveTable, SortDirection,
    StorageType,
};
pub use value::{ColumnType, HostValue, Value};
