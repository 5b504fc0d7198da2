//! Schema drift detection and the synchronization decision.
//!
//! Comparing an [`ObjectTable`] with the live table yields a [`SchemaDiff`];
//! the diff and the [`SaveOptions`] select one [`SyncAction`]. Executing the
//! action is the engine layer's job.

use serde::Serialize;

use crate::index::ObjectIndex;
use crate::options::SaveOptions;
use crate::table::ObjectTable;
use crate::types::LiveTable;

/// Columns that differ between the mapped model and the live table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchemaDiff {
    /// Mapped columns missing from the live table.
    pub added: Vec<String>,
    /// Columns present on both sides with different definitions.
    pub changed: Vec<String>,
    /// Live columns the model no longer maps.
    pub removed: Vec<String>,
}

impl SchemaDiff {
    /// Whether both sides match.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.changed.is_empty() && self.removed.is_empty()
    }
}

/// What synchronizing a table against the live schema must do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "columns", rename_all = "snake_case")]
pub enum SyncAction {
    /// The table does not exist yet.
    Create,
    /// Nothing to change.
    NoOp,
    /// Add the listed columns in place.
    AlterAdd(Vec<String>),
    /// Recreate the table and copy the rows over.
    RebuildMigrate,
}

impl<T> ObjectTable<T> {
    /// Compares the persisted columns with `live`.
    pub fn diff(&self, live: &LiveTable) -> SchemaDiff {
        let mut diff = SchemaDiff::default();
        for column in self.persisted_columns() {
            match live.column(&column.name) {
                None => diff.added.push(column.name.clone()),
                Some(existing) if !column.is_synchronized_with(existing, &self.type_options) => {
                    diff.changed.push(column.name.clone());
                }
                Some(_) => {}
            }
        }
        diff.removed = live
            .columns
            .iter()
            .filter(|c| !self.persisted_columns().any(|p| p.name.eq_ignore_ascii_case(&c.name)))
            .map(|c| c.name.clone())
            .collect();
        diff
    }

    /// Decides how to bring `live` in line with this table.
    ///
    /// Virtual tables, on either side, are never altered.
    pub fn sync_action(&self, live: Option<&LiveTable>, options: &SaveOptions) -> SyncAction {
        let Some(live) = live else {
            return SyncAction::Create;
        };
        if live.is_virtual() || self.is_virtual() {
            return SyncAction::NoOp;
        }

        let diff = self.diff(live);
        let needs_rebuild = !diff.changed.is_empty()
            || (options.delete_unused_columns && !diff.removed.is_empty())
            || diff
                .added
                .iter()
                .filter_map(|name| self.column(name))
                .any(|c| !c.is_addable());
        if needs_rebuild {
            SyncAction::RebuildMigrate
        } else if diff.added.is_empty() {
            SyncAction::NoOp
        } else {
            SyncAction::AlterAdd(diff.added)
        }
    }

    /// Declared indices the live table lacks.
    pub fn missing_indices<'a>(&'a self, live: Option<&LiveTable>) -> Vec<&'a ObjectIndex> {
        self.indices
            .iter()
            .filter(|index| live.is_none_or(|l| l.index(&index.name).is_none()))
            .collect()
    }

    /// Names of the columns the rebuild copies: persisted columns that also
    /// exist in `live`, in model order.
    pub fn copyable_columns<'a>(&'a self, live: &LiveTable) -> Vec<&'a str> {
        self.persisted_columns()
            .filter(|c| live.column(&c.name).is_some())
            .map(|c| c.name.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{Mapped, TableBuilder, TableDef};
    use crate::options::TypeOptions;
    use crate::types::{LiveColumn, LiveIndex};

    #[derive(Debug, Default)]
    struct Note {
        id: i64,
        title: String,
        pinned: Option<bool>,
    }

    impl Mapped for Note {
        fn describe(table: &mut TableDef<Self>) {
            table.column("Id", |n| &n.id, |n| &mut n.id).primary_key();
            table.column("Title", |n| &n.title, |n| &mut n.title).index("IX_Title");
            table.column("Pinned", |n| &n.pinned, |n| &mut n.pinned);
        }
    }

    fn live_column(cid: i64, name: &str, declared: &str, not_null: bool, pk: i64) -> LiveColumn {
        LiveColumn {
            cid,
            name: name.into(),
            declared_type: declared.into(),
            not_null,
            default_value: None,
            primary_key: pk,
        }
    }

    fn live(columns: Vec<LiveColumn>) -> LiveTable {
        LiveTable {
            name: "Note".into(),
            sql: None,
            module: None,
            columns,
            indices: Vec::new(),
        }
    }

    fn notes() -> ObjectTable<Note> {
        TableBuilder::new(&TypeOptions::default()).build::<Note>().unwrap()
    }

    #[test]
    fn test_absent_table_is_created() {
        assert_eq!(notes().sync_action(None, &SaveOptions::default()), SyncAction::Create);
    }

    #[test]
    fn test_matching_table_is_noop() {
        let live = live(vec![
            live_column(0, "id", "INTEGER", true, 1),
            live_column(1, "TITLE", "TEXT", false, 0),
            live_column(2, "Pinned", "INTEGER", false, 0),
        ]);
        let table = notes();
        assert!(table.diff(&live).is_empty());
        assert_eq!(table.sync_action(Some(&live), &SaveOptions::default()), SyncAction::NoOp);
    }

    #[test]
    fn test_new_nullable_column_is_added() {
        let live = live(vec![
            live_column(0, "Id", "INTEGER", true, 1),
            live_column(1, "Title", "TEXT", false, 0),
        ]);
        assert_eq!(
            notes().sync_action(Some(&live), &SaveOptions::default()),
            SyncAction::AlterAdd(vec!["Pinned".into()])
        );
    }

    #[test]
    fn test_changed_or_removed_columns_rebuild() {
        let changed = live(vec![
            live_column(0, "Id", "INTEGER", true, 1),
            live_column(1, "Title", "BLOB", false, 0),
            live_column(2, "Pinned", "INTEGER", false, 0),
        ]);
        assert_eq!(
            notes().sync_action(Some(&changed), &SaveOptions::default()),
            SyncAction::RebuildMigrate
        );

        let extra = live(vec![
            live_column(0, "Id", "INTEGER", true, 1),
            live_column(1, "Title", "TEXT", false, 0),
            live_column(2, "Pinned", "INTEGER", false, 0),
            live_column(3, "Legacy", "TEXT", false, 0),
        ]);
        assert_eq!(
            notes().sync_action(Some(&extra), &SaveOptions::default()),
            SyncAction::NoOp
        );
        let options = SaveOptions {
            delete_unused_columns: true,
            ..SaveOptions::default()
        };
        assert_eq!(notes().sync_action(Some(&extra), &options), SyncAction::RebuildMigrate);
        assert_eq!(notes().copyable_columns(&extra), vec!["Id", "Title", "Pinned"]);
    }

    #[test]
    fn test_virtual_live_table_is_never_altered() {
        let mut fts = live(vec![live_column(0, "Body", "", false, 0)]);
        fts.module = Some("fts5".into());
        assert_eq!(notes().sync_action(Some(&fts), &SaveOptions::default()), SyncAction::NoOp);
    }

    #[test]
    fn test_missing_indices() {
        let table = notes();
        let mut existing = live(Vec::new());
        assert_eq!(table.missing_indices(Some(&existing)).len(), 1);
        existing.indices.push(LiveIndex {
            name: "ix_title".into(),
            sql: None,
            columns: vec!["Title".into()],
            is_unique: false,
        });
        assert!(table.missing_indices(Some(&existing)).is_empty());
    }
}
