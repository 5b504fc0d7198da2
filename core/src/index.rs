//! Declared indices.

use serde::{Deserialize, Serialize};

use crate::sql::quote_identifier;
use crate::types::SortDirection;

/// One column of an [`ObjectIndex`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexColumn {
    /// Column name.
    pub name: String,
    /// Collation applied to the column, if any.
    pub collation: Option<String>,
    /// Sort direction.
    pub direction: SortDirection,
}

impl IndexColumn {
    /// Creates an index column with no collation and unspecified direction.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            collation: None,
            direction: SortDirection::Unspecified,
        }
    }

    fn sql(&self) -> String {
        let mut sql = quote_identifier(&self.name);
        if let Some(collation) = &self.collation {
            sql.push_str(" COLLATE ");
            sql.push_str(&quote_identifier(collation));
        }
        sql.push_str(self.direction.clause());
        sql
    }
}

/// A named, ordered list of indexed columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectIndex {
    /// Index name, unique within the database.
    pub name: String,
    /// Indexed columns in key order.
    pub columns: Vec<IndexColumn>,
    /// Whether the index enforces uniqueness.
    pub is_unique: bool,
}

impl ObjectIndex {
    /// Creates an empty index.
    pub fn new(name: impl Into<String>, is_unique: bool) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            is_unique,
        }
    }

    /// Renders an idempotent `CREATE INDEX IF NOT EXISTS` statement.
    ///
    /// # Examples
    ///
    /// ```
    /// use objectsql_core::{IndexColumn, ObjectIndex};
    ///
    /// let mut index = ObjectIndex::new("IX_Name", true);
    /// index.columns.push(IndexColumn::new("Name"));
    /// assert_eq!(
    ///     index.create_sql("Customer"),
    ///     r#"CREATE UNIQUE INDEX IF NOT EXISTS "IX_Name" ON "Customer" ("Name")"#
    /// );
    /// ```
    pub fn create_sql(&self, table: &str) -> String {
        let columns: Vec<String> = self.columns.iter().map(IndexColumn::sql).collect();
        format!(
            "CREATE {}INDEX IF NOT EXISTS {} ON {} ({})",
            if self.is_unique { "UNIQUE " } else { "" },
            quote_identifier(&self.name),
            quote_identifier(table),
            columns.join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_sql_with_collation_and_direction() {
        let mut index = ObjectIndex::new("IX_Multi", false);
        index.columns.push(IndexColumn {
            name: "Name".into(),
            collation: Some("NOCASE".into()),
            direction: SortDirection::Ascending,
        });
        index.columns.push(IndexColumn {
            name: "Created".into(),
            collation: None,
            direction: SortDirection::Descending,
        });
        assert_eq!(
            index.create_sql("Orders"),
            r#"CREATE INDEX IF NOT EXISTS "IX_Multi" ON "Orders" ("Name" COLLATE "NOCASE" ASC, "Created" DESC)"#
        );
    }
}
