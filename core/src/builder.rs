//! Deriving an [`ObjectTable`] from a mapped type.
//!
//! A type opts into mapping by implementing [`Mapped`]. Its
//! [`describe`](Mapped::describe) function registers every property on a
//! [`TableDef`] together with plain accessor closures; the
//! [`TableBuilder`] then resolves names, storage types, ordering, the row
//! identifier and indices, and rejects inconsistent declarations.
//!
//! # Examples
//!
//! ```
//! use objectsql_core::{Mapped, TableBuilder, TableDef, TypeOptions};
//!
//! #[derive(Debug, Default)]
//! struct Customer {
//!     id: i64,
//!     name: String,
//!     tags: Vec<String>,
//! }
//!
//! impl Mapped for Customer {
//!     fn describe(table: &mut TableDef<Self>) {
//!         table.column("Id", |c| &c.id, |c| &mut c.id).primary_key().auto_increment();
//!         table.column("Name", |c| &c.name, |c| &mut c.name).unique_index("IX_Customer_Name");
//!         table.collection("Tags", |c| &c.tags, |c| &mut c.tags);
//!     }
//! }
//!
//! let table = TableBuilder::new(&TypeOptions::default()).build::<Customer>().unwrap();
//! assert_eq!(table.name(), "Customer");
//! assert_eq!(table.column_names(), vec!["Id", "Name"]);
//! assert!(table.row_id_column().is_some());
//! ```

use std::sync::{Arc, OnceLock};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::column::{Accessor, DefaultValue, Getter, KeyGetter, ObjectColumn, Setter};
use crate::error::{CoercionError, ModelError, Result};
use crate::index::{IndexColumn, ObjectIndex};
use crate::options::TypeOptions;
use crate::sql::validate_identifier;
use crate::table::ObjectTable;
use crate::types::{AutomaticValue, HostKind, SortDirection, StorageType};
use crate::value::{ColumnType, HostValue};

/// A type that can be stored as rows of one table.
pub trait Mapped: Default + Send + Sync + 'static {
    /// Registers the table settings and the mapped properties.
    fn describe(table: &mut TableDef<Self>);

    /// Called before the instance is saved. Returning `false` cancels the
    /// save.
    fn on_saving(&mut self) -> bool {
        true
    }

    /// Called after the instance was saved.
    fn on_saved(&mut self) {}

    /// Called after the instance was materialized from a row.
    fn on_loaded(&mut self) {}
}

/// Table-level and property-level declarations for one mapped type.
pub struct TableDef<T> {
    type_options: TypeOptions,
    name: Option<String>,
    module: Option<String>,
    module_arguments: Vec<String>,
    without_rowid: bool,
    properties: Vec<PropertyDef<T>>,
    indices: Vec<ObjectIndex>,
}

impl<T: 'static> TableDef<T> {
    fn new(type_options: &TypeOptions) -> Self {
        Self {
            type_options: type_options.clone(),
            name: None,
            module: None,
            module_arguments: Vec::new(),
            without_rowid: false,
            properties: Vec::new(),
            indices: Vec::new(),
        }
    }

    /// Type options in effect for this build.
    pub fn type_options(&self) -> &TypeOptions {
        &self.type_options
    }

    /// Overrides the table name (defaults to the bare type name).
    pub fn name(&mut self, name: impl Into<String>) -> &mut Self {
        self.name = Some(name.into());
        self
    }

    /// Declares a virtual table using `module` with extra module arguments.
    pub fn virtual_table<I, S>(&mut self, module: impl Into<String>, arguments: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.module = Some(module.into());
        self.module_arguments = arguments.into_iter().map(Into::into).collect();
        self
    }

    /// Declares the table `WITHOUT ROWID`.
    pub fn without_rowid(&mut self) -> &mut Self {
        self.without_rowid = true;
        self
    }

    /// Declares a multi-column index with full control over its columns.
    pub fn index(&mut self, index: ObjectIndex) -> &mut Self {
        self.indices.push(index);
        self
    }

    fn push(&mut self, property: PropertyDef<T>) -> &mut PropertyDef<T> {
        self.properties.push(property);
        let last = self.properties.len() - 1;
        &mut self.properties[last]
    }

    /// Maps a readable and writable property.
    pub fn column<F: ColumnType>(
        &mut self,
        property: &str,
        get: impl Fn(&T) -> &F + Send + Sync + 'static,
        get_mut: impl Fn(&mut T) -> &mut F + Send + Sync + 'static,
    ) -> &mut PropertyDef<T> {
        let getter: Getter<T> = Arc::new(move |instance: &T| get(instance).to_host());
        let setter: Setter<T> = Arc::new(move |instance: &mut T, value: HostValue| {
            *get_mut(instance) = F::from_host(value)?;
            Ok(())
        });
        self.push(PropertyDef::new(
            property,
            F::KIND,
            F::NULLABLE,
            Accessor::Value(getter),
            Some(setter),
        ))
    }

    /// Maps a property without a setter. Loading never writes it.
    pub fn read_only<F: ColumnType>(
        &mut self,
        property: &str,
        get: impl Fn(&T) -> F + Send + Sync + 'static,
    ) -> &mut PropertyDef<T> {
        let getter: Getter<T> = Arc::new(move |instance: &T| get(instance).to_host());
        self.push(PropertyDef::new(
            property,
            F::KIND,
            F::NULLABLE,
            Accessor::Value(getter),
            None,
        ))
    }

    /// Registers a collection property.
    ///
    /// Collections describe relationships and are skipped unless
    /// [`include`](PropertyDef::include) is called, in which case they are
    /// stored as JSON text.
    pub fn collection<F>(
        &mut self,
        property: &str,
        get: impl Fn(&T) -> &F + Send + Sync + 'static,
        get_mut: impl Fn(&mut T) -> &mut F + Send + Sync + 'static,
    ) -> &mut PropertyDef<T>
    where
        F: Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        let getter: Getter<T> = Arc::new(move |instance: &T| {
            serde_json::to_string(get(instance)).map_or(HostValue::Null, HostValue::Text)
        });
        let setter: Setter<T> = Arc::new(move |instance: &mut T, value: HostValue| match value {
            HostValue::Null => Ok(()),
            HostValue::Text(text) => {
                *get_mut(instance) = serde_json::from_str(&text)
                    .map_err(|err| CoercionError::new(format!("TEXT '{text}'"), format!("json ({err})")))?;
                Ok(())
            }
            other => Err(CoercionError::new(other.describe(), "json")),
        });
        let property = self.push(PropertyDef::new(
            property,
            HostKind::Json,
            true,
            Accessor::Value(getter),
            Some(setter),
        ));
        property.ignored = true;
        property
    }

    /// Maps a property holding another mapped object.
    ///
    /// The column stores the referenced object's primary key; composite
    /// keys are joined with [`TypeOptions::key_separator`].
    pub fn reference<F: Mapped>(
        &mut self,
        property: &str,
        get: impl Fn(&T) -> Option<&F> + Send + Sync + 'static,
    ) -> &mut PropertyDef<T> {
        let target: Arc<OnceLock<Option<ObjectTable<F>>>> = Arc::default();
        let keys: KeyGetter<T> = Arc::new(move |instance: &T, options: &TypeOptions| {
            let referenced = get(instance)?;
            let table = target
                .get_or_init(|| TableBuilder::new(options).build::<F>().ok())
                .as_ref()?;
            let values = table.primary_key_values(referenced);
            (!values.is_empty()).then_some(values)
        });
        self.push(PropertyDef::new(
            property,
            HostKind::Reference,
            true,
            Accessor::Reference(keys),
            None,
        ))
    }
}

#[derive(Debug, Clone)]
struct IndexMembership {
    name: String,
    is_unique: bool,
    direction: SortDirection,
}

/// Metadata of one registered property. Every setter returns `&mut Self`
/// so declarations chain.
pub struct PropertyDef<T> {
    property: String,
    column_name: Option<String>,
    kind: HostKind,
    storage: Option<StorageType>,
    nullable: bool,
    primary_key: bool,
    primary_key_direction: SortDirection,
    unique: bool,
    auto_increment: bool,
    automatic: AutomaticValue,
    default_value: Option<DefaultValue>,
    check: Option<String>,
    collation: Option<String>,
    insert_only: bool,
    update_only: bool,
    computed: bool,
    sort_order: Option<i32>,
    ignored: bool,
    indices: Vec<IndexMembership>,
    accessor: Accessor<T>,
    setter: Option<Setter<T>>,
}

impl<T> PropertyDef<T> {
    fn new(
        property: &str,
        kind: HostKind,
        nullable: bool,
        accessor: Accessor<T>,
        setter: Option<Setter<T>>,
    ) -> Self {
        Self {
            property: property.to_string(),
            column_name: None,
            kind,
            storage: None,
            nullable,
            primary_key: false,
            primary_key_direction: SortDirection::Unspecified,
            unique: false,
            auto_increment: false,
            automatic: AutomaticValue::None,
            default_value: None,
            check: None,
            collation: None,
            insert_only: false,
            update_only: false,
            computed: false,
            sort_order: None,
            ignored: false,
            indices: Vec::new(),
            accessor,
            setter,
        }
    }

    /// Stores the property under a different column name.
    pub fn column_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.column_name = Some(name.into());
        self
    }

    /// Overrides the inferred storage type.
    pub fn storage(&mut self, storage: StorageType) -> &mut Self {
        self.storage = Some(storage);
        self
    }

    /// Makes the column part of the primary key.
    pub fn primary_key(&mut self) -> &mut Self {
        self.primary_key = true;
        self
    }

    /// Sets the primary key direction.
    pub fn primary_key_direction(&mut self, direction: SortDirection) -> &mut Self {
        self.primary_key = true;
        self.primary_key_direction = direction;
        self
    }

    /// Adds a `UNIQUE` constraint.
    pub fn unique(&mut self) -> &mut Self {
        self.unique = true;
        self
    }

    /// Overrides nullability.
    pub fn nullable(&mut self, nullable: bool) -> &mut Self {
        self.nullable = nullable;
        self
    }

    /// Lets the engine assign the value. Only valid on the sole INTEGER
    /// primary key.
    pub fn auto_increment(&mut self) -> &mut Self {
        self.auto_increment = true;
        self
    }

    /// Fills the value automatically before saving.
    pub fn automatic(&mut self, rule: AutomaticValue) -> &mut Self {
        self.automatic = rule;
        self
    }

    /// Declares a literal default value.
    pub fn default_value(&mut self, value: impl Into<HostValue>) -> &mut Self {
        self.default_value = Some(DefaultValue::Literal(value.into()));
        self
    }

    /// Declares a SQL expression as default value.
    pub fn default_expression(&mut self, expression: impl Into<String>) -> &mut Self {
        self.default_value = Some(DefaultValue::Expression(expression.into()));
        self
    }

    /// Adds a `CHECK` constraint.
    pub fn check(&mut self, expression: impl Into<String>) -> &mut Self {
        self.check = Some(expression.into());
        self
    }

    /// Sets the column collation.
    pub fn collation(&mut self, collation: impl Into<String>) -> &mut Self {
        self.collation = Some(collation.into());
        self
    }

    /// Only written by INSERT.
    pub fn insert_only(&mut self) -> &mut Self {
        self.insert_only = true;
        self
    }

    /// Only written by UPDATE.
    pub fn update_only(&mut self) -> &mut Self {
        self.update_only = true;
        self
    }

    /// Excludes the property from persistence. It is still loaded when a
    /// result row carries a column of that name.
    pub fn computed(&mut self) -> &mut Self {
        self.computed = true;
        self
    }

    /// Places the column by ascending order hint; unhinted columns go last.
    pub fn sort_order(&mut self, order: i32) -> &mut Self {
        self.sort_order = Some(order);
        self
    }

    /// Drops the property from the mapping entirely.
    pub fn ignore(&mut self) -> &mut Self {
        self.ignored = true;
        self
    }

    /// Brings back a property skipped by default.
    pub fn include(&mut self) -> &mut Self {
        self.ignored = false;
        self
    }

    /// Adds the column to a non-unique index.
    pub fn index(&mut self, name: impl Into<String>) -> &mut Self {
        self.indexed(name, false, SortDirection::Unspecified)
    }

    /// Adds the column to a unique index.
    pub fn unique_index(&mut self, name: impl Into<String>) -> &mut Self {
        self.indexed(name, true, SortDirection::Unspecified)
    }

    /// Adds the column to an index with an explicit direction.
    pub fn indexed(
        &mut self,
        name: impl Into<String>,
        is_unique: bool,
        direction: SortDirection,
    ) -> &mut Self {
        self.indices.push(IndexMembership {
            name: name.into(),
            is_unique,
            direction,
        });
        self
    }
}

/// Builds [`ObjectTable`]s under a fixed set of type options.
#[derive(Debug, Clone, Default)]
pub struct TableBuilder {
    type_options: TypeOptions,
}

impl TableBuilder {
    /// Creates a builder for the given type options.
    pub fn new(type_options: &TypeOptions) -> Self {
        Self {
            type_options: type_options.clone(),
        }
    }

    /// Builds the table model of `T`.
    ///
    /// # Errors
    ///
    /// Returns a [`ModelError`] when a name is unusable, a storage type
    /// cannot be inferred, two columns or indices collide, auto-increment is
    /// misplaced, or no column would be persisted.
    pub fn build<T: Mapped>(&self) -> Result<ObjectTable<T>> {
        let mut def = TableDef::new(&self.type_options);
        T::describe(&mut def);

        let name = def.name.take().unwrap_or_else(bare_type_name::<T>);
        validate_identifier(&name)?;

        let mut columns = Vec::new();
        let mut memberships = Vec::new();
        for property in def.properties.into_iter().filter(|p| !p.ignored) {
            let (column, indices) = self.column(&name, property)?;
            if columns
                .iter()
                .any(|c: &ObjectColumn<T>| c.name.eq_ignore_ascii_case(&column.name))
            {
                return Err(ModelError::DuplicateColumn {
                    table: name,
                    column: column.name,
                });
            }
            memberships.push(indices);
            columns.push(column);
        }

        let mut order: Vec<usize> = (0..columns.len()).collect();
        order.sort_by_key(|&i| (columns[i].sort_order.is_none(), columns[i].sort_order));
        let mut slots: Vec<Option<(ObjectColumn<T>, Vec<IndexMembership>)>> =
            columns.into_iter().zip(memberships).map(Some).collect();
        let (mut columns, memberships): (Vec<_>, Vec<_>) =
            order.iter().filter_map(|&i| slots[i].take()).unzip();

        if !columns.iter().any(|c| c.is_persisted()) {
            return Err(ModelError::NoColumns(name));
        }

        let pk_count = columns.iter().filter(|c| c.is_persisted() && c.is_primary_key).count();
        if def.without_rowid && pk_count == 0 {
            return Err(ModelError::InvalidTable {
                table: name,
                reason: "WITHOUT ROWID requires a primary key".to_string(),
            });
        }
        for column in &mut columns {
            column.is_row_id = pk_count == 1
                && !def.without_rowid
                && def.module.is_none()
                && column.is_persisted()
                && column.is_primary_key
                && column.storage_type == StorageType::Integer;
            if column.auto_increments && !column.is_row_id {
                return Err(ModelError::InvalidAutoIncrement {
                    table: name,
                    column: column.name.clone(),
                });
            }
        }

        let indices = merge_indices(&name, &columns, &memberships, def.indices)?;

        Ok(ObjectTable {
            name,
            module: def.module,
            module_arguments: def.module_arguments,
            disable_row_id: def.without_rowid,
            columns,
            indices,
            type_options: self.type_options.clone(),
        })
    }

    fn column<T>(
        &self,
        table: &str,
        property: PropertyDef<T>,
    ) -> Result<(ObjectColumn<T>, Vec<IndexMembership>)> {
        let name = property
            .column_name
            .unwrap_or_else(|| property.property.clone());
        validate_identifier(&name)?;
        if let Some(collation) = &property.collation {
            validate_identifier(collation)?;
        }

        let storage_type = property
            .storage
            .or_else(|| property.kind.storage_type(&self.type_options))
            .ok_or_else(|| ModelError::UnknownStorageType {
                table: table.to_string(),
                column: name.clone(),
            })?;

        let column = ObjectColumn {
            name,
            property: property.property,
            storage_type,
            host_kind: property.kind,
            is_primary_key: property.primary_key,
            primary_key_direction: property.primary_key_direction,
            is_unique: property.unique,
            is_nullable: property.nullable && !property.primary_key,
            is_row_id: false,
            auto_increments: property.auto_increment,
            automatic_value: property.automatic,
            default_value: property.default_value,
            check_expression: property.check,
            collation: property.collation,
            insert_only: property.insert_only,
            update_only: property.update_only,
            is_computed: property.computed,
            sort_order: property.sort_order,
            accessor: property.accessor,
            setter: property.setter,
        };
        Ok((column, property.indices))
    }
}

/// Merges per-property index memberships (in column order) with the
/// table-level index declarations.
fn merge_indices<T>(
    table: &str,
    columns: &[ObjectColumn<T>],
    memberships: &[Vec<IndexMembership>],
    declared: Vec<ObjectIndex>,
) -> Result<Vec<ObjectIndex>> {
    let mut indices: Vec<ObjectIndex> = Vec::new();
    for (column, entries) in columns.iter().zip(memberships) {
        for entry in entries {
            validate_identifier(&entry.name)?;
            let position = indices
                .iter()
                .position(|i| i.name.eq_ignore_ascii_case(&entry.name));
            let index = match position {
                Some(position) => &mut indices[position],
                None => {
                    indices.push(ObjectIndex::new(entry.name.clone(), entry.is_unique));
                    let last = indices.len() - 1;
                    &mut indices[last]
                }
            };
            if index.is_unique != entry.is_unique {
                return Err(ModelError::DuplicateIndex {
                    table: table.to_string(),
                    index: entry.name.clone(),
                });
            }
            index.columns.push(IndexColumn {
                name: column.name.clone(),
                collation: None,
                direction: entry.direction,
            });
        }
    }

    for index in declared {
        validate_identifier(&index.name)?;
        if indices.iter().any(|i| i.name.eq_ignore_ascii_case(&index.name)) {
            return Err(ModelError::DuplicateIndex {
                table: table.to_string(),
                index: index.name,
            });
        }
        for column in &index.columns {
            if !columns
                .iter()
                .any(|c| c.is_persisted() && c.name.eq_ignore_ascii_case(&column.name))
            {
                return Err(ModelError::UnknownIndexColumn {
                    index: index.name.clone(),
                    column: column.name.clone(),
                });
            }
        }
        indices.push(index);
    }
    Ok(indices)
}

/// The type's name without module path or generic arguments.
fn bare_type_name<T>() -> String {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::DateTimeFormat;
    use chrono::{DateTime, Utc};
    use uuid::Uuid;

    #[derive(Debug, Default)]
    struct Invoice {
        number: String,
        issued: Option<DateTime<Utc>>,
        total: f64,
        customer: Option<Account>,
        lines: Vec<u32>,
    }

    #[derive(Debug, Default)]
    struct Account {
        region: String,
        code: i32,
    }

    impl Mapped for Account {
        fn describe(table: &mut TableDef<Self>) {
            table.column("Region", |a| &a.region, |a| &mut a.region).primary_key();
            table.column("Code", |a| &a.code, |a| &mut a.code).primary_key();
        }
    }

    impl Mapped for Invoice {
        fn describe(table: &mut TableDef<Self>) {
            table.name("Invoices");
            table.column("Number", |i| &i.number, |i| &mut i.number).primary_key();
            table.column("Issued", |i| &i.issued, |i| &mut i.issued).sort_order(2);
            table.column("Total", |i| &i.total, |i| &mut i.total).sort_order(1);
            table.reference("Customer", |i| i.customer.as_ref());
            table.collection("Lines", |i| &i.lines, |i| &mut i.lines);
        }
    }

    #[test]
    fn test_build_orders_and_infers() {
        let mut options = TypeOptions::default();
        options.date_time_format = DateTimeFormat::UnixTimeSeconds;
        let table = TableBuilder::new(&options).build::<Invoice>().unwrap();
        assert_eq!(table.name(), "Invoices");
        assert_eq!(table.column_names(), vec!["Total", "Issued", "Number", "Customer"]);
        assert_eq!(
            table.storage_types(),
            vec![
                StorageType::Real,
                StorageType::Integer,
                StorageType::Text,
                StorageType::Text
            ]
        );
        let number = table.column("number").unwrap();
        assert!(number.is_primary_key() && !number.is_nullable());
        assert!(!number.is_row_id());
        assert!(table.column("Customer").unwrap().is_read_only());
        assert!(table.column("Lines").is_none());
    }

    #[test]
    fn test_reference_binds_joined_key() {
        let table = TableBuilder::new(&TypeOptions::default()).build::<Invoice>().unwrap();
        let invoice = Invoice {
            customer: Some(Account {
                region: "EU".into(),
                code: 42,
            }),
            ..Invoice::default()
        };
        let column = table.column("Customer").unwrap();
        assert_eq!(
            column.value_for_bind(&invoice, table.type_options()),
            crate::Value::Text("EU|42".into())
        );
        assert_eq!(
            column.value_for_bind(&Invoice::default(), table.type_options()),
            crate::Value::Null
        );
    }

    #[derive(Debug, Default)]
    struct Tagged {
        id: Uuid,
        tags: Vec<String>,
    }

    impl Mapped for Tagged {
        fn describe(table: &mut TableDef<Self>) {
            table
                .column("Id", |t| &t.id, |t| &mut t.id)
                .primary_key()
                .automatic(AutomaticValue::NewGuidIfEmpty);
            table.collection("Tags", |t| &t.tags, |t| &mut t.tags).include();
        }
    }

    #[test]
    fn test_included_collection_is_json() {
        let table = TableBuilder::new(&TypeOptions::default()).build::<Tagged>().unwrap();
        assert_eq!(table.name(), "Tagged");
        let mut tagged = Tagged {
            tags: vec!["a".into(), "b".into()],
            ..Tagged::default()
        };
        table.apply_automatic_values(&mut tagged).unwrap();
        assert!(!tagged.id.is_nil());
        let tags = table.column("Tags").unwrap();
        assert_eq!(
            tags.value_for_bind(&tagged, table.type_options()),
            crate::Value::Text(r#"["a","b"]"#.into())
        );
        tags.set_stored_value(&mut tagged, &crate::Value::from(r#"["c"]"#), table.type_options())
            .unwrap();
        assert_eq!(tagged.tags, vec!["c".to_string()]);
    }

    #[derive(Default)]
    struct Broken {
        a: i32,
        b: i32,
    }

    impl Mapped for Broken {
        fn describe(table: &mut TableDef<Self>) {
            table.column("Value", |t| &t.a, |t| &mut t.a);
            table.column("value", |t| &t.b, |t| &mut t.b);
        }
    }

    #[derive(Default)]
    struct BadIncrement {
        id: String,
    }

    impl Mapped for BadIncrement {
        fn describe(table: &mut TableDef<Self>) {
            table.column("Id", |t| &t.id, |t| &mut t.id).primary_key().auto_increment();
        }
    }

    #[derive(Default)]
    struct OnlyComputed {
        a: i32,
    }

    impl Mapped for OnlyComputed {
        fn describe(table: &mut TableDef<Self>) {
            table.column("A", |t| &t.a, |t| &mut t.a).computed();
        }
    }

    #[derive(Default)]
    struct Opaque {
        raw: i64,
    }

    impl Mapped for Opaque {
        fn describe(table: &mut TableDef<Self>) {
            table.column("Raw", |t| &t.raw, |t| &mut t.raw);
            table.index(ObjectIndex {
                name: "IX_Missing".into(),
                columns: vec![IndexColumn::new("Nope")],
                is_unique: false,
            });
        }
    }

    /// Host type without an inferable storage type.
    #[derive(Debug, Clone, Default, PartialEq)]
    struct Rgb(u8, u8, u8);

    impl ColumnType for Rgb {
        const KIND: HostKind = HostKind::Custom;

        fn to_host(&self) -> HostValue {
            HostValue::Text(format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2))
        }

        fn from_host(value: HostValue) -> std::result::Result<Self, CoercionError> {
            let fail = || CoercionError::new(value.to_string(), "Rgb");
            let HostValue::Text(text) = &value else {
                return Err(fail());
            };
            let hex = text.strip_prefix('#').filter(|h| h.len() == 6).ok_or_else(fail)?;
            let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| fail());
            Ok(Rgb(channel(0)?, channel(2)?, channel(4)?))
        }
    }

    #[derive(Default)]
    struct Untyped {
        color: Rgb,
    }

    impl Mapped for Untyped {
        fn describe(table: &mut TableDef<Self>) {
            table.column("Color", |t| &t.color, |t| &mut t.color);
        }
    }

    #[derive(Default)]
    struct Typed {
        color: Rgb,
    }

    impl Mapped for Typed {
        fn describe(table: &mut TableDef<Self>) {
            table
                .column("Color", |t| &t.color, |t| &mut t.color)
                .storage(StorageType::Text);
        }
    }

    #[test]
    fn test_configuration_errors() {
        let builder = TableBuilder::new(&TypeOptions::default());
        assert_eq!(builder.build::<Broken>().unwrap_err().code(), 1002);
        assert_eq!(builder.build::<BadIncrement>().unwrap_err().code(), 1006);
        assert_eq!(builder.build::<OnlyComputed>().unwrap_err().code(), 1001);
        assert_eq!(builder.build::<Opaque>().unwrap_err().code(), 1007);

        let err = builder.build::<Untyped>().unwrap_err();
        assert_eq!(err.code(), 1004);
        assert!(matches!(
            err,
            ModelError::UnknownStorageType { ref table, ref column } if table == "Untyped" && column == "Color"
        ));
    }

    #[test]
    fn test_custom_host_type_with_explicit_storage() {
        let table = TableBuilder::new(&TypeOptions::default()).build::<Typed>().unwrap();
        let column = table.column("Color").unwrap();
        assert_eq!(column.storage_type(), StorageType::Text);

        let typed = Typed { color: Rgb(255, 0, 16) };
        assert_eq!(
            column.value_for_bind(&typed, table.type_options()),
            crate::Value::Text("#ff0010".into())
        );
    }

    #[test]
    fn test_property_indices_merge_in_column_order() {
        #[derive(Default)]
        struct Person {
            last: String,
            first: String,
        }

        impl Mapped for Person {
            fn describe(table: &mut TableDef<Self>) {
                table
                    .column("First", |p| &p.first, |p| &mut p.first)
                    .sort_order(2)
                    .index("IX_Person_Name");
                table
                    .column("Last", |p| &p.last, |p| &mut p.last)
                    .sort_order(1)
                    .indexed("IX_Person_Name", false, SortDirection::Descending);
            }
        }

        let table = TableBuilder::new(&TypeOptions::default()).build::<Person>().unwrap();
        assert_eq!(table.indices().len(), 1);
        assert_eq!(
            table.indices()[0].create_sql(table.name()),
            r#"CREATE INDEX IF NOT EXISTS "IX_Person_Name" ON "Person" ("Last" DESC, "First")"#
        );
    }
}
