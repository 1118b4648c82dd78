//! Property/column mapping.
//!
//! A [`Mapping`] binds a table to an entity: an ordered list of
//! [`PropertyMapping`]s (declaration order drives every generated column list)
//! and the set of read-only properties that INSERT and UPDATE never write.
//!
//! # Example
//!
//! ```ignore
//! use relmap::{Mapping, Naming, PropertyDef, Value};
//!
//! let mapping = Mapping::<Value>::builder("users")
//!     .naming(Naming::SnakeCase)
//!     .auto("userId")
//!     .auto("userName")
//!     .property("isAdmin", "is_admin")
//!     .auto("created")
//!     .read_only(["userId", "created"])
//!     .build()?;
//! ```

mod def;


pub use def::{
    AutoConfig, Column, ColumnDef, MultiColumnDef, Naming, PropertyDef, SingleColumnDef, ToDb,
};

pub(crate) use def::{FromDbFn, ToDbFn};

use crate::error::{OrmError, OrmResult};
use crate::expr::SqlExpr;
use crate::ident::validate_identifier;
use crate::row::{Row, WriteRow};
use crate::value::DbValue;
use def::{ApplyFn, ExtractFn};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// The resolved binding of one property to its column(s).
pub struct PropertyMapping<V> {
    name: String,
    columns: Vec<Column<V>>,
    read_only: bool,
    extract: ExtractFn<V>,
    apply: ApplyFn<V>,
}

/// How many of a property's columns a row carries.
pub(crate) enum Presence<'a> {
    All,
    None,
    Partial { missing: &'a str },
}

impl<V> PropertyMapping<V> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[Column<V>] {
        &self.columns
    }

    pub fn read_only(&self) -> bool {
        self.read_only
    }

    /// Rebuild the property value from a row.
    pub fn extract_from_row(&self, row: &Row<V>) -> OrmResult<JsonValue> {
        (self.extract)(row)
    }

    /// Write the property value into `row` as one expression per column.
    pub fn apply_to_row(&self, row: &mut WriteRow<V>, value: &JsonValue) -> OrmResult<()> {
        (self.apply)(row, value)
    }

    pub(crate) fn presence_in<'a>(&'a self, row: &Row<V>) -> Presence<'a> {
        let mut missing = None;
        let mut found = 0;
        for column in &self.columns {
            if row.contains_key(&column.name) {
                found += 1;
            } else if missing.is_none() {
                missing = Some(column.name.as_str());
            }
        }
        match missing {
            None => Presence::All,
            Some(_) if found == 0 => Presence::None,
            Some(missing) => Presence::Partial { missing },
        }
    }
}

impl<V> fmt::Debug for PropertyMapping<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyMapping")
            .field("name", &self.name)
            .field(
                "columns",
                &self.columns.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
            )
            .field("read_only", &self.read_only)
            .finish_non_exhaustive()
    }
}

/// A table-to-entity binding. Immutable once built; share it via `Arc`.
#[derive(Debug)]
pub struct Mapping<V> {
    table: String,
    properties: Vec<PropertyMapping<V>>,
    index: HashMap<String, usize>,
    read_only: Vec<String>,
}

impl<V: DbValue> Mapping<V> {
    pub fn builder(table: impl Into<String>) -> MappingBuilder<V> {
        MappingBuilder::new(table)
    }
}

impl<V> Mapping<V> {
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Property mappings in declaration order.
    pub fn properties(&self) -> &[PropertyMapping<V>] {
        &self.properties
    }

    pub fn property(&self, name: &str) -> Option<&PropertyMapping<V>> {
        self.index.get(name).map(|&i| &self.properties[i])
    }

    /// Look up a property, failing with [`OrmError::UnknownProperty`].
    pub fn require_property(&self, name: &str) -> OrmResult<&PropertyMapping<V>> {
        self.property(name)
            .ok_or_else(|| OrmError::unknown_property(&self.table, name))
    }

    /// Read-only property names, in the order they were declared.
    pub fn read_only_properties(&self) -> &[String] {
        &self.read_only
    }

    pub fn is_read_only(&self, name: &str) -> bool {
        self.property(name).is_some_and(PropertyMapping::read_only)
    }

    /// Position of a property in declaration order.
    pub(crate) fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }
}

/// Builder for [`Mapping`].
pub struct MappingBuilder<V> {
    table: String,
    defs: Vec<(String, PropertyDef<V>)>,
    read_only: Vec<String>,
    auto: AutoConfig,
}

impl<V: DbValue> MappingBuilder<V> {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            defs: Vec::new(),
            read_only: Vec::new(),
            auto: AutoConfig::identity(),
        }
    }

    /// Set how auto-named columns are derived (default: identity).
    pub fn auto_config(mut self, auto: AutoConfig) -> Self {
        self.auto = auto;
        self
    }

    /// Shorthand for `auto_config(AutoConfig::naming(naming))`.
    pub fn naming(self, naming: Naming) -> Self {
        self.auto_config(AutoConfig::naming(naming))
    }

    /// Declare a property. Declaration order is column order.
    pub fn property(mut self, name: impl Into<String>, def: impl Into<PropertyDef<V>>) -> Self {
        self.defs.push((name.into(), def.into()));
        self
    }

    /// Declare an auto-named, identity-converted property.
    pub fn auto(self, name: impl Into<String>) -> Self {
        self.property(name, PropertyDef::Auto)
    }

    /// Mark properties as read-only (never written by INSERT/UPDATE).
    pub fn read_only<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        for name in names {
            let name = name.into();
            if !self.read_only.contains(&name) {
                self.read_only.push(name);
            }
        }
        self
    }

    /// Resolve all definitions and validate the result.
    ///
    /// Fails with [`OrmError::Config`] when the table or a column name is not
    /// a valid identifier, a property is declared twice, two properties share
    /// a column, or a read-only name is not a declared property.
    pub fn build(self) -> OrmResult<Mapping<V>> {
        validate_identifier(&self.table)?;

        let mut index = HashMap::with_capacity(self.defs.len());
        for (i, (name, _)) in self.defs.iter().enumerate() {
            if index.insert(name.clone(), i).is_some() {
                return Err(OrmError::config(format!(
                    "property '{name}' is declared twice on table '{}'",
                    self.table
                )));
            }
        }
        for name in &self.read_only {
            if !index.contains_key(name) {
                return Err(OrmError::config(format!(
                    "read-only property '{name}' is not declared on table '{}'",
                    self.table
                )));
            }
        }

        let mut owners: HashMap<String, String> = HashMap::new();
        let mut properties = Vec::with_capacity(self.defs.len());
        for (name, def) in self.defs {
            let read_only = self.read_only.contains(&name);
            let mapping = resolve(name, def, &self.auto, read_only)?;
            if mapping.columns.is_empty() {
                return Err(OrmError::config(format!(
                    "property '{}' maps to no columns",
                    mapping.name
                )));
            }
            for column in &mapping.columns {
                validate_identifier(&column.name)?;
                if let Some(owner) = owners.insert(column.name.clone(), mapping.name.clone()) {
                    return Err(OrmError::config(format!(
                        "column '{}' is mapped by both '{owner}' and '{}'",
                        column.name, mapping.name
                    )));
                }
            }
            properties.push(mapping);
        }

        tracing::trace!(
            target: "relmap.mapping",
            table = %self.table,
            properties = properties.len(),
            read_only = ?self.read_only,
            "mapping built"
        );

        Ok(Mapping {
            table: self.table,
            properties,
            index,
            read_only: self.read_only,
        })
    }
}

fn resolve<V: DbValue>(
    name: String,
    def: PropertyDef<V>,
    auto: &AutoConfig,
    read_only: bool,
) -> OrmResult<PropertyMapping<V>> {
    match def {
        PropertyDef::Auto => {
            let column = Column::new(auto.column_name(&name));
            Ok(single_column(name, column, None, None, read_only))
        }
        PropertyDef::Column(column) => Ok(single_column(
            name,
            Column::new(column),
            None,
            None,
            read_only,
        )),
        PropertyDef::Single(def) => {
            let column = match def.column {
                ColumnDef::Auto => Column::new(auto.column_name(&name)),
                ColumnDef::Named(column) => Column::new(column),
                ColumnDef::Full(column) => column,
            };
            Ok(single_column(name, column, def.from_db, def.to_db, read_only))
        }
        PropertyDef::Multi(def) => Ok(PropertyMapping {
            name,
            columns: def.columns,
            read_only,
            extract: def.extract,
            apply: def.apply,
        }),
    }
}

fn single_column<V: DbValue>(
    name: String,
    column: Column<V>,
    from_db: Option<FromDbFn<V>>,
    to_db: Option<ToDbFn<V>>,
    read_only: bool,
) -> PropertyMapping<V> {
    let read_name = column.name.clone();
    let read_property = name.clone();
    let extract: ExtractFn<V> = Arc::new(move |row: &Row<V>| -> OrmResult<JsonValue> {
        let value = row
            .get(&read_name)
            .ok_or_else(|| OrmError::missing_column(&read_property, &read_name))?;
        match &from_db {
            Some(convert) => convert(value),
            None => value.to_property(),
        }
    });

    let write_name = column.name.clone();
    let apply: ApplyFn<V> = Arc::new(
        move |row: &mut WriteRow<V>, value: &JsonValue| -> OrmResult<()> {
            let expr = match &to_db {
                Some(convert) => convert(value)?.into_expr(),
                None => SqlExpr::bind(V::from_property(value)?),
            };
            row.insert(write_name.clone(), expr);
            Ok(())
        },
    );

    PropertyMapping {
        name,
        columns: vec![column],
        read_only,
        extract,
        apply,
    }
}
