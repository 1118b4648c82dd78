//! Row and record representations.
//!
//! - [`Row`] is what a driver returns: column name → database value.
//! - [`WriteRow`] is what the write path produces: column name → SQL expression
//!   (usually a single placeholder, sometimes a SQL-side transform).
//! - [`Record`] is the application side: property name → property value.

use crate::error::{OrmError, OrmResult};
use crate::expr::SqlExpr;
use crate::value::DbValue;
use serde::de::DeserializeOwned;
use std::collections::HashMap;

/// A row read from the database.
pub type Row<V> = HashMap<String, V>;

/// Per-column write expressions produced by property mappings.
pub type WriteRow<V> = HashMap<String, SqlExpr<V>>;

/// An entity as seen by the mapping layer.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Typed access to row columns, mainly for multi-column extractors.
pub trait RowExt<V> {
    /// Borrow a column's value.
    fn column(&self, name: &str) -> OrmResult<&V>;

    /// Decode a column into `T` through the value's property form.
    fn get_as<T: DeserializeOwned>(&self, name: &str) -> OrmResult<T>;
}

impl<V: DbValue> RowExt<V> for Row<V> {
    fn column(&self, name: &str) -> OrmResult<&V> {
        self.get(name)
            .ok_or_else(|| OrmError::decode(name, "column not present in row"))
    }

    fn get_as<T: DeserializeOwned>(&self, name: &str) -> OrmResult<T> {
        let prop = self.column(name)?.to_property()?;
        serde_json::from_value(prop).map_err(|e| OrmError::decode(name, e.to_string()))
    }
}

/// Bind `value` as the single-placeholder write expression of `column`.
pub fn set_column<V>(row: &mut WriteRow<V>, column: &str, value: impl Into<V>) {
    row.insert(column.to_string(), SqlExpr::bind(value));
}
