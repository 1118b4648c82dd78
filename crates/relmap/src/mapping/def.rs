//! Declarative property definitions.

use crate::error::OrmResult;
use crate::expr::SqlExpr;
use crate::row::{Row, WriteRow};
use heck::{ToLowerCamelCase, ToShoutySnakeCase, ToSnakeCase};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::sync::Arc;

pub(crate) type ExtractFn<V> = Arc<dyn Fn(&Row<V>) -> OrmResult<JsonValue> + Send + Sync>;
pub(crate) type ApplyFn<V> =
    Arc<dyn Fn(&mut WriteRow<V>, &JsonValue) -> OrmResult<()> + Send + Sync>;
pub(crate) type FromDbFn<V> = Arc<dyn Fn(&V) -> OrmResult<JsonValue> + Send + Sync>;
pub(crate) type ToDbFn<V> = Arc<dyn Fn(&JsonValue) -> OrmResult<ToDb<V>> + Send + Sync>;

/// A database column.
///
/// `name` is written to on INSERT/UPDATE and is the output alias on reads. When
/// `select` is set, reads use `select AS name` instead of the bare column, which
/// allows SQL-side read transforms such as `UPPER(name)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Column<V> {
    pub name: String,
    pub select: Option<SqlExpr<V>>,
}

impl<V> Column<V> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            select: None,
        }
    }

    /// A column read through a select expression.
    pub fn computed(name: impl Into<String>, select: SqlExpr<V>) -> Self {
        Self {
            name: name.into(),
            select: Some(select),
        }
    }
}

impl<V> From<&str> for Column<V> {
    fn from(name: &str) -> Self {
        Column::new(name)
    }
}

impl<V> From<String> for Column<V> {
    fn from(name: String) -> Self {
        Column::new(name)
    }
}

/// The column part of a single-column definition.
#[derive(Debug, Clone)]
pub enum ColumnDef<V> {
    /// Derive the column name from the property name.
    Auto,
    Named(String),
    Full(Column<V>),
}

impl<V> From<&str> for ColumnDef<V> {
    fn from(name: &str) -> Self {
        ColumnDef::Named(name.to_string())
    }
}

impl<V> From<String> for ColumnDef<V> {
    fn from(name: String) -> Self {
        ColumnDef::Named(name)
    }
}

impl<V> From<Column<V>> for ColumnDef<V> {
    fn from(column: Column<V>) -> Self {
        ColumnDef::Full(column)
    }
}

/// What a single-column `to_db` converter produces.
#[derive(Debug, Clone, PartialEq)]
pub enum ToDb<V> {
    /// Bound as one placeholder.
    Value(V),
    /// Used as the column's write expression, e.g. `LOWER(?)`.
    Expr(SqlExpr<V>),
}

impl<V> ToDb<V> {
    pub fn value(value: impl Into<V>) -> Self {
        ToDb::Value(value.into())
    }

    pub fn into_expr(self) -> SqlExpr<V> {
        match self {
            ToDb::Value(value) => SqlExpr::bind(value),
            ToDb::Expr(expr) => expr,
        }
    }
}

/// How one property is stored.
///
/// Each variant is one definition shape; [`MappingBuilder`](super::MappingBuilder)
/// resolves them into [`PropertyMapping`](super::PropertyMapping)s.
pub enum PropertyDef<V> {
    /// One column named by the mapping's [`AutoConfig`], identity conversion.
    Auto,
    /// One explicitly named column, identity conversion.
    Column(String),
    /// One column with optional converters and select expression.
    Single(SingleColumnDef<V>),
    /// Several columns with caller-supplied extract/apply functions.
    Multi(MultiColumnDef<V>),
}

impl<V> PropertyDef<V> {
    pub fn auto() -> Self {
        PropertyDef::Auto
    }

    pub fn column(name: impl Into<String>) -> Self {
        PropertyDef::Column(name.into())
    }

    /// Start a single-column definition.
    pub fn single(column: impl Into<ColumnDef<V>>) -> SingleColumnDef<V> {
        SingleColumnDef {
            column: column.into(),
            from_db: None,
            to_db: None,
        }
    }
}

impl<V> From<&str> for PropertyDef<V> {
    fn from(name: &str) -> Self {
        PropertyDef::Column(name.to_string())
    }
}

impl<V> From<SingleColumnDef<V>> for PropertyDef<V> {
    fn from(def: SingleColumnDef<V>) -> Self {
        PropertyDef::Single(def)
    }
}

impl<V> From<MultiColumnDef<V>> for PropertyDef<V> {
    fn from(def: MultiColumnDef<V>) -> Self {
        PropertyDef::Multi(def)
    }
}

impl<V> fmt::Debug for PropertyDef<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyDef::Auto => f.write_str("Auto"),
            PropertyDef::Column(name) => f.debug_tuple("Column").field(name).finish(),
            PropertyDef::Single(def) => f
                .debug_struct("Single")
                .field("column", &ColumnName(&def.column))
                .field("from_db", &def.from_db.is_some())
                .field("to_db", &def.to_db.is_some())
                .finish(),
            PropertyDef::Multi(def) => f
                .debug_struct("Multi")
                .field(
                    "columns",
                    &def.columns.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
                )
                .finish(),
        }
    }
}

struct ColumnName<'a, V>(&'a ColumnDef<V>);

impl<V> fmt::Debug for ColumnName<'_, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            ColumnDef::Auto => f.write_str("<auto>"),
            ColumnDef::Named(name) => f.write_str(name),
            ColumnDef::Full(column) => f.write_str(&column.name),
        }
    }
}

/// A single-column definition. Without converters, values pass through
/// unchanged in both directions.
pub struct SingleColumnDef<V> {
    pub(crate) column: ColumnDef<V>,
    pub(crate) from_db: Option<FromDbFn<V>>,
    pub(crate) to_db: Option<ToDbFn<V>>,
}

impl<V: 'static> SingleColumnDef<V> {
    /// Convert database values on read.
    pub fn from_db<T, F>(mut self, f: F) -> Self
    where
        T: Serialize,
        F: Fn(&V) -> OrmResult<T> + Send + Sync + 'static,
    {
        self.from_db = Some(Arc::new(move |v: &V| -> OrmResult<JsonValue> {
            Ok(serde_json::to_value(f(v)?)?)
        }));
        self
    }

    /// Convert property values on write.
    pub fn to_db<T, F>(mut self, f: F) -> Self
    where
        T: DeserializeOwned,
        F: Fn(T) -> OrmResult<ToDb<V>> + Send + Sync + 'static,
    {
        self.to_db = Some(Arc::new(move |prop: &JsonValue| -> OrmResult<ToDb<V>> {
            let value: T = serde_json::from_value(prop.clone())?;
            f(value)
        }));
        self
    }

    /// Read converter working on the untyped property form.
    pub fn from_db_raw<F>(mut self, f: F) -> Self
    where
        F: Fn(&V) -> OrmResult<JsonValue> + Send + Sync + 'static,
    {
        self.from_db = Some(Arc::new(f));
        self
    }

    /// Write converter working on the untyped property form.
    pub fn to_db_raw<F>(mut self, f: F) -> Self
    where
        F: Fn(&JsonValue) -> OrmResult<ToDb<V>> + Send + Sync + 'static,
    {
        self.to_db = Some(Arc::new(f));
        self
    }

    pub(crate) fn with_converters(
        mut self,
        from_db: Option<FromDbFn<V>>,
        to_db: Option<ToDbFn<V>>,
    ) -> Self {
        self.from_db = from_db;
        self.to_db = to_db;
        self
    }
}

/// A property stored across several columns, e.g. a money value split into
/// amount and currency. There is no automatic conversion: `extract` rebuilds
/// the value from a row, `apply` writes one expression per column.
pub struct MultiColumnDef<V> {
    pub(crate) columns: Vec<Column<V>>,
    pub(crate) extract: ExtractFn<V>,
    pub(crate) apply: ApplyFn<V>,
}

impl<V: 'static> MultiColumnDef<V> {
    pub fn new<T, E, A>(
        columns: impl IntoIterator<Item = impl Into<Column<V>>>,
        extract: E,
        apply: A,
    ) -> Self
    where
        T: Serialize + DeserializeOwned,
        E: Fn(&Row<V>) -> OrmResult<T> + Send + Sync + 'static,
        A: Fn(&mut WriteRow<V>, T) -> OrmResult<()> + Send + Sync + 'static,
    {
        Self::raw(
            columns,
            move |row| Ok(serde_json::to_value(extract(row)?)?),
            move |row, prop| apply(row, serde_json::from_value(prop.clone())?),
        )
    }

    /// Multi-column definition working on the untyped property form.
    pub fn raw<E, A>(
        columns: impl IntoIterator<Item = impl Into<Column<V>>>,
        extract: E,
        apply: A,
    ) -> Self
    where
        E: Fn(&Row<V>) -> OrmResult<JsonValue> + Send + Sync + 'static,
        A: Fn(&mut WriteRow<V>, &JsonValue) -> OrmResult<()> + Send + Sync + 'static,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            extract: Arc::new(extract),
            apply: Arc::new(apply),
        }
    }
}

/// Built-in property → column naming conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Naming {
    #[default]
    Identity,
    /// `objName` → `obj_name`
    SnakeCase,
    /// `obj_name` → `objName`
    CamelCase,
    /// `objName` → `OBJ_NAME`
    ScreamingSnakeCase,
}

impl Naming {
    pub fn apply(self, property: &str) -> String {
        match self {
            Naming::Identity => property.to_string(),
            Naming::SnakeCase => property.to_snake_case(),
            Naming::CamelCase => property.to_lower_camel_case(),
            Naming::ScreamingSnakeCase => property.to_shouty_snake_case(),
        }
    }
}

/// How [`PropertyDef::Auto`] (and [`ColumnDef::Auto`]) derive column names.
#[derive(Clone)]
pub struct AutoConfig {
    property_to_column: Arc<dyn Fn(&str) -> String + Send + Sync>,
}

impl AutoConfig {
    /// Column name = property name.
    pub fn identity() -> Self {
        Self::naming(Naming::Identity)
    }

    pub fn naming(naming: Naming) -> Self {
        Self::custom(move |property| naming.apply(property))
    }

    pub fn custom(f: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        Self {
            property_to_column: Arc::new(f),
        }
    }

    pub fn column_name(&self, property: &str) -> String {
        (self.property_to_column)(property)
    }
}

impl Default for AutoConfig {
    fn default() -> Self {
        Self::identity()
    }
}

impl fmt::Debug for AutoConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AutoConfig").finish_non_exhaustive()
    }
}
