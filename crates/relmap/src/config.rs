//! Declarative mapping files.
//!
//! A mapping can be described in TOML instead of code:
//!
//! ```toml
//! table = "test_table"
//! naming = "snake_case"
//! read_only = ["objId", "created", "updated"]
//!
//! [properties]
//! objId = "@auto"
//! objName = "@auto"
//! isAdmin = "is_admin"
//! sqlTest = { column = "sql_test", select = "UPPER(sql_test)", codec = "lower_on_write" }
//! mappedAuto = { column = "@auto", codec = "bigint_text" }
//! money = { columns = ["money_amount", "money_currency"], codec = "money" }
//! ```
//!
//! Properties keep document order. Converters cannot be written in TOML, so
//! `codec` names refer to entries of a [`CodecRegistry`] supplied when the
//! file is turned into a [`Mapping`].

use crate::error::{OrmError, OrmResult};
use crate::expr::SqlExpr;
use crate::mapping::{
    Column, ColumnDef, FromDbFn, Mapping, MultiColumnDef, Naming, PropertyDef, SingleColumnDef,
    ToDbFn,
};
use crate::row::{Row, WriteRow};
use crate::value::DbValue;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

/// Marks a column name to be derived from the property name.
pub const AUTO: &str = "@auto";

/// A parsed mapping file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MappingFile {
    pub table: String,
    #[serde(default)]
    pub naming: Naming,
    #[serde(default)]
    pub read_only: Vec<String>,
    #[serde(default)]
    pub properties: toml::Table,
}

/// One property definition as written in a mapping file.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertySpec {
    /// `"@auto"` or a literal column name.
    Column(String),
    Single(SingleSpec),
    Multi(MultiSpec),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SingleSpec {
    pub column: String,
    /// Raw SQL read expression, e.g. `UPPER(sql_test)`.
    #[serde(default)]
    pub select: Option<String>,
    #[serde(default)]
    pub codec: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MultiSpec {
    pub columns: Vec<String>,
    pub codec: String,
}

impl PropertySpec {
    /// Recognize a definition shape. A table must carry exactly one of
    /// `column` or `columns`; its other keys are checked against that shape.
    pub fn from_toml(property: &str, value: &toml::Value) -> OrmResult<Self> {
        let unrecognized = |reason: String| {
            OrmError::config(format!(
                "unrecognized definition for property '{property}': {reason}"
            ))
        };
        match value {
            toml::Value::String(column) => Ok(PropertySpec::Column(column.clone())),
            toml::Value::Table(table) => {
                let shape = toml::Value::Table(table.clone());
                match (table.contains_key("column"), table.contains_key("columns")) {
                    (true, false) => shape
                        .try_into::<SingleSpec>()
                        .map(PropertySpec::Single)
                        .map_err(|e| unrecognized(e.to_string())),
                    (false, true) => shape
                        .try_into::<MultiSpec>()
                        .map(PropertySpec::Multi)
                        .map_err(|e| unrecognized(e.to_string())),
                    _ => Err(unrecognized(format!(
                        "expected exactly one of `column` or `columns` in {value}"
                    ))),
                }
            }
            other => Err(unrecognized(format!(
                "expected a column name or a table, found {other}"
            ))),
        }
    }
}

impl MappingFile {
    pub fn from_toml_str(s: &str) -> OrmResult<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: impl AsRef<Path>) -> OrmResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            OrmError::Io(std::io::Error::new(
                e.kind(),
                format!("failed to read mapping file {}: {e}", path.display()),
            ))
        })?;
        let file = Self::from_toml_str(&raw).map_err(|e| {
            OrmError::config(format!("failed to parse mapping file {}: {e}", path.display()))
        })?;
        tracing::debug!(
            target: "relmap.mapping",
            path = %path.display(),
            table = %file.table,
            "loaded mapping file"
        );
        Ok(file)
    }

    /// Property definitions in document order.
    ///
    /// A value that is not a string, a `{ column = ... }` table or a
    /// `{ columns = [...], codec = ... }` table is a configuration error.
    pub fn property_specs(&self) -> OrmResult<Vec<(String, PropertySpec)>> {
        self.properties
            .iter()
            .map(|(name, value)| {
                let spec = PropertySpec::from_toml(name, value).map_err(|e| match e {
                    OrmError::Config(msg) => {
                        OrmError::config(format!("table '{}': {msg}", self.table))
                    }
                    other => other,
                })?;
                Ok((name.clone(), spec))
            })
            .collect()
    }

    /// Resolve codecs and build the mapping.
    pub fn into_mapping<V: DbValue>(self, codecs: &CodecRegistry<V>) -> OrmResult<Mapping<V>> {
        let specs = self.property_specs()?;
        let mut builder = Mapping::builder(self.table.as_str()).naming(self.naming);
        for (name, spec) in specs {
            let def = codecs.resolve(&name, spec)?;
            builder = builder.property(name, def);
        }
        builder.read_only(self.read_only).build()
    }
}

struct SingleCodec<V> {
    from_db: Option<FromDbFn<V>>,
    to_db: Option<ToDbFn<V>>,
}

/// Named converters referenced by mapping files.
///
/// Single-column codecs carry `from_db`/`to_db` converters; multi-column
/// codecs carry `extract`/`apply` functions. Column names always come from
/// the file.
pub struct CodecRegistry<V> {
    single: HashMap<String, SingleCodec<V>>,
    multi: HashMap<String, MultiColumnDef<V>>,
}

impl<V> Default for CodecRegistry<V> {
    fn default() -> Self {
        Self {
            single: HashMap::new(),
            multi: HashMap::new(),
        }
    }
}

impl<V> fmt::Debug for CodecRegistry<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut single: Vec<_> = self.single.keys().collect();
        let mut multi: Vec<_> = self.multi.keys().collect();
        single.sort();
        multi.sort();
        f.debug_struct("CodecRegistry")
            .field("single", &single)
            .field("multi", &multi)
            .finish()
    }
}

impl<V: DbValue> CodecRegistry<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the converters of `def` under `name`; its column is ignored.
    ///
    /// ```ignore
    /// let codecs = CodecRegistry::new().single(
    ///     "bigint_text",
    ///     PropertyDef::single(ColumnDef::Auto)
    ///         .from_db(|v: &Value| parse_i64(v))
    ///         .to_db(|v: i64| Ok(ToDb::value(v.to_string()))),
    /// );
    /// ```
    pub fn single(mut self, name: impl Into<String>, def: SingleColumnDef<V>) -> Self {
        self.single.insert(
            name.into(),
            SingleCodec {
                from_db: def.from_db,
                to_db: def.to_db,
            },
        );
        self
    }

    /// Register typed multi-column extract/apply functions under `name`.
    pub fn multi<T, E, A>(mut self, name: impl Into<String>, extract: E, apply: A) -> Self
    where
        T: Serialize + DeserializeOwned,
        E: Fn(&Row<V>) -> OrmResult<T> + Send + Sync + 'static,
        A: Fn(&mut WriteRow<V>, T) -> OrmResult<()> + Send + Sync + 'static,
    {
        self.multi.insert(
            name.into(),
            MultiColumnDef::new(Vec::<String>::new(), extract, apply),
        );
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.single.contains_key(name) || self.multi.contains_key(name)
    }

    fn resolve(&self, property: &str, spec: PropertySpec) -> OrmResult<PropertyDef<V>> {
        match spec {
            PropertySpec::Column(column) if column == AUTO => Ok(PropertyDef::Auto),
            PropertySpec::Column(column) => Ok(PropertyDef::Column(column)),
            PropertySpec::Single(spec) => {
                let name = if spec.column == AUTO {
                    ColumnDef::Auto
                } else {
                    ColumnDef::Named(spec.column)
                };
                let column = match spec.select {
                    Some(select) => {
                        let column_name = match name {
                            ColumnDef::Named(column) => column,
                            _ => {
                                return Err(OrmError::config(format!(
                                    "property '{property}' has a select expression and needs an explicit column name"
                                )));
                            }
                        };
                        ColumnDef::Full(Column::computed(column_name, SqlExpr::new(select)?))
                    }
                    None => name,
                };
                let def = PropertyDef::single(column);
                let def = match spec.codec {
                    None => def,
                    Some(codec) => {
                        let codec = self.single.get(&codec).ok_or_else(|| {
                            OrmError::config(format!(
                                "unknown single-column codec '{codec}' for property '{property}'"
                            ))
                        })?;
                        def.with_converters(codec.from_db.clone(), codec.to_db.clone())
                    }
                };
                Ok(PropertyDef::Single(def))
            }
            PropertySpec::Multi(spec) => {
                if spec.columns.iter().any(|c| c == AUTO) {
                    return Err(OrmError::config(format!(
                        "multi-column property '{property}' needs explicit column names"
                    )));
                }
                let codec = self.multi.get(&spec.codec).ok_or_else(|| {
                    OrmError::config(format!(
                        "unknown multi-column codec '{}' for property '{property}'",
                        spec.codec
                    ))
                })?;
                Ok(PropertyDef::Multi(MultiColumnDef {
                    columns: spec.columns.into_iter().map(Column::new).collect(),
                    extract: codec.extract.clone(),
                    apply: codec.apply.clone(),
                }))
            }
        }
    }
}

#[cfg(test)]
mod tests;
