//! SQL statement generation from a [`Mapping`].
//!
//! Every method is a pure function of the mapping and its input: nothing is
//! executed and identical inputs always produce byte-identical SQL. Columns
//! are emitted in mapping declaration order, never in input key order.
//!
//! Input data (filters, save data, partial updates) is any `Serialize` value
//! whose serialized form is an object keyed by property name. A property is
//! "present" when its key is in that object; keys that are not properties of
//! the mapping fail with [`OrmError::UnknownProperty`].

use crate::error::{OrmError, OrmResult};
use crate::expr::SqlExpr;
use crate::mapping::{Mapping, PropertyMapping, Presence};
use crate::row::{Record, Row, WriteRow};
use crate::value::DbValue;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;

/// Sort direction for ORDER BY clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Builds statements for one mapping.
#[derive(Debug)]
pub struct SqlGenerator<V> {
    mapping: Arc<Mapping<V>>,
}

impl<V> Clone for SqlGenerator<V> {
    fn clone(&self) -> Self {
        Self {
            mapping: Arc::clone(&self.mapping),
        }
    }
}

/// Serialize input data into a record.
pub fn to_record<P: Serialize + ?Sized>(data: &P) -> OrmResult<Record> {
    match serde_json::to_value(data)? {
        JsonValue::Object(record) => Ok(record),
        other => Err(OrmError::Serialization(format!(
            "expected data to serialize to an object, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}

impl<V: DbValue> SqlGenerator<V> {
    pub fn new(mapping: Arc<Mapping<V>>) -> Self {
        Self { mapping }
    }

    pub fn mapping(&self) -> &Arc<Mapping<V>> {
        &self.mapping
    }

    /// Comma-separated read columns of `props` (all properties when `None`).
    ///
    /// Computed columns render as `select AS name`.
    pub fn columns_clause(&self, props: Option<&[&str]>) -> OrmResult<SqlExpr<V>> {
        let mut columns = Vec::new();
        for prop in self.selected(props)? {
            for column in prop.columns() {
                let mut expr = SqlExpr::empty();
                if let Some(select) = &column.select {
                    expr.push_expr(select.clone()).push_unsafe(" AS ");
                }
                expr.push_ident(&column.name);
                columns.push(expr);
            }
        }
        SqlExpr::join(columns, ", ")
    }

    /// `col=?` for every column of every present property, joined with ` AND `.
    ///
    /// Empty data has no meaningful predicate and fails with
    /// [`OrmError::EmptyJoin`].
    pub fn where_equal_clause<P: Serialize + ?Sized>(&self, partial: &P) -> OrmResult<SqlExpr<V>> {
        self.where_equal_record(&to_record(partial)?)
    }

    pub fn where_equal_record(&self, record: &Record) -> OrmResult<SqlExpr<V>> {
        let columns = self.write_columns(record, false)?;
        SqlExpr::join(columns.into_iter().map(assignment), " AND ")
    }

    /// Equality groups joined with ` OR `; each group is parenthesized when
    /// there is more than one.
    pub fn where_any_equal_clause<P: Serialize>(&self, items: &[P]) -> OrmResult<SqlExpr<V>> {
        let mut groups = items
            .iter()
            .map(|item| self.where_equal_clause(item))
            .collect::<OrmResult<Vec<_>>>()?;
        if groups.len() == 1 {
            return Ok(groups.remove(0));
        }
        let wrapped = groups.into_iter().map(|group| {
            let mut expr = SqlExpr::empty();
            expr.push_unsafe("(").push_expr(group).push_unsafe(")");
            expr
        });
        SqlExpr::join(wrapped, " OR ")
    }

    /// `SELECT <cols> FROM <table>[ WHERE <where>]`
    pub fn select_statement(
        &self,
        props: Option<&[&str]>,
        where_clause: Option<SqlExpr<V>>,
    ) -> OrmResult<SqlExpr<V>> {
        let mut expr = SqlExpr::empty();
        expr.push_unsafe("SELECT ")
            .push_expr(self.columns_clause(props)?)
            .push_unsafe(" FROM ")
            .push_ident(self.mapping.table());
        if let Some(where_clause) = where_clause {
            expr.push_unsafe(" WHERE ").push_expr(where_clause);
        }
        Ok(expr)
    }

    /// `SELECT COUNT(*) AS count FROM <table>[ WHERE <where>]`
    pub fn count_statement(&self, where_clause: Option<SqlExpr<V>>) -> SqlExpr<V> {
        let mut expr = SqlExpr::empty();
        expr.push_unsafe("SELECT COUNT(*) AS count FROM ")
            .push_ident(self.mapping.table());
        if let Some(where_clause) = where_clause {
            expr.push_unsafe(" WHERE ").push_expr(where_clause);
        }
        expr
    }

    /// `col ASC` (or `DESC`) for each column of `prop`.
    pub fn order_by_clause(&self, prop: &str, order: SortOrder) -> OrmResult<SqlExpr<V>> {
        let prop = self.mapping.require_property(prop)?;
        let columns = prop.columns().iter().map(|column| {
            let mut expr = SqlExpr::empty();
            expr.push_ident(&column.name)
                .push_unsafe(" ")
                .push_unsafe(order.as_sql());
            expr
        });
        SqlExpr::join(columns, ", ")
    }

    /// A SELECT with `ORDER BY <order> LIMIT ? OFFSET ?` appended.
    pub fn page_statement(
        &self,
        props: Option<&[&str]>,
        where_clause: Option<SqlExpr<V>>,
        order: Option<SqlExpr<V>>,
        limit: u64,
        offset: u64,
    ) -> OrmResult<SqlExpr<V>> {
        let mut expr = self.select_statement(props, where_clause)?;
        if let Some(order) = order {
            expr.push_unsafe(" ORDER BY ").push_expr(order);
        }
        expr.push_unsafe(" LIMIT ")
            .push_bind(V::from_property(&JsonValue::from(limit))?)
            .push_unsafe(" OFFSET ")
            .push_bind(V::from_property(&JsonValue::from(offset))?);
        Ok(expr)
    }

    /// `DELETE FROM <table> WHERE <where>`. The predicate is mandatory.
    pub fn delete_statement(&self, where_clause: SqlExpr<V>) -> SqlExpr<V> {
        let mut expr = SqlExpr::empty();
        expr.push_unsafe("DELETE FROM ")
            .push_ident(self.mapping.table())
            .push_unsafe(" WHERE ")
            .push_expr(where_clause);
        expr
    }

    /// `INSERT INTO <table> (<cols>) VALUES (<vals>)`; read-only properties in
    /// `save` are skipped.
    pub fn insert_statement<S: Serialize + ?Sized>(&self, save: &S) -> OrmResult<SqlExpr<V>> {
        self.insert_record(&to_record(save)?)
    }

    pub fn insert_record(&self, record: &Record) -> OrmResult<SqlExpr<V>> {
        let columns = self.write_columns(record, true)?;
        let mut names = Vec::with_capacity(columns.len());
        let mut values = Vec::with_capacity(columns.len());
        for (name, value) in columns {
            let mut ident = SqlExpr::empty();
            ident.push_ident(name);
            names.push(ident);
            values.push(value);
        }

        let mut expr = SqlExpr::empty();
        expr.push_unsafe("INSERT INTO ")
            .push_ident(self.mapping.table())
            .push_unsafe(" (")
            .push_expr(SqlExpr::join(names, ", ")?)
            .push_unsafe(") VALUES (")
            .push_expr(SqlExpr::join(values, ", ")?)
            .push_unsafe(")");
        Ok(expr)
    }

    /// `UPDATE <table> SET c=v[, ...] WHERE <where>`; read-only properties in
    /// `partial` are skipped.
    pub fn update_statement<S: Serialize + ?Sized>(
        &self,
        partial: &S,
        where_clause: SqlExpr<V>,
    ) -> OrmResult<SqlExpr<V>> {
        self.update_record(&to_record(partial)?, where_clause)
    }

    pub fn update_record(&self, record: &Record, where_clause: SqlExpr<V>) -> OrmResult<SqlExpr<V>> {
        let columns = self.write_columns(record, true)?;
        let set = SqlExpr::join(columns.into_iter().map(assignment), ", ")?;

        let mut expr = SqlExpr::empty();
        expr.push_unsafe("UPDATE ")
            .push_ident(self.mapping.table())
            .push_unsafe(" SET ")
            .push_expr(set)
            .push_unsafe(" WHERE ")
            .push_expr(where_clause);
        Ok(expr)
    }

    /// Decode a row into `T`.
    pub fn from_row<T: DeserializeOwned>(&self, row: &Row<V>) -> OrmResult<T> {
        let record = self.from_row_record(row)?;
        Ok(serde_json::from_value(JsonValue::Object(record))?)
    }

    /// Extract every property whose columns are in `row`.
    ///
    /// Properties with none of their columns present are left out (partial
    /// SELECTs); a property with only some of them fails with
    /// [`OrmError::MissingColumn`].
    pub fn from_row_record(&self, row: &Row<V>) -> OrmResult<Record> {
        let mut record = Record::new();
        for prop in self.mapping.properties() {
            match prop.presence_in(row) {
                Presence::All => {
                    record.insert(prop.name().to_string(), prop.extract_from_row(row)?);
                }
                Presence::None => {}
                Presence::Partial { missing } => {
                    return Err(OrmError::missing_column(prop.name(), missing));
                }
            }
        }
        Ok(record)
    }

    /// Apply every present property of `partial` to a fresh write row.
    pub fn to_row<P: Serialize + ?Sized>(&self, partial: &P) -> OrmResult<WriteRow<V>> {
        self.to_row_record(&to_record(partial)?)
    }

    pub fn to_row_record(&self, record: &Record) -> OrmResult<WriteRow<V>> {
        Ok(self
            .write_columns(record, false)?
            .into_iter()
            .map(|(name, expr)| (name.to_string(), expr))
            .collect())
    }

    fn selected(&self, props: Option<&[&str]>) -> OrmResult<Vec<&PropertyMapping<V>>> {
        match props {
            None => Ok(self.mapping.properties().iter().collect()),
            Some(props) => props
                .iter()
                .map(|name| self.mapping.require_property(name))
                .collect(),
        }
    }

    /// Present properties of `record` in declaration order.
    fn present<'a>(
        &'a self,
        record: &'a Record,
    ) -> OrmResult<Vec<(&'a PropertyMapping<V>, &'a JsonValue)>> {
        if let Some(unknown) = record.keys().find(|key| self.mapping.position(key).is_none()) {
            return Err(OrmError::unknown_property(self.mapping.table(), unknown.as_str()));
        }
        Ok(self
            .mapping
            .properties()
            .iter()
            .filter_map(|prop| record.get(prop.name()).map(|value| (prop, value)))
            .collect())
    }

    /// Write expressions of the present properties as ordered (column, expr)
    /// pairs.
    fn write_columns<'a>(
        &'a self,
        record: &'a Record,
        skip_read_only: bool,
    ) -> OrmResult<Vec<(&'a str, SqlExpr<V>)>> {
        let mut out = Vec::new();
        for (prop, value) in self.present(record)? {
            if skip_read_only && prop.read_only() {
                continue;
            }
            let mut row = WriteRow::new();
            prop.apply_to_row(&mut row, value)?;
            for column in prop.columns() {
                let expr = row
                    .remove(&column.name)
                    .ok_or_else(|| OrmError::missing_column(prop.name(), &column.name))?;
                out.push((column.name.as_str(), expr));
            }
        }
        Ok(out)
    }
}

fn assignment<V>((name, value): (&str, SqlExpr<V>)) -> SqlExpr<V> {
    let mut expr = SqlExpr::empty();
    expr.push_ident(name).push_unsafe("=").push_expr(value);
    expr
}

#[cfg(test)]
mod tests;
