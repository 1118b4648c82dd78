//! Generic data access object.
//!
//! [`Dao`] combines a [`Driver`], a shared [`Mapping`] and the name of the id
//! property into the usual CRUD and paging operations. Every statement comes
//! from the [`SqlGenerator`]; the DAO itself only sequences statements and
//! decodes their results.
//!
//! Statements that return the affected entity use `RETURNING <columns>`, so
//! the driver's engine must support it (PostgreSQL, SQLite 3.35+, MariaDB
//! 10.5+).
//!
//! ```ignore
//! let dao: Dao<_, User> = Dao::new(PgDriver::new(client), mapping, "id")?;
//! let user = dao.insert(&NewUser { name: "alice".into() }).await?;
//! let page = dao.find_page(&PageRequest::new("name", 20, 0)).await?;
//! ```

use crate::driver::Driver;
use crate::error::{OrmError, OrmResult};
use crate::expr::SqlExpr;
use crate::generator::{SortOrder, SqlGenerator};
use crate::mapping::Mapping;
use crate::row::{Record, Row};
use crate::value::DbValue;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::marker::PhantomData;
use std::sync::Arc;

/// Logged SQL is cut to this many bytes.
const MAX_LOGGED_SQL: usize = 200;

/// A request for one page of results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    /// Maximum number of results.
    pub limit: u64,
    /// Number of results to skip.
    pub offset: u64,
    /// Property to sort by.
    pub sort_property: String,
    #[serde(default)]
    pub sort_order: SortOrder,
}

impl PageRequest {
    pub fn new(sort_property: impl Into<String>, limit: u64, offset: u64) -> Self {
        Self {
            limit,
            offset,
            sort_property: sort_property.into(),
            sort_order: SortOrder::Asc,
        }
    }

    pub fn order(mut self, order: SortOrder) -> Self {
        self.sort_order = order;
        self
    }
}

/// A page of results plus the total number of rows available.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub count: u64,
    pub results: Vec<T>,
}

/// CRUD access to one table.
pub struct Dao<D: Driver, T> {
    driver: D,
    generator: SqlGenerator<D::Value>,
    id_property: String,
    _entity: PhantomData<fn() -> T>,
}

impl<D: Driver, T: DeserializeOwned> Dao<D, T> {
    /// Fails with [`OrmError::Config`] when `id_property` is not a property
    /// of `mapping`.
    pub fn new(
        driver: D,
        mapping: Arc<Mapping<D::Value>>,
        id_property: impl Into<String>,
    ) -> OrmResult<Self> {
        let id_property = id_property.into();
        if mapping.property(&id_property).is_none() {
            return Err(OrmError::config(format!(
                "id property '{id_property}' is not declared on table '{}'",
                mapping.table()
            )));
        }
        Ok(Self {
            driver,
            generator: SqlGenerator::new(mapping),
            id_property,
            _entity: PhantomData,
        })
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn generator(&self) -> &SqlGenerator<D::Value> {
        &self.generator
    }

    pub fn mapping(&self) -> &Arc<Mapping<D::Value>> {
        self.generator.mapping()
    }

    pub fn id_property(&self) -> &str {
        &self.id_property
    }

    /// Retrieve an entity by id.
    pub async fn find_by_id<I: Serialize + ?Sized>(&self, id: &I) -> OrmResult<Option<T>> {
        let stmt = self
            .generator
            .select_statement(None, Some(self.where_id(id)?))?;
        match self.query_opt("find_by_id", &stmt).await? {
            Some(row) => Ok(Some(self.generator.from_row(&row)?)),
            None => Ok(None),
        }
    }

    pub async fn exists_by_id<I: Serialize + ?Sized>(&self, id: &I) -> OrmResult<bool> {
        let stmt = self
            .generator
            .select_statement(Some(&[self.id_property.as_str()]), Some(self.where_id(id)?))?;
        Ok(self.query_opt("exists_by_id", &stmt).await?.is_some())
    }

    pub async fn find_all(&self) -> OrmResult<Vec<T>> {
        let stmt = self.generator.select_statement(None, None)?;
        let rows = self.query("find_all", &stmt).await?;
        self.decode_all(&rows)
    }

    /// Retrieve the entities with any of `ids`. An empty list returns nothing
    /// without a round trip.
    pub async fn find_many_by_id<I: Serialize>(&self, ids: &[I]) -> OrmResult<Vec<T>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let stmt = self
            .generator
            .select_statement(None, Some(self.where_any_id(ids)?))?;
        let rows = self.query("find_many_by_id", &stmt).await?;
        self.decode_all(&rows)
    }

    /// Number of rows in the table.
    pub async fn count(&self) -> OrmResult<u64> {
        let stmt = self.generator.count_statement(None);
        self.fetch_count("count", &stmt).await
    }

    /// One page of entities, sorted by `request.sort_property`, plus the
    /// total count.
    pub async fn find_page(&self, request: &PageRequest) -> OrmResult<Page<T>> {
        let order = self
            .generator
            .order_by_clause(&request.sort_property, request.sort_order)?;
        let stmt = self.generator.page_statement(
            None,
            None,
            Some(order),
            request.limit,
            request.offset,
        )?;

        let count = self
            .fetch_count("find_page", &self.generator.count_statement(None))
            .await?;
        let rows = self.query("find_page", &stmt).await?;
        Ok(Page {
            count,
            results: self.decode_all(&rows)?,
        })
    }

    /// Insert an entity and return it as stored (generated and read-only
    /// columns included).
    pub async fn insert<S: Serialize + ?Sized>(&self, save: &S) -> OrmResult<T> {
        let stmt = self.returning(self.generator.insert_statement(save)?)?;
        match self.query_opt("insert", &stmt).await? {
            Some(row) => self.generator.from_row(&row),
            None => Err(OrmError::Other(format!(
                "INSERT INTO {} returned no row",
                self.mapping().table()
            ))),
        }
    }

    /// Insert entities one statement at a time, in order.
    pub async fn insert_many<S: Serialize>(&self, saves: &[S]) -> OrmResult<Vec<T>> {
        let mut out = Vec::with_capacity(saves.len());
        for save in saves {
            out.push(self.insert(save).await?);
        }
        Ok(out)
    }

    /// Update the present properties of `partial` on the entity with `id`
    /// and return the updated entity.
    ///
    /// Fails with [`OrmError::NotFound`] when no row has that id.
    pub async fn update<I, S>(&self, id: &I, partial: &S) -> OrmResult<T>
    where
        I: Serialize + ?Sized,
        S: Serialize + ?Sized,
    {
        let update = self
            .generator
            .update_statement(partial, self.where_id(id)?)?;
        let stmt = self.returning(update)?;
        match self.query_opt("update", &stmt).await? {
            Some(row) => self.generator.from_row(&row),
            None => Err(OrmError::not_found(format!(
                "no row in '{}' with {} = {}",
                self.mapping().table(),
                self.id_property,
                serde_json::to_value(id)?
            ))),
        }
    }

    /// Apply `(id, partial)` updates one statement at a time, in order.
    /// Stops at the first id with no row.
    pub async fn update_many<I, S>(&self, updates: &[(I, S)]) -> OrmResult<Vec<T>>
    where
        I: Serialize,
        S: Serialize,
    {
        let mut out = Vec::with_capacity(updates.len());
        for (id, partial) in updates {
            out.push(self.update(id, partial).await?);
        }
        Ok(out)
    }

    /// Returns the number of rows deleted.
    pub async fn delete_by_id<I: Serialize + ?Sized>(&self, id: &I) -> OrmResult<u64> {
        let stmt = self.generator.delete_statement(self.where_id(id)?);
        self.execute("delete_by_id", &stmt).await
    }

    pub async fn delete_many_by_id<I: Serialize>(&self, ids: &[I]) -> OrmResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let stmt = self.generator.delete_statement(self.where_any_id(ids)?);
        self.execute("delete_many_by_id", &stmt).await
    }

    /// Delete every row of the table.
    pub async fn delete_all(&self) -> OrmResult<u64> {
        let stmt = self.generator.delete_statement(SqlExpr::new("1=1")?);
        self.execute("delete_all", &stmt).await
    }

    fn id_record<I: Serialize + ?Sized>(&self, id: &I) -> OrmResult<Record> {
        let mut record = Record::new();
        record.insert(self.id_property.clone(), serde_json::to_value(id)?);
        Ok(record)
    }

    fn where_id<I: Serialize + ?Sized>(&self, id: &I) -> OrmResult<SqlExpr<D::Value>> {
        self.generator.where_equal_record(&self.id_record(id)?)
    }

    fn where_any_id<I: Serialize>(&self, ids: &[I]) -> OrmResult<SqlExpr<D::Value>> {
        let records = ids
            .iter()
            .map(|id| self.id_record(id))
            .collect::<OrmResult<Vec<_>>>()?;
        self.generator.where_any_equal_clause(&records)
    }

    fn returning(&self, stmt: SqlExpr<D::Value>) -> OrmResult<SqlExpr<D::Value>> {
        let mut stmt = stmt;
        stmt.push(" RETURNING ")?
            .push_expr(self.generator.columns_clause(None)?);
        Ok(stmt)
    }

    fn decode_all(&self, rows: &[Row<D::Value>]) -> OrmResult<Vec<T>> {
        rows.iter().map(|row| self.generator.from_row(row)).collect()
    }

    async fn fetch_count(&self, op: &'static str, stmt: &SqlExpr<D::Value>) -> OrmResult<u64> {
        let row = self
            .query_opt(op, stmt)
            .await?
            .ok_or_else(|| OrmError::decode("count", "COUNT(*) returned no row"))?;
        let value = row
            .get("count")
            .ok_or_else(|| OrmError::decode("count", "column not present in row"))?;
        match value.to_property()? {
            JsonValue::Number(n) => n
                .as_u64()
                .ok_or_else(|| OrmError::decode("count", format!("not a row count: {n}"))),
            // Some engines hand 64-bit integers back as text.
            JsonValue::String(s) => s
                .parse()
                .map_err(|e: std::num::ParseIntError| OrmError::decode("count", e.to_string())),
            other => Err(OrmError::decode("count", format!("not a row count: {other}"))),
        }
    }

    async fn query(
        &self,
        op: &'static str,
        stmt: &SqlExpr<D::Value>,
    ) -> OrmResult<Vec<Row<D::Value>>> {
        self.log(op, stmt);
        self.driver.query(stmt).await
    }

    async fn query_opt(
        &self,
        op: &'static str,
        stmt: &SqlExpr<D::Value>,
    ) -> OrmResult<Option<Row<D::Value>>> {
        self.log(op, stmt);
        self.driver.query_opt(stmt).await
    }

    async fn execute(&self, op: &'static str, stmt: &SqlExpr<D::Value>) -> OrmResult<u64> {
        self.log(op, stmt);
        self.driver.execute(stmt).await
    }

    fn log(&self, op: &'static str, stmt: &SqlExpr<D::Value>) {
        tracing::debug!(
            target: "relmap.sql",
            op,
            table = %self.mapping().table(),
            param_count = stmt.values().len(),
            sql = %truncate_sql(stmt.text(), MAX_LOGGED_SQL),
        );
    }
}

impl<D: Driver + Clone, T> Clone for Dao<D, T> {
    fn clone(&self) -> Self {
        Self {
            driver: self.driver.clone(),
            generator: self.generator.clone(),
            id_property: self.id_property.clone(),
            _entity: PhantomData,
        }
    }
}

impl<D: Driver, T> std::fmt::Debug for Dao<D, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dao")
            .field("table", &self.generator.mapping().table())
            .field("id_property", &self.id_property)
            .finish_non_exhaustive()
    }
}

fn truncate_sql(sql: &str, max_bytes: usize) -> String {
    if sql.len() <= max_bytes {
        return sql.to_string();
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &sql[..end])
}
