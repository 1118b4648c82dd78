//! PostgreSQL adapter on `tokio-postgres`.
//!
//! [`PgDriver`] runs expressions on anything that dereferences to a
//! `tokio_postgres` client or transaction; [`PgPoolDriver`] (feature `pool`)
//! checks a connection out of a `deadpool-postgres` pool per statement.
//!
//! Expressions are rendered with `$n` placeholders and [`Value`]s are bound
//! with a [`ToSql`] impl that coerces to the parameter type the server infers,
//! e.g. text `"123"` into a `bigint` column or an RFC 3339 string into
//! `timestamptz`.

use crate::driver::Driver;
use crate::error::{OrmError, OrmResult};
use crate::expr::SqlExpr;
use crate::placeholder::PlaceholderStyle;
use crate::row::Row;
use crate::value::Value;
use bytes::BytesMut;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value as JsonValue;
use std::error::Error as StdError;
use std::ops::Deref;
use tokio_postgres::GenericClient;
use tokio_postgres::types::{IsNull, ToSql, Type, accepts, to_sql_checked};
use uuid::Uuid;

type BoxError = Box<dyn StdError + Sync + Send>;

fn mismatch(value: &Value, ty: &Type) -> BoxError {
    format!("cannot bind {value:?} to a parameter of type {ty}").into()
}

fn out_of_range(value: i64, ty: &Type) -> BoxError {
    format!("integer {value} is out of range for type {ty}").into()
}

impl ToSql for Value {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError>
    where
        Self: Sized,
    {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(b) => match *ty {
                Type::BOOL => b.to_sql(ty, out),
                Type::TEXT | Type::VARCHAR => b.to_string().to_sql(ty, out),
                _ => Err(mismatch(self, ty)),
            },
            Value::Int(i) => match *ty {
                Type::INT2 => i16::try_from(*i)
                    .map_err(|_| out_of_range(*i, ty))?
                    .to_sql(ty, out),
                Type::INT4 => i32::try_from(*i)
                    .map_err(|_| out_of_range(*i, ty))?
                    .to_sql(ty, out),
                Type::INT8 => i.to_sql(ty, out),
                Type::FLOAT4 => (*i as f32).to_sql(ty, out),
                Type::FLOAT8 => (*i as f64).to_sql(ty, out),
                Type::TEXT | Type::VARCHAR | Type::BPCHAR => i.to_string().to_sql(ty, out),
                Type::JSON | Type::JSONB => JsonValue::from(*i).to_sql(ty, out),
                _ => Err(mismatch(self, ty)),
            },
            Value::Float(f) => match *ty {
                Type::FLOAT4 => (*f as f32).to_sql(ty, out),
                Type::FLOAT8 => f.to_sql(ty, out),
                Type::TEXT | Type::VARCHAR | Type::BPCHAR => f.to_string().to_sql(ty, out),
                _ => Err(mismatch(self, ty)),
            },
            Value::Text(s) => match *ty {
                Type::INT2 => s.parse::<i16>()?.to_sql(ty, out),
                Type::INT4 => s.parse::<i32>()?.to_sql(ty, out),
                Type::INT8 => s.parse::<i64>()?.to_sql(ty, out),
                Type::FLOAT4 => s.parse::<f32>()?.to_sql(ty, out),
                Type::FLOAT8 => s.parse::<f64>()?.to_sql(ty, out),
                Type::BOOL => s.parse::<bool>()?.to_sql(ty, out),
                Type::UUID => Uuid::parse_str(s)?.to_sql(ty, out),
                Type::TIMESTAMPTZ => DateTime::parse_from_rfc3339(s)?
                    .with_timezone(&Utc)
                    .to_sql(ty, out),
                Type::TIMESTAMP => parse_naive(s)?.to_sql(ty, out),
                Type::JSON | Type::JSONB => JsonValue::String(s.clone()).to_sql(ty, out),
                _ => s.to_sql(ty, out),
            },
            Value::Json(j) => match *ty {
                Type::JSON | Type::JSONB => j.to_sql(ty, out),
                Type::TEXT | Type::VARCHAR => j.to_string().to_sql(ty, out),
                _ => Err(mismatch(self, ty)),
            },
            Value::Uuid(u) => match *ty {
                Type::UUID => u.to_sql(ty, out),
                Type::TEXT | Type::VARCHAR | Type::BPCHAR => u.to_string().to_sql(ty, out),
                _ => Err(mismatch(self, ty)),
            },
            Value::Timestamp(t) => match *ty {
                Type::TIMESTAMPTZ => t.to_sql(ty, out),
                Type::TIMESTAMP => t.naive_utc().to_sql(ty, out),
                Type::TEXT | Type::VARCHAR => t.to_rfc3339().to_sql(ty, out),
                _ => Err(mismatch(self, ty)),
            },
            Value::NaiveTimestamp(t) => match *ty {
                Type::TIMESTAMP => t.to_sql(ty, out),
                Type::TIMESTAMPTZ => t.and_utc().to_sql(ty, out),
                Type::TEXT | Type::VARCHAR => t.to_string().to_sql(ty, out),
                _ => Err(mismatch(self, ty)),
            },
        }
    }

    accepts!(
        BOOL,
        INT2,
        INT4,
        INT8,
        FLOAT4,
        FLOAT8,
        TEXT,
        VARCHAR,
        BPCHAR,
        NAME,
        UNKNOWN,
        JSON,
        JSONB,
        UUID,
        TIMESTAMP,
        TIMESTAMPTZ
    );
    to_sql_checked!();
}

/// `2024-01-02T03:04:05` (the serde form of `NaiveDateTime`), falling back to
/// RFC 3339 converted to UTC.
fn parse_naive(s: &str) -> Result<NaiveDateTime, BoxError> {
    match s.parse::<NaiveDateTime>() {
        Ok(t) => Ok(t),
        Err(_) => Ok(DateTime::parse_from_rfc3339(s)?.naive_utc()),
    }
}

/// Decode a `tokio_postgres` row into a column-name keyed [`Row`].
pub fn decode_row(row: &tokio_postgres::Row) -> OrmResult<Row<Value>> {
    let mut out = Row::with_capacity(row.len());
    for (idx, column) in row.columns().iter().enumerate() {
        let name = column.name();
        let decode_err = |e: tokio_postgres::Error| OrmError::decode(name, e.to_string());
        let value = match *column.type_() {
            Type::BOOL => Value::from(row.try_get::<_, Option<bool>>(idx).map_err(decode_err)?),
            Type::INT2 => Value::from(row.try_get::<_, Option<i16>>(idx).map_err(decode_err)?),
            Type::INT4 => Value::from(row.try_get::<_, Option<i32>>(idx).map_err(decode_err)?),
            Type::INT8 => Value::from(row.try_get::<_, Option<i64>>(idx).map_err(decode_err)?),
            Type::FLOAT4 => Value::from(row.try_get::<_, Option<f32>>(idx).map_err(decode_err)?),
            Type::FLOAT8 => Value::from(row.try_get::<_, Option<f64>>(idx).map_err(decode_err)?),
            Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN => {
                Value::from(row.try_get::<_, Option<String>>(idx).map_err(decode_err)?)
            }
            Type::JSON | Type::JSONB => row
                .try_get::<_, Option<JsonValue>>(idx)
                .map_err(decode_err)?
                .map_or(Value::Null, Value::Json),
            Type::UUID => Value::from(row.try_get::<_, Option<Uuid>>(idx).map_err(decode_err)?),
            Type::TIMESTAMPTZ => Value::from(
                row.try_get::<_, Option<DateTime<Utc>>>(idx)
                    .map_err(decode_err)?,
            ),
            Type::TIMESTAMP => Value::from(
                row.try_get::<_, Option<NaiveDateTime>>(idx)
                    .map_err(decode_err)?,
            ),
            ref other => {
                return Err(OrmError::decode(
                    name,
                    format!("unsupported column type {other}"),
                ));
            }
        };
        out.insert(name.to_string(), value);
    }
    Ok(out)
}

fn params(expr: &SqlExpr<Value>) -> Vec<&(dyn ToSql + Sync)> {
    expr.values()
        .iter()
        .map(|v| v as &(dyn ToSql + Sync))
        .collect()
}

async fn query_with<C>(client: &C, expr: &SqlExpr<Value>) -> OrmResult<Vec<Row<Value>>>
where
    C: GenericClient + Sync + ?Sized,
{
    let sql = PlaceholderStyle::Dollar.render(expr);
    let rows = client
        .query(sql.as_str(), &params(expr))
        .await
        .map_err(OrmError::from_db_error)?;
    rows.iter().map(decode_row).collect()
}

async fn execute_with<C>(client: &C, expr: &SqlExpr<Value>) -> OrmResult<u64>
where
    C: GenericClient + Sync + ?Sized,
{
    let sql = PlaceholderStyle::Dollar.render(expr);
    client
        .execute(sql.as_str(), &params(expr))
        .await
        .map_err(OrmError::from_db_error)
}

/// A [`Driver`] over a borrowed or shared client/transaction.
///
/// ```ignore
/// let driver = PgDriver::new(&client);
/// let tx = client.transaction().await?;
/// let in_tx = PgDriver::new(&tx);
/// ```
#[derive(Debug, Clone)]
pub struct PgDriver<C> {
    client: C,
}

impl<C> PgDriver<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn into_inner(self) -> C {
        self.client
    }
}

impl<C> Driver for PgDriver<C>
where
    C: Deref + Send + Sync,
    C::Target: GenericClient + Sync,
{
    type Value = Value;

    async fn query(&self, expr: &SqlExpr<Value>) -> OrmResult<Vec<Row<Value>>> {
        query_with(&*self.client, expr).await
    }

    async fn execute(&self, expr: &SqlExpr<Value>) -> OrmResult<u64> {
        execute_with(&*self.client, expr).await
    }
}

/// A [`Driver`] that checks a connection out of a pool for each statement.
#[cfg(feature = "pool")]
#[derive(Clone)]
pub struct PgPoolDriver {
    pool: deadpool_postgres::Pool,
}

#[cfg(feature = "pool")]
impl PgPoolDriver {
    pub fn new(pool: deadpool_postgres::Pool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &deadpool_postgres::Pool {
        &self.pool
    }
}

#[cfg(feature = "pool")]
impl std::fmt::Debug for PgPoolDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgPoolDriver")
            .field("status", &self.pool.status())
            .finish()
    }
}

#[cfg(feature = "pool")]
impl Driver for PgPoolDriver {
    type Value = Value;

    async fn query(&self, expr: &SqlExpr<Value>) -> OrmResult<Vec<Row<Value>>> {
        let conn = self.pool.get().await?;
        let client: &tokio_postgres::Client = &conn;
        query_with(client, expr).await
    }

    async fn execute(&self, expr: &SqlExpr<Value>) -> OrmResult<u64> {
        let conn = self.pool.get().await?;
        let client: &tokio_postgres::Client = &conn;
        execute_with(client, expr).await
    }
}
