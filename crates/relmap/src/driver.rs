//! The contract between the generic layers and a database engine.

use crate::error::OrmResult;
use crate::expr::SqlExpr;
use crate::row::Row;
use crate::value::DbValue;
use std::future::Future;

/// Executes parameterized expressions against one database engine.
///
/// An implementation receives expressions in the neutral `?` form and is
/// responsible for rendering them in its engine's parameter syntax (see
/// [`PlaceholderStyle`](crate::PlaceholderStyle)), binding the values in order
/// and decoding result rows into column-name keyed [`Row`]s.
///
/// Connections, pools, transactions and timeouts are entirely the
/// implementation's concern.
pub trait Driver: Send + Sync {
    /// The engine's scalar type.
    type Value: DbValue;

    /// Run a statement that returns rows.
    fn query(
        &self,
        expr: &SqlExpr<Self::Value>,
    ) -> impl Future<Output = OrmResult<Vec<Row<Self::Value>>>> + Send;

    /// Run a statement and return the number of affected rows.
    fn execute(&self, expr: &SqlExpr<Self::Value>) -> impl Future<Output = OrmResult<u64>> + Send;

    /// Run a statement and return its first row, if any.
    fn query_opt(
        &self,
        expr: &SqlExpr<Self::Value>,
    ) -> impl Future<Output = OrmResult<Option<Row<Self::Value>>>> + Send {
        async move { Ok(self.query(expr).await?.into_iter().next()) }
    }
}

impl<D: Driver> Driver for &D {
    type Value = D::Value;

    fn query(
        &self,
        expr: &SqlExpr<Self::Value>,
    ) -> impl Future<Output = OrmResult<Vec<Row<Self::Value>>>> + Send {
        (**self).query(expr)
    }

    fn execute(&self, expr: &SqlExpr<Self::Value>) -> impl Future<Output = OrmResult<u64>> + Send {
        (**self).execute(expr)
    }

    fn query_opt(
        &self,
        expr: &SqlExpr<Self::Value>,
    ) -> impl Future<Output = OrmResult<Option<Row<Self::Value>>>> + Send {
        (**self).query_opt(expr)
    }
}
