use super::SqlExpr;
use crate::value::Value;
use serde_json::Value as JsonValue;

/// One interpolated item of a SQL template.
#[derive(Debug, Clone, PartialEq)]
pub enum Fragment<V> {
    /// A bound value: renders as one placeholder and contributes one value.
    Value(V),
    /// A nested expression: its text and values are spliced in place.
    Expr(SqlExpr<V>),
    /// A name (table, column, alias) spliced verbatim. Contributes no value.
    Ident(String),
    /// Raw SQL text spliced verbatim. Contributes no value.
    ///
    /// Only use this for text the caller controls (keywords, operators,
    /// validated fragments); it is never escaped.
    Unsafe(String),
}

/// Identifier marker, see [`ident`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlIdent(pub String);

/// Raw-text marker, see [`unsafe_sql`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlUnsafe(pub String);

/// Mark a name for verbatim splicing (identifiers cannot be parameterized).
pub fn ident(name: impl Into<String>) -> SqlIdent {
    SqlIdent(name.into())
}

/// Mark raw SQL text for verbatim splicing.
pub fn unsafe_sql(text: impl Into<String>) -> SqlUnsafe {
    SqlUnsafe(text.into())
}

/// Bind any value convertible into the engine's value type.
pub fn bind<V, T: Into<V>>(value: T) -> Fragment<V> {
    Fragment::Value(value.into())
}

/// Conversion into a template [`Fragment`].
///
/// This is what lets [`sql!`](crate::sql!) accept scalars, nested expressions
/// and markers side by side.
pub trait IntoFragment<V> {
    fn into_fragment(self) -> Fragment<V>;
}

impl<V> IntoFragment<V> for Fragment<V> {
    fn into_fragment(self) -> Fragment<V> {
        self
    }
}

impl<V> IntoFragment<V> for SqlExpr<V> {
    fn into_fragment(self) -> Fragment<V> {
        Fragment::Expr(self)
    }
}

impl<V: Clone> IntoFragment<V> for &SqlExpr<V> {
    fn into_fragment(self) -> Fragment<V> {
        Fragment::Expr(self.clone())
    }
}

impl<V> IntoFragment<V> for SqlIdent {
    fn into_fragment(self) -> Fragment<V> {
        Fragment::Ident(self.0)
    }
}

impl<V> IntoFragment<V> for SqlUnsafe {
    fn into_fragment(self) -> Fragment<V> {
        Fragment::Unsafe(self.0)
    }
}

impl IntoFragment<Value> for Value {
    fn into_fragment(self) -> Fragment<Value> {
        Fragment::Value(self)
    }
}

impl IntoFragment<JsonValue> for JsonValue {
    fn into_fragment(self) -> Fragment<JsonValue> {
        Fragment::Value(self)
    }
}

impl<V, T> IntoFragment<V> for Option<T>
where
    V: From<Option<T>>,
{
    fn into_fragment(self) -> Fragment<V> {
        Fragment::Value(V::from(self))
    }
}

macro_rules! impl_scalar_fragment {
    ($($ty:ty),* $(,)?) => {
        $(
            impl<V: From<$ty>> IntoFragment<V> for $ty {
                fn into_fragment(self) -> Fragment<V> {
                    Fragment::Value(V::from(self))
                }
            }
        )*
    };
}

impl_scalar_fragment!(bool, i16, i32, i64, u16, u32, f32, f64, String);

impl<'a, V: From<&'a str>> IntoFragment<V> for &'a str {
    fn into_fragment(self) -> Fragment<V> {
        Fragment::Value(V::from(self))
    }
}
