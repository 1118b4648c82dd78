//! Database scalar values.
//!
//! The mapping and generator layers are generic over the engine's scalar type
//! through [`DbValue`]. [`Value`] is an engine-neutral default that the bundled
//! Postgres adapter understands; `serde_json::Value` also implements the trait
//! for engines that hand back JSON-shaped rows.

use crate::error::{OrmError, OrmResult};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value as JsonValue;
use std::fmt::Debug;
use uuid::Uuid;

/// A scalar value as stored in (or read from) a database row.
///
/// Application properties are carried as JSON values (see
/// [`Record`](crate::row::Record)); a `DbValue` defines the identity
/// conversion used by properties that do not declare custom converters.
pub trait DbValue: Clone + Debug + Send + Sync + 'static {
    /// Convert a property value into a database value unchanged.
    fn from_property(value: &JsonValue) -> OrmResult<Self>;

    /// Convert a database value back into a property value unchanged.
    fn to_property(&self) -> OrmResult<JsonValue>;
}

/// Engine-neutral scalar value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    /// Structured value (object/array), stored as JSON by engines that can.
    Json(JsonValue),
    Uuid(Uuid),
    Timestamp(DateTime<Utc>),
    /// Timestamp without time zone.
    NaiveTimestamp(NaiveDateTime),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl DbValue for Value {
    fn from_property(value: &JsonValue) -> OrmResult<Self> {
        Ok(match value {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Bool(*b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None if n.is_u64() => {
                    return Err(OrmError::Serialization(format!(
                        "integer {n} is out of range for a 64-bit signed value"
                    )));
                }
                None => Value::Float(n.as_f64().ok_or_else(|| {
                    OrmError::Serialization(format!("number {n} is not representable"))
                })?),
            },
            JsonValue::String(s) => Value::Text(s.clone()),
            JsonValue::Array(_) | JsonValue::Object(_) => Value::Json(value.clone()),
        })
    }

    fn to_property(&self) -> OrmResult<JsonValue> {
        Ok(match self {
            Value::Null => JsonValue::Null,
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::Int(i) => JsonValue::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(JsonValue::Number)
                .ok_or_else(|| OrmError::Serialization(format!("float {f} has no JSON form")))?,
            Value::Text(s) => JsonValue::String(s.clone()),
            Value::Json(j) => j.clone(),
            // Same textual form serde gives these types on the entity side.
            Value::Uuid(u) => serde_json::to_value(u)?,
            Value::Timestamp(t) => serde_json::to_value(t)?,
            Value::NaiveTimestamp(t) => serde_json::to_value(t)?,
        })
    }
}

impl DbValue for JsonValue {
    fn from_property(value: &JsonValue) -> OrmResult<Self> {
        Ok(value.clone())
    }

    fn to_property(&self) -> OrmResult<JsonValue> {
        Ok(self.clone())
    }
}

macro_rules! impl_value_from {
    ($($ty:ty => $variant:ident as $conv:ty),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(<$conv>::from(v))
                }
            }
        )*
    };
}

impl_value_from! {
    bool => Bool as bool,
    i16 => Int as i64,
    i32 => Int as i64,
    i64 => Int as i64,
    u16 => Int as i64,
    u32 => Int as i64,
    f32 => Float as f64,
    f64 => Float as f64,
    String => Text as String,
    &str => Text as String,
    Uuid => Uuid as Uuid,
    DateTime<Utc> => Timestamp as DateTime<Utc>,
    NaiveDateTime => NaiveTimestamp as NaiveDateTime,
}

impl<T> From<Option<T>> for Value
where
    Value: From<T>,
{
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Value::from)
    }
}
