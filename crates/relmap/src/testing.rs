//! Shared fixture for unit tests: a `test_table` entity exercising every
//! property shape (auto, literal column, multi-column, computed select with a
//! SQL-side write transform, custom converters, read-only).

use crate::error::{OrmError, OrmResult};
use crate::expr::{SqlExpr, ident};
use crate::mapping::{Column, ColumnDef, Mapping, MultiColumnDef, Naming, PropertyDef, ToDb};
use crate::row::{Row, RowExt, WriteRow, set_column};
use crate::sql;
use crate::value::Value;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Nested {
    pub nested_one: i64,
    pub nested_two: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Money {
    pub amount: i64,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestObj {
    pub obj_id: String,
    pub obj_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obj_optional: Option<String>,
    pub is_admin: bool,
    pub nested: Nested,
    pub money: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql_test: Option<String>,
    pub mapped_auto: i64,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

/// `TestObj` without its read-only properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestSave {
    pub obj_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obj_optional: Option<String>,
    pub is_admin: bool,
    pub nested: Nested,
    pub money: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql_test: Option<String>,
    pub mapped_auto: i64,
}

pub fn test_save_data() -> TestSave {
    TestSave {
        obj_name: "test".into(),
        obj_optional: None,
        is_admin: true,
        nested: Nested {
            nested_one: 1,
            nested_two: 2,
        },
        money: Money {
            amount: 100,
            currency: "EUR".into(),
        },
        sql_test: Some("TEST".into()),
        mapped_auto: 123,
    }
}

fn parse_i64(column: &str, value: &Value) -> OrmResult<i64> {
    match value {
        Value::Int(i) => Ok(*i),
        Value::Text(s) => s
            .parse()
            .map_err(|e: std::num::ParseIntError| OrmError::decode(column, e.to_string())),
        other => Err(OrmError::decode(column, format!("expected integer text, got {other:?}"))),
    }
}

pub fn test_mapping() -> Mapping<Value> {
    let upper_sql_test: SqlExpr<Value> = sql!("UPPER({})", ident("sql_test")).expect("select expression");

    Mapping::builder("test_table")
        .naming(Naming::SnakeCase)
        .auto("objId")
        .auto("objOptional")
        .auto("objName")
        .property("isAdmin", "is_admin")
        .property(
            "nested",
            MultiColumnDef::new(
                ["nested_one", "nested_two"],
                |row: &Row<Value>| -> OrmResult<Nested> {
                    Ok(Nested {
                        nested_one: row.get_as("nested_one")?,
                        nested_two: row.get_as("nested_two")?,
                    })
                },
                |row: &mut WriteRow<Value>, nested: Nested| -> OrmResult<()> {
                    set_column(row, "nested_one", nested.nested_one);
                    set_column(row, "nested_two", nested.nested_two);
                    Ok(())
                },
            ),
        )
        .property(
            "money",
            MultiColumnDef::new(
                ["money_amount", "money_currency"],
                |row: &Row<Value>| -> OrmResult<Money> {
                    Ok(Money {
                        amount: parse_i64("money_amount", row.column("money_amount")?)?,
                        currency: row.get_as("money_currency")?,
                    })
                },
                |row: &mut WriteRow<Value>, money: Money| -> OrmResult<()> {
                    set_column(row, "money_amount", money.amount.to_string());
                    set_column(row, "money_currency", money.currency);
                    Ok(())
                },
            ),
        )
        .property(
            "sqlTest",
            PropertyDef::single(Column::computed("sql_test", upper_sql_test))
                .from_db(|value: &Value| -> OrmResult<Option<String>> {
                    Ok(value.as_str().filter(|s| !s.is_empty()).map(str::to_string))
                })
                .to_db(|value: Option<String>| -> OrmResult<ToDb<Value>> {
                    Ok(match value {
                        Some(s) if !s.is_empty() => ToDb::Expr(sql!("LOWER({})", s)?),
                        _ => ToDb::Value(Value::Null),
                    })
                }),
        )
        .property(
            "mappedAuto",
            PropertyDef::single(ColumnDef::Auto)
                .from_db(|value: &Value| parse_i64("mapped_auto", value))
                .to_db(|value: i64| -> OrmResult<ToDb<Value>> { Ok(ToDb::value(value.to_string())) }),
        )
        .auto("created")
        .auto("updated")
        .read_only(["objId", "created", "updated"])
        .build()
        .expect("test mapping")
}
