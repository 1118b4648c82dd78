use super::*;
use crate::expr::unsafe_sql;
use crate::sql;
use crate::testing::{Money, Nested, TestObj, TestSave, test_mapping, test_save_data};
use crate::value::Value;
use chrono::{TimeZone, Utc};
use serde_json::json;

fn generator() -> SqlGenerator<Value> {
    SqlGenerator::new(Arc::new(test_mapping()))
}

fn one_eq_one() -> SqlExpr<Value> {
    sql!("1=1").unwrap()
}

fn saved_values() -> Vec<Value> {
    vec![
        Value::from("test"),
        Value::Bool(true),
        Value::Int(1),
        Value::Int(2),
        Value::from("100"),
        Value::from("EUR"),
        Value::from("TEST"),
        Value::from("123"),
    ]
}

fn db_row() -> Row<Value> {
    let created = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
    let mut row = Row::new();
    for (column, value) in [
        ("obj_id", Value::from("abc")),
        ("obj_name", Value::from("test")),
        ("is_admin", Value::Bool(true)),
        ("nested_one", Value::Int(1)),
        ("nested_two", Value::Int(2)),
        ("money_amount", Value::from("100")),
        ("money_currency", Value::from("EUR")),
        ("sql_test", Value::from("TEST")),
        ("mapped_auto", Value::from("123")),
        ("created", Value::Timestamp(created)),
        ("updated", Value::Timestamp(created)),
    ] {
        row.insert(column.to_string(), value);
    }
    row
}

#[test]
fn where_equal_single_column() {
    let expr = generator().where_equal_clause(&json!({"objId": "123"})).unwrap();
    assert_eq!(expr.text(), "obj_id=?");
    assert_eq!(expr.values(), &[Value::from("123")]);
}

#[test]
fn where_equal_multi_column() {
    let expr = generator()
        .where_equal_clause(&json!({"money": {"amount": 100, "currency": "EUR"}}))
        .unwrap();
    assert_eq!(expr.text(), "money_amount=? AND money_currency=?");
    assert_eq!(expr.values(), &[Value::from("100"), Value::from("EUR")]);
}

#[test]
fn where_equal_mixed_with_write_transform() {
    let expr = generator()
        .where_equal_clause(&json!({
            "sqlTest": "TEST",
            "money": {"amount": 100, "currency": "EUR"},
        }))
        .unwrap();
    assert_eq!(
        expr.text(),
        "money_amount=? AND money_currency=? AND sql_test=LOWER(?)"
    );
    assert_eq!(
        expr.values(),
        &[Value::from("100"), Value::from("EUR"), Value::from("TEST")]
    );
}

#[test]
fn where_equal_rejects_empty_and_unknown_input() {
    let err = generator().where_equal_clause(&json!({})).unwrap_err();
    assert!(matches!(err, OrmError::EmptyJoin));

    let err = generator().where_equal_clause(&json!({"bogus": 1})).unwrap_err();
    assert!(matches!(err, OrmError::UnknownProperty { ref property, .. } if property == "bogus"));

    let err = generator().where_equal_clause(&json!([1, 2])).unwrap_err();
    assert!(matches!(err, OrmError::Serialization(_)));
}

#[test]
fn where_any_equal_parenthesizes_groups() {
    let generator = generator();
    let single = generator
        .where_any_equal_clause(&[json!({"objId": "a"})])
        .unwrap();
    assert_eq!(single.text(), "obj_id=?");

    let many = generator
        .where_any_equal_clause(&[json!({"objId": "a"}), json!({"objId": "b", "isAdmin": true})])
        .unwrap();
    assert_eq!(many.text(), "(obj_id=?) OR (obj_id=? AND is_admin=?)");
    assert_eq!(
        many.values(),
        &[Value::from("a"), Value::from("b"), Value::Bool(true)]
    );

    let err = generator
        .where_any_equal_clause::<serde_json::Value>(&[])
        .unwrap_err();
    assert!(matches!(err, OrmError::EmptyJoin));
}

#[test]
fn simple_select() {
    let expr = generator().select_statement(Some(&["objId"]), None).unwrap();
    assert_eq!(expr.text(), "SELECT obj_id FROM test_table");
    assert!(expr.values().is_empty());
}

#[test]
fn select_with_where() {
    let expr = generator()
        .select_statement(Some(&["objId"]), Some(sql!("1={}", 1_i64).unwrap()))
        .unwrap();
    assert_eq!(expr.text(), "SELECT obj_id FROM test_table WHERE 1=?");
    assert_eq!(expr.values(), &[Value::Int(1)]);
}

#[test]
fn multi_column_select_uses_select_expressions() {
    let expr = generator()
        .select_statement(Some(&["objId", "money", "sqlTest"]), None)
        .unwrap();
    assert_eq!(
        expr.text(),
        "SELECT obj_id, money_amount, money_currency, UPPER(sql_test) AS sql_test FROM test_table"
    );
    assert!(expr.values().is_empty());
}

#[test]
fn select_all_lists_every_column_in_declaration_order() {
    let expr = generator().select_statement(None, None).unwrap();
    assert_eq!(
        expr.text(),
        "SELECT obj_id, obj_optional, obj_name, is_admin, nested_one, nested_two, \
         money_amount, money_currency, UPPER(sql_test) AS sql_test, mapped_auto, \
         created, updated FROM test_table"
    );
}

#[test]
fn select_unknown_property_fails() {
    let err = generator()
        .select_statement(Some(&["objId", "bogus"]), None)
        .unwrap_err();
    assert!(matches!(err, OrmError::UnknownProperty { .. }));
}

#[test]
fn simple_delete() {
    let expr = generator().delete_statement(sql!("1={}", 1_i64).unwrap());
    assert_eq!(expr.text(), "DELETE FROM test_table WHERE 1=?");
    assert_eq!(expr.values(), &[Value::Int(1)]);
}

#[test]
fn insert_skips_absent_and_read_only_properties() {
    let expr = generator().insert_statement(&test_save_data()).unwrap();
    assert_eq!(
        expr.text(),
        "INSERT INTO test_table \
         (obj_name, is_admin, nested_one, nested_two, money_amount, money_currency, sql_test, mapped_auto) \
         VALUES (?, ?, ?, ?, ?, ?, LOWER(?), ?)"
    );
    assert_eq!(expr.values(), saved_values().as_slice());
}

#[test]
fn read_only_keys_in_save_data_are_ignored() {
    let mut record = to_record(&test_save_data()).unwrap();
    record.insert("objId".into(), json!("should-not-appear"));
    record.insert("created".into(), json!("2024-01-01T00:00:00Z"));

    let insert = generator().insert_record(&record).unwrap();
    assert!(!insert.text().contains("obj_id"));
    assert!(!insert.text().contains("created"));
    assert_eq!(insert.values(), saved_values().as_slice());

    let update = generator().update_record(&record, one_eq_one()).unwrap();
    assert!(!update.text().contains("obj_id"));
    assert_eq!(update.values(), saved_values().as_slice());
}

#[test]
fn partial_update() {
    let expr = generator()
        .update_statement(&json!({"objName": "updatedName"}), sql!("1={}", 1_i64).unwrap())
        .unwrap();
    assert_eq!(expr.text(), "UPDATE test_table SET obj_name=? WHERE 1=?");
    assert_eq!(expr.values(), &[Value::from("updatedName"), Value::Int(1)]);
}

#[test]
fn full_update() {
    let expr = generator()
        .update_statement(&test_save_data(), one_eq_one())
        .unwrap();
    assert_eq!(
        expr.text(),
        "UPDATE test_table SET \
         obj_name=?, is_admin=?, nested_one=?, nested_two=?, money_amount=?, \
         money_currency=?, sql_test=LOWER(?), mapped_auto=? \
         WHERE 1=1"
    );
    assert_eq!(expr.values(), saved_values().as_slice());
}

#[test]
fn update_of_read_only_only_has_nothing_to_set() {
    let err = generator()
        .update_statement(&json!({"objId": "x"}), one_eq_one())
        .unwrap_err();
    assert!(matches!(err, OrmError::EmptyJoin));
}

#[test]
fn count_order_and_page() {
    let generator = generator();

    let count = generator.count_statement(None);
    assert_eq!(count.text(), "SELECT COUNT(*) AS count FROM test_table");

    let order = generator.order_by_clause("money", SortOrder::Desc).unwrap();
    assert_eq!(order.text(), "money_amount DESC, money_currency DESC");

    let page = generator
        .page_statement(
            Some(&["objId"]),
            Some(sql!("is_admin={}", true).unwrap()),
            Some(generator.order_by_clause("objName", SortOrder::Asc).unwrap()),
            10,
            20,
        )
        .unwrap();
    assert_eq!(
        page.text(),
        "SELECT obj_id FROM test_table WHERE is_admin=? ORDER BY obj_name ASC LIMIT ? OFFSET ?"
    );
    assert_eq!(
        page.values(),
        &[Value::Bool(true), Value::Int(10), Value::Int(20)]
    );
}

#[test]
fn page_limit_beyond_i64_is_rejected() {
    let err = generator()
        .page_statement(None, None, None, u64::MAX, 0)
        .unwrap_err();
    assert!(matches!(err, OrmError::Serialization(_)), "{err}");
}

#[test]
fn from_row_builds_the_entity() {
    let obj: TestObj = generator().from_row(&db_row()).unwrap();
    assert_eq!(obj.obj_id, "abc");
    assert_eq!(obj.obj_optional, None);
    assert_eq!(
        obj.nested,
        Nested {
            nested_one: 1,
            nested_two: 2
        }
    );
    assert_eq!(
        obj.money,
        Money {
            amount: 100,
            currency: "EUR".into()
        }
    );
    assert_eq!(obj.mapped_auto, 123);
    assert_eq!(obj.sql_test.as_deref(), Some("TEST"));
}

#[test]
fn from_row_omits_properties_without_columns() {
    let mut row = Row::new();
    row.insert("obj_id".to_string(), Value::from("abc"));
    let record = generator().from_row_record(&row).unwrap();
    assert_eq!(record.len(), 1);
    assert_eq!(record["objId"], json!("abc"));
}

#[test]
fn from_row_rejects_partially_present_multi_column() {
    let mut row = Row::new();
    row.insert("money_amount".to_string(), Value::from("100"));
    let err = generator().from_row_record(&row).unwrap_err();
    assert!(matches!(
        err,
        OrmError::MissingColumn { ref property, ref column } if property == "money" && column == "money_currency"
    ));
}

#[test]
fn apply_without_all_columns_is_missing_column() {
    let mapping = Mapping::<Value>::builder("t")
        .property(
            "pair",
            crate::mapping::MultiColumnDef::raw(
                ["a", "b"],
                |_row: &Row<Value>| Ok(JsonValue::Null),
                |row: &mut WriteRow<Value>, _value: &JsonValue| {
                    crate::row::set_column(row, "a", 1_i64);
                    Ok(())
                },
            ),
        )
        .build()
        .unwrap();
    let err = SqlGenerator::new(Arc::new(mapping))
        .insert_statement(&json!({"pair": 1}))
        .unwrap_err();
    assert!(matches!(err, OrmError::MissingColumn { ref column, .. } if column == "b"));
}

#[test]
fn round_trip_through_row() {
    let generator = generator();
    let save = test_save_data();

    // Simulate the database echoing written values back through plain columns.
    let written = generator.to_row(&save).unwrap();
    let mut row = Row::new();
    for (column, expr) in written {
        if column == "sql_test" {
            continue;
        }
        assert_eq!(expr.values().len(), 1, "{column}");
        row.insert(column, expr.values()[0].clone());
    }

    let record = generator.from_row_record(&row).unwrap();
    let back: TestSave = serde_json::from_value(JsonValue::Object(record)).unwrap();
    assert_eq!(
        back,
        TestSave {
            sql_test: None,
            ..save
        }
    );
}

#[test]
fn lossy_write_transform_is_one_way() {
    let generator = generator();

    // Written as LOWER(?), read back through UPPER(sql_test): the property
    // survives only when it was already upper case.
    let written = generator.to_row(&json!({"sqlTest": "Mixed"})).unwrap();
    assert_eq!(written["sql_test"].text(), "LOWER(?)");

    let mut row = Row::new();
    row.insert("sql_test".to_string(), Value::from("MIXED"));
    let record = generator.from_row_record(&row).unwrap();
    assert_eq!(record["sqlTest"], json!("MIXED"));
    assert_ne!(record["sqlTest"], json!("Mixed"));
}

#[test]
fn generation_is_deterministic() {
    let a = generator().insert_statement(&test_save_data()).unwrap();
    let b = generator().insert_statement(&test_save_data()).unwrap();
    assert_eq!(a, b);

    let w1 = generator()
        .where_equal_clause(&json!({"isAdmin": true, "objName": "x", "objId": "1"}))
        .unwrap();
    let w2 = generator()
        .where_equal_clause(&json!({"objId": "1", "objName": "x", "isAdmin": true}))
        .unwrap();
    assert_eq!(w1.text(), "obj_id=? AND obj_name=? AND is_admin=?");
    assert_eq!(w1, w2);
}

#[test]
fn statements_keep_placeholders_aligned() {
    let generator = generator();
    let where_clause = sql!("{} = {}", unsafe_sql("obj_name"), "x").unwrap();
    for expr in [
        generator.insert_statement(&test_save_data()).unwrap(),
        generator
            .update_statement(&test_save_data(), where_clause.clone())
            .unwrap(),
        generator.select_statement(None, Some(where_clause.clone())).unwrap(),
        generator.delete_statement(where_clause),
    ] {
        assert_eq!(expr.text().matches('?').count(), expr.values().len());
        assert_eq!(expr.placeholder_count(), expr.values().len());
    }
}
