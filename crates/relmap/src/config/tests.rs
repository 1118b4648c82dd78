use super::*;
use crate::generator::SqlGenerator;
use crate::mapping::ToDb;
use crate::row::{RowExt, set_column};
use crate::sql;
use crate::testing::{Money, test_save_data};
use crate::value::Value;
use std::sync::Arc;

const TEST_TABLE: &str = r#"
table = "test_table"
naming = "snake_case"
read_only = ["objId", "created", "updated"]

[properties]
objId = "@auto"
objOptional = "@auto"
objName = "@auto"
isAdmin = "is_admin"
nested = { columns = ["nested_one", "nested_two"], codec = "nested" }
money = { columns = ["money_amount", "money_currency"], codec = "money" }
sqlTest = { column = "sql_test", select = "UPPER(sql_test)", codec = "lower_on_write" }
mappedAuto = { column = "@auto", codec = "bigint_text" }
created = "@auto"
updated = "@auto"
"#;

fn codecs() -> CodecRegistry<Value> {
    CodecRegistry::new()
        .multi(
            "nested",
            |row: &Row<Value>| -> OrmResult<crate::testing::Nested> {
                Ok(crate::testing::Nested {
                    nested_one: row.get_as("nested_one")?,
                    nested_two: row.get_as("nested_two")?,
                })
            },
            |row: &mut WriteRow<Value>, nested: crate::testing::Nested| -> OrmResult<()> {
                set_column(row, "nested_one", nested.nested_one);
                set_column(row, "nested_two", nested.nested_two);
                Ok(())
            },
        )
        .multi(
            "money",
            |row: &Row<Value>| -> OrmResult<Money> {
                let amount: String = row.get_as("money_amount")?;
                Ok(Money {
                    amount: amount
                        .parse()
                        .map_err(|_| OrmError::decode("money_amount", "not an integer"))?,
                    currency: row.get_as("money_currency")?,
                })
            },
            |row: &mut WriteRow<Value>, money: Money| -> OrmResult<()> {
                set_column(row, "money_amount", money.amount.to_string());
                set_column(row, "money_currency", money.currency);
                Ok(())
            },
        )
        .single(
            "lower_on_write",
            PropertyDef::single(ColumnDef::Auto).to_db(|v: Option<String>| -> OrmResult<ToDb<Value>> {
                Ok(match v {
                    Some(s) => ToDb::Expr(sql!("LOWER({})", s)?),
                    None => ToDb::Value(Value::Null),
                })
            }),
        )
        .single(
            "bigint_text",
            PropertyDef::single(ColumnDef::Auto)
                .from_db(|v: &Value| -> OrmResult<i64> {
                    v.as_str()
                        .and_then(|s| s.parse().ok())
                        .ok_or_else(|| OrmError::decode("mapped_auto", "not an integer"))
                })
                .to_db(|v: i64| -> OrmResult<ToDb<Value>> { Ok(ToDb::value(v.to_string())) }),
        )
}

fn load(toml: &str) -> OrmResult<Mapping<Value>> {
    MappingFile::from_toml_str(toml)?.into_mapping(&codecs())
}

#[test]
fn file_mapping_generates_the_same_sql_as_code() {
    let mapping = load(TEST_TABLE).unwrap();
    let generator = SqlGenerator::new(Arc::new(mapping));

    let insert = generator.insert_statement(&test_save_data()).unwrap();
    assert_eq!(
        insert.text(),
        "INSERT INTO test_table \
         (obj_name, is_admin, nested_one, nested_two, money_amount, money_currency, sql_test, mapped_auto) \
         VALUES (?, ?, ?, ?, ?, ?, LOWER(?), ?)"
    );

    let select = generator
        .select_statement(Some(&["objId", "money", "sqlTest"]), None)
        .unwrap();
    assert_eq!(
        select.text(),
        "SELECT obj_id, money_amount, money_currency, UPPER(sql_test) AS sql_test FROM test_table"
    );
}

#[test]
fn properties_keep_document_order() {
    let file = MappingFile::from_toml_str(TEST_TABLE).unwrap();
    let names: Vec<String> = file
        .property_specs()
        .unwrap()
        .into_iter()
        .map(|(name, _)| name)
        .collect();
    assert_eq!(names.first().map(String::as_str), Some("objId"));
    assert_eq!(names.last().map(String::as_str), Some("updated"));
    assert_eq!(names.len(), 10);
}

#[test]
fn spec_shapes_parse() {
    let file = MappingFile::from_toml_str(TEST_TABLE).unwrap();
    let specs: HashMap<String, PropertySpec> = file.property_specs().unwrap().into_iter().collect();
    assert_eq!(specs["objId"], PropertySpec::Column(AUTO.into()));
    assert_eq!(specs["isAdmin"], PropertySpec::Column("is_admin".into()));
    assert_eq!(
        specs["sqlTest"],
        PropertySpec::Single(SingleSpec {
            column: "sql_test".into(),
            select: Some("UPPER(sql_test)".into()),
            codec: Some("lower_on_write".into()),
        })
    );
    assert_eq!(
        specs["money"],
        PropertySpec::Multi(MultiSpec {
            columns: vec!["money_amount".into(), "money_currency".into()],
            codec: "money".into(),
        })
    );
}

#[test]
fn unrecognized_shapes_are_config_errors() {
    for body in [
        "x = 5",
        r#"x = ["a", "b"]"#,
        r#"x = { column = "a", columns = ["a", "b"], codec = "money" }"#,
        r#"x = { codec = "money" }"#,
        r#"x = { column = "a", colour = "red" }"#,
    ] {
        let toml = format!("table = \"t\"\n[properties]\n{body}\n");
        let err = load(&toml).unwrap_err();
        assert!(err.is_config(), "{body}: {err}");
    }
}

#[test]
fn misspelled_key_is_named_in_the_error() {
    let toml = r#"
table = "t"
[properties]
a = { column = "a", selct = "UPPER(a)" }
"#;
    let err = load(toml).unwrap_err();
    let message = err.to_string();
    assert!(err.is_config());
    assert!(message.contains("selct"), "{message}");
    assert!(message.contains("'a'"), "{message}");
    assert!(message.contains("table 't'"), "{message}");
}

#[test]
fn unknown_codec_is_a_config_error() {
    let toml = r#"
table = "t"
[properties]
a = { column = "a", codec = "nope" }
"#;
    let err = load(toml).unwrap_err();
    assert!(err.is_config());
    assert!(err.to_string().contains("nope"));

    // Multi-column codecs are not usable as single-column ones.
    let toml = r#"
table = "t"
[properties]
a = { column = "a", codec = "money" }
"#;
    assert!(load(toml).unwrap_err().is_config());
}

#[test]
fn read_only_must_name_a_property() {
    let toml = r#"
table = "t"
read_only = ["missing"]
[properties]
a = "@auto"
"#;
    assert!(load(toml).unwrap_err().is_config());
}

#[test]
fn select_with_placeholder_is_rejected() {
    let toml = r#"
table = "t"
[properties]
a = { column = "a", select = "COALESCE(a, ?)" }
"#;
    let err = load(toml).unwrap_err();
    assert!(matches!(err, OrmError::PlaceholderInLiteral(_)));
}

#[test]
fn malformed_toml_is_a_config_error() {
    let err = MappingFile::from_toml_str("table = ").unwrap_err();
    assert!(err.is_config());

    let err = MappingFile::from_toml_str("table = \"t\"\nextra = 1\n").unwrap_err();
    assert!(err.is_config());
}

#[test]
fn load_reads_from_disk() {
    let path = std::env::temp_dir().join(format!("relmap-config-{}.toml", std::process::id()));
    std::fs::write(&path, TEST_TABLE).unwrap();
    let file = MappingFile::load(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert_eq!(file.table, "test_table");
    assert_eq!(file.naming, Naming::SnakeCase);

    let err = MappingFile::load(&path).unwrap_err();
    assert!(matches!(err, OrmError::Io(_)));
}
