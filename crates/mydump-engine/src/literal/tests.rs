use super::*;
use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use rstest::rstest;

fn text(value: &Value) -> String {
    String::from_utf8(literal(value)).unwrap()
}

#[rstest]
#[case(Value::Null, "NULL")]
#[case(Value::Bool(true), "1")]
#[case(Value::Bool(false), "0")]
#[case(Value::Int64(-7), "-7")]
#[case(Value::UInt64(u64::MAX), "18446744073709551615")]
#[case(Value::Float64(1.5), "1.5")]
#[case(Value::Float64(1e21), "1000000000000000000000")]
#[case(Value::Float64(0.000001), "0.000001")]
#[case(Value::String("John".into()), "'John'")]
#[case(Value::Other("0000-00-00".into()), "'0000-00-00'")]
#[case(Value::Bytes(Vec::new()), "NULL")]
fn test_literals(#[case] value: Value, #[case] expected: &str) {
    assert_eq!(text(&value), expected);
}

#[test]
fn test_string_escaping() {
    let value = Value::String("a\0b'c\"d\u{8}e\nf\rg\u{1a}h\\i\tj".into());
    assert_eq!(text(&value), r#"'a\0b\'c\"d\be\nf\rg\Zh\\i	j'"#);
}

#[test]
fn test_binary_literal_keeps_raw_bytes() {
    let value = Value::Bytes(vec![0xff, b'\'', 0x00, 0x80]);
    let mut expected = b"_binary '".to_vec();
    expected.extend_from_slice(&[0xff, b'\\', b'\'', b'\\', b'0', 0x80, b'\'']);
    assert_eq!(literal(&value), expected);
}

#[test]
fn test_temporal_literals() {
    let date = NaiveDate::from_ymd_opt(2023, 1, 9).unwrap();
    assert_eq!(text(&Value::Date(date)), "'2023-01-09'");

    let datetime = date.and_hms_milli_opt(7, 8, 9, 500).unwrap();
    assert_eq!(text(&Value::DateTime(datetime)), "'2023-01-09 07:08:09'");
}

#[test]
fn test_render_row() {
    let row = render_row(&[
        Value::Int64(1),
        Value::String("John".into()),
        Value::Null,
    ]);
    assert_eq!(String::from_utf8(row).unwrap(), "(1,'John',NULL)");
}

#[test]
fn test_quote_identifier() {
    assert_eq!(quote_identifier("t1"), "`t1`");
    assert_eq!(quote_identifier("we`ird"), "`we``ird`");
}
