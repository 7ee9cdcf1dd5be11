// Test module - relaxed lint rules
#![allow(clippy::indexing_slicing)]
#![allow(clippy::panic)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(missing_docs)]

//! Printing and parsing of snapshot literals.

use inlay::codec::MARKER;
use inlay::literal::{parse_source, serialize, Serializer};
use inlay::model::{FormattingProfile, QuoteChar, Value};
use inlay::ErrorCode;

fn profile() -> FormattingProfile {
    FormattingProfile::default()
}

fn single_quoted() -> FormattingProfile {
    FormattingProfile {
        quote: QuoteChar::Single,
        ..FormattingProfile::default()
    }
}

fn user() -> Value {
    Value::object([
        ("id", Value::Number(1.0)),
        ("name", Value::string("Ada")),
    ])
}

#[test]
fn short_object_prints_on_one_line() {
    assert_eq!(serialize(&user(), &profile()).unwrap(), r#"{ id: 1, name: "Ada" }"#);
}

#[test]
fn short_array_prints_on_one_line() {
    let value = Value::Array(vec![Value::Number(1.0), Value::Number(2.5), Value::Null]);
    assert_eq!(serialize(&value, &profile()).unwrap(), "[1, 2.5, null]");
}

#[test]
fn empty_containers_print_compact() {
    assert_eq!(serialize(&Value::Array(vec![]), &profile()).unwrap(), "[]");
    assert_eq!(
        serialize(&Value::Object(indexmap::IndexMap::new()), &profile()).unwrap(),
        "{}"
    );
}

#[test]
fn wide_object_breaks_with_trailing_commas() {
    let narrow = FormattingProfile {
        print_width: 20,
        ..FormattingProfile::default()
    };
    let value = Value::object([
        ("id", Value::Number(1.0)),
        ("name", Value::string("Ada Lovelace")),
    ]);
    assert_eq!(
        serialize(&value, &narrow).unwrap(),
        "{\n  id: 1,\n  name: \"Ada Lovelace\",\n}"
    );
}

#[test]
fn broken_layout_uses_profile_indent_and_base_indent() {
    let profile = FormattingProfile {
        indent_unit: "\t".to_string(),
        print_width: 10,
        ..FormattingProfile::default()
    };
    let value = Value::object([("list", Value::Array(vec![Value::string("alpha"), Value::string("beta")]))]);
    let text = Serializer::new(&profile)
        .with_base_indent("\t")
        .serialize(&value)
        .unwrap()
        .decode();
    assert_eq!(
        text,
        "{\n\t\tlist: [\n\t\t\t\"alpha\",\n\t\t\t\"beta\",\n\t\t],\n\t}"
    );
}

#[test]
fn multiline_string_becomes_indented_template() {
    let text = Serializer::new(&profile())
        .with_base_indent("  ")
        .serialize(&Value::string("line one\n\nline two"))
        .unwrap()
        .decode();
    assert_eq!(text, "`\n    line one\n\n    line two\n  `");
}

#[test]
fn multiline_string_forces_parent_to_break() {
    let value = Value::object([("text", Value::string("a\nb"))]);
    assert_eq!(
        serialize(&value, &profile()).unwrap(),
        "{\n  text: `\n    a\n    b\n  `,\n}"
    );
}

#[test]
fn template_escapes_backticks_and_interpolation() {
    let printed = serialize(&Value::string("run `x`\ncost ${total}"), &profile()).unwrap();
    assert_eq!(printed, "`\n  run \\`x\\`\n  cost \\${total}\n`");
    assert_eq!(
        parse_source(&printed, QuoteChar::Double).unwrap(),
        Value::string("run `x`\ncost ${total}")
    );
}

#[test]
fn keys_are_quoted_only_when_needed() {
    let value = Value::object([
        ("plain", Value::Bool(true)),
        ("with-dash", Value::Bool(false)),
        ("$ok_1", Value::Null),
    ]);
    assert_eq!(
        serialize(&value, &profile()).unwrap(),
        r#"{ plain: true, "with-dash": false, $ok_1: null }"#
    );
    assert_eq!(
        serialize(&value, &single_quoted()).unwrap(),
        "{ plain: true, 'with-dash': false, $ok_1: null }"
    );
}

#[test]
fn single_quote_profile_escapes_single_quotes() {
    assert_eq!(
        serialize(&Value::string("it's"), &single_quoted()).unwrap(),
        r"'it\'s'"
    );
}

#[test]
fn special_values_use_source_spelling() {
    let value = Value::Array(vec![
        Value::Undefined,
        Value::Number(f64::NAN),
        Value::Number(f64::NEG_INFINITY),
        Value::Number(-0.0),
        Value::Number(1e21),
    ]);
    assert_eq!(
        serialize(&value, &profile()).unwrap(),
        "[undefined, NaN, -Infinity, -0, 1e21]"
    );
}

#[test]
fn matchers_print_as_their_source() {
    let value = Value::object([
        ("id", Value::matcher("expect.any(Number)")),
        ("name", Value::string("Ada")),
    ]);
    assert_eq!(
        serialize(&value, &profile()).unwrap(),
        r#"{ id: expect.any(Number), name: "Ada" }"#
    );
}

#[test]
fn marker_in_runtime_string_is_rejected() {
    let value = Value::Array(vec![Value::string(format!("{MARKER}aGk="))]);
    let err = serialize(&value, &profile()).unwrap_err();
    assert_eq!(err.code, ErrorCode::MarkerCollision);
}

#[test]
fn parse_accepts_js_object_literal_syntax() {
    let text = r#"{
        // leading comment
        id: 0x10,
        'quoted key': "two",
        list: [1, 2,],
        missing: undefined, /* block */
        ratio: -Infinity,
      }"#;
    let parsed = parse_source(text, QuoteChar::Double).unwrap();
    let expected = Value::object([
        ("id", Value::Number(16.0)),
        ("quoted key", Value::string("two")),
        ("list", Value::Array(vec![Value::Number(1.0), Value::Number(2.0)])),
        ("missing", Value::Undefined),
        ("ratio", Value::Number(f64::NEG_INFINITY)),
    ]);
    assert_eq!(parsed, expected);
}

#[test]
fn parse_keeps_opaque_expressions_as_matchers() {
    let parsed = parse_source(
        "{ id: expect.any(Number), tags: expect.arrayContaining(['a']) }",
        QuoteChar::Double,
    )
    .unwrap();
    assert_eq!(
        parsed,
        Value::object([
            ("id", Value::matcher("expect.any(Number)")),
            ("tags", Value::matcher("expect.arrayContaining(['a'])")),
        ])
    );
}

#[test]
fn parse_treats_interpolated_template_as_opaque() {
    let parsed = parse_source("`hello ${name}`", QuoteChar::Double).unwrap();
    assert_eq!(parsed, Value::matcher("`hello ${name}`"));
}

#[test]
fn parse_reports_offset_of_syntax_error() {
    let err = parse_source("{ a: 1", QuoteChar::Double).unwrap_err();
    assert_eq!(err.code, ErrorCode::Parse);
    assert!(err.context.unwrap().get("offset").is_some());
}

#[test]
fn printed_output_is_a_fixed_point() {
    let values = [
        user(),
        Value::object([
            ("text", Value::string("first\n  indented\nlast")),
            ("nested", Value::object([("items", Value::Array(vec![Value::Number(1.0), Value::Undefined]))])),
            ("any", Value::matcher("expect.any(String)")),
        ]),
        Value::string("tab\there \"quoted\""),
    ];
    for value in values {
        let first = serialize(&value, &profile()).unwrap();
        let reparsed = parse_source(&first, QuoteChar::Double).unwrap();
        let second = serialize(&reparsed, &profile()).unwrap();
        assert_eq!(first, second, "serializer is not idempotent for {first}");
    }
}

#[test]
fn template_round_trip_recovers_string() {
    let value = Value::string("first\n  indented\n\nlast");
    let printed = Serializer::new(&profile())
        .with_base_indent("    ")
        .serialize(&value)
        .unwrap()
        .decode();
    assert_eq!(parse_source(&printed, QuoteChar::Double).unwrap(), value);
}

#[test]
fn crlf_template_content_parses_as_lf() {
    let parsed = parse_source("`\r\n  a\r\n  b\r\n`", QuoteChar::Double).unwrap();
    assert_eq!(parsed, Value::string("a\nb"));
}
