// Test module - relaxed lint rules
#![allow(clippy::indexing_slicing)]
#![allow(clippy::panic)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(missing_docs)]

//! Comparison of runtime values against existing snapshot text.

use inlay::literal::{PrintContext, Printer};
use inlay::model::{FormattingProfile, Value};
use inlay::planner::{plan, plan_with, preserve_matchers, values_match, Plan, PlanInput, Rewrite};
use inlay::ErrorCode;

fn profile() -> FormattingProfile {
    FormattingProfile::default()
}

fn user(id: f64, name: &str) -> Value {
    Value::object([("id", Value::Number(id)), ("name", Value::string(name))])
}

fn rewrite(plan: Plan) -> Rewrite {
    match plan {
        Plan::Replace(rewrite) => rewrite,
        Plan::Matches => panic!("expected a rewrite, got a match"),
    }
}

fn assert_matches(actual: &Value, existing: &str) {
    let result = plan(actual, Some(existing), &profile()).unwrap();
    assert_eq!(result, Plan::Matches, "expected {existing} to match");
}

#[test]
fn missing_snapshot_is_written_fresh() {
    let result = rewrite(plan(&user(1.0, "Ada"), None, &profile()).unwrap());
    assert_eq!(result.text, r#"{ id: 1, name: "Ada" }"#);
    assert_eq!(result.previous, None);
    assert!(result.dropped.is_empty());
}

#[test]
fn blank_snapshot_counts_as_missing() {
    let result = rewrite(plan(&Value::Bool(true), Some("  \n "), &profile()).unwrap());
    assert_eq!(result.text, "true");
    assert_eq!(result.previous, None);
}

#[test]
fn key_order_and_quote_style_do_not_matter() {
    assert_matches(&user(1.0, "Ada"), "{ name: 'Ada', id: 1 }");
    assert_matches(&user(1.0, "Ada"), "{\n  \"id\": 1,\n  \"name\": \"Ada\",\n}");
}

#[test]
fn undefined_properties_are_treated_as_absent() {
    let actual = Value::object([("a", Value::Number(1.0)), ("b", Value::Undefined)]);
    assert_matches(&actual, "{ a: 1 }");
    assert_matches(&Value::object([("a", Value::Number(1.0))]), "{ a: 1, b: undefined }");
}

#[test]
fn nan_matches_nan() {
    assert_matches(&Value::Number(f64::NAN), "NaN");
}

#[test]
fn multiline_strings_ignore_indentation_and_trailing_whitespace() {
    let actual = Value::string("hello\nworld");
    assert_matches(&actual, "`\n    hello  \n    world\n  `");
    assert_matches(&actual, "`\r\n  hello\r\n  world\r\n`");
}

#[test]
fn single_line_strings_compare_exactly() {
    let result = rewrite(plan(&Value::string("a"), Some("'a '"), &profile()).unwrap());
    assert_eq!(result.text, r#""a""#);
}

#[test]
fn mismatch_produces_diff_against_previous() {
    let result = rewrite(plan(&Value::object([("id", Value::Number(2.0))]), Some("{ id: 1 }"), &profile()).unwrap());
    assert_eq!(result.text, "{ id: 2 }");
    assert_eq!(result.previous.as_deref(), Some("{ id: 1 }"));
    assert_eq!(result.diff(), "-{ id: 1 }\n+{ id: 2 }\n");
}

#[test]
fn accepting_matchers_count_as_match() {
    let actual = Value::object([
        ("id", Value::Number(7.0)),
        ("createdAt", Value::string("2024-05-01")),
        ("tags", Value::Array(vec![Value::string("a"), Value::string("b")])),
    ]);
    assert_matches(
        &actual,
        "{ id: expect.any(Number), createdAt: expect.anything(), tags: expect.arrayContaining(['b']) }",
    );
}

#[test]
fn recognized_matcher_forms_evaluate() {
    assert_matches(&Value::string("id-42"), r"expect.stringMatching(/^id-\d+$/)");
    assert_matches(&Value::string("ID-42"), r"expect.stringMatching(/^id-/i)");
    assert_matches(&Value::string("hello world"), "expect.stringContaining('lo w')");
    assert_matches(&Value::string("abc"), "expect.not.stringContaining('x')");
    assert_matches(&Value::Number(0.1 + 0.2), "expect.closeTo(0.3, 5)");
    assert_matches(
        &Value::object([("id", Value::Number(1.0)), ("extra", Value::Null)]),
        "expect.objectContaining({ id: 1 })",
    );
    assert_matches(&Value::Array(vec![]), "expect.any(Array)");
}

#[test]
fn rejecting_matcher_is_a_mismatch() {
    let result = plan(&Value::Number(3.0), Some("expect.any(String)"), &profile()).unwrap();
    assert!(matches!(result, Plan::Replace(_)));
    assert!(!values_match(&Value::matcher("expect.anything()"), &Value::Null));
}

#[test]
fn unknown_expressions_act_as_wildcards() {
    assert_matches(
        &Value::object([("when", Value::string("2024-05-01"))]),
        "{ when: someDate }",
    );
}

#[test]
fn matchers_survive_rewrite_where_they_still_apply() {
    let result = rewrite(
        plan(
            &user(7.0, "Grace"),
            Some(r#"{ id: expect.any(Number), name: "Ada" }"#),
            &profile(),
        )
        .unwrap(),
    );
    assert_eq!(result.text, r#"{ id: expect.any(Number), name: "Grace" }"#);
    assert!(result.dropped.is_empty());
}

#[test]
fn matchers_that_no_longer_apply_are_dropped() {
    let result = rewrite(
        plan(
            &user(7.0, "Ada"),
            Some(r#"{ id: expect.any(String), name: "Ada" }"#),
            &profile(),
        )
        .unwrap(),
    );
    assert_eq!(result.text, r#"{ id: 7, name: "Ada" }"#);
    assert_eq!(result.dropped.len(), 1);
    assert_eq!(result.dropped[0].path, "$.id");
    assert_eq!(result.dropped[0].source, "expect.any(String)");
}

#[test]
fn matchers_at_removed_paths_are_dropped() {
    let expected = Value::object([("gone", Value::matcher("expect.anything()"))]);
    let actual = Value::object([("kept", Value::Number(1.0))]);
    let (blended, dropped) = preserve_matchers(&expected, &actual);
    assert_eq!(blended, actual);
    assert_eq!(dropped[0].path, "$.gone");
}

#[test]
fn nested_matchers_inside_arrays_are_preserved() {
    let result = rewrite(
        plan(
            &Value::Array(vec![user(1.0, "Ada"), user(2.0, "Grace")]),
            Some("[{ id: expect.any(Number), name: 'Ada' }]"),
            &profile(),
        )
        .unwrap(),
    );
    assert_eq!(
        result.text,
        r#"[{ id: expect.any(Number), name: "Ada" }, { id: 2, name: "Grace" }]"#
    );
}

#[test]
fn invalid_existing_snapshot_is_a_parse_error() {
    let err = plan(&Value::Null, Some("{ a: "), &profile()).unwrap_err();
    assert_eq!(err.code, ErrorCode::Parse);
}

struct DatePrinter;

impl Printer for DatePrinter {
    fn name(&self) -> &str {
        "date"
    }

    fn test(&self, value: &Value) -> bool {
        matches!(value, Value::Object(map) if map.len() == 1 && matches!(map.get("$date"), Some(Value::String(_))))
    }

    fn print(&self, value: &Value, _ctx: &PrintContext<'_>) -> String {
        match value {
            Value::Object(map) => match map.get("$date") {
                Some(Value::String(iso)) => format!("new Date(\"{iso}\")"),
                _ => String::new(),
            },
            _ => String::new(),
        }
    }
}

fn date(iso: &str) -> Value {
    Value::object([("$date", Value::string(iso))])
}

#[test]
fn custom_printer_output_is_written_verbatim() {
    let printers: Vec<Box<dyn Printer>> = vec![Box::new(DatePrinter)];
    let profile = profile();
    let actual = Value::object([("at", date("2024-01-01"))]);
    let result = rewrite(
        plan_with(&PlanInput {
            actual: &actual,
            existing: None,
            profile: &profile,
            base_indent: "",
            printers: &printers,
        })
        .unwrap(),
    );
    assert_eq!(result.text, r#"{ at: new Date("2024-01-01") }"#);
}

#[test]
fn custom_printed_values_compare_by_printed_text() {
    let printers: Vec<Box<dyn Printer>> = vec![Box::new(DatePrinter)];
    let profile = profile();
    let input = |actual: &Value| -> Plan {
        plan_with(&PlanInput {
            actual,
            existing: Some("new Date( \"2024-01-01\" )"),
            profile: &profile,
            base_indent: "",
            printers: &printers,
        })
        .unwrap()
    };
    assert_eq!(input(&date("2024-01-01")), Plan::Matches);
    assert!(matches!(input(&date("2025-01-01")), Plan::Replace(_)));
}
