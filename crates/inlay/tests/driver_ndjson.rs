// Test module - relaxed lint rules
#![allow(clippy::indexing_slicing)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(missing_docs)]

//! In-process tests of the NDJSON driver loop.

use std::io::Cursor;

use inlay::driver::run_driver_with_io;
use inlay::model::{AssertionResponse, AssertionStatus, CallSite, FlushReport, UpdateMode, Value};
use inlay::{Engine, ErrorCode};
use inlay_fixtures::{engine_for, read_source, temp_dir, RequestBuilder, SourceBuilder, StackBuilder};

struct DriverRun {
    responses: Vec<AssertionResponse>,
    report: FlushReport,
    error: Option<ErrorCode>,
}

fn drive(engine: &Engine, lines: &[String]) -> DriverRun {
    drive_bytes(engine, lines.join("\n").into_bytes())
}

fn drive_bytes(engine: &Engine, bytes: Vec<u8>) -> DriverRun {
    let input = Cursor::new(bytes);
    let mut output = Vec::new();
    let result = run_driver_with_io(engine, input, &mut output);
    let text = String::from_utf8(output).unwrap();
    let mut out_lines: Vec<&str> = text.lines().collect();
    let report: FlushReport = serde_json::from_str(out_lines.pop().unwrap()).unwrap();
    let responses = out_lines
        .into_iter()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    DriverRun {
        responses,
        report,
        error: result.err().map(|err| err.code),
    }
}

#[test]
fn requests_get_responses_and_writes_flush_at_eof() {
    let dir = temp_dir("driver");
    let file = SourceBuilder::new()
        .line("test('user', () => {")
        .assertion("  ", "user", None)
        .assertion("  ", "count", Some("2"))
        .line("});")
        .write_to(dir.path(), "user.test.js");
    let engine = engine_for(dir.path(), UpdateMode::New);

    let stack = StackBuilder::v8()
        .frame(Some("toMatchInlineSnapshot"), "/app/node_modules/inlay/index.js", 40, 11)
        .frame(Some("Object.<anonymous>"), &file.path_str(), file.line(0), 16)
        .build();
    let lines = vec![
        RequestBuilder::new("r1", Value::object([("id", Value::Number(1.0))]))
            .with_stack(stack)
            .to_line(),
        String::new(),
        RequestBuilder::new("r2", Value::Number(2.0))
            .with_call_site(file.site(1))
            .to_line(),
    ];
    let run = drive(&engine, &lines);

    assert_eq!(run.error, None);
    assert_eq!(run.responses.len(), 2);
    assert_eq!(run.responses[0].request_id, "r1");
    assert_eq!(run.responses[0].status, AssertionStatus::Written);
    assert_eq!(run.responses[0].edit.as_ref().unwrap().text, "{ id: 1 }");
    assert_eq!(run.responses[1].status, AssertionStatus::Passed);
    assert!(run.responses[1].edit.is_none());

    assert_eq!(run.report.written.len(), 1);
    assert_eq!(run.report.written[0].file, file.path);
    assert!(run.report.error.is_none());
    assert!(read_source(&file.path).contains("expect(user).toMatchInlineSnapshot({ id: 1 });"));
}

#[test]
fn failed_assertion_is_reported_without_stopping() {
    let dir = temp_dir("driver-fail");
    let file = SourceBuilder::new()
        .assertion("", "a", Some("1"))
        .assertion("", "b", None)
        .write_to(dir.path(), "fail.test.js");
    let engine = engine_for(dir.path(), UpdateMode::New);

    let lines = vec![
        RequestBuilder::new("mismatch", Value::Number(5.0))
            .with_call_site(file.site(0))
            .to_line(),
        RequestBuilder::new("fresh", Value::Number(6.0))
            .with_call_site(file.site(1))
            .to_line(),
    ];
    let run = drive(&engine, &lines);

    assert_eq!(run.error, None);
    let failed = &run.responses[0];
    assert_eq!(failed.status, AssertionStatus::Failed);
    assert_eq!(failed.call_site, Some(file.site(0)));
    let error = failed.error.as_ref().unwrap();
    assert_eq!(error.code, "E_MISMATCH");
    assert!(error.context.as_ref().unwrap()["diff"].as_str().unwrap().contains("+5"));
    assert_eq!(run.responses[1].status, AssertionStatus::Written);
    assert_eq!(
        read_source(&file.path),
        "expect(a).toMatchInlineSnapshot(1);\nexpect(b).toMatchInlineSnapshot(6);\n"
    );
}

#[test]
fn request_without_location_fails() {
    let dir = temp_dir("driver-noloc");
    let engine = engine_for(dir.path(), UpdateMode::New);
    let run = drive(&engine, &[RequestBuilder::new("x", Value::Null).to_line()]);
    let error = run.responses[0].error.as_ref().unwrap();
    assert_eq!(error.code, "E_PROTOCOL");
    assert_eq!(run.error, None);
}

#[test]
fn method_name_override_per_request() {
    let dir = temp_dir("driver-method");
    let file = SourceBuilder::new()
        .with_method("inlineSnap")
        .assertion("", "v", None)
        .write_to(dir.path(), "m.test.js");
    let engine = engine_for(dir.path(), UpdateMode::New);

    let line = RequestBuilder::new("m", Value::string("ok"))
        .with_call_site(CallSite::new(&file.path, 1, 1))
        .with_method("inlineSnap")
        .to_line();
    let run = drive(&engine, &[line]);
    assert_eq!(run.responses[0].status, AssertionStatus::Written);
    assert_eq!(read_source(&file.path), "expect(v).inlineSnap(\"ok\");\n");
}

#[test]
fn invalid_json_stops_reading_but_still_flushes() {
    let dir = temp_dir("driver-badjson");
    let file = SourceBuilder::new()
        .assertion("", "a", None)
        .assertion("", "b", None)
        .write_to(dir.path(), "bad.test.js");
    let engine = engine_for(dir.path(), UpdateMode::New);

    let lines = vec![
        RequestBuilder::new("ok", Value::Number(1.0))
            .with_call_site(file.site(0))
            .to_line(),
        "{not json".to_string(),
        RequestBuilder::new("never", Value::Number(2.0))
            .with_call_site(file.site(1))
            .to_line(),
    ];
    let run = drive(&engine, &lines);

    assert_eq!(run.error, Some(ErrorCode::Protocol));
    assert_eq!(run.responses.len(), 2);
    assert_eq!(run.responses[1].request_id, "unknown");
    assert_eq!(run.responses[1].error.as_ref().unwrap().code, "E_PROTOCOL");
    assert_eq!(run.report.written.len(), 1);
    assert_eq!(
        read_source(&file.path),
        "expect(a).toMatchInlineSnapshot(1);\nexpect(b).toMatchInlineSnapshot();\n"
    );
}

#[test]
fn protocol_version_mismatch_is_rejected() {
    let dir = temp_dir("driver-version");
    let engine = engine_for(dir.path(), UpdateMode::New);
    let line = RequestBuilder::new("v", Value::Null)
        .with_call_site(CallSite::new("x.test.js", 1, 1))
        .with_protocol_version(99)
        .to_line();
    let run = drive(&engine, &[line]);

    assert_eq!(run.error, Some(ErrorCode::ProtocolVersionMismatch));
    assert_eq!(run.responses[0].request_id, "v");
    let context = run.responses[0].error.as_ref().unwrap().context.clone().unwrap();
    assert_eq!(context["provided_version"], 99);
    assert!(run.report.written.is_empty());
}

#[test]
fn tagged_values_round_trip_through_protocol() {
    let dir = temp_dir("driver-tags");
    let file = SourceBuilder::new()
        .assertion("", "v", None)
        .write_to(dir.path(), "tags.test.js");
    let engine = engine_for(dir.path(), UpdateMode::New);

    let line = serde_json::json!({
        "protocol_version": 1,
        "request_id": "t",
        "actual": {
            "id": { "$$typeof": "asymmetricMatcher", "source": "expect.any(Number)" },
            "missing": { "$$typeof": "undefined" },
            "ratio": { "$$typeof": "number", "value": "NaN" }
        },
        "call_site": { "file": file.path, "line": 1 }
    })
    .to_string();
    let run = drive(&engine, &[line]);

    assert_eq!(run.responses[0].status, AssertionStatus::Written);
    assert_eq!(
        read_source(&file.path),
        "expect(v).toMatchInlineSnapshot({ id: expect.any(Number), missing: undefined, ratio: NaN });\n"
    );
}

#[test]
fn unreadable_input_still_flushes_scheduled_writes() {
    let dir = temp_dir("driver-utf8");
    let file = SourceBuilder::new()
        .assertion("", "a", None)
        .write_to(dir.path(), "utf8.test.js");
    let engine = engine_for(dir.path(), UpdateMode::New);

    let mut bytes = RequestBuilder::new("r1", Value::Number(1.0))
        .with_call_site(file.site(0))
        .to_line()
        .into_bytes();
    bytes.extend_from_slice(b"\n\xff\xfe\n");
    let run = drive_bytes(&engine, bytes);

    assert_eq!(run.error, Some(ErrorCode::Io));
    assert_eq!(run.responses.len(), 2);
    assert_eq!(run.responses[0].status, AssertionStatus::Written);
    assert_eq!(run.responses[1].request_id, "unknown");
    assert_eq!(run.responses[1].error.as_ref().unwrap().code, "E_IO");
    assert_eq!(run.report.written.len(), 1);
    assert_eq!(read_source(&file.path), "expect(a).toMatchInlineSnapshot(1);\n");
}
