// Test module - relaxed lint rules
#![allow(clippy::indexing_slicing)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(missing_docs)]

//! Tests for the `driver` command (NDJSON protocol mode).
//!
//! Test runners pipe one `AssertionRequest` per line into `inlay driver
//! --stdio` and read one response per line back, followed by the flush report.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

use inlay::model::{AssertionResponse, AssertionStatus, FlushReport, Value};
use inlay_fixtures::{read_source, temp_dir, RequestBuilder, SourceBuilder, StackBuilder};

fn run_driver(dir: &Path, extra_args: &[&str], input: &str) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_inlay"))
        .current_dir(dir)
        .env_remove("INLAY_UPDATE")
        .args(["driver", "--stdio", "--no-ci"])
        .args(extra_args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn driver");
    child
        .stdin
        .take()
        .expect("stdin piped")
        .write_all(input.as_bytes())
        .expect("failed to write requests");
    child.wait_with_output().expect("failed to wait for driver")
}

fn parse_output(output: &Output) -> (Vec<AssertionResponse>, FlushReport) {
    let text = String::from_utf8(output.stdout.clone()).unwrap();
    let mut lines: Vec<&str> = text.lines().collect();
    let report = serde_json::from_str(lines.pop().expect("flush report line")).unwrap();
    let responses = lines
        .into_iter()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    (responses, report)
}

#[test]
fn driver_writes_snapshots_from_stack_traces() {
    let dir = temp_dir("cli-driver");
    let file = SourceBuilder::new()
        .line("it('renders', () => {")
        .assertion("  ", "render()", None)
        .line("});")
        .write_to(dir.path(), "render.test.js");
    let stack = StackBuilder::v8()
        .frame(Some("toMatchInlineSnapshot"), "/app/node_modules/inlay/index.js", 12, 7)
        .frame(None, &file.path_str(), file.line(0), 20)
        .build();
    let request = RequestBuilder::new("r1", Value::string("first\nsecond"))
        .with_stack(stack)
        .to_line();

    let output = run_driver(dir.path(), &[], &format!("{request}\n"));
    assert!(
        output.status.success(),
        "driver failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let (responses, report) = parse_output(&output);
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0].status, AssertionStatus::Written);
    assert_eq!(report.written.len(), 1);
    assert_eq!(report.written[0].replacements, 1);
    assert_eq!(
        read_source(&file.path),
        "it('renders', () => {\n  expect(render()).toMatchInlineSnapshot(`\n    first\n    second\n  `);\n});\n"
    );
}

#[test]
fn driver_exits_one_when_any_assertion_fails() {
    let dir = temp_dir("cli-driver-fail");
    let file = SourceBuilder::new()
        .assertion("", "a", Some("1"))
        .assertion("", "b", None)
        .write_to(dir.path(), "mixed.test.js");
    let input = [
        RequestBuilder::new("a", Value::Number(2.0))
            .with_call_site(file.site(0))
            .to_line(),
        RequestBuilder::new("b", Value::Bool(true))
            .with_call_site(file.site(1))
            .to_line(),
    ]
    .join("\n");

    let output = run_driver(dir.path(), &["--update", "new"], &input);
    assert_eq!(output.status.code(), Some(1));
    let (responses, report) = parse_output(&output);
    assert_eq!(responses[0].status, AssertionStatus::Failed);
    assert_eq!(responses[0].error.as_ref().unwrap().code, "E_MISMATCH");
    assert_eq!(responses[1].status, AssertionStatus::Written);
    assert!(report.error.is_none());
    assert_eq!(
        read_source(&file.path),
        "expect(a).toMatchInlineSnapshot(1);\nexpect(b).toMatchInlineSnapshot(true);\n"
    );
}

#[test]
fn driver_protocol_error_exits_four() {
    let dir = temp_dir("cli-driver-protocol");
    let output = run_driver(dir.path(), &[], "this is not json\n");
    assert_eq!(output.status.code(), Some(4));
    let (responses, report) = parse_output(&output);
    assert_eq!(responses[0].request_id, "unknown");
    assert_eq!(responses[0].error.as_ref().unwrap().code, "E_PROTOCOL");
    assert!(report.written.is_empty());
}

#[test]
fn driver_requires_stdio_flag() {
    let dir = temp_dir("cli-driver-nostdio");
    let output = Command::new(env!("CARGO_BIN_EXE_inlay"))
        .current_dir(dir.path())
        .arg("driver")
        .output()
        .expect("failed to execute");
    assert_eq!(output.status.code(), Some(2));
    let error: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(error["code"], "E_CLI_INVALID_ARG");
}

#[test]
fn driver_ci_mode_refuses_new_snapshots() {
    let dir = temp_dir("cli-driver-ci");
    let file = SourceBuilder::new()
        .assertion("", "x", None)
        .write_to(dir.path(), "ci.test.js");
    let request = RequestBuilder::new("ci", Value::Null)
        .with_call_site(file.site(0))
        .to_line();

    let mut child = Command::new(env!("CARGO_BIN_EXE_inlay"))
        .current_dir(dir.path())
        .env_remove("INLAY_UPDATE")
        .args(["driver", "--stdio", "--ci"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn driver");
    child
        .stdin
        .take()
        .expect("stdin piped")
        .write_all(request.as_bytes())
        .expect("failed to write request");
    let output = child.wait_with_output().expect("failed to wait for driver");

    assert_eq!(output.status.code(), Some(1));
    let (responses, _) = parse_output(&output);
    assert_eq!(responses[0].error.as_ref().unwrap().code, "E_CI_NEW_SNAPSHOT");
    assert_eq!(read_source(&file.path), "expect(x).toMatchInlineSnapshot();\n");
}
