//! Protocol help generation.
//!
//! Structured documentation of the inlay driver protocol: commands, message
//! schemas, error codes and examples.

use inlay::model::{CONFIG_VERSION, PROTOCOL_VERSION};
use inlay::ErrorCode;
use serde::Serialize;
use std::collections::BTreeMap;

/// Complete protocol documentation.
#[derive(Debug, Serialize)]
pub struct ProtocolHelp {
    /// Current protocol version
    pub protocol_version: u32,
    pub versions: Versions,
    pub commands: BTreeMap<String, CommandHelp>,
    pub schemas: BTreeMap<String, SchemaHelp>,
    pub error_codes: BTreeMap<String, ErrorCodeHelp>,
    pub examples: BTreeMap<String, Example>,
    pub quickstart: Quickstart,
}

#[derive(Debug, Serialize)]
pub struct Versions {
    pub protocol: u32,
    pub config: u32,
}

/// Documentation for a CLI command.
#[derive(Debug, Serialize)]
pub struct CommandHelp {
    pub description: String,
    pub usage: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_flags: Option<Vec<String>>,
    pub output: String,
}

/// Schema documentation for a message type.
#[derive(Debug, Serialize)]
pub struct SchemaHelp {
    pub description: String,
    pub fields: BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorCodeHelp {
    pub exit_code: i32,
    pub description: String,
}

/// A working example.
#[derive(Debug, Serialize)]
pub struct Example {
    pub description: String,
    pub command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<serde_json::Value>,
    pub expected: String,
}

#[derive(Debug, Serialize)]
pub struct Quickstart {
    pub steps: Vec<String>,
    pub minimal_config: serde_json::Value,
}

/// Generate complete protocol documentation.
#[must_use]
pub fn generate_protocol_help() -> ProtocolHelp {
    ProtocolHelp {
        protocol_version: PROTOCOL_VERSION,
        versions: Versions {
            protocol: PROTOCOL_VERSION,
            config: CONFIG_VERSION,
        },
        commands: generate_commands(),
        schemas: generate_schemas(),
        error_codes: generate_error_codes(),
        examples: generate_examples(),
        quickstart: generate_quickstart(),
    }
}

fn command(description: &str, usage: &str, required: Option<&[&str]>, output: &str) -> CommandHelp {
    CommandHelp {
        description: description.to_string(),
        usage: usage.to_string(),
        required_flags: required.map(|flags| flags.iter().map(|flag| (*flag).to_string()).collect()),
        output: output.to_string(),
    }
}

fn generate_commands() -> BTreeMap<String, CommandHelp> {
    let mut commands = BTreeMap::new();
    commands.insert(
        "driver".to_string(),
        command(
            "Assertion driver for test runners. Flushes all writes when stdin closes.",
            "inlay driver --stdio [--config <path>] [--update <none|new|all>] [--ci | --no-ci]",
            Some(&["--stdio"]),
            "NDJSON: one AssertionResponse per request, then one FlushReport",
        ),
    );
    commands.insert(
        "check".to_string(),
        command(
            "Run a single assertion and write the result immediately.",
            "inlay check --file <path> --line <n> [--column <n>] --actual <json>",
            Some(&["--file", "--line", "--actual"]),
            "AssertionResponse JSON with --json, a short summary otherwise",
        ),
    );
    commands.insert(
        "profile".to_string(),
        command(
            "Print the formatting profile inferred for a source file.",
            "inlay profile <file> [--json]",
            None,
            "FormattingProfile",
        ),
    );
    commands
}

fn fields(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
    entries
        .iter()
        .map(|(name, desc)| ((*name).to_string(), (*desc).to_string()))
        .collect()
}

fn generate_schemas() -> BTreeMap<String, SchemaHelp> {
    let mut schemas = BTreeMap::new();
    schemas.insert(
        "AssertionRequest".to_string(),
        SchemaHelp {
            description: "One assertion, sent on stdin as a single JSON line.".to_string(),
            fields: fields(&[
                ("protocol_version", "u32 (must be 1)"),
                ("request_id", "string, echoed in the response"),
                ("actual", "Value: the runtime value"),
                ("stack", "string?: stack trace captured at the assertion"),
                ("call_site", "{file, line, column?}?: explicit location, skips stack parsing"),
                ("method_name", "string?: overrides the configured method name"),
            ]),
        },
    );
    schemas.insert(
        "AssertionResponse".to_string(),
        SchemaHelp {
            description: "Result of one assertion.".to_string(),
            fields: fields(&[
                ("protocol_version", "u32"),
                ("request_id", "string"),
                ("status", "passed | written | failed"),
                ("call_site", "{file, line, column}?"),
                ("edit", "{file, start, end, text}?: scheduled write (status written)"),
                ("error", "{code, message, context?}? (status failed)"),
            ]),
        },
    );
    schemas.insert(
        "FlushReport".to_string(),
        SchemaHelp {
            description: "Final line written after stdin closes and pending writes are flushed.".to_string(),
            fields: fields(&[
                ("protocol_version", "u32"),
                ("written", "[{file, replacements}]"),
                ("failed_file", "string?: file that stopped the flush"),
                ("error", "{code, message, context?}?"),
            ]),
        },
    );
    schemas.insert(
        "Value".to_string(),
        SchemaHelp {
            description: "JSON value; special values use structural tags.".to_string(),
            fields: fields(&[
                ("undefined", r#"{"$$typeof": "undefined"}"#),
                ("NaN / Infinity", r#"{"$$typeof": "number", "value": "NaN" | "Infinity" | "-Infinity"}"#),
                ("matcher", r#"{"$$typeof": "asymmetricMatcher", "source": "expect.any(Number)"}"#),
            ]),
        },
    );
    schemas
}

fn generate_error_codes() -> BTreeMap<String, ErrorCodeHelp> {
    ErrorCode::ALL
        .into_iter()
        .map(|code| {
            (
                code.as_str().to_string(),
                ErrorCodeHelp {
                    exit_code: code.exit_code(),
                    description: code.description().to_string(),
                },
            )
        })
        .collect()
}

fn generate_examples() -> BTreeMap<String, Example> {
    let mut examples = BTreeMap::new();
    examples.insert(
        "driver_new_snapshot".to_string(),
        Example {
            description: "Fill an empty toMatchInlineSnapshot() call.".to_string(),
            command: "inlay driver --stdio".to_string(),
            input: Some(serde_json::json!({
                "protocol_version": PROTOCOL_VERSION,
                "request_id": "1",
                "actual": {"id": 1, "name": "Ada"},
                "stack": "Error\n    at Object.<anonymous> (/repo/user.test.js:3:20)"
            })),
            expected: "status 'written'; at EOF the FlushReport lists /repo/user.test.js".to_string(),
        },
    );
    examples.insert(
        "check_explicit_site".to_string(),
        Example {
            description: "One-shot assertion against a known line.".to_string(),
            command: "inlay check --file user.test.js --line 3 --actual '{\"id\":1}' --json".to_string(),
            input: None,
            expected: "AssertionResponse with status 'passed' or 'written'".to_string(),
        },
    );
    examples
}

fn generate_quickstart() -> Quickstart {
    Quickstart {
        steps: vec![
            "1. Start the driver from the test runner: inlay driver --stdio".to_string(),
            "2. For each inline snapshot assertion, send an AssertionRequest line".to_string(),
            "3. Fail the test when the response status is 'failed'".to_string(),
            "4. Close stdin at the end of the run; read the FlushReport".to_string(),
        ],
        minimal_config: serde_json::json!({
            "config_version": CONFIG_VERSION,
            "method_name": "toMatchInlineSnapshot",
            "print_width": 80
        }),
    }
}
