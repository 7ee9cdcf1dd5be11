//! NDJSON driver loop for test runners.
//!
//! A runner writes one [`AssertionRequest`] per line and reads one
//! [`AssertionResponse`] per line back. When input ends, the engine's
//! end-of-run hook flushes every scheduled write and a final
//! [`FlushReport`] line is emitted.
//!
//! Assertion failures are ordinary responses. Protocol errors (invalid JSON,
//! unsupported protocol version) and unreadable input stop reading further
//! requests, but writes already scheduled are still flushed.

use std::io::{self, BufRead, Write};

use serde::Serialize;

use crate::engine::{Engine, Outcome};
use crate::error::{EngineError, EngineResult, ErrorInfo};
use crate::model::{
    AssertionRequest, AssertionResponse, AssertionStatus, CallSite, FlushReport, ScheduledEdit,
    PROTOCOL_VERSION,
};

/// Counts reported when the driver loop ends.
#[derive(Clone, Debug)]
pub struct DriverSummary {
    pub passed: usize,
    pub written: usize,
    pub failed: usize,
    pub flush: FlushReport,
}

/// Run the driver loop against stdin/stdout.
pub fn run_driver(engine: &Engine) -> EngineResult<DriverSummary> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    run_driver_with_io(engine, stdin.lock(), stdout.lock())
}

/// Run the driver loop over arbitrary line-oriented input and output.
///
/// Returns an error if the stream hit a protocol error or the flush failed;
/// assertion failures are only counted.
pub fn run_driver_with_io<R, W>(engine: &Engine, input: R, mut output: W) -> EngineResult<DriverSummary>
where
    R: BufRead,
    W: Write,
{
    let mut passed = 0usize;
    let mut written = 0usize;
    let mut failed = 0usize;
    let mut final_error: Option<EngineError> = None;

    for line in input.lines() {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                let error = EngineError::io("failed to read driver input", err);
                emit_line(&mut output, &failure("unknown", None, error.to_error_info()))?;
                final_error = Some(error);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let request: AssertionRequest = match serde_json::from_str(&line) {
            Ok(request) => request,
            Err(err) => {
                let error = EngineError::protocol(
                    "invalid json request",
                    Some(serde_json::json!({
                        "parse_error": err.to_string(),
                        "received": line.chars().take(200).collect::<String>(),
                        "hint": "request must be an AssertionRequest: protocol_version, request_id, actual, stack | call_site"
                    })),
                );
                emit_line(&mut output, &failure("unknown", None, error.to_error_info()))?;
                final_error = Some(error);
                break;
            }
        };

        if request.protocol_version != PROTOCOL_VERSION {
            let error = EngineError::protocol_version_mismatch(request.protocol_version, PROTOCOL_VERSION);
            emit_line(
                &mut output,
                &failure(&request.request_id, None, error.to_error_info()),
            )?;
            final_error = Some(error);
            break;
        }

        let response = handle_request(engine, &request);
        match response.status {
            AssertionStatus::Passed => passed += 1,
            AssertionStatus::Written => written += 1,
            AssertionStatus::Failed => failed += 1,
        }
        emit_line(&mut output, &response)?;
    }

    let outcome = engine.finish();
    let flush = outcome.to_report();
    emit_line(&mut output, &flush)?;
    tracing::info!(passed, written, failed, files = flush.written.len(), "driver finished");

    if let Some(error) = final_error {
        return Err(error);
    }
    outcome.into_result()?;
    Ok(DriverSummary {
        passed,
        written,
        failed,
        flush,
    })
}

fn handle_request(engine: &Engine, request: &AssertionRequest) -> AssertionResponse {
    let site = match resolve_call_site(engine, request) {
        Ok(site) => site,
        Err(error) => return failure(&request.request_id, None, error.to_error_info()),
    };
    let method = request
        .method_name
        .as_deref()
        .unwrap_or(&engine.config().method_name);

    match engine.match_snapshot_with(&request.actual, &site, method) {
        Ok(Outcome::Matched) => AssertionResponse {
            protocol_version: PROTOCOL_VERSION,
            request_id: request.request_id.clone(),
            status: AssertionStatus::Passed,
            call_site: Some(site),
            edit: None,
            error: None,
        },
        Ok(Outcome::Scheduled(replacement)) => AssertionResponse {
            protocol_version: PROTOCOL_VERSION,
            request_id: request.request_id.clone(),
            status: AssertionStatus::Written,
            call_site: Some(site),
            edit: Some(ScheduledEdit {
                file: replacement.file,
                start: replacement.start,
                end: replacement.end,
                text: replacement.text,
            }),
            error: None,
        },
        Err(error) => {
            tracing::debug!(request_id = %request.request_id, code = %error.code, "assertion failed");
            failure(&request.request_id, Some(site), error.to_error_info())
        }
    }
}

fn resolve_call_site(engine: &Engine, request: &AssertionRequest) -> EngineResult<CallSite> {
    if let Some(site) = &request.call_site {
        return Ok(site.clone());
    }
    match request.stack.as_deref() {
        Some(stack) => engine.locate(stack),
        None => Err(EngineError::protocol(
            "request needs either call_site or stack",
            Some(serde_json::json!({ "request_id": request.request_id })),
        )),
    }
}

fn failure(request_id: &str, call_site: Option<CallSite>, error: ErrorInfo) -> AssertionResponse {
    AssertionResponse {
        protocol_version: PROTOCOL_VERSION,
        request_id: request_id.to_string(),
        status: AssertionStatus::Failed,
        call_site,
        edit: None,
        error: Some(error),
    }
}

fn emit_line(output: &mut impl Write, payload: &impl Serialize) -> EngineResult<()> {
    let line = serde_json::to_string(payload)
        .map_err(|err| EngineError::protocol(format!("failed to serialize driver output: {err}"), None))?;
    writeln!(output, "{line}").map_err(|err| EngineError::io("failed to write driver output", err))?;
    output
        .flush()
        .map_err(|err| EngineError::io("failed to flush driver output", err))?;
    Ok(())
}
