use crate::error::ErrorInfo;
use crate::model::{CallSite, Value};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Version of the NDJSON driver protocol.
pub const PROTOCOL_VERSION: u32 = 1;

/// One assertion sent by a test runner.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AssertionRequest {
    /// Protocol version for request/response compatibility.
    pub protocol_version: u32,
    /// Client-provided request identifier echoed in the response.
    pub request_id: String,
    /// The value produced by the test.
    pub actual: Value,
    /// Stack trace captured at assertion time. Used when `call_site` is absent.
    #[serde(default)]
    pub stack: Option<String>,
    /// Explicit call site, bypassing stack trace parsing.
    #[serde(default)]
    pub call_site: Option<CallSite>,
    /// Overrides the configured assertion method name for this request.
    #[serde(default)]
    pub method_name: Option<String>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AssertionStatus {
    /// The snapshot matched; nothing to write.
    Passed,
    /// A replacement was scheduled and the assertion passes for this run.
    Written,
    /// The assertion failed.
    Failed,
}

/// Summary of a scheduled edit, reported back to the runner.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScheduledEdit {
    pub file: PathBuf,
    pub start: usize,
    pub end: usize,
    pub text: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AssertionResponse {
    pub protocol_version: u32,
    pub request_id: String,
    pub status: AssertionStatus,
    #[serde(default)]
    pub call_site: Option<CallSite>,
    #[serde(default)]
    pub edit: Option<ScheduledEdit>,
    #[serde(default)]
    pub error: Option<ErrorInfo>,
}

/// Result of flushing one file at end of run.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileFlushSummary {
    pub file: PathBuf,
    pub replacements: usize,
}

/// Final line emitted by the driver after the end-of-run hook.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FlushReport {
    pub protocol_version: u32,
    pub written: Vec<FileFlushSummary>,
    #[serde(default)]
    pub failed_file: Option<PathBuf>,
    #[serde(default)]
    pub error: Option<ErrorInfo>,
}
