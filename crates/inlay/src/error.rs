//! Error types shared by every engine component.
//!
//! Errors carry a stable machine-readable [`ErrorCode`], a human message and
//! optional JSON context. The same record is emitted over the NDJSON driver
//! protocol (as [`ErrorInfo`]) and rendered by the CLI through `miette`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

pub type EngineResult<T> = Result<T, EngineError>;

/// Stable error codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    #[serde(rename = "E_IO")]
    Io,
    #[serde(rename = "E_PROTOCOL")]
    Protocol,
    #[serde(rename = "E_PROTOCOL_VERSION_MISMATCH")]
    ProtocolVersionMismatch,
    #[serde(rename = "E_CALL_SITE")]
    CallSite,
    #[serde(rename = "E_PARSE")]
    Parse,
    #[serde(rename = "E_MISMATCH")]
    Mismatch,
    #[serde(rename = "E_CI_NEW_SNAPSHOT")]
    CiNewSnapshot,
    #[serde(rename = "E_MARKER_COLLISION")]
    MarkerCollision,
    #[serde(rename = "E_FORMATTER")]
    Formatter,
    #[serde(rename = "E_STALE_SOURCE")]
    StaleSource,
    #[serde(rename = "E_CONFIG")]
    Config,
    #[serde(rename = "E_CLI_INVALID_ARG")]
    CliInvalidArg,
}

impl ErrorCode {
    pub const ALL: [ErrorCode; 12] = [
        ErrorCode::Io,
        ErrorCode::Protocol,
        ErrorCode::ProtocolVersionMismatch,
        ErrorCode::CallSite,
        ErrorCode::Parse,
        ErrorCode::Mismatch,
        ErrorCode::CiNewSnapshot,
        ErrorCode::MarkerCollision,
        ErrorCode::Formatter,
        ErrorCode::StaleSource,
        ErrorCode::Config,
        ErrorCode::CliInvalidArg,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::Io => "E_IO",
            ErrorCode::Protocol => "E_PROTOCOL",
            ErrorCode::ProtocolVersionMismatch => "E_PROTOCOL_VERSION_MISMATCH",
            ErrorCode::CallSite => "E_CALL_SITE",
            ErrorCode::Parse => "E_PARSE",
            ErrorCode::Mismatch => "E_MISMATCH",
            ErrorCode::CiNewSnapshot => "E_CI_NEW_SNAPSHOT",
            ErrorCode::MarkerCollision => "E_MARKER_COLLISION",
            ErrorCode::Formatter => "E_FORMATTER",
            ErrorCode::StaleSource => "E_STALE_SOURCE",
            ErrorCode::Config => "E_CONFIG",
            ErrorCode::CliInvalidArg => "E_CLI_INVALID_ARG",
        }
    }

    #[must_use]
    pub fn parse(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|candidate| candidate.as_str() == code)
    }

    /// Process exit code used by the CLI for this error family.
    ///
    /// Assertion failures share code 1 so test runners treat them like any
    /// other failed test; infrastructure problems get distinct codes.
    #[must_use]
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorCode::Mismatch | ErrorCode::CiNewSnapshot => 1,
            ErrorCode::CliInvalidArg | ErrorCode::Config => 2,
            ErrorCode::CallSite | ErrorCode::Parse | ErrorCode::MarkerCollision => 3,
            ErrorCode::Protocol | ErrorCode::ProtocolVersionMismatch => 4,
            ErrorCode::Formatter | ErrorCode::StaleSource => 5,
            ErrorCode::Io => 6,
        }
    }

    /// One-line description used by `protocol-help`.
    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            ErrorCode::Io => "filesystem read or write failed",
            ErrorCode::Protocol => "malformed request or response payload",
            ErrorCode::ProtocolVersionMismatch => "request used an unsupported protocol version",
            ErrorCode::CallSite => "could not determine the assertion call site",
            ErrorCode::Parse => "existing inline snapshot is not valid literal syntax",
            ErrorCode::Mismatch => "value does not match the inline snapshot",
            ErrorCode::CiNewSnapshot => "new inline snapshots are not written in CI",
            ErrorCode::MarkerCollision => "snapshot content contains the placeholder marker",
            ErrorCode::Formatter => "the configured formatter failed",
            ErrorCode::StaleSource => "source file changed since the assertion ran",
            ErrorCode::Config => "configuration file is invalid",
            ErrorCode::CliInvalidArg => "invalid command-line arguments",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Serializable error record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

#[derive(Debug, thiserror::Error, miette::Diagnostic)]
#[error("{code}: {message}")]
pub struct EngineError {
    pub code: ErrorCode,
    pub message: String,
    pub context: Option<Value>,
}

impl EngineError {
    pub fn new(code: ErrorCode, message: impl Into<String>, context: impl Into<Option<Value>>) -> Self {
        Self {
            code,
            message: message.into(),
            context: context.into(),
        }
    }

    pub fn io(message: impl Into<String>, err: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::Io,
            message,
            Some(serde_json::json!({ "source": err.to_string() })),
        )
    }

    pub fn protocol(message: impl Into<String>, context: impl Into<Option<Value>>) -> Self {
        Self::new(ErrorCode::Protocol, message, context)
    }

    pub fn protocol_version_mismatch(provided: u32, supported: u32) -> Self {
        Self::new(
            ErrorCode::ProtocolVersionMismatch,
            "unsupported protocol version",
            Some(serde_json::json!({
                "provided_version": provided,
                "supported_version": supported
            })),
        )
    }

    pub fn call_site(message: impl Into<String>, context: impl Into<Option<Value>>) -> Self {
        Self::new(ErrorCode::CallSite, message, context)
    }

    pub fn parse(message: impl Into<String>, offset: usize) -> Self {
        Self::new(
            ErrorCode::Parse,
            message,
            Some(serde_json::json!({ "offset": offset })),
        )
    }

    pub fn mismatch(message: impl Into<String>, diff: String) -> Self {
        Self::new(
            ErrorCode::Mismatch,
            message,
            Some(serde_json::json!({ "diff": diff })),
        )
    }

    pub fn formatter(message: impl Into<String>, context: impl Into<Option<Value>>) -> Self {
        Self::new(ErrorCode::Formatter, message, context)
    }

    pub fn config(message: impl Into<String>, err: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::Config,
            message,
            Some(serde_json::json!({ "source": err.to_string() })),
        )
    }

    pub fn cli_invalid_arg(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::CliInvalidArg, message, None)
    }

    #[must_use]
    pub fn exit_code(&self) -> i32 {
        self.code.exit_code()
    }

    #[must_use]
    pub fn to_error_info(&self) -> ErrorInfo {
        ErrorInfo {
            code: self.code.as_str().to_string(),
            message: self.message.clone(),
            context: self.context.clone(),
        }
    }
}
