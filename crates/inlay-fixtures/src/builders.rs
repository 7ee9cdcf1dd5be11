//! Fluent builder APIs for constructing test fixtures.
//!
//! These builders reduce boilerplate when creating test source files, stack
//! traces and driver requests in integration tests.
//!
//! # Example
//!
//! ```ignore
//! use inlay_fixtures::{RequestBuilder, SourceBuilder, StackBuilder};
//!
//! let file = SourceBuilder::new()
//!     .assertion("", "user", Some("{ id: 1 }"))
//!     .write_to(dir.path(), "user.test.js");
//!
//! let stack = StackBuilder::v8()
//!     .frame(Some("expectInline"), "/repo/node_modules/inlay/index.js", 10, 3)
//!     .frame(Some("Object.<anonymous>"), &file.path_str(), file.line(0), 1)
//!     .build();
//!
//! let line = RequestBuilder::new("1", Value::Number(1.0)).with_stack(stack).to_line();
//! ```

use std::path::{Path, PathBuf};

use inlay::model::config::DEFAULT_METHOD_NAME;
use inlay::model::{AssertionRequest, CallSite, Value, PROTOCOL_VERSION};

use crate::helpers::write_source;

// ============================================================================
// SourceBuilder
// ============================================================================

/// Fluent builder for test files containing inline snapshot assertions.
///
/// Every [`assertion`](Self::assertion) records the 1-based line it starts
/// on, so tests can build call sites without counting lines by hand.
#[derive(Debug, Clone)]
pub struct SourceBuilder {
    lines: Vec<String>,
    assertion_lines: Vec<u32>,
    method: String,
    crlf: bool,
}

impl Default for SourceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            lines: Vec::new(),
            assertion_lines: Vec::new(),
            method: DEFAULT_METHOD_NAME.to_string(),
            crlf: false,
        }
    }

    /// Use a different assertion method name for subsequent assertions.
    #[must_use]
    pub fn with_method(mut self, method: &str) -> Self {
        self.method = method.to_string();
        self
    }

    /// Join lines with `\r\n` instead of `\n`.
    #[must_use]
    pub fn with_crlf(mut self) -> Self {
        self.crlf = true;
        self
    }

    /// Append a raw source line.
    #[must_use]
    pub fn line(mut self, text: &str) -> Self {
        self.lines.push(text.to_string());
        self
    }

    /// Append `expect(actual).method(snapshot)` at `indent`.
    ///
    /// A multi-line `snapshot` is written verbatim, so continuation lines
    /// must carry their own indentation.
    #[must_use]
    pub fn assertion(mut self, indent: &str, actual: &str, snapshot: Option<&str>) -> Self {
        let start = self.current_line();
        self.assertion_lines.push(start);
        let call = format!(
            "{indent}expect({actual}).{}({});",
            self.method,
            snapshot.unwrap_or("")
        );
        self.lines.extend(call.split('\n').map(str::to_string));
        self
    }

    fn current_line(&self) -> u32 {
        u32::try_from(self.lines.len() + 1).unwrap_or(u32::MAX)
    }

    #[must_use]
    pub fn build(self) -> SourceFile {
        let separator = if self.crlf { "\r\n" } else { "\n" };
        let mut text = self.lines.join(separator);
        text.push_str(separator);
        SourceFile {
            path: PathBuf::new(),
            text,
            assertion_lines: self.assertion_lines,
        }
    }

    /// Build and write the file to `dir/name`.
    #[must_use]
    pub fn write_to(self, dir: &Path, name: &str) -> SourceFile {
        let mut file = self.build();
        file.path = write_source(dir, name, &file.text);
        file
    }
}

/// A built test file.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    pub text: String,
    pub assertion_lines: Vec<u32>,
}

impl SourceFile {
    /// Line of the `index`th assertion.
    #[must_use]
    pub fn line(&self, index: usize) -> u32 {
        self.assertion_lines
            .get(index)
            .copied()
            .expect("assertion index out of range")
    }

    /// Call site of the `index`th assertion, at column 1.
    #[must_use]
    pub fn site(&self, index: usize) -> CallSite {
        CallSite::new(&self.path, self.line(index), 1)
    }

    #[must_use]
    pub fn path_str(&self) -> String {
        self.path.display().to_string()
    }
}

// ============================================================================
// StackBuilder
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StackStyle {
    V8,
    Gecko,
    Rust,
}

/// Fluent builder for stack trace text, innermost frame first.
///
/// # Example
///
/// ```ignore
/// let stack = StackBuilder::rust()
///     .frame(Some("inlay::engine::Engine::match_snapshot"), "/work/inlay/src/engine/mod.rs", 120, 9)
///     .frame(Some("my_crate::tests::renders"), "./tests/render.rs", 14, 5)
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct StackBuilder {
    style: StackStyle,
    lines: Vec<String>,
    frames: usize,
}

impl StackBuilder {
    /// Node / Chrome style, starting with an `Error` header line.
    #[must_use]
    pub fn v8() -> Self {
        Self {
            style: StackStyle::V8,
            lines: vec!["Error: inline snapshot".to_string()],
            frames: 0,
        }
    }

    /// Firefox / Safari style `fn@file:line:col`.
    #[must_use]
    pub fn gecko() -> Self {
        Self {
            style: StackStyle::Gecko,
            lines: Vec::new(),
            frames: 0,
        }
    }

    /// `std::backtrace::Backtrace` display style.
    #[must_use]
    pub fn rust() -> Self {
        Self {
            style: StackStyle::Rust,
            lines: Vec::new(),
            frames: 0,
        }
    }

    /// Append a frame.
    #[must_use]
    pub fn frame(mut self, function: Option<&str>, file: &str, line: u32, column: u32) -> Self {
        match self.style {
            StackStyle::V8 => match function {
                Some(name) => self.lines.push(format!("    at {name} ({file}:{line}:{column})")),
                None => self.lines.push(format!("    at {file}:{line}:{column}")),
            },
            StackStyle::Gecko => {
                self.lines
                    .push(format!("{}@{file}:{line}:{column}", function.unwrap_or("")));
            }
            StackStyle::Rust => {
                self.lines.push(format!(
                    "{:>4}: {}",
                    self.frames,
                    function.unwrap_or("<unknown>")
                ));
                self.lines.push(format!("             at {file}:{line}:{column}"));
            }
        }
        self.frames += 1;
        self
    }

    /// Append a line no parser recognizes.
    #[must_use]
    pub fn noise(mut self, text: &str) -> Self {
        self.lines.push(text.to_string());
        self
    }

    #[must_use]
    pub fn build(self) -> String {
        self.lines.join("\n")
    }
}

// ============================================================================
// RequestBuilder
// ============================================================================

/// Fluent builder for driver [`AssertionRequest`]s.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    request: AssertionRequest,
}

impl RequestBuilder {
    #[must_use]
    pub fn new(request_id: &str, actual: Value) -> Self {
        Self {
            request: AssertionRequest {
                protocol_version: PROTOCOL_VERSION,
                request_id: request_id.to_string(),
                actual,
                stack: None,
                call_site: None,
                method_name: None,
            },
        }
    }

    #[must_use]
    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.request.stack = Some(stack.into());
        self
    }

    #[must_use]
    pub fn with_call_site(mut self, site: CallSite) -> Self {
        self.request.call_site = Some(site);
        self
    }

    #[must_use]
    pub fn with_method(mut self, method: &str) -> Self {
        self.request.method_name = Some(method.to_string());
        self
    }

    #[must_use]
    pub fn with_protocol_version(mut self, version: u32) -> Self {
        self.request.protocol_version = version;
        self
    }

    #[must_use]
    pub fn build(self) -> AssertionRequest {
        self.request
    }

    /// Serialize as one NDJSON line, without the trailing newline.
    #[must_use]
    pub fn to_line(&self) -> String {
        serde_json::to_string(&self.request).expect("request should serialize")
    }
}
