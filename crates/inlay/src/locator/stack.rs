//! Stack trace parsing.
//!
//! Understands the frame formats the engine is likely to be handed:
//!
//! - V8 (`    at fn (/path/file.js:12:5)` and `    at /path/file.js:12:5`)
//! - SpiderMonkey / JavaScriptCore (`fn@/path/file.js:12:5`)
//! - Rust `std::backtrace` (`  3: crate::fn` followed by `at ./src/lib.rs:12:5`)
//!
//! Lines that match none of these are skipped.

use regex::Regex;
use std::sync::OnceLock;

/// One parsed stack frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StackFrame {
    pub function: Option<String>,
    pub file: String,
    pub line: u32,
    pub column: u32,
}

struct Patterns {
    v8: Regex,
    gecko: Regex,
    rust_symbol: Regex,
}

#[allow(clippy::expect_used)]
fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        v8: Regex::new(r"^\s*at\s+(?:(?P<func>.+?)\s+\()?(?P<file>[^()]+?):(?P<line>\d+)(?::(?P<col>\d+))?\)?\s*$")
            .expect("v8 frame pattern is valid"),
        gecko: Regex::new(r"^\s*(?P<func>[^@\s]*)@(?P<file>.+?):(?P<line>\d+)(?::(?P<col>\d+))?\s*$")
            .expect("gecko frame pattern is valid"),
        rust_symbol: Regex::new(r"^\s*\d+:\s+(?P<func>\S.*?)\s*$").expect("rust symbol pattern is valid"),
    })
}

/// Parse every recognizable frame in `trace`, innermost first.
#[must_use]
pub fn parse_stack(trace: &str) -> Vec<StackFrame> {
    let patterns = patterns();
    let mut frames = Vec::new();
    let mut pending_symbol: Option<String> = None;

    for line in trace.lines() {
        if let Some(caps) = patterns.v8.captures(line) {
            let function = caps
                .name("func")
                .map(|m| clean_function(m.as_str()))
                .or_else(|| pending_symbol.take());
            if let Some(frame) = frame_from(function, &caps) {
                frames.push(frame);
            }
            pending_symbol = None;
        } else if let Some(caps) = patterns.rust_symbol.captures(line) {
            pending_symbol = caps.name("func").map(|m| m.as_str().to_string());
        } else if let Some(caps) = patterns.gecko.captures(line) {
            let function = caps
                .name("func")
                .map(|m| clean_function(m.as_str()))
                .filter(|name| !name.is_empty());
            if let Some(frame) = frame_from(function, &caps) {
                frames.push(frame);
            }
            pending_symbol = None;
        }
    }
    frames
}

fn frame_from(function: Option<String>, caps: &regex::Captures<'_>) -> Option<StackFrame> {
    let file = caps.name("file")?.as_str().trim();
    let line = caps.name("line")?.as_str().parse().ok()?;
    let column = caps
        .name("col")
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(1);
    Some(StackFrame {
        function,
        file: clean_file(file),
        line,
        column,
    })
}

fn clean_function(name: &str) -> String {
    let name = name.trim();
    let name = name.strip_prefix("async ").unwrap_or(name);
    let name = name.strip_prefix("new ").unwrap_or(name);
    name.to_string()
}

fn clean_file(file: &str) -> String {
    file.strip_prefix("file://").unwrap_or(file).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn v8_frame_with_function() {
        let frames = parse_stack("Error\n    at Object.<anonymous> (/repo/a.test.js:4:21)");
        assert_eq!(
            frames,
            vec![StackFrame {
                function: Some("Object.<anonymous>".to_string()),
                file: "/repo/a.test.js".to_string(),
                line: 4,
                column: 21,
            }]
        );
    }

    #[test]
    fn rust_backtrace_pairs_symbol_with_location() {
        let trace = "   4: my_crate::tests::renders\n             at ./src/lib.rs:88:9\n";
        let frames = parse_stack(trace);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].function.as_deref(), Some("my_crate::tests::renders"));
        assert_eq!(frames[0].file, "./src/lib.rs");
        assert_eq!(frames[0].line, 88);
    }

    #[test]
    fn gecko_frame_and_file_url() {
        let frames = parse_stack("check@file:///repo/b.test.js:10:3");
        assert_eq!(frames[0].file, "/repo/b.test.js");
        assert_eq!(frames[0].function.as_deref(), Some("check"));
    }
}
