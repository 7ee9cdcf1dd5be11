//! Call-site location.
//!
//! Two steps: pick the first stack frame that belongs to user code
//! ([`locate`]), then find the assertion call and its argument span in the
//! source text ([`find_argument`]). The second step scans the whole file with
//! [`Cursor`] so that method names inside strings, comments and templates are
//! never mistaken for the call.

pub mod stack;

pub use stack::{parse_stack, StackFrame};

use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::error::{EngineError, EngineResult};
use crate::model::CallSite;
use crate::source::{is_ident_char, is_ident_start, line_start_offset, Cursor};

/// Glob patterns for frames that never point at user code.
#[derive(Clone, Debug)]
pub struct IgnoreSet {
    patterns: Vec<String>,
    globs: GlobSet,
}

impl IgnoreSet {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> EngineResult<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let glob = Glob::new(pattern.as_ref()).map_err(|err| {
                EngineError::config(format!("invalid ignore pattern '{}'", pattern.as_ref()), err)
            })?;
            builder.add(glob);
        }
        let globs = builder
            .build()
            .map_err(|err| EngineError::config("failed to build ignore patterns", err))?;
        Ok(Self {
            patterns: patterns.iter().map(|p| p.as_ref().to_string()).collect(),
            globs,
        })
    }

    #[must_use]
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    #[must_use]
    pub fn is_ignored(&self, file: &str) -> bool {
        self.globs.is_match(file)
    }
}

/// First frame of `trace` whose file is not ignored.
#[must_use]
pub fn locate(trace: &str, ignore: &IgnoreSet) -> Option<CallSite> {
    parse_stack(trace)
        .into_iter()
        .find(|frame| !ignore.is_ignored(&frame.file))
        .map(|frame| CallSite::new(frame.file, frame.line, frame.column))
}

/// Like [`locate`], failing with `E_CALL_SITE` when no frame qualifies.
pub fn locate_or_err(trace: &str, ignore: &IgnoreSet) -> EngineResult<CallSite> {
    locate(trace, ignore).ok_or_else(|| {
        let frames = parse_stack(trace).len();
        EngineError::call_site(
            "no stack frame points at user code",
            Some(serde_json::json!({ "parsed_frames": frames, "ignore": ignore.patterns() })),
        )
    })
}

/// Location of a snapshot call and its argument inside a source file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArgumentSpan {
    /// Byte offset of the method name.
    pub call_start: usize,
    /// Byte offset of `(`.
    pub open_paren: usize,
    /// Byte offset of the matching `)`.
    pub close_paren: usize,
    /// Replacement range. For an empty call this is everything between the
    /// parentheses, usually an insertion point.
    pub start: usize,
    pub end: usize,
    /// Existing argument text (trimmed), if the call has one.
    pub existing: Option<String>,
}

/// Find the `method(...)` call reported at `site` and its argument span.
pub fn find_argument(text: &str, site: &CallSite, method: &str) -> EngineResult<ArgumentSpan> {
    let line_start = line_start_offset(text, site.line).ok_or_else(|| {
        EngineError::call_site(
            format!("line {} is past the end of {}", site.line, site.file.display()),
            Some(serde_json::json!({ "call_site": site })),
        )
    })?;
    let line_end = text
        .get(line_start..)
        .and_then(|rest| rest.find('\n'))
        .map_or(text.len(), |idx| line_start + idx);
    let column_offset = column_to_offset(text, line_start, line_end, site.column);

    let candidates = method_calls(text, method, line_start, column_offset);
    let chosen = candidates
        .iter()
        .copied()
        .find(|offset| *offset >= column_offset && *offset <= line_end)
        .or_else(|| candidates.first().copied())
        .ok_or_else(|| {
            EngineError::call_site(
                format!("no call to {method} found at or after {site}"),
                Some(serde_json::json!({ "call_site": site, "method": method })),
            )
        })?;

    argument_span(text, chosen, method)
}

/// Byte offset of 1-based `column` on the line, clamped to the line end.
fn column_to_offset(text: &str, line_start: usize, line_end: usize, column: u32) -> usize {
    let line = text.get(line_start..line_end).unwrap_or("");
    let skip = usize::try_from(column.saturating_sub(1)).unwrap_or(usize::MAX);
    line.char_indices()
        .nth(skip)
        .map_or(line_end, |(idx, _)| line_start + idx)
}

/// Offsets of `method` identifiers followed by `(` at or after `from`.
///
/// Scanning stops at the first candidate at or after `stop_at`. Text the
/// cursor cannot lex (JSX text, unusual regex contexts) is stepped over one
/// character at a time so it cannot hide calls elsewhere in the file.
fn method_calls(text: &str, method: &str, from: usize, stop_at: usize) -> Vec<usize> {
    let mut cursor = Cursor::new(text);
    let mut found = Vec::new();
    let mut prev: Option<char> = None;

    while let Some(ch) = cursor.peek() {
        let start = cursor.pos();
        match cursor.skip_opaque_token(prev) {
            Ok(true) => {
                prev = cursor.slice(start, cursor.pos()).chars().last();
                continue;
            }
            Ok(false) => {}
            Err(err) => {
                tracing::debug!(offset = start, error = %err.message, "skipping unlexable text");
                cursor.set_pos(start);
                cursor.bump();
                prev = Some(ch);
                continue;
            }
        }
        if is_ident_start(ch) {
            let word = cursor.eat_while(is_ident_char);
            if word == method && start >= from {
                let mut after = cursor.clone();
                if after.skip_trivia().is_ok() && after.peek() == Some('(') {
                    found.push(start);
                    if start >= stop_at {
                        break;
                    }
                }
            }
            prev = word.chars().last();
            continue;
        }
        cursor.bump();
        if !ch.is_whitespace() {
            prev = Some(ch);
        }
    }
    found
}

fn argument_span(text: &str, call_start: usize, method: &str) -> EngineResult<ArgumentSpan> {
    let mut cursor = Cursor::at(text, call_start + method.len());
    cursor.skip_trivia()?;
    let open_paren = cursor.pos();
    let mut closing = cursor.clone();
    closing.skip_balanced()?;
    let close_paren = closing.pos().saturating_sub(1);

    cursor.bump();
    cursor.skip_trivia()?;
    if cursor.pos() >= close_paren {
        return Ok(ArgumentSpan {
            call_start,
            open_paren,
            close_paren,
            start: open_paren + 1,
            end: close_paren,
            existing: None,
        });
    }

    let start = cursor.pos();
    cursor.skip_expression()?;
    let end = start + cursor.slice(start, cursor.pos()).trim_end().len();
    cursor.eat(",");
    cursor.skip_trivia()?;
    if cursor.pos() < close_paren {
        return Err(EngineError::call_site(
            format!("{method} takes a single snapshot argument"),
            Some(serde_json::json!({ "offset": cursor.pos() })),
        ));
    }
    Ok(ArgumentSpan {
        call_start,
        open_paren,
        close_paren,
        start,
        end,
        existing: text.get(start..end).map(str::to_string),
    })
}
