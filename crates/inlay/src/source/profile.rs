use std::collections::BTreeMap;

use crate::model::{FormattingProfile, LineEnding, QuoteChar};
use crate::source::Cursor;

/// Infer the formatting conventions of a source file.
///
/// Indentation is the most common positive step between consecutive
/// indented lines; quote style is whichever quote starts more string
/// literals (ties go to double quotes); CRLF wins only if most line breaks
/// use it.
#[must_use]
pub fn infer_profile(text: &str, print_width: usize) -> FormattingProfile {
    FormattingProfile {
        indent_unit: infer_indent_unit(text),
        quote: infer_quote(text),
        line_ending: infer_line_ending(text),
        print_width,
    }
}

fn infer_indent_unit(text: &str) -> String {
    let mut tab_lines = 0usize;
    let mut space_lines = 0usize;
    let mut steps: BTreeMap<usize, usize> = BTreeMap::new();
    let mut previous = 0usize;

    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }
        if line.starts_with('\t') {
            tab_lines += 1;
            continue;
        }
        let width = line.len() - line.trim_start_matches(' ').len();
        if width > 0 {
            space_lines += 1;
        }
        if width > previous {
            *steps.entry(width - previous).or_insert(0) += 1;
        }
        previous = width;
    }

    if tab_lines > space_lines {
        return "\t".to_string();
    }
    // odd steps are usually continuation alignment, not indentation
    let best = steps
        .iter()
        .filter(|(step, _)| **step % 2 == 0 && **step <= 8)
        .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)))
        .map_or(2, |(step, _)| *step);
    " ".repeat(best)
}

fn infer_quote(text: &str) -> QuoteChar {
    let mut cursor = Cursor::new(text);
    let mut double = 0usize;
    let mut single = 0usize;
    let mut prev: Option<char> = None;

    while let Some(ch) = cursor.peek() {
        let start = cursor.pos();
        let skipped = match ch {
            '"' => {
                double += 1;
                cursor.skip_string().is_ok()
            }
            '\'' => {
                single += 1;
                cursor.skip_string().is_ok()
            }
            _ => cursor.skip_opaque_token(prev).unwrap_or(false),
        };
        if !skipped {
            cursor.set_pos(start);
            cursor.bump();
        }
        if !ch.is_whitespace() {
            prev = Some(ch);
        }
    }

    if single > double {
        QuoteChar::Single
    } else {
        QuoteChar::Double
    }
}

fn infer_line_ending(text: &str) -> LineEnding {
    let newlines = text.matches('\n').count();
    let crlf = text.matches("\r\n").count();
    if newlines > 0 && crlf * 2 > newlines {
        LineEnding::Crlf
    } else {
        LineEnding::Lf
    }
}
