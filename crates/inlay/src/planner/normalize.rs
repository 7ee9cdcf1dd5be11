use crate::literal::dedent;

/// Normalize multi-line text for comparison.
///
/// CRLF becomes LF, trailing whitespace is dropped from every line, common
/// indentation is removed and blank lines at either end are trimmed.
#[must_use]
pub fn normalize_text(text: &str) -> String {
    let unified = text.replace("\r\n", "\n");
    let trimmed: Vec<&str> = unified.split('\n').map(str::trim_end).collect();
    let dedented = dedent(&trimmed.join("\n"));
    dedented.trim_matches('\n').to_string()
}

/// Compare two strings under the multi-line normalization rule.
///
/// Single-line strings compare exactly; as soon as either side spans
/// several lines both are normalized first.
#[must_use]
pub fn strings_equivalent(expected: &str, actual: &str) -> bool {
    if expected == actual {
        return true;
    }
    if !expected.contains('\n') && !actual.contains('\n') {
        return false;
    }
    normalize_text(expected) == normalize_text(actual)
}

/// Collapse whitespace outside string literals so matcher sources written
/// with different spacing compare equal.
#[must_use]
pub fn squash_source(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for ch in source.chars() {
        match quote {
            Some(q) => {
                out.push(ch);
                if escaped {
                    escaped = false;
                } else if ch == '\\' {
                    escaped = true;
                } else if ch == q {
                    quote = None;
                }
            }
            None if ch.is_whitespace() => {}
            None => {
                if matches!(ch, '"' | '\'' | '`') {
                    quote = Some(ch);
                }
                out.push(ch);
            }
        }
    }
    out
}
