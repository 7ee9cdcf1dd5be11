//! Asymmetric matcher evaluation.
//!
//! Matchers appear in hand-written snapshots as opaque expressions such as
//! `expect.any(Number)` or `expect.stringMatching(/^id-/)`. The engine never
//! executes host code; instead it recognizes the common matcher forms and
//! evaluates them against the runtime value itself. Unrecognized expressions
//! behave as wildcards and are logged.
//!
//! # Key Types
//!
//! - [`MatcherKind`] - Recognized matcher with its parsed arguments
//!
//! # Key Functions
//!
//! - [`classify`] - Recognize a matcher expression
//! - [`evaluate`] - Check a runtime value against a recognized matcher

use indexmap::IndexMap;
use regex::{Regex, RegexBuilder};

use crate::literal;
use crate::model::{Matcher, QuoteChar, Value, MAX_REGEX_PATTERN_LEN};
use crate::source::{is_ident_char, Cursor};

/// A matcher expression the engine knows how to evaluate.
#[derive(Clone, Debug)]
pub enum MatcherKind {
    /// `expect.anything()`: any value except `null` and `undefined`.
    Anything,
    /// `expect.any(Ctor)`.
    Any(String),
    StringContaining(String),
    StringMatching(Regex),
    CloseTo { expected: f64, precision: i32 },
    ArrayContaining(Vec<Value>),
    ObjectContaining(IndexMap<String, Value>),
    /// `expect.not.<matcher>(...)`.
    Not(Box<MatcherKind>),
    /// Anything the engine cannot evaluate.
    Unknown,
}

/// Recognize a matcher expression.
#[must_use]
pub fn classify(matcher: &Matcher) -> MatcherKind {
    let source = matcher.source();
    let Some(call) = parse_call(source) else {
        return MatcherKind::Unknown;
    };
    let kind = match (call.name, call.args.as_slice()) {
        ("anything", []) => MatcherKind::Anything,
        ("any", [ctor]) if ctor.chars().all(is_ident_char) && !ctor.is_empty() => {
            MatcherKind::Any((*ctor).to_string())
        }
        ("stringContaining", [arg]) => match literal_arg(arg) {
            Some(Value::String(text)) => MatcherKind::StringContaining(text),
            _ => MatcherKind::Unknown,
        },
        ("stringMatching", [arg]) => regex_arg(arg).map_or(MatcherKind::Unknown, MatcherKind::StringMatching),
        ("closeTo", [expected, rest @ ..]) if rest.len() <= 1 => {
            let expected = match literal_arg(expected) {
                Some(Value::Number(n)) => Some(n),
                _ => None,
            };
            let precision = match rest.first().map(|arg| literal_arg(arg)) {
                None => Some(2),
                #[allow(clippy::cast_possible_truncation)]
                Some(Some(Value::Number(n))) if n.fract() == 0.0 && n.abs() < 100.0 => Some(n as i32),
                Some(_) => None,
            };
            match (expected, precision) {
                (Some(expected), Some(precision)) => MatcherKind::CloseTo { expected, precision },
                _ => MatcherKind::Unknown,
            }
        }
        ("arrayContaining", [arg]) => match literal_arg(arg) {
            Some(Value::Array(items)) => MatcherKind::ArrayContaining(items),
            _ => MatcherKind::Unknown,
        },
        ("objectContaining", [arg]) => match literal_arg(arg) {
            Some(Value::Object(map)) => MatcherKind::ObjectContaining(map),
            _ => MatcherKind::Unknown,
        },
        _ => MatcherKind::Unknown,
    };
    match kind {
        MatcherKind::Unknown => MatcherKind::Unknown,
        kind if call.negated => MatcherKind::Not(Box::new(kind)),
        kind => kind,
    }
}

/// Check `actual` against a recognized matcher.
///
/// `equals` compares nested expected values (which may themselves contain
/// matchers) against actual values. Returns `None` for
/// [`MatcherKind::Unknown`].
pub fn evaluate(kind: &MatcherKind, actual: &Value, equals: &dyn Fn(&Value, &Value) -> bool) -> Option<bool> {
    let result = match kind {
        MatcherKind::Unknown => return None,
        MatcherKind::Anything => !matches!(actual, Value::Null | Value::Undefined),
        MatcherKind::Any(ctor) => matches_constructor(ctor, actual),
        MatcherKind::StringContaining(needle) => {
            matches!(actual, Value::String(text) if text.contains(needle.as_str()))
        }
        MatcherKind::StringMatching(re) => matches!(actual, Value::String(text) if re.is_match(text)),
        MatcherKind::CloseTo { expected, precision } => match actual {
            Value::Number(n) if n.is_infinite() || expected.is_infinite() => n == expected,
            Value::Number(n) => (n - expected).abs() < 10f64.powi(-precision) / 2.0,
            _ => false,
        },
        MatcherKind::ArrayContaining(expected) => match actual {
            Value::Array(items) => expected
                .iter()
                .all(|want| items.iter().any(|item| equals(want, item))),
            _ => false,
        },
        MatcherKind::ObjectContaining(expected) => match actual {
            Value::Object(map) => expected
                .iter()
                .all(|(key, want)| map.get(key).is_some_and(|item| equals(want, item))),
            _ => false,
        },
        MatcherKind::Not(inner) => !evaluate(inner, actual, equals)?,
    };
    Some(result)
}

fn matches_constructor(ctor: &str, actual: &Value) -> bool {
    match ctor {
        "Number" => matches!(actual, Value::Number(_)),
        "String" => matches!(actual, Value::String(_)),
        "Boolean" => matches!(actual, Value::Bool(_)),
        "Array" => matches!(actual, Value::Array(_)),
        "Object" => matches!(actual, Value::Object(_) | Value::Array(_)),
        "Function" | "Symbol" | "BigInt" => false,
        // user-defined classes serialize as plain objects
        _ => matches!(actual, Value::Object(_)),
    }
}

struct Call<'a> {
    negated: bool,
    name: &'a str,
    args: Vec<&'a str>,
}

/// Split `expect.not.name(a, b)` into its parts.
fn parse_call(source: &str) -> Option<Call<'_>> {
    let rest = source.strip_prefix("expect.").unwrap_or(source);
    let (negated, rest) = match rest.strip_prefix("not.") {
        Some(rest) => (true, rest),
        None => (false, rest),
    };
    let open = rest.find('(')?;
    let name = rest.get(..open)?.trim();
    if name.is_empty() || !name.chars().all(is_ident_char) {
        return None;
    }

    let mut cursor = Cursor::at(rest, open);
    cursor.skip_balanced().ok()?;
    if !rest.get(cursor.pos()..)?.trim().is_empty() {
        return None;
    }
    let inner = rest.get(open + 1..cursor.pos().checked_sub(1)?)?;

    let mut args = Vec::new();
    let mut cursor = Cursor::new(inner);
    loop {
        cursor.skip_trivia().ok()?;
        if cursor.is_eof() {
            break;
        }
        let start = cursor.pos();
        cursor.skip_expression().ok()?;
        args.push(cursor.slice(start, cursor.pos()).trim());
        if !cursor.eat(",") && !cursor.is_eof() {
            return None;
        }
    }
    Some(Call { negated, name, args })
}

fn literal_arg(arg: &str) -> Option<Value> {
    literal::parse_source(arg, QuoteChar::Double).ok()
}

fn regex_arg(arg: &str) -> Option<Regex> {
    let (pattern, flags) = if arg.starts_with('/') {
        let close = arg.rfind('/').filter(|idx| *idx > 0)?;
        (arg.get(1..close)?.to_string(), arg.get(close + 1..)?.to_string())
    } else {
        match literal_arg(arg)? {
            Value::String(text) => (text, String::new()),
            _ => return None,
        }
    };
    if pattern.len() > MAX_REGEX_PATTERN_LEN {
        tracing::warn!(len = pattern.len(), "stringMatching pattern too long; treating as wildcard");
        return None;
    }
    let mut builder = RegexBuilder::new(&pattern);
    builder
        .case_insensitive(flags.contains('i'))
        .multi_line(flags.contains('m'))
        .dot_matches_new_line(flags.contains('s'));
    match builder.build() {
        Ok(re) => Some(re),
        Err(err) => {
            tracing::warn!(pattern = %pattern, error = %err, "unsupported stringMatching pattern");
            None
        }
    }
}
