//! Comparison and rewrite planning.
//!
//! [`plan`] decides whether an existing snapshot argument still describes the
//! runtime value and, if not, produces the replacement literal. It is pure:
//! no filesystem access, no update-mode policy. The engine layers the
//! update-mode decision on top.
//!
//! # Key Functions
//!
//! - [`plan`] / [`plan_with`] - Compare and produce a [`Plan`]
//! - [`values_match`] - Structural comparison with matcher evaluation
//! - [`preserve_matchers`] - Carry matchers from the old snapshot into the new one

pub mod normalize;

pub use normalize::{normalize_text, squash_source, strings_equivalent};

use similar::{ChangeTag, TextDiff};

use crate::codec;
use crate::error::EngineResult;
use crate::literal::{self, Printer, PrintContext, Serializer};
use crate::matchers::{self, MatcherKind};
use crate::model::{display_path, FormattingProfile, Matcher, Value};

/// Outcome of planning one assertion.
#[derive(Clone, Debug, PartialEq)]
pub enum Plan {
    /// The existing snapshot matches; nothing to write.
    Matches,
    /// The argument should become `text`.
    Replace(Rewrite),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Rewrite {
    /// Final source text of the new argument (LF line endings).
    pub text: String,
    /// Serialized form of the previous snapshot, if there was one.
    pub previous: Option<String>,
    /// Matchers from the previous snapshot that could not be kept.
    pub dropped: Vec<DroppedMatcher>,
}

impl Rewrite {
    /// Line diff from the previous snapshot to the new text.
    #[must_use]
    pub fn diff(&self) -> String {
        let previous = self.previous.as_deref().unwrap_or("");
        render_diff(previous, &self.text)
    }
}

/// A matcher that no longer applies to the new value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DroppedMatcher {
    pub path: String,
    pub source: String,
}

/// Inputs to [`plan_with`].
pub struct PlanInput<'a> {
    pub actual: &'a Value,
    /// Raw text of the existing argument, or `None` when the call has none.
    pub existing: Option<&'a str>,
    pub profile: &'a FormattingProfile,
    /// Indentation of the line holding the call.
    pub base_indent: &'a str,
    pub printers: &'a [Box<dyn Printer>],
}

/// Compare `actual` against the existing snapshot text with default
/// printing settings.
pub fn plan(actual: &Value, existing: Option<&str>, profile: &FormattingProfile) -> EngineResult<Plan> {
    plan_with(&PlanInput {
        actual,
        existing,
        profile,
        base_indent: "",
        printers: &[],
    })
}

/// Compare `actual` against the existing snapshot text.
pub fn plan_with(input: &PlanInput<'_>) -> EngineResult<Plan> {
    codec::check_collision(input.actual)?;
    let serializer = Serializer::new(input.profile)
        .with_base_indent(input.base_indent)
        .with_printers(input.printers);

    let existing = input.existing.filter(|text| !text.trim().is_empty());
    let Some(existing) = existing else {
        let text = serializer.serialize(input.actual)?.decode();
        return Ok(Plan::Replace(Rewrite {
            text,
            previous: None,
            dropped: Vec::new(),
        }));
    };

    let expected = literal::parse_source(existing, input.profile.quote)?;
    let comparer = Comparer {
        printers: input.printers,
        profile: input.profile,
    };
    if comparer.matches(&expected, input.actual) {
        return Ok(Plan::Matches);
    }

    let (blended, dropped) = comparer.preserve(&expected, input.actual);
    let text = serializer.serialize(&blended)?.decode();
    let previous = serializer.serialize(&expected)?.decode();
    Ok(Plan::Replace(Rewrite {
        text,
        previous: Some(previous),
        dropped,
    }))
}

/// Structural comparison of an expected snapshot value against a runtime value.
#[must_use]
pub fn values_match(expected: &Value, actual: &Value) -> bool {
    let profile = FormattingProfile::default();
    Comparer {
        printers: &[],
        profile: &profile,
    }
    .matches(expected, actual)
}

/// Copy matchers from `expected` into a clone of `actual` wherever their
/// key path still exists and the matcher accepts the new value there.
#[must_use]
pub fn preserve_matchers(expected: &Value, actual: &Value) -> (Value, Vec<DroppedMatcher>) {
    let profile = FormattingProfile::default();
    Comparer {
        printers: &[],
        profile: &profile,
    }
    .preserve(expected, actual)
}

struct Comparer<'a> {
    printers: &'a [Box<dyn Printer>],
    profile: &'a FormattingProfile,
}

impl Comparer<'_> {
    fn matches(&self, expected: &Value, actual: &Value) -> bool {
        match (expected, actual) {
            (Value::Matcher(want), Value::Matcher(got)) => {
                squash_source(want.source()) == squash_source(got.source())
            }
            (Value::Matcher(matcher), _) => self.matcher_accepts(matcher, actual),
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Value::String(a), Value::String(b)) => strings_equivalent(a, b),
            (Value::Array(a), Value::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(want, got)| self.matches(want, got))
            }
            (Value::Object(a), Value::Object(b)) => {
                let defined = |map: &indexmap::IndexMap<String, Value>| {
                    map.iter()
                        .filter(|(_, value)| !matches!(value, Value::Undefined))
                        .count()
                };
                defined(a) == defined(b)
                    && a.iter().all(|(key, want)| match b.get(key) {
                        Some(got) => self.matches(want, got),
                        None => matches!(want, Value::Undefined),
                    })
            }
            _ => false,
        }
    }

    fn matcher_accepts(&self, matcher: &Matcher, actual: &Value) -> bool {
        if let Some(printer) = self.printers.iter().find(|printer| printer.test(actual)) {
            let ctx = PrintContext {
                profile: self.profile,
                base_indent: "",
                depth: 0,
            };
            let printed = printer.print(actual, &ctx);
            return squash_source(&printed) == squash_source(matcher.source());
        }
        let kind = matchers::classify(matcher);
        let equals = |want: &Value, got: &Value| self.matches(want, got);
        match matchers::evaluate(&kind, actual, &equals) {
            Some(accepted) => accepted,
            None => {
                debug_assert!(matches!(kind, MatcherKind::Unknown));
                tracing::warn!(
                    matcher = matcher.source(),
                    "unrecognized matcher expression; treating as wildcard"
                );
                true
            }
        }
    }

    fn preserve(&self, expected: &Value, actual: &Value) -> (Value, Vec<DroppedMatcher>) {
        let mut blended = actual.clone();
        let mut dropped = Vec::new();
        for (path, matcher) in expected.matchers() {
            let keep = actual
                .get_path(&path)
                .is_some_and(|node| self.matcher_accepts(&matcher, node));
            if keep {
                if let Some(slot) = blended.get_path_mut(&path) {
                    *slot = Value::Matcher(matcher);
                }
            } else {
                let path_text = display_path(&path);
                tracing::warn!(
                    path = %path_text,
                    matcher = matcher.source(),
                    "dropping matcher that no longer applies"
                );
                dropped.push(DroppedMatcher {
                    path: path_text,
                    source: matcher.source().to_string(),
                });
            }
        }
        (blended, dropped)
    }
}

/// Unified-style line diff with `-`, `+` and space prefixes.
#[must_use]
pub fn render_diff(expected: &str, actual: &str) -> String {
    let diff = TextDiff::from_lines(expected, actual);
    let mut out = String::new();
    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => "-",
            ChangeTag::Insert => "+",
            ChangeTag::Equal => " ",
        };
        out.push_str(sign);
        out.push_str(change.value());
        if !change.value().ends_with('\n') {
            out.push('\n');
        }
    }
    out
}
