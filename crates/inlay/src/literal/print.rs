//! Serializer producing inline snapshot literals.
//!
//! Output is deterministic for a given value, profile and base indentation:
//! serializing the parse of a serialized value yields identical text.
//!
//! # Layout
//!
//! Arrays and objects are printed on one line (`{ a: 1 }`, `[1, 2]`) when
//! that fits the print width and nothing inside spans several lines.
//! Otherwise every entry goes on its own line, one indent unit deeper, with a
//! trailing comma. Multi-line strings become template literals whose content
//! sits one level deeper than the closing backtick.

use crate::codec;
use crate::error::EngineResult;
use crate::model::{FormattingProfile, Matcher, QuoteChar, Value};
use crate::source::{is_ident_char, is_ident_start};

/// Custom printer for values the default layout should not handle.
///
/// A printer's output is inserted verbatim, so it must be valid source in
/// the host language. Values claimed by a printer compare by printed text.
pub trait Printer: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;
    /// Whether this printer handles `value`.
    fn test(&self, value: &Value) -> bool;
    /// Render `value`. Continuation lines must include their own indentation.
    fn print(&self, value: &Value, ctx: &PrintContext<'_>) -> String;
}

/// Position information handed to a [`Printer`].
#[derive(Clone, Copy, Debug)]
pub struct PrintContext<'a> {
    pub profile: &'a FormattingProfile,
    /// Indentation of the line the literal starts on.
    pub base_indent: &'a str,
    /// Nesting depth of the value being printed.
    pub depth: usize,
}

impl PrintContext<'_> {
    /// Indentation for lines at `depth` levels below the base.
    #[must_use]
    pub fn indent(&self, depth: usize) -> String {
        format!("{}{}", self.base_indent, self.profile.indent_unit.repeat(depth))
    }
}

/// Serializer output. `text` still holds placeholder tokens for matchers and
/// custom-printed values; [`SerializedValue::decode`] yields final source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SerializedValue {
    pub text: String,
}

impl SerializedValue {
    #[must_use]
    pub fn decode(&self) -> String {
        codec::decode(&self.text).text
    }
}

/// Configurable serializer.
pub struct Serializer<'a> {
    profile: &'a FormattingProfile,
    base_indent: &'a str,
    printers: &'a [Box<dyn Printer>],
}

impl<'a> Serializer<'a> {
    #[must_use]
    pub fn new(profile: &'a FormattingProfile) -> Self {
        Self {
            profile,
            base_indent: "",
            printers: &[],
        }
    }

    #[must_use]
    pub fn with_base_indent(mut self, base_indent: &'a str) -> Self {
        self.base_indent = base_indent;
        self
    }

    #[must_use]
    pub fn with_printers(mut self, printers: &'a [Box<dyn Printer>]) -> Self {
        self.printers = printers;
        self
    }

    /// Serialize `value`, keeping matchers as placeholder tokens.
    pub fn serialize(&self, value: &Value) -> EngineResult<SerializedValue> {
        codec::check_collision(value)?;
        Ok(SerializedValue {
            text: self.render(value, 0),
        })
    }

    fn ctx(&self, depth: usize) -> PrintContext<'_> {
        PrintContext {
            profile: self.profile,
            base_indent: self.base_indent,
            depth,
        }
    }

    fn render(&self, value: &Value, depth: usize) -> String {
        if let Some(printer) = self.printers.iter().find(|printer| printer.test(value)) {
            tracing::debug!(printer = printer.name(), "custom printer claimed value");
            let printed = printer.print(value, &self.ctx(depth));
            return codec::encode_literal(&printed, self.profile.quote);
        }
        match value {
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => format_number(*n),
            Value::String(text) if text.contains('\n') => self.template(text, depth),
            Value::String(text) => quote_string(text, self.profile.quote),
            Value::Matcher(matcher) => self.matcher(matcher),
            Value::Array(items) => {
                let entries: Vec<String> = items.iter().map(|item| self.render(item, depth + 1)).collect();
                self.container(value, &entries, ('[', ']'), depth)
            }
            Value::Object(map) => {
                let entries: Vec<String> = map
                    .iter()
                    .map(|(key, item)| format!("{}: {}", self.key(key), self.render(item, depth + 1)))
                    .collect();
                self.container(value, &entries, ('{', '}'), depth)
            }
        }
    }

    fn matcher(&self, matcher: &Matcher) -> String {
        codec::encode_literal(matcher.source(), self.profile.quote)
    }

    fn key(&self, key: &str) -> String {
        let mut chars = key.chars();
        let bare = chars.next().is_some_and(|ch| is_ident_start(ch) && ch.is_ascii())
            && chars.all(|ch| is_ident_char(ch) && ch.is_ascii());
        if bare {
            key.to_string()
        } else {
            quote_string(key, self.profile.quote)
        }
    }

    fn container(&self, value: &Value, entries: &[String], (open, close): (char, char), depth: usize) -> String {
        if entries.is_empty() {
            return format!("{open}{close}");
        }
        let multiline = value.contains_multiline_string()
            || entries.iter().any(|entry| codec::decode(entry).text.contains('\n'));
        if !multiline {
            let padding = if open == '{' { " " } else { "" };
            let inline = format!("{open}{padding}{}{padding}{close}", entries.join(", "));
            let used = visual_width(self.base_indent) + visual_width(&self.profile.indent_unit) * depth;
            if used + visual_width(&codec::decode(&inline).text) <= self.profile.print_width {
                return inline;
            }
        }
        let ctx = self.ctx(depth);
        let inner = ctx.indent(depth + 1);
        let mut out = String::new();
        out.push(open);
        for entry in entries {
            out.push('\n');
            out.push_str(&inner);
            out.push_str(entry);
            out.push(',');
        }
        out.push('\n');
        out.push_str(&ctx.indent(depth));
        out.push(close);
        out
    }

    fn template(&self, text: &str, depth: usize) -> String {
        let ctx = self.ctx(depth);
        let content_indent = ctx.indent(depth + 1);
        let mut out = String::from("`");
        for line in text.split('\n') {
            out.push('\n');
            if !line.is_empty() {
                out.push_str(&content_indent);
                out.push_str(&escape_template_line(line));
            }
        }
        out.push('\n');
        out.push_str(&ctx.indent(depth));
        out.push('`');
        out
    }
}

/// Serialize `value` with default settings and return final source text.
pub fn serialize(value: &Value, profile: &FormattingProfile) -> EngineResult<String> {
    Serializer::new(profile).serialize(value).map(|serialized| serialized.decode())
}

fn visual_width(text: &str) -> usize {
    text.chars().map(|ch| if ch == '\t' { 4 } else { 1 }).sum()
}

/// Format a number the way it would be written in source.
#[must_use]
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return if n.is_sign_negative() { "-0" } else { "0" }.to_string();
    }
    let abs = n.abs();
    if !(1e-6..1e21).contains(&abs) {
        format!("{n:e}")
    } else {
        format!("{n}")
    }
}

/// Quote a single-line string with `quote`.
#[must_use]
pub fn quote_string(text: &str, quote: QuoteChar) -> String {
    let q = quote.as_char();
    let mut out = String::with_capacity(text.len() + 2);
    out.push(q);
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            '\u{b}' => out.push_str("\\v"),
            '\0' if !chars.peek().is_some_and(char::is_ascii_digit) => out.push_str("\\0"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c if c == q => {
                out.push('\\');
                out.push(c);
            }
            c if c.is_control() => out.push_str(&format!("\\x{:02x}", u32::from(c))),
            c => out.push(c),
        }
    }
    out.push(q);
    out
}

fn escape_template_line(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut chars = line.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '`' => out.push_str("\\`"),
            '$' if chars.peek() == Some(&'{') => out.push_str("\\$"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\x{:02x}", u32::from(c))),
            c => out.push(c),
        }
    }
    out
}
