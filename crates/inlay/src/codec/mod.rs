//! Placeholder codec for opaque source expressions.
//!
//! Hand-written snapshots may contain expressions the literal grammar cannot
//! represent, such as `expect.any(Number)`. Before parsing, [`shield`]
//! replaces each of them with a string literal holding [`MARKER`] followed by
//! the base64 of the original text. The literal parser turns those strings
//! into [`Value::Matcher`](crate::model::Value::Matcher) nodes, the printer
//! emits them as tokens again, and [`decode`] restores the original source in
//! the final patch.
//!
//! A runtime string that contains the marker is rejected with
//! `E_MARKER_COLLISION` instead of being silently rewritten.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use regex::Regex;
use std::sync::OnceLock;

use crate::error::{EngineError, EngineResult, ErrorCode};
use crate::model::{QuoteChar, Value};
use crate::source::{is_ident_char, is_ident_start, Cursor};

/// Prefix identifying an encoded placeholder string.
pub const MARKER: &str = "__INLAY_OPAQUE_EXPRESSION_7c2e91d4__:";

/// Identifiers that are part of the literal grammar.
const LITERAL_KEYWORDS: &[&str] = &["true", "false", "null", "undefined", "NaN", "Infinity"];

/// Text whose opaque expressions have been replaced by placeholder tokens.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Shielded {
    pub text: String,
    /// Original source of every placeholder, in order of appearance.
    pub payload: Vec<String>,
}

/// Result of [`decode`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Decoded {
    pub text: String,
    pub payload: Vec<String>,
}

/// Encode opaque source text as a placeholder token value (unquoted).
#[must_use]
pub fn encode(source: &str) -> String {
    format!("{MARKER}{}", STANDARD.encode(source.as_bytes()))
}

/// Encode opaque source text as a quoted string literal.
#[must_use]
pub fn encode_literal(source: &str, quote: QuoteChar) -> String {
    let q = quote.as_char();
    format!("{q}{}{q}", encode(source))
}

/// Decode a single token value produced by [`encode`].
#[must_use]
pub fn decode_token(value: &str) -> Option<String> {
    let payload = value.strip_prefix(MARKER)?;
    let bytes = STANDARD.decode(payload).ok()?;
    String::from_utf8(bytes).ok()
}

fn token_regex() -> &'static Regex {
    static TOKEN: OnceLock<Regex> = OnceLock::new();
    TOKEN.get_or_init(|| {
        let pattern = format!(r#"["']{}([A-Za-z0-9+/=]*)["']"#, regex::escape(MARKER));
        #[allow(clippy::expect_used)]
        Regex::new(&pattern).expect("placeholder pattern is a valid regex")
    })
}

/// Replace every quoted placeholder token in `text` with its original source.
#[must_use]
pub fn decode(text: &str) -> Decoded {
    let mut payload = Vec::new();
    let decoded = token_regex().replace_all(text, |caps: &regex::Captures<'_>| {
        let whole = caps.get(0).map_or("", |m| m.as_str());
        let encoded = caps.get(1).map_or("", |m| m.as_str());
        match decode_token(&format!("{MARKER}{encoded}")) {
            Some(source) => {
                payload.push(source.clone());
                source
            }
            None => whole.to_string(),
        }
    });
    Decoded {
        text: decoded.into_owned(),
        payload,
    }
}

/// Fail if any string or object key inside `value` contains the marker.
pub fn check_collision(value: &Value) -> EngineResult<()> {
    match value {
        Value::String(text) if text.contains(MARKER) => Err(collision("snapshot string")),
        Value::Array(items) => items.iter().try_for_each(check_collision),
        Value::Object(map) => {
            if map.keys().any(|key| key.contains(MARKER)) {
                return Err(collision("snapshot object key"));
            }
            map.values().try_for_each(check_collision)
        }
        _ => Ok(()),
    }
}

fn collision(what: &str) -> EngineError {
    EngineError::new(
        ErrorCode::MarkerCollision,
        format!("{what} contains the reserved placeholder marker"),
        Some(serde_json::json!({ "marker": MARKER })),
    )
}

/// Replace non-literal sub-expressions of `text` with placeholder tokens.
///
/// Whitespace and comments are copied through unchanged so error offsets
/// reported by the literal parser stay meaningful for the literal parts.
pub fn shield(text: &str, quote: QuoteChar) -> EngineResult<Shielded> {
    if text.contains(MARKER) {
        return Err(EngineError::new(
            ErrorCode::MarkerCollision,
            "existing snapshot contains the reserved placeholder marker",
            None,
        ));
    }
    let mut shielder = Shielder {
        cursor: Cursor::new(text),
        out: String::with_capacity(text.len()),
        payload: Vec::new(),
        quote,
    };
    shielder.value()?;
    shielder.copy_trivia()?;
    if !shielder.cursor.is_eof() {
        return Err(EngineError::parse(
            "unexpected trailing input in snapshot",
            shielder.cursor.pos(),
        ));
    }
    Ok(Shielded {
        text: shielder.out,
        payload: shielder.payload,
    })
}

struct Shielder<'a> {
    cursor: Cursor<'a>,
    out: String,
    payload: Vec<String>,
    quote: QuoteChar,
}

impl Shielder<'_> {
    fn copy_trivia(&mut self) -> EngineResult<()> {
        let start = self.cursor.pos();
        self.cursor.skip_trivia()?;
        let text = self.cursor.slice(start, self.cursor.pos());
        self.out.push_str(text);
        Ok(())
    }

    fn copy_from(&mut self, start: usize) {
        let text = self.cursor.slice(start, self.cursor.pos());
        self.out.push_str(text);
    }

    fn value(&mut self) -> EngineResult<()> {
        self.copy_trivia()?;
        let start = self.cursor.pos();
        match self.cursor.peek() {
            Some('{') => self.object(),
            Some('[') => self.array(),
            Some('"' | '\'') => {
                self.cursor.skip_string()?;
                self.finish_scalar(start)
            }
            Some('`') => {
                if self.cursor.skip_template()? {
                    self.opaque(start)
                } else {
                    self.finish_scalar(start)
                }
            }
            Some(ch) if ch.is_ascii_digit() || matches!(ch, '.' | '-' | '+') => {
                if self.number_like() {
                    self.finish_scalar(start)
                } else {
                    self.opaque(start)
                }
            }
            Some(ch) if is_ident_start(ch) => {
                let word = self.cursor.eat_while(is_ident_char);
                if LITERAL_KEYWORDS.contains(&word) {
                    self.finish_scalar(start)
                } else {
                    self.opaque(start)
                }
            }
            _ => self.opaque(start),
        }
    }

    /// Consume a signed numeric token. Returns `false` when the token is not
    /// a number literal (`-someVar`, `+x`).
    fn number_like(&mut self) -> bool {
        if matches!(self.cursor.peek(), Some('-' | '+')) {
            self.cursor.bump();
        }
        let body = self.cursor.pos();
        let leading_digit = match (self.cursor.peek(), self.cursor.peek_second()) {
            (Some(ch), _) if ch.is_ascii_digit() => true,
            (Some('.'), Some(next)) => next.is_ascii_digit(),
            _ => false,
        };
        self.eat_number_body();
        leading_digit || self.cursor.slice(body, self.cursor.pos()) == "Infinity"
    }

    fn eat_number_body(&mut self) {
        loop {
            let word = self
                .cursor
                .eat_while(|ch| ch.is_ascii_alphanumeric() || ch == '.' || ch == '_');
            let exponent_sign = word.ends_with(['e', 'E'])
                && !word.starts_with("0x")
                && !word.starts_with("0X")
                && matches!(self.cursor.peek(), Some('-' | '+'));
            if !exponent_sign {
                return;
            }
            self.cursor.bump();
        }
    }

    /// Accept a scalar only if it is a complete value; `1 + 2` or
    /// `"a".repeat(3)` become opaque.
    fn finish_scalar(&mut self, start: usize) -> EngineResult<()> {
        let mut probe = self.cursor.clone();
        probe.skip_trivia()?;
        match probe.peek() {
            None | Some(',' | ']' | '}' | ')') => {
                self.copy_from(start);
                Ok(())
            }
            Some(_) => self.opaque(start),
        }
    }

    fn opaque(&mut self, start: usize) -> EngineResult<()> {
        self.cursor.set_pos(start);
        self.cursor.skip_expression()?;
        let raw = self.cursor.slice(start, self.cursor.pos());
        let source = raw.trim_end();
        if source.is_empty() {
            return Err(EngineError::parse("expected a value", start));
        }
        self.cursor.set_pos(start + source.len());
        self.out.push_str(&encode_literal(source, self.quote));
        self.payload.push(source.to_string());
        Ok(())
    }

    fn object(&mut self) -> EngineResult<()> {
        self.cursor.bump();
        self.out.push('{');
        loop {
            self.copy_trivia()?;
            if self.cursor.eat("}") {
                self.out.push('}');
                return Ok(());
            }
            self.key()?;
            self.copy_trivia()?;
            if !self.cursor.eat(":") {
                return Err(EngineError::parse("expected ':' after object key", self.cursor.pos()));
            }
            self.out.push(':');
            self.value()?;
            self.copy_trivia()?;
            if self.cursor.eat(",") {
                self.out.push(',');
            } else if self.cursor.peek() != Some('}') {
                return Err(EngineError::parse("expected ',' or '}' in object", self.cursor.pos()));
            }
        }
    }

    fn key(&mut self) -> EngineResult<()> {
        let start = self.cursor.pos();
        match self.cursor.peek() {
            Some('"' | '\'') => self.cursor.skip_string()?,
            Some(ch) if is_ident_char(ch) => {
                self.cursor.eat_while(is_ident_char);
            }
            _ => return Err(EngineError::parse("expected an object key", start)),
        }
        self.copy_from(start);
        Ok(())
    }

    fn array(&mut self) -> EngineResult<()> {
        self.cursor.bump();
        self.out.push('[');
        loop {
            self.copy_trivia()?;
            if self.cursor.eat("]") {
                self.out.push(']');
                return Ok(());
            }
            self.value()?;
            self.copy_trivia()?;
            if self.cursor.eat(",") {
                self.out.push(',');
            } else if self.cursor.peek() != Some(']') {
                return Err(EngineError::parse("expected ',' or ']' in array", self.cursor.pos()));
            }
        }
    }
}
