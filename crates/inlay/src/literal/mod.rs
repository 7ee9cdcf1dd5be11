//! Literal grammar for inline snapshot arguments.
//!
//! The grammar is a superset of JSON in the flavor of JavaScript object
//! literals: single or double quoted strings, backtick templates without
//! interpolation, unquoted keys, trailing commas, comments, `undefined`,
//! `NaN` and `Infinity`. Opaque expressions are expected to have been
//! replaced by [`crate::codec::shield`] beforehand; placeholder strings parse
//! to [`Value::Matcher`].
//!
//! # Key Functions
//!
//! - [`parse`] - Parse a shielded literal into a [`Value`]
//! - [`parse_source`] - Shield and parse raw snapshot text in one step
//! - [`strip_template_indentation`] - Undo the indentation added when a
//!   multi-line string was printed as a template

pub mod print;

pub use print::{serialize, Printer, PrintContext, SerializedValue, Serializer};

use indexmap::IndexMap;

use crate::codec;
use crate::error::{EngineError, EngineResult};
use crate::model::{QuoteChar, Value};
use crate::source::{is_ident_char, is_ident_start, Cursor};

/// Parse literal text (already shielded) into a value.
pub fn parse(text: &str) -> EngineResult<Value> {
    let mut parser = LiteralParser {
        cursor: Cursor::new(text),
    };
    let value = parser.value()?;
    parser.cursor.skip_trivia()?;
    if !parser.cursor.is_eof() {
        return Err(EngineError::parse(
            "unexpected trailing input after snapshot value",
            parser.cursor.pos(),
        ));
    }
    Ok(value)
}

/// Shield opaque expressions in raw snapshot text, then parse it.
pub fn parse_source(text: &str, quote: QuoteChar) -> EngineResult<Value> {
    let shielded = codec::shield(text, quote)?;
    parse(&shielded.text)
}

struct LiteralParser<'a> {
    cursor: Cursor<'a>,
}

impl LiteralParser<'_> {
    fn value(&mut self) -> EngineResult<Value> {
        self.cursor.skip_trivia()?;
        let start = self.cursor.pos();
        match self.cursor.peek() {
            Some('{') => self.object(),
            Some('[') => self.array(),
            Some('"' | '\'') => {
                let text = self.string()?;
                Ok(match codec::decode_token(&text) {
                    Some(source) => Value::matcher(source),
                    None => Value::String(text),
                })
            }
            Some('`') => self.template().map(Value::String),
            Some(ch) if ch.is_ascii_digit() || matches!(ch, '.' | '-' | '+') => self.number(),
            Some(ch) if is_ident_start(ch) => {
                let word = self.cursor.eat_while(is_ident_char);
                match word {
                    "true" => Ok(Value::Bool(true)),
                    "false" => Ok(Value::Bool(false)),
                    "null" => Ok(Value::Null),
                    "undefined" => Ok(Value::Undefined),
                    "NaN" => Ok(Value::Number(f64::NAN)),
                    "Infinity" => Ok(Value::Number(f64::INFINITY)),
                    other => Err(EngineError::parse(format!("unexpected identifier '{other}'"), start)),
                }
            }
            Some(ch) => Err(EngineError::parse(format!("unexpected character '{ch}'"), start)),
            None => Err(EngineError::parse("expected a value", start)),
        }
    }

    fn object(&mut self) -> EngineResult<Value> {
        self.cursor.bump();
        let mut map = IndexMap::new();
        loop {
            self.cursor.skip_trivia()?;
            if self.cursor.eat("}") {
                return Ok(Value::Object(map));
            }
            let key = self.key()?;
            self.cursor.skip_trivia()?;
            if !self.cursor.eat(":") {
                return Err(EngineError::parse("expected ':' after object key", self.cursor.pos()));
            }
            let value = self.value()?;
            map.insert(key, value);
            self.cursor.skip_trivia()?;
            if !self.cursor.eat(",") && self.cursor.peek() != Some('}') {
                return Err(EngineError::parse("expected ',' or '}' in object", self.cursor.pos()));
            }
        }
    }

    fn key(&mut self) -> EngineResult<String> {
        let start = self.cursor.pos();
        match self.cursor.peek() {
            Some('"' | '\'') => self.string(),
            Some(ch) if is_ident_char(ch) => Ok(self.cursor.eat_while(is_ident_char).to_string()),
            _ => Err(EngineError::parse("expected an object key", start)),
        }
    }

    fn array(&mut self) -> EngineResult<Value> {
        self.cursor.bump();
        let mut items = Vec::new();
        loop {
            self.cursor.skip_trivia()?;
            if self.cursor.eat("]") {
                return Ok(Value::Array(items));
            }
            items.push(self.value()?);
            self.cursor.skip_trivia()?;
            if !self.cursor.eat(",") && self.cursor.peek() != Some(']') {
                return Err(EngineError::parse("expected ',' or ']' in array", self.cursor.pos()));
            }
        }
    }

    fn string(&mut self) -> EngineResult<String> {
        let start = self.cursor.pos();
        self.cursor.skip_string()?;
        let raw = self.cursor.slice(start, self.cursor.pos());
        let body = raw
            .get(1..raw.len().saturating_sub(1))
            .ok_or_else(|| EngineError::parse("malformed string literal", start))?;
        cook(body, start + 1)
    }

    fn template(&mut self) -> EngineResult<String> {
        let start = self.cursor.pos();
        if self.cursor.skip_template()? {
            return Err(EngineError::parse(
                "template interpolation is not a literal value",
                start,
            ));
        }
        let raw = self.cursor.slice(start, self.cursor.pos());
        let body = raw
            .get(1..raw.len().saturating_sub(1))
            .ok_or_else(|| EngineError::parse("malformed template literal", start))?;
        let body = body.replace("\r\n", "\n");
        cook(&strip_template_indentation(&body), start + 1)
    }

    fn number(&mut self) -> EngineResult<Value> {
        let start = self.cursor.pos();
        let negative = match self.cursor.peek() {
            Some('-') => {
                self.cursor.bump();
                true
            }
            Some('+') => {
                self.cursor.bump();
                false
            }
            _ => false,
        };
        let magnitude = if self.cursor.eat("Infinity") {
            f64::INFINITY
        } else {
            let digits_start = self.cursor.pos();
            loop {
                let word = self
                    .cursor
                    .eat_while(|ch| ch.is_ascii_alphanumeric() || ch == '.' || ch == '_');
                let hex = word.starts_with("0x") || word.starts_with("0X");
                if !hex && word.ends_with(['e', 'E']) && matches!(self.cursor.peek(), Some('-' | '+')) {
                    self.cursor.bump();
                    continue;
                }
                break;
            }
            let text = self.cursor.slice(digits_start, self.cursor.pos());
            parse_number(text).ok_or_else(|| EngineError::parse(format!("invalid number '{text}'"), start))?
        };
        Ok(Value::Number(if negative { -magnitude } else { magnitude }))
    }
}

fn parse_number(text: &str) -> Option<f64> {
    let cleaned: String = text.chars().filter(|ch| *ch != '_').collect();
    let cleaned = cleaned.strip_suffix('n').unwrap_or(&cleaned);
    match cleaned.get(..2) {
        Some("0x" | "0X") => parse_radix(cleaned.get(2..)?, 16),
        Some("0o" | "0O") => parse_radix(cleaned.get(2..)?, 8),
        Some("0b" | "0B") => parse_radix(cleaned.get(2..)?, 2),
        _ => {
            let valid = !cleaned.is_empty()
                && cleaned
                    .chars()
                    .all(|ch| ch.is_ascii_digit() || matches!(ch, '.' | 'e' | 'E' | '+' | '-'))
                && cleaned.chars().any(|ch| ch.is_ascii_digit());
            if valid {
                cleaned.parse::<f64>().ok()
            } else {
                None
            }
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn parse_radix(digits: &str, radix: u32) -> Option<f64> {
    u64::from_str_radix(digits, radix).ok().map(|n| n as f64)
}

/// Resolve escape sequences in a string or template body.
fn cook(body: &str, offset: usize) -> EngineResult<String> {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.char_indices().peekable();
    while let Some((idx, ch)) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        let Some((_, escaped)) = chars.next() else {
            return Err(EngineError::parse("dangling escape", offset + idx));
        };
        match escaped {
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'v' => out.push('\u{b}'),
            '0' if !chars.peek().is_some_and(|(_, next)| next.is_ascii_digit()) => out.push('\0'),
            '\n' => {}
            '\r' => {
                if chars.peek().is_some_and(|(_, next)| *next == '\n') {
                    chars.next();
                }
            }
            'x' => {
                let hex: String = chars.by_ref().take(2).map(|(_, c)| c).collect();
                out.push(hex_char(&hex).ok_or_else(|| EngineError::parse("invalid \\x escape", offset + idx))?);
            }
            'u' => {
                let code = if chars.peek().is_some_and(|(_, next)| *next == '{') {
                    chars.next();
                    let hex: String = chars.by_ref().map(|(_, c)| c).take_while(|c| *c != '}').collect();
                    hex_code(&hex)
                } else {
                    let hex: String = chars.by_ref().take(4).map(|(_, c)| c).collect();
                    hex_code(&hex)
                };
                let code = code.ok_or_else(|| EngineError::parse("invalid \\u escape", offset + idx))?;
                out.push(decode_code_unit(code, &mut chars));
            }
            other => out.push(other),
        }
    }
    Ok(out)
}

fn hex_code(hex: &str) -> Option<u32> {
    if hex.is_empty() || hex.len() > 6 {
        return None;
    }
    u32::from_str_radix(hex, 16).ok()
}

fn hex_char(hex: &str) -> Option<char> {
    if hex.len() != 2 {
        return None;
    }
    hex_code(hex).and_then(char::from_u32)
}

/// Combine a UTF-16 surrogate pair written as two `\u` escapes.
fn decode_code_unit(
    code: u32,
    chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>,
) -> char {
    if (0xD800..0xDC00).contains(&code) {
        let mut lookahead = chars.clone();
        let is_pair = lookahead.next().is_some_and(|(_, c)| c == '\\')
            && lookahead.next().is_some_and(|(_, c)| c == 'u');
        if is_pair {
            let hex: String = lookahead.by_ref().take(4).map(|(_, c)| c).collect();
            if let Some(low) = hex_code(&hex).filter(|low| (0xDC00..0xE000).contains(low)) {
                *chars = lookahead;
                let combined = 0x10000 + ((code - 0xD800) << 10) + (low - 0xDC00);
                return char::from_u32(combined).unwrap_or(char::REPLACEMENT_CHARACTER);
            }
        }
    }
    char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER)
}

/// Undo the layout applied when a multi-line string was printed as a
/// template literal.
///
/// Only templates whose content starts on the line after the opening
/// backtick are treated this way; anything else is returned unchanged. The
/// leading newline is dropped, a final line holding only the closing
/// indentation is dropped, and the common indentation of the remaining
/// non-blank lines is removed.
#[must_use]
pub fn strip_template_indentation(raw: &str) -> String {
    let Some(body) = raw.strip_prefix('\n') else {
        return raw.to_string();
    };
    let body = match body.rfind('\n') {
        Some(idx) if body.get(idx + 1..).is_some_and(|tail| tail.trim().is_empty()) => {
            body.get(..idx).unwrap_or("")
        }
        None if body.trim().is_empty() => "",
        _ => body,
    };
    dedent(body)
}

/// Remove the common leading whitespace of all non-blank lines. Blank lines
/// become empty.
#[must_use]
pub fn dedent(text: &str) -> String {
    let indent = text
        .split('\n')
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start_matches([' ', '\t']).len())
        .min()
        .unwrap_or(0);
    text.split('\n')
        .map(|line| {
            if line.trim().is_empty() {
                ""
            } else {
                line.get(indent..).unwrap_or(line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
