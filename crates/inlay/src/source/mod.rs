//! Lexical scanning over source text.
//!
//! The engine never builds a full syntax tree of the test file. It only needs
//! to step over the constructs that could hide a delimiter: string literals,
//! template literals (including `${}` interpolations), comments and regex
//! literals. [`Cursor`] provides those primitives; the literal parser, the
//! placeholder shield and the call-site locator are all built on it.

pub mod profile;

pub use profile::infer_profile;

use crate::error::{EngineError, EngineResult};

/// Byte-offset cursor over UTF-8 source text.
#[derive(Clone, Debug)]
pub struct Cursor<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    #[must_use]
    pub fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    #[must_use]
    pub fn at(text: &'a str, pos: usize) -> Self {
        Self {
            text,
            pos: pos.min(text.len()),
        }
    }

    #[must_use]
    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn set_pos(&mut self, pos: usize) {
        self.pos = pos.min(self.text.len());
    }

    #[must_use]
    pub fn text(&self) -> &'a str {
        self.text
    }

    #[must_use]
    pub fn is_eof(&self) -> bool {
        self.pos >= self.text.len()
    }

    #[must_use]
    pub fn rest(&self) -> &'a str {
        self.text.get(self.pos..).unwrap_or("")
    }

    #[must_use]
    pub fn slice(&self, start: usize, end: usize) -> &'a str {
        self.text.get(start..end).unwrap_or("")
    }

    #[must_use]
    pub fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    #[must_use]
    pub fn peek_second(&self) -> Option<char> {
        self.rest().chars().nth(1)
    }

    #[must_use]
    pub fn starts_with(&self, prefix: &str) -> bool {
        self.rest().starts_with(prefix)
    }

    pub fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    /// Consume `prefix` if the remaining text starts with it.
    pub fn eat(&mut self, prefix: &str) -> bool {
        if self.starts_with(prefix) {
            self.pos += prefix.len();
            true
        } else {
            false
        }
    }

    pub fn eat_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if !pred(ch) {
                break;
            }
            self.pos += ch.len_utf8();
        }
        self.slice(start, self.pos)
    }

    /// Skip whitespace and comments.
    pub fn skip_trivia(&mut self) -> EngineResult<()> {
        loop {
            self.eat_while(char::is_whitespace);
            if self.starts_with("//") {
                self.eat_while(|ch| ch != '\n');
            } else if self.starts_with("/*") {
                let start = self.pos;
                match self.rest().find("*/") {
                    Some(end) => self.pos += end + 2,
                    None => return Err(EngineError::parse("unterminated block comment", start)),
                }
            } else {
                return Ok(());
            }
        }
    }

    /// Consume a quoted string starting at the current quote character.
    pub fn skip_string(&mut self) -> EngineResult<()> {
        let start = self.pos;
        let Some(quote) = self.bump() else {
            return Err(EngineError::parse("expected string", start));
        };
        while let Some(ch) = self.bump() {
            if ch == '\\' {
                self.bump();
            } else if ch == quote {
                return Ok(());
            } else if ch == '\n' {
                break;
            }
        }
        Err(EngineError::parse("unterminated string literal", start))
    }

    /// Consume a template literal starting at the current backtick.
    ///
    /// Returns `true` if the template contains `${}` interpolations.
    pub fn skip_template(&mut self) -> EngineResult<bool> {
        let start = self.pos;
        self.bump();
        let mut interpolated = false;
        loop {
            match self.peek() {
                None => return Err(EngineError::parse("unterminated template literal", start)),
                Some('\\') => {
                    self.bump();
                    self.bump();
                }
                Some('`') => {
                    self.bump();
                    return Ok(interpolated);
                }
                Some('$') if self.peek_second() == Some('{') => {
                    interpolated = true;
                    self.bump();
                    self.skip_balanced()?;
                }
                Some(_) => {
                    self.bump();
                }
            }
        }
    }

    /// Consume a regex literal starting at the current `/`.
    pub fn skip_regex(&mut self) -> EngineResult<()> {
        let start = self.pos;
        self.bump();
        let mut in_class = false;
        while let Some(ch) = self.bump() {
            match ch {
                '\\' => {
                    self.bump();
                }
                '[' => in_class = true,
                ']' => in_class = false,
                '/' if !in_class => {
                    self.eat_while(is_ident_char);
                    return Ok(());
                }
                '\n' => break,
                _ => {}
            }
        }
        Err(EngineError::parse("unterminated regex literal", start))
    }

    /// Consume one token that could contain delimiters (string, template,
    /// comment or regex). Returns `false` if the cursor is not at such a token.
    pub fn skip_opaque_token(&mut self, prev: Option<char>) -> EngineResult<bool> {
        match self.peek() {
            Some('"' | '\'') => self.skip_string().map(|()| true),
            Some('`') => self.skip_template().map(|_| true),
            Some('/') if matches!(self.peek_second(), Some('/' | '*')) => {
                self.skip_trivia().map(|()| true)
            }
            Some('/') if self.slash_starts_regex(prev) => self.skip_regex().map(|()| true),
            _ => Ok(false),
        }
    }

    /// Whether the `/` at the cursor starts a regex literal rather than a division.
    fn slash_starts_regex(&self, prev: Option<char>) -> bool {
        let before = self.text.get(..self.pos).unwrap_or("").trim_end();
        if before.ends_with("++") || before.ends_with("--") {
            return false;
        }
        match prev {
            Some(ch) if is_ident_char(ch) => {
                let head = before.trim_end_matches(is_ident_char);
                let word = before.get(head.len()..).unwrap_or("");
                REGEX_KEYWORDS.contains(&word) && !head.trim_end().ends_with('.')
            }
            _ => regex_allowed_after(prev),
        }
    }

    /// Consume a bracketed group starting at the current `(`, `[` or `{`,
    /// including everything nested inside it.
    pub fn skip_balanced(&mut self) -> EngineResult<()> {
        let start = self.pos;
        let mut stack: Vec<char> = Vec::new();
        let mut prev: Option<char> = None;
        loop {
            let token_start = self.pos;
            if self.skip_opaque_token(prev)? {
                prev = self.slice(token_start, self.pos).chars().last();
                continue;
            }
            let Some(ch) = self.bump() else {
                return Err(EngineError::parse("unbalanced brackets", start));
            };
            match ch {
                '(' | '[' | '{' => stack.push(closer_for(ch)),
                ')' | ']' | '}' => {
                    if stack.pop() != Some(ch) {
                        return Err(EngineError::parse(
                            format!("unexpected '{ch}'"),
                            self.pos.saturating_sub(1),
                        ));
                    }
                    if stack.is_empty() {
                        return Ok(());
                    }
                }
                _ if stack.is_empty() => {
                    return Err(EngineError::parse("expected an opening bracket", start));
                }
                _ => {}
            }
            if !ch.is_whitespace() {
                prev = Some(ch);
            }
        }
    }

    /// Advance to the end of an expression: the next `,`, `)`, `]` or `}` at
    /// nesting depth zero, or end of input. The delimiter is not consumed.
    pub fn skip_expression(&mut self) -> EngineResult<()> {
        let mut prev: Option<char> = None;
        loop {
            let token_start = self.pos;
            if self.skip_opaque_token(prev)? {
                prev = self.slice(token_start, self.pos).chars().last();
                continue;
            }
            match self.peek() {
                None | Some(',' | ')' | ']' | '}') => return Ok(()),
                Some('(' | '[' | '{') => {
                    self.skip_balanced()?;
                    prev = Some(')');
                }
                Some(ch) => {
                    self.bump();
                    if !ch.is_whitespace() {
                        prev = Some(ch);
                    }
                }
            }
        }
    }
}

#[must_use]
pub fn closer_for(open: char) -> char {
    match open {
        '(' => ')',
        '[' => ']',
        _ => '}',
    }
}

#[must_use]
pub fn is_ident_start(ch: char) -> bool {
    ch == '_' || ch == '$' || ch.is_alphabetic()
}

#[must_use]
pub fn is_ident_char(ch: char) -> bool {
    ch == '_' || ch == '$' || ch.is_alphanumeric()
}

/// Keywords after which an expression, and so a regex literal, may start.
const REGEX_KEYWORDS: &[&str] = &[
    "return", "typeof", "instanceof", "case", "in", "of", "void", "yield", "await", "delete", "throw", "new",
    "else", "do",
];

/// Whether a `/` following the punctuator `prev` starts a regex literal.
fn regex_allowed_after(prev: Option<char>) -> bool {
    match prev {
        None => true,
        Some(ch) => matches!(
            ch,
            '(' | ',' | '=' | ':' | '[' | '!' | '&' | '|' | '?' | '{' | '}' | ';' | '+' | '-' | '*' | '%' | '<' | '>' | '~' | '^'
        ),
    }
}

/// Byte offset where 1-based `line` starts, or `None` past the end of text.
#[must_use]
pub fn line_start_offset(text: &str, line: u32) -> Option<usize> {
    if line == 0 {
        return None;
    }
    if line == 1 {
        return Some(0);
    }
    let mut seen = 1;
    for (idx, byte) in text.bytes().enumerate() {
        if byte == b'\n' {
            seen += 1;
            if seen == line {
                return Some(idx + 1);
            }
        }
    }
    None
}

/// Leading whitespace of the line containing `offset`.
#[must_use]
pub fn indentation_at(text: &str, offset: usize) -> &str {
    let head = text.get(..offset.min(text.len())).unwrap_or("");
    let line_start = head.rfind('\n').map_or(0, |idx| idx + 1);
    let line = text.get(line_start..).unwrap_or("");
    let width = line
        .find(|ch: char| ch != ' ' && ch != '\t')
        .unwrap_or(line.len());
    line.get(..width).unwrap_or("")
}
