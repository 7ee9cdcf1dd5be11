use serde::{Deserialize, Serialize};

/// Default maximum line width before a literal is broken across lines.
pub const DEFAULT_PRINT_WIDTH: usize = 80;

/// Quote character used for single-line string literals.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteChar {
    #[default]
    Double,
    Single,
}

impl QuoteChar {
    #[must_use]
    pub fn as_char(self) -> char {
        match self {
            QuoteChar::Double => '"',
            QuoteChar::Single => '\'',
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineEnding {
    #[default]
    Lf,
    Crlf,
}

impl LineEnding {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::Crlf => "\r\n",
        }
    }
}

/// Formatting conventions of one source file.
///
/// Generated literals follow the profile of the file they are written into,
/// never a global default, so differently styled files stay different.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormattingProfile {
    /// One level of indentation (`"  "`, `"    "` or `"\t"`).
    pub indent_unit: String,
    pub quote: QuoteChar,
    pub line_ending: LineEnding,
    pub print_width: usize,
}

impl Default for FormattingProfile {
    fn default() -> Self {
        Self {
            indent_unit: "  ".to_string(),
            quote: QuoteChar::Double,
            line_ending: LineEnding::Lf,
            print_width: DEFAULT_PRINT_WIDTH,
        }
    }
}
