use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Source location of an assertion statement.
///
/// Lines and columns are 1-based, matching what stack traces report.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallSite {
    pub file: PathBuf,
    pub line: u32,
    #[serde(default = "default_column")]
    pub column: u32,
}

fn default_column() -> u32 {
    1
}

impl CallSite {
    pub fn new(file: impl Into<PathBuf>, line: u32, column: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }

    /// Build a call site from Rust caller location data.
    ///
    /// Pair with `#[track_caller]` on the assertion helper so the location is
    /// the user's call rather than the helper itself.
    #[must_use]
    pub fn from_location(location: &std::panic::Location<'_>) -> Self {
        Self::new(location.file(), location.line(), location.column())
    }
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file.display(), self.line, self.column)
    }
}

/// A pending edit to one source file.
///
/// `[start, end)` are byte offsets into the file text as it was read when the
/// assertion ran; an empty range is an insertion point.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replacement {
    pub file: PathBuf,
    pub start: usize,
    pub end: usize,
    pub text: String,
    /// Exact text the range covered when the edit was planned.
    pub original: String,
    /// Scheduling order within the run, assigned by the registry.
    #[serde(default)]
    pub sequence: u64,
}

impl Replacement {
    #[must_use]
    pub fn overlaps(&self, other: &Replacement) -> bool {
        if self.start == self.end || other.start == other.end {
            // insertion points only collide when they share an offset
            return self.start == other.start
                || (other.start > self.start && other.start < self.end)
                || (self.start > other.start && self.start < other.end);
        }
        self.start < other.end && other.start < self.end
    }
}
