pub mod config;
pub mod driver;
pub mod profile;
pub mod site;
pub mod value;

pub use config::{EngineConfig, FormatterCommand, ResolvedSettings, UpdateMode, CONFIG_VERSION};
pub use driver::*;
pub use profile::{FormattingProfile, LineEnding, QuoteChar};
pub use site::{CallSite, Replacement};
pub use value::{display_path, Matcher, PathSegment, Value};

/// Maximum length for user-supplied regex patterns (from `expect.stringMatching`).
pub const MAX_REGEX_PATTERN_LEN: usize = 1000;
