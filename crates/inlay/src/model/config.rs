use serde::{Deserialize, Serialize};

use crate::model::profile::DEFAULT_PRINT_WIDTH;

/// Current configuration format version.
pub const CONFIG_VERSION: u32 = 1;

/// Method name the locator searches for by default.
pub const DEFAULT_METHOD_NAME: &str = "toMatchInlineSnapshot";

/// Which snapshots may be written during a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateMode {
    /// Never write; every mismatch and every missing snapshot fails.
    None,
    /// Write snapshots that do not exist yet; mismatches fail.
    New,
    /// Overwrite mismatching snapshots and write missing ones.
    All,
}

impl UpdateMode {
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "none" | "0" | "false" | "no" => Some(UpdateMode::None),
            "new" => Some(UpdateMode::New),
            "all" | "1" | "true" | "yes" => Some(UpdateMode::All),
            _ => None,
        }
    }

    #[must_use]
    pub fn allows_new(self) -> bool {
        matches!(self, UpdateMode::New | UpdateMode::All)
    }

    #[must_use]
    pub fn allows_overwrite(self) -> bool {
        matches!(self, UpdateMode::All)
    }
}

/// External formatter invocation. `{file}` in `args` is replaced by the path
/// of the file being written.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FormatterCommand {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
}

/// Engine configuration as written in `inlay.json` / `inlay.yaml`.
///
/// `update` and `ci` are optional: when absent they are resolved from the
/// environment (see [`crate::config::resolve_environment`]).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    #[serde(default = "default_config_version")]
    pub config_version: u32,
    #[serde(default)]
    pub update: Option<UpdateMode>,
    #[serde(default)]
    pub ci: Option<bool>,
    #[serde(default = "default_method_name")]
    pub method_name: String,
    /// Glob patterns for stack frames that belong to the engine or the
    /// assertion library rather than to user code.
    #[serde(default = "default_ignore")]
    pub ignore: Vec<String>,
    #[serde(default = "default_print_width")]
    pub print_width: usize,
    #[serde(default)]
    pub formatter: Option<FormatterCommand>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            config_version: CONFIG_VERSION,
            update: None,
            ci: None,
            method_name: default_method_name(),
            ignore: default_ignore(),
            print_width: DEFAULT_PRINT_WIDTH,
            formatter: None,
        }
    }
}

fn default_config_version() -> u32 {
    CONFIG_VERSION
}

fn default_method_name() -> String {
    DEFAULT_METHOD_NAME.to_string()
}

fn default_print_width() -> usize {
    DEFAULT_PRINT_WIDTH
}

/// Frames that never belong to a test file.
pub fn default_ignore() -> Vec<String> {
    vec![
        "**/node_modules/**".to_string(),
        "node:*".to_string(),
        "internal/**".to_string(),
        "<anonymous>".to_string(),
        "**/inlay/src/**".to_string(),
        "/rustc/**".to_string(),
        "**/library/std/src/**".to_string(),
        "**/library/core/src/**".to_string(),
    ]
}

/// Settings after merging config file, environment and CLI flags.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ResolvedSettings {
    pub update: UpdateMode,
    pub ci: bool,
}
