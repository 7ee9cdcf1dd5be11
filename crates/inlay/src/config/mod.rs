//! Configuration loading and environment resolution.
//!
//! Settings come from three places, most specific first: explicit values in
//! the config file (or CLI flags that override it), then the process
//! environment and arguments, then built-in defaults. The update mode
//! defaults to `none` in CI and `new` everywhere else.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{EngineError, EngineResult, ErrorCode};
use crate::model::{EngineConfig, ResolvedSettings, UpdateMode, CONFIG_VERSION};

/// File names searched by [`discover_config`], in order.
pub const CONFIG_FILE_NAMES: &[&str] = &["inlay.json", "inlay.yaml", "inlay.yml", ".inlay.json"];

/// Environment variable selecting the update mode.
pub const UPDATE_ENV_VAR: &str = "INLAY_UPDATE";

/// Variables whose presence marks a CI run.
const CI_ENV_VARS: &[&str] = &[
    "CI",
    "CONTINUOUS_INTEGRATION",
    "BUILD_NUMBER",
    "RUN_ID",
    "GITHUB_ACTIONS",
    "GITLAB_CI",
    "BUILDKITE",
    "CIRCLECI",
    "TRAVIS",
    "JENKINS_URL",
    "TF_BUILD",
];

/// Command-line flags that request overwriting snapshots.
const UPDATE_FLAGS: &[&str] = &["-u", "--updateSnapshot", "--update-snapshots"];

/// Load a config file. The format follows the extension: `.yaml`/`.yml`
/// is YAML, anything else JSON.
pub fn load_config_file(path: &Path) -> EngineResult<EngineConfig> {
    let data = fs::read_to_string(path)
        .map_err(|err| EngineError::io(format!("failed to read config file {}", path.display()), err))?;
    let name = path.to_string_lossy();
    let config: EngineConfig = if name.ends_with(".yaml") || name.ends_with(".yml") {
        serde_yml::from_str(&data).map_err(|err| EngineError::config("failed to parse yaml config", err))?
    } else {
        serde_json::from_str(&data).map_err(|err| EngineError::config("failed to parse json config", err))?
    };
    validate_config(&config)?;
    Ok(config)
}

/// Look for a config file in `dir`.
pub fn discover_config(dir: &Path) -> EngineResult<Option<(PathBuf, EngineConfig)>> {
    for name in CONFIG_FILE_NAMES {
        let candidate = dir.join(name);
        if candidate.is_file() {
            tracing::debug!(path = %candidate.display(), "loading config");
            let config = load_config_file(&candidate)?;
            return Ok(Some((candidate, config)));
        }
    }
    Ok(None)
}

pub fn validate_config(config: &EngineConfig) -> EngineResult<()> {
    if config.config_version != CONFIG_VERSION {
        return Err(EngineError::new(
            ErrorCode::Config,
            "unsupported config_version",
            Some(serde_json::json!({
                "provided_version": config.config_version,
                "supported_version": CONFIG_VERSION,
            })),
        ));
    }
    if config.method_name.trim().is_empty() {
        return Err(EngineError::new(
            ErrorCode::Config,
            "method_name must not be empty",
            None,
        ));
    }
    if config.print_width == 0 {
        return Err(EngineError::new(
            ErrorCode::Config,
            "print_width must be positive",
            None,
        ));
    }
    Ok(())
}

/// Snapshot of the process environment relevant to update-mode resolution.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Environment {
    pub vars: BTreeMap<String, String>,
    pub args: Vec<String>,
}

impl Environment {
    /// Capture the current process environment and arguments.
    #[must_use]
    pub fn from_process() -> Self {
        Self {
            vars: std::env::vars_os()
                .map(|(key, value)| (key.to_string_lossy().into_owned(), value.to_string_lossy().into_owned()))
                .collect(),
            args: std::env::args_os()
                .map(|arg| arg.to_string_lossy().into_owned())
                .collect(),
        }
    }

    #[must_use]
    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    fn var(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }
}

/// Whether the environment describes a CI run.
#[must_use]
pub fn detect_ci(env: &Environment) -> bool {
    if let Some(value) = env.var("CI") {
        let value = value.trim().to_ascii_lowercase();
        if value == "false" || value == "0" {
            return false;
        }
    }
    CI_ENV_VARS
        .iter()
        .any(|key| env.var(key).is_some_and(|value| !value.trim().is_empty()))
}

/// Update mode requested through arguments or `INLAY_UPDATE`, if any.
#[must_use]
pub fn update_from_env(env: &Environment) -> Option<UpdateMode> {
    if env.args.iter().any(|arg| UPDATE_FLAGS.contains(&arg.as_str())) {
        return Some(UpdateMode::All);
    }
    let raw = env.var(UPDATE_ENV_VAR)?;
    let mode = UpdateMode::parse(raw);
    if mode.is_none() {
        tracing::warn!(value = raw, "ignoring unrecognized {UPDATE_ENV_VAR} value");
    }
    mode
}

/// Merge config and environment into the settings the engine runs with.
#[must_use]
pub fn resolve_environment(config: &EngineConfig, env: &Environment) -> ResolvedSettings {
    let ci = config.ci.unwrap_or_else(|| detect_ci(env));
    let update = config
        .update
        .or_else(|| update_from_env(env))
        .unwrap_or(if ci { UpdateMode::None } else { UpdateMode::New });
    tracing::debug!(?update, ci, "resolved update mode");
    ResolvedSettings { update, ci }
}
