// Test module - relaxed lint rules
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(missing_docs)]

//! Config files and update-mode resolution.

use inlay::config::{
    detect_ci, discover_config, load_config_file, resolve_environment, update_from_env, Environment,
    UPDATE_ENV_VAR,
};
use inlay::model::{EngineConfig, FormatterCommand, ResolvedSettings, UpdateMode};
use inlay::{Engine, ErrorCode};
use inlay_fixtures::{temp_dir, write_source};

fn resolve(config: &EngineConfig, env: &Environment) -> ResolvedSettings {
    resolve_environment(config, env)
}

#[test]
fn json_config_fills_defaults() {
    let dir = temp_dir("cfg-json");
    let path = write_source(dir.path(), "inlay.json", r#"{ "print_width": 100, "update": "all" }"#);
    let config = load_config_file(&path).unwrap();
    assert_eq!(config.print_width, 100);
    assert_eq!(config.update, Some(UpdateMode::All));
    assert_eq!(config.method_name, "toMatchInlineSnapshot");
    assert!(!config.ignore.is_empty());
}

#[test]
fn yaml_config_with_formatter() {
    let dir = temp_dir("cfg-yaml");
    let path = write_source(
        dir.path(),
        "inlay.yaml",
        "config_version: 1\nmethod_name: toMatchInline\nci: false\nformatter:\n  command: prettier\n  args: [\"--stdin-filepath\", \"{file}\"]\n",
    );
    let config = load_config_file(&path).unwrap();
    assert_eq!(config.method_name, "toMatchInline");
    assert_eq!(config.ci, Some(false));
    assert_eq!(
        config.formatter,
        Some(FormatterCommand {
            command: "prettier".to_string(),
            args: vec!["--stdin-filepath".to_string(), "{file}".to_string()],
        })
    );
}

#[test]
fn unknown_fields_are_rejected() {
    let dir = temp_dir("cfg-unknown");
    let path = write_source(dir.path(), "inlay.json", r#"{ "printWidth": 100 }"#);
    let err = load_config_file(&path).unwrap_err();
    assert_eq!(err.code, ErrorCode::Config);
}

#[test]
fn invalid_values_are_rejected() {
    let dir = temp_dir("cfg-invalid");
    for body in [
        r#"{ "config_version": 2 }"#,
        r#"{ "method_name": "  " }"#,
        r#"{ "print_width": 0 }"#,
    ] {
        let path = write_source(dir.path(), "inlay.json", body);
        let err = load_config_file(&path).unwrap_err();
        assert_eq!(err.code, ErrorCode::Config, "{body} should be rejected");
    }
}

#[test]
fn engine_rejects_invalid_config() {
    let config = EngineConfig {
        method_name: String::new(),
        ..EngineConfig::default()
    };
    let settings = ResolvedSettings {
        update: UpdateMode::New,
        ci: false,
    };
    let err = Engine::new(config, settings).err().unwrap();
    assert_eq!(err.code, ErrorCode::Config);
}

#[test]
fn discover_prefers_json_and_reports_absence() {
    let dir = temp_dir("cfg-discover");
    assert!(discover_config(dir.path()).unwrap().is_none());

    write_source(dir.path(), "inlay.yml", "print_width: 60\n");
    let (path, config) = discover_config(dir.path()).unwrap().unwrap();
    assert!(path.ends_with("inlay.yml"));
    assert_eq!(config.print_width, 60);

    write_source(dir.path(), "inlay.json", r#"{ "print_width": 70 }"#);
    let (path, config) = discover_config(dir.path()).unwrap().unwrap();
    assert!(path.ends_with("inlay.json"));
    assert_eq!(config.print_width, 70);
}

#[test]
fn local_runs_write_new_snapshots_only() {
    let settings = resolve(&EngineConfig::default(), &Environment::default());
    assert_eq!(
        settings,
        ResolvedSettings {
            update: UpdateMode::New,
            ci: false,
        }
    );
}

#[test]
fn ci_runs_write_nothing_by_default() {
    for var in ["CI", "GITHUB_ACTIONS", "BUILDKITE"] {
        let env = Environment::default().with_var(var, "true");
        assert!(detect_ci(&env), "{var} should mark CI");
        assert_eq!(resolve(&EngineConfig::default(), &env).update, UpdateMode::None);
    }
}

#[test]
fn ci_false_disables_detection() {
    let env = Environment::default()
        .with_var("CI", "false")
        .with_var("GITHUB_ACTIONS", "true");
    assert!(!detect_ci(&env));
}

#[test]
fn update_flag_and_variable_override_ci_default() {
    let env = Environment::default().with_var("CI", "1").with_arg("-u");
    assert_eq!(update_from_env(&env), Some(UpdateMode::All));
    assert_eq!(resolve(&EngineConfig::default(), &env).update, UpdateMode::All);

    let env = Environment::default().with_var("CI", "1").with_var(UPDATE_ENV_VAR, "new");
    assert_eq!(resolve(&EngineConfig::default(), &env).update, UpdateMode::New);
}

#[test]
fn unrecognized_update_variable_is_ignored() {
    let env = Environment::default().with_var(UPDATE_ENV_VAR, "sometimes");
    assert_eq!(update_from_env(&env), None);
    assert_eq!(resolve(&EngineConfig::default(), &env).update, UpdateMode::New);
}

#[test]
fn config_values_win_over_environment() {
    let config = EngineConfig {
        update: Some(UpdateMode::None),
        ci: Some(false),
        ..EngineConfig::default()
    };
    let env = Environment::default().with_var("CI", "true").with_arg("--updateSnapshot");
    assert_eq!(
        resolve(&config, &env),
        ResolvedSettings {
            update: UpdateMode::None,
            ci: false,
        }
    );
}

#[test]
fn engine_from_environment_uses_resolved_mode() {
    let env = Environment::default().with_var("CI", "true");
    let engine = Engine::from_environment(EngineConfig::default(), &env).unwrap();
    assert_eq!(engine.settings().update, UpdateMode::None);
    assert!(engine.settings().ci);
}
