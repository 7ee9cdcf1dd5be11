//! Inlay CLI: inline snapshot engine for test runners.
//!
//! Runs the NDJSON assertion driver, one-shot checks and diagnostics.

// CLI-specific lint allowances (CLI binary, not library)
#![allow(missing_docs)]
#![allow(clippy::print_stdout)] // CLI must print to stdout
#![allow(clippy::print_stderr)] // CLI must print to stderr
#![allow(clippy::exit)] // CLI uses exit codes
#![allow(clippy::fn_params_excessive_bools)] // CLI flags are naturally bools

use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use inlay::config::{discover_config, load_config_file, Environment};
use inlay::driver::run_driver;
use inlay::model::{
    AssertionResponse, AssertionStatus, CallSite, EngineConfig, ScheduledEdit, UpdateMode, Value,
    PROTOCOL_VERSION,
};
use inlay::source::infer_profile;
use inlay::{Engine, EngineError, Outcome};
use miette::{IntoDiagnostic, Result};
use std::io;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

mod protocol_help;

/// Color output mode
#[derive(Copy, Clone, Debug, Default, ValueEnum)]
enum ColorMode {
    /// Auto-detect based on terminal and `NO_COLOR` env
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum UpdateArg {
    None,
    New,
    All,
}

impl From<UpdateArg> for UpdateMode {
    fn from(arg: UpdateArg) -> Self {
        match arg {
            UpdateArg::None => UpdateMode::None,
            UpdateArg::New => UpdateMode::New,
            UpdateArg::All => UpdateMode::All,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "inlay", version, about = "Inline snapshot engine")]
struct Cli {
    /// Control color output
    #[arg(long, value_enum, default_value = "auto", global = true)]
    color: ColorMode,

    /// Log engine decisions to stderr
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by commands that run assertions.
#[derive(Debug, Args)]
struct EngineArgs {
    #[arg(long, help = "Config file (JSON or YAML); defaults to inlay.json/inlay.yaml in the working directory")]
    config: Option<PathBuf>,
    #[arg(long, value_enum, help = "Which snapshots may be written")]
    update: Option<UpdateArg>,
    #[arg(short = 'u', long = "updateSnapshot", help = "Overwrite mismatching snapshots (same as --update all)")]
    update_snapshot: bool,
    #[arg(long, conflicts_with = "no_ci", help = "Treat this run as CI")]
    ci: bool,
    #[arg(long, help = "Treat this run as local even if CI variables are set")]
    no_ci: bool,
    #[arg(long, help = "Directory relative call-site paths are resolved against")]
    root: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// NDJSON assertion driver for test runners
    Driver {
        #[arg(long)]
        stdio: bool,
        #[command(flatten)]
        engine: EngineArgs,
    },
    /// Run one assertion and write the result immediately
    Check {
        #[arg(long)]
        json: bool,
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        line: u32,
        #[arg(long, default_value_t = 1)]
        column: u32,
        #[arg(long, conflicts_with = "actual_file", help = "Actual value as JSON")]
        actual: Option<String>,
        #[arg(long, help = "Read the actual value from a JSON file")]
        actual_file: Option<PathBuf>,
        #[arg(long, help = "Assertion method name to look for")]
        method: Option<String>,
        #[command(flatten)]
        engine: EngineArgs,
    },
    /// Print the formatting profile inferred for a source file
    Profile {
        file: PathBuf,
        #[arg(long)]
        json: bool,
        #[arg(long, default_value_t = inlay::model::profile::DEFAULT_PRINT_WIDTH)]
        print_width: usize,
    },
    /// Output protocol documentation
    ProtocolHelp {
        #[arg(long, help = "Output as JSON (default: human-readable)")]
        json: bool,
    },
    /// Generate shell completions for bash, zsh, or fish
    Completions {
        #[arg(value_enum, help = "Shell to generate completions for")]
        shell: Shell,
    },
}

/// Configure color output based on CLI flag and environment
fn configure_colors(mode: ColorMode) -> bool {
    let use_color = match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => {
            // Respect NO_COLOR environment variable
            if std::env::var("NO_COLOR").is_ok() {
                false
            } else {
                supports_color::on(supports_color::Stream::Stderr).is_some()
            }
        }
    };

    miette::set_hook(Box::new(move |_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .color(use_color)
                .unicode(use_color)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set
    use_color
}

/// Install the stderr log subscriber. `RUST_LOG` wins over `--verbose`.
fn init_logging(verbose: bool, use_color: bool) {
    let default = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(use_color)
        .with_target(false)
        .try_init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let use_color = configure_colors(cli.color);
    init_logging(cli.verbose, use_color);
    match cli.command {
        Commands::Driver { stdio, engine } => cmd_driver(stdio, &engine),
        Commands::Check {
            json,
            file,
            line,
            column,
            actual,
            actual_file,
            method,
            engine,
        } => cmd_check(
            json,
            CallSite::new(file, line, column),
            actual,
            actual_file,
            method,
            &engine,
        ),
        Commands::Profile {
            file,
            json,
            print_width,
        } => cmd_profile(&file, json, print_width),
        Commands::ProtocolHelp { json } => cmd_protocol_help(json),
        Commands::Completions { shell } => cmd_completions(shell),
    }
}

// =============================================================================
// Command Handlers
// =============================================================================

/// Handle the driver command.
fn cmd_driver(stdio: bool, args: &EngineArgs) -> Result<()> {
    if !stdio {
        return emit_cli_error(true, "driver requires --stdio");
    }
    let engine = match build_engine(args) {
        Ok(engine) => engine,
        Err(err) => return emit_error(true, &err),
    };
    match run_driver(&engine) {
        Ok(summary) if summary.failed > 0 => std::process::exit(1),
        Ok(_) => Ok(()),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.exit_code());
        }
    }
}

/// Handle the check command.
fn cmd_check(
    json: bool,
    site: CallSite,
    actual: Option<String>,
    actual_file: Option<PathBuf>,
    method: Option<String>,
    args: &EngineArgs,
) -> Result<()> {
    let actual = match read_actual(actual, actual_file) {
        Ok(actual) => actual,
        Err(err) => return emit_error(json, &err),
    };
    let engine = match build_engine(args) {
        Ok(engine) => engine,
        Err(err) => return emit_error(json, &err),
    };
    let method = method.unwrap_or_else(|| engine.config().method_name.clone());

    let outcome = match engine.match_snapshot_with(&actual, &site, &method) {
        Ok(outcome) => outcome,
        Err(err) => return emit_error(json, &err),
    };
    if let Err(err) = engine.finish().into_result() {
        return emit_error(json, &err);
    }

    let response = match outcome {
        Outcome::Matched => AssertionResponse {
            protocol_version: PROTOCOL_VERSION,
            request_id: "check".to_string(),
            status: AssertionStatus::Passed,
            call_site: Some(site),
            edit: None,
            error: None,
        },
        Outcome::Scheduled(replacement) => AssertionResponse {
            protocol_version: PROTOCOL_VERSION,
            request_id: "check".to_string(),
            status: AssertionStatus::Written,
            call_site: Some(site),
            edit: Some(ScheduledEdit {
                file: replacement.file,
                start: replacement.start,
                end: replacement.end,
                text: replacement.text,
            }),
            error: None,
        },
    };
    if json {
        let payload = serde_json::to_string(&response).into_diagnostic()?;
        println!("{payload}");
    } else {
        match response.status {
            AssertionStatus::Passed => eprintln!("snapshot matched"),
            _ => eprintln!("snapshot written"),
        }
    }
    Ok(())
}

/// Handle the profile command.
fn cmd_profile(file: &Path, json: bool, print_width: usize) -> Result<()> {
    let text = match std::fs::read_to_string(file) {
        Ok(text) => text,
        Err(err) => {
            return emit_error(
                json,
                &EngineError::io(format!("failed to read {}", file.display()), err),
            )
        }
    };
    let profile = infer_profile(&text, print_width);
    if json {
        let payload = serde_json::to_string(&profile).into_diagnostic()?;
        println!("{payload}");
    } else {
        let indent = if profile.indent_unit == "\t" {
            "tab".to_string()
        } else {
            format!("{} spaces", profile.indent_unit.len())
        };
        println!("indent:      {indent}");
        println!("quote:       {}", profile.quote.as_char());
        println!("line ending: {:?}", profile.line_ending);
        println!("print width: {}", profile.print_width);
    }
    Ok(())
}

/// Handle the protocol-help command.
fn cmd_protocol_help(json: bool) -> Result<()> {
    let help = protocol_help::generate_protocol_help();
    if json {
        let output = serde_json::to_string_pretty(&help).into_diagnostic()?;
        println!("{output}");
    } else {
        print_protocol_help_text(&help);
    }
    Ok(())
}

fn cmd_completions(shell: Shell) -> Result<()> {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut io::stdout());
    Ok(())
}

// =============================================================================
// Helpers
// =============================================================================

fn load_config(args: &EngineArgs) -> Result<EngineConfig, EngineError> {
    let mut config = match &args.config {
        Some(path) => load_config_file(path)?,
        None => {
            let cwd = std::env::current_dir()
                .map_err(|err| EngineError::io("failed to read working directory", err))?;
            discover_config(&cwd)?.map(|(_, config)| config).unwrap_or_default()
        }
    };
    if args.update_snapshot {
        config.update = Some(UpdateMode::All);
    } else if let Some(update) = args.update {
        config.update = Some(update.into());
    }
    if args.ci {
        config.ci = Some(true);
    } else if args.no_ci {
        config.ci = Some(false);
    }
    Ok(config)
}

fn build_engine(args: &EngineArgs) -> Result<Engine, EngineError> {
    let config = load_config(args)?;
    let engine = Engine::from_environment(config, &Environment::from_process())?;
    tracing::info!(
        update = ?engine.settings().update,
        ci = engine.settings().ci,
        "engine ready"
    );
    Ok(match &args.root {
        Some(root) => engine.with_root(root),
        None => engine,
    })
}

fn read_actual(actual: Option<String>, actual_file: Option<PathBuf>) -> Result<Value, EngineError> {
    let data = match (actual, actual_file) {
        (Some(text), _) => text,
        (None, Some(path)) => std::fs::read_to_string(&path)
            .map_err(|err| EngineError::io(format!("failed to read {}", path.display()), err))?,
        (None, None) => return Err(EngineError::cli_invalid_arg("one of --actual or --actual-file is required")),
    };
    let json: serde_json::Value = serde_json::from_str(&data)
        .map_err(|err| EngineError::cli_invalid_arg(format!("actual value is not valid JSON: {err}")))?;
    Ok(Value::from_json(&json))
}

fn emit_error(json: bool, err: &EngineError) -> Result<()> {
    if json {
        let payload = serde_json::to_string(&err.to_error_info()).into_diagnostic()?;
        println!("{payload}");
    } else {
        eprintln!("error: {err}");
        if let Some(diff) = err
            .context
            .as_ref()
            .and_then(|ctx| ctx.get("diff"))
            .and_then(serde_json::Value::as_str)
        {
            eprintln!("{diff}");
        }
    }
    std::process::exit(err.exit_code());
}

fn emit_cli_error(json: bool, message: &str) -> Result<()> {
    emit_error(json, &EngineError::cli_invalid_arg(message))
}

fn print_protocol_help_text(help: &protocol_help::ProtocolHelp) {
    println!("inlay Protocol Help");
    println!("===================");
    println!();
    println!("Protocol version: {}", help.protocol_version);
    println!();
    println!("COMMANDS");
    println!("--------");
    for (name, cmd) in &help.commands {
        println!("  {name}");
        println!("    {}", cmd.description);
        println!("    Usage: {}", cmd.usage);
        if let Some(flags) = &cmd.required_flags {
            println!("    Required: {}", flags.join(", "));
        }
        println!();
    }
    println!("MESSAGES");
    println!("--------");
    for (name, schema) in &help.schemas {
        println!("  {name}: {}", schema.description);
        for (field, desc) in &schema.fields {
            println!("    {field}: {desc}");
        }
        println!();
    }
    println!("ERROR CODES");
    println!("-----------");
    for (code, info) in &help.error_codes {
        println!("  {code} (exit {}): {}", info.exit_code, info.description);
    }
    println!();
    println!("QUICKSTART");
    println!("----------");
    for step in &help.quickstart.steps {
        println!("  {step}");
    }
    println!();
    println!("For full JSON documentation: inlay protocol-help --json");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_arg_maps_to_mode() {
        assert_eq!(UpdateMode::from(UpdateArg::All), UpdateMode::All);
        assert_eq!(UpdateMode::from(UpdateArg::None), UpdateMode::None);
    }

    #[test]
    fn read_actual_rejects_missing_input() {
        let err = read_actual(None, None).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
