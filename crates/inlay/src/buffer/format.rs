use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

use crate::error::{EngineError, EngineResult};
use crate::model::FormatterCommand;

/// Placeholder in formatter arguments replaced by the file path.
pub const FILE_PLACEHOLDER: &str = "{file}";

/// Post-processing applied to a patched file before it is written.
pub trait Formatter: Send + Sync {
    fn format(&self, code: &str, path: &Path) -> EngineResult<String>;
}

/// Formatter that returns its input unchanged.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopFormatter;

impl Formatter for NoopFormatter {
    fn format(&self, code: &str, _path: &Path) -> EngineResult<String> {
        Ok(code.to_string())
    }
}

/// External formatter process: source on stdin, formatted source on stdout.
#[derive(Clone, Debug)]
pub struct CommandFormatter {
    command: FormatterCommand,
}

impl CommandFormatter {
    #[must_use]
    pub fn new(command: FormatterCommand) -> Self {
        Self { command }
    }
}

impl Formatter for CommandFormatter {
    fn format(&self, code: &str, path: &Path) -> EngineResult<String> {
        let file = path.display().to_string();
        let args: Vec<String> = self
            .command
            .args
            .iter()
            .map(|arg| arg.replace(FILE_PLACEHOLDER, &file))
            .collect();
        let context = serde_json::json!({
            "command": self.command.command,
            "args": args,
            "file": file,
        });

        let mut child = Command::new(&self.command.command)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| {
                EngineError::formatter(format!("failed to start formatter: {err}"), Some(context.clone()))
            })?;

        // stdin must be written while stdout and stderr drain
        let stdin = child.stdin.take();
        let (written, output) = std::thread::scope(|scope| {
            let writer = scope.spawn(move || match stdin {
                Some(mut stdin) => stdin.write_all(code.as_bytes()),
                None => Ok(()),
            });
            let output = child.wait_with_output();
            (writer.join(), output)
        });
        let output = output.map_err(|err| {
            EngineError::formatter(format!("formatter did not finish: {err}"), Some(context.clone()))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(EngineError::formatter(
                format!("formatter exited with {}", output.status),
                Some(serde_json::json!({
                    "command": self.command.command,
                    "file": file,
                    "stderr": stderr,
                })),
            ));
        }
        match written {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                return Err(EngineError::formatter(
                    format!("failed to write to formatter: {err}"),
                    Some(context),
                ))
            }
            Err(_) => {
                return Err(EngineError::formatter(
                    "formatter input writer panicked",
                    Some(context),
                ))
            }
        }
        String::from_utf8(output.stdout)
            .map_err(|err| EngineError::formatter(format!("formatter produced invalid UTF-8: {err}"), Some(context)))
    }
}

/// Build the formatter named in configuration, or the no-op formatter.
#[must_use]
pub fn formatter_from_config(command: Option<&FormatterCommand>) -> Box<dyn Formatter> {
    match command {
        Some(command) => Box::new(CommandFormatter::new(command.clone())),
        None => Box::new(NoopFormatter),
    }
}
