//! Assertion entry point.
//!
//! [`Engine::match_snapshot`] ties the pieces together for one assertion:
//! read the test file, find the call and its argument, infer the file's
//! formatting profile, plan the comparison, then apply the update-mode
//! decision. Writes are only scheduled; [`Engine::finish`] flushes them.
//!
//! | existing argument | comparison | update mode   | result                       |
//! |-------------------|------------|---------------|------------------------------|
//! | none              | -          | `new`, `all`  | scheduled write, passes      |
//! | none              | -          | `none`        | `E_CI_NEW_SNAPSHOT`          |
//! | present           | match      | any           | passes, nothing written      |
//! | present           | mismatch   | `all`         | scheduled write, passes      |
//! | present           | mismatch   | `none`, `new` | `E_MISMATCH` with a diff     |

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::buffer::{self, formatter_from_config, FlushOutcome, Formatter, ReplacementRegistry};
use crate::config::{resolve_environment, validate_config, Environment};
use crate::error::{EngineError, EngineResult, ErrorCode};
use crate::literal::Printer;
use crate::locator::{self, find_argument, ArgumentSpan, IgnoreSet};
use crate::model::{CallSite, EngineConfig, LineEnding, Replacement, ResolvedSettings, Value};
use crate::planner::{plan_with, Plan, PlanInput, Rewrite};
use crate::source::{indentation_at, infer_profile};

/// Result of a passing assertion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The snapshot matched; nothing will be written.
    Matched,
    /// The snapshot was missing or outdated and a write was scheduled.
    Scheduled(Replacement),
}

/// Inline snapshot engine for one test run.
pub struct Engine {
    config: EngineConfig,
    settings: ResolvedSettings,
    ignore: IgnoreSet,
    registry: Arc<ReplacementRegistry>,
    printers: Vec<Box<dyn Printer>>,
    formatter: Box<dyn Formatter>,
    root: Option<PathBuf>,
}

impl Engine {
    pub fn new(config: EngineConfig, settings: ResolvedSettings) -> EngineResult<Self> {
        validate_config(&config)?;
        let ignore = IgnoreSet::new(&config.ignore)?;
        let formatter = formatter_from_config(config.formatter.as_ref());
        Ok(Self {
            config,
            settings,
            ignore,
            registry: Arc::new(ReplacementRegistry::new()),
            printers: Vec::new(),
            formatter,
            root: None,
        })
    }

    /// Build an engine whose update mode is resolved from `env`.
    pub fn from_environment(config: EngineConfig, env: &Environment) -> EngineResult<Self> {
        let settings = resolve_environment(&config, env);
        Self::new(config, settings)
    }

    #[must_use]
    pub fn with_registry(mut self, registry: Arc<ReplacementRegistry>) -> Self {
        self.registry = registry;
        self
    }

    #[must_use]
    pub fn with_printer(mut self, printer: Box<dyn Printer>) -> Self {
        self.printers.push(printer);
        self
    }

    #[must_use]
    pub fn with_formatter(mut self, formatter: Box<dyn Formatter>) -> Self {
        self.formatter = formatter;
        self
    }

    /// Directory relative call-site paths are resolved against.
    #[must_use]
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn settings(&self) -> &ResolvedSettings {
        &self.settings
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<ReplacementRegistry> {
        &self.registry
    }

    /// Find the user call site in a stack trace.
    pub fn locate(&self, stack: &str) -> EngineResult<CallSite> {
        let site = locator::locate_or_err(stack, &self.ignore)?;
        tracing::debug!(call_site = %site, "located assertion");
        Ok(site)
    }

    /// Run one assertion at `site` using the configured method name.
    pub fn match_snapshot(&self, actual: &Value, site: &CallSite) -> EngineResult<Outcome> {
        self.match_snapshot_with(actual, site, &self.config.method_name)
    }

    /// Run one assertion located from a stack trace.
    pub fn match_snapshot_at_stack(&self, actual: &Value, stack: &str) -> EngineResult<Outcome> {
        let site = self.locate(stack)?;
        self.match_snapshot(actual, &site)
    }

    /// Run one assertion at `site`, looking for calls to `method`.
    pub fn match_snapshot_with(&self, actual: &Value, site: &CallSite, method: &str) -> EngineResult<Outcome> {
        let path = self.resolve_path(&site.file);
        let text = std::fs::read_to_string(&path)
            .map_err(|err| EngineError::io(format!("failed to read {}", path.display()), err))?;
        let span = find_argument(&text, site, method)?;
        let profile = infer_profile(&text, self.config.print_width);
        let base_indent = indentation_at(&text, span.call_start);

        let plan = plan_with(&PlanInput {
            actual,
            existing: span.existing.as_deref(),
            profile: &profile,
            base_indent,
            printers: &self.printers,
        })?;
        let rewrite = match plan {
            Plan::Matches => return Ok(Outcome::Matched),
            Plan::Replace(rewrite) => rewrite,
        };
        self.decide(site, &path, &text, &span, rewrite, profile.line_ending)
    }

    fn decide(
        &self,
        site: &CallSite,
        path: &Path,
        text: &str,
        span: &ArgumentSpan,
        rewrite: Rewrite,
        line_ending: LineEnding,
    ) -> EngineResult<Outcome> {
        let update = self.settings.update;
        if span.existing.is_none() && !update.allows_new() {
            let reason = if self.settings.ci {
                "new snapshots are not written in CI (run the tests locally or pass --updateSnapshot)"
            } else {
                "update mode is none (pass --update new or --updateSnapshot)"
            };
            return Err(EngineError::new(
                ErrorCode::CiNewSnapshot,
                format!("inline snapshot at {site} has not been written; {reason}"),
                Some(serde_json::json!({
                    "call_site": site,
                    "received": rewrite.text,
                    "ci": self.settings.ci,
                })),
            ));
        }
        if span.existing.is_some() && !update.allows_overwrite() {
            return Err(EngineError::new(
                ErrorCode::Mismatch,
                format!("inline snapshot at {site} does not match (pass --updateSnapshot to overwrite)"),
                Some(serde_json::json!({
                    "call_site": site,
                    "diff": rewrite.diff(),
                    "dropped_matchers": rewrite.dropped.iter().map(|d| &d.path).collect::<Vec<_>>(),
                })),
            ));
        }

        let replacement_text = match line_ending {
            LineEnding::Lf => rewrite.text,
            LineEnding::Crlf => rewrite.text.replace('\n', "\r\n"),
        };
        let original = text.get(span.start..span.end).unwrap_or("").to_string();
        let scheduled = self.registry.schedule(Replacement {
            file: path.to_path_buf(),
            start: span.start,
            end: span.end,
            text: replacement_text,
            original,
            sequence: 0,
        });
        tracing::debug!(
            call_site = %site,
            start = scheduled.start,
            end = scheduled.end,
            "scheduled inline snapshot write"
        );
        Ok(Outcome::Scheduled(scheduled))
    }

    fn resolve_path(&self, file: &Path) -> PathBuf {
        match &self.root {
            Some(root) if file.is_relative() => root.join(file),
            _ => file.to_path_buf(),
        }
    }

    /// End-of-run hook: apply and write every scheduled replacement.
    ///
    /// Safe to call more than once; later calls find nothing pending.
    pub fn finish(&self) -> FlushOutcome {
        buffer::flush_all(&self.registry, self.formatter.as_ref())
    }
}
