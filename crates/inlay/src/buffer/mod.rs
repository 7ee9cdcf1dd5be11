//! Deferred source edits.
//!
//! Assertions never write to disk directly. Each scheduled [`Replacement`]
//! records its byte range against the file text as it was read, and all
//! edits are applied once at the end of the run by [`flush_all`]. Applying
//! per file in descending offset order keeps earlier offsets valid no matter
//! how much text later edits add or remove.
//!
//! # Key Types
//!
//! - [`ReplacementRegistry`] - Thread-safe collection of pending edits
//! - [`Formatter`] - Hook run on each patched file before it is written
//! - [`FlushOutcome`] - Files written and the first failure, if any

pub mod format;

pub use format::{formatter_from_config, CommandFormatter, Formatter, NoopFormatter, FILE_PLACEHOLDER};

use indexmap::IndexMap;
use parking_lot::Mutex;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use crate::error::{EngineError, EngineResult, ErrorCode};
use crate::model::{FileFlushSummary, FlushReport, Replacement, PROTOCOL_VERSION};

// =============================================================================
// Registry
// =============================================================================

#[derive(Debug, Default)]
struct RegistryState {
    files: IndexMap<PathBuf, Vec<Replacement>>,
    next_sequence: u64,
    flushed: bool,
}

/// Pending replacements keyed by file.
///
/// Identical replacements (same range and text) collapse into one. When two
/// different replacements overlap, the one scheduled later wins.
#[derive(Debug, Default)]
pub struct ReplacementRegistry {
    state: Mutex<RegistryState>,
}

impl ReplacementRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide registry for hosts that cannot thread one through.
    pub fn global() -> Arc<ReplacementRegistry> {
        static GLOBAL: OnceLock<Arc<ReplacementRegistry>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(ReplacementRegistry::new())))
    }

    /// Record a replacement and return it with its sequence number assigned.
    pub fn schedule(&self, mut replacement: Replacement) -> Replacement {
        let mut state = self.state.lock();
        if state.flushed {
            tracing::warn!(
                file = %replacement.file.display(),
                "replacement scheduled after flush; it will be written by the next flush"
            );
        }
        let list = state.files.entry(replacement.file.clone()).or_default();
        if let Some(existing) = list.iter().find(|pending| {
            pending.start == replacement.start && pending.end == replacement.end && pending.text == replacement.text
        }) {
            tracing::debug!(
                file = %replacement.file.display(),
                start = replacement.start,
                "identical replacement already scheduled"
            );
            return existing.clone();
        }
        list.retain(|pending| {
            let overlaps = pending.overlaps(&replacement);
            if overlaps {
                tracing::warn!(
                    file = %pending.file.display(),
                    start = pending.start,
                    end = pending.end,
                    "conflicting replacement for the same range; keeping the later one"
                );
            }
            !overlaps
        });
        state.next_sequence += 1;
        replacement.sequence = state.next_sequence;
        if let Some(list) = state.files.get_mut(&replacement.file) {
            list.push(replacement.clone());
        }
        replacement
    }

    /// Total number of pending replacements.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.state.lock().files.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn pending_for(&self, file: &Path) -> Vec<Replacement> {
        self.state.lock().files.get(file).cloned().unwrap_or_default()
    }

    #[must_use]
    pub fn is_flushed(&self) -> bool {
        self.state.lock().flushed
    }

    /// Remove and return every pending replacement, grouped by file in
    /// first-scheduled order.
    pub fn take_all(&self) -> Vec<(PathBuf, Vec<Replacement>)> {
        let mut state = self.state.lock();
        state.flushed = true;
        std::mem::take(&mut state.files).into_iter().collect()
    }
}

// =============================================================================
// Applying edits
// =============================================================================

/// Apply `replacements` to `text`, checking that each range still holds the
/// text it held when the edit was planned.
pub fn apply_replacements(text: &str, replacements: &[Replacement]) -> EngineResult<String> {
    let mut ordered: Vec<&Replacement> = replacements.iter().collect();
    ordered.sort_by(|a, b| b.start.cmp(&a.start).then(b.end.cmp(&a.end)));

    let mut out = text.to_string();
    let mut floor = usize::MAX;
    for replacement in ordered {
        if replacement.end > floor {
            return Err(EngineError::new(
                ErrorCode::StaleSource,
                "overlapping replacements",
                Some(serde_json::json!({
                    "file": replacement.file,
                    "start": replacement.start,
                    "end": replacement.end,
                })),
            ));
        }
        let current = out.get(replacement.start..replacement.end);
        if current != Some(replacement.original.as_str()) {
            return Err(EngineError::new(
                ErrorCode::StaleSource,
                format!(
                    "{} changed since the assertion ran; re-run the tests",
                    replacement.file.display()
                ),
                Some(serde_json::json!({
                    "file": replacement.file,
                    "start": replacement.start,
                    "end": replacement.end,
                    "expected": replacement.original,
                    "found": current,
                })),
            ));
        }
        out.replace_range(replacement.start..replacement.end, &replacement.text);
        floor = replacement.start;
    }
    Ok(out)
}

/// Write `content` to `path` through a temporary file in the same directory.
pub fn write_atomic(path: &Path, content: &str) -> EngineResult<()> {
    let dir = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .map_err(|err| EngineError::io(format!("failed to create temp file in {}", dir.display()), err))?;
    tmp.write_all(content.as_bytes())
        .map_err(|err| EngineError::io("failed to write temp file", err))?;
    if let Ok(metadata) = std::fs::metadata(path) {
        if let Err(err) = std::fs::set_permissions(tmp.path(), metadata.permissions()) {
            tracing::warn!(file = %path.display(), error = %err, "could not carry file permissions over to rewritten file");
        }
    }
    tmp.persist(path)
        .map_err(|err| EngineError::io(format!("failed to replace {}", path.display()), err.error))?;
    Ok(())
}

// =============================================================================
// Flush
// =============================================================================

/// The file that stopped a flush and why.
#[derive(Debug)]
pub struct FlushFailure {
    pub file: PathBuf,
    pub error: EngineError,
}

/// Result of [`flush_all`].
#[derive(Debug, Default)]
pub struct FlushOutcome {
    /// Files written before any failure, in write order.
    pub written: Vec<FileFlushSummary>,
    pub failure: Option<FlushFailure>,
}

impl FlushOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    #[must_use]
    pub fn to_report(&self) -> FlushReport {
        FlushReport {
            protocol_version: PROTOCOL_VERSION,
            written: self.written.clone(),
            failed_file: self.failure.as_ref().map(|failure| failure.file.clone()),
            error: self.failure.as_ref().map(|failure| failure.error.to_error_info()),
        }
    }

    pub fn into_result(self) -> EngineResult<Vec<FileFlushSummary>> {
        match self.failure {
            None => Ok(self.written),
            Some(failure) => Err(failure.error),
        }
    }
}

/// Apply and write every pending replacement.
///
/// Each file is read, patched, formatted and written in one step. The first
/// failing file stops the flush; files after it are left untouched.
pub fn flush_all(registry: &ReplacementRegistry, formatter: &dyn Formatter) -> FlushOutcome {
    let mut outcome = FlushOutcome::default();
    let pending = registry.take_all();
    let total = pending.len();
    for (index, (file, replacements)) in pending.into_iter().enumerate() {
        match flush_file(&file, &replacements, formatter) {
            Ok(count) => {
                tracing::info!(file = %file.display(), replacements = count, "updated inline snapshots");
                outcome.written.push(FileFlushSummary {
                    file,
                    replacements: count,
                });
            }
            Err(error) => {
                tracing::error!(
                    file = %file.display(),
                    code = %error.code,
                    skipped_files = total - index - 1,
                    "failed to write inline snapshots: {}",
                    error.message
                );
                outcome.failure = Some(FlushFailure { file, error });
                break;
            }
        }
    }
    outcome
}

fn flush_file(path: &Path, replacements: &[Replacement], formatter: &dyn Formatter) -> EngineResult<usize> {
    let text = std::fs::read_to_string(path)
        .map_err(|err| EngineError::io(format!("failed to read {}", path.display()), err))?;
    let patched = apply_replacements(&text, replacements)?;
    let formatted = formatter.format(&patched, path)?;
    write_atomic(path, &formatted)?;
    Ok(replacements.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edit(start: usize, end: usize, text: &str, original: &str) -> Replacement {
        Replacement {
            file: PathBuf::from("a.js"),
            start,
            end,
            text: text.to_string(),
            original: original.to_string(),
            sequence: 0,
        }
    }

    #[test]
    fn identical_replacements_collapse() {
        let registry = ReplacementRegistry::new();
        let first = registry.schedule(edit(3, 3, "1", ""));
        let second = registry.schedule(edit(3, 3, "1", ""));
        assert_eq!(first.sequence, second.sequence);
        assert_eq!(registry.pending(), 1);
    }

    #[test]
    fn overlapping_replacement_later_wins() {
        let registry = ReplacementRegistry::new();
        registry.schedule(edit(3, 6, "old", "abc"));
        registry.schedule(edit(4, 8, "new", "bcde"));
        let pending = registry.pending_for(Path::new("a.js"));
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].text, "new");
    }

    #[test]
    fn take_all_drains_once() {
        let registry = ReplacementRegistry::new();
        registry.schedule(edit(0, 0, "x", ""));
        assert_eq!(registry.take_all().len(), 1);
        assert!(registry.take_all().is_empty());
        assert!(registry.is_flushed());
    }
}
