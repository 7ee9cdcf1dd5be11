//! Common test helper functions.
//!
//! These utilities reduce boilerplate in integration tests: temp directories
//! that clean up after themselves, source file IO, and engines with explicit
//! settings so tests never depend on the `CI` variable of the machine running
//! them.

use std::fs;
use std::path::{Path, PathBuf};

use inlay::model::{EngineConfig, ResolvedSettings, UpdateMode};
use inlay::Engine;
use tempfile::TempDir;

/// Create a temporary directory for a test.
///
/// The directory is removed when the returned guard is dropped.
///
/// # Arguments
///
/// * `prefix` - A short identifier for the test (e.g., "flush", "crlf")
///
/// # Panics
///
/// Panics if the directory cannot be created.
///
/// # Example
///
/// ```ignore
/// let dir = temp_dir("my-test");
/// // dir.path() is something like /tmp/inlay-my-test-Xa81b2
/// ```
#[must_use]
pub fn temp_dir(prefix: &str) -> TempDir {
    tempfile::Builder::new()
        .prefix(&format!("inlay-{prefix}-"))
        .tempdir()
        .expect("failed to create temp directory")
}

/// Write `content` to `dir/name`, creating parent directories.
///
/// # Returns
///
/// The path of the written file.
pub fn write_source(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("failed to create source directory");
    }
    fs::write(&path, content).expect("failed to write source file");
    path
}

/// Read a source file back after a flush.
#[must_use]
pub fn read_source(path: &Path) -> String {
    fs::read_to_string(path).expect("failed to read source file")
}

/// Build an engine rooted at `root` with a fixed update mode.
///
/// CI detection is bypassed: the update mode is taken as given.
///
/// # Example
///
/// ```ignore
/// let engine = engine_for(dir.path(), UpdateMode::None);
/// let err = engine.match_snapshot(&value, &site).unwrap_err();
/// assert_eq!(err.code, ErrorCode::CiNewSnapshot);
/// ```
#[must_use]
pub fn engine_for(root: &Path, update: UpdateMode) -> Engine {
    engine_with_config(root, EngineConfig::default(), update)
}

/// Like [`engine_for`] with a custom configuration.
#[must_use]
pub fn engine_with_config(root: &Path, config: EngineConfig, update: UpdateMode) -> Engine {
    let settings = ResolvedSettings {
        update,
        ci: update == UpdateMode::None,
    };
    Engine::new(config, settings)
        .expect("test engine configuration should be valid")
        .with_root(root)
}
