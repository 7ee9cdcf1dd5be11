//! Test fixtures and builders for inlay integration tests.
//!
//! This crate provides:
//! - [`SourceBuilder`] for test files with inline snapshot assertions
//! - [`StackBuilder`] for V8, SpiderMonkey and Rust style stack traces
//! - [`RequestBuilder`] for driver protocol requests
//! - Helpers for temp directories, source files and engines
//!
//! # Example
//!
//! ```ignore
//! use inlay::model::{UpdateMode, Value};
//! use inlay_fixtures::{engine_for, temp_dir, SourceBuilder};
//!
//! let dir = temp_dir("example");
//! let file = SourceBuilder::new()
//!     .line("test('adds', () => {")
//!     .assertion("  ", "add(1, 2)", None)
//!     .line("});")
//!     .write_to(dir.path(), "add.test.js");
//!
//! let engine = engine_for(dir.path(), UpdateMode::New);
//! engine.match_snapshot(&Value::Number(3.0), &file.site(0)).unwrap();
//! engine.finish().into_result().unwrap();
//! ```

// Test fixtures crate - panics are acceptable for test setup failures
#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::missing_panics_doc)]

pub mod builders;
pub mod helpers;

pub use builders::{RequestBuilder, SourceBuilder, SourceFile, StackBuilder};
pub use helpers::{engine_for, engine_with_config, read_source, temp_dir, write_source};
