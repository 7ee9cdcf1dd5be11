//! Inlay: an inline snapshot engine.
//!
//! A test asserts that a runtime value matches a literal written directly in
//! the test source, as the argument of a call such as
//! `expect(value).toMatchInlineSnapshot(...)`. When the argument is missing
//! or outdated, the engine rewrites it in place, preserving the file's
//! formatting conventions. Writes are buffered and applied once at the end of
//! the run.
//!
//! Hosts talk to the engine either through the Rust API ([`engine::Engine`])
//! or the NDJSON driver protocol ([`driver::run_driver`]).

#![forbid(unsafe_code)]
// Public API types have docs; internal helpers are documented where useful.
#![allow(missing_docs)]

pub mod buffer;
pub mod codec;
pub mod config;
pub mod driver;
pub mod engine;
pub mod error;
pub mod literal;
pub mod locator;
pub mod matchers;
pub mod model;
pub mod planner;
pub mod source;

pub use crate::engine::{Engine, Outcome};
pub use crate::error::{EngineError, EngineResult, ErrorCode, ErrorInfo};
pub use crate::model::*;
