//! Grading engine for untrusted submissions.
//!
//! A run goes workspace -> compile -> evaluate each test case -> verdict,
//! and the workspace is removed on every exit path.
//!
//! - `workspace`: per-run scratch directory keyed by a unique token
//! - `compiler`: source rewrite and compiler invocation
//! - `runner`: bounded child-process execution with kill-on-timeout
//! - `evaluator`: ordered, short-circuiting test case evaluation
//! - `verdict`: failure taxonomy and verdict composition
//! - `executor`: the `Grader` entry point tying the stages together

pub mod compiler;
pub mod error;
pub mod evaluator;
pub mod executor;
pub mod runner;
pub mod toolchain;
pub mod verdict;
pub mod workspace;

pub use error::EngineError;
pub use executor::Grader;
pub use toolchain::{CommandSpec, JavaToolchain, Toolchain};
pub use workspace::Workspace;
