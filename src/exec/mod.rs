// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`runner`] holds the [`ProcessRunner`] collaborator trait and the shell
//!   implementation used in production; tests swap in a fake runner.
//! - [`engine`] runs one script through a runner, logs its output and turns it
//!   into an error list with the script's problem matcher.

pub mod engine;
pub mod runner;

pub use engine::{ExecutionEngine, ExecutionReport, ExecutionRequest, RunOutcome};
pub use runner::{ProcessOutput, ProcessRunner, RunFuture, ShellRunner};
