// src/exec/engine.rs

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::host::OutputLog;
use crate::problem::{ProblemMatcher, extract_errors};
use crate::registry::Script;
use crate::types::ScriptCode;

use super::runner::ProcessRunner;

/// Everything needed to run one script, detached from the registry so the
/// run can proceed on its own task.
#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    pub code: ScriptCode,
    pub label: String,
    pub command: String,
    pub problem_matcher: Option<ProblemMatcher>,
}

impl ExecutionRequest {
    pub fn for_script(script: &Script) -> Self {
        Self {
            code: script.code().clone(),
            label: script.label().to_string(),
            command: script.command().to_string(),
            problem_matcher: script.problem_matcher().cloned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The command ran; `errors` is empty on success.
    Completed { errors: Vec<String> },
    /// The run itself broke down (e.g. the run task panicked).
    Crashed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionReport {
    pub code: ScriptCode,
    pub elapsed: Duration,
    pub outcome: RunOutcome,
}

impl ExecutionReport {
    pub fn crashed(code: ScriptCode, reason: impl Into<String>) -> Self {
        Self {
            code,
            elapsed: Duration::ZERO,
            outcome: RunOutcome::Crashed(reason.into()),
        }
    }

    pub fn is_clean(&self) -> bool {
        matches!(&self.outcome, RunOutcome::Completed { errors } if errors.is_empty())
    }
}

/// Runs scripts in the workspace and turns their output into error lists.
#[derive(Clone)]
pub struct ExecutionEngine {
    runner: Arc<dyn ProcessRunner>,
    workspace: PathBuf,
    output: OutputLog,
}

impl fmt::Debug for ExecutionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionEngine")
            .field("workspace", &self.workspace)
            .finish_non_exhaustive()
    }
}

impl ExecutionEngine {
    pub fn new(runner: Arc<dyn ProcessRunner>, workspace: impl Into<PathBuf>, output: OutputLog) -> Self {
        Self {
            runner,
            workspace: workspace.into(),
            output,
        }
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    /// Run `request` to completion. Process failures end up in the error
    /// list; this never fails.
    pub async fn run(&self, request: ExecutionRequest) -> ExecutionReport {
        let start = Instant::now();
        let result = self.runner.run(&request.command, &self.workspace).await;
        let elapsed = start.elapsed();

        let combined = result.combined();
        self.output
            .log(format!("{}: Output: {}", request.label, combined));

        let errors = extract_errors(&combined, request.problem_matcher.as_ref(), &self.workspace);
        debug!(
            script = %request.code,
            elapsed_ms = elapsed.as_millis() as u64,
            errors = errors.len(),
            "run finished"
        );

        ExecutionReport {
            code: request.code,
            elapsed,
            outcome: RunOutcome::Completed { errors },
        }
    }
}
