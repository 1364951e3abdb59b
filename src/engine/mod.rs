// src/engine/mod.rs

//! Orchestration engine for onsave.
//!
//! This module ties together:
//! - the script registry of the active configuration
//! - the debounce scheduler (async scripts + sync group)
//! - the main runtime event loop that reacts to:
//!   - workspace triggers (file events, manual "run")
//!   - debounce timers firing
//!   - script runs finishing
//!   - reload / toggle / go-to-error commands
//!   - shutdown signals
//!
//! The pure core state machine lives in [`core`] (with the trigger fan-out in
//! [`dispatcher`]); the async/IO shell is implemented in [`runtime`].

use std::time::Duration;

use crate::config::ReloadOutcome;
use crate::exec::{ExecutionReport, ExecutionRequest};
use crate::host::TaskChoice;
use crate::registry::TimerGeneration;
use crate::scheduler::TimerKey;
use crate::types::{ScriptCode, TriggerReason};

/// Identifies one loaded configuration. Bumped on every successful load.
pub type Epoch = u64;

/// Runtime options used by both the core and the async shell.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeOptions {
    /// Trigger every enabled script once right after a configuration loads,
    /// and exit as soon as everything is idle again (used for `--once`).
    pub exit_when_idle: bool,
}

/// Events flowing into the runtime from the watcher, the host, timers and
/// running scripts.
#[derive(Debug)]
pub enum RuntimeEvent {
    /// A file was saved/created/deleted, or the user asked to run now.
    WorkspaceChanged { reason: TriggerReason },
    /// Reload the configuration.
    ReinitRequested,
    /// A reload finished.
    ConfigReloaded(ReloadOutcome),
    /// Open the next stored error of a script.
    GoToError { code: ScriptCode },
    /// Open the enable/disable picker.
    ToggleTasksRequested,
    /// Print the state of every script to the output log.
    StatusRequested,
    /// A debounce timer elapsed.
    TimerFired {
        epoch: Epoch,
        key: TimerKey,
        generation: TimerGeneration,
    },
    /// A script run finished.
    ExecutionFinished {
        epoch: Epoch,
        report: ExecutionReport,
    },
    /// Graceful shutdown requested (e.g. Ctrl-C, `quit`).
    ShutdownRequested,
}

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone)]
pub enum CoreCommand {
    /// Start (or restart) a timer; it posts [`RuntimeEvent::TimerFired`].
    ArmTimer {
        epoch: Epoch,
        key: TimerKey,
        generation: TimerGeneration,
        delay: Duration,
    },
    /// Drop every armed timer (the configuration was replaced).
    CancelTimers,
    /// Run a script; posts [`RuntimeEvent::ExecutionFinished`].
    Execute {
        epoch: Epoch,
        request: ExecutionRequest,
    },
    /// Run the checksum-gated loader; posts [`RuntimeEvent::ConfigReloaded`].
    Reload,
    /// Show the task picker and persist the answer, then reload.
    ChooseTasks(Vec<TaskChoice>),
    /// Request that the process exits (used for `--once` when idle).
    RequestExit,
}

/// Decision returned by the core after handling a single [`RuntimeEvent`].
#[derive(Debug, Clone)]
pub struct CoreStep {
    /// Commands the IO shell should execute.
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    pub fn continue_with(commands: Vec<CoreCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }
}

/// What happened during a runtime session; used for the `--once` exit status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// A configuration was active when the runtime stopped.
    pub config_loaded: bool,
    /// Number of finished script runs.
    pub runs: usize,
    /// Labels of scripts whose last run reported errors or crashed.
    pub failed: Vec<String>,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.config_loaded && self.failed.is_empty()
    }
}

pub mod core;
pub mod dispatcher;
pub mod runtime;

pub use core::CoreRuntime;
pub use runtime::{Runtime, RuntimeServices};
