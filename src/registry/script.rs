// src/registry/script.rs

//! A loaded script plus its runtime state.

use std::fmt;
use std::time::Duration;

use crate::config::ScriptConfig;
use crate::host::{IndicatorState, StatusIndicator, show_state};
use crate::problem::ProblemMatcher;
use crate::types::{ScriptCategory, ScriptCode};

/// Debounce / run state of a script (async scripts) or of the sync group.
///
/// A rerun request can only be recorded while a run is in flight, and it is
/// consumed when the follow-up run starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunPhase {
    /// Nothing scheduled, nothing running.
    #[default]
    Idle,
    /// A debounce timer is armed; the run starts when it fires.
    Debouncing,
    /// A run is in flight.
    Running,
    /// A run is in flight and another one must start as soon as it finishes.
    RunningWithPendingRerun,
}

impl RunPhase {
    pub fn is_running(self) -> bool {
        matches!(self, RunPhase::Running | RunPhase::RunningWithPendingRerun)
    }

    pub fn has_pending_rerun(self) -> bool {
        matches!(self, RunPhase::RunningWithPendingRerun)
    }
}

/// Generation number of an armed debounce timer. Timer events carrying an
/// older generation are stale and ignored.
pub type TimerGeneration = u64;

pub struct Script {
    code: ScriptCode,
    label: String,
    command: String,
    problem_matcher: Option<ProblemMatcher>,
    delay: Option<Duration>,
    enabled: bool,

    pub(crate) phase: RunPhase,
    pub(crate) timer: Option<TimerGeneration>,
    last_errors: Vec<String>,
    error_click_index: usize,

    display: Box<dyn StatusIndicator>,
    disposed: bool,
}

impl fmt::Debug for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Script")
            .field("code", &self.code)
            .field("label", &self.label)
            .field("enabled", &self.enabled)
            .field("phase", &self.phase)
            .field("errors", &self.last_errors.len())
            .finish_non_exhaustive()
    }
}

impl Script {
    pub(crate) fn prepare(
        code: ScriptCode,
        config: &ScriptConfig,
        enabled: bool,
        mut display: Box<dyn StatusIndicator>,
    ) -> Self {
        let initial = if enabled {
            IndicatorState::Idle
        } else {
            IndicatorState::Disabled
        };
        show_state(display.as_mut(), &config.label, initial);

        Self {
            code,
            label: config.label.clone(),
            command: config.command.clone(),
            problem_matcher: config.problem_matcher.clone(),
            delay: config.delay,
            enabled,
            phase: RunPhase::Idle,
            timer: None,
            last_errors: Vec::new(),
            error_click_index: 0,
            display,
            disposed: false,
        }
    }

    pub fn code(&self) -> &ScriptCode {
        &self.code
    }

    pub fn category(&self) -> Option<ScriptCategory> {
        self.code.category()
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn problem_matcher(&self) -> Option<&ProblemMatcher> {
        self.problem_matcher.as_ref()
    }

    /// Per-script delay override (async scripts only).
    pub fn delay(&self) -> Option<Duration> {
        self.delay
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase.is_running()
    }

    pub fn is_pending(&self) -> bool {
        self.phase.has_pending_rerun()
    }

    pub fn has_armed_timer(&self) -> bool {
        self.timer.is_some()
    }

    pub fn last_errors(&self) -> &[String] {
        &self.last_errors
    }

    pub fn error_click_index(&self) -> usize {
        self.error_click_index
    }

    pub(crate) fn show(&mut self, state: IndicatorState) {
        show_state(self.display.as_mut(), &self.label, state);
    }

    /// Store the result of a finished run and reset the error cursor.
    pub(crate) fn record_errors(&mut self, errors: Vec<String>, elapsed: Duration) {
        self.last_errors = errors;
        self.error_click_index = 0;
        let state = if self.last_errors.is_empty() {
            IndicatorState::Succeeded(elapsed)
        } else {
            IndicatorState::Failed(self.last_errors.len())
        };
        self.show(state);
    }

    /// Return the error under the cursor and advance the cursor, wrapping.
    pub(crate) fn next_error(&mut self) -> Option<String> {
        if self.last_errors.is_empty() {
            return None;
        }
        let idx = self.error_click_index % self.last_errors.len();
        self.error_click_index = (idx + 1) % self.last_errors.len();
        Some(self.last_errors[idx].clone())
    }

    pub(crate) fn dispose(&mut self) {
        if !self.disposed {
            self.display.dispose();
            self.disposed = true;
        }
    }
}
