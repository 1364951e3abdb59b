// src/scheduler/async_debounce.rs

//! Per-script debounce for async scripts.
//!
//! `Idle -> Debouncing -> Running -> (Idle | RunningWithPendingRerun -> Running)`
//!
//! A trigger always re-arms the script's timer. A timer that fires while the
//! script runs only records a rerun; the rerun starts immediately when the
//! current run finishes, without another delay.

use tracing::debug;

use crate::host::IndicatorState;
use crate::registry::{RunPhase, ScriptRegistry, TimerGeneration};
use crate::types::ScriptCode;

use super::{DebounceScheduler, SchedulerCommand, TimerKey, millis};

impl DebounceScheduler {
    pub fn trigger_async(
        &mut self,
        registry: &mut ScriptRegistry,
        code: &ScriptCode,
    ) -> Vec<SchedulerCommand> {
        let default_delay = registry.async_delay();
        let generation = self.next_generation();
        let Some(script) = registry.get_mut(code) else {
            return Vec::new();
        };
        if !script.is_enabled() {
            return Vec::new();
        }

        let delay = script.delay().unwrap_or(default_delay);
        self.output
            .log(format!("{}: waiting {} ms", script.label(), millis(delay)));

        script.timer = Some(generation);
        if !script.is_running() {
            script.phase = RunPhase::Debouncing;
            script.show(IndicatorState::Pending);
        }

        vec![SchedulerCommand::ArmTimer {
            key: TimerKey::Script(code.clone()),
            generation,
            delay,
        }]
    }

    pub fn async_timer_fired(
        &mut self,
        registry: &mut ScriptRegistry,
        code: &ScriptCode,
        generation: TimerGeneration,
    ) -> Vec<SchedulerCommand> {
        let Some(script) = registry.get_mut(code) else {
            return Vec::new();
        };
        if script.timer != Some(generation) {
            debug!(script = %code, generation, "ignoring superseded timer");
            return Vec::new();
        }
        script.timer = None;

        if script.is_running() {
            self.output.log(format!("{}: Already running", script.label()));
            script.phase = RunPhase::RunningWithPendingRerun;
            return Vec::new();
        }

        self.output.log(format!("{}: Execute", script.label()));
        script.phase = RunPhase::Running;
        script.show(IndicatorState::Running);
        vec![SchedulerCommand::Execute(code.clone())]
    }

    /// Called after the run's result has been recorded on the script.
    pub fn async_run_finished(
        &mut self,
        registry: &mut ScriptRegistry,
        code: &ScriptCode,
    ) -> Vec<SchedulerCommand> {
        let Some(script) = registry.get_mut(code) else {
            return Vec::new();
        };

        match script.phase {
            RunPhase::RunningWithPendingRerun => {
                self.output.log(format!("{}: Run again", script.label()));
                script.phase = RunPhase::Running;
                script.show(IndicatorState::Running);
                vec![SchedulerCommand::Execute(code.clone())]
            }
            RunPhase::Running => {
                script.phase = if script.has_armed_timer() {
                    RunPhase::Debouncing
                } else {
                    RunPhase::Idle
                };
                Vec::new()
            }
            phase => {
                debug!(script = %code, ?phase, "run finished for a script that was not running");
                Vec::new()
            }
        }
    }
}
