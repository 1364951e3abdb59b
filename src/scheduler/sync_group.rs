// src/scheduler/sync_group.rs

//! Batch-level debounce for the sync scripts.
//!
//! The enabled sync scripts run as one ordered batch, one script at a time.
//! Only the group phase gates re-entry. A trigger that arrives mid-batch marks
//! the group as pending: the script currently running finishes, the remaining
//! ones are skipped, and a fresh pass over the whole list is scheduled.

use std::collections::VecDeque;

use tokio::time::Instant;
use tracing::debug;

use crate::host::IndicatorState;
use crate::registry::{RunPhase, ScriptRegistry, TimerGeneration};
use crate::types::ScriptCode;

use super::{DebounceScheduler, SYNC_RETRY_FLOOR, SchedulerCommand, TimerKey, millis};

/// Shared state of the sync group. One per loaded configuration.
#[derive(Debug, Default)]
pub struct SyncGroupState {
    phase: RunPhase,
    timer: Option<TimerGeneration>,
    last_change: Option<Instant>,
    remaining: VecDeque<ScriptCode>,
    current: Option<ScriptCode>,
}

impl SyncGroupState {
    pub fn new() -> Self {
        Self::default()
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

    /// Script of the batch currently in flight.
    pub fn current(&self) -> Option<&ScriptCode> {
        self.current.as_ref()
    }

    pub fn last_change(&self) -> Option<Instant> {
        self.last_change
    }
}

impl DebounceScheduler {
    /// A workspace trigger reached the sync group.
    pub fn trigger_sync(
        &mut self,
        registry: &mut ScriptRegistry,
        group: &mut SyncGroupState,
        now: Instant,
    ) -> Vec<SchedulerCommand> {
        group.last_change = Some(now);
        let delay = registry.sync_delay();
        self.arm_sync(registry, group, delay)
    }

    fn arm_sync(
        &mut self,
        registry: &mut ScriptRegistry,
        group: &mut SyncGroupState,
        delay: std::time::Duration,
    ) -> Vec<SchedulerCommand> {
        let members = registry.enabled_sync_codes();
        if members.is_empty() {
            return Vec::new();
        }

        self.output
            .log(format!("Sync scripts waiting {} ms", millis(delay)));

        if group.is_running() {
            group.phase = RunPhase::RunningWithPendingRerun;
        } else {
            group.phase = RunPhase::Debouncing;
        }
        for code in &members {
            if group.current.as_ref() == Some(code) {
                continue;
            }
            if let Some(script) = registry.get_mut(code) {
                script.show(IndicatorState::Pending);
            }
        }

        let generation = self.next_generation();
        group.timer = Some(generation);
        vec![SchedulerCommand::ArmTimer {
            key: TimerKey::SyncGroup,
            generation,
            delay,
        }]
    }

    pub fn sync_timer_fired(
        &mut self,
        registry: &mut ScriptRegistry,
        group: &mut SyncGroupState,
        generation: TimerGeneration,
        now: Instant,
    ) -> Vec<SchedulerCommand> {
        if group.timer != Some(generation) {
            debug!(generation, "ignoring superseded sync timer");
            return Vec::new();
        }
        group.timer = None;

        if group.is_running() {
            group.phase = RunPhase::RunningWithPendingRerun;
            return Vec::new();
        }

        group.phase = RunPhase::Running;
        group.remaining = registry.enabled_sync_codes().into();
        debug!(scripts = group.remaining.len(), "starting sync batch");
        self.next_in_batch(registry, group, now)
    }

    /// Called after the result of the batch's current script was recorded.
    pub fn sync_script_finished(
        &mut self,
        registry: &mut ScriptRegistry,
        group: &mut SyncGroupState,
        code: &ScriptCode,
        now: Instant,
    ) -> Vec<SchedulerCommand> {
        if group.current.as_ref() != Some(code) {
            debug!(script = %code, "sync completion for a script outside the current batch");
            return Vec::new();
        }
        group.current = None;

        if group.is_pending() && !group.remaining.is_empty() {
            debug!(skipped = group.remaining.len(), "sync batch interrupted by a new trigger");
            group.remaining.clear();
        }
        self.next_in_batch(registry, group, now)
    }

    fn next_in_batch(
        &mut self,
        registry: &mut ScriptRegistry,
        group: &mut SyncGroupState,
        now: Instant,
    ) -> Vec<SchedulerCommand> {
        while let Some(code) = group.remaining.pop_front() {
            let Some(script) = registry.get_mut(&code) else {
                continue;
            };
            self.output.log(format!("{}: Execute", script.label()));
            script.show(IndicatorState::Running);
            group.current = Some(code.clone());
            return vec![SchedulerCommand::Execute(code)];
        }
        self.finish_batch(registry, group, now)
    }

    fn finish_batch(
        &mut self,
        registry: &mut ScriptRegistry,
        group: &mut SyncGroupState,
        now: Instant,
    ) -> Vec<SchedulerCommand> {
        let rerun = group.is_pending();
        group.phase = RunPhase::Idle;
        if !rerun {
            return Vec::new();
        }

        self.output.log("Run again sync");
        let last_change = group.last_change.unwrap_or(now);
        let due = last_change + registry.sync_delay();
        let delay = due.saturating_duration_since(now).max(SYNC_RETRY_FLOOR);
        self.arm_sync(registry, group, delay)
    }
}
