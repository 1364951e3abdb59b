// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! This module contains a synchronous, deterministic "core runtime" that
//! consumes [`RuntimeEvent`]s and produces:
//! - an updated core state (active configuration, script phases, results)
//! - a list of [`CoreCommand`]s describing what the IO shell should do next
//!
//! The async/IO-heavy shell (`engine::runtime::Runtime`) is responsible for:
//! - reading events from channels
//! - arming timers and spawning script runs
//! - running reloads and prompts
//!
//! The only side effects performed here are synchronous host calls: indicator
//! updates, output-log lines and opening an error location.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::ReloadOutcome;
use crate::engine::{CoreCommand, CoreStep, Epoch, RunSummary, RuntimeEvent, RuntimeOptions};
use crate::exec::{ExecutionReport, ExecutionRequest, RunOutcome};
use crate::host::{
    IndicatorState, OutputLog, StatusSurface, TaskChoice, parse_error_location,
};
use crate::registry::{RunPhase, Script, ScriptRegistry, TimerGeneration};
use crate::scheduler::{DebounceScheduler, SchedulerCommand, SyncGroupState, TimerKey};
use crate::types::{ScriptCategory, ScriptCode, TriggerReason};

const NO_TASKS_MESSAGE: &str = "No tasks found in .statusBarTask.json";

/// The configuration currently in effect, with its scheduling state.
#[derive(Debug)]
pub(super) struct ActiveConfig {
    pub(super) epoch: Epoch,
    pub(super) path: PathBuf,
    pub(super) registry: ScriptRegistry,
    pub(super) sync: SyncGroupState,
}

/// Pure core runtime state.
///
/// It has **no** channels, does not spawn anything and never waits.
pub struct CoreRuntime {
    pub(super) workspace: PathBuf,
    pub(super) surface: Arc<dyn StatusSurface>,
    pub(super) output: OutputLog,
    pub(super) scheduler: DebounceScheduler,
    pub(super) options: RuntimeOptions,
    pub(super) active: Option<ActiveConfig>,
    epoch: Epoch,
    reload_in_progress: bool,
    reload_queued: bool,
    in_flight: usize,
    runs: usize,
    /// Whether the last run of each script (current epoch) was clean.
    results: BTreeMap<ScriptCode, bool>,
}

impl fmt::Debug for CoreRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoreRuntime")
            .field("workspace", &self.workspace)
            .field("epoch", &self.epoch)
            .field("active", &self.active)
            .field("in_flight", &self.in_flight)
            .finish_non_exhaustive()
    }
}

impl CoreRuntime {
    pub fn new(
        workspace: impl Into<PathBuf>,
        surface: Arc<dyn StatusSurface>,
        options: RuntimeOptions,
    ) -> Self {
        let output = OutputLog::new(Arc::clone(&surface));
        Self {
            workspace: workspace.into(),
            surface,
            scheduler: DebounceScheduler::new(output.clone()),
            output,
            options,
            active: None,
            epoch: 0,
            reload_in_progress: false,
            reload_queued: false,
            in_flight: 0,
            runs: 0,
            results: BTreeMap::new(),
        }
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    pub fn output(&self) -> &OutputLog {
        &self.output
    }

    /// Registry of the active configuration, if any.
    pub fn registry(&self) -> Option<&ScriptRegistry> {
        self.active.as_ref().map(|a| &a.registry)
    }

    pub fn sync_group(&self) -> Option<&SyncGroupState> {
        self.active.as_ref().map(|a| &a.sync)
    }

    /// Epoch of the active configuration (0 before the first load).
    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    /// No timers armed, no runs in flight, no reload underway.
    pub fn is_idle(&self) -> bool {
        if self.reload_in_progress || self.in_flight > 0 {
            return false;
        }
        self.active.as_ref().is_none_or(|active| {
            active.sync.phase() == RunPhase::Idle
                && active
                    .registry
                    .scripts()
                    .all(|s| s.phase() == RunPhase::Idle && !s.has_armed_timer())
        })
    }

    /// Handle a single runtime event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        match event {
            RuntimeEvent::WorkspaceChanged { reason } => {
                let commands = self.on_workspace_event(reason);
                CoreStep::continue_with(commands)
            }
            RuntimeEvent::ReinitRequested => CoreStep::continue_with(self.on_reinit()),
            RuntimeEvent::ConfigReloaded(outcome) => self.apply_reload(outcome),
            RuntimeEvent::GoToError { code } => {
                self.go_to_error(&code);
                CoreStep::continue_with(Vec::new())
            }
            RuntimeEvent::ToggleTasksRequested => CoreStep::continue_with(self.toggle_tasks()),
            RuntimeEvent::StatusRequested => {
                self.report_status();
                CoreStep::continue_with(Vec::new())
            }
            RuntimeEvent::TimerFired {
                epoch,
                key,
                generation,
            } => {
                let commands = self.on_timer(epoch, key, generation);
                self.finish_step(commands)
            }
            RuntimeEvent::ExecutionFinished { epoch, report } => {
                let commands = self.on_execution_finished(epoch, report);
                self.finish_step(commands)
            }
            RuntimeEvent::ShutdownRequested => CoreStep {
                commands: Vec::new(),
                keep_running: false,
            },
        }
    }

    /// In `--once` mode, stop as soon as nothing is left to do.
    fn finish_step(&self, mut commands: Vec<CoreCommand>) -> CoreStep {
        if self.options.exit_when_idle && self.is_idle() {
            commands.push(CoreCommand::RequestExit);
            return CoreStep {
                commands,
                keep_running: false,
            };
        }
        CoreStep::continue_with(commands)
    }

    fn apply_reload(&mut self, outcome: ReloadOutcome) -> CoreStep {
        self.reload_in_progress = false;
        let mut commands = Vec::new();

        match outcome {
            ReloadOutcome::Loaded {
                path,
                config,
                disabled,
            } => {
                self.discard_active(&mut commands);
                self.epoch += 1;
                let registry = ScriptRegistry::load(&config, &disabled, self.surface.as_ref());
                info!(
                    epoch = self.epoch,
                    path = ?path,
                    scripts = registry.len(),
                    disabled = disabled.len(),
                    "configuration loaded"
                );
                self.active = Some(ActiveConfig {
                    epoch: self.epoch,
                    path,
                    registry,
                    sync: SyncGroupState::new(),
                });
                self.results.clear();

                if self.options.exit_when_idle {
                    commands.extend(self.on_workspace_event(TriggerReason::Manual));
                }
            }
            ReloadOutcome::Missing => {
                debug!("no configuration file; triggers are ignored");
                self.discard_active(&mut commands);
            }
            ReloadOutcome::Invalid { path, error } => {
                warn!(path = ?path, error = %error, "configuration rejected as invalid");
                self.discard_active(&mut commands);
            }
            ReloadOutcome::Rejected(path) => {
                debug!(path = ?path, "configuration change declined; keeping current state");
            }
        }

        if self.reload_queued {
            self.reload_queued = false;
            self.reload_in_progress = true;
            commands.push(CoreCommand::Reload);
            return CoreStep::continue_with(commands);
        }
        self.finish_step(commands)
    }

    fn discard_active(&mut self, commands: &mut Vec<CoreCommand>) {
        if let Some(mut previous) = self.active.take() {
            debug!(epoch = previous.epoch, path = ?previous.path, "tearing down configuration");
            previous.registry.teardown();
            commands.push(CoreCommand::CancelTimers);
        }
    }

    pub(super) fn on_reinit(&mut self) -> Vec<CoreCommand> {
        if self.reload_in_progress {
            debug!("reload already underway; queueing another one");
            self.reload_queued = true;
            return Vec::new();
        }
        self.reload_in_progress = true;
        vec![CoreCommand::Reload]
    }

    fn on_timer(
        &mut self,
        epoch: Epoch,
        key: TimerKey,
        generation: TimerGeneration,
    ) -> Vec<CoreCommand> {
        let Some(active) = self.active.as_mut().filter(|a| a.epoch == epoch) else {
            debug!(epoch, ?key, "ignoring timer of a replaced configuration");
            return Vec::new();
        };

        let commands = match key {
            TimerKey::Script(code) => {
                self.scheduler
                    .async_timer_fired(&mut active.registry, &code, generation)
            }
            TimerKey::SyncGroup => self.scheduler.sync_timer_fired(
                &mut active.registry,
                &mut active.sync,
                generation,
                Instant::now(),
            ),
        };
        self.lift(commands)
    }

    fn on_execution_finished(&mut self, epoch: Epoch, report: ExecutionReport) -> Vec<CoreCommand> {
        self.in_flight = self.in_flight.saturating_sub(1);
        self.runs += 1;

        let Some(active) = self.active.as_mut().filter(|a| a.epoch == epoch) else {
            debug!(epoch, script = %report.code, "ignoring result of a replaced configuration");
            return Vec::new();
        };
        let code = report.code.clone();
        let clean = report.is_clean();
        let Some(script) = active.registry.get_mut(&code) else {
            return Vec::new();
        };

        match report.outcome {
            RunOutcome::Completed { errors } => script.record_errors(errors, report.elapsed),
            RunOutcome::Crashed(reason) => {
                self.output.log(format!("Error: {reason}"));
                script.show(IndicatorState::Crashed);
            }
        }
        self.results.insert(code.clone(), clean);

        let commands = match code.category() {
            Some(ScriptCategory::Async) => {
                self.scheduler.async_run_finished(&mut active.registry, &code)
            }
            Some(ScriptCategory::Sync) => self.scheduler.sync_script_finished(
                &mut active.registry,
                &mut active.sync,
                &code,
                Instant::now(),
            ),
            None => Vec::new(),
        };
        self.lift(commands)
    }

    /// Turn scheduler commands into shell commands for the active epoch.
    pub(super) fn lift(&mut self, commands: Vec<SchedulerCommand>) -> Vec<CoreCommand> {
        let Some(active) = self.active.as_ref() else {
            return Vec::new();
        };
        let epoch = active.epoch;
        let mut lifted = Vec::with_capacity(commands.len());

        for command in commands {
            match command {
                SchedulerCommand::ArmTimer {
                    key,
                    generation,
                    delay,
                } => lifted.push(CoreCommand::ArmTimer {
                    epoch,
                    key,
                    generation,
                    delay,
                }),
                SchedulerCommand::Execute(code) => {
                    if let Some(script) = active.registry.get(&code) {
                        self.in_flight += 1;
                        lifted.push(CoreCommand::Execute {
                            epoch,
                            request: ExecutionRequest::for_script(script),
                        });
                    }
                }
            }
        }
        lifted
    }

    /// Open the next stored error of `code`, cycling through the list.
    pub fn go_to_error(&mut self, code: &ScriptCode) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        let Some(script) = active.registry.get_mut(code) else {
            warn!(script = %code, "go-to-error for an unknown script");
            return;
        };
        let Some(error) = script.next_error() else {
            debug!(script = %code, "no stored errors");
            return;
        };

        let Some(location) = parse_error_location(&error, &self.workspace) else {
            self.output.log(format!("Cannot parse error location: {error}"));
            self.output.reveal();
            return;
        };
        if let Err(err) = self.surface.open_location(&location) {
            self.output.log(err.to_string());
            self.output.reveal();
        }
    }

    fn toggle_tasks(&self) -> Vec<CoreCommand> {
        let Some(registry) = self.registry().filter(|r| !r.is_empty()) else {
            self.output.log(NO_TASKS_MESSAGE);
            return Vec::new();
        };
        let choices = registry
            .scripts()
            .map(|s| TaskChoice {
                code: s.code().clone(),
                label: s.label().to_string(),
                picked: s.is_enabled(),
            })
            .collect();
        vec![CoreCommand::ChooseTasks(choices)]
    }

    fn report_status(&self) {
        let Some(active) = self.active.as_ref().filter(|a| !a.registry.is_empty()) else {
            self.output.log(NO_TASKS_MESSAGE);
            return;
        };
        for script in active.registry.scripts() {
            self.output.log(format!(
                "{} [{}]: {}",
                script.label(),
                script.code(),
                describe(script)
            ));
        }
        if !active.registry.enabled_sync_codes().is_empty() {
            self.output
                .log(format!("Sync group: {}", describe_phase(active.sync.phase())));
        }
    }

    pub fn summary(&self) -> RunSummary {
        let failed = self
            .results
            .iter()
            .filter(|(_, clean)| !**clean)
            .filter_map(|(code, _)| self.registry()?.get(code))
            .map(|s| s.label().to_string())
            .collect();
        RunSummary {
            config_loaded: self.active.is_some(),
            runs: self.runs,
            failed,
        }
    }

    /// Release every display handle.
    pub fn shutdown(&mut self) {
        if let Some(mut active) = self.active.take() {
            active.registry.teardown();
        }
    }
}

fn describe(script: &Script) -> String {
    if !script.is_enabled() {
        return "disabled".to_string();
    }
    let errors = script.last_errors().len();
    match errors {
        0 => describe_phase(script.phase()).to_string(),
        n => format!("{}, {n} error(s)", describe_phase(script.phase())),
    }
}

fn describe_phase(phase: RunPhase) -> &'static str {
    match phase {
        RunPhase::Idle => "idle",
        RunPhase::Debouncing => "waiting",
        RunPhase::Running => "running",
        RunPhase::RunningWithPendingRerun => "running, will run again",
    }
}
