// src/engine/runtime.rs

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::{ConfigLoader, ReloadOutcome};
use crate::exec::{ExecutionEngine, ExecutionReport, ExecutionRequest};
use crate::fs::FileSystem;
use crate::host::{OutputLog, Prompter, TaskChoice};
use crate::registry::TimerGeneration;
use crate::scheduler::TimerKey;
use crate::state::StateStore;
use crate::types::ScriptCode;

use super::core::CoreRuntime;
use super::{CoreCommand, Epoch, RunSummary, RuntimeEvent};

/// Collaborators used by the shell for reloads and the task picker.
pub struct RuntimeServices {
    pub workspace: PathBuf,
    pub fs: Arc<dyn FileSystem>,
    pub store: Arc<dyn StateStore>,
    pub prompter: Arc<dyn Prompter>,
    pub output: OutputLog,
}

impl fmt::Debug for RuntimeServices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeServices")
            .field("workspace", &self.workspace)
            .finish_non_exhaustive()
    }
}

impl RuntimeServices {
    pub async fn reload(&self) -> ReloadOutcome {
        let loader = ConfigLoader {
            fs: self.fs.as_ref(),
            store: self.store.as_ref(),
            prompter: self.prompter.as_ref(),
            output: &self.output,
        };
        loader.reload(&self.workspace).await
    }

    /// Ask for the enabled set and persist its complement. Returns whether
    /// anything was stored.
    pub async fn choose_tasks(&self, choices: Vec<TaskChoice>) -> bool {
        let Some(enabled) = self.prompter.choose_enabled_tasks(choices.clone()).await else {
            debug!("task picker dismissed");
            return false;
        };
        let disabled: BTreeSet<ScriptCode> = choices
            .into_iter()
            .map(|c| c.code)
            .filter(|code| !enabled.contains(code))
            .collect();
        if let Err(err) = self.store.set_disabled_tasks(&disabled) {
            warn!(error = %err, "failed to persist disabled tasks");
            return false;
        }
        true
    }
}

/// Drives the [`CoreRuntime`] in response to [`RuntimeEvent`]s.
///
/// This is a pure IO shell around the core, which contains all the runtime
/// semantics. It owns the timers (one per [`TimerKey`], re-arming aborts the
/// previous one) and spawns script runs, reloads and prompts as tasks that
/// report back over the event channel.
pub struct Runtime {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    event_tx: mpsc::Sender<RuntimeEvent>,
    engine: ExecutionEngine,
    services: Arc<RuntimeServices>,
    timers: HashMap<TimerKey, JoinHandle<()>>,
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .field("timers", &self.timers.len())
            .finish_non_exhaustive()
    }
}

impl Runtime {
    pub fn new(
        core: CoreRuntime,
        event_rx: mpsc::Receiver<RuntimeEvent>,
        event_tx: mpsc::Sender<RuntimeEvent>,
        engine: ExecutionEngine,
        services: Arc<RuntimeServices>,
    ) -> Self {
        Self {
            core,
            event_rx,
            event_tx,
            engine,
            services,
            timers: HashMap::new(),
        }
    }

    /// Main event loop.
    ///
    /// - Consumes `RuntimeEvent`s from `event_rx`.
    /// - Feeds them into the core runtime.
    /// - Executes commands returned by the core (timers, runs, reloads, exit).
    pub async fn run(mut self) -> RunSummary {
        info!(workspace = ?self.core.workspace(), "onsave runtime started");

        loop {
            let Some(event) = self.event_rx.recv().await else {
                info!("runtime event channel closed; exiting");
                break;
            };

            debug!(?event, "runtime received event");

            let step = self.core.step(event);
            for command in step.commands {
                self.execute_command(command);
            }

            if !step.keep_running {
                info!("core requested exit; stopping runtime");
                break;
            }
        }

        self.cancel_timers();
        let summary = self.core.summary();
        self.core.shutdown();
        info!(runs = summary.runs, failed = summary.failed.len(), "runtime exiting");
        summary
    }

    fn execute_command(&mut self, command: CoreCommand) {
        match command {
            CoreCommand::ArmTimer {
                epoch,
                key,
                generation,
                delay,
            } => self.arm_timer(epoch, key, generation, delay),
            CoreCommand::CancelTimers => self.cancel_timers(),
            CoreCommand::Execute { epoch, request } => self.spawn_execution(epoch, request),
            CoreCommand::Reload => self.spawn_reload(),
            CoreCommand::ChooseTasks(choices) => self.spawn_task_picker(choices),
            CoreCommand::RequestExit => {
                info!("core issued RequestExit command");
            }
        }
    }

    fn arm_timer(&mut self, epoch: Epoch, key: TimerKey, generation: TimerGeneration, delay: Duration) {
        if let Some(previous) = self.timers.remove(&key) {
            previous.abort();
        }
        debug!(?key, generation, delay_ms = delay.as_millis() as u64, "arming timer");

        let tx = self.event_tx.clone();
        let fired_key = key.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx
                .send(RuntimeEvent::TimerFired {
                    epoch,
                    key: fired_key,
                    generation,
                })
                .await;
        });
        self.timers.insert(key, handle);
    }

    fn cancel_timers(&mut self) {
        for (_, handle) in self.timers.drain() {
            handle.abort();
        }
    }

    fn spawn_execution(&self, epoch: Epoch, request: ExecutionRequest) {
        let engine = self.engine.clone();
        let tx = self.event_tx.clone();

        tokio::spawn(async move {
            let code = request.code.clone();
            // A panicking runner must not leave the script marked as running.
            let report = match tokio::spawn(async move { engine.run(request).await }).await {
                Ok(report) => report,
                Err(err) => {
                    warn!(script = %code, error = %err, "script run task failed");
                    ExecutionReport::crashed(code, err.to_string())
                }
            };
            let _ = tx
                .send(RuntimeEvent::ExecutionFinished { epoch, report })
                .await;
        });
    }

    fn spawn_reload(&self) {
        let services = Arc::clone(&self.services);
        let tx = self.event_tx.clone();
        tokio::spawn(async move {
            let outcome = services.reload().await;
            let _ = tx.send(RuntimeEvent::ConfigReloaded(outcome)).await;
        });
    }

    fn spawn_task_picker(&self, choices: Vec<TaskChoice>) {
        let services = Arc::clone(&self.services);
        let tx = self.event_tx.clone();
        tokio::spawn(async move {
            if services.choose_tasks(choices).await {
                let _ = tx.send(RuntimeEvent::ReinitRequested).await;
            }
        });
    }
}
