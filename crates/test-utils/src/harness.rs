use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use onsave::config::CONFIG_FILE_NAME;
use onsave::engine::{CoreRuntime, RunSummary, Runtime, RuntimeEvent, RuntimeOptions, RuntimeServices};
use onsave::exec::ExecutionEngine;
use onsave::fs::mock::MockFileSystem;
use onsave::state::MemoryStateStore;
use onsave::types::{ScriptCode, TriggerReason};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::fake_runner::FakeProcessRunner;
use crate::recording::{RecordingPrompter, RecordingSurface};

pub const WORKSPACE: &str = "/ws";

/// A full runtime wired to in-memory collaborators, running on its own task.
pub struct Harness {
    pub tx: mpsc::Sender<RuntimeEvent>,
    pub surface: RecordingSurface,
    pub prompter: Arc<RecordingPrompter>,
    pub runner: FakeProcessRunner,
    pub store: Arc<MemoryStateStore>,
    pub fs: MockFileSystem,
    handle: JoinHandle<RunSummary>,
}

/// Builds a [`Harness`].
pub struct HarnessBuilder {
    fs: MockFileSystem,
    store: Arc<MemoryStateStore>,
    surface: RecordingSurface,
    prompter: Arc<RecordingPrompter>,
    runner: FakeProcessRunner,
    options: RuntimeOptions,
}

impl HarnessBuilder {
    pub fn new() -> Self {
        Self {
            fs: MockFileSystem::new(),
            store: Arc::new(MemoryStateStore::new()),
            surface: RecordingSurface::new(),
            prompter: Arc::new(RecordingPrompter::approving()),
            runner: FakeProcessRunner::new(),
            options: RuntimeOptions::default(),
        }
    }

    /// Put `json` at `/ws/.statusBarTask.json`.
    pub fn config(self, json: &str) -> Self {
        self.fs.add_file(config_path(), json);
        self
    }

    pub fn store(mut self, store: Arc<MemoryStateStore>) -> Self {
        self.store = store;
        self
    }

    pub fn surface(mut self, surface: RecordingSurface) -> Self {
        self.surface = surface;
        self
    }

    pub fn prompter(mut self, prompter: RecordingPrompter) -> Self {
        self.prompter = Arc::new(prompter);
        self
    }

    pub fn runner(mut self, runner: FakeProcessRunner) -> Self {
        self.runner = runner;
        self
    }

    pub fn once(mut self) -> Self {
        self.options.exit_when_idle = true;
        self
    }

    /// Spawn the runtime and request the initial load.
    pub async fn start(self) -> Harness {
        let workspace = PathBuf::from(WORKSPACE);
        let surface = Arc::new(self.surface.clone());
        let core = CoreRuntime::new(&workspace, surface, self.options);
        let output = core.output().clone();

        let (tx, rx) = mpsc::channel::<RuntimeEvent>(64);
        let engine = ExecutionEngine::new(Arc::new(self.runner.clone()), &workspace, output.clone());
        let services = Arc::new(RuntimeServices {
            workspace,
            fs: Arc::new(self.fs.clone()),
            store: self.store.clone(),
            prompter: self.prompter.clone(),
            output,
        });

        let runtime = Runtime::new(core, rx, tx.clone(), engine, services);
        let handle = tokio::spawn(runtime.run());
        tx.send(RuntimeEvent::ReinitRequested)
            .await
            .expect("runtime accepts the initial reload");

        Harness {
            tx,
            surface: self.surface,
            prompter: self.prompter,
            runner: self.runner,
            store: self.store,
            fs: self.fs,
            handle,
        }
    }
}

impl Default for HarnessBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Harness {
    pub fn builder() -> HarnessBuilder {
        HarnessBuilder::new()
    }

    pub async fn send(&self, event: RuntimeEvent) {
        self.tx.send(event).await.expect("runtime is running");
    }

    /// A file save in the workspace.
    pub async fn save(&self) {
        self.send(RuntimeEvent::WorkspaceChanged {
            reason: TriggerReason::FileSaved,
        })
        .await;
    }

    pub async fn reinit(&self) {
        self.send(RuntimeEvent::ReinitRequested).await;
    }

    pub async fn go_to_error(&self, code: &str) {
        self.send(RuntimeEvent::GoToError {
            code: ScriptCode::from(code),
        })
        .await;
    }

    pub fn write_config(&self, json: &str) {
        self.fs.add_file(config_path(), json);
    }

    /// Stop the runtime and return its summary.
    pub async fn shutdown(self) -> RunSummary {
        let _ = self.tx.send(RuntimeEvent::ShutdownRequested).await;
        self.join().await
    }

    /// Wait for the runtime to stop on its own.
    pub async fn join(self) -> RunSummary {
        self.handle.await.expect("runtime task panicked")
    }
}

pub fn config_path() -> PathBuf {
    Path::new(WORKSPACE).join(CONFIG_FILE_NAME)
}

/// Let every spawned task run until the clock would have to move by `ms`.
///
/// With a paused clock this advances virtual time exactly by `ms`.
pub async fn settle(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}
