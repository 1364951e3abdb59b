use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use onsave::exec::{ProcessOutput, ProcessRunner, RunFuture};
use tokio::time::Instant;

/// One start or finish of a fake command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunEvent {
    pub command: String,
    pub finished: bool,
    pub at: Instant,
}

#[derive(Debug, Default)]
struct FakeState {
    outputs: HashMap<String, VecDeque<ProcessOutput>>,
    durations: HashMap<String, Duration>,
    panics: Vec<String>,
    events: Vec<RunEvent>,
}

/// A fake process runner that:
/// - records when each command started and finished
/// - sleeps for a per-command duration (virtual under a paused clock)
/// - returns scripted outputs in order, then succeeds with empty output.
#[derive(Debug, Clone, Default)]
pub struct FakeProcessRunner {
    state: Arc<Mutex<FakeState>>,
}

impl FakeProcessRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every run of `command` takes `duration`.
    pub fn with_duration(self, command: &str, duration: Duration) -> Self {
        self.lock().durations.insert(command.to_string(), duration);
        self
    }

    /// Queue the output of the next run of `command`.
    pub fn push_output(&self, command: &str, output: ProcessOutput) {
        self.lock()
            .outputs
            .entry(command.to_string())
            .or_default()
            .push_back(output);
    }

    /// Runs of `command` panic instead of returning.
    pub fn panic_on(self, command: &str) -> Self {
        self.lock().panics.push(command.to_string());
        self
    }

    pub fn events(&self) -> Vec<RunEvent> {
        self.lock().events.clone()
    }

    /// Commands in the order they were started.
    pub fn started(&self) -> Vec<String> {
        self.lock()
            .events
            .iter()
            .filter(|e| !e.finished)
            .map(|e| e.command.clone())
            .collect()
    }

    /// Start instants of `command`.
    pub fn starts_of(&self, command: &str) -> Vec<Instant> {
        self.lock()
            .events
            .iter()
            .filter(|e| !e.finished && e.command == command)
            .map(|e| e.at)
            .collect()
    }

    pub fn run_count(&self, command: &str) -> usize {
        self.starts_of(command).len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn record(&self, command: &str, finished: bool) {
        self.lock().events.push(RunEvent {
            command: command.to_string(),
            finished,
            at: Instant::now(),
        });
    }
}

impl ProcessRunner for FakeProcessRunner {
    fn run<'a>(&'a self, command: &'a str, _cwd: &'a Path) -> RunFuture<'a> {
        Box::pin(async move {
            self.record(command, false);
            let (duration, should_panic) = {
                let state = self.lock();
                (
                    state.durations.get(command).copied().unwrap_or_default(),
                    state.panics.iter().any(|c| c == command),
                )
            };
            if !duration.is_zero() {
                tokio::time::sleep(duration).await;
            }
            if should_panic {
                panic!("fake runner asked to panic on {command}");
            }
            let output = self
                .lock()
                .outputs
                .get_mut(command)
                .and_then(VecDeque::pop_front)
                .unwrap_or_default();
            self.record(command, true);
            output
        })
    }
}
