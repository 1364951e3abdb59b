use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use onsave::errors::{OnsaveError, Result};
use onsave::host::{
    ErrorLocation, IndicatorColor, PromptFuture, Prompter, StatusIndicator, StatusSurface,
    TaskChoice,
};
use onsave::types::ScriptCode;

/// Output lines carry an `HH:MM:SS  ` prefix.
const TIMESTAMP_LEN: usize = 10;

#[derive(Debug, Default)]
struct Recorded {
    lines: Vec<String>,
    texts: HashMap<ScriptCode, Vec<String>>,
    colors: HashMap<ScriptCode, IndicatorColor>,
    disposed: Vec<ScriptCode>,
    opened: Vec<ErrorLocation>,
    reveals: usize,
}

/// A [`StatusSurface`] that remembers everything the core shows.
///
/// Locations under `missing_prefix` fail to open, like files that do not
/// exist.
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    recorded: Arc<Mutex<Recorded>>,
    missing_prefix: Option<PathBuf>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_missing_files_under(mut self, prefix: impl Into<PathBuf>) -> Self {
        self.missing_prefix = Some(prefix.into());
        self
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Recorded> {
        self.recorded.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Output lines without their timestamp; blank separator lines are kept.
    pub fn messages(&self) -> Vec<String> {
        self.lock()
            .lines
            .iter()
            .map(|line| line.get(TIMESTAMP_LEN..).unwrap_or("").to_string())
            .collect()
    }

    pub fn count(&self, message: &str) -> usize {
        self.messages().iter().filter(|m| *m == message).count()
    }

    pub fn contains(&self, message: &str) -> bool {
        self.count(message) > 0
    }

    /// Every text ever shown for `code`, oldest first.
    pub fn texts(&self, code: &str) -> Vec<String> {
        self.lock()
            .texts
            .get(&ScriptCode::from(code))
            .cloned()
            .unwrap_or_default()
    }

    pub fn last_text(&self, code: &str) -> Option<String> {
        self.texts(code).pop()
    }

    pub fn color(&self, code: &str) -> Option<IndicatorColor> {
        self.lock().colors.get(&ScriptCode::from(code)).copied()
    }

    pub fn disposed(&self) -> Vec<ScriptCode> {
        self.lock().disposed.clone()
    }

    pub fn opened(&self) -> Vec<ErrorLocation> {
        self.lock().opened.clone()
    }

    pub fn reveals(&self) -> usize {
        self.lock().reveals
    }
}

struct RecordingIndicator {
    code: ScriptCode,
    recorded: Arc<Mutex<Recorded>>,
}

impl RecordingIndicator {
    fn with<T>(&self, f: impl FnOnce(&mut Recorded) -> T) -> T {
        let mut guard = self.recorded.lock().unwrap_or_else(|p| p.into_inner());
        f(&mut guard)
    }
}

impl StatusIndicator for RecordingIndicator {
    fn set_text(&mut self, text: &str) {
        self.with(|r| {
            r.texts
                .entry(self.code.clone())
                .or_default()
                .push(text.to_string())
        });
    }

    fn set_color(&mut self, color: IndicatorColor) {
        self.with(|r| r.colors.insert(self.code.clone(), color));
    }

    fn set_tooltip(&mut self, _tooltip: &str) {}

    fn dispose(&mut self) {
        self.with(|r| r.disposed.push(self.code.clone()));
    }
}

impl StatusSurface for RecordingSurface {
    fn create_indicator(&self, code: &ScriptCode, _label: &str) -> Box<dyn StatusIndicator> {
        Box::new(RecordingIndicator {
            code: code.clone(),
            recorded: Arc::clone(&self.recorded),
        })
    }

    fn append_output(&self, line: &str) {
        self.lock().lines.push(line.to_string());
    }

    fn reveal_output(&self) {
        self.lock().reveals += 1;
    }

    fn open_location(&self, location: &ErrorLocation) -> Result<()> {
        if let Some(prefix) = &self.missing_prefix
            && location.path.starts_with(prefix)
        {
            return Err(OnsaveError::Navigation {
                path: location.path.clone(),
                line: location.line,
                column: location.column,
                reason: "no such file".to_string(),
            });
        }
        self.lock().opened.push(location.clone());
        Ok(())
    }
}

/// A [`Prompter`] with canned answers that counts how often it was asked.
#[derive(Debug, Default)]
pub struct RecordingPrompter {
    approve: AtomicBool,
    confirmations: AtomicUsize,
    selection: Mutex<Option<BTreeSet<ScriptCode>>>,
    offered: Mutex<Vec<TaskChoice>>,
}

impl RecordingPrompter {
    /// Approves every configuration change.
    pub fn approving() -> Self {
        let prompter = Self::default();
        prompter.set_approve(true);
        prompter
    }

    /// Declines every configuration change.
    pub fn declining() -> Self {
        Self::default()
    }

    pub fn set_approve(&self, approve: bool) {
        self.approve.store(approve, Ordering::SeqCst);
    }

    /// Answer the next task picker with these enabled codes.
    pub fn select(&self, enabled: &[&str]) {
        let set = enabled.iter().map(|c| ScriptCode::from(*c)).collect();
        *self.selection.lock().unwrap_or_else(|p| p.into_inner()) = Some(set);
    }

    pub fn confirmations(&self) -> usize {
        self.confirmations.load(Ordering::SeqCst)
    }

    /// Choices shown by the last task picker.
    pub fn offered(&self) -> Vec<TaskChoice> {
        self.offered.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

impl Prompter for RecordingPrompter {
    fn confirm_config_change<'a>(&'a self, _path: &'a Path) -> PromptFuture<'a, bool> {
        self.confirmations.fetch_add(1, Ordering::SeqCst);
        let answer = self.approve.load(Ordering::SeqCst);
        Box::pin(async move { answer })
    }

    fn choose_enabled_tasks(
        &self,
        choices: Vec<TaskChoice>,
    ) -> PromptFuture<'_, Option<BTreeSet<ScriptCode>>> {
        *self.offered.lock().unwrap_or_else(|p| p.into_inner()) = choices;
        let answer = self
            .selection
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .take();
        Box::pin(async move { answer })
    }
}
