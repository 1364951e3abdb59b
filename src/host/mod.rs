// src/host/mod.rs

//! Host adapter boundary.
//!
//! The scheduling core never talks to a concrete UI. It is handed:
//! - a [`StatusSurface`] that creates per-script [`StatusIndicator`]s, owns the
//!   append-only output log and opens error locations,
//! - a [`Prompter`] for the two interactive questions (approve a changed
//!   configuration, pick enabled tasks).
//!
//! [`terminal`] provides the stdin/stdout implementation used by the binary.

use std::collections::BTreeSet;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;

use crate::errors::Result;
use crate::types::ScriptCode;

pub mod indicator;
pub mod navigation;
pub mod output;
pub mod terminal;

pub use indicator::{IndicatorState, show_state};
pub use navigation::{ErrorLocation, parse_error_location};
pub use output::OutputLog;
pub use terminal::{TerminalHost, parse_command, parse_selection};

/// Colour role of a status indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorColor {
    Default,
    Muted,
    Warning,
    Error,
    Success,
}

/// Host-owned display handle for one script.
pub trait StatusIndicator: Send {
    fn set_text(&mut self, text: &str);
    fn set_color(&mut self, color: IndicatorColor);
    fn set_tooltip(&mut self, tooltip: &str);
    /// Release the handle. Called once, at registry teardown.
    fn dispose(&mut self);
}

/// Synchronous host capabilities used by the core.
pub trait StatusSurface: Send + Sync {
    fn create_indicator(&self, code: &ScriptCode, label: &str) -> Box<dyn StatusIndicator>;
    fn append_output(&self, line: &str);
    fn reveal_output(&self);
    fn open_location(&self, location: &ErrorLocation) -> Result<()>;
}

/// One row of the enable/disable picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskChoice {
    pub code: ScriptCode,
    pub label: String,
    /// Currently enabled.
    pub picked: bool,
}

pub type PromptFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Interactive host questions. Both may take arbitrarily long.
pub trait Prompter: Send + Sync {
    /// Ask whether a configuration file whose checksum changed may be loaded.
    fn confirm_config_change<'a>(&'a self, path: &'a Path) -> PromptFuture<'a, bool>;

    /// Ask which tasks should be enabled. `None` means the picker was dismissed.
    fn choose_enabled_tasks(
        &self,
        choices: Vec<TaskChoice>,
    ) -> PromptFuture<'_, Option<BTreeSet<ScriptCode>>>;
}

/// Wraps another prompter and approves every configuration change without
/// asking (`--trust-config`).
pub struct TrustingPrompter {
    inner: Arc<dyn Prompter>,
}

impl TrustingPrompter {
    pub fn new(inner: Arc<dyn Prompter>) -> Self {
        Self { inner }
    }
}

impl Prompter for TrustingPrompter {
    fn confirm_config_change<'a>(&'a self, _path: &'a Path) -> PromptFuture<'a, bool> {
        Box::pin(async { true })
    }

    fn choose_enabled_tasks(
        &self,
        choices: Vec<TaskChoice>,
    ) -> PromptFuture<'_, Option<BTreeSet<ScriptCode>>> {
        self.inner.choose_enabled_tasks(choices)
    }
}
