// src/host/output.rs

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Local};

use super::StatusSurface;

/// User-facing, append-only output log.
///
/// Every line is prefixed with the local wall-clock time as `HH:MM:SS`
/// followed by two spaces, and mirrored to `tracing` at info level.
#[derive(Clone)]
pub struct OutputLog {
    surface: Arc<dyn StatusSurface>,
}

impl fmt::Debug for OutputLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputLog").finish_non_exhaustive()
    }
}

impl OutputLog {
    pub fn new(surface: Arc<dyn StatusSurface>) -> Self {
        Self { surface }
    }

    pub fn log(&self, message: impl AsRef<str>) {
        let message = message.as_ref();
        tracing::info!(target: "onsave::output", "{message}");
        self.surface
            .append_output(&format_line(Local::now(), message));
    }

    /// Visual separator between trigger cycles.
    pub fn blank_line(&self) {
        self.surface.append_output("");
    }

    pub fn reveal(&self) {
        self.surface.reveal_output();
    }
}

pub fn format_line(at: DateTime<Local>, message: &str) -> String {
    format!("{}  {message}", at.format("%H:%M:%S"))
}
