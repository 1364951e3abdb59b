use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Scheduling class of a script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ScriptCategory {
    /// Triggered and run independently of every other script.
    Async,
    /// Member of the single ordered sync batch.
    Sync,
}

impl ScriptCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            ScriptCategory::Async => "async",
            ScriptCategory::Sync => "sync",
        }
    }
}

impl fmt::Display for ScriptCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable identity of a script inside one loaded configuration, e.g. `async:0`
/// or `sync:1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScriptCode(String);

impl ScriptCode {
    pub fn new(category: ScriptCategory, index: usize) -> Self {
        Self(format!("{category}:{index}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Category encoded in the code, if it is well formed.
    pub fn category(&self) -> Option<ScriptCategory> {
        match self.0.split_once(':')?.0 {
            "async" => Some(ScriptCategory::Async),
            "sync" => Some(ScriptCategory::Sync),
            _ => None,
        }
    }
}

impl fmt::Display for ScriptCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ScriptCode {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl FromStr for ScriptCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = ScriptCode(s.trim().to_string());
        match code.category() {
            Some(_) if code.0.split_once(':').is_some_and(|(_, i)| i.parse::<usize>().is_ok()) => {
                Ok(code)
            }
            _ => Err(format!(
                "invalid script code: {s} (expected \"async:<n>\" or \"sync:<n>\")"
            )),
        }
    }
}

/// Why the workspace trigger fired. All reasons funnel through the same
/// dispatch path; the reason only shows up in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    /// Manual "execute now" command.
    Manual,
    /// A file was created.
    FileCreated,
    /// A file was modified / saved.
    FileSaved,
    /// A file was deleted.
    FileDeleted,
}
