// src/config/model.rs

use std::time::Duration;

use serde::Deserialize;

use crate::problem::ProblemMatcher;

/// Default delay for both async scripts and the sync group.
pub const DEFAULT_DELAY_MS: u64 = 2000;

/// Name of the configuration file looked up in the workspace root (and then in
/// its parent directory).
pub const CONFIG_FILE_NAME: &str = ".statusBarTask.json";

/// Configuration as read from `.statusBarTask.json`, before validation.
///
/// ```json
/// {
///   "asyncScriptsDelay": 1000,
///   "asyncScripts": [
///     { "label": "lint", "command": "npm run lint", "delay": 500,
///       "problemMatcher": { "matchPattern": "^(\\S+):(\\d+)", "replacePattern": "${1}:${2}" } }
///   ],
///   "syncScriptsDelay": 2000,
///   "syncScripts": [
///     { "label": "build", "command": "npm run build" },
///     { "label": "test", "command": "npm test" }
///   ]
/// }
/// ```
///
/// Every field is optional; `null` is treated like an absent field.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawConfigFile {
    #[serde(default)]
    pub async_scripts_delay: Option<u64>,

    #[serde(default)]
    pub sync_scripts_delay: Option<u64>,

    #[serde(default)]
    pub async_scripts: Option<Vec<RawScriptConfig>>,

    #[serde(default)]
    pub sync_scripts: Option<Vec<RawScriptConfig>>,
}

/// One entry of `asyncScripts` / `syncScripts`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawScriptConfig {
    /// Display name shown in the status indicator.
    pub label: String,

    /// Shell command, run with the workspace root as working directory.
    pub command: String,

    #[serde(default)]
    pub problem_matcher: Option<RawProblemMatcher>,

    /// Per-script debounce override in milliseconds. Only honoured for async
    /// scripts; the sync group always uses `syncScriptsDelay`.
    #[serde(default)]
    pub delay: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawProblemMatcher {
    pub match_pattern: String,

    #[serde(default)]
    pub replace_pattern: String,
}

/// Validated configuration with defaults applied and matchers compiled.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub async_scripts_delay: Duration,
    pub sync_scripts_delay: Duration,
    pub async_scripts: Vec<ScriptConfig>,
    pub sync_scripts: Vec<ScriptConfig>,
}

/// A validated script definition.
#[derive(Debug, Clone)]
pub struct ScriptConfig {
    pub label: String,
    pub command: String,
    pub problem_matcher: Option<ProblemMatcher>,
    /// Per-script delay override (always `None` for sync scripts).
    pub delay: Option<Duration>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        async_scripts_delay: Duration,
        sync_scripts_delay: Duration,
        async_scripts: Vec<ScriptConfig>,
        sync_scripts: Vec<ScriptConfig>,
    ) -> Self {
        Self {
            async_scripts_delay,
            sync_scripts_delay,
            async_scripts,
            sync_scripts,
        }
    }

    pub fn script_count(&self) -> usize {
        self.async_scripts.len() + self.sync_scripts.len()
    }
}
