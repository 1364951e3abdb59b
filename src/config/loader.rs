// src/config/loader.rs

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::config::checksum::checksum;
use crate::config::model::{CONFIG_FILE_NAME, ConfigFile, RawConfigFile};
use crate::errors::{OnsaveError, Result};
use crate::fs::FileSystem;
use crate::host::{OutputLog, Prompter};
use crate::state::StateStore;
use crate::types::ScriptCode;

/// Result of one (re)load attempt.
#[derive(Debug)]
pub enum ReloadOutcome {
    /// A configuration was approved and parsed.
    Loaded {
        path: PathBuf,
        config: ConfigFile,
        disabled: BTreeSet<ScriptCode>,
    },
    /// No configuration file in the workspace or its parent.
    Missing,
    /// The checksum changed and the user declined to load the file.
    Rejected(PathBuf),
    /// The file could not be read or parsed.
    Invalid { path: PathBuf, error: OnsaveError },
}

/// Find the configuration file: `<root>/.statusBarTask.json`, falling back to
/// `<root>/../.statusBarTask.json`.
pub fn locate_config(fs: &dyn FileSystem, workspace: &Path) -> Option<PathBuf> {
    let in_workspace = workspace.join(CONFIG_FILE_NAME);
    if fs.is_file(&in_workspace) {
        return Some(in_workspace);
    }
    let in_parent = workspace.join("..").join(CONFIG_FILE_NAME);
    if fs.is_file(&in_parent) {
        return Some(in_parent);
    }
    None
}

/// Parse and validate configuration text.
pub fn parse_config(text: &str) -> Result<ConfigFile> {
    let raw: RawConfigFile =
        serde_json::from_str(text).map_err(|e| OnsaveError::ConfigParse(e.to_string()))?;
    ConfigFile::try_from(raw)
}

/// Load and validate a configuration file without any checksum gate.
pub fn load_from_path(fs: &dyn FileSystem, path: &Path) -> Result<ConfigFile> {
    let text = fs.read_to_string(path)?;
    parse_config(&text)
}

/// Checksum-gated configuration loading.
///
/// Holds the collaborators for one workspace; [`ConfigLoader::reload`] is called
/// on every (re)initialisation.
pub struct ConfigLoader<'a> {
    pub fs: &'a dyn FileSystem,
    pub store: &'a dyn StateStore,
    pub prompter: &'a dyn Prompter,
    pub output: &'a OutputLog,
}

impl ConfigLoader<'_> {
    /// Locate, checksum, confirm (when changed) and parse the configuration.
    ///
    /// - unchanged checksum: load silently;
    /// - changed checksum: ask the prompter; the stored checksum is only
    ///   updated after approval;
    /// - declined: [`ReloadOutcome::Rejected`], callers keep what they had.
    pub async fn reload(&self, workspace: &Path) -> ReloadOutcome {
        let Some(path) = locate_config(self.fs, workspace) else {
            self.output
                .log("Config file not found in workspace or parent directory.");
            return ReloadOutcome::Missing;
        };

        let bytes = match self.fs.read(&path) {
            Ok(b) => b,
            Err(err) => return self.invalid(path, OnsaveError::Other(err)),
        };

        let current = checksum(&bytes);
        let stored = self.store.checksum().unwrap_or_else(|err| {
            warn!(error = %err, "failed to read stored config checksum; treating as unknown");
            None
        });

        if stored.as_deref() != Some(current.as_str()) {
            debug!(path = ?path, checksum = %current, "config checksum changed; asking for confirmation");
            if !self.prompter.confirm_config_change(&path).await {
                self.output.log(OnsaveError::ConfigChangeRejected(path.clone()).to_string());
                return ReloadOutcome::Rejected(path);
            }
            if let Err(err) = self.store.set_checksum(&current) {
                warn!(error = %err, "failed to persist approved config checksum");
            }
        }

        self.output.log(format!("Load config file {}", path.display()));

        let parsed = String::from_utf8(bytes)
            .map_err(|e| OnsaveError::ConfigParse(e.to_string()))
            .and_then(|text| parse_config(&text));

        match parsed {
            Ok(config) => {
                let disabled = self.store.disabled_tasks().unwrap_or_else(|err| {
                    warn!(error = %err, "failed to read disabled tasks; enabling all");
                    BTreeSet::new()
                });
                ReloadOutcome::Loaded {
                    path,
                    config,
                    disabled,
                }
            }
            Err(error) => self.invalid(path, error),
        }
    }

    fn invalid(&self, path: PathBuf, error: OnsaveError) -> ReloadOutcome {
        self.output.log(format!("Error: {error}"));
        ReloadOutcome::Invalid { path, error }
    }
}
