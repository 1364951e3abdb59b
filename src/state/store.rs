use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::fs::FileSystem;
use crate::types::ScriptCode;

/// Relative path (from the workspace root) to the state file.
///
/// The effective path on disk is `<root>/.onsave/state.json`.
pub const STATE_FILE_PATH: &str = ".onsave/state.json";

/// Abstract storage for persisted workspace state.
pub trait StateStore: Send + Sync {
    fn disabled_tasks(&self) -> Result<BTreeSet<ScriptCode>>;
    fn set_disabled_tasks(&self, disabled: &BTreeSet<ScriptCode>) -> Result<()>;
    fn checksum(&self) -> Result<Option<String>>;
    fn set_checksum(&self, checksum: &str) -> Result<()>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StateDocument {
    #[serde(default)]
    disabled_tasks: BTreeSet<ScriptCode>,
    #[serde(default)]
    checksum: Option<String>,
}

/// Stores state as JSON in `<root>/.onsave/state.json`.
#[derive(Debug)]
pub struct FileStateStore {
    path: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl FileStateStore {
    pub fn new(root: &Path, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            path: root.join(STATE_FILE_PATH),
            fs,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<StateDocument> {
        if !self.fs.is_file(&self.path) {
            return Ok(StateDocument::default());
        }
        let text = self.fs.read_to_string(&self.path)?;
        serde_json::from_str(&text)
            .with_context(|| format!("parsing state file at {:?}", self.path))
    }

    fn update(&self, f: impl FnOnce(&mut StateDocument)) -> Result<()> {
        let mut doc = self.load()?;
        f(&mut doc);
        let text = serde_json::to_string_pretty(&doc)?;
        self.fs
            .write(&self.path, text.as_bytes())
            .with_context(|| format!("writing state file at {:?}", self.path))
    }
}

impl StateStore for FileStateStore {
    fn disabled_tasks(&self) -> Result<BTreeSet<ScriptCode>> {
        Ok(self.load()?.disabled_tasks)
    }

    fn set_disabled_tasks(&self, disabled: &BTreeSet<ScriptCode>) -> Result<()> {
        self.update(|doc| doc.disabled_tasks = disabled.clone())?;
        info!(count = disabled.len(), "stored disabled tasks (file)");
        Ok(())
    }

    fn checksum(&self) -> Result<Option<String>> {
        Ok(self.load()?.checksum)
    }

    fn set_checksum(&self, checksum: &str) -> Result<()> {
        self.update(|doc| doc.checksum = Some(checksum.to_string()))?;
        debug!(checksum = %checksum, "stored approved config checksum (file)");
        Ok(())
    }
}

/// Stores state in memory only (lost on restart).
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    doc: Mutex<StateDocument>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_doc<T>(&self, f: impl FnOnce(&mut StateDocument) -> T) -> T {
        let mut guard = self.doc.lock().unwrap_or_else(|p| p.into_inner());
        f(&mut guard)
    }
}

impl StateStore for MemoryStateStore {
    fn disabled_tasks(&self) -> Result<BTreeSet<ScriptCode>> {
        Ok(self.with_doc(|doc| doc.disabled_tasks.clone()))
    }

    fn set_disabled_tasks(&self, disabled: &BTreeSet<ScriptCode>) -> Result<()> {
        self.with_doc(|doc| doc.disabled_tasks = disabled.clone());
        info!(count = disabled.len(), "stored disabled tasks (memory)");
        Ok(())
    }

    fn checksum(&self) -> Result<Option<String>> {
        Ok(self.with_doc(|doc| doc.checksum.clone()))
    }

    fn set_checksum(&self, checksum: &str) -> Result<()> {
        self.with_doc(|doc| doc.checksum = Some(checksum.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn file_store_round_trips_both_keys_independently() {
        let fs = MockFileSystem::new();
        let store = FileStateStore::new(Path::new("/ws"), Arc::new(fs.clone()));

        assert!(store.disabled_tasks().unwrap().is_empty());
        assert_eq!(store.checksum().unwrap(), None);

        let disabled = BTreeSet::from([ScriptCode::from("sync:1"), ScriptCode::from("async:0")]);
        store.set_disabled_tasks(&disabled).unwrap();
        store.set_checksum("abc").unwrap();

        assert_eq!(store.disabled_tasks().unwrap(), disabled);
        assert_eq!(store.checksum().unwrap().as_deref(), Some("abc"));
        assert!(fs.contents("/ws/.onsave/state.json").unwrap().contains("disabledTasks"));
    }

    #[test]
    fn corrupt_state_file_is_an_error() {
        let fs = MockFileSystem::new();
        fs.add_file("/ws/.onsave/state.json", "not json");
        let store = FileStateStore::new(Path::new("/ws"), Arc::new(fs));
        assert!(store.disabled_tasks().is_err());
    }
}
