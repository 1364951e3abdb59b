// src/watch/watcher.rs

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use notify::event::ModifyKind;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::engine::RuntimeEvent;
use crate::types::TriggerReason;
use crate::watch::patterns::IgnoreSet;

/// Handle for the filesystem watcher.
///
/// Keeps the underlying `RecommendedWatcher` alive. Dropping this handle
/// stops file watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

/// Map a notify event to a trigger, or `None` if it should not trigger.
///
/// Access and metadata-only events are dropped, as are events whose paths are
/// all ignored.
pub fn trigger_reason(event: &Event, root: &Path, ignore: &IgnoreSet) -> Option<TriggerReason> {
    let reason = match event.kind {
        EventKind::Create(_) => TriggerReason::FileCreated,
        EventKind::Remove(_) => TriggerReason::FileDeleted,
        EventKind::Modify(ModifyKind::Metadata(_)) => return None,
        EventKind::Modify(_) | EventKind::Any => TriggerReason::FileSaved,
        EventKind::Access(_) | EventKind::Other => return None,
    };

    event
        .paths
        .iter()
        .any(|path| !ignore.is_ignored_path(root, path))
        .then_some(reason)
}

/// Spawn a filesystem watcher that observes `root` recursively and sends
/// `RuntimeEvent::WorkspaceChanged` for every relevant change.
///
/// Bursts of events are not coalesced here; the debounce scheduler does that.
pub fn spawn_watcher(
    root: impl Into<PathBuf>,
    ignore: IgnoreSet,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) -> Result<WatcherHandle> {
    let root = root.into();
    // Canonicalize once so we have a stable base path.
    let root = root.canonicalize().unwrap_or(root);

    // Channel from the blocking notify callback into the async world.
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                // The receiver only goes away on shutdown.
                let _ = event_tx.send(event);
            }
            Err(err) => {
                eprintln!("onsave: file watch error: {err}");
            }
        },
        Config::default(),
    )
    .context("creating file watcher")?;

    watcher
        .watch(&root, RecursiveMode::Recursive)
        .with_context(|| format!("watching {root:?}"))?;

    info!("file watcher started on {:?}", root);

    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            let Some(reason) = trigger_reason(&event, &root, &ignore) else {
                continue;
            };
            debug!(?reason, paths = ?event.paths, "workspace change");
            if runtime_tx
                .send(RuntimeEvent::WorkspaceChanged { reason })
                .await
                .is_err()
            {
                warn!("runtime is gone; stopping watcher loop");
                break;
            }
        }
        debug!("watcher event loop finished");
    });

    Ok(WatcherHandle { _inner: watcher })
}
