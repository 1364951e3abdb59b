// src/watch/mod.rs

//! File watching.
//!
//! Turns filesystem changes under the workspace into
//! [`RuntimeEvent::WorkspaceChanged`](crate::engine::RuntimeEvent) triggers.
//! It knows nothing about scripts; every relevant change is one trigger.

pub mod patterns;
pub mod watcher;

pub use patterns::{DEFAULT_IGNORES, IgnoreSet, relative_str};
pub use watcher::{WatcherHandle, spawn_watcher, trigger_reason};
