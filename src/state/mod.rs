// src/state/mod.rs

//! Workspace-scoped persisted state.
//!
//! Two values survive configuration reloads and restarts:
//! - the set of script codes the user disabled,
//! - the checksum of the last configuration file the user approved.

pub mod store;

pub use store::{FileStateStore, MemoryStateStore, STATE_FILE_PATH, StateStore};
