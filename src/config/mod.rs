// src/config/mod.rs

//! Configuration loading and validation.
//!
//! Responsibilities:
//! - Define the JSON-backed data model (`model.rs`).
//! - Locate and load `.statusBarTask.json`, gated by a checksum the user has
//!   approved (`loader.rs`, `checksum.rs`).
//! - Validate scripts and compile problem matchers (`validate.rs`).

pub mod checksum;
pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{ConfigLoader, ReloadOutcome, load_from_path, locate_config, parse_config};
pub use model::{
    CONFIG_FILE_NAME, ConfigFile, DEFAULT_DELAY_MS, RawConfigFile, RawProblemMatcher,
    RawScriptConfig, ScriptConfig,
};
