// src/errors.rs

//! Crate-wide error type and result alias.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum OnsaveError {
    /// The configuration file is missing required structure or is not valid JSON.
    #[error("Configuration error: {0}")]
    ConfigParse(String),

    /// The user declined to load a configuration whose checksum changed.
    #[error("Loading of .statusBarTask.json from {} aborted by user", .0.display())]
    ConfigChangeRejected(PathBuf),

    /// A script command could not be spawned or exited unsuccessfully.
    #[error("Process execution failed: {0}")]
    ProcessExecution(String),

    /// An error location does not resolve to an openable file position.
    #[error("Cannot find file: {}, line: {line}, column: {column} ({reason})", .path.display())]
    Navigation {
        path: PathBuf,
        line: u32,
        column: u32,
        reason: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid problem matcher pattern: {0}")]
    Regex(#[from] regex::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, OnsaveError>;
