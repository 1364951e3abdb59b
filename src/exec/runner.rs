// src/exec/runner.rs

//! OS process collaborator.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::process::Command;
use tracing::{debug, info};

use crate::errors::OnsaveError;

/// Opaque result of one command invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Set when the command failed to spawn or exited unsuccessfully.
    pub error: Option<String>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            error: None,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Output as shown to the user and fed to the problem matcher:
    /// error message, stderr, stdout, one per line, trimmed.
    pub fn combined(&self) -> String {
        [
            self.error.as_deref().unwrap_or(""),
            self.stderr.trim(),
            self.stdout.trim(),
        ]
        .join("\n")
        .trim()
        .to_string()
    }
}

pub type RunFuture<'a> = Pin<Box<dyn Future<Output = ProcessOutput> + Send + 'a>>;

/// Runs a shell command to completion. Never fails: problems are reported
/// through [`ProcessOutput::error`].
pub trait ProcessRunner: Send + Sync {
    fn run<'a>(&'a self, command: &'a str, cwd: &'a Path) -> RunFuture<'a>;
}

/// Runs commands through `sh -c` (`cmd /C` on Windows).
#[derive(Debug, Default, Clone, Copy)]
pub struct ShellRunner;

impl ProcessRunner for ShellRunner {
    fn run<'a>(&'a self, command: &'a str, cwd: &'a Path) -> RunFuture<'a> {
        Box::pin(async move {
            match run_shell(command, cwd).await {
                Ok(output) => {
                    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
                    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
                    let error = (!output.status.success()).then(|| {
                        match output.status.code() {
                            Some(code) => format!("Command failed: {command} (exit code {code})"),
                            None => format!("Command failed: {command}"),
                        }
                    });
                    ProcessOutput {
                        error,
                        stdout,
                        stderr,
                    }
                }
                Err(err) => ProcessOutput {
                    error: Some(OnsaveError::ProcessExecution(format!("{err:#}")).to_string()),
                    ..ProcessOutput::default()
                },
            }
        })
    }
}

async fn run_shell(command: &str, cwd: &Path) -> Result<std::process::Output> {
    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(command);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(command);
        c
    };

    cmd.current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    debug!(cmd = %command, cwd = ?cwd, "spawning shell command");
    let output = cmd
        .output()
        .await
        .with_context(|| format!("spawning process for command '{command}'"))?;

    info!(
        cmd = %command,
        exit_code = output.status.code().unwrap_or(-1),
        success = output.status.success(),
        "command exited"
    );
    Ok(output)
}
