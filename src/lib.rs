// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod host;
pub mod logging;
pub mod problem;
pub mod registry;
pub mod scheduler;
pub mod state;
pub mod types;
pub mod watch;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::{ConfigFile, ScriptConfig, load_from_path, locate_config};
use crate::engine::{CoreRuntime, RunSummary, Runtime, RuntimeEvent, RuntimeOptions, RuntimeServices};
use crate::exec::{ExecutionEngine, ShellRunner};
use crate::fs::{FileSystem, RealFileSystem};
use crate::host::{Prompter, StatusSurface, TerminalHost, TrustingPrompter};
use crate::state::{FileStateStore, StateStore};
use crate::types::{ScriptCategory, ScriptCode};
use crate::watch::{IgnoreSet, spawn_watcher};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - the terminal host (status lines, output log, stdin commands and prompts)
/// - persisted state and the checksum-gated configuration loader
/// - the core runtime / IO shell and the process runner
/// - (optional) file watcher
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let workspace = resolve_workspace(&args.workspace)?;
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let store: Arc<dyn StateStore> = Arc::new(FileStateStore::new(&workspace, Arc::clone(&fs)));

    if args.dry_run {
        return dry_run(fs.as_ref(), store.as_ref(), &workspace);
    }

    let host = Arc::new(TerminalHost::new());
    let surface: Arc<dyn StatusSurface> = host.clone();
    let prompter: Arc<dyn Prompter> = if args.trust_config {
        Arc::new(TrustingPrompter::new(host.clone()))
    } else {
        host.clone()
    };

    let options = RuntimeOptions {
        exit_when_idle: args.once,
    };
    let core = CoreRuntime::new(&workspace, surface, options);
    let output = core.output().clone();

    // Runtime event channel.
    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);

    let engine = ExecutionEngine::new(Arc::new(ShellRunner), &workspace, output.clone());
    let services = Arc::new(RuntimeServices {
        workspace: workspace.clone(),
        fs,
        store,
        prompter,
        output,
    });

    // Optional file watcher (disabled in --once mode).
    let _watcher_handle = if !args.once {
        let ignore = IgnoreSet::new(&args.ignore)?;
        debug!(patterns = ?ignore.patterns(), "ignore patterns");
        Some(spawn_watcher(&workspace, ignore, rt_tx.clone())?)
    } else {
        None
    };

    // Commands and prompt answers from stdin.
    let _input = host.spawn_input(rt_tx.clone());

    // Ctrl-C → graceful shutdown.
    {
        let tx = rt_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
        });
    }

    // Initial configuration load; scripts only run on the first trigger
    // (or right away in --once mode).
    rt_tx.send(RuntimeEvent::ReinitRequested).await?;

    let runtime = Runtime::new(core, rt_rx, rt_tx, engine, services);
    let summary = runtime.run().await;

    if args.once {
        check_once(&summary, &workspace)?;
    }
    Ok(())
}

fn resolve_workspace(path: &Path) -> Result<PathBuf> {
    let resolved = path
        .canonicalize()
        .with_context(|| format!("resolving workspace {path:?}"))?;
    if !resolved.is_dir() {
        bail!("workspace {resolved:?} is not a directory");
    }
    Ok(resolved)
}

/// `--once` exit status: fail when nothing was loaded or a script had errors.
fn check_once(summary: &RunSummary, workspace: &Path) -> Result<()> {
    if !summary.config_loaded {
        bail!("no configuration loaded for workspace {workspace:?}");
    }
    if !summary.failed.is_empty() {
        bail!(
            "{} script(s) reported errors: {}",
            summary.failed.len(),
            summary.failed.join(", ")
        );
    }
    info!(runs = summary.runs, "all scripts passed");
    Ok(())
}

/// Parse + validate the configuration and print the scripts.
///
/// Never prompts and never touches the stored checksum.
fn dry_run(fs: &dyn FileSystem, store: &dyn StateStore, workspace: &Path) -> Result<()> {
    let Some(path) = locate_config(fs, workspace) else {
        bail!("no {} in {workspace:?} or its parent", config::CONFIG_FILE_NAME);
    };
    let cfg = load_from_path(fs, &path)?;
    let disabled = store.disabled_tasks().unwrap_or_else(|err| {
        warn!(error = %err, "failed to read disabled tasks");
        BTreeSet::new()
    });
    print_dry_run(&path, &cfg, &disabled);
    Ok(())
}

/// Simple dry-run output: delays, then each script with its code.
fn print_dry_run(path: &Path, cfg: &ConfigFile, disabled: &BTreeSet<ScriptCode>) {
    println!("onsave dry-run");
    println!("  config = {}", path.display());
    println!("  asyncScriptsDelay = {} ms", cfg.async_scripts_delay.as_millis());
    println!("  syncScriptsDelay = {} ms", cfg.sync_scripts_delay.as_millis());

    let lists = [
        (ScriptCategory::Async, &cfg.async_scripts),
        (ScriptCategory::Sync, &cfg.sync_scripts),
    ];
    for (category, scripts) in lists {
        println!();
        println!("{category} scripts ({}):", scripts.len());
        for (index, script) in scripts.iter().enumerate() {
            print_script(&ScriptCode::new(category, index), script, disabled);
        }
    }

    debug!("dry-run complete (no execution)");
}

fn print_script(code: &ScriptCode, script: &ScriptConfig, disabled: &BTreeSet<ScriptCode>) {
    let marker = if disabled.contains(code) { " (disabled)" } else { "" };
    println!("  - {code} {}{marker}", script.label);
    println!("      command: {}", script.command);
    if let Some(delay) = script.delay {
        println!("      delay: {} ms", delay.as_millis());
    }
    if let Some(ref matcher) = script.problem_matcher {
        println!("      matchPattern: {}", matcher.match_pattern());
        if !matcher.replace_pattern().is_empty() {
            println!("      replacePattern: {}", matcher.replace_pattern());
        }
    }
}
