// src/watch/patterns.rs

use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};

/// Paths that never trigger scripts. Build outputs and our own state file
/// would otherwise retrigger the scripts that wrote them.
pub const DEFAULT_IGNORES: &[&str] = &[
    ".git",
    ".git/**",
    ".onsave/**",
    "target/**",
    "node_modules/**",
];

/// Compiled ignore globs, matched against paths relative to the workspace
/// root (forward slashes, e.g. `"src/main.rs"`).
#[derive(Clone)]
pub struct IgnoreSet {
    patterns: Vec<String>,
    set: GlobSet,
}

impl fmt::Debug for IgnoreSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IgnoreSet")
            .field("patterns", &self.patterns)
            .finish_non_exhaustive()
    }
}

impl IgnoreSet {
    /// Default ignores plus `extra` user globs.
    pub fn new(extra: &[String]) -> Result<Self> {
        let patterns: Vec<String> = DEFAULT_IGNORES
            .iter()
            .map(|p| p.to_string())
            .chain(extra.iter().cloned())
            .collect();
        let set = build_globset(&patterns).context("building ignore globset")?;
        Ok(Self { patterns, set })
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn is_ignored(&self, rel_path: &str) -> bool {
        self.set.is_match(rel_path)
    }

    /// Whether an absolute event path should be ignored. Paths outside
    /// `root` are ignored too.
    pub fn is_ignored_path(&self, root: &Path, path: &Path) -> bool {
        match relative_str(root, path) {
            Some(rel) if !rel.is_empty() => self.is_ignored(&rel),
            _ => true,
        }
    }
}

/// Build a GlobSet from simple string patterns.
fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat).with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

/// `path` relative to `root` with forward slashes.
///
/// Falls back to comparing canonical paths, since watchers on some platforms
/// report a different absolute prefix for the same directory (macOS
/// `/private/var/...`).
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    let to_slash = |rel: &Path| rel.to_string_lossy().replace('\\', "/");

    if let Ok(rel) = path.strip_prefix(root) {
        return Some(to_slash(rel));
    }
    let root = root.canonicalize().ok()?;
    let path = path.canonicalize().ok()?;
    path.strip_prefix(&root).ok().map(to_slash)
}
