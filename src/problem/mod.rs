// src/problem/mod.rs

//! Problem matching: turning raw process output into a normalised,
//! deduplicated and sorted list of error strings.
//!
//! Without a matcher every non-empty trimmed output line is an error. With a
//! matcher, `matchPattern` is applied as a multiline global regex and each
//! match is rendered through `replacePattern`:
//!
//! - `${workspaceFolder}` becomes the workspace root path,
//! - `${N}` becomes capture group `N` of that match (`0` is the whole match).
//!
//! The result depends only on the output text, the two patterns and the
//! workspace path.

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::sync::LazyLock;

use regex::{Captures, Regex, RegexBuilder};

const WORKSPACE_FOLDER_TOKEN: &str = "${workspaceFolder}";

static GROUP_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{(\d+)\}").expect("group token regex is valid"));

/// Compiled `matchPattern` / `replacePattern` pair.
#[derive(Clone)]
pub struct ProblemMatcher {
    pattern: Regex,
    replace: String,
}

impl fmt::Debug for ProblemMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProblemMatcher")
            .field("match_pattern", &self.pattern.as_str())
            .field("replace_pattern", &self.replace)
            .finish()
    }
}

impl ProblemMatcher {
    /// Compile a matcher. `^` and `$` match at line boundaries (`\r\n` aware).
    pub fn new(
        match_pattern: &str,
        replace_pattern: impl Into<String>,
    ) -> Result<Self, regex::Error> {
        let pattern = RegexBuilder::new(match_pattern)
            .multi_line(true)
            .crlf(true)
            .build()?;
        Ok(Self {
            pattern,
            replace: replace_pattern.into(),
        })
    }

    pub fn match_pattern(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn replace_pattern(&self) -> &str {
        &self.replace
    }

    fn render(&self, caps: &Captures<'_>, workspace: &str) -> String {
        if self.replace.is_empty() {
            return caps[0].to_string();
        }

        let with_root = self.replace.replace(WORKSPACE_FOLDER_TOKEN, workspace);
        GROUP_TOKEN
            .replace_all(&with_root, |token: &Captures<'_>| {
                token[1]
                    .parse::<usize>()
                    .ok()
                    .and_then(|idx| caps.get(idx))
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_default()
            })
            .into_owned()
    }
}

/// Extract the sorted, deduplicated error list from `raw_output`.
pub fn extract_errors(
    raw_output: &str,
    matcher: Option<&ProblemMatcher>,
    workspace: &Path,
) -> Vec<String> {
    let errors: BTreeSet<String> = match matcher {
        None => raw_output
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect(),
        Some(matcher) => {
            let workspace = workspace.to_string_lossy();
            matcher
                .pattern
                .captures_iter(raw_output)
                .map(|caps| matcher.render(&caps, &workspace))
                .collect()
        }
    };

    errors.into_iter().collect()
}
