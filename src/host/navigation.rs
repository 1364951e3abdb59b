// src/host/navigation.rs

//! Parsing of stored error strings into openable locations.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

static LOCATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+?)(?::(\d+))?(?::(\d+))?$").expect("location regex is valid"));

/// A file position, 0-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorLocation {
    pub path: PathBuf,
    pub line: u32,
    pub column: u32,
}

/// Parse `path[:line[:column]]` (1-based line/column) into a 0-based location.
///
/// Backslashes are normalised to `/` and relative paths are resolved against
/// `workspace`. Returns `None` for strings that are not a single line.
pub fn parse_error_location(error: &str, workspace: &Path) -> Option<ErrorLocation> {
    let caps = LOCATION.captures(error)?;

    let raw_path = caps[1].replace('\\', "/");
    let path = Path::new(&raw_path);
    let path = if path.is_absolute() || looks_like_drive_path(&raw_path) {
        path.to_path_buf()
    } else {
        workspace.join(path)
    };

    Some(ErrorLocation {
        path,
        line: one_based(caps.get(2).map(|m| m.as_str())),
        column: one_based(caps.get(3).map(|m| m.as_str())),
    })
}

fn one_based(value: Option<&str>) -> u32 {
    value
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(1)
        .saturating_sub(1)
}

fn looks_like_drive_path(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 3 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' && bytes[2] == b'/'
}
