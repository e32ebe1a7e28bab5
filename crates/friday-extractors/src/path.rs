//! Input path handling.

use std::path::{Path, PathBuf, MAIN_SEPARATOR};

use friday_core::config::absolutize;
use friday_core::{SidecarError, SidecarResult};

/// Normalize separators to the native style.
///
/// Hosts on Windows and Unix both send paths with either separator, so both
/// `/` and `\` are rewritten. Whitespace is part of the name and is kept.
/// Applying it twice gives the same result as once.
pub fn normalize_path(raw: &str) -> String {
    raw.chars()
        .map(|c| if c == '/' || c == '\\' { MAIN_SEPARATOR } else { c })
        .collect()
}

/// Normalize `raw` and require it to name an existing file.
pub fn resolve_input_file(raw: &str) -> SidecarResult<PathBuf> {
    let normalized = normalize_path(raw);
    let path = PathBuf::from(&normalized);
    if path.is_file() {
        return Ok(path);
    }

    let absolute = absolutize(&path)?;
    let parent_exists = absolute.parent().map(Path::is_dir).unwrap_or(false);
    Err(SidecarError::FileNotFound {
        path: normalized,
        absolute,
        parent_exists,
    })
}

/// Title derived from a file path: its stem, or `fallback` if there is none.
pub fn file_title(path: &Path, fallback: &str) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().trim().to_string())
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}
