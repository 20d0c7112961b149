//! Utility helpers shared across the CLI.

use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::error::{GenerationError, Result};

// === Filesystem Helpers ===

pub fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|e| {
        GenerationError::io(format!("Failed to create directory: {}", path.display()), e)
    })
}

/// Write bytes to `path`, replacing any existing file.
pub fn write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    fs::write(path, bytes)
        .map_err(|e| GenerationError::io(format!("Failed to write {}", path.display()), e))
}

/// Render JSON with pretty formatting, falling back to a compact string on error.
#[must_use]
pub fn pretty_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Make a string safe to use as a single path component.
#[must_use]
pub fn sanitize_file_stem(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

/// Truncate a string to a maximum length, adding an ellipsis if truncated
#[must_use]
pub fn truncate_with_ellipsis(s: &str, max_len: usize, ellipsis: &str) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let keep = max_len.saturating_sub(ellipsis.chars().count());
        let head: String = s.chars().take(keep).collect();
        format!("{head}{ellipsis}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_replaces_separators_only() {
        assert_eq!(sanitize_file_stem("Evening Rain"), "Evening Rain");
        assert_eq!(sanitize_file_stem("../etc/passwd"), ".._etc_passwd");
        assert_eq!(sanitize_file_stem("a\\b\nc"), "a_b_c");
        assert_eq!(sanitize_file_stem("  蝉蜕的夏天 "), "蝉蜕的夏天");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_with_ellipsis("short", 10, "..."), "short");
        assert_eq!(truncate_with_ellipsis("abcdefghij", 6, "..."), "abc...");
        assert_eq!(truncate_with_ellipsis("歌曲歌曲歌曲", 4, "…"), "歌曲歌…");
    }

    #[test]
    fn write_bytes_creates_parent_and_overwrites() -> Result<()> {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("song.mp3");
        write_bytes(&path, b"first")?;
        write_bytes(&path, b"second")?;
        assert_eq!(fs::read(&path).expect("read"), b"second");
        Ok(())
    }
}
