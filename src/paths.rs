//! Local path handling: where generated songs go, and which input files
//! are acceptable.

use std::path::{Path, PathBuf};

use crate::config::expand_path;
use crate::error::{GenerationError, Result};
use crate::utils::ensure_dir;

/// Extensions accepted by the media check, lowercase without the dot.
pub const MEDIA_EXTENSIONS: &[&str] = &[
    "wav", "mp3", "m4a", "aac", "ogg", "flac", "mp4", "avi", "mov", "wmv",
];

// === Output Directory ===

/// Resolve, check, and create the output directory for one run.
///
/// No hint means the desktop. A relative hint is joined onto `base` when
/// one is configured, otherwise onto the current directory. Writability is
/// checked before anything is created.
pub fn resolve_output_dir(hint: Option<&str>, base: Option<&Path>) -> Result<PathBuf> {
    let path = planned_output_dir(hint, base)?;
    if !is_writable(&path) {
        return Err(GenerationError::DirectoryNotWritable { path });
    }
    ensure_dir(&path)?;
    Ok(path)
}

/// Absolute output directory for `hint`, without checking or creating it.
pub fn planned_output_dir(hint: Option<&str>, base: Option<&Path>) -> Result<PathBuf> {
    let candidate = match hint.map(str::trim).filter(|h| !h.is_empty()) {
        None => default_output_dir(),
        Some(hint) => {
            let hinted = expand_path(hint);
            match base {
                Some(base) if hinted.is_relative() => base.join(hinted),
                _ => hinted,
            }
        }
    };
    absolutize(candidate)
}

fn default_output_dir() -> PathBuf {
    dirs::desktop_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join("Desktop")))
        .unwrap_or_else(|| PathBuf::from("Desktop"))
}

fn absolutize(path: PathBuf) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path);
    }
    let cwd = std::env::current_dir()
        .map_err(|e| GenerationError::io("Failed to read current directory", e))?;
    Ok(cwd.join(path))
}

/// An existing path must be a writable directory; a missing one needs its
/// nearest existing ancestor to be one.
#[must_use]
pub fn is_writable(path: &Path) -> bool {
    if path.exists() {
        return path.is_dir() && has_write_access(path);
    }
    path.ancestors()
        .skip(1)
        .find(|ancestor| ancestor.exists())
        .is_some_and(|ancestor| ancestor.is_dir() && has_write_access(ancestor))
}

#[cfg(any(target_os = "linux", target_os = "macos"))]
fn has_write_access(path: &Path) -> bool {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let Ok(c_path) = CString::new(path.as_os_str().as_bytes()) else {
        return false;
    };
    // Safety: `c_path` is a valid NUL-terminated string for the duration of the call.
    unsafe { libc::access(c_path.as_ptr(), libc::W_OK) == 0 }
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
fn has_write_access(path: &Path) -> bool {
    std::fs::metadata(path).is_ok_and(|meta| !meta.permissions().readonly())
}

// === Input Files ===

/// Validate a local input file path.
///
/// Relative paths need a configured `base`. With `media_check`, the
/// extension must be a known audio or video type.
pub fn validate_input_file(raw: &str, base: Option<&Path>, media_check: bool) -> Result<PathBuf> {
    let given = expand_path(raw.trim());
    let path = if given.is_absolute() {
        given
    } else {
        match base {
            Some(base) => base.join(given),
            None => return Err(GenerationError::PathNotAbsolute { path: given }),
        }
    };

    if !path.exists() {
        return Err(GenerationError::FileNotFound { path });
    }
    if !path.is_file() {
        return Err(GenerationError::NotAFile { path });
    }
    if media_check && !is_media_file(&path) {
        return Err(GenerationError::UnsupportedMediaType { path });
    }
    Ok(path)
}

#[must_use]
pub fn is_media_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .is_some_and(|ext| MEDIA_EXTENSIONS.contains(&ext.as_str()))
}
