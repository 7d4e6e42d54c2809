//! Filesystem path helpers for resolved configurations.
//!
//! This module provides:
//! - Working directory selection with collision avoidance (`_1`, `_2`, ... suffixes)
//! - Lexical normalization of absolute paths (no symlink resolution)
//! - Component joining that skips empty components
//! - The `prefix_step_name` file naming convention used for step logs
//!
//! Apart from `create_dir` and the existence checks in `unique_dir_path`,
//! everything here is pure string manipulation.

use crate::error::{ConfError, ConfResult};
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Characters stripped from the end of a directory name before a new numeric suffix is appended.
const SUFFIX_CHARS: &[char] = &['\\', '/', '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', '_'];

/// Determine the working directory for a resolved configuration.
///
/// - `None` uses the current directory as-is.
/// - Relative paths are made absolute against the current directory.
/// - An existing directory gets a fresh numeric suffix unless `restart` is set.
pub fn get_working_dir_path(configured: Option<&str>, restart: bool) -> ConfResult<PathBuf> {
    let configured = match configured {
        Some(value) if !value.trim().is_empty() => value,
        _ => {
            return std::env::current_dir()
                .map_err(|e| ConfError::missing_working_dir(&e.to_string()));
        }
    };

    let absolute = absolutize(Path::new(configured))?;
    if restart || !absolute.exists() {
        return Ok(absolute);
    }

    let unique = unique_dir_path(&absolute);
    debug!(
        requested = %absolute.display(),
        resolved = %unique.display(),
        "Working directory exists, using suffixed path"
    );
    Ok(unique)
}

/// Return `path` if it does not exist, otherwise the first `<stem>_<n>` that doesn't.
///
/// Any trailing separators, digits and underscores are stripped before a suffix is appended,
/// so `run_3` is retried as `run_1`, `run_2`, ...
pub fn unique_dir_path(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }

    let original = path.to_string_lossy().into_owned();
    let trimmed = original.trim_end_matches(SUFFIX_CHARS);
    let stem = if trimmed.is_empty() {
        original.as_str()
    } else {
        trimmed
    };

    let mut counter: u32 = 1;
    loop {
        let candidate = PathBuf::from(format!("{}_{}", stem, counter));
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}

/// Make `path` absolute against the current directory and normalize it lexically.
pub fn absolutize(path: &Path) -> ConfResult<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|e| ConfError::missing_working_dir(&e.to_string()))?
            .join(path)
    };
    Ok(normalize_path_components(&absolute))
}

/// Join `parts` onto `base`, skipping empty components.
///
/// An absolute part replaces everything before it, as with [`Path::join`].
pub fn join_components(base: &Path, parts: &[&str]) -> PathBuf {
    let mut joined = base.to_path_buf();
    for part in parts.iter().filter(|p| !p.is_empty()) {
        joined.push(part);
    }
    joined
}

/// Build a file name from optional parts: `path/prefix_step_name`.
///
/// Empty parts are omitted together with their separating underscore.
pub fn create_name(
    path: Option<&Path>,
    prefix: Option<&str>,
    step: Option<&str>,
    name: Option<&str>,
) -> PathBuf {
    let parts: Vec<&str> = [prefix, step, name]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    let file_name = parts.join("_");

    match path {
        Some(dir) if !dir.as_os_str().is_empty() => {
            if file_name.is_empty() {
                dir.to_path_buf()
            } else {
                dir.join(file_name)
            }
        }
        _ => PathBuf::from(file_name),
    }
}

/// Create `dir` (and parents) if it does not exist. Returns the directory.
pub fn create_dir(dir: &Path) -> ConfResult<PathBuf> {
    if !dir.exists() {
        std::fs::create_dir_all(dir).map_err(|e| ConfError::io(dir, e))?;
        debug!(path = %dir.display(), "Created directory");
    }
    Ok(dir.to_path_buf())
}

/// Normalize path components lexically (resolve `.` and `..`).
fn normalize_path_components(path: &Path) -> PathBuf {
    let mut components = Vec::new();

    for component in path.components() {
        match component {
            Component::Prefix(p) => {
                // Windows drive prefix (e.g., C:)
                components.push(Component::Prefix(p));
            }
            Component::RootDir => {
                components.push(Component::RootDir);
            }
            Component::CurDir => {}
            Component::ParentDir => {
                if let Some(Component::Normal(_)) = components.last() {
                    components.pop();
                } else if !matches!(components.last(), Some(Component::RootDir)) {
                    components.push(Component::ParentDir);
                }
            }
            Component::Normal(name) => {
                components.push(Component::Normal(name));
            }
        }
    }

    components.iter().collect()
}
