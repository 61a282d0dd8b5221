//! Validation of the target path given on the command line.
//!
//! The target may not exist yet, so only its parent is canonicalized and
//! the final component re-joined. An existing target is canonicalized in
//! full so a symlink cannot redirect the bind mount outside the mount point.

use std::path::{Path, PathBuf};

use optbind_common::error::{OptbindError, Result};

/// Resolves `raw` to an absolute path strictly under `mount_point`.
///
/// # Errors
///
/// Returns [`OptbindError::InvalidTarget`] if the path has no final
/// component or escapes the mount point, and
/// [`OptbindError::TargetInspectFailed`] if its parent cannot be resolved.
pub fn resolve_target(raw: &Path, mount_point: &Path) -> Result<PathBuf> {
    let invalid = || OptbindError::InvalidTarget {
        path: raw.to_path_buf(),
        mount_point: mount_point.to_path_buf(),
    };

    let absolute = if raw.is_absolute() {
        raw.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|e| OptbindError::TargetInspectFailed {
                path: raw.to_path_buf(),
                source: e,
            })?
            .join(raw)
    };
    let name = absolute.file_name().ok_or_else(invalid)?;
    let parent = absolute.parent().ok_or_else(invalid)?;
    let parent = parent
        .canonicalize()
        .map_err(|e| OptbindError::TargetInspectFailed {
            path: parent.to_path_buf(),
            source: e,
        })?;

    let mut resolved = parent.join(name);
    if resolved.symlink_metadata().is_ok() {
        resolved = resolved
            .canonicalize()
            .map_err(|e| OptbindError::TargetInspectFailed {
                path: resolved.clone(),
                source: e,
            })?;
    }

    let root = mount_point
        .canonicalize()
        .unwrap_or_else(|_| mount_point.to_path_buf());
    if resolved == root || !resolved.starts_with(&root) {
        return Err(invalid());
    }
    tracing::debug!(raw = %raw.display(), resolved = %resolved.display(), "target validated");
    Ok(resolved)
}
