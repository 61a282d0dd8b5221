//! Target and scratch directory provisioning.

use std::io;
use std::os::unix::fs::{DirBuilderExt, PermissionsExt};
use std::path::{Path, PathBuf};

use optbind_common::constants::{SCRATCH_PREFIX, SCRATCH_RANDOM_LEN};
use optbind_common::error::{OptbindError, Result};
use optbind_common::types::{ScratchDirectory, TargetDirectory, TargetState};

/// Directory and ownership operations a run performs.
pub trait DirectoryProvisioner {
    /// Reports what currently exists at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`OptbindError::TargetInspectFailed`] if the stat fails for any
    /// reason other than the path not existing.
    fn inspect_target(&self, path: &Path) -> Result<TargetState>;

    /// Makes sure `path` is a directory, creating it with `mode` if absent.
    ///
    /// # Errors
    ///
    /// Returns [`OptbindError::NotADirectory`] if something else exists at
    /// `path`, or [`OptbindError::DirectoryCreateFailed`] if creation fails.
    fn ensure_target_directory(&self, path: &Path, mode: u32) -> Result<TargetDirectory>;

    /// Creates a uniquely named directory under `staging_root`.
    ///
    /// # Errors
    ///
    /// Returns [`OptbindError::ScratchCreateFailed`] if creation fails.
    fn create_scratch_directory(&self, staging_root: &Path) -> Result<ScratchDirectory>;

    /// Changes the owner and group of `path`.
    ///
    /// # Errors
    ///
    /// Returns [`OptbindError::OwnershipChangeFailed`] if the change is rejected.
    fn assign_ownership(&self, path: &Path, uid: u32, gid: u32) -> Result<()>;
}

/// Provisioner operating on the real filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProvisioner;

impl SystemProvisioner {
    /// Creates a new system provisioner.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl DirectoryProvisioner for SystemProvisioner {
    fn inspect_target(&self, path: &Path) -> Result<TargetState> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.is_dir() => Ok(TargetState::Directory),
            Ok(_) => Ok(TargetState::NotADirectory),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(TargetState::Absent),
            Err(e) => Err(OptbindError::TargetInspectFailed {
                path: path.to_path_buf(),
                source: e,
            }),
        }
    }

    fn ensure_target_directory(&self, path: &Path, mode: u32) -> Result<TargetDirectory> {
        match self.inspect_target(path) {
            Ok(TargetState::Directory) => {
                tracing::debug!(path = %path.display(), "target directory already exists");
                return Ok(TargetDirectory {
                    path: path.to_path_buf(),
                    preexisted: true,
                    mode,
                    owner: None,
                });
            }
            Ok(TargetState::NotADirectory) => {
                return Err(OptbindError::NotADirectory {
                    path: path.to_path_buf(),
                });
            }
            Ok(TargetState::Absent) => {}
            Err(OptbindError::TargetInspectFailed { source, .. }) => {
                return Err(OptbindError::DirectoryCreateFailed {
                    path: path.to_path_buf(),
                    source,
                });
            }
            Err(other) => return Err(other),
        }

        let create_failed = |source: io::Error| OptbindError::DirectoryCreateFailed {
            path: path.to_path_buf(),
            source,
        };
        std::fs::DirBuilder::new()
            .mode(mode)
            .create(path)
            .map_err(create_failed)?;
        // mkdir honours the umask; apply the policy bits explicitly.
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
            .map_err(create_failed)?;

        tracing::debug!(path = %path.display(), mode = %format!("{mode:o}"), "created target directory");
        Ok(TargetDirectory {
            path: path.to_path_buf(),
            preexisted: false,
            mode,
            owner: None,
        })
    }

    fn create_scratch_directory(&self, staging_root: &Path) -> Result<ScratchDirectory> {
        let dir = tempfile::Builder::new()
            .prefix(SCRATCH_PREFIX)
            .rand_bytes(SCRATCH_RANDOM_LEN)
            .tempdir_in(staging_root)
            .map_err(|e| OptbindError::ScratchCreateFailed {
                staging_root: staging_root.to_path_buf(),
                source: e,
            })?;
        // The scratch directory backs the bind mount and must outlive the process.
        let path: PathBuf = dir.keep();
        tracing::debug!(path = %path.display(), "created scratch directory");
        Ok(ScratchDirectory::new(path))
    }

    fn assign_ownership(&self, path: &Path, uid: u32, gid: u32) -> Result<()> {
        use nix::unistd::{Gid, Uid, chown};

        chown(path, Some(Uid::from_raw(uid)), Some(Gid::from_raw(gid))).map_err(|e| {
            OptbindError::OwnershipChangeFailed {
                path: path.to_path_buf(),
                uid,
                gid,
                source: e.into(),
            }
        })?;
        tracing::debug!(path = %path.display(), uid, gid, "ownership assigned");
        Ok(())
    }
}
