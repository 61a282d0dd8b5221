//! Mount transitions on the protected mount point.
//!
//! Each call is a single blocking `mount(2)`. Nothing is retried and no
//! in-memory state is kept; the kernel mount table is the only state touched.

use std::path::Path;

use optbind_common::error::Result;
use optbind_common::types::MountPoint;

/// The three mount transitions a run performs.
pub trait MountController {
    /// Remounts `mount_point` in place with read-write semantics.
    ///
    /// # Errors
    ///
    /// Returns [`OptbindError::RemountReadWriteFailed`] carrying the OS error.
    ///
    /// [`OptbindError::RemountReadWriteFailed`]: optbind_common::error::OptbindError::RemountReadWriteFailed
    fn remount_read_write(&self, mount_point: &MountPoint) -> Result<()>;

    /// Remounts `mount_point` in place with read-only semantics.
    ///
    /// # Errors
    ///
    /// Returns [`OptbindError::RemountReadOnlyFailed`] carrying the OS error.
    ///
    /// [`OptbindError::RemountReadOnlyFailed`]: optbind_common::error::OptbindError::RemountReadOnlyFailed
    fn remount_read_only(&self, mount_point: &MountPoint) -> Result<()>;

    /// Makes the contents of `source` visible at `target`.
    ///
    /// # Errors
    ///
    /// Returns [`OptbindError::BindMountFailed`] carrying the OS error.
    ///
    /// [`OptbindError::BindMountFailed`]: optbind_common::error::OptbindError::BindMountFailed
    fn bind_mount(&self, source: &Path, target: &Path, fs_type: Option<&str>) -> Result<()>;
}

/// Mount controller issuing real `mount(2)` calls.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemMountController;

impl SystemMountController {
    /// Creates a new system mount controller.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[cfg(target_os = "linux")]
impl MountController for SystemMountController {
    fn remount_read_write(&self, mount_point: &MountPoint) -> Result<()> {
        use nix::mount::{MsFlags, mount};
        use optbind_common::error::OptbindError;

        tracing::debug!(
            mount_point = %mount_point.path.display(),
            fs_type = ?mount_point.fs_type,
            "remounting read-write (MS_REMOUNT)"
        );
        mount(
            None::<&str>,
            &mount_point.path,
            mount_point.fs_type.as_deref(),
            MsFlags::MS_REMOUNT,
            None::<&str>,
        )
        .map_err(|e| OptbindError::RemountReadWriteFailed {
            mount_point: mount_point.path.clone(),
            source: e.into(),
        })
    }

    fn remount_read_only(&self, mount_point: &MountPoint) -> Result<()> {
        use nix::mount::{MsFlags, mount};
        use optbind_common::error::OptbindError;

        tracing::debug!(
            mount_point = %mount_point.path.display(),
            fs_type = ?mount_point.fs_type,
            "remounting read-only (MS_REMOUNT | MS_RDONLY)"
        );
        mount(
            None::<&str>,
            &mount_point.path,
            mount_point.fs_type.as_deref(),
            MsFlags::MS_REMOUNT | MsFlags::MS_RDONLY,
            None::<&str>,
        )
        .map_err(|e| OptbindError::RemountReadOnlyFailed {
            mount_point: mount_point.path.clone(),
            source: e.into(),
        })
    }

    fn bind_mount(&self, source: &Path, target: &Path, fs_type: Option<&str>) -> Result<()> {
        use nix::mount::{MsFlags, mount};
        use optbind_common::error::OptbindError;

        tracing::debug!(
            source = %source.display(),
            target = %target.display(),
            fs_type = ?fs_type,
            "bind mounting (MS_BIND)"
        );
        mount(Some(source), target, fs_type, MsFlags::MS_BIND, None::<&str>).map_err(|e| {
            OptbindError::BindMountFailed {
                source_path: source.to_path_buf(),
                target: target.to_path_buf(),
                source: e.into(),
            }
        })
    }
}

/// Stub for non-Linux platforms.
#[cfg(not(target_os = "linux"))]
impl MountController for SystemMountController {
    fn remount_read_write(&self, mount_point: &MountPoint) -> Result<()> {
        Err(optbind_common::error::OptbindError::RemountReadWriteFailed {
            mount_point: mount_point.path.clone(),
            source: unsupported(),
        })
    }

    fn remount_read_only(&self, mount_point: &MountPoint) -> Result<()> {
        Err(optbind_common::error::OptbindError::RemountReadOnlyFailed {
            mount_point: mount_point.path.clone(),
            source: unsupported(),
        })
    }

    fn bind_mount(&self, source: &Path, target: &Path, _fs_type: Option<&str>) -> Result<()> {
        Err(optbind_common::error::OptbindError::BindMountFailed {
            source_path: source.to_path_buf(),
            target: target.to_path_buf(),
            source: unsupported(),
        })
    }
}

#[cfg(not(target_os = "linux"))]
fn unsupported() -> std::io::Error {
    std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "Linux required for remount and bind mount",
    )
}
