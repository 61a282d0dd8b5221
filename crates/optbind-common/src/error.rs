//! Unified error types for the optbind workspace.
//!
//! Every variant is terminal for a run. Variants are grouped into an
//! [`ErrorClass`] that drives the process exit status.

use std::path::PathBuf;

use thiserror::Error;

use crate::constants::{EXIT_IRRECOVERABLE, EXIT_MUTATION, EXIT_PRECONDITION};

/// Coarse classification of a failure for exit-status purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Nothing was mutated.
    Precondition,
    /// A mutation failed and the mount point was left read-only.
    Mutation,
    /// The mount point may have been left writable.
    Irrecoverable,
}

impl std::fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Precondition => write!(f, "precondition failure"),
            Self::Mutation => write!(f, "mutation failure"),
            Self::Irrecoverable => write!(f, "irrecoverable state"),
        }
    }
}

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum OptbindError {
    /// The caller's identity could not be determined.
    #[error("cannot determine caller identity: {reason}")]
    IdentityUnavailable {
        /// Why resolution failed.
        reason: String,
    },

    /// Switching the process identity to root was rejected.
    #[error("failed to elevate privileges: {source}")]
    ElevationFailed {
        /// Underlying OS error.
        source: std::io::Error,
    },

    /// The target path exists but is not a directory.
    #[error("{path} exists but is not a directory")]
    NotADirectory {
        /// Offending path.
        path: PathBuf,
    },

    /// The target path could not be inspected.
    #[error("failed to inspect {path}: {source}")]
    TargetInspectFailed {
        /// Inspected path.
        path: PathBuf,
        /// Underlying OS error.
        source: std::io::Error,
    },

    /// The target path is not strictly under the mount point.
    #[error("{path} is not a location under {mount_point}")]
    InvalidTarget {
        /// Rejected path.
        path: PathBuf,
        /// Mount point the path must live under.
        mount_point: PathBuf,
    },

    /// A configuration value is invalid or the config file is unreadable.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the problem.
        message: String,
    },

    /// Remounting the mount point read-write failed.
    #[error("failed to remount {mount_point} read-write: {source}")]
    RemountReadWriteFailed {
        /// Mount point path.
        mount_point: PathBuf,
        /// Underlying OS error.
        source: std::io::Error,
    },

    /// The target directory could not be created or prepared.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreateFailed {
        /// Directory path.
        path: PathBuf,
        /// Underlying OS error.
        source: std::io::Error,
    },

    /// The scratch directory could not be created.
    #[error("failed to create scratch directory under {staging_root}: {source}")]
    ScratchCreateFailed {
        /// Staging root.
        staging_root: PathBuf,
        /// Underlying OS error.
        source: std::io::Error,
    },

    /// Changing a path's owner failed.
    #[error("failed to change ownership of {path} to {uid}:{gid}: {source}")]
    OwnershipChangeFailed {
        /// Path whose owner was being changed.
        path: PathBuf,
        /// Requested uid.
        uid: u32,
        /// Requested gid.
        gid: u32,
        /// Underlying OS error.
        source: std::io::Error,
    },

    /// Remounting the mount point read-only failed; it may remain writable.
    #[error("failed to remount {mount_point} read-only, it may remain writable: {source}")]
    RemountReadOnlyFailed {
        /// Mount point path.
        mount_point: PathBuf,
        /// Underlying OS error.
        source: std::io::Error,
    },

    /// The bind mount of the scratch directory onto the target failed.
    #[error("failed to bind mount {source_path} onto {target}: {source}")]
    BindMountFailed {
        /// Scratch directory path.
        source_path: PathBuf,
        /// Target directory path.
        target: PathBuf,
        /// Underlying OS error.
        source: std::io::Error,
    },
}

impl OptbindError {
    /// Returns the failure class of this error.
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::IdentityUnavailable { .. }
            | Self::ElevationFailed { .. }
            | Self::NotADirectory { .. }
            | Self::TargetInspectFailed { .. }
            | Self::InvalidTarget { .. }
            | Self::Config { .. } => ErrorClass::Precondition,
            Self::RemountReadWriteFailed { .. }
            | Self::DirectoryCreateFailed { .. }
            | Self::ScratchCreateFailed { .. }
            | Self::OwnershipChangeFailed { .. }
            | Self::BindMountFailed { .. } => ErrorClass::Mutation,
            Self::RemountReadOnlyFailed { .. } => ErrorClass::Irrecoverable,
        }
    }

    /// Returns whether the caller must be warned that the mount point may be writable.
    #[must_use]
    pub const fn is_security_relevant(&self) -> bool {
        matches!(self.class(), ErrorClass::Irrecoverable)
    }

    /// Returns the OS error code carried by this error, if any.
    #[must_use]
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            Self::ElevationFailed { source }
            | Self::TargetInspectFailed { source, .. }
            | Self::RemountReadWriteFailed { source, .. }
            | Self::DirectoryCreateFailed { source, .. }
            | Self::ScratchCreateFailed { source, .. }
            | Self::OwnershipChangeFailed { source, .. }
            | Self::RemountReadOnlyFailed { source, .. }
            | Self::BindMountFailed { source, .. } => source.raw_os_error(),
            Self::IdentityUnavailable { .. }
            | Self::NotADirectory { .. }
            | Self::InvalidTarget { .. }
            | Self::Config { .. } => None,
        }
    }

    /// Returns the process exit status for this error.
    ///
    /// The OS error code is used when present and representable, otherwise a
    /// sentinel for the error's class. Codes equal to a class sentinel are
    /// replaced by this error's own sentinel, so 1 and 2 always identify the
    /// class. Irrecoverable errors always map to [`EXIT_IRRECOVERABLE`].
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        let sentinel = match self.class() {
            ErrorClass::Irrecoverable => return EXIT_IRRECOVERABLE,
            ErrorClass::Precondition => EXIT_PRECONDITION,
            ErrorClass::Mutation => EXIT_MUTATION,
        };
        self.raw_os_error()
            .and_then(|code| u8::try_from(code).ok())
            .filter(|code| {
                ![0, EXIT_MUTATION, EXIT_PRECONDITION, EXIT_IRRECOVERABLE].contains(code)
            })
            .unwrap_or(sentinel)
    }

    /// Returns a short name of the step that failed.
    #[must_use]
    pub const fn step(&self) -> &'static str {
        match self {
            Self::IdentityUnavailable { .. } => "resolve identity",
            Self::ElevationFailed { .. } => "elevate privileges",
            Self::NotADirectory { .. } | Self::TargetInspectFailed { .. } => "inspect target",
            Self::InvalidTarget { .. } => "validate target",
            Self::Config { .. } => "load configuration",
            Self::RemountReadWriteFailed { .. } => "remount read-write",
            Self::DirectoryCreateFailed { .. } => "create target directory",
            Self::ScratchCreateFailed { .. } => "create scratch directory",
            Self::OwnershipChangeFailed { .. } => "assign ownership",
            Self::RemountReadOnlyFailed { .. } => "remount read-only",
            Self::BindMountFailed { .. } => "bind mount",
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, OptbindError>;
