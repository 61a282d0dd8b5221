//! Domain primitive types used across the optbind workspace.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Access mode of a mount point as last requested by this process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MountMode {
    /// Writes are allowed.
    ReadWrite,
    /// Writes are rejected.
    ReadOnly,
    /// No transition has been requested yet.
    Unknown,
}

impl fmt::Display for MountMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadWrite => write!(f, "read-write"),
            Self::ReadOnly => write!(f, "read-only"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// The protected mount point whose mode is toggled during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountPoint {
    /// Absolute path of the mount point.
    pub path: PathBuf,
    /// Filesystem type label passed to `mount(2)`, if any.
    pub fs_type: Option<String>,
}

impl MountPoint {
    /// Creates a mount point without a filesystem type label.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            fs_type: None,
        }
    }

    /// Sets the filesystem type label used for remount and bind calls.
    #[must_use]
    pub fn with_fs_type(mut self, fs_type: impl Into<String>) -> Self {
        self.fs_type = Some(fs_type.into());
        self
    }

    /// Returns the mount point path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// The unprivileged user and group on whose behalf resources are provisioned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallerIdentity {
    /// Real user ID.
    pub uid: u32,
    /// Real group ID.
    pub gid: u32,
}

impl CallerIdentity {
    /// Creates an identity from raw IDs.
    #[must_use]
    pub const fn new(uid: u32, gid: u32) -> Self {
        Self { uid, gid }
    }

    /// Returns whether this identity is the superuser.
    #[must_use]
    pub const fn is_root(&self) -> bool {
        self.uid == 0
    }
}

impl fmt::Display for CallerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.uid, self.gid)
    }
}

/// What a stat of the target path found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetState {
    /// Nothing exists at the path.
    Absent,
    /// A directory exists at the path.
    Directory,
    /// Something other than a directory exists at the path.
    NotADirectory,
}

/// The directory inside the mount point that receives the bind mount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetDirectory {
    /// Path of the directory.
    pub path: PathBuf,
    /// Whether the directory existed before the run.
    pub preexisted: bool,
    /// Permission bits applied on creation.
    pub mode: u32,
    /// Owner assigned by this run, if any.
    pub owner: Option<CallerIdentity>,
}

/// The uniquely named directory backing the bind mount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScratchDirectory {
    /// Path of the directory.
    pub path: PathBuf,
    /// Owner assigned by this run.
    pub owner: Option<CallerIdentity>,
}

impl ScratchDirectory {
    /// Creates a scratch directory record that has no owner assigned yet.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            owner: None,
        }
    }
}

/// How the caller's identity is obtained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IdentityStrategy {
    /// Read `SUDO_UID` and `SUDO_GID` set by the privilege-escalation wrapper.
    #[default]
    SudoEnv,
    /// Read the real uid/gid of a setuid-root binary, then elevate.
    Setuid,
}

impl fmt::Display for IdentityStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SudoEnv => write!(f, "sudo-env"),
            Self::Setuid => write!(f, "setuid"),
        }
    }
}

/// Who owns a target directory created by a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TargetOwnerPolicy {
    /// Explicitly chown the new directory to `0:0`.
    #[default]
    Root,
    /// Keep whatever owner `mkdir` produced.
    Unchanged,
}

impl fmt::Display for TargetOwnerPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Root => write!(f, "root"),
            Self::Unchanged => write!(f, "unchanged"),
        }
    }
}
