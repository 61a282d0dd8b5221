//! The ordered privileged run and its compensation rules.
//!
//! A run resolves the caller, opens a read-write window on the protected
//! mount point only when the target directory has to be created, provisions
//! the scratch directory, closes the window, and finally bind-mounts the
//! scratch directory onto the target.
//!
//! The mount mode last requested is threaded through the run as local state.
//! Any failure while it is [`MountMode::ReadWrite`] triggers a best-effort
//! read-only remount before the original error is returned. A failure of the
//! closing remount itself cannot be compensated and is surfaced as
//! [`OptbindError::RemountReadOnlyFailed`].

use std::fmt;
use std::path::{Path, PathBuf};

use optbind_common::config::BindConfig;
use optbind_common::constants::{ROOT_GID, ROOT_UID, TARGET_DIR_MODE};
use optbind_common::error::{OptbindError, Result};
use optbind_common::types::{
    CallerIdentity, MountMode, MountPoint, ScratchDirectory, TargetDirectory, TargetOwnerPolicy,
    TargetState,
};

use crate::filesystem::{DirectoryProvisioner, MountController};
use crate::identity::IdentityResolver;

/// Steps of a run, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    /// Determine the unprivileged caller.
    ResolveIdentity,
    /// Switch to the privileged identity.
    Elevate,
    /// Stat the target path.
    InspectTarget,
    /// Open the read-write window.
    RemountReadWrite,
    /// Create the target directory inside the mount point.
    CreateTarget,
    /// Create the scratch directory in the staging root.
    CreateScratch,
    /// Hand the scratch directory to the caller.
    AssignOwnership,
    /// Close the read-write window.
    RemountReadOnly,
    /// Bind the scratch directory onto the target.
    BindMount,
    /// All invariants hold.
    Done,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ResolveIdentity => "resolve-identity",
            Self::Elevate => "elevate",
            Self::InspectTarget => "inspect-target",
            Self::RemountReadWrite => "remount-read-write",
            Self::CreateTarget => "create-target",
            Self::CreateScratch => "create-scratch",
            Self::AssignOwnership => "assign-ownership",
            Self::RemountReadOnly => "remount-read-only",
            Self::BindMount => "bind-mount",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// Final state of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindOutcome {
    /// Identity that owns the scratch directory.
    pub identity: CallerIdentity,
    /// Directory inside the mount point now carrying the bind mount.
    pub target: TargetDirectory,
    /// Directory backing the bind mount.
    pub scratch: ScratchDirectory,
    /// Mount mode last requested by the run.
    pub mount_mode: MountMode,
}

/// Mutable state threaded through a single run.
#[derive(Debug)]
struct RunState {
    step: Step,
    mode: MountMode,
}

impl RunState {
    const fn new() -> Self {
        Self {
            step: Step::ResolveIdentity,
            mode: MountMode::Unknown,
        }
    }

    fn enter(&mut self, step: Step) {
        tracing::debug!(from = %self.step, to = %step, mode = %self.mode, "step transition");
        self.step = step;
    }
}

/// Sequences mount transitions and provisioning for one target.
pub struct Orchestrator<'a> {
    mount_point: MountPoint,
    staging_root: PathBuf,
    target_owner: TargetOwnerPolicy,
    mounts: &'a dyn MountController,
    provisioner: &'a dyn DirectoryProvisioner,
    identity: &'a dyn IdentityResolver,
}

impl<'a> Orchestrator<'a> {
    /// Creates an orchestrator with the `root` target owner policy.
    #[must_use]
    pub fn new(
        mount_point: MountPoint,
        staging_root: impl Into<PathBuf>,
        mounts: &'a dyn MountController,
        provisioner: &'a dyn DirectoryProvisioner,
        identity: &'a dyn IdentityResolver,
    ) -> Self {
        Self {
            mount_point,
            staging_root: staging_root.into(),
            target_owner: TargetOwnerPolicy::default(),
            mounts,
            provisioner,
            identity,
        }
    }

    /// Creates an orchestrator from a loaded configuration.
    #[must_use]
    pub fn from_config(
        config: &BindConfig,
        mounts: &'a dyn MountController,
        provisioner: &'a dyn DirectoryProvisioner,
        identity: &'a dyn IdentityResolver,
    ) -> Self {
        Self::new(
            config.mount_point(),
            config.staging_root.clone(),
            mounts,
            provisioner,
            identity,
        )
        .with_target_owner(config.target_owner)
    }

    /// Sets who owns a target directory created by the run.
    #[must_use]
    pub const fn with_target_owner(mut self, policy: TargetOwnerPolicy) -> Self {
        self.target_owner = policy;
        self
    }

    /// Returns the protected mount point.
    #[must_use]
    pub const fn mount_point(&self) -> &MountPoint {
        &self.mount_point
    }

    /// Performs the full run for `target`.
    ///
    /// `target` must already be validated to lie under the mount point.
    ///
    /// # Errors
    ///
    /// Returns the error of the first failing step. When that step ran
    /// inside the read-write window, a read-only remount has been attempted
    /// before returning.
    pub fn run(&self, target: &Path) -> Result<BindOutcome> {
        let mut state = RunState::new();
        tracing::info!(
            target = %target.display(),
            mount_point = %self.mount_point.path.display(),
            staging_root = %self.staging_root.display(),
            "starting bind run"
        );

        let identity = self.identity.resolve()?;
        state.enter(Step::Elevate);
        self.identity.elevate()?;

        state.enter(Step::InspectTarget);
        let target_dir = match self.provisioner.inspect_target(target)? {
            TargetState::Directory => {
                tracing::info!(target = %target.display(), "target directory exists, reusing it");
                TargetDirectory {
                    path: target.to_path_buf(),
                    preexisted: true,
                    mode: TARGET_DIR_MODE,
                    owner: None,
                }
            }
            TargetState::NotADirectory => {
                return Err(OptbindError::NotADirectory {
                    path: target.to_path_buf(),
                });
            }
            TargetState::Absent => {
                state.enter(Step::RemountReadWrite);
                self.mounts.remount_read_write(&self.mount_point)?;
                state.mode = MountMode::ReadWrite;
                tracing::info!(mount_point = %self.mount_point.path.display(), "mount point is read-write");

                state.enter(Step::CreateTarget);
                self.create_target(target)
                    .map_err(|e| self.compensate(&state, e))?
            }
        };

        let scratch = self
            .provision_scratch(&mut state, identity)
            .map_err(|e| self.compensate(&state, e))?;

        if state.mode == MountMode::ReadWrite {
            state.enter(Step::RemountReadOnly);
            self.mounts
                .remount_read_only(&self.mount_point)
                .inspect_err(|e| {
                    tracing::error!(
                        mount_point = %self.mount_point.path.display(),
                        error = %e,
                        "mount point could not be restored to read-only and may remain writable"
                    );
                })?;
            state.mode = MountMode::ReadOnly;
            tracing::info!(mount_point = %self.mount_point.path.display(), "mount point is read-only");
        }

        state.enter(Step::BindMount);
        self.mounts
            .bind_mount(&scratch.path, target, self.mount_point.fs_type.as_deref())?;
        tracing::info!(
            source = %scratch.path.display(),
            target = %target.display(),
            "bind mount established"
        );

        state.enter(Step::Done);
        Ok(BindOutcome {
            identity,
            target: target_dir,
            scratch,
            mount_mode: state.mode,
        })
    }

    fn create_target(&self, target: &Path) -> Result<TargetDirectory> {
        let mut dir = self
            .provisioner
            .ensure_target_directory(target, TARGET_DIR_MODE)?;
        tracing::info!(
            path = %dir.path.display(),
            mode = %format!("{:o}", dir.mode),
            preexisted = dir.preexisted,
            "target directory ready"
        );
        if self.target_owner == TargetOwnerPolicy::Root && !dir.preexisted {
            self.provisioner
                .assign_ownership(&dir.path, ROOT_UID, ROOT_GID)?;
            dir.owner = Some(CallerIdentity::new(ROOT_UID, ROOT_GID));
        }
        Ok(dir)
    }

    fn provision_scratch(
        &self,
        state: &mut RunState,
        identity: CallerIdentity,
    ) -> Result<ScratchDirectory> {
        state.enter(Step::CreateScratch);
        let mut scratch = self
            .provisioner
            .create_scratch_directory(&self.staging_root)?;
        tracing::info!(path = %scratch.path.display(), "scratch directory created");

        state.enter(Step::AssignOwnership);
        self.provisioner
            .assign_ownership(&scratch.path, identity.uid, identity.gid)?;
        scratch.owner = Some(identity);
        tracing::info!(path = %scratch.path.display(), %identity, "scratch directory handed to caller");
        Ok(scratch)
    }

    /// Restores read-only mode if the window is open, then returns `err`.
    ///
    /// A failing restore is logged and never replaces `err`.
    fn compensate(&self, state: &RunState, err: OptbindError) -> OptbindError {
        if state.mode != MountMode::ReadWrite {
            return err;
        }
        tracing::warn!(
            step = %state.step,
            error = %err,
            mount_point = %self.mount_point.path.display(),
            "step failed inside read-write window, restoring read-only"
        );
        if let Err(restore) = self.mounts.remount_read_only(&self.mount_point) {
            tracing::error!(
                mount_point = %self.mount_point.path.display(),
                error = %restore,
                "compensating read-only remount failed, mount point may remain writable"
            );
        }
        err
    }
}
