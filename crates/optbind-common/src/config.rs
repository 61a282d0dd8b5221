//! Configuration model for an optbind run.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{OptbindError, Result};
use crate::types::{IdentityStrategy, MountPoint, TargetOwnerPolicy};

/// Settings shared by every run, loadable from a JSON file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BindConfig {
    /// Protected mount point toggled during the run.
    pub mount_point: PathBuf,
    /// Directory hosting scratch directories.
    pub staging_root: PathBuf,
    /// Filesystem type label passed to `mount(2)`.
    pub fs_type: Option<String>,
    /// How the caller's identity is resolved.
    pub identity: IdentityStrategy,
    /// Who owns a newly created target directory.
    pub target_owner: TargetOwnerPolicy,
}

impl Default for BindConfig {
    fn default() -> Self {
        Self {
            mount_point: PathBuf::from(crate::constants::DEFAULT_MOUNT_POINT),
            staging_root: PathBuf::from(crate::constants::DEFAULT_STAGING_ROOT),
            fs_type: None,
            identity: IdentityStrategy::default(),
            target_owner: TargetOwnerPolicy::default(),
        }
    }
}

impl BindConfig {
    /// Reads a configuration file. Missing keys take their default values.
    ///
    /// # Errors
    ///
    /// Returns [`OptbindError::Config`] if the file cannot be read or parsed,
    /// or if the resulting configuration is invalid.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| OptbindError::Config {
            message: format!("cannot read {}: {e}", path.display()),
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|e| OptbindError::Config {
            message: format!("cannot parse {}: {e}", path.display()),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that both roots are absolute and distinct.
    ///
    /// # Errors
    ///
    /// Returns [`OptbindError::Config`] describing the first violation.
    pub fn validate(&self) -> Result<()> {
        if !self.mount_point.is_absolute() {
            return Err(OptbindError::Config {
                message: format!("mount point {} is not absolute", self.mount_point.display()),
            });
        }
        if !self.staging_root.is_absolute() {
            return Err(OptbindError::Config {
                message: format!("staging root {} is not absolute", self.staging_root.display()),
            });
        }
        if self.staging_root.starts_with(&self.mount_point) {
            return Err(OptbindError::Config {
                message: format!(
                    "staging root {} lies inside the protected mount point {}",
                    self.staging_root.display(),
                    self.mount_point.display()
                ),
            });
        }
        if self.fs_type.as_deref().is_some_and(str::is_empty) {
            return Err(OptbindError::Config {
                message: "fs_type must not be empty".into(),
            });
        }
        Ok(())
    }

    /// Builds the [`MountPoint`] described by this configuration.
    #[must_use]
    pub fn mount_point(&self) -> MountPoint {
        MountPoint {
            path: self.mount_point.clone(),
            fs_type: self.fs_type.clone(),
        }
    }
}
