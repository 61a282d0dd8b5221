//! Filesystem operations performed during a run.
//!
//! Provides the mount controller for remount and bind transitions and the
//! directory provisioner for the target and scratch directories.

pub mod mount;
pub mod provision;

pub use mount::{MountController, SystemMountController};
pub use provision::{DirectoryProvisioner, SystemProvisioner};
