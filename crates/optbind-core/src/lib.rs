//! # optbind-core
//!
//! Privileged filesystem orchestration for a protected mount point.
//!
//! This crate provides:
//! - **Mount control**: remount read-write, remount read-only, and bind mount.
//! - **Provisioning**: target directory, scratch directory, ownership.
//! - **Identity**: resolving the unprivileged caller behind `sudo` or a
//!   setuid-root binary.
//! - **Orchestration**: the ordered run with compensation that never leaves
//!   the protected mount point writable on failure.
//!
//! Every OS facility sits behind a trait so the orchestrator can be driven
//! against an in-memory host in tests.

pub mod filesystem;
pub mod identity;
pub mod orchestrator;

pub use orchestrator::{BindOutcome, Orchestrator};
