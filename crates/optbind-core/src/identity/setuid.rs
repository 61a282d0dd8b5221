//! Caller identity of a setuid-root binary.
//!
//! The real uid/gid still name the invoking user while the effective uid is
//! root. After reading them the process switches every ID to root so that
//! later operations do not depend on the saved set-user-ID.

use optbind_common::error::Result;
use optbind_common::types::CallerIdentity;

use super::IdentityResolver;

/// Reads the real IDs of the process and elevates it to root.
#[derive(Debug, Default, Clone, Copy)]
pub struct SetuidResolver;

impl SetuidResolver {
    /// Creates a new setuid resolver.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl IdentityResolver for SetuidResolver {
    fn resolve(&self) -> Result<CallerIdentity> {
        let identity = CallerIdentity::new(
            nix::unistd::getuid().as_raw(),
            nix::unistd::getgid().as_raw(),
        );
        tracing::info!(uid = identity.uid, gid = identity.gid, "resolved real caller identity");
        Ok(identity)
    }

    fn elevate(&self) -> Result<()> {
        use nix::unistd::{Gid, Uid, setgid, setuid};
        use optbind_common::error::OptbindError;

        setuid(Uid::from_raw(0)).map_err(|e| OptbindError::ElevationFailed { source: e.into() })?;
        setgid(Gid::from_raw(0)).map_err(|e| OptbindError::ElevationFailed { source: e.into() })?;
        tracing::debug!("process identity elevated to root");
        Ok(())
    }
}
