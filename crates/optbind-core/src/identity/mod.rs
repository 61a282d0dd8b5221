//! Resolution of the unprivileged caller's identity.
//!
//! Two strategies exist: reading the IDs `sudo` propagates through the
//! environment, or reading the real IDs of a setuid-root process and then
//! elevating it.

pub mod setuid;
pub mod sudo;

use optbind_common::error::Result;
use optbind_common::types::{CallerIdentity, IdentityStrategy};

pub use setuid::SetuidResolver;
pub use sudo::SudoEnvResolver;

/// Source of the identity that owns provisioned resources.
pub trait IdentityResolver {
    /// Returns the unprivileged caller's uid and gid.
    ///
    /// # Errors
    ///
    /// Returns [`OptbindError::IdentityUnavailable`] when no safe ownership
    /// target can be determined.
    ///
    /// [`OptbindError::IdentityUnavailable`]: optbind_common::error::OptbindError::IdentityUnavailable
    fn resolve(&self) -> Result<CallerIdentity>;

    /// Raises the process to the privileged identity, if this strategy needs it.
    ///
    /// # Errors
    ///
    /// Returns [`OptbindError::ElevationFailed`] if the OS rejects the change.
    ///
    /// [`OptbindError::ElevationFailed`]: optbind_common::error::OptbindError::ElevationFailed
    fn elevate(&self) -> Result<()> {
        Ok(())
    }
}

/// Creates the resolver for the configured strategy.
#[must_use]
pub fn resolver_for(strategy: IdentityStrategy) -> Box<dyn IdentityResolver> {
    match strategy {
        IdentityStrategy::SudoEnv => Box::new(SudoEnvResolver::from_env()),
        IdentityStrategy::Setuid => Box::new(SetuidResolver::new()),
    }
}
