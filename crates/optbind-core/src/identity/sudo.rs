//! Caller identity from the environment set by `sudo`.

use optbind_common::constants::{SUDO_GID_VAR, SUDO_UID_VAR};
use optbind_common::error::{OptbindError, Result};
use optbind_common::types::CallerIdentity;

use super::IdentityResolver;

type EnvLookup = fn(&str) -> Option<String>;

fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Reads `SUDO_UID` and `SUDO_GID`. Fails closed if either is missing.
#[derive(Debug, Clone, Copy)]
pub struct SudoEnvResolver<F = EnvLookup> {
    lookup: F,
}

impl SudoEnvResolver {
    /// Creates a resolver reading the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            lookup: process_env,
        }
    }
}

impl<F> SudoEnvResolver<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Creates a resolver reading variables through `lookup`.
    #[must_use]
    pub const fn with_lookup(lookup: F) -> Self {
        Self { lookup }
    }

    fn read_id(&self, var: &str) -> Result<u32> {
        let raw = (self.lookup)(var).ok_or_else(|| OptbindError::IdentityUnavailable {
            reason: format!("{var} is not set; run through sudo"),
        })?;
        let id = raw
            .trim()
            .parse::<u32>()
            .map_err(|_| OptbindError::IdentityUnavailable {
                reason: format!("{var} is not a numeric id: {raw:?}"),
            })?;
        // chown(2) reads (uid_t)-1 as "leave unchanged".
        if id == u32::MAX {
            return Err(OptbindError::IdentityUnavailable {
                reason: format!("{var} is the reserved id {id}"),
            });
        }
        Ok(id)
    }
}

impl<F> IdentityResolver for SudoEnvResolver<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn resolve(&self) -> Result<CallerIdentity> {
        let uid = self.read_id(SUDO_UID_VAR)?;
        let gid = self.read_id(SUDO_GID_VAR)?;
        let identity = CallerIdentity::new(uid, gid);
        if identity.is_root() {
            tracing::warn!(%identity, "sudo caller is root; scratch directory will be root-owned");
        }
        tracing::debug!(%identity, "resolved caller from sudo environment");
        Ok(identity)
    }
}
