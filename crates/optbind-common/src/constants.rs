//! System-wide constants and default paths.

/// Default protected mount point.
pub const DEFAULT_MOUNT_POINT: &str = "/opt";

/// Default staging root hosting scratch directories.
pub const DEFAULT_STAGING_ROOT: &str = "/tmp";

/// Name prefix of every scratch directory.
pub const SCRATCH_PREFIX: &str = "mntdir.";

/// Number of random characters appended to [`SCRATCH_PREFIX`].
pub const SCRATCH_RANDOM_LEN: usize = 6;

/// Permission bits applied to a newly created target directory.
pub const TARGET_DIR_MODE: u32 = 0o755;

/// Environment variable carrying the invoking user's uid under sudo.
pub const SUDO_UID_VAR: &str = "SUDO_UID";

/// Environment variable carrying the invoking user's gid under sudo.
pub const SUDO_GID_VAR: &str = "SUDO_GID";

/// Owner uid applied to the target directory under the `root` policy.
pub const ROOT_UID: u32 = 0;

/// Owner gid applied to the target directory under the `root` policy.
pub const ROOT_GID: u32 = 0;

/// Exit status for precondition failures without an OS error code.
pub const EXIT_PRECONDITION: u8 = 2;

/// Exit status for mutation failures without an OS error code.
pub const EXIT_MUTATION: u8 = 1;

/// Exit status when the mount point may have been left writable.
pub const EXIT_IRRECOVERABLE: u8 = 255;

/// Application name used in CLI output.
pub const APP_NAME: &str = "optbind";
