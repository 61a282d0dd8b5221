//! CLI command definitions and dispatch.

pub mod bind;
pub mod plan;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use optbind_common::config::BindConfig;
use optbind_common::types::{IdentityStrategy, TargetOwnerPolicy};

/// optbind — writable bind mounts inside a read-only mount point.
#[derive(Parser, Debug)]
#[command(name = "optbind", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// JSON configuration file. Flags override its values.
    #[arg(long, global = true, env = "OPTBIND_CONFIG")]
    pub config: Option<PathBuf>,

    /// Protected mount point.
    #[arg(long, global = true, env = "OPTBIND_MOUNT_POINT")]
    pub mount_point: Option<PathBuf>,

    /// Directory that hosts scratch directories.
    #[arg(long, global = true, env = "OPTBIND_STAGING_ROOT")]
    pub staging_root: Option<PathBuf>,

    /// Filesystem type label passed to mount(2).
    #[arg(long, global = true, env = "OPTBIND_FS_TYPE")]
    pub fs_type: Option<String>,

    /// How the invoking user's identity is determined.
    #[arg(long, global = true, env = "OPTBIND_IDENTITY", value_enum)]
    pub identity: Option<IdentityArg>,

    /// Owner of a target directory created by the run.
    #[arg(long, global = true, env = "OPTBIND_TARGET_OWNER", value_enum)]
    pub target_owner: Option<TargetOwnerArg>,

    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Increase log verbosity (-v info, -vv debug). `RUST_LOG` takes precedence.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Provision the target directory and bind-mount a scratch directory onto it.
    Bind(bind::BindArgs),
    /// Show what `bind` would do without changing anything.
    Plan(plan::PlanArgs),
}

/// Identity strategies selectable on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum IdentityArg {
    /// Read `SUDO_UID` and `SUDO_GID`.
    SudoEnv,
    /// Read the real IDs of a setuid-root binary, then elevate.
    Setuid,
}

impl From<IdentityArg> for IdentityStrategy {
    fn from(arg: IdentityArg) -> Self {
        match arg {
            IdentityArg::SudoEnv => Self::SudoEnv,
            IdentityArg::Setuid => Self::Setuid,
        }
    }
}

/// Target owner policies selectable on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TargetOwnerArg {
    /// chown the created directory to 0:0.
    Root,
    /// Leave the owner produced by mkdir.
    Unchanged,
}

impl From<TargetOwnerArg> for TargetOwnerPolicy {
    fn from(arg: TargetOwnerArg) -> Self {
        match arg {
            TargetOwnerArg::Root => Self::Root,
            TargetOwnerArg::Unchanged => Self::Unchanged,
        }
    }
}

/// Log output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    Text,
    /// One JSON object per event.
    Json,
}

impl Cli {
    /// Builds the effective configuration: file values, then flag overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file is unreadable or the result is invalid.
    pub fn bind_config(&self) -> optbind_common::error::Result<BindConfig> {
        let mut config = match &self.config {
            Some(path) => BindConfig::load(path)?,
            None => BindConfig::default(),
        };
        if let Some(mount_point) = &self.mount_point {
            config.mount_point.clone_from(mount_point);
        }
        if let Some(staging_root) = &self.staging_root {
            config.staging_root.clone_from(staging_root);
        }
        if let Some(fs_type) = &self.fs_type {
            config.fs_type = Some(fs_type.clone());
        }
        if let Some(identity) = self.identity {
            config.identity = identity.into();
        }
        if let Some(owner) = self.target_owner {
            config.target_owner = owner.into();
        }
        config.validate()?;
        tracing::debug!(config = ?config, "effective configuration");
        Ok(config)
    }
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    let config = cli.bind_config()?;
    match cli.command {
        Command::Bind(args) => bind::execute(&args, &config),
        Command::Plan(args) => plan::execute(&args, &config),
    }
}
