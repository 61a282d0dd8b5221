//! `optbind plan` — Show the steps `bind` would take, without changing anything.

use std::fmt::Write as _;
use std::path::PathBuf;

use clap::Args;
use optbind_common::config::BindConfig;
use optbind_common::constants::{SCRATCH_PREFIX, TARGET_DIR_MODE};
use optbind_common::error::OptbindError;
use optbind_common::types::{CallerIdentity, TargetOwnerPolicy, TargetState};
use optbind_core::filesystem::{DirectoryProvisioner, SystemProvisioner};
use optbind_core::identity::resolver_for;

/// Arguments for the `plan` command.
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Directory that `bind` would create under the mount point.
    pub target: PathBuf,
}

/// Executes the `plan` command.
///
/// Validates the target, inspects it, and resolves the caller identity
/// without elevating, then prints the resulting step list.
///
/// # Errors
///
/// Returns an error for the same preconditions `bind` would reject.
#[allow(clippy::print_stdout)]
pub fn execute(args: &PlanArgs, config: &BindConfig) -> anyhow::Result<()> {
    let target = crate::target::resolve_target(&args.target, &config.mount_point)?;
    let state = SystemProvisioner::new().inspect_target(&target)?;
    if state == TargetState::NotADirectory {
        return Err(OptbindError::NotADirectory { path: target }.into());
    }
    let identity = resolver_for(config.identity).resolve()?;

    print!("{}", render(config, &target, state, identity));
    Ok(())
}

/// Renders the plan as text.
fn render(
    config: &BindConfig,
    target: &std::path::Path,
    state: TargetState,
    identity: CallerIdentity,
) -> String {
    let mp = config.mount_point.display();
    let fs_type = config.fs_type.as_deref().unwrap_or("(inherited)");
    let mut out = String::new();

    let _ = writeln!(out, "Bind plan for: {}", target.display());
    let _ = writeln!(out, "  mount point:  {mp} (fs type {fs_type})");
    let _ = writeln!(out, "  staging root: {}", config.staging_root.display());
    let _ = writeln!(out, "  caller:       {identity} (via {})", config.identity);
    let _ = writeln!(out);

    let mut steps = Vec::new();
    if state == TargetState::Absent {
        steps.push(format!("remount {mp} read-write"));
        steps.push(format!(
            "create {} (mode {TARGET_DIR_MODE:o})",
            target.display()
        ));
        if config.target_owner == TargetOwnerPolicy::Root {
            steps.push(format!("chown {} to 0:0", target.display()));
        }
    } else {
        steps.push(format!("reuse existing directory {}", target.display()));
    }
    steps.push(format!(
        "create {}/{SCRATCH_PREFIX}XXXXXX",
        config.staging_root.display()
    ));
    steps.push(format!("chown scratch directory to {identity}"));
    if state == TargetState::Absent {
        steps.push(format!("remount {mp} read-only"));
    }
    steps.push(format!("bind mount scratch directory onto {}", target.display()));

    for (i, step) in steps.iter().enumerate() {
        let _ = writeln!(out, "  {}. {step}", i + 1);
    }
    out
}
