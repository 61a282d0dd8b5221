//! `optbind bind` — Provision the target and bind-mount a scratch directory onto it.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Args;
use optbind_common::config::BindConfig;
use optbind_core::Orchestrator;
use optbind_core::filesystem::{SystemMountController, SystemProvisioner};
use optbind_core::identity::resolver_for;

/// Arguments for the `bind` command.
#[derive(Args, Debug)]
pub struct BindArgs {
    /// Directory to create under the mount point, e.g. /opt/software/cmake.
    pub target: PathBuf,
}

/// Records SIGINT/SIGTERM instead of letting them terminate the process.
#[derive(Debug, Clone, Default)]
struct DeferredInterrupt {
    received: Arc<AtomicBool>,
}

impl DeferredInterrupt {
    /// Installs the process-wide handler. Can only succeed once per process.
    fn install() -> anyhow::Result<Self> {
        let deferred = Self::default();
        let handle = deferred.clone();
        ctrlc::set_handler(move || handle.record())
            .map_err(|e| anyhow::anyhow!("failed to install interrupt handler: {e}"))?;
        Ok(deferred)
    }

    fn record(&self) {
        self.received.store(true, Ordering::SeqCst);
    }

    /// Reports an interrupt held back during the run. Returns whether one arrived.
    fn settle(&self) -> bool {
        let received = self.received.load(Ordering::SeqCst);
        if received {
            tracing::warn!("interrupt received during run, deferred until the run finished");
        }
        received
    }
}

/// Executes the `bind` command.
///
/// SIGINT and SIGTERM are held back for the whole run so the process cannot
/// be stopped while the mount point is writable.
///
/// # Errors
///
/// Returns an error if target validation or any step of the run fails.
pub fn execute(args: &BindArgs, config: &BindConfig) -> anyhow::Result<()> {
    let interrupt = DeferredInterrupt::install()?;

    let target = crate::target::resolve_target(&args.target, &config.mount_point)?;

    let mounts = SystemMountController::new();
    let provisioner = SystemProvisioner::new();
    let identity = resolver_for(config.identity);
    let orchestrator = Orchestrator::from_config(config, &mounts, &provisioner, identity.as_ref());

    let result = orchestrator.run(&target);
    let _ = interrupt.settle();

    let outcome = result?;
    crate::output::print_success(&outcome);
    Ok(())
}
