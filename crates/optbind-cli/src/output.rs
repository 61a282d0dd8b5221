//! Status and diagnostic lines printed to stderr.

use std::io::IsTerminal;

use optbind_common::constants::{APP_NAME, EXIT_MUTATION};
use optbind_common::error::OptbindError;
use optbind_core::BindOutcome;

const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

struct Palette {
    bold: &'static str,
    dim: &'static str,
    green: &'static str,
    red: &'static str,
    reset: &'static str,
}

fn palette() -> Palette {
    if std::io::stderr().is_terminal() {
        Palette {
            bold: BOLD,
            dim: DIM,
            green: GREEN,
            red: RED,
            reset: RESET,
        }
    } else {
        Palette {
            bold: "",
            dim: "",
            green: "",
            red: "",
            reset: "",
        }
    }
}

/// Returns the process exit status for a failed command.
#[must_use]
pub fn exit_code(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<OptbindError>()
        .map_or(EXIT_MUTATION, OptbindError::exit_code)
}

/// Formats the one-line diagnostic for a failure.
#[must_use]
pub fn failure_line(err: &anyhow::Error) -> String {
    match err.downcast_ref::<OptbindError>() {
        Some(e) => {
            let code = e
                .raw_os_error()
                .map_or_else(String::new, |c| format!(" [errno {c}]"));
            format!("{APP_NAME}: {} failed ({}): {e}{code}", e.step(), e.class())
        }
        None => format!("{APP_NAME}: {err:#}"),
    }
}

/// Prints the failure diagnostic and, for irrecoverable errors, a warning.
pub fn print_failure(err: &anyhow::Error) {
    let p = palette();
    eprintln!("{}{}{}", p.red, failure_line(err), p.reset);
    if err
        .downcast_ref::<OptbindError>()
        .is_some_and(OptbindError::is_security_relevant)
    {
        eprintln!(
            "{}{}WARNING:{} the protected mount point may still be writable; \
             remount it read-only manually.",
            p.bold, p.red, p.reset
        );
    }
}

/// Prints the summary of a successful run.
pub fn print_success(outcome: &BindOutcome) {
    let p = palette();
    let target_note = if outcome.target.preexisted {
        "existing"
    } else {
        "created"
    };
    eprintln!(
        "  {}{}Bound{} {} {}->{} {} {}({target_note}, scratch owned by {}){}",
        p.green,
        p.bold,
        p.reset,
        outcome.scratch.path.display(),
        p.dim,
        p.reset,
        outcome.target.path.display(),
        p.dim,
        outcome.identity,
        p.reset
    );
}
