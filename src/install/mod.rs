//! `agent-smith install`: register this tool's hooks in an agent runtime's
//! settings file.
//!
//! The run is a short state machine:
//!
//! ```text
//! load -> merge -> no change? -> "No changes needed."
//!                -> diff -> redirected?  -> print raw diff, stop
//!                        -> interactive  -> page colored diff -> confirm?
//!                                              -> yes: atomic write
//!                                              -> no:  "No changes applied."
//! ```
//!
//! Nothing is written unless the operator explicitly confirms.

pub mod diff;
pub mod merge;
pub mod present;
pub mod settings;

pub use merge::{CommandArgs, HookEvent, HookRegistration, MergeResult, REGISTRATIONS, merge};
pub use present::{Console, Terminal};
pub use settings::SettingsDocument;

use crate::error::{InstallError, Result};
use std::path::PathBuf;
use tracing::{debug, info};

/// Inputs of one install run.
#[derive(Debug, Clone, Default)]
pub struct InstallOptions {
    pub settings_path: PathBuf,
    /// Flags embedded into the generated hook commands.
    pub args: CommandArgs,
    /// Treat a missing settings file as `{}`.
    pub create: bool,
    /// Remove this tool's stale hook commands before adding the current ones.
    pub replace: bool,
}

/// How an install run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    /// Every hook was already registered.
    NoChange,
    /// Output was redirected; the diff was printed and nothing written.
    DiffPrinted,
    /// The operator confirmed and the file was replaced.
    Written,
    /// The operator declined; the file is untouched.
    Rejected,
}

impl InstallOutcome {
    /// Process exit status for this outcome.
    pub fn exit_code(self) -> u8 {
        match self {
            InstallOutcome::Rejected => 1,
            _ => 0,
        }
    }
}

/// Run the install flow against `console`.
pub fn run_install(options: &InstallOptions, console: &mut dyn Console) -> Result<InstallOutcome> {
    let path = &options.settings_path;
    let original = if options.create {
        SettingsDocument::load_or_empty(path)?
    } else {
        SettingsDocument::load(path)?
    };
    debug!(path = %path.display(), "settings loaded");

    let merged = merge(&original, REGISTRATIONS, &options.args, options.replace);
    let diff = if merged.changed {
        diff::unified_diff(
            &path.display().to_string(),
            &original.serialize(),
            &merged.document.serialize(),
        )
    } else {
        String::new()
    };
    if diff.is_empty() {
        debug!("hooks already registered");
        console
            .print("No changes needed.\n")
            .map_err(InstallError::Output)?;
        return Ok(InstallOutcome::NoChange);
    }

    let interactive = console.is_interactive();
    debug!(interactive, "presenting diff");
    present::display(console, &diff).map_err(InstallError::Output)?;
    if !interactive {
        return Ok(InstallOutcome::DiffPrinted);
    }

    if !console.confirm(present::APPLY_PROMPT) {
        console
            .print("No changes applied.\n")
            .map_err(InstallError::Output)?;
        return Ok(InstallOutcome::Rejected);
    }

    merged
        .document
        .write(path)
        .map_err(|e| InstallError::Aborted(Box::new(e)))?;
    info!(path = %path.display(), "settings updated");
    console
        .print(&format!("Changes written to {}\n", path.display()))
        .map_err(InstallError::Output)?;
    Ok(InstallOutcome::Written)
}
