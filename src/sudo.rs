//! Scoped sudo session
//!
//! Credentials are validated once before a run starts so that elevated steps
//! do not prompt halfway through, and invalidated when the run ends.

use anyhow::{Context, Result, bail};
use setupkit::{Elevation, SetupMode};
use std::process::Command;

/// Whether a run needs sudo before it starts
///
/// Elevated tasks need it, and so does any run that snapshots installed paths.
pub fn required(elevation: &Elevation, mode: SetupMode, has_elevated_tasks: bool) -> bool {
    elevation.is_enabled() && (has_elevated_tasks || !mode.is_initial())
}

/// Scoped sudo context - invalidates credentials on drop
pub struct SudoContext {
    _private: (),
}

impl SudoContext {
    /// Acquire sudo privileges with a reason shown to user
    pub fn acquire(reason: &str) -> Result<Self> {
        if Self::is_valid() {
            log::debug!("sudo credentials already cached");
            return Ok(Self { _private: () });
        }

        eprintln!();
        eprintln!("  Sudo required: {reason}");
        eprintln!();

        // Validate sudo (will prompt for password)
        let status = Command::new("sudo")
            .args(["-v"])
            .status()
            .context("Failed to execute sudo")?;

        if !status.success() {
            bail!("Failed to acquire sudo privileges");
        }

        Ok(Self { _private: () })
    }

    /// Check if sudo is currently valid (without prompting)
    pub fn is_valid() -> bool {
        Command::new("sudo")
            .args(["-n", "true"])
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }
}

impl Drop for SudoContext {
    fn drop(&mut self) {
        let _ = Command::new("sudo").args(["-k"]).status();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_required_when_disabled() {
        assert!(!required(&Elevation::Disabled, SetupMode::Update, true));
    }

    #[test]
    fn test_required_for_elevated_tasks() {
        let sudo = Elevation::sudo();
        assert!(required(&sudo, SetupMode::Install, true));
        assert!(!required(&sudo, SetupMode::Install, false));
    }

    #[test]
    fn test_required_for_snapshots() {
        let sudo = Elevation::sudo();
        assert!(required(&sudo, SetupMode::Update, false));
        assert!(required(&sudo, SetupMode::Uninstall, false));
    }
}
