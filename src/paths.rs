//! Path resolution for vixen
//!
//! # Environment Variables
//!
//! - `VIXEN_STATE_FILE` - Override the installation state document
//! - `VIXEN_SNAPSHOT_DIR` - Override the snapshot parent directory
//!
//! # Plan Resolution Priority
//!
//! 1. `--plan` argument
//! 2. `vixen.toml` in the current directory
//! 3. `vixen.toml` in the user config directory (`~/.config/vixen/` on Linux)

use setupkit::SetupConfig;
use std::path::{Path, PathBuf};

/// Environment variable for the state document override
pub const ENV_STATE_FILE: &str = "VIXEN_STATE_FILE";

/// Environment variable for the snapshot directory override
pub const ENV_SNAPSHOT_DIR: &str = "VIXEN_SNAPSHOT_DIR";

/// Plan file name looked up when none is given
pub const DEFAULT_PLAN_FILE: &str = "vixen.toml";

/// Resolve the plan file to load
pub fn plan_file(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return expand(&path.to_string_lossy());
    }

    let local = PathBuf::from(DEFAULT_PLAN_FILE);
    if local.exists() {
        log::debug!("Using plan from current directory: {}", local.display());
        return local;
    }

    if let Some(config) = dirs::config_dir() {
        let user = config.join("vixen").join(DEFAULT_PLAN_FILE);
        if user.exists() {
            log::debug!("Using plan from config dir: {}", user.display());
            return user;
        }
    }

    local
}

/// Build the library configuration from CLI/env values
pub fn setup_config(state_file: &Path, snapshot_dir: &Path) -> SetupConfig {
    let config = SetupConfig {
        state_file: expand(&state_file.to_string_lossy()),
        snapshot_dir: expand(&snapshot_dir.to_string_lossy()),
    };
    log::debug!(
        "State file: {}, snapshots under: {}",
        config.state_file.display(),
        config.snapshot_dir.display()
    );
    config
}

/// Expand `~` and environment variables in a path
///
/// Unknown variables are left as written.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

// ============================================================================
// Tests
// ============================================================================
