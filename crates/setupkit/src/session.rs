//! State/snapshot pairing owned by a setup run
//!
//! A [`StateSession`] checks that the state document matches the requested
//! mode, loads it, protects the installed paths with a snapshot, and at the
//! end of the run either commits the new state or rolls the filesystem back.

use crate::error::{Error, Result};
use crate::path::{self, FileSystem};
use crate::report::Reporter;
use crate::snapshot::Snapshot;
use crate::state::{InstallState, StateStore};
use std::fmt;
use std::path::{Path, PathBuf};

/// Default location of the installation state document.
pub const DEFAULT_STATE_FILE: &str = "/var/opt/vixen/package_status.json";

/// Default parent directory of snapshots.
pub const DEFAULT_SNAPSHOT_DIR: &str = "/var/opt/vixen/snapshots";

/// Check and step names reported during a run.
pub mod purpose {
    pub const INIT: &str = "Initializing state";
    pub const CHECK_STATE_ABSENT: &str = "Check if state does not exist";
    pub const CHECK_STATE_PRESENT: &str = "Check if state exists";
    pub const LOAD_STATE: &str = "Load state";
    pub const UPDATE_STATE: &str = "Update state";
    pub const REMOVE_STATE: &str = "Remove state";
    pub const EXECUTION: &str = "Execution";
    pub const CREATE_SNAPSHOT: &str = "Create snapshot";
    pub const RESTORE_SNAPSHOT: &str = "Restore snapshot";
    pub const REMOVE_SNAPSHOT: &str = "Remove snapshot";
}

/// Where state and snapshots live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupConfig {
    pub state_file: PathBuf,
    pub snapshot_dir: PathBuf,
}

impl Default for SetupConfig {
    fn default() -> Self {
        Self {
            state_file: PathBuf::from(DEFAULT_STATE_FILE),
            snapshot_dir: PathBuf::from(DEFAULT_SNAPSHOT_DIR),
        }
    }
}

/// What kind of run this is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupMode {
    /// First-time install: no state may exist yet, state is created on success
    Install,
    /// State must exist; new executables are merged into it on success
    Update,
    /// State must exist; it is deleted on success
    Uninstall,
}

impl SetupMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Install => "install",
            Self::Update => "update",
            Self::Uninstall => "uninstall",
        }
    }

    /// Whether this is a first-time install
    pub fn is_initial(&self) -> bool {
        matches!(self, Self::Install)
    }
}

impl fmt::Display for SetupMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State document and snapshot handling for one run.
pub struct StateSession {
    mode: SetupMode,
    store: StateStore,
    snapshot_dir: PathBuf,
    fs: FileSystem,
    new_state: Option<InstallState>,
    current: Option<InstallState>,
    snapshot: Option<Snapshot>,
}

impl StateSession {
    /// `new_state` is what the run installs; it may be omitted for updates
    /// that only replace files in place
    pub fn new(
        mode: SetupMode,
        config: &SetupConfig,
        new_state: Option<InstallState>,
        fs: FileSystem,
    ) -> Self {
        Self::with_store(
            mode,
            StateStore::new(&config.state_file),
            &config.snapshot_dir,
            new_state,
            fs,
        )
    }

    pub fn with_store(
        mode: SetupMode,
        store: StateStore,
        snapshot_dir: &Path,
        new_state: Option<InstallState>,
        fs: FileSystem,
    ) -> Self {
        Self {
            mode,
            store,
            snapshot_dir: snapshot_dir.to_path_buf(),
            fs,
            new_state,
            current: None,
            snapshot: None,
        }
    }

    pub fn mode(&self) -> SetupMode {
        self.mode
    }

    /// State loaded during [`StateSession::init`]
    pub fn current_state(&self) -> Option<&InstallState> {
        self.current.as_ref()
    }

    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.snapshot.as_ref()
    }

    /// Verify the state document matches the mode and load it
    pub fn init(&mut self, reporter: &mut dyn Reporter) -> Result<()> {
        if let Err(err) = self.check_availability(reporter) {
            reporter.check(purpose::INIT, false);
            return Err(err);
        }

        if !self.mode.is_initial() {
            if let Err(err) = self.load(reporter) {
                reporter.check(purpose::INIT, false);
                return Err(err);
            }
        }

        reporter.check(purpose::INIT, true);
        Ok(())
    }

    fn check_availability(&self, reporter: &mut dyn Reporter) -> Result<()> {
        let exists = self.store.exists();
        if self.mode.is_initial() {
            reporter.check(purpose::CHECK_STATE_ABSENT, !exists);
            if exists {
                return Err(Error::StateExists(self.store.path().to_path_buf()));
            }
        } else {
            reporter.check(purpose::CHECK_STATE_PRESENT, exists);
            if !exists {
                return Err(Error::StateMissing(self.store.path().to_path_buf()));
            }
        }
        Ok(())
    }

    fn load(&mut self, reporter: &mut dyn Reporter) -> Result<()> {
        let loaded = self
            .store
            .read()
            .and_then(|state| {
                state.ok_or_else(|| Error::StateMissing(self.store.path().to_path_buf()))
            });

        reporter.check(purpose::LOAD_STATE, loaded.is_ok());
        let state = loaded?;
        log::debug!(
            "current state: env_path={} exec_paths={:?}",
            state.env_path,
            state.exec_paths
        );
        self.current = Some(state);
        Ok(())
    }

    /// Back up every installed path before any task runs
    ///
    /// Skipped for a first-time install, where nothing exists to protect.
    pub fn create_snapshot(&mut self, reporter: &mut dyn Reporter) -> Result<()> {
        if self.mode.is_initial() {
            reporter.note(purpose::CREATE_SNAPSHOT, "skipped");
            return Ok(());
        }

        let Some(current) = &self.current else {
            reporter.check(purpose::CREATE_SNAPSHOT, false);
            return Err(Error::StateMissing(self.store.path().to_path_buf()));
        };

        let origins = current.managed_paths();
        let snapshot = Snapshot::open(&self.snapshot_dir, origins.as_slice(), self.fs.clone());
        let snapshot = match snapshot {
            Ok(snapshot) => self.snapshot.insert(snapshot),
            Err(err) => {
                reporter.check(purpose::CREATE_SNAPSHOT, false);
                return Err(err);
            }
        };

        let result = snapshot.create();
        reporter.check(purpose::CREATE_SNAPSHOT, result.is_ok());
        result
    }

    /// Undo a partially applied run
    ///
    /// Returns `Ok(false)` when there is no snapshot to restore from.
    pub fn restore(&mut self, reporter: &mut dyn Reporter) -> Result<bool> {
        if self.snapshot.is_none() {
            reporter.note(purpose::RESTORE_SNAPSHOT, "no snapshot");
            return Ok(false);
        }

        self.clean_new_exec(reporter);

        let Some(snapshot) = self.snapshot.as_mut() else {
            return Ok(false);
        };
        let result = snapshot.restore();
        reporter.check(purpose::RESTORE_SNAPSHOT, result.is_ok());
        if let Err(err) = &result {
            log::warn!("snapshot restore failed: {err}");
        }
        result.map(|()| true)
    }

    /// Executables the failed run introduced are not covered by the snapshot
    fn clean_new_exec(&self, reporter: &mut dyn Reporter) {
        let (Some(new_state), Some(current)) = (&self.new_state, &self.current) else {
            return;
        };

        for exec in &new_state.exec_paths {
            let target = Path::new(exec);
            if current.exec_paths.contains(exec) || !path::exists(target) {
                continue;
            }
            let result = self.fs.remove(target);
            reporter.check(&format!("Remove {exec}"), result.is_ok());
        }
    }

    /// Record the outcome of a successful run
    pub fn commit(&mut self, reporter: &mut dyn Reporter) -> Result<()> {
        match self.mode {
            SetupMode::Install => {
                let result = match &self.new_state {
                    Some(state) => self.store.create(state),
                    None => Err(Error::NoStateData("install")),
                };
                reporter.check(purpose::UPDATE_STATE, result.is_ok());
                result
            }
            SetupMode::Update => {
                let Some(state) = &self.new_state else {
                    reporter.note(purpose::UPDATE_STATE, "no update data");
                    return Ok(());
                };
                let result = self.store.update(state);
                reporter.check(purpose::UPDATE_STATE, result.is_ok());
                result
            }
            SetupMode::Uninstall => {
                let result = self.store.remove();
                reporter.check(purpose::REMOVE_STATE, result.is_ok());
                result
            }
        }
    }

    /// Discard the snapshot, if one was taken
    pub fn remove_snapshot(&mut self, reporter: &mut dyn Reporter) -> Result<()> {
        let Some(snapshot) = self.snapshot.as_mut() else {
            reporter.note(purpose::REMOVE_SNAPSHOT, "no snapshot");
            return Ok(());
        };

        let result = snapshot.remove();
        reporter.check(purpose::REMOVE_SNAPSHOT, result.is_ok());
        if let Err(err) = &result {
            log::warn!(
                "snapshot left behind at {}: {err}",
                snapshot.root_path().display()
            );
        }
        result
    }
}
