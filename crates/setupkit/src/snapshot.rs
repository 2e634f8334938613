//! Point-in-time snapshots of managed paths
//!
//! A [`Snapshot`] lives under `{parent}/{YYYYMMDD_HHMMSS}` and mirrors the
//! absolute path of every protected entry below that root. It exists only to
//! make one destructive run reversible: it is created before the first task,
//! restored if the run fails after changing something, and removed at the end
//! of every run.

use crate::error::{Error, Result};
use crate::path::{self, FileSystem, PathEntry};
use chrono::Local;
use std::path::{Path, PathBuf};

/// Timestamp format of snapshot directory names.
pub const SNAPSHOT_ID_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Snapshot directory name for the current local time
pub fn snapshot_id() -> String {
    Local::now().format(SNAPSHOT_ID_FORMAT).to_string()
}

/// One backed-up entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snap {
    origin: PathEntry,
    backup: PathEntry,
}

impl Snap {
    fn new(origin: &Path, root: &Path) -> Self {
        let origin = PathEntry::new(origin);
        let backup = PathEntry::new(origin.mirrored_under(root));
        Self { origin, backup }
    }

    /// The live path being protected
    pub fn origin_path(&self) -> &Path {
        self.origin.path()
    }

    /// Where the backup copy lives
    pub fn snapshot_path(&self) -> &Path {
        self.backup.path()
    }

    fn create(&self, fs: &FileSystem) -> Result<()> {
        if self.backup.exists() {
            return Err(Error::SnapExists(self.snapshot_path().to_path_buf()));
        }
        if !self.origin.exists() {
            return Err(Error::OriginMissing(self.origin_path().to_path_buf()));
        }

        let parent = self
            .backup
            .parent_path()
            .ok_or_else(|| Error::OriginMissing(self.origin_path().to_path_buf()))?;
        if !path::exists(parent) {
            fs.create_directory(parent)
                .map_err(|e| Error::snap_step(self.origin_path(), e))?;
        }

        fs.copy(self.origin_path(), parent)
            .map_err(|e| Error::snap_step(self.origin_path(), e))
    }

    fn restore(&self, fs: &FileSystem) -> Result<()> {
        if !self.backup.exists() {
            return Err(Error::BackupMissing(self.snapshot_path().to_path_buf()));
        }

        if self.origin.exists() {
            fs.remove(self.origin_path())
                .map_err(|e| Error::snap_step(self.origin_path(), e))?;
        }

        let parent = self
            .origin
            .parent_path()
            .ok_or_else(|| Error::BackupMissing(self.snapshot_path().to_path_buf()))?;
        if !path::exists(parent) {
            fs.create_directory(parent)
                .map_err(|e| Error::snap_step(self.origin_path(), e))?;
        }

        fs.copy(self.snapshot_path(), parent)
            .map_err(|e| Error::snap_step(self.origin_path(), e))
    }

    fn discard(&self, fs: &FileSystem) -> Result<()> {
        if self.backup.exists() {
            fs.remove(self.snapshot_path())?;
        }
        Ok(())
    }
}

/// Lifecycle of a [`Snapshot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotState {
    /// Root directory exists, nothing backed up yet
    RootCreated,
    /// Every entry has a backup
    Populated,
    /// Backups were copied back over the live paths
    Restored,
    /// Root directory deleted
    Removed,
}

/// A timestamped backup of a fixed set of paths, restorable as a unit.
pub struct Snapshot {
    root: PathBuf,
    snaps: Vec<Snap>,
    state: SnapshotState,
    fs: FileSystem,
}

impl Snapshot {
    /// Create the snapshot root under `parent_directory` for `origins`
    ///
    /// Fails if the root directory already exists or cannot be created; no
    /// backup is taken yet.
    pub fn open<P: AsRef<Path>>(
        parent_directory: &Path,
        origins: &[P],
        fs: FileSystem,
    ) -> Result<Self> {
        Self::open_with_id(parent_directory, &snapshot_id(), origins, fs)
    }

    /// Like [`Snapshot::open`] with an explicit directory name
    pub fn open_with_id<P: AsRef<Path>>(
        parent_directory: &Path,
        id: &str,
        origins: &[P],
        fs: FileSystem,
    ) -> Result<Self> {
        let root = parent_directory.join(id);
        if path::exists(&root) {
            return Err(Error::SnapshotRoot {
                source: Box::new(Error::SnapExists(root.clone())),
                path: root,
            });
        }
        fs.create_directory(&root)
            .map_err(|source| Error::SnapshotRoot {
                path: root.clone(),
                source: Box::new(source),
            })?;
        log::debug!("snapshot root created: {}", root.display());

        let snaps = origins
            .iter()
            .map(|origin| Snap::new(origin.as_ref(), &root))
            .collect();

        Ok(Self {
            root,
            snaps,
            state: SnapshotState::RootCreated,
            fs,
        })
    }

    pub fn root_path(&self) -> &Path {
        &self.root
    }

    pub fn snaps(&self) -> &[Snap] {
        &self.snaps
    }

    pub fn state(&self) -> SnapshotState {
        self.state
    }

    /// Back up every entry, in order
    ///
    /// On failure the backups taken by this call are discarded again, so the
    /// snapshot never holds a partial set.
    pub fn create(&mut self) -> Result<()> {
        for (index, snap) in self.snaps.iter().enumerate() {
            if let Err(err) = snap.create(&self.fs) {
                log::warn!(
                    "backup of {} failed, discarding {} earlier backup(s)",
                    snap.origin_path().display(),
                    index
                );
                for done in self.snaps[..index].iter().rev() {
                    if let Err(discard_err) = done.discard(&self.fs) {
                        log::warn!(
                            "failed to discard backup {}: {discard_err}",
                            done.snapshot_path().display()
                        );
                    }
                }
                return Err(err);
            }
            log::debug!(
                "backed up {} -> {}",
                snap.origin_path().display(),
                snap.snapshot_path().display()
            );
        }

        self.state = SnapshotState::Populated;
        Ok(())
    }

    /// Copy every backup back over its origin, in order
    ///
    /// Stops at the first failing entry; entries before it stay restored.
    pub fn restore(&mut self) -> Result<()> {
        for snap in &self.snaps {
            snap.restore(&self.fs)?;
            log::debug!("restored {}", snap.origin_path().display());
        }

        self.state = SnapshotState::Restored;
        Ok(())
    }

    /// Delete the whole snapshot root; a no-op once removed
    pub fn remove(&mut self) -> Result<()> {
        if self.state == SnapshotState::Removed || !path::exists(&self.root) {
            self.state = SnapshotState::Removed;
            return Ok(());
        }

        self.fs
            .remove(&self.root)
            .map_err(|e| Error::snap_step(&self.root, e))?;
        log::debug!("snapshot removed: {}", self.root.display());
        self.state = SnapshotState::Removed;
        Ok(())
    }
}
