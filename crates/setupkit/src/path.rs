//! Path entries and filesystem primitives
//!
//! Queries (`exists`, `is_file`, `is_directory`) read metadata directly.
//! Mutations are delegated to the [`Executor`] so they can run elevated when
//! the managed paths live under protected system directories.

use crate::error::Result;
use crate::exec::{CommandLine, Executor, RunOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A path decomposed into parent directory and leaf name.
///
/// Construction never touches the filesystem.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathEntry {
    path: PathBuf,
}

impl PathEntry {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parent directory, `None` for a bare leaf or the root
    pub fn parent_path(&self) -> Option<&Path> {
        self.path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
    }

    /// Final component, `None` for the root or a path ending in `..`
    pub fn leaf_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|name| name.to_str())
    }

    pub fn exists(&self) -> bool {
        exists(&self.path)
    }

    /// Whether the parent directory exists (a bare leaf is relative to cwd)
    pub fn parent_exists(&self) -> bool {
        self.parent_path().is_none_or(exists)
    }

    /// This path re-rooted under `root`, keeping its full structure
    ///
    /// `/usr/bin/vxm` under `/snap/20240101_120000` becomes
    /// `/snap/20240101_120000/usr/bin/vxm`.
    pub fn mirrored_under(&self, root: &Path) -> PathBuf {
        let relative = self.path.strip_prefix("/").unwrap_or(&self.path);
        root.join(relative)
    }
}

impl From<&Path> for PathEntry {
    fn from(path: &Path) -> Self {
        Self::new(path)
    }
}

/// Whether anything exists at `path`, without following a final symlink
pub fn exists(path: &Path) -> bool {
    path.symlink_metadata().is_ok()
}

pub fn is_file(path: &Path) -> bool {
    path.is_file()
}

pub fn is_directory(path: &Path) -> bool {
    path.is_dir()
}

/// Kind of entry to create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// Filesystem mutations routed through an [`Executor`].
#[derive(Clone)]
pub struct FileSystem {
    executor: Arc<dyn Executor>,
    elevate: bool,
}

impl FileSystem {
    /// Mutations run through `executor`, elevated when `elevate` is set
    pub fn new(executor: Arc<dyn Executor>, elevate: bool) -> Self {
        Self { executor, elevate }
    }

    pub fn executor(&self) -> &Arc<dyn Executor> {
        &self.executor
    }

    fn options(&self) -> RunOptions {
        RunOptions {
            elevate: self.elevate,
            ..RunOptions::default()
        }
    }

    fn run(&self, command: CommandLine) -> Result<()> {
        self.executor.run(&command, &self.options())
    }

    /// Create an empty file or a directory (with missing parents)
    pub fn create(&self, path: &Path, kind: EntryKind) -> Result<()> {
        match kind {
            EntryKind::File => self.create_file(path),
            EntryKind::Directory => self.create_directory(path),
        }
    }

    pub fn create_file(&self, path: &Path) -> Result<()> {
        self.run(CommandLine::new("touch").arg(path_arg(path)))
    }

    /// `mkdir -p`: succeeds if the directory already exists
    pub fn create_directory(&self, path: &Path) -> Result<()> {
        self.run(CommandLine::new("mkdir").arg("-p").arg(path_arg(path)))
    }

    /// Copy `source` into `destination_dir`, recursively, preserving attributes
    pub fn copy(&self, source: &Path, destination_dir: &Path) -> Result<()> {
        self.run(
            CommandLine::new("cp")
                .arg("-a")
                .arg(path_arg(source))
                .arg(path_arg(destination_dir)),
        )
    }

    /// Remove `path`, recursively when it is a directory
    pub fn remove(&self, path: &Path) -> Result<()> {
        let command = if is_directory(path) && !path.is_symlink() {
            CommandLine::new("rm").arg("-r").arg(path_arg(path))
        } else {
            CommandLine::new("rm").arg(path_arg(path))
        };
        self.run(command)
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
