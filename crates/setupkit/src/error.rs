//! Error types for setup operations.
//!
//! Every failure the runner can observe maps onto one [`ErrorCategory`], which
//! mirrors how failures are reported to the user: an unmet precondition, a
//! failing command, a state document problem, or a snapshot problem.

use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for setup operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of setup errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// A requirement predicate did not hold.
    Precondition,
    /// An external command could not be spawned or exited non-zero.
    Command,
    /// The state document could not be read, parsed or written.
    State,
    /// A backup, restore or snapshot removal step failed.
    Snapshot,
}

impl ErrorCategory {
    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Precondition => "Requirements are not satisfied",
            Self::Command => "Command failed",
            Self::State => "Installation state error",
            Self::Snapshot => "Snapshot error",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Precondition => "Check the failed requirement details above",
            Self::Command => "Re-run with -v to see command output",
            Self::State => "Inspect the state file or pass --state-file",
            Self::Snapshot => "Check permissions on the snapshot directory",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur while running a setup.
#[derive(Debug, Error)]
pub enum Error {
    /// One or more requirements of a task did not hold
    #[error("requirements not satisfied for '{task}': {}", .unmet.join(", "))]
    RequirementsNotMet {
        /// Purpose of the gated task
        task: String,
        /// Purposes of the failing requirements
        unmet: Vec<String>,
    },

    /// The command could not be started
    #[error("failed to execute: {command}")]
    Spawn {
        /// Rendered command line
        command: String,
        /// Underlying spawn error
        #[source]
        source: io::Error,
    },

    /// The command ran and exited with a non-zero status
    #[error("command failed ({}): {command}", describe_code(.code))]
    CommandFailed {
        /// Rendered command line
        command: String,
        /// Exit code, `None` when terminated by a signal
        code: Option<i32>,
    },

    /// An in-process action reported a failure
    #[error("action failed: {0}")]
    Action(String),

    /// The snapshot root directory could not be created
    #[error("failed to create snapshot directory: {}", .path.display())]
    SnapshotRoot {
        /// Snapshot root that was being created
        path: PathBuf,
        /// Why creation failed
        #[source]
        source: Box<Error>,
    },

    /// A backup target already exists (snapshots are write-once)
    #[error("snapshot entry already exists: {}", .0.display())]
    SnapExists(PathBuf),

    /// The path to back up does not exist
    #[error("cannot snapshot missing path: {}", .0.display())]
    OriginMissing(PathBuf),

    /// The backup to restore from is gone
    #[error("snapshot backup missing: {}", .0.display())]
    BackupMissing(PathBuf),

    /// Copying or removing an entry during backup/restore failed
    #[error("snapshot step failed for {}", .path.display())]
    SnapStep {
        /// Origin path the step was operating on
        path: PathBuf,
        /// Underlying failure
        #[source]
        source: Box<Error>,
    },

    /// The state document was expected but not found
    #[error("installation state not found: {}", .0.display())]
    StateMissing(PathBuf),

    /// The state document exists but a fresh install was requested
    #[error("installation state already exists: {}", .0.display())]
    StateExists(PathBuf),

    /// Reading or writing the state document failed
    #[error("state I/O error at {}", .path.display())]
    StateIo {
        /// State document path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The state document is not valid JSON of the expected shape
    #[error("invalid state document at {}", .path.display())]
    StateFormat {
        /// State document path
        path: PathBuf,
        /// Underlying parse error
        #[source]
        source: serde_json::Error,
    },

    /// A commit needed state data the plan did not provide
    #[error("no state data provided for {0}")]
    NoStateData(&'static str),
}

fn describe_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "terminated by signal".to_string(),
    }
}

impl Error {
    /// Get the category for this error.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::RequirementsNotMet { .. } => ErrorCategory::Precondition,
            Self::Spawn { .. } | Self::CommandFailed { .. } | Self::Action(_) => {
                ErrorCategory::Command
            }
            Self::SnapshotRoot { .. }
            | Self::SnapExists(_)
            | Self::OriginMissing(_)
            | Self::BackupMissing(_)
            | Self::SnapStep { .. } => ErrorCategory::Snapshot,
            Self::StateMissing(_)
            | Self::StateExists(_)
            | Self::StateIo { .. }
            | Self::StateFormat { .. }
            | Self::NoStateData(_) => ErrorCategory::State,
        }
    }

    /// Create an action error from any message.
    pub fn action(message: impl Into<String>) -> Self {
        Self::Action(message.into())
    }

    pub(crate) fn snap_step(path: impl Into<PathBuf>, source: Error) -> Self {
        Self::SnapStep {
            path: path.into(),
            source: Box::new(source),
        }
    }
}
