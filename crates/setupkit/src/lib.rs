//! # Setupkit
//!
//! Ordered, gated installation runs with snapshot-based rollback.
//!
//! ## Core Concepts
//!
//! - **Task**: a named [`Action`] gated by [`Requirement`]s
//! - **Setup**: runs tasks in order, stopping at the first failure
//! - **StateSession**: loads the install state document, snapshots the
//!   installed paths and either commits or rolls back at the end
//! - **Snapshot**: timestamped copies of a set of paths that can be restored
//! - **Executor**: runs external commands, optionally behind an elevation prefix
//! - **Reporter**: receives one diagnostic per check
//!
//! ## Example
//!
//! ```ignore
//! use setupkit::{
//!     CommandAction, FileSystem, InstallState, Requirement, Setup, SetupConfig,
//!     SetupMode, StateSession, SystemExecutor, Task, NoReport,
//! };
//! use std::sync::Arc;
//!
//! let executor = Arc::new(SystemExecutor::default());
//! let state = InstallState::new("/opt/vixen-env", ["/usr/bin/vxm"]);
//! let session = StateSession::new(
//!     SetupMode::Install,
//!     &SetupConfig::default(),
//!     Some(state),
//!     FileSystem::new(executor.clone(), true),
//! );
//!
//! let report = Setup::new("Install Vixen", session, executor)
//!     .task(
//!         Task::new(
//!             "Create environment",
//!             CommandAction::shell("python3 -m venv /opt/vixen-env"),
//!         )
//!         .requirement(Requirement::path_absent(
//!             "Check an existing installation",
//!             "/opt/vixen-env",
//!         )),
//!     )
//!     .process(&mut NoReport);
//!
//! std::process::exit(report.exit_code());
//! ```

pub mod error;
pub mod exec;
pub mod path;
pub mod report;
pub mod requirement;
pub mod session;
pub mod setup;
pub mod snapshot;
pub mod state;
pub mod task;

pub use error::{Error, ErrorCategory, Result};
pub use exec::{CommandLine, Elevation, Executor, RunOptions, SystemExecutor};
pub use path::{EntryKind, FileSystem, PathEntry};
pub use report::{Diagnostic, NoReport, Reporter, Transcript};
pub use requirement::Requirement;
pub use session::{SetupConfig, SetupMode, StateSession};
pub use setup::{Phase, Setup, SetupReport, TaskStatus};
pub use snapshot::{Snap, Snapshot, SnapshotState};
pub use state::{DocumentStore, InstallState, JsonFileStore, StateStore};
pub use task::{Action, CommandAction, FnAction, Task};
