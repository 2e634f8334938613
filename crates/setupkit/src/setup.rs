//! Ordered task runner with snapshot rollback
//!
//! A [`Setup`] moves through `Initializing -> Running -> {Success | Failed}`:
//!
//! 1. **Initializing**: the [`StateSession`] checks and loads the state
//!    document and snapshots the installed paths.
//! 2. **Running**: tasks execute in order; the first failure stops the run.
//! 3. **Finalizing** (exactly once): a failed run that completed at least one
//!    task is rolled back from the snapshot; a successful one commits the new
//!    state. The snapshot is always discarded last.

use crate::error::Error;
use crate::exec::Executor;
use crate::report::Reporter;
use crate::session::{StateSession, purpose};
use crate::task::Task;
use std::fmt;
use std::sync::Arc;

/// Where a run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Initializing,
    Running,
    Finalizing,
    Success,
    Failed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Initializing => "initializing",
            Self::Running => "running",
            Self::Finalizing => "finalizing",
            Self::Success => "success",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Per-task outcome in a [`SetupReport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskStatus {
    pub purpose: String,
    pub done: bool,
}

/// Result of [`Setup::process`].
#[derive(Debug)]
pub struct SetupReport {
    pub purpose: String,
    /// `Success` or `Failed`
    pub phase: Phase,
    /// Phase in which the run failed
    pub failed_in: Option<Phase>,
    /// First error that made the run fail
    pub error: Option<Error>,
    pub tasks: Vec<TaskStatus>,
    /// Whether a snapshot restore was attempted; never set without a snapshot
    pub restored: bool,
    /// Error from a restore attempt
    pub restore_error: Option<Error>,
    /// Error from discarding the snapshot
    pub cleanup_error: Option<Error>,
}

impl SetupReport {
    pub fn is_success(&self) -> bool {
        self.phase == Phase::Success
    }

    /// Process exit status: 0 on success, 1 on any failure
    pub fn exit_code(&self) -> i32 {
        if self.is_success() { 0 } else { 1 }
    }

    /// Purposes of the tasks that ran to completion, in order
    pub fn completed(&self) -> Vec<&str> {
        self.tasks
            .iter()
            .filter(|t| t.done)
            .map(|t| t.purpose.as_str())
            .collect()
    }
}

/// An ordered list of tasks bound to a state session.
pub struct Setup {
    purpose: String,
    tasks: Vec<Task>,
    session: StateSession,
    executor: Arc<dyn Executor>,
}

impl Setup {
    pub fn new(
        purpose: impl Into<String>,
        session: StateSession,
        executor: Arc<dyn Executor>,
    ) -> Self {
        Self {
            purpose: purpose.into(),
            tasks: Vec::new(),
            session,
            executor,
        }
    }

    pub fn task(mut self, task: Task) -> Self {
        self.tasks.push(task);
        self
    }

    pub fn tasks(mut self, tasks: impl IntoIterator<Item = Task>) -> Self {
        self.tasks.extend(tasks);
        self
    }

    pub fn purpose(&self) -> &str {
        &self.purpose
    }

    /// Drive the run to completion and finalize it
    pub fn process(mut self, reporter: &mut dyn Reporter) -> SetupReport {
        reporter.title(&self.purpose);
        log::info!(
            "{}: {} task(s), mode {}",
            self.purpose,
            self.tasks.len(),
            self.session.mode()
        );

        let mut phase = Phase::Initializing;
        let mut completed = Vec::new();
        let failure = match self.initialize(reporter) {
            Err(err) => Some(err),
            Ok(()) => {
                phase = Phase::Running;
                self.run_tasks(&mut completed, reporter).err()
            }
        };

        self.finalize(phase, &completed, failure, reporter)
    }

    fn initialize(&mut self, reporter: &mut dyn Reporter) -> Result<(), Error> {
        self.session.init(reporter)?;
        self.session.create_snapshot(reporter)
    }

    /// Run tasks in order, pushing the index of each finished one
    fn run_tasks(
        &mut self,
        completed: &mut Vec<usize>,
        reporter: &mut dyn Reporter,
    ) -> Result<(), Error> {
        for (index, task) in self.tasks.iter_mut().enumerate() {
            task.run(self.executor.as_ref(), reporter)?;
            completed.push(index);
        }
        Ok(())
    }

    fn finalize(
        mut self,
        reached: Phase,
        completed: &[usize],
        failure: Option<Error>,
        reporter: &mut dyn Reporter,
    ) -> SetupReport {
        log::debug!("completed tasks: {completed:?}");
        let mut failed_in = failure.as_ref().map(|_| reached);
        let mut error = failure;

        let mut restored = false;
        let mut restore_error = None;

        if error.is_some() {
            if !completed.is_empty() {
                match self.session.restore(reporter) {
                    Ok(snapshot_restored) => restored = snapshot_restored,
                    Err(err) => {
                        restored = true;
                        restore_error = Some(err);
                    }
                }
            } else {
                log::debug!("no task completed, nothing to roll back");
            }
        } else if let Err(err) = self.session.commit(reporter) {
            log::error!("failed to record state: {err}");
            failed_in = Some(Phase::Finalizing);
            error = Some(err);
        }

        let cleanup_error = self.session.remove_snapshot(reporter).err();

        let phase = if error.is_none() { Phase::Success } else { Phase::Failed };
        reporter.check(purpose::EXECUTION, phase == Phase::Success);
        match &error {
            None => log::info!("{} finished", self.purpose),
            Some(err) => log::error!("{} failed: {err}", self.purpose),
        }

        SetupReport {
            purpose: self.purpose,
            phase,
            failed_in,
            error,
            tasks: self
                .tasks
                .iter()
                .map(|t| TaskStatus {
                    purpose: t.purpose().to_string(),
                    done: t.is_done(),
                })
                .collect(),
            restored,
            restore_error,
            cleanup_error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::SystemExecutor;
    use crate::path::FileSystem;
    use crate::report::Transcript;
    use crate::requirement::Requirement;
    use crate::session::{SetupConfig, SetupMode};
    use crate::state::{InstallState, StateStore};
    use crate::task::{CommandAction, FnAction};
    use std::cell::RefCell;
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::rc::Rc;
    use tempfile::TempDir;

    struct Env {
        tmp: TempDir,
        config: SetupConfig,
        executor: Arc<dyn Executor>,
    }

    impl Env {
        fn new() -> Self {
            let tmp = TempDir::new().unwrap();
            let config = SetupConfig {
                state_file: tmp.path().join("var").join("package_status.json"),
                snapshot_dir: tmp.path().join("var").join("snapshots"),
            };
            Self {
                tmp,
                config,
                executor: Arc::new(SystemExecutor::default()),
            }
        }

        fn root(&self) -> &Path {
            self.tmp.path()
        }

        fn store(&self) -> StateStore {
            StateStore::new(&self.config.state_file)
        }

        fn setup(&self, mode: SetupMode, new_state: Option<InstallState>) -> Setup {
            let fs = FileSystem::new(self.executor.clone(), false);
            let session = StateSession::new(mode, &self.config, new_state, fs);
            Setup::new(format!("Test {mode}"), session, self.executor.clone())
        }

        fn env_path(&self) -> PathBuf {
            self.root().join("opt").join("vixen-env")
        }

        fn exec_path(&self) -> PathBuf {
            self.root().join("bin").join("vxm")
        }

        /// Lay down a v1 install and its state document
        fn install_v1(&self) -> InstallState {
            fs::create_dir_all(self.env_path()).unwrap();
            fs::write(self.env_path().join("VERSION"), "1").unwrap();
            fs::create_dir_all(self.root().join("bin")).unwrap();
            fs::write(self.exec_path(), "#!/bin/sh\necho v1\n").unwrap();

            let state = InstallState::new(
                self.env_path().to_string_lossy(),
                [self.exec_path().to_string_lossy().into_owned()],
            );
            self.store().create(&state).unwrap();
            state
        }

        fn snapshot_count(&self) -> usize {
            fs::read_dir(&self.config.snapshot_dir)
                .map(|entries| entries.count())
                .unwrap_or(0)
        }
    }

    type Log = Rc<RefCell<Vec<String>>>;

    fn recording(name: &str, log: &Log, ok: bool) -> Task {
        let log = log.clone();
        let label = name.to_string();
        Task::new(
            name,
            FnAction::new(name, move |_: &dyn Executor| {
                log.borrow_mut().push(label.clone());
                if ok {
                    Ok(())
                } else {
                    Err(Error::action(format!("{label} failed")))
                }
            }),
        )
    }

    #[test]
    fn test_failure_stops_remaining_tasks() {
        let env = Env::new();
        let log: Log = Rc::default();
        let mut transcript = Transcript::new();

        let report = env
            .setup(
                SetupMode::Install,
                Some(InstallState::new("/opt/x", ["/usr/bin/x"])),
            )
            .task(recording("T1", &log, true))
            .task(recording("T2", &log, true))
            .task(recording("T3", &log, false))
            .task(recording("T4", &log, true))
            .process(&mut transcript);

        assert_eq!(*log.borrow(), vec!["T1", "T2", "T3"]);
        assert_eq!(report.completed(), vec!["T1", "T2"]);
        assert!(!report.tasks[2].done);
        assert!(!report.tasks[3].done);
        assert_eq!(report.failed_in, Some(Phase::Running));
        assert_eq!(report.exit_code(), 1);
        assert!(!env.store().exists());
    }

    #[test]
    fn test_unmet_requirement_fails_task() {
        let env = Env::new();
        let log: Log = Rc::default();
        let mut transcript = Transcript::new();

        let task = recording("Gated", &log, true)
            .requirement(Requirement::new("R1", || true))
            .requirement(Requirement::new("R2", || false));
        let report = env
            .setup(SetupMode::Install, Some(InstallState::new("/opt/x", ["/usr/bin/x"])))
            .task(task)
            .process(&mut transcript);

        assert!(log.borrow().is_empty());
        assert!(matches!(report.error, Some(Error::RequirementsNotMet { .. })));
        assert_eq!(report.exit_code(), 1);
    }

    #[test]
    fn test_fresh_install_creates_state() {
        let env = Env::new();
        let log: Log = Rc::default();
        let mut transcript = Transcript::new();
        let state = InstallState::new(
            env.env_path().to_string_lossy(),
            [env.exec_path().to_string_lossy().into_owned()],
        );

        let report = env
            .setup(SetupMode::Install, Some(state.clone()))
            .tasks([
                recording("Create env", &log, true),
                recording("Install packages", &log, true),
                recording("Link executable", &log, true),
            ])
            .process(&mut transcript);

        assert!(report.is_success());
        assert_eq!(report.exit_code(), 0);
        assert_eq!(log.borrow().len(), 3);
        assert_eq!(env.store().read().unwrap(), Some(state));
        assert!(!report.restored);
        assert_eq!(transcript.check_result(purpose::CHECK_STATE_ABSENT), Some(true));
        assert!(transcript.has_note(purpose::CREATE_SNAPSHOT, "skipped"));
        assert!(transcript.has_note(purpose::REMOVE_SNAPSHOT, "no snapshot"));
        assert_eq!(transcript.check_result(purpose::UPDATE_STATE), Some(true));
        assert_eq!(transcript.check_result(purpose::EXECUTION), Some(true));
    }

    #[test]
    fn test_failed_update_restores_snapshot() {
        let env = Env::new();
        let installed = env.install_v1();
        let state_before = fs::read_to_string(&env.config.state_file).unwrap();
        let mut transcript = Transcript::new();

        let env_path = env.env_path();
        let replace = FnAction::new("replace env", move |_: &dyn Executor| {
            fs::remove_dir_all(&env_path).unwrap();
            fs::create_dir_all(&env_path).unwrap();
            fs::write(env_path.join("VERSION"), "2").unwrap();
            Ok(())
        });

        let report = env
            .setup(
                SetupMode::Update,
                Some(InstallState::new(installed.env_path.clone(), Vec::<String>::new())),
            )
            .task(Task::new("Replace environment", replace))
            .task(Task::new("Broken step", CommandAction::shell("exit 3")))
            .process(&mut transcript);

        assert_eq!(report.exit_code(), 1);
        assert!(report.restored);
        assert!(report.restore_error.is_none());
        assert_eq!(
            fs::read_to_string(env.env_path().join("VERSION")).unwrap(),
            "1"
        );
        assert_eq!(
            fs::read_to_string(&env.config.state_file).unwrap(),
            state_before
        );
        assert_eq!(transcript.check_result(purpose::RESTORE_SNAPSHOT), Some(true));
        assert_eq!(transcript.check_result(purpose::REMOVE_SNAPSHOT), Some(true));
        assert_eq!(transcript.check_result(purpose::EXECUTION), Some(false));
        assert_eq!(env.snapshot_count(), 0);
    }

    #[test]
    fn test_install_blocked_by_existing_path() {
        let env = Env::new();
        fs::create_dir_all(env.env_path()).unwrap();
        let log: Log = Rc::default();
        let mut transcript = Transcript::new();

        let task = recording("Create env", &log, true).requirement(
            Requirement::path_absent("Check an existing installation", env.env_path())
                .with_failure_detail("Environment is already installed"),
        );
        let report = env
            .setup(SetupMode::Install, Some(InstallState::new("/opt/x", ["/usr/bin/x"])))
            .task(task)
            .process(&mut transcript);

        assert!(log.borrow().is_empty());
        assert!(!report.restored);
        assert!(report.completed().is_empty());
        assert_eq!(report.exit_code(), 1);
        assert!(!env.store().exists());
    }

    #[test]
    fn test_no_restore_without_completed_task() {
        let env = Env::new();
        env.install_v1();
        let log: Log = Rc::default();
        let mut transcript = Transcript::new();

        let report = env
            .setup(SetupMode::Update, None)
            .task(recording("First", &log, false))
            .process(&mut transcript);

        assert!(!report.restored);
        assert!(!transcript.has_check(purpose::RESTORE_SNAPSHOT));
        // Snapshot was taken and is still discarded
        assert_eq!(transcript.check_result(purpose::CREATE_SNAPSHOT), Some(true));
        assert_eq!(transcript.check_result(purpose::REMOVE_SNAPSHOT), Some(true));
        assert_eq!(env.snapshot_count(), 0);
    }

    #[test]
    fn test_update_without_state_runs_nothing() {
        let env = Env::new();
        let log: Log = Rc::default();
        let mut transcript = Transcript::new();

        let report = env
            .setup(SetupMode::Update, None)
            .task(recording("Never", &log, true))
            .process(&mut transcript);

        assert!(log.borrow().is_empty());
        assert_eq!(report.failed_in, Some(Phase::Initializing));
        assert!(matches!(report.error, Some(Error::StateMissing(_))));
        assert_eq!(transcript.check_result(purpose::CHECK_STATE_PRESENT), Some(false));
        assert!(transcript.has_note(purpose::REMOVE_SNAPSHOT, "no snapshot"));
    }

    #[test]
    fn test_successful_update_merges_state() {
        let env = Env::new();
        let installed = env.install_v1();
        let helper = env.root().join("bin").join("vxm-helper");
        let helper_str = helper.to_string_lossy().into_owned();
        let log: Log = Rc::default();
        let mut transcript = Transcript::new();

        let report = env
            .setup(
                SetupMode::Update,
                Some(InstallState::new(installed.env_path.clone(), [helper_str.clone()])),
            )
            .task(recording("Upgrade", &log, true))
            .process(&mut transcript);

        assert!(report.is_success());
        let state = env.store().read().unwrap().unwrap();
        assert_eq!(
            state.exec_paths,
            vec![installed.exec_paths[0].clone(), helper_str]
        );
        assert_eq!(env.snapshot_count(), 0);
    }

    #[test]
    fn test_failed_update_removes_new_executables() {
        let env = Env::new();
        let installed = env.install_v1();
        let helper = env.root().join("bin").join("vxm-helper");
        let mut transcript = Transcript::new();

        let target = helper.clone();
        let link = FnAction::new("link helper", move |_: &dyn Executor| {
            fs::write(&target, "helper").unwrap();
            Ok(())
        });
        let report = env
            .setup(
                SetupMode::Update,
                Some(InstallState::new(
                    installed.env_path.clone(),
                    [helper.to_string_lossy().into_owned()],
                )),
            )
            .task(Task::new("Link helper", link))
            .task(Task::new("Fail", CommandAction::shell("false")))
            .process(&mut transcript);

        assert_eq!(report.exit_code(), 1);
        assert!(!helper.exists());
        assert!(env.exec_path().exists());
        assert_eq!(
            env.store().read().unwrap().unwrap().exec_paths,
            installed.exec_paths
        );
    }

    #[test]
    fn test_uninstall_removes_state() {
        let env = Env::new();
        env.install_v1();
        let mut transcript = Transcript::new();

        let env_path = env.env_path();
        let report = env
            .setup(SetupMode::Uninstall, None)
            .task(Task::new(
                "Remove environment",
                FnAction::new("rm env", move |_: &dyn Executor| {
                    fs::remove_dir_all(&env_path).unwrap();
                    Ok(())
                }),
            ))
            .process(&mut transcript);

        assert!(report.is_success());
        assert!(!env.store().exists());
        assert!(!env.env_path().exists());
        assert_eq!(env.snapshot_count(), 0);
    }

    #[test]
    fn test_failed_install_is_not_reported_as_restored() {
        let env = Env::new();
        let log: Log = Rc::default();
        let mut transcript = Transcript::new();

        let report = env
            .setup(SetupMode::Install, Some(InstallState::new("/opt/x", ["/usr/bin/x"])))
            .task(recording("Create env", &log, true))
            .task(Task::new("Broken step", CommandAction::shell("false")))
            .process(&mut transcript);

        assert_eq!(report.completed(), vec!["Create env"]);
        assert!(!report.restored);
        assert!(report.restore_error.is_none());
        assert!(transcript.has_note(purpose::RESTORE_SNAPSHOT, "no snapshot"));
        assert!(!transcript.has_check(purpose::RESTORE_SNAPSHOT));
        assert!(!env.config.snapshot_dir.exists());
        assert_eq!(report.exit_code(), 1);
    }

    #[test]
    fn test_install_without_state_data_fails_commit() {
        let env = Env::new();
        let log: Log = Rc::default();
        let mut transcript = Transcript::new();

        let report = env
            .setup(SetupMode::Install, None)
            .task(recording("Only", &log, true))
            .process(&mut transcript);

        assert_eq!(report.exit_code(), 1);
        assert!(matches!(report.error, Some(Error::NoStateData(_))));
        assert!(!report.restored);
        assert_eq!(report.failed_in, Some(Phase::Finalizing));
        assert_eq!(transcript.check_result(purpose::UPDATE_STATE), Some(false));
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(Phase::Initializing.to_string(), "initializing");
        assert_eq!(Phase::Failed.to_string(), "failed");
    }
}
