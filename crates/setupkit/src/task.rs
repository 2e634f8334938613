//! Tasks and the actions they execute

use crate::error::{Error, Result};
use crate::exec::{CommandLine, Executor, RunOptions};
use crate::report::Reporter;
use crate::requirement::Requirement;
use std::fmt;

/// The unit of work a task performs.
///
/// Shell scripts, structured program invocations and in-process callbacks
/// are interchangeable behind this trait.
pub trait Action: fmt::Debug {
    /// Short human-readable form, used in plan listings and logs
    fn describe(&self) -> String;

    /// Perform the work; Ok iff it succeeded
    fn execute(&self, executor: &dyn Executor) -> Result<()>;
}

/// A command line run through the executor.
#[derive(Debug, Clone)]
pub struct CommandAction {
    command: CommandLine,
    options: RunOptions,
}

impl CommandAction {
    pub fn new(command: CommandLine) -> Self {
        Self {
            command,
            options: RunOptions::default(),
        }
    }

    /// A script run through `sh -c`
    pub fn shell(script: impl Into<String>) -> Self {
        Self::new(CommandLine::shell(script))
    }

    pub fn elevated(mut self, elevate: bool) -> Self {
        self.options.elevate = elevate;
        self
    }

    /// Inherit stdout as well as stderr
    pub fn show_output(mut self, show: bool) -> Self {
        self.options.quiet_stdout = !show;
        self
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }
}

impl Action for CommandAction {
    fn describe(&self) -> String {
        let prefix = if self.options.elevate { "[elevated] " } else { "" };
        format!("{prefix}{}", self.command)
    }

    fn execute(&self, executor: &dyn Executor) -> Result<()> {
        executor.run(&self.command, &self.options)
    }
}

/// An in-process callback.
pub struct FnAction<F> {
    label: String,
    callback: F,
}

impl<F> FnAction<F>
where
    F: Fn(&dyn Executor) -> Result<()>,
{
    pub fn new(label: impl Into<String>, callback: F) -> Self {
        Self {
            label: label.into(),
            callback,
        }
    }
}

impl<F> fmt::Debug for FnAction<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnAction")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

impl<F> Action for FnAction<F>
where
    F: Fn(&dyn Executor) -> Result<()>,
{
    fn describe(&self) -> String {
        self.label.clone()
    }

    fn execute(&self, executor: &dyn Executor) -> Result<()> {
        (self.callback)(executor)
    }
}

/// A named unit of work gated by requirements.
#[derive(Debug)]
pub struct Task {
    purpose: String,
    action: Box<dyn Action>,
    requirements: Vec<Requirement>,
    done: bool,
}

impl Task {
    pub fn new(purpose: impl Into<String>, action: impl Action + 'static) -> Self {
        Self::from_boxed(purpose, Box::new(action))
    }

    pub fn from_boxed(purpose: impl Into<String>, action: Box<dyn Action>) -> Self {
        Self {
            purpose: purpose.into(),
            action,
            requirements: Vec::new(),
            done: false,
        }
    }

    pub fn requirement(mut self, requirement: Requirement) -> Self {
        self.requirements.push(requirement);
        self
    }

    pub fn requirements(mut self, requirements: impl IntoIterator<Item = Requirement>) -> Self {
        self.requirements.extend(requirements);
        self
    }

    pub fn purpose(&self) -> &str {
        &self.purpose
    }

    pub fn action(&self) -> &dyn Action {
        self.action.as_ref()
    }

    pub fn requirement_list(&self) -> &[Requirement] {
        &self.requirements
    }

    /// Whether the action ran and succeeded
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Check every requirement, then run the action if all hold
    ///
    /// All requirements are evaluated even after one fails so every failed
    /// check is reported. When any fails the action is never executed.
    pub fn run(&mut self, executor: &dyn Executor, reporter: &mut dyn Reporter) -> Result<()> {
        let unmet: Vec<String> = self
            .requirements
            .iter()
            .filter(|req| !req.is_satisfied(reporter))
            .map(|req| req.purpose().to_string())
            .collect();

        if !unmet.is_empty() {
            return Err(Error::RequirementsNotMet {
                task: self.purpose.clone(),
                unmet,
            });
        }

        log::info!("running task '{}': {}", self.purpose, self.action.describe());
        let result = self.action.execute(executor);
        self.done = result.is_ok();
        reporter.check(&self.purpose, self.done);

        if let Err(err) = &result {
            log::warn!("task '{}' failed: {err}", self.purpose);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::SystemExecutor;
    use crate::report::{Diagnostic, Transcript};
    use std::cell::Cell;
    use std::rc::Rc;

    fn counting_action(counter: Rc<Cell<u32>>, ok: bool) -> impl Action {
        FnAction::new("count", move |_: &dyn Executor| {
            counter.set(counter.get() + 1);
            if ok { Ok(()) } else { Err(Error::action("boom")) }
        })
    }

    #[test]
    fn test_run_without_requirements() {
        let counter = Rc::new(Cell::new(0));
        let mut task = Task::new("Install", counting_action(counter.clone(), true));
        let mut transcript = Transcript::new();

        task.run(&SystemExecutor::default(), &mut transcript).unwrap();
        assert!(task.is_done());
        assert_eq!(counter.get(), 1);
        assert_eq!(transcript.check_result("Install"), Some(true));
    }

    #[test]
    fn test_failing_action_is_not_done() {
        let counter = Rc::new(Cell::new(0));
        let mut task = Task::new("Install", counting_action(counter.clone(), false));
        let mut transcript = Transcript::new();

        let err = task
            .run(&SystemExecutor::default(), &mut transcript)
            .unwrap_err();
        assert!(matches!(err, Error::Action(_)));
        assert!(!task.is_done());
        assert_eq!(transcript.check_result("Install"), Some(false));
    }

    #[test]
    fn test_unmet_requirement_blocks_action() {
        let counter = Rc::new(Cell::new(0));
        let evaluated = Rc::new(Cell::new(0));
        let (e1, e2) = (evaluated.clone(), evaluated.clone());

        let mut task = Task::new("Create env", counting_action(counter.clone(), true))
            .requirement(Requirement::new("R1", move || {
                e1.set(e1.get() + 1);
                true
            }))
            .requirement(Requirement::new("R2", move || {
                e2.set(e2.get() + 1);
                false
            }));
        let mut transcript = Transcript::new();

        let err = task
            .run(&SystemExecutor::default(), &mut transcript)
            .unwrap_err();
        match err {
            Error::RequirementsNotMet { task, unmet } => {
                assert_eq!(task, "Create env");
                assert_eq!(unmet, vec!["R2".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(counter.get(), 0);
        assert_eq!(evaluated.get(), 2);
        assert!(!task.is_done());
        // No check line for the task itself
        assert!(!transcript.has_check("Create env"));
    }

    #[test]
    fn test_all_requirements_evaluated_after_failure() {
        let evaluated = Rc::new(Cell::new(0));
        let (e1, e2) = (evaluated.clone(), evaluated.clone());
        let mut task = Task::new("T", FnAction::new("noop", |_: &dyn Executor| Ok(())))
            .requirements([
                Requirement::new("first", move || {
                    e1.set(e1.get() + 1);
                    false
                }),
                Requirement::new("second", move || {
                    e2.set(e2.get() + 1);
                    false
                }),
            ]);
        let mut transcript = Transcript::new();

        let err = task
            .run(&SystemExecutor::default(), &mut transcript)
            .unwrap_err();
        assert_eq!(evaluated.get(), 2);
        assert!(err.to_string().contains("first, second"));
        let details = transcript
            .entries
            .iter()
            .filter(|e| matches!(e, Diagnostic::FailureDetail { .. }))
            .count();
        assert_eq!(details, 2);
    }

    #[test]
    fn test_command_action() {
        let executor = SystemExecutor::default();
        let mut transcript = Transcript::new();

        let mut ok = Task::new("ok", CommandAction::shell("exit 0"));
        ok.run(&executor, &mut transcript).unwrap();
        assert!(ok.is_done());

        let mut fail = Task::new("fail", CommandAction::shell("exit 1"));
        let err = fail.run(&executor, &mut transcript).unwrap_err();
        assert!(matches!(err, Error::CommandFailed { code: Some(1), .. }));
    }

    #[test]
    fn test_command_action_describe() {
        let action = CommandAction::new(CommandLine::new("python").args(["-m", "venv", "/opt/x"]))
            .elevated(true);
        assert_eq!(action.describe(), "[elevated] python -m venv /opt/x");
        assert!(action.options().elevate);

        let action = CommandAction::shell("echo hi").show_output(true);
        assert!(!action.options().quiet_stdout);
    }
}
