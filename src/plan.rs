//! Plan files: what install, update and uninstall do
//!
//! A plan is TOML (or JSON when the file ends in `.json`) with one optional
//! section per mode:
//!
//! ```toml
//! [install]
//! purpose = "Install Vixen environment"
//! state = { env_path = "/opt/vixen-env", exec_paths = ["/usr/bin/vxm"] }
//!
//! [[install.tasks]]
//! purpose = "Create environment"
//! program = "python3"
//! args = ["-m", "venv", "/opt/vixen-env"]
//! elevate = true
//!
//! [[install.tasks.requirements]]
//! purpose = "Check an existing installation"
//! path_absent = "/opt/vixen-env"
//! failure_details = "Vixen environment is already installed"
//! ```

use crate::paths;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use setupkit::{
    CommandAction, CommandLine, Executor, InstallState, Requirement, RunOptions, SetupMode, Task,
};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("plan has no [{0}] section")]
    MissingSection(SetupMode),

    #[error("task '{0}' must set exactly one of `run` or `program`")]
    AmbiguousAction(String),

    #[error("task '{0}' sets `args` without `program`")]
    StrayArgs(String),
}

// ============================================================================
// Plan Schema
// ============================================================================

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Plan {
    pub install: Option<Section>,
    pub update: Option<Section>,
    pub uninstall: Option<Section>,
}

/// Tasks run for one mode, and the state they leave behind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Section {
    pub purpose: String,

    #[serde(default)]
    pub tasks: Vec<TaskSpec>,

    /// Recorded on success; executables listed here are removed on rollback
    /// when they were not installed before
    pub state: Option<StateSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StateSpec {
    pub env_path: String,

    #[serde(default)]
    pub exec_paths: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskSpec {
    pub purpose: String,

    /// Shell script, run through `sh -c`
    pub run: Option<String>,

    pub program: Option<String>,

    #[serde(default)]
    pub args: Vec<String>,

    #[serde(default)]
    pub elevate: bool,

    #[serde(default)]
    pub show_output: bool,

    #[serde(default)]
    pub requirements: Vec<RequirementSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequirementSpec {
    pub purpose: String,

    #[serde(flatten)]
    pub check: Check,

    pub failure_details: Option<String>,
}

/// Predicate a requirement evaluates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Check {
    PathExists(String),
    PathAbsent(String),
    IsFile(String),
    IsDirectory(String),
    /// Shell command that must exit zero
    Command(String),
}

// ============================================================================
// Loading
// ============================================================================

impl Plan {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read plan {}", path.display()))?;
        let plan = Self::parse(&content, path)?;
        log::debug!("Loaded plan from {}", path.display());
        Ok(plan)
    }

    fn parse(content: &str, path: &Path) -> Result<Self> {
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        if is_json {
            serde_json::from_str(content)
                .with_context(|| format!("Invalid JSON plan {}", path.display()))
        } else {
            toml::from_str(content).with_context(|| format!("Invalid plan {}", path.display()))
        }
    }

    pub fn section(&self, mode: SetupMode) -> Result<&Section, PlanError> {
        let section = match mode {
            SetupMode::Install => &self.install,
            SetupMode::Update => &self.update,
            SetupMode::Uninstall => &self.uninstall,
        };
        section.as_ref().ok_or(PlanError::MissingSection(mode))
    }

    /// Sections present in the plan, in mode order
    pub fn sections(&self) -> impl Iterator<Item = (SetupMode, &Section)> {
        [
            (SetupMode::Install, &self.install),
            (SetupMode::Update, &self.update),
            (SetupMode::Uninstall, &self.uninstall),
        ]
        .into_iter()
        .filter_map(|(mode, section)| section.as_ref().map(|s| (mode, s)))
    }
}

// ============================================================================
// Conversion
// ============================================================================

impl Section {
    /// State to record, with paths expanded
    pub fn install_state(&self) -> Option<InstallState> {
        self.state.as_ref().map(|spec| {
            InstallState::new(
                expand_str(&spec.env_path),
                spec.exec_paths.iter().map(|p| expand_str(p)),
            )
        })
    }

    pub fn has_elevated_tasks(&self) -> bool {
        self.tasks.iter().any(|t| t.elevate)
    }

    pub fn build_tasks(&self, executor: &Arc<dyn Executor>) -> Result<Vec<Task>, PlanError> {
        self.tasks.iter().map(|t| t.to_task(executor)).collect()
    }
}

impl TaskSpec {
    fn command(&self) -> Result<CommandLine, PlanError> {
        match (&self.run, &self.program) {
            (Some(script), None) if self.args.is_empty() => Ok(CommandLine::shell(script.clone())),
            (Some(_), None) => Err(PlanError::StrayArgs(self.purpose.clone())),
            (None, Some(program)) => Ok(CommandLine::new(program.clone()).args(self.args.clone())),
            _ => Err(PlanError::AmbiguousAction(self.purpose.clone())),
        }
    }

    pub fn to_task(&self, executor: &Arc<dyn Executor>) -> Result<Task, PlanError> {
        let action = CommandAction::new(self.command()?)
            .elevated(self.elevate)
            .show_output(self.show_output);
        let requirements = self.requirements.iter().map(|r| r.to_requirement(executor));
        Ok(Task::new(self.purpose.clone(), action).requirements(requirements))
    }
}

impl RequirementSpec {
    pub fn to_requirement(&self, executor: &Arc<dyn Executor>) -> Requirement {
        let purpose = self.purpose.clone();
        let requirement = match &self.check {
            Check::PathExists(path) => Requirement::path_exists(purpose, paths::expand(path)),
            Check::PathAbsent(path) => Requirement::path_absent(purpose, paths::expand(path)),
            Check::IsFile(path) => {
                let path = paths::expand(path);
                Requirement::new(purpose, move || setupkit::path::is_file(&path))
            }
            Check::IsDirectory(path) => {
                let path = paths::expand(path);
                Requirement::new(purpose, move || setupkit::path::is_directory(&path))
            }
            Check::Command(script) => {
                let executor = Arc::clone(executor);
                let command = CommandLine::shell(script.clone());
                Requirement::new(purpose, move || {
                    executor.succeeds(&command, &RunOptions::default().silent())
                })
            }
        };

        match &self.failure_details {
            Some(detail) => requirement.with_failure_detail(detail.clone()),
            None => requirement,
        }
    }
}

fn expand_str(path: &str) -> String {
    paths::expand(path).to_string_lossy().into_owned()
}

// ============================================================================
// Tests
// ============================================================================
