//! Process execution
//!
//! Every filesystem mutation and every shell-level task goes through an
//! [`Executor`]. The system implementation spawns real processes; tests and
//! embedders can substitute their own.

use crate::error::{Error, Result};
use std::fmt;
use std::process::{Command, Stdio};

/// A program invocation: program name plus arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    program: String,
    args: Vec<String>,
}

impl CommandLine {
    /// Create an invocation of `program` with no arguments
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Run `script` through `sh -c`
    pub fn shell(script: impl Into<String>) -> Self {
        Self::new("sh").arg("-c").arg(script)
    }

    /// Append one argument
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    /// Prepend an elevation prefix such as `["sudo"]`
    fn elevated(&self, prefix: &[String]) -> Self {
        let Some((program, rest)) = prefix.split_first() else {
            return self.clone();
        };
        let mut args = rest.to_vec();
        args.push(self.program.clone());
        args.extend(self.args.iter().cloned());
        Self {
            program: program.clone(),
            args,
        }
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " {arg:?}")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// How a single invocation treats its output streams and privileges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Discard the child's stdout
    pub quiet_stdout: bool,
    /// Discard the child's stderr
    pub quiet_stderr: bool,
    /// Run with the executor's elevation prefix
    pub elevate: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            quiet_stdout: true,
            quiet_stderr: false,
            elevate: false,
        }
    }
}

impl RunOptions {
    /// Default stream handling, elevated
    pub fn elevated() -> Self {
        Self {
            elevate: true,
            ..Self::default()
        }
    }

    /// Inherit both output streams
    pub fn verbose(mut self) -> Self {
        self.quiet_stdout = false;
        self.quiet_stderr = false;
        self
    }

    /// Discard both output streams
    pub fn silent(mut self) -> Self {
        self.quiet_stdout = true;
        self.quiet_stderr = true;
        self
    }
}

/// Privilege elevation convention.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Elevation {
    /// Elevation requests are ignored (already privileged, or tests)
    #[default]
    Disabled,
    /// Prepend these words to elevated commands, e.g. `["sudo"]`
    Prefix(Vec<String>),
}

impl Elevation {
    /// The conventional `sudo` prefix
    pub fn sudo() -> Self {
        Self::Prefix(vec!["sudo".to_string()])
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::Prefix(prefix) if !prefix.is_empty())
    }
}

/// Runs external commands.
///
/// A single invocation is final: implementations never retry.
pub trait Executor: Send + Sync {
    /// Run `command`; Ok iff it exited with status zero
    fn run(&self, command: &CommandLine, options: &RunOptions) -> Result<()>;

    /// Run and collapse the outcome to success/failure
    fn succeeds(&self, command: &CommandLine, options: &RunOptions) -> bool {
        self.run(command, options).is_ok()
    }
}

/// Executor that spawns real processes.
#[derive(Debug, Clone, Default)]
pub struct SystemExecutor {
    elevation: Elevation,
}

impl SystemExecutor {
    pub fn new(elevation: Elevation) -> Self {
        Self { elevation }
    }

    pub fn elevation(&self) -> &Elevation {
        &self.elevation
    }

    fn resolve(&self, command: &CommandLine, options: &RunOptions) -> CommandLine {
        match &self.elevation {
            Elevation::Prefix(prefix) if options.elevate => command.elevated(prefix),
            _ => command.clone(),
        }
    }
}

fn stdio(quiet: bool) -> Stdio {
    if quiet { Stdio::null() } else { Stdio::inherit() }
}

impl Executor for SystemExecutor {
    fn run(&self, command: &CommandLine, options: &RunOptions) -> Result<()> {
        let command = self.resolve(command, options);
        log::debug!("exec: {command}");

        let status = Command::new(command.program())
            .args(command.arguments())
            .stdin(Stdio::inherit())
            .stdout(stdio(options.quiet_stdout))
            .stderr(stdio(options.quiet_stderr))
            .status()
            .map_err(|source| Error::Spawn {
                command: command.to_string(),
                source,
            })?;

        if status.success() {
            Ok(())
        } else {
            log::debug!("exec failed ({status}): {command}");
            Err(Error::CommandFailed {
                command: command.to_string(),
                code: status.code(),
            })
        }
    }
}
