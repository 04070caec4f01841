//! External command execution.
//!
//! Runs one program to completion and hands back its exit code and captured
//! output as a value. A non-zero exit is not an error at this layer; callers
//! decide via [`CommandOutput::check`]. Only a process that could not be
//! started (or that outlived its timeout) is reported as [`CommandError`].

use crate::bundler::error::CommandError;
use std::{
    ffi::{OsStr, OsString},
    fmt,
    path::{Path, PathBuf},
    process::Stdio,
    time::Duration,
};

/// A fully specified external command.
#[derive(Clone, Debug)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<OsString>,
    capture_output: bool,
    timeout: Option<Duration>,
}

impl ToolCommand {
    /// Creates a command for `program` that captures its output.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            capture_output: true,
            timeout: None,
        }
    }

    /// Appends one argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// Appends several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// Whether stdout/stderr are captured (default) or inherited from the caller.
    pub fn capture_output(mut self, capture: bool) -> Self {
        self.capture_output = capture;
        self
    }

    /// Kill the process if it runs longer than `timeout`.
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Program to execute.
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Arguments passed to the program.
    pub fn get_args(&self) -> &[OsString] {
        &self.args
    }

    /// Returns `true` if `flag` appears verbatim among the arguments.
    pub fn has_arg(&self, flag: &str) -> bool {
        self.args.iter().any(|a| a == flag)
    }

    /// Value following `flag`, if present.
    pub fn arg_value(&self, flag: &str) -> Option<&OsStr> {
        self.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| self.args.get(i + 1))
            .map(OsString::as_os_str)
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Exit status and captured output of a finished command.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    /// Captured stdout followed by stderr. Empty when output was not captured.
    pub output: String,
}

impl CommandOutput {
    /// Returns `true` when the process exited with code zero.
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Converts an unsuccessful exit into [`CommandError::NonZeroExit`].
    pub fn check(self, command: &ToolCommand) -> Result<Self, CommandError> {
        if self.success() {
            Ok(self)
        } else {
            Err(CommandError::NonZeroExit {
                command: command.to_string(),
                code: self.exit_code,
                output: self.output,
            })
        }
    }
}

/// Executes external commands.
///
/// The bundler is generic over this trait so tests can observe and script
/// invocations without spawning processes.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Runs `command` to completion.
    async fn run(&self, command: &ToolCommand) -> Result<CommandOutput, CommandError>;
}

/// Runs commands as real child processes via `tokio::process`.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    async fn run(&self, command: &ToolCommand) -> Result<CommandOutput, CommandError> {
        log::debug!("Running: {}", command);

        let mut cmd = tokio::process::Command::new(command.program());
        cmd.args(command.get_args())
            .stdin(Stdio::null())
            .kill_on_drop(true);
        if command.capture_output {
            cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        } else {
            cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        }

        let spawn_error = |error| CommandError::Spawn {
            command: command.to_string(),
            error,
        };

        let output = match command.timeout {
            Some(limit) => tokio::time::timeout(limit, cmd.output())
                .await
                .map_err(|_| CommandError::TimedOut {
                    command: command.to_string(),
                    timeout: limit,
                })?
                .map_err(spawn_error)?,
            None => cmd.output().await.map_err(spawn_error)?,
        };

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        log::debug!(
            "{} exited with {:?}",
            command.program().display(),
            output.status.code()
        );

        Ok(CommandOutput {
            exit_code: output.status.code(),
            output: combined,
        })
    }
}
