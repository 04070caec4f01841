//! Error types for DMG packaging.
//!
//! Errors fall into three classes that map onto the pipeline stages:
//!
//! - [`ConfigError`]: the packaging configuration is missing or invalid.
//!   Raised by `initialize` before anything touches the filesystem.
//! - [`Error::Fs`]: a staging copy could not read its source or write its
//!   destination.
//! - [`CommandError`]: `hdiutil` could not be launched, exited non-zero,
//!   timed out, or left no image behind.
//!
//! The generator wraps whatever fails in [`Error::Package`] so callers see
//! the originating [`Stage`] next to the underlying cause.
//!
//! # Example
//!
//! ```no_run
//! use kodegen_bundler_dmg::bundler::{ErrorKind, InstallManifest, PackageGenerator};
//! use kodegen_bundler_dmg::bundler::platform::macos::DragNDropGenerator;
//! # use kodegen_bundler_dmg::bundler::GeneratorConfig;
//!
//! # async fn example(config: GeneratorConfig, manifest: InstallManifest) {
//! let mut generator = DragNDropGenerator::new();
//! let settings = generator.initialize(&config).expect("valid configuration");
//!
//! match generator.package_files(&settings, &manifest).await {
//!     Ok(artifact) => println!("created {}", artifact.path.display()),
//!     Err(e) if e.kind() == ErrorKind::Command => {
//!         eprintln!("hdiutil failed: {}", e.command_output().unwrap_or_default());
//!     }
//!     Err(e) => eprintln!("{e}"),
//! }
//! # }
//! ```

use std::{
    fmt::{self, Display},
    io, path,
    path::PathBuf,
    time::Duration,
};
use thiserror::Error as DeriveError;

/// Pipeline stage an error originated from.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Stage {
    /// Resolving driver configuration.
    Initialize,
    /// Copying manifest entries into the staging directory.
    Staging,
    /// Running the disk-image utility.
    Building,
}

impl Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Initialize => "initialize",
            Stage::Staging => "staging",
            Stage::Building => "building",
        };
        f.write_str(name)
    }
}

/// Coarse classification of an [`Error`], independent of context wrapping.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// Configuration was missing or invalid.
    Config,
    /// A filesystem operation failed.
    Io,
    /// The external disk-image utility failed.
    Command,
    /// Anything else (internal invariants, context-free messages).
    Other,
}

/// Errors returned by the bundler.
#[derive(Debug, DeriveError)]
#[non_exhaustive]
pub enum Error {
    /// Failure surfaced by a generator, tagged with the stage that produced it.
    #[error("{stage} stage failed: {source}")]
    Package {
        /// Stage the failure originated from
        stage: Stage,
        /// The underlying error
        source: Box<Self>,
    },

    /// Error with context. Created by the [`Context`] trait.
    #[error("{0}: {1}")]
    Context(String, Box<Self>),

    /// Invalid or incomplete packaging configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// External command failure.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// File system error with path context.
    ///
    /// Created by the [`ErrorExt`] trait's `fs_context` method.
    #[error("{context} {path}: {error}")]
    Fs {
        /// Context describing the operation (e.g., "copying staged file")
        context: &'static str,
        /// Path that was being accessed
        path: PathBuf,
        /// The underlying I/O error
        error: io::Error,
    },

    /// Manifest destination that would land outside the staging directory.
    #[error("manifest destination {0} escapes the staging directory")]
    InvalidDestination(PathBuf),

    /// Error walking a directory tree.
    #[error("{0}")]
    WalkdirError(#[from] walkdir::Error),

    /// Path prefix stripping error.
    #[error("{0}")]
    StripError(#[from] path::StripPrefixError),

    /// Generic error with custom message.
    #[error("{0}")]
    GenericError(String),
}

impl Error {
    /// Wraps this error with the stage it originated from.
    ///
    /// Errors that already carry a stage are returned unchanged.
    pub fn at_stage(self, stage: Stage) -> Self {
        match self {
            Error::Package { .. } => self,
            other => Error::Package {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// Returns the stage this error was tagged with, if any.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Error::Package { stage, .. } => Some(*stage),
            Error::Context(_, inner) => inner.stage(),
            _ => None,
        }
    }

    /// Classifies the error, looking through stage and context wrappers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Package { source, .. } => source.kind(),
            Error::Context(_, inner) => inner.kind(),
            Error::Config(_) => ErrorKind::Config,
            Error::Command(_) => ErrorKind::Command,
            Error::Fs { .. }
            | Error::InvalidDestination(_)
            | Error::WalkdirError(_)
            | Error::StripError(_) => ErrorKind::Io,
            Error::GenericError(_) => ErrorKind::Other,
        }
    }

    /// The innermost error, with stage and context wrappers removed.
    pub fn root_cause(&self) -> &Error {
        match self {
            Error::Package { source, .. } => source.root_cause(),
            Error::Context(_, inner) => inner.root_cause(),
            other => other,
        }
    }

    /// Captured output of the failing external command, if any.
    pub fn command_output(&self) -> Option<&str> {
        match self {
            Error::Package { source, .. } => source.command_output(),
            Error::Context(_, inner) => inner.command_output(),
            Error::Command(e) => e.output(),
            _ => None,
        }
    }
}

/// Configuration errors raised while resolving driver settings.
#[derive(Debug, DeriveError)]
#[non_exhaustive]
pub enum ConfigError {
    /// A required option was not provided.
    #[error("missing required option `{0}`")]
    MissingField(&'static str),

    /// An option was provided with an unusable value.
    #[error("invalid value for `{field}`: {reason}")]
    InvalidValue {
        /// Option name
        field: &'static str,
        /// Why the value was rejected
        reason: String,
    },

    /// The disk-image utility could not be located on `PATH`.
    #[error("cannot locate {tool} command: {error}")]
    ToolNotFound {
        /// Program that was searched for
        tool: String,
        /// Lookup failure
        error: which::Error,
    },

    /// No generator is registered under the requested name.
    #[error("unknown generator `{0}`")]
    UnknownGenerator(String),

    /// The packaging file is not valid TOML or has the wrong shape.
    #[error("failed to parse packaging file {path}: {error}")]
    Parse {
        /// Packaging file path
        path: PathBuf,
        /// Underlying parse error
        error: toml::de::Error,
    },
}

/// Failures of an external command.
#[derive(Debug, DeriveError)]
#[non_exhaustive]
pub enum CommandError {
    /// The process could not be started (missing binary, permissions).
    #[error("failed to run command {command}: {error}")]
    Spawn {
        /// Command line that was attempted
        command: String,
        /// The underlying error
        error: io::Error,
    },

    /// The process ran but exited unsuccessfully.
    #[error("command {command} exited with {}: {output}", describe_exit(*.code))]
    NonZeroExit {
        /// Command line that ran
        command: String,
        /// Exit code, `None` when terminated by a signal
        code: Option<i32>,
        /// Captured stdout and stderr
        output: String,
    },

    /// The process exited zero but the expected output file is missing or empty.
    #[error("command {command} reported success but produced no image at {}: {output}", .path.display())]
    MissingOutput {
        /// Command line that ran
        command: String,
        /// Expected output path
        path: PathBuf,
        /// Captured stdout and stderr
        output: String,
    },

    /// The process did not finish within the configured timeout.
    #[error("command {command} timed out after {}s", .timeout.as_secs())]
    TimedOut {
        /// Command line that ran
        command: String,
        /// Configured timeout
        timeout: Duration,
    },
}

impl CommandError {
    /// Returns `true` when the process never started.
    pub fn is_spawn_failure(&self) -> bool {
        matches!(self, CommandError::Spawn { .. })
    }

    /// Captured output, for variants where the process actually ran.
    pub fn output(&self) -> Option<&str> {
        match self {
            CommandError::NonZeroExit { output, .. } | CommandError::MissingOutput { output, .. } => {
                Some(output)
            }
            CommandError::Spawn { .. } | CommandError::TimedOut { .. } => None,
        }
    }
}

fn describe_exit(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "termination by signal".to_string(),
    }
}

/// Convenient type alias for Result.
pub type Result<T> = std::result::Result<T, Error>;

/// Trait for adding context to errors.
///
/// Similar to `anyhow::Context` but integrated with the bundler's Error type.
pub trait Context<T> {
    /// Add context to an error.
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Display + Send + Sync + 'static;

    /// Add context to an error using a closure (lazy evaluation).
    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C;
}

impl<T> Context<T> for Result<T> {
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
    {
        self.map_err(|e| Error::Context(context.to_string(), Box::new(e)))
    }

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.map_err(|e| Error::Context(f().to_string(), Box::new(e)))
    }
}

/// Extension trait for filesystem operations with automatic path context.
///
/// ```no_run
/// # use std::path::Path;
/// # use kodegen_bundler_dmg::bundler::{ErrorExt, Result};
/// fn create_output_dir(path: &Path) -> Result<()> {
///     std::fs::create_dir_all(path).fs_context("creating output directory", path)?;
///     Ok(())
/// }
/// ```
pub trait ErrorExt<T> {
    /// Add filesystem context to an I/O error.
    ///
    /// The `context` should be a present-tense verb phrase describing the operation,
    /// e.g., "reading file", "creating directory", "copying staged file".
    fn fs_context(self, context: &'static str, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> ErrorExt<T> for std::result::Result<T, std::io::Error> {
    fn fs_context(self, context: &'static str, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|error| Error::Fs {
            context,
            path: path.into(),
            error,
        })
    }
}

/// Macro for early return with error.
///
/// Converts the message into a [`Error::GenericError`] and returns immediately.
///
/// ```ignore
/// bail!("operation failed");
/// bail!("invalid value: {}", value);
/// ```
#[macro_export]
macro_rules! bail {
    ($msg:literal $(,)?) => {
        return Err($crate::bundler::error::Error::GenericError($msg.into()))
    };
    ($err:expr $(,)?) => {
        return Err($crate::bundler::error::Error::GenericError($err.to_string()))
    };
    ($fmt:expr, $($arg:tt)*) => {
        return Err($crate::bundler::error::Error::GenericError(format!($fmt, $($arg)*)))
    };
}
