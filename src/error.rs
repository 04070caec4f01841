//! Error types for the kodegen_bundler_dmg command line.
//!
//! Wraps packaging errors with the failures that only the driver can hit
//! (bad arguments, JSON output) and attaches recovery suggestions.

use crate::bundler::{self, CommandError, ConfigError, ErrorKind};
use thiserror::Error;

/// Result type alias for command line operations
pub type Result<T> = std::result::Result<T, PackagerError>;

/// Main error type for the command line driver
#[derive(Error, Debug)]
pub enum PackagerError {
    /// Packaging errors
    #[error("{0}")]
    Bundler(#[from] bundler::Error),

    /// CLI argument errors
    #[error("CLI error: {0}")]
    Cli(#[from] CliError),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Invalid command line arguments
    #[error("Invalid arguments: {reason}")]
    InvalidArguments {
        /// Reason for the error
        reason: String,
    },

    /// Missing required argument
    #[error("Missing required argument: {argument}")]
    MissingArgument {
        /// Argument name
        argument: String,
    },
}

impl PackagerError {
    /// Get actionable recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        let PackagerError::Bundler(error) = self else {
            return match self {
                PackagerError::Cli(_) => vec!["Run with --help to see usage".to_string()],
                _ => vec!["Check the error message above for specific details".to_string()],
            };
        };

        match error.root_cause() {
            bundler::Error::Config(ConfigError::ToolNotFound { tool, .. }) => vec![
                format!("Ensure `{tool}` is installed and on PATH (it ships with macOS)"),
                "Set `hdiutil = \"/usr/bin/hdiutil\"` in the packaging file".to_string(),
            ],
            bundler::Error::Config(ConfigError::MissingField(field)) => {
                let flag = match *field {
                    "output_path" => "output".to_string(),
                    other => other.replace('_', "-"),
                };
                vec![
                    format!("Add `{field} = ...` to the packaging file"),
                    format!("Or pass --{flag} on the command line"),
                ]
            }
            bundler::Error::Config(ConfigError::UnknownGenerator(_)) => {
                vec!["List available generators: kodegen_bundler_dmg --list-generators".to_string()]
            }
            bundler::Error::Config(ConfigError::Parse { path, .. }) => {
                vec![format!("Fix the TOML syntax in {}", path.display())]
            }
            bundler::Error::Command(CommandError::NonZeroExit { .. }) => vec![
                "Check the hdiutil output above".to_string(),
                "Eject any mounted volume with the same name: hdiutil detach /Volumes/<name>"
                    .to_string(),
                "Ensure the output directory has enough free space".to_string(),
            ],
            bundler::Error::Command(CommandError::TimedOut { .. }) => {
                vec!["Increase `timeout_secs` in the packaging file".to_string()]
            }
            bundler::Error::Command(CommandError::Spawn { .. }) => {
                vec!["Verify the configured hdiutil path is executable".to_string()]
            }
            bundler::Error::InvalidDestination(_) => {
                vec!["Manifest destinations must be relative paths without `..`".to_string()]
            }
            _ if error.kind() == ErrorKind::Io => vec![
                "Verify every manifest source exists and is readable".to_string(),
                "Re-run with --keep-staging to inspect the staging directory".to_string(),
            ],
            _ => vec!["Check the error message above for specific details".to_string()],
        }
    }

    /// Pipeline stage that failed, for packaging errors.
    pub fn stage(&self) -> Option<bundler::Stage> {
        match self {
            PackagerError::Bundler(e) => e.stage(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::Stage;

    #[test]
    fn test_missing_field_suggests_flag() {
        let err = PackagerError::from(
            bundler::Error::from(ConfigError::MissingField("volume_name"))
                .at_stage(Stage::Initialize),
        );
        let suggestions = err.recovery_suggestions();
        assert!(suggestions.iter().any(|s| s.contains("--volume-name")));
        assert_eq!(err.stage(), Some(Stage::Initialize));
    }

    #[test]
    fn test_non_zero_exit_suggestions() {
        let err = PackagerError::from(bundler::Error::from(CommandError::NonZeroExit {
            command: "hdiutil create".into(),
            code: Some(1),
            output: "Resource busy".into(),
        }));
        assert!(err.recovery_suggestions()[0].contains("hdiutil output"));
    }

    #[test]
    fn test_cli_error_suggests_help() {
        let err = PackagerError::from(CliError::MissingArgument {
            argument: "PACKAGING_FILE".into(),
        });
        assert_eq!(err.recovery_suggestions(), vec!["Run with --help to see usage"]);
        assert_eq!(err.stage(), None);
    }

    #[test]
    fn test_invalid_arguments_message() {
        let err = PackagerError::from(CliError::InvalidArguments {
            reason: "Timeout must be at least one second".into(),
        });
        assert_eq!(
            err.to_string(),
            "CLI error: Invalid arguments: Timeout must be at least one second"
        );
    }
}
