//! Command execution for the packaging CLI.
//!
//! Failures are reported here rather than in `main`: the failing stage, the
//! error, any captured `hdiutil` output, and recovery suggestions.

mod list;
mod package;

use crate::cli::{Args, RuntimeConfig};
use crate::error::{CliError, PackagerError, Result};

use list::execute_list;
use package::execute_package;

/// Execute the command selected by the parsed arguments
pub async fn execute_command(args: Args) -> Result<i32> {
    let config = RuntimeConfig::from(&args);

    if let Err(reason) = args.validate() {
        report_failure(&config, &CliError::InvalidArguments { reason }.into())?;
        return Ok(1);
    }

    if args.list_generators {
        execute_list(&config)?;
        return Ok(0);
    }

    match execute_package(&args, &config).await {
        Ok(()) => Ok(0),
        Err(e) => {
            report_failure(&config, &e)?;
            Ok(1)
        }
    }
}

fn report_failure(config: &RuntimeConfig, error: &PackagerError) -> Result<()> {
    let suggestions = error.recovery_suggestions();

    if config.is_json() {
        let report = serde_json::json!({
            "status": "failed",
            "stage": error.stage().map(|s| s.to_string()),
            "error": error.to_string(),
            "suggestions": suggestions,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    // Bundler errors already name their stage
    config.error_println(&format!("Packaging failed: {error}"));

    if let PackagerError::Bundler(e) = error
        && let Some(output) = e.command_output()
        && !output.trim().is_empty()
    {
        config.println("\nhdiutil output:");
        for line in output.lines() {
            config.indent(line);
        }
    }

    if !suggestions.is_empty() {
        config.println("\n💡 Recovery suggestions:");
        for suggestion in suggestions {
            config.println(&format!("  • {}", suggestion));
        }
    }
    Ok(())
}
