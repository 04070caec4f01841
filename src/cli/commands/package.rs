//! Package command implementation.
//!
//! Loads the packaging file, applies command line overrides, and drives the
//! selected generator through `initialize` and `package_files`.

use crate::bundler::{PackagingFile, Stage, platform};
use crate::cli::{Args, RuntimeConfig};
use crate::error::{CliError, Result};

pub(super) async fn execute_package(args: &Args, config: &RuntimeConfig) -> Result<()> {
    let path = args
        .packaging_file
        .as_deref()
        .ok_or_else(|| CliError::MissingArgument {
            argument: "PACKAGING_FILE".to_string(),
        })?;

    let file = PackagingFile::load(path)
        .await
        .map_err(|e| e.at_stage(Stage::Initialize))?;

    let name = args
        .generator
        .as_deref()
        .or(file.generator.as_deref())
        .unwrap_or(platform::DEFAULT_GENERATOR);
    let mut generator = platform::create(name)
        .map_err(|e| crate::bundler::Error::from(e).at_stage(Stage::Initialize))?;

    let generator_config = args.apply_overrides(file.config.clone());
    let settings = generator.initialize(&generator_config)?;

    let manifest = file
        .manifest()
        .map_err(|e| e.at_stage(Stage::Staging))?;
    log::debug!(
        "Loaded {} with {} manifest entries for {} generator",
        path.display(),
        manifest.len(),
        generator
    );

    if !config.is_json() {
        let _ = config.output().section(&format!("{} package", generator));
    }
    let artifact = generator.package_files(&settings, &manifest).await?;

    if config.is_json() {
        let report = serde_json::json!({
            "status": "success",
            "artifact": artifact,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        config.success_println(&format!("Created {}", artifact.path.display()));
        config.indent(&format!("Size: {} bytes", artifact.size));
        config.indent(&format!("SHA-256: {}", artifact.checksum));
    }
    Ok(())
}
