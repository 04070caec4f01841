//! macOS DMG disk image creator.
//!
//! Turns a populated staging directory into a compressed, read-only image
//! with the native `hdiutil` tool.

use crate::bundler::{
    error::{CommandError, ErrorExt, Result},
    settings::DiskImageSpec,
    utils::{
        command::{CommandRunner, ToolCommand},
        fs,
    },
};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Runs `hdiutil create` against a staging directory.
#[derive(Debug)]
pub struct DiskImageBuilder<'a, R> {
    runner: &'a R,
    hdiutil: &'a Path,
    timeout: Option<Duration>,
}

impl<'a, R: CommandRunner> DiskImageBuilder<'a, R> {
    /// Creates a builder that runs `hdiutil` through `runner`.
    pub fn new(runner: &'a R, hdiutil: &'a Path, timeout: Option<Duration>) -> Self {
        Self {
            runner,
            hdiutil,
            timeout,
        }
    }

    /// Command line for imaging `staging_dir` according to `spec`.
    ///
    /// Equivalent to:
    ///
    /// ```text
    /// hdiutil create -ov -volname <name> -srcfolder <staging> -format <FMT> \
    ///     [-imagekey zlib-level=9] <output>
    /// ```
    pub fn command(&self, staging_dir: &Path, spec: &DiskImageSpec) -> ToolCommand {
        let mut cmd = ToolCommand::new(self.hdiutil)
            .args(["create", "-ov", "-volname"])
            .arg(&spec.volume_name)
            .arg("-srcfolder")
            .arg(staging_dir)
            .args(["-format", spec.hdiutil_format()]);

        if spec.read_only
            && let Some(key) = spec.compression_format.image_key()
        {
            cmd = cmd.args(["-imagekey", key]);
        }

        cmd.arg(&spec.output_path).timeout(self.timeout)
    }

    /// Builds the image.
    ///
    /// # Process
    /// 1. Create the output directory and remove any stale image
    /// 2. Run `hdiutil create`
    /// 3. Fail on a non-zero exit, carrying hdiutil's output
    /// 4. Fail if hdiutil exited zero but the image is missing or empty
    ///
    /// # Returns
    /// Path to the created image.
    pub async fn build(&self, staging_dir: &Path, spec: &DiskImageSpec) -> Result<PathBuf> {
        let dmg_path = &spec.output_path;

        if let Some(output_dir) = dmg_path.parent() {
            fs::create_dir_all(output_dir).await?;
        }
        fs::remove_file_if_exists(dmg_path).await?;

        log::info!(
            "Creating {} DMG '{}' from {}",
            spec.hdiutil_format(),
            spec.volume_name,
            staging_dir.display()
        );

        let cmd = self.command(staging_dir, spec);
        let output = self.runner.run(&cmd).await?.check(&cmd)?;

        let size = match tokio::fs::metadata(dmg_path).await {
            Ok(metadata) if metadata.is_file() => metadata.len(),
            Ok(_) => 0,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => 0,
            Err(e) => return Err(e).fs_context("reading created image", dmg_path),
        };
        if size == 0 {
            return Err(CommandError::MissingOutput {
                command: cmd.to_string(),
                path: dmg_path.clone(),
                output: output.output,
            }
            .into());
        }

        log::info!("✓ Created DMG: {} ({} bytes)", dmg_path.display(), size);
        Ok(dmg_path.clone())
    }
}
