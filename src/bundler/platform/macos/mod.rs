//! macOS drag-and-drop DMG generator.
//!
//! Packages an install manifest into a compressed, read-only disk image that
//! users mount and drag into `/Applications`.
//!
//! # Build Requirements
//!
//! | Format | Required Tools | Notes |
//! |--------|----------------|-------|
//! | .dmg | `hdiutil` | Built into macOS |
//!
//! # Pipeline
//!
//! 1. [`staging`]: copy every manifest entry into a private staging directory
//!    under the install prefix, stopping at the first failure
//! 2. [`dmg`]: run `hdiutil create` over the staging directory, once
//! 3. Remove the staging directory (unless `keep_staging` is set)

pub mod dmg;
pub mod staging;

use crate::bundler::{
    BundledArtifact,
    error::{ConfigError, Context, Error, Result, Stage},
    generator::{GeneratorState, PackageGenerator},
    manifest::InstallManifest,
    settings::{DiskImageSpec, DmgFormat, GeneratorConfig, InstallPrefix},
    utils::command::{CommandRunner, SystemCommandRunner},
};
use dmg::DiskImageBuilder;
use path_absolutize::Absolutize;
use staging::StagingArea;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Registry name of the drag-and-drop generator.
pub const GENERATOR_NAME: &str = "DragNDrop";

/// File extension of images produced by this generator.
pub const DMG_EXTENSION: &str = ".dmg";

/// Resolved drag-and-drop configuration. Produced by
/// [`DragNDropGenerator::initialize`] and never modified afterwards.
#[derive(Clone, Debug)]
pub struct DragNDropSettings {
    install_prefix: InstallPrefix,
    image: DiskImageSpec,
    hdiutil: PathBuf,
    timeout: Option<Duration>,
    applications_symlink: bool,
    staging_root: Option<PathBuf>,
    keep_staging: bool,
}

impl DragNDropSettings {
    /// Prefix under which manifest entries are staged.
    pub fn install_prefix(&self) -> &InstallPrefix {
        &self.install_prefix
    }

    /// Image to produce.
    pub fn image(&self) -> &DiskImageSpec {
        &self.image
    }

    /// `hdiutil` program that will be run.
    pub fn hdiutil(&self) -> &Path {
        &self.hdiutil
    }

    /// Command timeout, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Whether an `/Applications` symlink is added to the image root.
    pub fn applications_symlink(&self) -> bool {
        self.applications_symlink
    }

    /// Whether the staging directory survives packaging.
    pub fn keep_staging(&self) -> bool {
        self.keep_staging
    }
}

/// Generator for drag-and-drop DMG installers.
///
/// Generic over the [`CommandRunner`] so the `hdiutil` invocation can be
/// observed in tests; [`DragNDropGenerator::new`] uses real processes.
#[derive(Debug)]
pub struct DragNDropGenerator<R = SystemCommandRunner> {
    runner: R,
    state: GeneratorState,
}

impl DragNDropGenerator {
    /// Creates a generator that runs `hdiutil` as a child process.
    pub fn new() -> Self {
        Self::with_runner(SystemCommandRunner)
    }
}

impl Default for DragNDropGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: CommandRunner> DragNDropGenerator<R> {
    /// Creates a generator that executes commands through `runner`.
    pub fn with_runner(runner: R) -> Self {
        Self {
            runner,
            state: GeneratorState::Uninitialized,
        }
    }

    /// The command runner in use.
    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Resolves configuration without touching the filesystem.
    fn resolve(config: &GeneratorConfig) -> std::result::Result<DragNDropSettings, ConfigError> {
        let volume_name = config
            .volume_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or(ConfigError::MissingField("volume_name"))?
            .to_string();

        let output_path = config
            .output_path
            .as_deref()
            .filter(|path| !path.as_os_str().is_empty())
            .ok_or(ConfigError::MissingField("output_path"))?;
        let output_path = normalize_output_path(output_path)?;

        let compression_format = match &config.compression_format {
            Some(format) => format.parse::<DmgFormat>()?,
            None => DmgFormat::default(),
        };

        let read_only = config.read_only.unwrap_or(true);
        if !read_only && compression_format != DmgFormat::None {
            return Err(ConfigError::InvalidValue {
                field: "read_only",
                reason: format!(
                    "read-write images cannot be compressed; set compression_format = \"none\" (got \"{}\")",
                    compression_format
                ),
            });
        }

        let install_prefix = match &config.install_prefix {
            Some(prefix) => InstallPrefix::new(prefix)?,
            None => InstallPrefix::default(),
        };

        let timeout = match config.timeout_secs {
            Some(0) => {
                return Err(ConfigError::InvalidValue {
                    field: "timeout_secs",
                    reason: "must be greater than zero".to_string(),
                });
            }
            Some(secs) => Some(Duration::from_secs(secs)),
            None => None,
        };

        let hdiutil = locate_hdiutil(config.hdiutil.as_deref())?;

        Ok(DragNDropSettings {
            install_prefix,
            image: DiskImageSpec {
                volume_name,
                compression_format,
                output_path,
                read_only,
            },
            hdiutil,
            timeout,
            applications_symlink: config.applications_symlink.unwrap_or(true),
            staging_root: config.staging_root.clone(),
            keep_staging: config.keep_staging,
        })
    }

    /// Copies the manifest into `staging`, then images it.
    async fn stage_and_build(
        &mut self,
        staging: &StagingArea,
        settings: &DragNDropSettings,
        manifest: &InstallManifest,
    ) -> Result<PathBuf> {
        if settings.applications_symlink {
            staging
                .reserve_applications_link(manifest.entries())
                .map_err(|e| e.at_stage(Stage::Staging))?;
        }

        for (index, entry) in manifest.entries().iter().enumerate() {
            staging
                .stage(entry)
                .await
                .with_context(|| {
                    format!(
                        "staging manifest entry {} of {} ({})",
                        index + 1,
                        manifest.len(),
                        entry.source.display()
                    )
                })
                .map_err(|e| e.at_stage(Stage::Staging))?;
        }

        if settings.applications_symlink {
            staging
                .link_applications()
                .map_err(|e| e.at_stage(Stage::Staging))?;
        }

        self.state = GeneratorState::Building;
        DiskImageBuilder::new(&self.runner, &settings.hdiutil, settings.timeout)
            .build(staging.path(), &settings.image)
            .await
            .map_err(|e| e.at_stage(Stage::Building))
    }
}

impl<R: CommandRunner> PackageGenerator for DragNDropGenerator<R> {
    type Settings = DragNDropSettings;

    fn name(&self) -> &'static str {
        GENERATOR_NAME
    }

    fn output_extension(&self) -> &'static str {
        DMG_EXTENSION
    }

    fn state(&self) -> GeneratorState {
        self.state
    }

    fn initialize(&mut self, config: &GeneratorConfig) -> Result<DragNDropSettings> {
        let settings =
            Self::resolve(config).map_err(|e| Error::from(e).at_stage(Stage::Initialize))?;

        log::debug!(
            "Initialized {} generator: volume '{}', format {}, prefix '{}', hdiutil {}",
            GENERATOR_NAME,
            settings.image.volume_name,
            settings.image.hdiutil_format(),
            settings.install_prefix.as_path().display(),
            settings.hdiutil.display()
        );
        self.state = GeneratorState::Initialized;
        Ok(settings)
    }

    /// Bundle the manifest as a DMG disk image.
    ///
    /// # Process
    /// 1. Create a private staging directory
    /// 2. Copy every manifest entry, in order, under the install prefix
    /// 3. Create the Applications symlink for drag-to-install
    /// 4. Run `hdiutil create` once
    /// 5. Remove the staging directory, on success and on failure
    async fn package_files(
        &mut self,
        settings: &DragNDropSettings,
        manifest: &InstallManifest,
    ) -> Result<BundledArtifact> {
        log::info!(
            "Creating DMG '{}' from {} manifest entr{}",
            settings.image.volume_name,
            manifest.len(),
            if manifest.len() == 1 { "y" } else { "ies" }
        );

        self.state = GeneratorState::Staging;
        let staging =
            StagingArea::create(settings.staging_root.as_deref(), &settings.install_prefix).await;
        let outcome = match staging {
            Ok(staging) => {
                let built = self.stage_and_build(&staging, settings, manifest).await;
                release_staging(staging, settings.keep_staging);
                match built {
                    Ok(path) => BundledArtifact::from_path(GENERATOR_NAME, path)
                        .await
                        .map_err(|e| e.at_stage(Stage::Building)),
                    Err(e) => Err(e),
                }
            }
            Err(e) => Err(e.at_stage(Stage::Staging)),
        };

        self.state = match &outcome {
            Ok(_) => GeneratorState::Completed,
            Err(e) => GeneratorState::Failed(e.stage().unwrap_or(Stage::Staging)),
        };
        if let Err(e) = &outcome {
            log::error!("DMG packaging failed: {e}");
        }
        outcome
    }
}

/// Removes the staging directory, or keeps it and logs where it is.
///
/// Cleanup failures are logged rather than returned; they never change the
/// outcome of packaging.
fn release_staging(staging: StagingArea, keep: bool) {
    if keep {
        let path = staging.keep();
        log::info!("Keeping staging directory {}", path.display());
    } else if let Err(e) = staging.close() {
        log::warn!("Failed to remove staging directory: {e}");
    }
}

/// Makes the output path absolute and ensures it ends in `.dmg`.
///
/// hdiutil appends `.dmg` itself when the extension is missing, which would
/// leave the image somewhere other than the configured path.
fn normalize_output_path(path: &Path) -> std::result::Result<PathBuf, ConfigError> {
    let absolute = path
        .absolutize()
        .map_err(|e| ConfigError::InvalidValue {
            field: "output_path",
            reason: format!("cannot resolve '{}': {e}", path.display()),
        })?
        .into_owned();

    if absolute.file_name().is_none() {
        return Err(ConfigError::InvalidValue {
            field: "output_path",
            reason: format!("'{}' has no file name", path.display()),
        });
    }

    let has_dmg_extension = absolute
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("dmg"));
    if has_dmg_extension {
        Ok(absolute)
    } else {
        let mut with_ext = absolute.into_os_string();
        with_ext.push(DMG_EXTENSION);
        Ok(PathBuf::from(with_ext))
    }
}

/// Uses the configured `hdiutil` program, or finds it on `PATH`.
fn locate_hdiutil(configured: Option<&Path>) -> std::result::Result<PathBuf, ConfigError> {
    match configured {
        Some(path) if path.components().count() > 1 => Ok(path.to_path_buf()),
        Some(name) => which::which(name).map_err(|error| ConfigError::ToolNotFound {
            tool: name.display().to_string(),
            error,
        }),
        None => which::which("hdiutil").map_err(|error| ConfigError::ToolNotFound {
            tool: "hdiutil".to_string(),
            error,
        }),
    }
}
