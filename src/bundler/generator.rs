//! The capability interface every platform generator implements.
//!
//! A generator is driven in two steps:
//! 1. [`PackageGenerator::initialize`] resolves driver configuration into an
//!    immutable settings value, failing with a configuration error before any
//!    filesystem change.
//! 2. [`PackageGenerator::package_files`] stages the manifest and produces the
//!    package, returning a [`BundledArtifact`].
//!
//! # Example
//!
//! ```no_run
//! use kodegen_bundler_dmg::bundler::{GeneratorConfig, InstallManifest, PackageGenerator};
//! use kodegen_bundler_dmg::bundler::platform::macos::DragNDropGenerator;
//!
//! # async fn example() -> kodegen_bundler_dmg::bundler::Result<()> {
//! let config = GeneratorConfig::new()
//!     .volume_name("MyApp")
//!     .output_path("target/release/bundle/dmg/MyApp-1.0.0.dmg");
//! let manifest = InstallManifest::new()
//!     .with_entry("target/release/myapp", "bin/myapp");
//!
//! let mut generator = DragNDropGenerator::new();
//! let settings = generator.initialize(&config)?;
//! let artifact = generator.package_files(&settings, &manifest).await?;
//!
//! println!("Created {} ({} bytes)", artifact.path.display(), artifact.size);
//! println!("SHA256: {}", artifact.checksum);
//! # Ok(())
//! # }
//! ```

use crate::bundler::{
    BundledArtifact, Result,
    error::{ErrorExt, Stage},
    manifest::InstallManifest,
    settings::GeneratorConfig,
};
use std::fmt;
use std::path::{Path, PathBuf};

/// Lifecycle of a generator.
///
/// `Uninitialized → Initialized → Staging → Building → {Completed | Failed}`.
/// `Failed` records the stage that failed.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum GeneratorState {
    /// `initialize` has not succeeded yet.
    #[default]
    Uninitialized,
    /// Configuration resolved; ready to package.
    Initialized,
    /// Copying manifest entries.
    Staging,
    /// Running the image tool.
    Building,
    /// Package produced.
    Completed,
    /// Packaging stopped at the given stage.
    Failed(Stage),
}

impl fmt::Display for GeneratorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeneratorState::Uninitialized => f.write_str("uninitialized"),
            GeneratorState::Initialized => f.write_str("initialized"),
            GeneratorState::Staging => f.write_str("staging"),
            GeneratorState::Building => f.write_str("building"),
            GeneratorState::Completed => f.write_str("completed"),
            GeneratorState::Failed(stage) => write!(f, "failed during {stage}"),
        }
    }
}

/// A platform packaging backend.
#[allow(async_fn_in_trait)]
pub trait PackageGenerator {
    /// Resolved, immutable configuration produced by [`initialize`](Self::initialize).
    type Settings;

    /// Registry name of this generator.
    fn name(&self) -> &'static str;

    /// File extension of produced packages, including the leading dot.
    ///
    /// Constant for a given generator.
    fn output_extension(&self) -> &'static str;

    /// Current lifecycle state.
    fn state(&self) -> GeneratorState;

    /// Validates driver configuration and resolves it into settings.
    fn initialize(&mut self, config: &GeneratorConfig) -> Result<Self::Settings>;

    /// Stages every manifest entry and produces the package.
    async fn package_files(
        &mut self,
        settings: &Self::Settings,
        manifest: &InstallManifest,
    ) -> Result<BundledArtifact>;
}

impl BundledArtifact {
    /// Describes a freshly built package file: its size and SHA-256 checksum.
    pub async fn from_path(generator: &'static str, path: PathBuf) -> Result<Self> {
        let metadata = tokio::fs::metadata(&path)
            .await
            .fs_context("reading artifact metadata", &path)?;
        let checksum = calculate_sha256(&path).await?;
        Ok(Self {
            generator,
            path,
            size: metadata.len(),
            checksum,
        })
    }
}

/// Calculates the SHA-256 checksum of a file.
///
/// Reads in 8KB chunks and returns the hex-encoded digest (64 characters).
pub async fn calculate_sha256(path: &Path) -> Result<String> {
    use sha2::{Digest, Sha256};
    use tokio::io::AsyncReadExt;

    let mut file = tokio::fs::File::open(path)
        .await
        .fs_context("opening file for hashing", path)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; 8192];

    loop {
        let n = file
            .read(&mut buffer)
            .await
            .fs_context("reading file for hash calculation", path)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}
