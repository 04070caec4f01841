//! DMG packaging backend.
//!
//! Turns a staged install tree into a compressed, read-only macOS disk image:
//! the manifest is copied into a private staging directory, `hdiutil` images
//! that directory, and the result is reported as a [`BundledArtifact`].
//!
//! # Configuration
//!
//! Packaging is configured via a TOML packaging file (see [`PackagingFile`])
//! or directly through [`GeneratorConfig`]:
//!
//! ```toml
//! volume_name = "MyApp"
//! output_path = "target/release/bundle/dmg/MyApp-1.0.0.dmg"
//! compression_format = "zlib"
//! install_tree = "target/install"
//! ```
//!
//! # Supported Formats
//!
//! | Setting | hdiutil format | Notes |
//! |---------|----------------|-------|
//! | `none` | UDRO | Uncompressed, read-only |
//! | `zlib` | UDZO | Default |
//! | `bzip2` | UDBZ | |
//! | `lzfse` | ULFO | macOS 10.11+ |
//! | `lzma` | ULMO | macOS 10.15+ |
//!
//! # Integration
//!
//! Drivers pick a generator from the [`platform`] registry and drive it
//! through [`PackageGenerator`]-style `initialize` / `package_files` calls:
//!
//! ```no_run
//! use kodegen_bundler_dmg::bundler::{platform, InstallManifest, GeneratorConfig};
//!
//! # async fn example() -> kodegen_bundler_dmg::bundler::Result<()> {
//! let config = GeneratorConfig::new()
//!     .volume_name("MyApp")
//!     .output_path("dist/MyApp.dmg");
//! let manifest = InstallManifest::new().with_entry("target/release/myapp", "myapp");
//!
//! let mut generator = platform::create("DragNDrop")?;
//! let settings = generator.initialize(&config)?;
//! let artifact = generator.package_files(&settings, &manifest).await?;
//! println!("{} ({})", artifact.path.display(), artifact.checksum);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod generator;
pub mod manifest;
pub mod platform;
pub mod settings;
pub mod utils;

// Public re-exports
pub use error::{
    CommandError, ConfigError, Context, Error, ErrorExt, ErrorKind, Result, Stage,
};
pub use generator::{GeneratorState, PackageGenerator};
pub use manifest::{InstallManifest, ManifestEntry};
pub use platform::{Generator, GeneratorSettings};
pub use settings::{
    DiskImageSpec, DmgFormat, FileEntry, GeneratorConfig, InstallPrefix, PackagingFile,
};
pub use utils::command::{CommandOutput, CommandRunner, SystemCommandRunner, ToolCommand};

use serde::Serialize;
use std::path::PathBuf;

/// A package produced by a generator.
///
/// # Fields
///
/// - `generator`: registry name of the generator that produced it
/// - `path`: location of the package file
/// - `size`: size of the package in bytes
/// - `checksum`: SHA-256 checksum for integrity verification
#[derive(Debug, Clone, Serialize)]
pub struct BundledArtifact {
    /// Generator that created the package (e.g., `DragNDrop`).
    pub generator: &'static str,

    /// Path to the package file.
    pub path: PathBuf,

    /// Size of the package in bytes.
    pub size: u64,

    /// SHA-256 checksum of the package.
    ///
    /// This can be published alongside the artifact for users to verify downloads.
    pub checksum: String,
}
