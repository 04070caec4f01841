//! # kodegen_bundler_dmg
//!
//! Drag-and-drop DMG packaging for macOS.
//!
//! Given an install manifest and a handful of options, this crate copies the
//! files into a private staging directory and invokes `hdiutil` to produce a
//! compressed, read-only disk image.
//!
//! ## Features
//!
//! - **Generator registry**: backends are selected by name at runtime
//! - **Isolated staging**: every run stages into its own temporary directory
//! - **Fail fast**: the first copy failure aborts before `hdiutil` runs
//! - **Diagnostics**: failures carry the pipeline stage and `hdiutil` output
//!
//! ## Usage
//!
//! ```bash
//! kodegen_bundler_dmg dmg.toml                     # Build the image described in dmg.toml
//! kodegen_bundler_dmg dmg.toml --format lzfse      # Override the compression
//! kodegen_bundler_dmg dmg.toml --json              # Machine-readable result
//! kodegen_bundler_dmg --list-generators            # Show registered generators
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

// Core modules
pub mod bundler;
pub mod cli;
pub mod error;

// Re-export main types for public API
pub use bundler::{BundledArtifact, Generator, GeneratorConfig, InstallManifest, PackageGenerator};
pub use cli::Args;
pub use error::{CliError, PackagerError, Result};
