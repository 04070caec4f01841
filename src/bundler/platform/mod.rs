//! Platform generators and the registry that selects them by name.
//!
//! The registry is a static table of name → factory function. Drivers look a
//! generator up at runtime with [`create`] and then drive it through the
//! [`Generator`] enum, which dispatches to the concrete backend with a plain
//! `match`.
//!
//! | Generator | Output | Module |
//! |-----------|--------|--------|
//! | `DragNDrop` | `.dmg` | [`macos`] |
//!
//! # Examples
//!
//! ```no_run
//! use kodegen_bundler_dmg::bundler::{platform, GeneratorConfig, InstallManifest};
//!
//! # async fn example(config: GeneratorConfig, manifest: InstallManifest) -> kodegen_bundler_dmg::bundler::Result<()> {
//! let mut generator = platform::create("dmg")?;
//! let settings = generator.initialize(&config)?;
//! let artifact = generator.package_files(&settings, &manifest).await?;
//! # Ok(())
//! # }
//! ```

pub mod macos;

use crate::bundler::{
    BundledArtifact, Result,
    error::ConfigError,
    generator::{GeneratorState, PackageGenerator},
    manifest::InstallManifest,
    settings::GeneratorConfig,
};
use std::fmt;

/// A registered generator, ready to be initialized.
#[derive(Debug)]
#[non_exhaustive]
pub enum Generator {
    /// macOS drag-and-drop disk image.
    DragNDrop(macos::DragNDropGenerator),
}

/// Settings resolved by [`Generator::initialize`].
#[derive(Clone, Debug)]
#[non_exhaustive]
pub enum GeneratorSettings {
    /// Settings for [`Generator::DragNDrop`].
    DragNDrop(macos::DragNDropSettings),
}

impl Generator {
    /// Registry name.
    pub fn name(&self) -> &'static str {
        match self {
            Generator::DragNDrop(g) => g.name(),
        }
    }

    /// Extension of produced packages, including the leading dot.
    pub fn output_extension(&self) -> &'static str {
        match self {
            Generator::DragNDrop(g) => g.output_extension(),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> GeneratorState {
        match self {
            Generator::DragNDrop(g) => g.state(),
        }
    }

    /// Resolves driver configuration for this generator.
    pub fn initialize(&mut self, config: &GeneratorConfig) -> Result<GeneratorSettings> {
        match self {
            Generator::DragNDrop(g) => g.initialize(config).map(GeneratorSettings::DragNDrop),
        }
    }

    /// Stages `manifest` and produces the package.
    pub async fn package_files(
        &mut self,
        settings: &GeneratorSettings,
        manifest: &InstallManifest,
    ) -> Result<BundledArtifact> {
        match (self, settings) {
            (Generator::DragNDrop(g), GeneratorSettings::DragNDrop(s)) => {
                g.package_files(s, manifest).await
            }
        }
    }
}

impl fmt::Display for Generator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One registry row.
#[derive(Debug)]
pub struct GeneratorEntry {
    /// Canonical name.
    pub name: &'static str,
    /// Alternative names accepted by [`create`].
    pub aliases: &'static [&'static str],
    /// One-line description for listings.
    pub description: &'static str,
    factory: fn() -> Generator,
}

impl GeneratorEntry {
    /// Returns `true` if `name` selects this entry (case-insensitive).
    pub fn matches(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
            || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(name))
    }

    /// Constructs a fresh generator.
    pub fn create(&self) -> Generator {
        (self.factory)()
    }
}

fn drag_n_drop() -> Generator {
    Generator::DragNDrop(macos::DragNDropGenerator::new())
}

/// All generators known to this crate.
pub static GENERATORS: &[GeneratorEntry] = &[GeneratorEntry {
    name: macos::GENERATOR_NAME,
    aliases: &["dmg", "dragndrop", "drag-n-drop"],
    description: "macOS drag-and-drop disk image (.dmg) built with hdiutil",
    factory: drag_n_drop,
}];

/// Name used when a driver does not choose a generator.
pub const DEFAULT_GENERATOR: &str = macos::GENERATOR_NAME;

/// Looks up a registry entry by name or alias.
pub fn lookup(name: &str) -> Option<&'static GeneratorEntry> {
    GENERATORS.iter().find(|entry| entry.matches(name.trim()))
}

/// Constructs the generator registered under `name`.
pub fn create(name: &str) -> std::result::Result<Generator, ConfigError> {
    lookup(name)
        .map(GeneratorEntry::create)
        .ok_or_else(|| ConfigError::UnknownGenerator(name.to_string()))
}
