//! Configuration structures for DMG packaging.
//!
//! [`GeneratorConfig`] is the unresolved, driver-supplied configuration: every
//! field is optional so it can be deserialized from a packaging file and then
//! overridden from the command line. A generator's `initialize` turns it into
//! immutable resolved settings ([`DiskImageSpec`], [`InstallPrefix`], ...).
//!
//! # Packaging file
//!
//! ```toml
//! volume_name = "MyApp"
//! output_path = "target/release/bundle/dmg/MyApp-1.0.0.dmg"
//! compression_format = "zlib"
//! install_prefix = "MyApp"
//!
//! [[files]]
//! source = "target/release/myapp"
//! destination = "bin/myapp"
//! ```
//!
//! Relative paths are resolved against the directory containing the file.

use crate::bundler::error::{ConfigError, Error, ErrorExt, Result};
use crate::bundler::manifest::{InstallManifest, ManifestEntry};
use serde::Deserialize;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

/// Compression applied to the produced disk image.
///
/// Each variant maps onto an `hdiutil` image format code.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub enum DmgFormat {
    /// Uncompressed read-only image (UDRO).
    None,
    /// zlib-compressed image (UDZO). Mountable on every macOS release.
    #[default]
    Zlib,
    /// bzip2-compressed image (UDBZ).
    Bzip2,
    /// LZFSE-compressed image (ULFO), macOS 10.11+.
    Lzfse,
    /// LZMA-compressed image (ULMO), macOS 10.15+.
    Lzma,
}

impl DmgFormat {
    /// All supported formats, in declaration order.
    pub const ALL: [DmgFormat; 5] = [
        DmgFormat::None,
        DmgFormat::Zlib,
        DmgFormat::Bzip2,
        DmgFormat::Lzfse,
        DmgFormat::Lzma,
    ];

    /// Lowercase name used in packaging files.
    pub fn name(&self) -> &'static str {
        match self {
            DmgFormat::None => "none",
            DmgFormat::Zlib => "zlib",
            DmgFormat::Bzip2 => "bzip2",
            DmgFormat::Lzfse => "lzfse",
            DmgFormat::Lzma => "lzma",
        }
    }

    /// `hdiutil -format` code for a read-only image.
    pub fn hdiutil_code(&self) -> &'static str {
        match self {
            DmgFormat::None => "UDRO",
            DmgFormat::Zlib => "UDZO",
            DmgFormat::Bzip2 => "UDBZ",
            DmgFormat::Lzfse => "ULFO",
            DmgFormat::Lzma => "ULMO",
        }
    }

    /// Extra `-imagekey` setting for formats that take a compression level.
    pub fn image_key(&self) -> Option<&'static str> {
        match self {
            DmgFormat::Zlib => Some("zlib-level=9"),
            _ => None,
        }
    }
}

impl fmt::Display for DmgFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DmgFormat {
    type Err = ConfigError;

    /// Accepts either the lowercase name (`zlib`) or the hdiutil code (`UDZO`).
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim();
        DmgFormat::ALL
            .into_iter()
            .find(|f| {
                f.name().eq_ignore_ascii_case(wanted) || f.hdiutil_code().eq_ignore_ascii_case(wanted)
            })
            .ok_or_else(|| ConfigError::InvalidValue {
                field: "compression_format",
                reason: format!(
                    "unknown format '{}', expected one of: {}",
                    wanted,
                    DmgFormat::ALL.map(|f| f.name()).join(", ")
                ),
            })
    }
}

/// Everything needed to run the disk-image utility once.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiskImageSpec {
    /// Label shown for the mounted volume.
    pub volume_name: String,
    /// Compression applied to the image.
    pub compression_format: DmgFormat,
    /// Absolute path of the image to produce, ending in `.dmg`.
    pub output_path: PathBuf,
    /// Produce a read-only image. Read-write images (UDRW) are uncompressed.
    pub read_only: bool,
}

impl DiskImageSpec {
    /// Format code passed to `hdiutil create -format`.
    pub fn hdiutil_format(&self) -> &'static str {
        if self.read_only {
            self.compression_format.hdiutil_code()
        } else {
            "UDRW"
        }
    }
}

/// Relative path under which staged content is rooted inside the image.
///
/// A leading `/` is dropped, so `/usr/local` and `usr/local` are equivalent.
/// Parent-directory components are rejected.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InstallPrefix(PathBuf);

impl InstallPrefix {
    /// Validates and normalizes a prefix.
    pub fn new(prefix: impl AsRef<Path>) -> std::result::Result<Self, ConfigError> {
        let mut normalized = PathBuf::new();
        for component in prefix.as_ref().components() {
            match component {
                Component::Normal(part) => normalized.push(part),
                Component::RootDir | Component::CurDir => {}
                Component::ParentDir | Component::Prefix(_) => {
                    return Err(ConfigError::InvalidValue {
                        field: "install_prefix",
                        reason: format!(
                            "'{}' must not contain '..' or a drive prefix",
                            prefix.as_ref().display()
                        ),
                    });
                }
            }
        }
        Ok(Self(normalized))
    }

    /// The normalized relative prefix (empty for the image root).
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// Returns `true` when content is staged at the image root.
    pub fn is_root(&self) -> bool {
        self.0.as_os_str().is_empty()
    }
}

/// Unresolved packaging configuration supplied by a driver.
///
/// Options can be set field by field or through the builder-style methods:
///
/// ```
/// use kodegen_bundler_dmg::bundler::GeneratorConfig;
///
/// let config = GeneratorConfig::new()
///     .volume_name("MyApp")
///     .output_path("dist/MyApp-1.0.0.dmg")
///     .compression_format("lzfse");
/// assert_eq!(config.volume_name.as_deref(), Some("MyApp"));
/// ```
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Label applied to the produced image. Required.
    pub volume_name: Option<String>,

    /// Final location of the image. Required.
    ///
    /// `.dmg` is appended when the path has a different extension.
    pub output_path: Option<PathBuf>,

    /// Compression name or hdiutil code.
    ///
    /// Default: `zlib` (UDZO)
    pub compression_format: Option<String>,

    /// Root under which staged content is placed inside the image.
    ///
    /// Default: the image root
    pub install_prefix: Option<PathBuf>,

    /// Produce a read-only image.
    ///
    /// Default: true
    pub read_only: Option<bool>,

    /// Add an `Applications -> /Applications` symlink for drag-to-install.
    ///
    /// Default: true
    pub applications_symlink: Option<bool>,

    /// Path to the `hdiutil` program.
    ///
    /// Default: looked up on `PATH`
    pub hdiutil: Option<PathBuf>,

    /// Kill `hdiutil` if it runs longer than this many seconds.
    ///
    /// Default: None (wait indefinitely)
    pub timeout_secs: Option<u64>,

    /// Directory in which the private staging directory is created.
    ///
    /// Default: the system temporary directory
    pub staging_root: Option<PathBuf>,

    /// Keep the staging directory after packaging, for debugging.
    ///
    /// Default: false
    pub keep_staging: bool,
}

impl GeneratorConfig {
    /// Creates an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the volume name.
    pub fn volume_name(mut self, name: impl Into<String>) -> Self {
        self.volume_name = Some(name.into());
        self
    }

    /// Sets the output image path.
    pub fn output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    /// Sets the compression format by name or hdiutil code.
    pub fn compression_format(mut self, format: impl Into<String>) -> Self {
        self.compression_format = Some(format.into());
        self
    }

    /// Sets the install prefix.
    pub fn install_prefix(mut self, prefix: impl Into<PathBuf>) -> Self {
        self.install_prefix = Some(prefix.into());
        self
    }

    /// Sets whether the image is read-only.
    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = Some(read_only);
        self
    }

    /// Enables or disables the `/Applications` symlink.
    pub fn applications_symlink(mut self, enabled: bool) -> Self {
        self.applications_symlink = Some(enabled);
        self
    }

    /// Uses an explicit `hdiutil` program instead of a `PATH` lookup.
    pub fn hdiutil(mut self, program: impl Into<PathBuf>) -> Self {
        self.hdiutil = Some(program.into());
        self
    }

    /// Sets the command timeout in seconds.
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Sets the directory the staging directory is created in.
    pub fn staging_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_root = Some(dir.into());
        self
    }

    /// Keeps the staging directory after packaging.
    pub fn keep_staging(mut self, keep: bool) -> Self {
        self.keep_staging = keep;
        self
    }

    /// Resolves relative host paths against `base`.
    ///
    /// `install_prefix` is a path inside the image and is left alone, as is an
    /// `hdiutil` value without a separator (a bare program name).
    fn rebase(&mut self, base: &Path) {
        let rebase = |p: &mut Option<PathBuf>| {
            if let Some(path) = p.as_mut()
                && path.is_relative()
            {
                *path = base.join(&*path);
            }
        };
        rebase(&mut self.output_path);
        rebase(&mut self.staging_root);
        if self
            .hdiutil
            .as_ref()
            .is_some_and(|p| p.components().count() > 1)
        {
            rebase(&mut self.hdiutil);
        }
    }
}

/// One `[[files]]` table in a packaging file.
#[derive(Clone, Debug, Deserialize)]
pub struct FileEntry {
    /// File or directory on the host.
    pub source: PathBuf,
    /// Path relative to the install prefix inside the image.
    pub destination: PathBuf,
}

/// A packaging file: generator selection, configuration, and manifest.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct PackagingFile {
    /// Registered generator name.
    ///
    /// Default: `DragNDrop`
    pub generator: Option<String>,

    /// Generator configuration.
    #[serde(flatten)]
    pub config: GeneratorConfig,

    /// Staged install tree whose contents are all packaged.
    pub install_tree: Option<PathBuf>,

    /// Explicit manifest entries, packaged after the install tree.
    pub files: Vec<FileEntry>,
}

impl PackagingFile {
    /// Reads and parses a packaging file, resolving relative paths against
    /// its parent directory.
    pub async fn load(path: &Path) -> Result<Self> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .fs_context("reading packaging file", path)?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Self::parse(&contents, path, base)
    }

    /// Parses packaging file contents. `origin` is only used in error messages.
    pub fn parse(contents: &str, origin: &Path, base: &Path) -> Result<Self> {
        let mut file: PackagingFile = toml::from_str(contents).map_err(|error| {
            Error::Config(ConfigError::Parse {
                path: origin.to_path_buf(),
                error,
            })
        })?;

        file.config.rebase(base);
        if let Some(tree) = file.install_tree.as_mut()
            && tree.is_relative()
        {
            *tree = base.join(&*tree);
        }
        for entry in &mut file.files {
            if entry.source.is_relative() {
                entry.source = base.join(&entry.source);
            }
        }
        Ok(file)
    }

    /// Builds the install manifest: the install tree (sorted) followed by the
    /// explicit `[[files]]` entries in file order.
    pub fn manifest(&self) -> Result<InstallManifest> {
        let mut manifest = match &self.install_tree {
            Some(tree) => InstallManifest::from_install_tree(tree)?,
            None => InstallManifest::new(),
        };
        for entry in &self.files {
            manifest.push(ManifestEntry::new(&entry.source, &entry.destination));
        }
        Ok(manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_parses_names_and_codes() {
        assert_eq!("zlib".parse::<DmgFormat>().unwrap(), DmgFormat::Zlib);
        assert_eq!("UDBZ".parse::<DmgFormat>().unwrap(), DmgFormat::Bzip2);
        assert_eq!("ulfo".parse::<DmgFormat>().unwrap(), DmgFormat::Lzfse);
        assert_eq!(" None ".parse::<DmgFormat>().unwrap(), DmgFormat::None);
        assert!("gzip".parse::<DmgFormat>().is_err());
    }

    #[test]
    fn test_default_format_is_udzo() {
        assert_eq!(DmgFormat::default().hdiutil_code(), "UDZO");
        assert_eq!(DmgFormat::default().image_key(), Some("zlib-level=9"));
    }

    #[test]
    fn test_read_write_spec_uses_udrw() {
        let spec = DiskImageSpec {
            volume_name: "MyApp".into(),
            compression_format: DmgFormat::None,
            output_path: PathBuf::from("/tmp/MyApp.dmg"),
            read_only: false,
        };
        assert_eq!(spec.hdiutil_format(), "UDRW");
    }

    #[test]
    fn test_install_prefix_normalizes_root() {
        let prefix = InstallPrefix::new("/usr/local/./bin").unwrap();
        assert_eq!(prefix.as_path(), Path::new("usr/local/bin"));
        assert!(InstallPrefix::new("/").unwrap().is_root());
        assert!(InstallPrefix::new("../escape").is_err());
    }

    #[test]
    fn test_packaging_file_rebases_paths() {
        let contents = r#"
            generator = "DragNDrop"
            volume_name = "MyApp"
            output_path = "dist/MyApp.dmg"
            install_prefix = "MyApp"
            hdiutil = "hdiutil"

            [[files]]
            source = "build/a.txt"
            destination = "bin/a.txt"

            [[files]]
            source = "/abs/b.txt"
            destination = "bin/b.txt"
        "#;
        let base = Path::new("/work/project");
        let file = PackagingFile::parse(contents, Path::new("dmg.toml"), base).unwrap();

        assert_eq!(file.generator.as_deref(), Some("DragNDrop"));
        assert_eq!(
            file.config.output_path.as_deref(),
            Some(Path::new("/work/project/dist/MyApp.dmg"))
        );
        assert_eq!(file.config.install_prefix.as_deref(), Some(Path::new("MyApp")));
        assert_eq!(file.config.hdiutil.as_deref(), Some(Path::new("hdiutil")));
        assert_eq!(file.files[0].source, Path::new("/work/project/build/a.txt"));
        assert_eq!(file.files[1].source, Path::new("/abs/b.txt"));

        let manifest = file.manifest().unwrap();
        assert_eq!(manifest.len(), 2);
    }

    #[test]
    fn test_packaging_file_parse_error_is_config_error() {
        let err = PackagingFile::parse("volume_name = [", Path::new("dmg.toml"), Path::new("."))
            .unwrap_err();
        assert_eq!(err.kind(), crate::bundler::ErrorKind::Config);
    }
}
