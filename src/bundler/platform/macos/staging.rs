//! Private staging directory for DMG contents.
//!
//! Every `package_files` call gets its own [`StagingArea`], backed by a
//! `tempfile::TempDir`. Manifest entries are copied beneath the install prefix,
//! and the directory is removed when the area is dropped unless it was
//! explicitly kept.

use crate::bundler::{
    error::{ConfigError, Error, ErrorExt, Result},
    manifest::ManifestEntry,
    settings::InstallPrefix,
    utils::fs,
};
use std::path::{Component, Path, PathBuf};

const APPLICATIONS: &str = "Applications";

/// Staging directory owned by a single packaging run.
#[derive(Debug)]
pub struct StagingArea {
    dir: tempfile::TempDir,
    content_root: PathBuf,
}

impl StagingArea {
    /// Creates a fresh staging directory inside `parent` (or the system temp
    /// directory) and the install prefix below it.
    pub async fn create(parent: Option<&Path>, prefix: &InstallPrefix) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("dmg-staging-");
        let dir = match parent {
            Some(parent) => {
                fs::create_dir_all(parent).await?;
                builder
                    .tempdir_in(parent)
                    .fs_context("creating staging directory in", parent)?
            }
            None => builder
                .tempdir()
                .fs_context("creating staging directory in", std::env::temp_dir())?,
        };

        let content_root = dir.path().join(prefix.as_path());
        fs::create_dir_all(&content_root).await?;

        log::debug!("Created staging directory {}", dir.path().display());
        Ok(Self { dir, content_root })
    }

    /// Root of the staging directory; this becomes the image root.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Absolute path inside the staging directory for a manifest destination.
    ///
    /// A leading `/` is ignored; `..` components are rejected.
    pub fn destination_for(&self, relative: &Path) -> Result<PathBuf> {
        let mut path = self.content_root.clone();
        for component in relative.components() {
            match component {
                Component::Normal(part) => path.push(part),
                Component::RootDir | Component::CurDir => {}
                Component::ParentDir | Component::Prefix(_) => {
                    return Err(Error::InvalidDestination(relative.to_path_buf()));
                }
            }
        }
        if path == self.content_root {
            return Err(Error::InvalidDestination(relative.to_path_buf()));
        }
        Ok(path)
    }

    /// Copies one manifest entry into place.
    pub async fn stage(&self, entry: &ManifestEntry) -> Result<PathBuf> {
        let destination = self.destination_for(&entry.destination)?;
        copy_entry(&entry.source, &destination).await?;
        Ok(destination)
    }

    /// Where the `Applications` symlink goes.
    pub fn applications_link(&self) -> PathBuf {
        self.path().join(APPLICATIONS)
    }

    /// Fails if any entry would be staged at or below the `Applications`
    /// symlink. Checked before copying so nothing is staged in vain.
    pub fn reserve_applications_link(&self, entries: &[ManifestEntry]) -> Result<()> {
        let link = self.applications_link();
        for entry in entries {
            if self.destination_for(&entry.destination)?.starts_with(&link) {
                return Err(ConfigError::InvalidValue {
                    field: "applications_symlink",
                    reason: format!(
                        "manifest destination {} collides with the Applications symlink; \
                         set applications_symlink = false or use an install prefix",
                        entry.destination.display()
                    ),
                }
                .into());
            }
        }
        Ok(())
    }

    /// Adds an `Applications -> /Applications` symlink at the image root.
    #[cfg(unix)]
    pub fn link_applications(&self) -> Result<()> {
        let link = self.applications_link();
        fs::symlink(Path::new("/Applications"), &link)
            .fs_context("creating Applications symlink", &link)
    }

    /// Adds an `Applications -> /Applications` symlink at the image root.
    #[cfg(not(unix))]
    pub fn link_applications(&self) -> Result<()> {
        log::warn!("Skipping Applications symlink: symlinks unsupported on this host");
        Ok(())
    }

    /// Keeps the directory on disk after this area is dropped.
    pub fn keep(self) -> PathBuf {
        self.dir.keep()
    }

    /// Removes the directory now, reporting any failure.
    pub fn close(self) -> Result<()> {
        let path = self.dir.path().to_path_buf();
        self.dir
            .close()
            .fs_context("removing staging directory", path)
    }
}

/// Copies `source` to `destination`, creating parent directories as needed.
///
/// Files keep their permission bits; directories are copied recursively.
/// A symlink source is recreated as a link (never followed), so framework
/// layouts like `Versions/Current -> A` survive and dangling links are kept.
/// Re-copying over an existing destination overwrites it.
pub async fn copy_entry(source: &Path, destination: &Path) -> Result<()> {
    let metadata = tokio::fs::symlink_metadata(source)
        .await
        .fs_context("reading staged source", source)?;

    log::debug!("Staging {} -> {}", source.display(), destination.display());
    if metadata.file_type().is_symlink() {
        fs::copy_symlink(source, destination).await
    } else if metadata.is_dir() {
        fs::copy_dir(source, destination).await
    } else {
        fs::copy_file(source, destination).await
    }
}
