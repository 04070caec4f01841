//! Install manifests: what must appear inside the image, and where.

use crate::bundler::error::{ErrorExt, Result};
use std::path::{Path, PathBuf};

/// One source file (or directory) and its destination relative to the
/// install prefix.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ManifestEntry {
    /// Path on the host.
    pub source: PathBuf,
    /// Destination relative to the install prefix inside the image.
    pub destination: PathBuf,
}

impl ManifestEntry {
    /// Creates an entry.
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
        }
    }
}

/// Ordered list of entries to stage. Entries are copied in insertion order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InstallManifest {
    entries: Vec<ManifestEntry>,
}

impl InstallManifest {
    /// Creates an empty manifest.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry.
    pub fn push(&mut self, entry: ManifestEntry) {
        self.entries.push(entry);
    }

    /// Builder-style [`push`](Self::push).
    pub fn with_entry(mut self, source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        self.push(ManifestEntry::new(source, destination));
        self
    }

    /// Collects every file and symlink below `root`, in sorted path order,
    /// with destinations relative to `root`.
    ///
    /// Directories themselves are not listed; they are recreated from the
    /// destinations of the files they contain. Empty directories are dropped.
    pub fn from_install_tree(root: &Path) -> Result<Self> {
        let metadata = std::fs::metadata(root).fs_context("reading install tree", root)?;
        if !metadata.is_dir() {
            crate::bail!("install tree {} is not a directory", root.display());
        }

        let mut entries = Vec::new();
        for entry in walkdir::WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
        {
            let entry = entry?;
            if entry.file_type().is_dir() {
                continue;
            }
            let relative = entry.path().strip_prefix(root)?.to_path_buf();
            entries.push(ManifestEntry::new(entry.path(), relative));
        }

        log::debug!(
            "Collected {} entries from install tree {}",
            entries.len(),
            root.display()
        );
        Ok(Self { entries })
    }

    /// Entries in staging order.
    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there is nothing to stage.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preserves_insertion_order() {
        let manifest = InstallManifest::new()
            .with_entry("b.txt", "bin/b.txt")
            .with_entry("a.txt", "bin/a.txt");
        let destinations: Vec<_> = manifest.entries().iter().map(|e| &e.destination).collect();
        assert_eq!(destinations, [Path::new("bin/b.txt"), Path::new("bin/a.txt")]);
    }

    #[test]
    fn test_install_tree_is_sorted_and_relative() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        std::fs::create_dir_all(root.join("bin")).unwrap();
        std::fs::create_dir_all(root.join("share/doc")).unwrap();
        std::fs::create_dir_all(root.join("empty")).unwrap();
        std::fs::write(root.join("share/doc/README"), "docs").unwrap();
        std::fs::write(root.join("bin/tool"), "bin").unwrap();
        std::fs::write(root.join("LICENSE"), "mit").unwrap();

        let manifest = InstallManifest::from_install_tree(root).unwrap();
        let destinations: Vec<_> = manifest
            .entries()
            .iter()
            .map(|e| e.destination.clone())
            .collect();
        assert_eq!(
            destinations,
            [
                PathBuf::from("LICENSE"),
                PathBuf::from("bin/tool"),
                PathBuf::from("share/doc/README"),
            ]
        );
        assert_eq!(manifest.entries()[1].source, root.join("bin/tool"));
    }

    #[test]
    fn test_missing_install_tree_is_io_error() {
        let err = InstallManifest::from_install_tree(Path::new("/nonexistent/install/tree"))
            .unwrap_err();
        assert_eq!(err.kind(), crate::bundler::ErrorKind::Io);
    }

    #[test]
    fn test_file_as_install_tree_rejected() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let err = InstallManifest::from_install_tree(tmp.path()).unwrap_err();
        assert!(err.to_string().contains("is not a directory"));
    }
}
