//! File system utilities for staging.
//!
//! Provides file operations with automatic directory creation, symlink
//! preservation, and path-carrying errors.

use crate::bundler::error::{Error, ErrorExt, Result};
use std::{io, path::Path};
use tokio::fs;

/// Creates all of the directories of the specified path.
pub async fn create_dir_all(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .await
        .fs_context("creating directory", path)
}

/// Removes a file if it exists.
pub async fn remove_file_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).fs_context("removing stale file", path),
    }
}

/// Makes a symbolic link.
#[cfg(unix)]
pub fn symlink(src: &Path, dst: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(src, dst)
}

/// Makes a symbolic link to a directory.
#[cfg(windows)]
pub fn symlink(src: &Path, dst: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_dir(src, dst)
}

/// Copies a regular file from one path to another, creating any parent
/// directories of the destination path as necessary.
///
/// Content and permission bits are copied. An existing destination is
/// overwritten. Fails if the source path is a directory or can't be read.
pub async fn copy_file(from: &Path, to: &Path) -> Result<()> {
    let metadata = fs::metadata(from)
        .await
        .fs_context("reading source file", from)?;
    if !metadata.is_file() {
        return Err(Error::Fs {
            context: "reading source file",
            path: from.to_path_buf(),
            error: io::Error::new(io::ErrorKind::InvalidInput, "not a regular file"),
        });
    }
    if let Some(dest_dir) = to.parent() {
        fs::create_dir_all(dest_dir)
            .await
            .fs_context("creating destination directory", dest_dir)?;
    }
    // fs::copy follows a symlink at the destination; replace it instead.
    if fs::symlink_metadata(to)
        .await
        .is_ok_and(|m| m.file_type().is_symlink())
    {
        fs::remove_file(to)
            .await
            .fs_context("replacing destination symlink", to)?;
    }
    fs::copy(from, to).await.fs_context("writing destination file", to)?;
    Ok(())
}

/// Recreates the symlink at `from` as `to`, pointing at the same target.
///
/// The link is not followed, so dangling links are copied as-is. Any file or
/// link already at `to` is replaced.
pub async fn copy_symlink(from: &Path, to: &Path) -> Result<()> {
    let target = fs::read_link(from)
        .await
        .fs_context("reading symlink", from)?;
    if let Some(dest_dir) = to.parent() {
        fs::create_dir_all(dest_dir)
            .await
            .fs_context("creating destination directory", dest_dir)?;
    }
    remove_file_if_exists(to).await?;
    symlink(&target, to).fs_context("creating symlink", to)
}

/// Recursively copies a directory from one path to another, creating any
/// parent directories of the destination path as necessary.
///
/// Preserves symlinks on platforms that support them, including a symlinked
/// `from` itself. Existing files in the destination are overwritten.
pub async fn copy_dir(from: &Path, to: &Path) -> Result<()> {
    let metadata = fs::symlink_metadata(from)
        .await
        .fs_context("reading source directory", from)?;
    if metadata.file_type().is_symlink() {
        return copy_symlink(from, to).await;
    }
    if !metadata.is_dir() {
        return Err(Error::Fs {
            context: "reading source directory",
            path: from.to_path_buf(),
            error: io::Error::new(io::ErrorKind::InvalidInput, "not a directory"),
        });
    }
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)
            .await
            .fs_context("creating destination directory", parent)?;
    }

    for entry in walkdir::WalkDir::new(from) {
        let entry = entry?;
        let rel_path = entry.path().strip_prefix(from)?;
        let dest_path = to.join(rel_path);

        if entry.file_type().is_symlink() {
            copy_symlink(entry.path(), &dest_path).await?;
        } else if entry.file_type().is_dir() {
            fs::create_dir_all(&dest_path)
                .await
                .fs_context("creating directory", &dest_path)?;
        } else {
            copy_file(entry.path(), &dest_path).await?;
        }
    }

    Ok(())
}
