//! # Path Resolution Module
//!
//! Maps entries of the source tree onto the destination tree and decides the
//! output extension of every file.
//!
//! ## Output extensions
//! - Images keep their extension; HEIC/HEIF become `jpg`
//! - Videos keep `mp4`, `m4v` and `mov`; every other container becomes `mp4`
//! - Other files keep their name untouched
//!
//! Kept extensions keep their original spelling (`IMG_0001.JPG` stays upper case).

use crate::error::ShrinkError;
use crate::file_manager::{FileEntry, MediaKind};
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Mirrors source-relative paths into the destination root
#[derive(Debug, Clone)]
pub struct PathResolver {
    source_root: PathBuf,
    destination_root: PathBuf,
}

impl PathResolver {
    /// Both roots are expected to be canonical.
    pub fn new(source_root: PathBuf, destination_root: PathBuf) -> Self {
        Self {
            source_root,
            destination_root,
        }
    }

    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    pub fn destination_root(&self) -> &Path {
        &self.destination_root
    }

    /// Destination directory mirroring a source directory entry.
    pub fn mirror_dir(&self, entry: &FileEntry) -> PathBuf {
        self.destination_root.join(&entry.relative)
    }

    /// Destination file for a source file of the given kind.
    pub fn output_path(&self, entry: &FileEntry, kind: MediaKind) -> PathBuf {
        let mut output = self.destination_root.join(&entry.relative);
        if let Some(extension) = output_extension(kind, entry.extension.as_deref()) {
            output.set_extension(extension);
        }
        debug!("Resolved output path: {} -> {}", entry.path.display(), output.display());
        output
    }
}

/// Replacement extension for a file, `None` when the name is kept as is.
pub fn output_extension(kind: MediaKind, extension: Option<&str>) -> Option<&'static str> {
    let extension = extension.map(|e| e.to_ascii_lowercase());
    match (kind, extension.as_deref()) {
        (MediaKind::Image, Some("heic" | "heif")) => Some("jpg"),
        (MediaKind::Video, Some("mp4" | "m4v" | "mov")) => None,
        (MediaKind::Video, _) => Some("mp4"),
        _ => None,
    }
}

/// Whether `path` is `root` or lies below it. Both must be canonical.
pub fn is_within(path: &Path, root: &Path) -> bool {
    path.starts_with(root)
}

/// Canonicalize a path that may not exist yet.
///
/// The deepest existing ancestor is canonicalized and the missing tail is
/// appended, so the result can be compared against canonical roots before
/// anything is created.
pub fn canonicalize_lenient(path: &Path) -> Result<PathBuf, ShrinkError> {
    let mut missing = Vec::new();
    let mut cursor = if path.as_os_str().is_empty() {
        Path::new(".")
    } else {
        path
    };

    loop {
        match cursor.canonicalize() {
            Ok(base) => {
                return Ok(missing.iter().rev().fold(base, |acc: PathBuf, part| acc.join(part)));
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                let name = match cursor.components().next_back() {
                    Some(Component::Normal(name)) => name.to_os_string(),
                    _ => return Err(e.into()),
                };
                missing.push(name);
                cursor = match cursor.parent() {
                    Some(parent) if !parent.as_os_str().is_empty() => parent,
                    _ => Path::new("."),
                };
            }
            Err(e) => return Err(e.into()),
        }
    }
}
