//! # File Management Module
//!
//! Discovery types and extension-based classification.
//!
//! ## Responsibilities:
//! - `FileEntry`: one item found while walking the source tree
//! - `MediaKind`: closed classification {Image, Video, Other}
//! - Human-readable sizes and reduction percentages for the run summary
//!
//! ## Supported formats:
//! - **Images**: JPG, JPEG, PNG, WebP, GIF, BMP, TIFF, HEIC/HEIF
//! - **Video**: MP4, M4V, MOV, AVI, MKV, WebM, WMV, FLV, MPEG, 3GP, MTS/M2TS
//!
//! Classification looks at the extension only (case-insensitive); file
//! contents are never inspected.
//!
//! ## Example:
//! ```rust
//! use media_mirror::file_manager::MediaKind;
//!
//! assert_eq!(MediaKind::from_extension(Some("JPG")), MediaKind::Image);
//! assert_eq!(MediaKind::from_extension(Some("txt")), MediaKind::Other);
//! ```

use crate::error::ShrinkError;
use std::path::{Path, PathBuf};
use walkdir::DirEntry;

/// Extensions handed to the image transcoder
pub const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "webp", "gif", "bmp", "tif", "tiff", "heic", "heif",
];

/// Extensions handed to the video transcoder
pub const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "m4v", "mov", "avi", "mkv", "webm", "wmv", "flv", "mpg", "mpeg", "3gp", "mts", "m2ts",
];

/// What the walker does with a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Image,
    Video,
    Other,
}

impl MediaKind {
    /// Classify a (possibly missing) extension, ignoring case.
    pub fn from_extension(extension: Option<&str>) -> Self {
        let Some(ext) = extension else {
            return Self::Other;
        };
        let ext = ext.to_ascii_lowercase();

        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Self::Image
        } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Self::Video
        } else {
            Self::Other
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Other => "file",
        }
    }
}

/// Kind of a discovered filesystem item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    File,
    /// Sockets, devices, dangling links and links to directories
    Other,
}

/// A filesystem item found under the source root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Absolute path inside the source tree
    pub path: PathBuf,
    /// Path relative to the source root
    pub relative: PathBuf,
    pub kind: EntryKind,
    /// Lower-cased extension, if any
    pub extension: Option<String>,
    /// Size in bytes (0 for directories)
    pub size: u64,
}

impl FileEntry {
    /// Build an entry from a `walkdir` item discovered under `root`.
    pub fn from_dir_entry(entry: &DirEntry, root: &Path) -> Result<Self, ShrinkError> {
        let file_type = entry.file_type();
        let (kind, size) = if file_type.is_dir() {
            (EntryKind::Directory, 0)
        } else if file_type.is_file() {
            (EntryKind::File, entry.metadata()?.len())
        } else if file_type.is_symlink() {
            // links to regular files are mirrored as the file they point to
            match std::fs::metadata(entry.path()) {
                Ok(target) if target.is_file() => (EntryKind::File, target.len()),
                _ => (EntryKind::Other, 0),
            }
        } else {
            (EntryKind::Other, 0)
        };

        let relative = entry
            .path()
            .strip_prefix(root)
            .map_err(|_| {
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("{} is outside {}", entry.path().display(), root.display()),
                )
            })?
            .to_path_buf();

        Ok(Self {
            path: entry.path().to_path_buf(),
            relative,
            kind,
            extension: entry
                .path()
                .extension()
                .map(|e| e.to_string_lossy().to_lowercase()),
            size,
        })
    }

    /// Classification of this entry; directories and special files are `Other`.
    pub fn classify(&self) -> MediaKind {
        match self.kind {
            EntryKind::File => MediaKind::from_extension(self.extension.as_deref()),
            _ => MediaKind::Other,
        }
    }
}

/// Helpers for sizes shown in the run summary
pub struct FileManager;

impl FileManager {
    /// Get human-readable file size
    pub fn format_size(size: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = size as f64;
        let mut unit_index = 0;

        while size >= 1024.0 && unit_index < UNITS.len() - 1 {
            size /= 1024.0;
            unit_index += 1;
        }

        if unit_index == 0 {
            format!("{} {}", size as u64, UNITS[unit_index])
        } else {
            format!("{:.2} {}", size, UNITS[unit_index])
        }
    }

    /// Calculate percentage reduction
    pub fn calculate_reduction(original_size: u64, new_size: u64) -> f64 {
        if original_size == 0 {
            0.0
        } else {
            ((original_size as f64 - new_size as f64) / original_size as f64) * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use walkdir::WalkDir;

    #[test]
    fn test_classification_ignores_case() {
        assert_eq!(MediaKind::from_extension(Some("jpg")), MediaKind::Image);
        assert_eq!(MediaKind::from_extension(Some("JPEG")), MediaKind::Image);
        assert_eq!(MediaKind::from_extension(Some("HeIc")), MediaKind::Image);
        assert_eq!(MediaKind::from_extension(Some("MOV")), MediaKind::Video);
        assert_eq!(MediaKind::from_extension(Some("mkv")), MediaKind::Video);
    }

    #[test]
    fn test_unknown_or_missing_extension_is_other() {
        assert_eq!(MediaKind::from_extension(Some("txt")), MediaKind::Other);
        assert_eq!(MediaKind::from_extension(Some("")), MediaKind::Other);
        assert_eq!(MediaKind::from_extension(None), MediaKind::Other);
        assert_eq!(MediaKind::from_extension(Some("gz")), MediaKind::Other);
    }

    #[test]
    fn test_entries_from_walk() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        std::fs::create_dir_all(root.join("2023/summer")).unwrap();
        std::fs::write(root.join("2023/summer/IMG_0001.JPG"), b"jpeg").unwrap();

        let entries: Vec<FileEntry> = WalkDir::new(root)
            .min_depth(1)
            .into_iter()
            .map(|e| FileEntry::from_dir_entry(&e.unwrap(), root).unwrap())
            .collect();

        let photo = entries
            .iter()
            .find(|e| e.kind == EntryKind::File)
            .unwrap();
        assert_eq!(photo.relative, PathBuf::from("2023/summer/IMG_0001.JPG"));
        assert_eq!(photo.extension.as_deref(), Some("jpg"));
        assert_eq!(photo.size, 4);
        assert_eq!(photo.classify(), MediaKind::Image);

        let dirs = entries.iter().filter(|e| e.kind == EntryKind::Directory).count();
        assert_eq!(dirs, 2);
        assert!(entries
            .iter()
            .filter(|e| e.kind == EntryKind::Directory)
            .all(|e| e.classify() == MediaKind::Other));
    }

    #[cfg(unix)]
    #[test]
    fn test_links_to_files_are_files() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        std::fs::write(root.join("real.txt"), b"twelve bytes").unwrap();
        std::fs::create_dir(root.join("album")).unwrap();
        std::os::unix::fs::symlink(root.join("real.txt"), root.join("link.txt")).unwrap();
        std::os::unix::fs::symlink(root.join("album"), root.join("album_link")).unwrap();
        std::os::unix::fs::symlink(root.join("gone.txt"), root.join("dangling.txt")).unwrap();

        let entry = |name: &str| {
            WalkDir::new(root)
                .min_depth(1)
                .into_iter()
                .map(|e| e.unwrap())
                .find(|e| e.file_name() == name)
                .map(|e| FileEntry::from_dir_entry(&e, root).unwrap())
                .unwrap()
        };

        let link = entry("link.txt");
        assert_eq!(link.kind, EntryKind::File);
        assert_eq!(link.size, 12);
        assert_eq!(link.relative, PathBuf::from("link.txt"));

        assert_eq!(entry("album_link").kind, EntryKind::Other);
        assert_eq!(entry("dangling.txt").kind, EntryKind::Other);
    }

    #[test]
    fn test_format_size() {
        assert_eq!(FileManager::format_size(512), "512 B");
        assert_eq!(FileManager::format_size(1536), "1.50 KB");
        assert_eq!(FileManager::format_size(5 * 1024 * 1024), "5.00 MB");
    }

    #[test]
    fn test_calculate_reduction() {
        assert_eq!(FileManager::calculate_reduction(0, 10), 0.0);
        assert_eq!(FileManager::calculate_reduction(200, 50), 75.0);
    }
}
