//! # Error Types Module
//!
//! Defines `ShrinkError`, the error taxonomy of a mirroring run.
//!
//! ## Categories:
//! - **Fatal** (the run cannot start): `SourceNotFound`, `SourceNotDirectory`,
//!   `DestinationInsideSource`, `DestinationUnwritable`, `Config`
//! - **Per file** (reported, the walk continues): `TranscodeFailure`,
//!   `TimestampApplyFailure`, `Unsupported`, `Io`, `Walk`
//! - **Internal**: `Tool` and `Image`, raised while talking to external
//!   programs or probing headers; the processors wrap them into
//!   `TranscodeFailure` with the offending path.
//!
//! ## Example:
//! ```rust
//! use media_mirror::ShrinkError;
//! use std::path::PathBuf;
//!
//! let err = ShrinkError::SourceNotFound(PathBuf::from("/missing"));
//! assert!(err.is_fatal());
//! ```

use std::path::PathBuf;

/// Errors raised while mirroring a media tree
#[derive(thiserror::Error, Debug)]
pub enum ShrinkError {
    #[error("Source directory does not exist: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("Source is not a directory: {}", .0.display())]
    SourceNotDirectory(PathBuf),

    #[error(
        "Destination {} is inside source {}",
        .destination.display(),
        .source_root.display()
    )]
    DestinationInsideSource {
        source_root: PathBuf,
        destination: PathBuf,
    },

    #[error("Destination is not writable: {}: {source}", .path.display())]
    DestinationUnwritable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Transcoding failed for {}: {diagnostic}", .path.display())]
    TranscodeFailure { path: PathBuf, diagnostic: String },

    #[error("Could not apply timestamps to {}: {reason}", .path.display())]
    TimestampApplyFailure { path: PathBuf, reason: String },

    #[error("Not a regular file, directory or link to a file: {}", .0.display())]
    Unsupported(PathBuf),

    #[error("{tool}: {message}")]
    Tool { tool: String, message: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image probing error: {0}")]
    Image(#[from] image::ImageError),
}

impl ShrinkError {
    /// Build a `TranscodeFailure` for `path` from any displayable cause.
    pub fn transcode(path: impl Into<PathBuf>, diagnostic: impl ToString) -> Self {
        Self::TranscodeFailure {
            path: path.into(),
            diagnostic: diagnostic.to_string(),
        }
    }

    /// Build a `TimestampApplyFailure` for `path`.
    pub fn timestamp(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::TimestampApplyFailure {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether this error stops the whole run rather than a single entry.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::SourceNotFound(_)
                | Self::SourceNotDirectory(_)
                | Self::DestinationInsideSource { .. }
                | Self::DestinationUnwritable { .. }
                | Self::Config(_)
        )
    }
}
