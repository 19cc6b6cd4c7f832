//! # Media Mirror Library
//!
//! Rebuilds a directory tree under a new root: images and videos are shrunk
//! to fit within 1920×1080 by external tools, everything else is copied byte
//! for byte, and every file keeps its source timestamps.
//!
//! ## Architettura dei moduli:
//! - `walker`: traversal and per-file orchestration
//! - `config`: run parameters and validation
//! - `error`: error taxonomy
//! - `file_manager`: entries, media classification, size formatting
//! - `path_resolver`: source → destination path mapping
//! - `resize`: fit-within arithmetic and tool geometry strings
//! - `image_processor`: ImageMagick invocation
//! - `video_processor`: ffmpeg/ffprobe invocation
//! - `command`: external process runner with timeouts
//! - `platform`: tool discovery on `PATH`
//! - `timestamps`: capture and apply of file times
//! - `progress`: spinner and run statistics
//!
//! ## Utilizzo:
//! ```rust,no_run
//! # async fn example() -> Result<(), media_mirror::ShrinkError> {
//! use media_mirror::{Config, MirrorWalker};
//! use std::path::Path;
//!
//! let mut walker = MirrorWalker::new(Path::new("src"), Path::new("dest"), Config::default()).await?;
//! let stats = walker.run().await?;
//! assert!(!stats.has_failures());
//! # Ok(())
//! # }
//! ```

pub mod command;
pub mod config;
pub mod error;
pub mod file_manager;
pub mod image_processor;
pub mod path_resolver;
pub mod platform;
pub mod progress;
pub mod resize;
pub mod timestamps;
pub mod video_processor;
pub mod walker;

pub use config::Config;
pub use error::ShrinkError;
pub use file_manager::{EntryKind, FileEntry, MediaKind};
pub use progress::{ProgressManager, RunStats};
pub use resize::ResizeBound;
pub use timestamps::TimestampPair;
pub use walker::{FileOutcome, MirrorWalker};
