//! # Mirror Walker Module
//!
//! Walks the source tree and rebuilds it under the destination root, one
//! entry at a time.
//!
//! ## Flusso per file:
//! 1. Capture the source timestamps
//! 2. Classify by extension (image / video / other)
//! 3. Produce the output into a hidden temporary file next to its final path
//!    (transcode, or byte-for-byte copy)
//! 4. Reject empty transcoder output; publish the original instead when the
//!    source already fits the bound and the transcode did not shrink it
//! 5. Copy permissions, rename over the final path, apply the timestamps
//!
//! Directories are yielded after their contents, so a directory's own
//! modification time is applied once nothing else will be written into it.
//!
//! ## Errori:
//! Problems with the roots abort the run before anything is written. Any
//! failure while handling one entry is logged with its path, counted in
//! `RunStats::failed`, and the walk continues. A failed file leaves no file
//! under its final destination name.
//!
//! ## Esempio:
//! ```rust,no_run
//! # async fn example() -> Result<(), media_mirror::ShrinkError> {
//! use media_mirror::{Config, MirrorWalker};
//! use std::path::Path;
//!
//! let mut walker = MirrorWalker::new(Path::new("/media/camera"), Path::new("/sync/camera"), Config::default()).await?;
//! let stats = walker.run().await?;
//! println!("{}", stats.format_summary());
//! # Ok(())
//! # }
//! ```

use crate::{
    config::Config,
    error::ShrinkError,
    file_manager::{EntryKind, FileEntry, FileManager, MediaKind},
    image_processor::ImageProcessor,
    path_resolver::{self, PathResolver},
    platform::{ExternalTools, SystemInfo},
    progress::{ProgressManager, RunStats},
    timestamps::TimestampPair,
    video_processor::VideoProcessor,
};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

/// What happened to one file
#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome {
    /// Shrunk by an external transcoder
    Transcoded {
        kind: MediaKind,
        original_size: u64,
        new_size: u64,
    },
    /// Media published unchanged because transcoding did not pay off
    KeptOriginal { kind: MediaKind, size: u64 },
    /// Non-media (or empty) file copied byte for byte
    Copied { size: u64 },
}

/// Mirrors a source tree into a destination tree
#[derive(Debug)]
pub struct MirrorWalker {
    config: Config,
    paths: PathResolver,
    image_processor: ImageProcessor,
    video_processor: VideoProcessor,
    progress: ProgressManager,
    /// Outputs written during this run, to report name collisions
    produced: HashSet<PathBuf>,
}

impl MirrorWalker {
    /// Validate the roots and prepare a run.
    ///
    /// # Errors
    /// - `Config` for an invalid configuration
    /// - `SourceNotFound` / `SourceNotDirectory` for a bad source root
    /// - `DestinationInsideSource` when the destination would be walked too
    /// - `DestinationUnwritable` when the destination cannot be created or written
    pub async fn new(source: &Path, destination: &Path, config: Config) -> Result<Self, ShrinkError> {
        Self::with_tools(source, destination, config, ExternalTools::discover()).await
    }

    /// Like [`MirrorWalker::new`] with an explicit tool set.
    pub async fn with_tools(
        source: &Path,
        destination: &Path,
        config: Config,
        tools: ExternalTools,
    ) -> Result<Self, ShrinkError> {
        config
            .validate()
            .map_err(|e| ShrinkError::Config(e.to_string()))?;

        let source_root = match source.canonicalize() {
            Ok(path) => path,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ShrinkError::SourceNotFound(source.to_path_buf()))
            }
            Err(e) => return Err(e.into()),
        };
        if !source_root.is_dir() {
            return Err(ShrinkError::SourceNotDirectory(source.to_path_buf()));
        }

        let unwritable = |source: std::io::Error| ShrinkError::DestinationUnwritable {
            path: destination.to_path_buf(),
            source,
        };

        let destination_root = match path_resolver::canonicalize_lenient(destination) {
            Ok(path) => path,
            Err(ShrinkError::Io(e)) => return Err(unwritable(e)),
            Err(e) => return Err(e),
        };
        if path_resolver::is_within(&destination_root, &source_root) {
            return Err(ShrinkError::DestinationInsideSource {
                source_root,
                destination: destination_root,
            });
        }

        tokio::fs::create_dir_all(&destination_root)
            .await
            .map_err(unwritable)?;
        if !destination_root.is_dir() {
            return Err(unwritable(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                "not a directory",
            )));
        }
        tempfile::tempfile_in(&destination_root).map_err(unwritable)?;

        debug!("Running on {}", SystemInfo::current());
        for missing in tools.missing() {
            warn!("{} not found on PATH, matching files will fail", missing);
        }
        if let Ok(json) = serde_json::to_string(&config) {
            debug!("Configuration: {}", json);
        }

        Ok(Self {
            image_processor: ImageProcessor::new(config.clone(), tools.clone()),
            video_processor: VideoProcessor::new(config.clone(), tools),
            config,
            paths: PathResolver::new(source_root, destination_root),
            progress: ProgressManager::hidden(),
            produced: HashSet::new(),
        })
    }

    /// Replace the (hidden) progress display.
    pub fn with_progress(mut self, progress: ProgressManager) -> Self {
        self.progress = progress;
        self
    }

    pub fn source_root(&self) -> &Path {
        self.paths.source_root()
    }

    pub fn destination_root(&self) -> &Path {
        self.paths.destination_root()
    }

    /// Lazily walk the source tree.
    ///
    /// Siblings come in name order and directories after their contents.
    /// Links to regular files come back as files; links to directories are
    /// not descended into and, like dangling links, are `EntryKind::Other`.
    pub fn walk(&self) -> impl Iterator<Item = Result<FileEntry, ShrinkError>> {
        let root = self.paths.source_root().to_path_buf();
        WalkDir::new(&root)
            .min_depth(1)
            .follow_links(false)
            .contents_first(true)
            .sort_by_file_name()
            .into_iter()
            .map(move |entry| FileEntry::from_dir_entry(&entry?, &root))
    }

    /// Classify an entry: pure function of its kind and extension.
    pub fn classify(entry: &FileEntry) -> MediaKind {
        entry.classify()
    }

    /// Mirror the whole tree.
    ///
    /// Only errors that make the run impossible are returned; per-entry
    /// failures are counted in the returned stats.
    pub async fn run(&mut self) -> Result<RunStats, ShrinkError> {
        self.progress.suspend(|| {
            info!(
                "Mirroring {} -> {}",
                self.paths.source_root().display(),
                self.paths.destination_root().display()
            );
            info!(
                "Bound: {}x{} (CRF {}, image quality {})",
                self.config.bound.long_edge,
                self.config.bound.short_edge,
                self.config.video_crf,
                self.config.image_quality
            );
        });

        let mut stats = RunStats::new();
        self.produced.clear();

        for item in self.walk() {
            let entry = match item {
                Ok(entry) => entry,
                Err(e) => {
                    self.progress.suspend(|| error!("❌ {}", e));
                    stats.add_failure();
                    continue;
                }
            };

            self.process_entry(&entry, &mut stats).await;
            self.progress.advance();
        }

        let summary = stats.format_summary();
        // finished bar no longer redraws, plain logging is safe from here
        self.progress.finish(&summary);
        info!("=== Mirror Complete ===");
        info!("{}", summary);
        if stats.has_failures() {
            warn!("{} entries failed, see errors above", stats.failed);
        }

        Ok(stats)
    }

    async fn process_entry(&mut self, entry: &FileEntry, stats: &mut RunStats) {
        match entry.kind {
            EntryKind::Directory => match self.process_directory(entry).await {
                Ok(()) => stats.add_directory(),
                Err(e) => {
                    self.progress.suspend(|| error!("❌ {}: {}", entry.relative.display(), e));
                    stats.add_failure();
                }
            },
            EntryKind::Other => {
                let e = ShrinkError::Unsupported(entry.path.clone());
                self.progress.suspend(|| error!("❌ {}", e));
                stats.add_failure();
            }
            EntryKind::File => {
                let kind = entry.classify();
                self.progress.start(kind, &entry.relative.to_string_lossy());

                match self.process_file(entry).await {
                    Ok(outcome) => {
                        self.progress.suspend(|| log_outcome(entry, &outcome));
                        match outcome {
                            FileOutcome::Transcoded {
                                kind,
                                original_size,
                                new_size,
                            } => stats.add_transcoded(kind, original_size, new_size),
                            FileOutcome::KeptOriginal { size, .. } => stats.add_kept_original(size),
                            FileOutcome::Copied { size } => stats.add_copied(size),
                        }
                    }
                    Err(e) => {
                        self.progress
                            .suspend(|| error!("❌ {}: {}", entry.relative.display(), e));
                        stats.add_failure();
                    }
                }
            }
        }
    }

    /// Ensure the mirrored directory exists and carries the source's mtime.
    ///
    /// Called after the directory's contents; a timestamp failure is only a
    /// warning since writing into the directory later would reset it anyway.
    async fn process_directory(&self, entry: &FileEntry) -> Result<(), ShrinkError> {
        let mirrored = self.paths.mirror_dir(entry);
        tokio::fs::create_dir_all(&mirrored).await?;

        if let Err(e) = TimestampPair::capture(&entry.path).and_then(|t| t.apply_to_dir(&mirrored)) {
            self.progress
                .suspend(|| warn!("Directory timestamps not preserved: {}", e));
        }
        Ok(())
    }

    /// Produce the destination file for one source file.
    pub async fn process_file(&mut self, entry: &FileEntry) -> Result<FileOutcome, ShrinkError> {
        let timestamps = TimestampPair::capture(&entry.path)?;

        let mut kind = entry.classify();
        if kind != MediaKind::Other && entry.size == 0 {
            self.progress
                .suspend(|| debug!("Empty media file, copying as is: {}", entry.path.display()));
            kind = MediaKind::Other;
        }

        let output_path = self.paths.output_path(entry, kind);
        if !self.produced.insert(output_path.clone()) {
            self.progress.suspend(|| {
                warn!(
                    "{} maps onto an output already written in this run, overwriting {}",
                    entry.relative.display(),
                    output_path.display()
                )
            });
        }

        let parent = output_path
            .parent()
            .unwrap_or_else(|| self.paths.destination_root())
            .to_path_buf();
        tokio::fs::create_dir_all(&parent).await?;

        let staging = staging_file(&parent, &output_path)?;

        let outcome = match kind {
            MediaKind::Other => {
                tokio::fs::copy(&entry.path, staging.path()).await?;
                FileOutcome::Copied { size: entry.size }
            }
            MediaKind::Image => {
                self.image_processor.shrink(&entry.path, staging.path()).await?;
                self.check_transcoded(entry, kind, &output_path, staging.path()).await?
            }
            MediaKind::Video => {
                self.video_processor.shrink(&entry.path, staging.path()).await?;
                self.check_transcoded(entry, kind, &output_path, staging.path()).await?
            }
        };

        // times go on before the rename, which keeps them; reopened because a
        // transcoder may have replaced the file behind the temp handle
        let staged = std::fs::OpenOptions::new().write(true).open(staging.path())?;
        timestamps.apply_to_file(&staged, &output_path)?;
        drop(staged);
        let permissions = tokio::fs::metadata(&entry.path).await?.permissions();
        tokio::fs::set_permissions(staging.path(), permissions).await?;

        staging.persist(&output_path).map_err(|e| ShrinkError::Io(e.error))?;

        Ok(outcome)
    }

    /// Validate a transcoder's output, falling back to the original bytes
    /// when shrinking did not pay off.
    async fn check_transcoded(
        &self,
        entry: &FileEntry,
        kind: MediaKind,
        output_path: &Path,
        staged: &Path,
    ) -> Result<FileOutcome, ShrinkError> {
        let new_size = tokio::fs::metadata(staged).await?.len();
        if new_size == 0 {
            return Err(ShrinkError::transcode(
                &entry.path,
                "transcoder reported success but produced an empty file",
            ));
        }

        let same_format = output_path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            == entry.extension;
        let too_large = (new_size as f64) > (entry.size as f64 * self.config.size_threshold);

        if same_format && too_large && self.source_fits_bound(entry, kind).await {
            self.progress.suspend(|| {
                debug!(
                    "Shrunk file is not smaller ({} vs {}), keeping original: {}",
                    FileManager::format_size(new_size),
                    FileManager::format_size(entry.size),
                    entry.path.display()
                )
            });
            tokio::fs::copy(&entry.path, staged).await?;
            return Ok(FileOutcome::KeptOriginal {
                kind,
                size: entry.size,
            });
        }

        Ok(FileOutcome::Transcoded {
            kind,
            original_size: entry.size,
            new_size,
        })
    }

    /// Whether the source is already within the bound; `false` when unknown.
    async fn source_fits_bound(&self, entry: &FileEntry, kind: MediaKind) -> bool {
        let dimensions = match kind {
            MediaKind::Image => self
                .image_processor
                .get_image_dimensions(&entry.path)
                .await
                .ok(),
            MediaKind::Video => self
                .video_processor
                .get_video_info(&entry.path)
                .await
                .ok()
                .map(|info| info.display_dimensions()),
            MediaKind::Other => None,
        };

        match dimensions {
            Some((width, height)) if width > 0 && height > 0 => self.config.bound.fits(width, height),
            _ => false,
        }
    }
}

/// Hidden temporary file next to `output_path`, keeping its extension so the
/// transcoders pick the right format.
fn staging_file(parent: &Path, output_path: &Path) -> Result<NamedTempFile, ShrinkError> {
    let suffix = output_path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    Ok(tempfile::Builder::new()
        .prefix(".mirror-")
        .suffix(&suffix)
        .tempfile_in(parent)?)
}

fn log_outcome(entry: &FileEntry, outcome: &FileOutcome) {
    match outcome {
        FileOutcome::Transcoded {
            kind,
            original_size,
            new_size,
        } => info!(
            "✅ {} {}: {} -> {} ({:.1}% saved)",
            kind.label(),
            entry.relative.display(),
            FileManager::format_size(*original_size),
            FileManager::format_size(*new_size),
            FileManager::calculate_reduction(*original_size, *new_size)
        ),
        FileOutcome::KeptOriginal { kind, size } => info!(
            "⏩ {} {}: kept original ({})",
            kind.label(),
            entry.relative.display(),
            FileManager::format_size(*size)
        ),
        FileOutcome::Copied { size } => info!(
            "📄 {}: copied ({})",
            entry.relative.display(),
            FileManager::format_size(*size)
        ),
    }
}
