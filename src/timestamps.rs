//! # Timestamp Preservation Module
//!
//! Captures `(created, modified)` from a source file before it is processed
//! and writes them onto the produced file afterwards.
//!
//! ## Platform notes
//! - The modification time is always applied (the access time is set to the
//!   same value) and read back to make sure it stuck.
//! - The creation time can only be written on Windows and macOS. There a
//!   source without a readable creation time fails closed with
//!   `TimestampApplyFailure`; elsewhere the creation time is captured for
//!   logging but cannot be written.

use crate::error::ShrinkError;
use std::fs::{File, FileTimes};
use std::path::Path;
use std::time::{Duration, SystemTime};
use tracing::debug;

/// Whether this platform lets us set a file's creation time.
pub const CREATION_TIME_WRITABLE: bool = cfg!(any(windows, target_os = "macos"));

/// Largest read-back drift accepted (FAT stores mtimes with 2 s resolution).
const MAX_DRIFT: Duration = Duration::from_secs(2);

/// Timestamps captured from a source file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimestampPair {
    pub created: Option<SystemTime>,
    pub modified: SystemTime,
}

impl TimestampPair {
    /// Read the timestamps of `path`.
    pub fn capture(path: &Path) -> Result<Self, ShrinkError> {
        let metadata = std::fs::metadata(path)
            .map_err(|e| ShrinkError::timestamp(path, format!("cannot read metadata: {e}")))?;

        let modified = metadata
            .modified()
            .map_err(|e| ShrinkError::timestamp(path, format!("no modification time: {e}")))?;

        let created = match metadata.created() {
            Ok(created) => Some(created),
            Err(e) if CREATION_TIME_WRITABLE => {
                return Err(ShrinkError::timestamp(
                    path,
                    format!("no creation time: {e}"),
                ))
            }
            Err(_) => None,
        };

        Ok(Self { created, modified })
    }

    /// Write the modification time onto a directory.
    #[cfg(unix)]
    pub fn apply_to_dir(&self, path: &Path) -> Result<(), ShrinkError> {
        let dir = File::open(path)
            .map_err(|e| ShrinkError::timestamp(path, format!("cannot open directory: {e}")))?;
        self.apply_to_file(&dir, path)
    }

    /// Directories cannot be opened through `std::fs::File` here.
    #[cfg(not(unix))]
    pub fn apply_to_dir(&self, path: &Path) -> Result<(), ShrinkError> {
        debug!("Directory timestamps not supported on this platform: {}", path.display());
        Ok(())
    }

    /// Write these timestamps through an already open handle; `path` is only
    /// used in error messages.
    pub fn apply_to_file(&self, file: &File, path: &Path) -> Result<(), ShrinkError> {
        let times = self.file_times(path)?;
        file.set_times(times)
            .map_err(|e| ShrinkError::timestamp(path, format!("cannot set times: {e}")))?;

        let written = file
            .metadata()
            .and_then(|m| m.modified())
            .map_err(|e| ShrinkError::timestamp(path, format!("cannot read back times: {e}")))?;
        let drift = written
            .duration_since(self.modified)
            .unwrap_or_else(|e| e.duration());
        if drift > MAX_DRIFT {
            return Err(ShrinkError::timestamp(
                path,
                format!("modification time drifted by {:?} after applying", drift),
            ));
        }

        debug!("Applied timestamps to {}", path.display());
        Ok(())
    }

    #[allow(unused_variables)]
    fn file_times(&self, path: &Path) -> Result<FileTimes, ShrinkError> {
        let times = FileTimes::new()
            .set_accessed(self.modified)
            .set_modified(self.modified);

        #[cfg(any(windows, target_os = "macos"))]
        let times = {
            #[cfg(windows)]
            use std::os::windows::fs::FileTimesExt;
            #[cfg(target_os = "macos")]
            use std::os::macos::fs::FileTimesExt;

            let created = self
                .created
                .ok_or_else(|| ShrinkError::timestamp(path, "source has no creation time"))?;
            times.set_created(created)
        };

        Ok(times)
    }
}
