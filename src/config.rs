//! # Configuration Module
//!
//! Holds the immutable `Config` handed to the walker at start-up.
//!
//! The values are fixed defaults: the command line exposes no knobs and no
//! configuration file is read. Keeping them in one struct lets tests build
//! variants and keeps the processors free of ambient state.
//!
//! ## Parameters:
//! - `bound`: output resolution bound (1920x1080, orientation aware)
//! - `image_quality`: JPEG/WebP quality passed to ImageMagick (1-100, default: 85)
//! - `video_crf`: libx264 CRF (0-51, default: 26, lower = better quality)
//! - `video_preset`: libx264 preset (default: "medium")
//! - `audio_bitrate`: AAC bitrate when the audio stream cannot be copied (default: "128k")
//! - `size_threshold`: keep the original when the shrunk file is above
//!   `original * threshold` and the source already fits the bound (0.0-1.0, default: 0.9)
//! - `image_timeout_secs` / `video_timeout_secs`: per-file tool time limits
//!
//! ## Example:
//! ```rust
//! use media_mirror::Config;
//!
//! let config = Config {
//!     video_crf: 23,
//!     ..Default::default()
//! };
//! config.validate().unwrap();
//! ```

use crate::resize::ResizeBound;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a mirroring run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Output resolution bound
    pub bound: ResizeBound,
    /// Image quality (1-100)
    pub image_quality: u8,
    /// Video CRF value (0-51, lower = better quality)
    pub video_crf: u8,
    /// libx264 preset
    pub video_preset: String,
    /// Audio bitrate used when the source audio has to be re-encoded
    pub audio_bitrate: String,
    /// Size threshold (keep original if new size > original * threshold)
    pub size_threshold: f64,
    /// Time limit for one image conversion
    pub image_timeout_secs: u64,
    /// Time limit for one video conversion
    pub video_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bound: ResizeBound::default(),
            image_quality: 85,
            video_crf: 26,
            video_preset: "medium".to_string(),
            audio_bitrate: "128k".to_string(),
            size_threshold: 0.9,
            image_timeout_secs: 180,
            video_timeout_secs: 3600,
        }
    }
}

impl Config {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.bound.long_edge == 0 || self.bound.short_edge == 0 {
            return Err(anyhow::anyhow!("Resize bound must be non-zero"));
        }

        if self.bound.short_edge > self.bound.long_edge {
            return Err(anyhow::anyhow!(
                "Resize bound short edge ({}) exceeds long edge ({})",
                self.bound.short_edge,
                self.bound.long_edge
            ));
        }

        if self.image_quality == 0 || self.image_quality > 100 {
            return Err(anyhow::anyhow!("Image quality must be between 1 and 100"));
        }

        if self.video_crf > 51 {
            return Err(anyhow::anyhow!("Video CRF must be between 0 and 51"));
        }

        if self.video_preset.is_empty() || self.audio_bitrate.is_empty() {
            return Err(anyhow::anyhow!("Video preset and audio bitrate must be set"));
        }

        if self.size_threshold <= 0.0 || self.size_threshold > 1.0 {
            return Err(anyhow::anyhow!("Size threshold must be between 0.0 and 1.0"));
        }

        if self.image_timeout_secs == 0 || self.video_timeout_secs == 0 {
            return Err(anyhow::anyhow!("Tool timeouts must be greater than 0"));
        }

        Ok(())
    }

    pub fn image_timeout(&self) -> Duration {
        Duration::from_secs(self.image_timeout_secs)
    }

    pub fn video_timeout(&self) -> Duration {
        Duration::from_secs(self.video_timeout_secs)
    }
}
