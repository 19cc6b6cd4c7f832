//! # Image Processing Module
//!
//! Shrinks images to the configured bound through **external tools**; no pixel
//! data is decoded in-process.
//!
//! ## Tool Strategy
//! **Tool priority (descending):**
//! 1. **magick** (ImageMagick 7.x)
//! 2. **convert** (ImageMagick 6.x / legacy)
//! 3. **Error**: `TranscodeFailure` if neither is installed or both fail
//!
//! ## Arguments
//! - `-limit memory 512MiB`: keeps huge panoramas from exhausting RAM
//! - `-auto-orient`: bakes EXIF rotation into the pixels before resizing
//! - `-resize WxH>`: orientation-aware box, shrink only
//! - `-quality Q`: configured image quality
//!
//! The output format follows the output file's extension.
//!
//! ## Dimension probing
//! The resize box is picked from the *displayed* size reported by
//! `identify` (`%[orientation]` 5-8 swaps the sides), because `-auto-orient`
//! rotates the pixels before `-resize` runs. Stored dimensions come from the
//! `image` crate; formats it cannot read (HEIC, TIFF, GIF, BMP with this
//! feature set) fall back to `identify`.

use crate::command::ToolCommand;
use crate::config::Config;
use crate::error::ShrinkError;
use crate::platform::ExternalTools;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Handles image shrinking
#[derive(Debug, Clone)]
pub struct ImageProcessor {
    config: Config,
    tools: ExternalTools,
}

impl ImageProcessor {
    pub fn new(config: Config, tools: ExternalTools) -> Self {
        Self { config, tools }
    }

    /// Resize `input` into `output` so it fits the configured bound.
    ///
    /// `output` must carry the extension of the desired format. Every
    /// available ImageMagick flavour is tried in order; the first success
    /// wins.
    ///
    /// # Errors
    /// `TranscodeFailure` when no tool is installed or every tool fails.
    pub async fn shrink(&self, input: &Path, output: &Path) -> Result<(), ShrinkError> {
        let dimensions = match self.get_oriented_dimensions(input).await {
            Ok(dims) => Some(dims),
            Err(e) => {
                debug!("Could not read oriented dimensions of {}: {}", input.display(), e);
                self.get_image_dimensions(input).await.ok()
            }
        };

        let (width, height) = dimensions.unwrap_or((
            self.config.bound.long_edge,
            self.config.bound.short_edge,
        ));
        let geometry = self.config.bound.imagemagick_geometry(width, height);
        debug!(
            "Shrinking image {} ({:?}) with geometry {}",
            input.display(),
            dimensions,
            geometry
        );

        let candidates = self.converters();
        if candidates.is_empty() {
            return Err(ShrinkError::transcode(
                input,
                "no image tool available, install ImageMagick (magick or convert)",
            ));
        }

        let mut last_error = None;
        for tool_path in candidates {
            let result = ToolCommand::new(tool_path.clone())
                .args(["-limit", "memory", "512MiB"])
                .arg(input)
                .args(["-auto-orient", "-resize", geometry.as_str()])
                .arg("-quality")
                .arg(self.config.image_quality.to_string())
                .arg(output)
                .timeout(self.config.image_timeout())
                .execute()
                .await;

            match result {
                Ok(_) => return Ok(()),
                Err(e) => {
                    warn!("{} failed on {}, trying next tool", tool_path.display(), input.display());
                    last_error = Some(e);
                }
            }
        }

        Err(ShrinkError::transcode(
            input,
            last_error.map(|e| e.to_string()).unwrap_or_default(),
        ))
    }

    /// Converter executables in preference order.
    fn converters(&self) -> Vec<PathBuf> {
        [&self.tools.magick, &self.tools.convert]
            .into_iter()
            .flatten()
            .cloned()
            .collect()
    }

    /// Pixel dimensions `(width, height)` as stored in the file.
    ///
    /// EXIF orientation is ignored, which is fine for bound checks since the
    /// bound itself is orientation aware.
    pub async fn get_image_dimensions(&self, image_path: &Path) -> Result<(u32, u32), ShrinkError> {
        match image::image_dimensions(image_path) {
            Ok(dims) => return Ok(dims),
            Err(e) => debug!("image crate cannot read {}: {}", image_path.display(), e),
        }

        let output = self.identify(image_path, "%w %h").await?;
        parse_dimensions(&output).ok_or_else(|| unexpected_identify_output(&output))
    }

    /// Dimensions as displayed, after `-auto-orient` would rotate the pixels.
    ///
    /// Camera portraits are usually stored landscape with an EXIF
    /// orientation of 5-8; the resize box has to be chosen for the rotated
    /// image.
    pub async fn get_oriented_dimensions(&self, image_path: &Path) -> Result<(u32, u32), ShrinkError> {
        let output = self.identify(image_path, "%w %h %[orientation]").await?;
        parse_oriented_dimensions(&output).ok_or_else(|| unexpected_identify_output(&output))
    }

    /// Run `identify -ping -format <format>` on the first frame.
    async fn identify(&self, image_path: &Path, format: &str) -> Result<String, ShrinkError> {
        let mut probe = match (&self.tools.magick, &self.tools.identify) {
            (Some(magick), _) => {
                let mut command = ToolCommand::new(magick.clone());
                command.arg("identify");
                command
            }
            (None, Some(identify)) => ToolCommand::new(identify.clone()),
            (None, None) => {
                return Err(ShrinkError::Tool {
                    tool: "identify".to_string(),
                    message: format!("cannot probe {} without ImageMagick", image_path.display()),
                })
            }
        };

        // first frame only for animations and multi-page files
        let mut frame = image_path.as_os_str().to_os_string();
        frame.push("[0]");

        let output = probe
            .args(["-ping", "-format", format])
            .arg(&frame)
            .timeout(self.config.image_timeout())
            .execute()
            .await?;
        Ok(output.stdout)
    }
}

/// ImageMagick orientation names whose rotation swaps width and height
/// (EXIF orientations 5 to 8).
const TRANSPOSED_ORIENTATIONS: &[&str] = &["LeftTop", "RightTop", "RightBottom", "LeftBottom"];

fn unexpected_identify_output(output: &str) -> ShrinkError {
    ShrinkError::Tool {
        tool: "identify".to_string(),
        message: format!("unexpected output {:?}", output.trim()),
    }
}

/// Parse `"<width> <height>"` as printed by `identify -format "%w %h"`.
fn parse_dimensions(text: &str) -> Option<(u32, u32)> {
    let mut parts = text.split_whitespace();
    let width = parts.next()?.parse().ok()?;
    let height = parts.next()?.parse().ok()?;
    Some((width, height))
}

/// Parse `"<width> <height> <orientation>"`, swapping the sides for
/// transposing orientations.
fn parse_oriented_dimensions(text: &str) -> Option<(u32, u32)> {
    let (width, height) = parse_dimensions(text)?;
    match text.split_whitespace().nth(2) {
        Some(orientation) if TRANSPOSED_ORIENTATIONS.contains(&orientation) => Some((height, width)),
        _ => Some((width, height)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_dimensions() {
        assert_eq!(parse_dimensions("4000 3000"), Some((4000, 3000)));
        assert_eq!(parse_dimensions(" 640 480\n"), Some((640, 480)));
        assert_eq!(parse_dimensions("640"), None);
        assert_eq!(parse_dimensions("wide tall"), None);
    }

    #[test]
    fn test_parse_oriented_dimensions() {
        assert_eq!(parse_oriented_dimensions("4000 3000 RightTop"), Some((3000, 4000)));
        assert_eq!(parse_oriented_dimensions("4000 3000 LeftBottom"), Some((3000, 4000)));
        assert_eq!(parse_oriented_dimensions("4000 3000 TopLeft"), Some((4000, 3000)));
        assert_eq!(parse_oriented_dimensions("4000 3000 Undefined"), Some((4000, 3000)));
        assert_eq!(parse_oriented_dimensions("640 480"), Some((640, 480)));
        assert_eq!(parse_oriented_dimensions("RightTop"), None);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_rotated_portrait_gets_portrait_box() {
        use crate::platform::fake_tools;

        let temp_dir = TempDir::new().unwrap();
        let log = temp_dir.path().join("argv.log");
        // stored 4000x3000 with EXIF orientation 6
        let magick = fake_tools::magick(temp_dir.path(), "4000 3000 RightTop", &log);
        let input = temp_dir.path().join("portrait.jpg");
        let output = temp_dir.path().join("portrait.out.jpg");
        std::fs::write(&input, b"jpeg bytes").unwrap();

        let tools = ExternalTools {
            magick: Some(magick),
            ..ExternalTools::default()
        };
        let processor = ImageProcessor::new(Config::default(), tools);
        assert_eq!(
            processor.get_oriented_dimensions(&input).await.unwrap(),
            (3000, 4000)
        );

        processor.shrink(&input, &output).await.unwrap();
        let argv = std::fs::read_to_string(&log).unwrap();
        assert!(argv.contains("-auto-orient -resize 1080x1920>"), "{argv}");
        assert_eq!(std::fs::read(&output).unwrap(), b"jpeg bytes");
    }

    #[tokio::test]
    async fn test_dimensions_from_header() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("small.png");
        image::RgbImage::new(320, 200).save(&path).unwrap();

        let processor = ImageProcessor::new(Config::default(), ExternalTools::default());
        assert_eq!(processor.get_image_dimensions(&path).await.unwrap(), (320, 200));
    }

    #[tokio::test]
    async fn test_missing_tools_is_transcode_failure() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("photo.png");
        image::RgbImage::new(64, 48).save(&input).unwrap();

        let processor = ImageProcessor::new(Config::default(), ExternalTools::default());
        let err = processor
            .shrink(&input, &temp_dir.path().join("out.png"))
            .await
            .unwrap_err();
        assert!(matches!(err, ShrinkError::TranscodeFailure { .. }));
        assert!(err.to_string().contains("ImageMagick"));
    }

    #[tokio::test]
    async fn test_shrinks_large_image() {
        let tools = ExternalTools::discover();
        if !tools.has_image_tool() {
            eprintln!("ImageMagick not installed, skipping");
            return;
        }

        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("wide.png");
        let output = temp_dir.path().join("wide.out.png");
        image::RgbImage::new(2400, 1200).save(&input).unwrap();

        let processor = ImageProcessor::new(Config::default(), tools);
        processor.shrink(&input, &output).await.unwrap();
        assert_eq!(image::image_dimensions(&output).unwrap(), (1920, 960));
    }
}
