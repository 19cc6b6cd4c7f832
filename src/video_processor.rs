//! # Video Processing Module
//!
//! Shrinks videos to the configured bound with FFmpeg.
//!
//! ## Encoding:
//! - Codec video: libx264, preset and CRF from `Config` (default `medium` / 26)
//! - Pixel format: yuv420p for player compatibility
//! - Scale: orientation-aware, shrink-only filter from `ResizeBound`
//! - Container: MP4 (QuickTime muxer when the output keeps a `.mov` name)
//! - Metadata: global tags copied with `-map_metadata 0`
//!
//! ## Audio:
//! 1. First attempt copies the audio stream untouched
//! 2. If the container refuses it (e.g. PCM into MP4) a second invocation
//!    re-encodes to AAC at `Config::audio_bitrate`
//!
//! ## Video analysis (VideoInfo):
//! - Resolution, rotation, duration, bitrate, codec via `ffprobe`
//!
//! ## Example:
//! ```rust,no_run
//! # async fn example() -> Result<(), media_mirror::ShrinkError> {
//! use media_mirror::{Config, platform::ExternalTools, video_processor::VideoProcessor};
//! use std::path::Path;
//!
//! let processor = VideoProcessor::new(Config::default(), ExternalTools::discover());
//! processor.shrink(Path::new("clip.mov"), Path::new("out/clip.mov")).await?;
//! let info = processor.get_video_info(Path::new("out/clip.mov")).await?;
//! println!("{}x{}", info.width, info.height);
//! # Ok(())
//! # }
//! ```

use crate::command::ToolCommand;
use crate::config::Config;
use crate::error::ShrinkError;
use crate::platform::ExternalTools;
use std::ffi::OsString;
use std::path::Path;
use tracing::{debug, warn};

/// How the audio stream is carried into the output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AudioMode {
    Copy,
    Encode,
}

/// Handles video shrinking
#[derive(Debug, Clone)]
pub struct VideoProcessor {
    config: Config,
    tools: ExternalTools,
}

impl VideoProcessor {
    pub fn new(config: Config, tools: ExternalTools) -> Self {
        Self { config, tools }
    }

    /// Transcode `input` into `output`, bounded to the configured resolution.
    ///
    /// # Errors
    /// `TranscodeFailure` when ffmpeg is missing, times out, or fails with
    /// both audio strategies.
    pub async fn shrink(&self, input: &Path, output: &Path) -> Result<(), ShrinkError> {
        let Some(ref ffmpeg) = self.tools.ffmpeg else {
            return Err(ShrinkError::transcode(input, "ffmpeg is not installed"));
        };

        debug!(
            "Compressing video: {} (CRF: {}, preset: {})",
            input.display(),
            self.config.video_crf,
            self.config.video_preset
        );

        let mut last_error = None;
        for audio in [AudioMode::Copy, AudioMode::Encode] {
            let result = ToolCommand::new(ffmpeg.clone())
                .args(self.ffmpeg_args(input, output, audio))
                .timeout(self.config.video_timeout())
                .execute()
                .await;

            match result {
                Ok(_) => return Ok(()),
                Err(e) => {
                    if audio == AudioMode::Copy {
                        warn!(
                            "FFmpeg failed copying audio of {}, retrying with AAC",
                            input.display()
                        );
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(ShrinkError::transcode(
            input,
            last_error.map(|e| e.to_string()).unwrap_or_default(),
        ))
    }

    fn ffmpeg_args(&self, input: &Path, output: &Path, audio: AudioMode) -> Vec<OsString> {
        let crf = self.config.video_crf.to_string();
        let filter = self.config.bound.ffmpeg_scale_filter();

        let mut args = os_args(&["-hide_banner", "-nostdin", "-loglevel", "error", "-y", "-i"]);
        args.push(input.into());
        args.extend(os_args(&["-map", "0:v:0", "-map", "0:a?", "-vf", filter.as_str()]));
        args.extend(os_args(&[
            "-c:v",
            "libx264",
            "-preset",
            self.config.video_preset.as_str(),
            "-crf",
            crf.as_str(),
            "-pix_fmt",
            "yuv420p",
        ]));

        match audio {
            AudioMode::Copy => args.extend(os_args(&["-c:a", "copy"])),
            AudioMode::Encode => args.extend(os_args(&[
                "-c:a",
                "aac",
                "-b:a",
                self.config.audio_bitrate.as_str(),
            ])),
        }

        args.extend(os_args(&["-map_metadata", "0", "-movflags", "+faststart+use_metadata_tags"]));
        args.extend(os_args(&["-f", container_for(output)]));
        args.push(output.into());
        args
    }

    /// Get video information using ffprobe
    pub async fn get_video_info(&self, video_path: &Path) -> Result<VideoInfo, ShrinkError> {
        let Some(ref ffprobe) = self.tools.ffprobe else {
            return Err(ShrinkError::Tool {
                tool: "ffprobe".to_string(),
                message: "ffprobe is not installed".to_string(),
            });
        };

        let output = ToolCommand::new(ffprobe.clone())
            .args(["-v", "quiet", "-print_format", "json", "-show_format", "-show_streams"])
            .arg(video_path)
            .timeout(self.config.image_timeout())
            .execute()
            .await?;

        VideoInfo::from_ffprobe_json(&output.stdout).map_err(|e| ShrinkError::Tool {
            tool: "ffprobe".to_string(),
            message: format!("cannot parse output for {}: {}", video_path.display(), e),
        })
    }
}

fn os_args(items: &[&str]) -> Vec<OsString> {
    items.iter().map(|s| OsString::from(*s)).collect()
}

/// ffmpeg muxer for an output path
fn container_for(output: &Path) -> &'static str {
    match output
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .as_deref()
    {
        Some("mov") => "mov",
        _ => "mp4",
    }
}

/// Video file information
#[derive(Debug, Clone, PartialEq)]
pub struct VideoInfo {
    /// Coded width of the first video stream
    pub width: u32,
    /// Coded height of the first video stream
    pub height: u32,
    /// Display rotation in degrees (phones store portrait clips rotated)
    pub rotation: i32,
    pub duration: f64,
    pub bitrate: u64,
    pub codec: String,
}

impl VideoInfo {
    /// Parse `ffprobe -print_format json -show_format -show_streams` output.
    pub fn from_ffprobe_json(json: &str) -> Result<Self, serde_json::Error> {
        let info: serde_json::Value = serde_json::from_str(json)?;

        let format = &info["format"];
        let duration = format["duration"]
            .as_str()
            .and_then(|d| d.parse::<f64>().ok())
            .unwrap_or(0.0);

        let bitrate = format["bit_rate"]
            .as_str()
            .and_then(|b| b.parse::<u64>().ok())
            .unwrap_or(0);

        // Find video stream
        let empty_vec = vec![];
        let streams = info["streams"].as_array().unwrap_or(&empty_vec);
        let video_stream = streams
            .iter()
            .find(|s| s["codec_type"] == "video")
            .unwrap_or(&serde_json::Value::Null);

        let width = video_stream["width"].as_u64().unwrap_or(0) as u32;
        let height = video_stream["height"].as_u64().unwrap_or(0) as u32;
        let codec = video_stream["codec_name"]
            .as_str()
            .unwrap_or("unknown")
            .to_string();

        // older ffmpeg: tags.rotate, newer: display matrix side data
        let rotation = video_stream["tags"]["rotate"]
            .as_str()
            .and_then(|r| r.parse::<i32>().ok())
            .or_else(|| {
                video_stream["side_data_list"]
                    .as_array()?
                    .iter()
                    .find_map(|side| side["rotation"].as_i64())
                    .map(|r| r as i32)
            })
            .unwrap_or(0);

        Ok(Self {
            width,
            height,
            rotation,
            duration,
            bitrate,
            codec,
        })
    }

    /// Dimensions as displayed, with quarter-turn rotations applied.
    pub fn display_dimensions(&self) -> (u32, u32) {
        if self.rotation.rem_euclid(180) == 90 {
            (self.height, self.width)
        } else {
            (self.width, self.height)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    const PROBE_JSON: &str = r#"{
        "streams": [
            {"index": 0, "codec_type": "audio", "codec_name": "aac"},
            {"index": 1, "codec_type": "video", "codec_name": "hevc", "width": 3840, "height": 2160,
             "side_data_list": [{"side_data_type": "Display Matrix", "rotation": -90}]}
        ],
        "format": {"duration": "12.500000", "bit_rate": "45000000"}
    }"#;

    #[test]
    fn test_parse_ffprobe_output() {
        let info = VideoInfo::from_ffprobe_json(PROBE_JSON).unwrap();
        assert_eq!(info.width, 3840);
        assert_eq!(info.height, 2160);
        assert_eq!(info.codec, "hevc");
        assert_eq!(info.rotation, -90);
        assert_eq!(info.duration, 12.5);
        assert_eq!(info.bitrate, 45_000_000);
        assert_eq!(info.display_dimensions(), (2160, 3840));
    }

    #[test]
    fn test_parse_legacy_rotate_tag() {
        let json = r#"{"streams": [{"codec_type": "video", "width": 1920, "height": 1080,
                        "tags": {"rotate": "180"}}], "format": {}}"#;
        let info = VideoInfo::from_ffprobe_json(json).unwrap();
        assert_eq!(info.rotation, 180);
        assert_eq!(info.display_dimensions(), (1920, 1080));
        assert_eq!(info.codec, "unknown");
    }

    #[test]
    fn test_container_choice() {
        assert_eq!(container_for(Path::new("a/clip.MOV")), "mov");
        assert_eq!(container_for(Path::new("a/clip.mp4")), "mp4");
        assert_eq!(container_for(Path::new("a/.mirror-x.m4v")), "mp4");
    }

    #[test]
    fn test_ffmpeg_arguments() {
        let processor = VideoProcessor::new(Config::default(), ExternalTools::default());
        let args: Vec<String> = processor
            .ffmpeg_args(Path::new("in/clip.mov"), Path::new("out/clip.mov"), AudioMode::Encode)
            .into_iter()
            .map(|a| a.to_string_lossy().to_string())
            .collect();

        let position = |flag: &str| args.iter().position(|a| a == flag).unwrap();
        assert_eq!(args[position("-i") + 1], "in/clip.mov");
        assert_eq!(args[position("-crf") + 1], "26");
        assert_eq!(args[position("-c:a") + 1], "aac");
        assert_eq!(args[position("-b:a") + 1], "128k");
        assert_eq!(args[position("-f") + 1], "mov");
        assert!(args[position("-vf") + 1].starts_with("scale="));
        assert_eq!(args.last().unwrap(), "out/clip.mov");
    }

    #[tokio::test]
    async fn test_missing_ffmpeg_is_transcode_failure() {
        let processor = VideoProcessor::new(Config::default(), ExternalTools::default());
        let err = processor
            .shrink(Path::new("clip.mov"), Path::new("out.mov"))
            .await
            .unwrap_err();
        assert!(matches!(err, ShrinkError::TranscodeFailure { .. }));
    }

    #[tokio::test]
    async fn test_shrinks_uhd_clip() {
        let tools = ExternalTools::discover();
        let (Some(ffmpeg), Some(_)) = (tools.ffmpeg.clone(), tools.ffprobe.clone()) else {
            eprintln!("ffmpeg/ffprobe not installed, skipping");
            return;
        };

        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("uhd.mp4");
        let output: PathBuf = temp_dir.path().join("small.mp4");
        ToolCommand::new(ffmpeg)
            .args(["-hide_banner", "-loglevel", "error", "-f", "lavfi"])
            .args(["-i", "testsrc=size=3840x2160:rate=5", "-t", "1"])
            .args(["-c:v", "libx264", "-preset", "ultrafast", "-pix_fmt", "yuv420p"])
            .arg(&input)
            .execute()
            .await
            .unwrap();

        let processor = VideoProcessor::new(Config::default(), tools);
        processor.shrink(&input, &output).await.unwrap();

        let info = processor.get_video_info(&output).await.unwrap();
        assert_eq!(info.display_dimensions(), (1920, 1080));
        assert_eq!(info.codec, "h264");
    }
}
