//! # Platform-specific utilities
//!
//! Locates the external programs the transcoders depend on. Tools are
//! looked up once on the system `PATH` when a run starts and the resolved
//! paths travel with the processors, so nothing is resolved lazily from
//! global state.

use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Resolved paths of the external programs, `None` when not installed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExternalTools {
    /// ImageMagick 7 entry point
    pub magick: Option<PathBuf>,
    /// ImageMagick 6 converter
    pub convert: Option<PathBuf>,
    /// ImageMagick 6 identify
    pub identify: Option<PathBuf>,
    pub ffmpeg: Option<PathBuf>,
    pub ffprobe: Option<PathBuf>,
}

impl ExternalTools {
    /// Look up every tool on `PATH`
    pub fn discover() -> Self {
        let tools = Self {
            magick: find_in_path("magick"),
            // Windows ships an unrelated convert.exe (FAT -> NTFS converter)
            convert: if cfg!(windows) { None } else { find_in_path("convert") },
            identify: find_in_path("identify"),
            ffmpeg: find_in_path("ffmpeg"),
            ffprobe: find_in_path("ffprobe"),
        };
        debug!("Discovered tools: {:?}", tools);
        tools
    }

    /// Whether any ImageMagick flavour can convert images
    pub fn has_image_tool(&self) -> bool {
        self.magick.is_some() || self.convert.is_some()
    }

    /// Names of tools that are missing, for the start-up report
    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if !self.has_image_tool() {
            missing.push("magick/convert (ImageMagick)");
        }
        if self.ffmpeg.is_none() {
            missing.push("ffmpeg");
        }
        if self.ffprobe.is_none() {
            missing.push("ffprobe");
        }
        missing
    }
}

/// Platform-specific executable name (`ffmpeg` -> `ffmpeg.exe` on Windows)
pub fn executable_name(base_name: &str) -> String {
    format!("{}{}", base_name, env::consts::EXE_SUFFIX)
}

/// Find a tool in the system `PATH`
pub fn find_in_path(tool_name: &str) -> Option<PathBuf> {
    let file_name = executable_name(tool_name);
    let paths = env::var_os("PATH")?;

    env::split_paths(&paths)
        .map(|dir| dir.join(&file_name))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// System information structure
#[derive(Debug, Clone)]
pub struct SystemInfo {
    pub os: &'static str,
    pub arch: &'static str,
    pub family: &'static str,
}

impl SystemInfo {
    pub fn current() -> Self {
        Self {
            os: env::consts::OS,
            arch: env::consts::ARCH,
            family: env::consts::FAMILY,
        }
    }
}

impl std::fmt::Display for SystemInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} ({})", self.os, self.arch, self.family)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_executable_name() {
        let name = executable_name("ffmpeg");
        if cfg!(windows) {
            assert_eq!(name, "ffmpeg.exe");
        } else {
            assert_eq!(name, "ffmpeg");
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_finds_shell() {
        let sh = find_in_path("sh").expect("sh on PATH");
        assert!(sh.is_absolute() || sh.components().count() > 1);
    }

    #[test]
    fn test_unknown_tool_is_missing() {
        assert!(find_in_path("definitely-not-a-real-tool-4f2a").is_none());
    }

    #[test]
    fn test_missing_report() {
        let tools = ExternalTools::default();
        assert!(!tools.has_image_tool());
        assert_eq!(tools.missing().len(), 3);

        let tools = ExternalTools {
            convert: Some(PathBuf::from("/usr/bin/convert")),
            ffmpeg: Some(PathBuf::from("/usr/bin/ffmpeg")),
            ffprobe: Some(PathBuf::from("/usr/bin/ffprobe")),
            ..Default::default()
        };
        assert!(tools.has_image_tool());
        assert!(tools.missing().is_empty());
    }

    #[test]
    fn test_system_info() {
        let info = SystemInfo::current();
        assert!(!info.os.is_empty());
        assert!(!info.arch.is_empty());
        assert!(info.to_string().contains(info.os));
    }
}
