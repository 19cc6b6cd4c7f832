//! # Resize Bound Module
//!
//! Fit-within arithmetic for the output resolution bound and its translation
//! into the argument syntax of the external transcoders.
//!
//! ## Rules
//! - The bound is orientation aware: landscape (and square) media are boxed
//!   into `long_edge x short_edge`, portrait media into `short_edge x long_edge`
//! - Aspect ratio is preserved
//! - Media already inside the box is never upscaled
//!
//! ## Example
//! ```rust
//! use media_mirror::resize::ResizeBound;
//!
//! let bound = ResizeBound::default();
//! assert_eq!(bound.fit_within(4000, 3000), (1440, 1080));
//! assert_eq!(bound.imagemagick_geometry(4000, 3000), "1920x1080>");
//! ```

use serde::{Deserialize, Serialize};

/// Maximum output resolution, expressed independently of orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResizeBound {
    /// Limit for the longer side (1920 for Full HD)
    pub long_edge: u32,
    /// Limit for the shorter side (1080 for Full HD)
    pub short_edge: u32,
}

impl Default for ResizeBound {
    fn default() -> Self {
        Self {
            long_edge: 1920,
            short_edge: 1080,
        }
    }
}

impl ResizeBound {
    /// Bounding box `(max_width, max_height)` for media of the given size.
    pub fn oriented_for(&self, width: u32, height: u32) -> (u32, u32) {
        if width >= height {
            (self.long_edge, self.short_edge)
        } else {
            (self.short_edge, self.long_edge)
        }
    }

    /// Whether `width x height` already lies inside the box.
    pub fn fits(&self, width: u32, height: u32) -> bool {
        let (max_w, max_h) = self.oriented_for(width, height);
        width <= max_w && height <= max_h
    }

    /// Target dimensions after a shrink-only, aspect-preserving resize.
    pub fn fit_within(&self, width: u32, height: u32) -> (u32, u32) {
        if width == 0 || height == 0 || self.fits(width, height) {
            return (width, height);
        }

        let (max_w, max_h) = self.oriented_for(width, height);
        let scale = f64::min(
            max_w as f64 / width as f64,
            max_h as f64 / height as f64,
        );

        let new_w = ((width as f64 * scale).round() as u32).clamp(1, max_w);
        let new_h = ((height as f64 * scale).round() as u32).clamp(1, max_h);
        (new_w, new_h)
    }

    /// ImageMagick `-resize` geometry; the trailing `>` only ever shrinks.
    pub fn imagemagick_geometry(&self, width: u32, height: u32) -> String {
        let (max_w, max_h) = self.oriented_for(width, height);
        format!("{}x{}>", max_w, max_h)
    }

    /// ffmpeg `-vf` scale filter choosing the box from the decoded frame size.
    ///
    /// `min(iw, ..)` keeps small inputs at their native size, and
    /// `force_divisible_by=2` keeps 4:2:0 encoders happy.
    pub fn ffmpeg_scale_filter(&self) -> String {
        let (long, short) = (self.long_edge, self.short_edge);
        format!(
            "scale=w='min(iw,if(gte(iw,ih),{long},{short}))':h='min(ih,if(gte(iw,ih),{short},{long}))'\
             :force_original_aspect_ratio=decrease:force_divisible_by=2"
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_landscape_photo_is_bounded_by_height() {
        let bound = ResizeBound::default();
        assert_eq!(bound.fit_within(4000, 3000), (1440, 1080));
    }

    #[test]
    fn test_uhd_video_lands_exactly_on_full_hd() {
        let bound = ResizeBound::default();
        assert_eq!(bound.fit_within(3840, 2160), (1920, 1080));
    }

    #[test]
    fn test_portrait_uses_rotated_box() {
        let bound = ResizeBound::default();
        assert_eq!(bound.oriented_for(3000, 4000), (1080, 1920));
        assert_eq!(bound.fit_within(3000, 4000), (1080, 1440));
        assert_eq!(bound.imagemagick_geometry(3000, 4000), "1080x1920>");
    }

    #[test]
    fn test_square_uses_short_edge() {
        let bound = ResizeBound::default();
        assert_eq!(bound.fit_within(4000, 4000), (1080, 1080));
    }

    #[test]
    fn test_small_media_is_not_upscaled() {
        let bound = ResizeBound::default();
        assert!(bound.fits(640, 480));
        assert_eq!(bound.fit_within(640, 480), (640, 480));
        assert_eq!(bound.fit_within(1080, 1920), (1080, 1920));
    }

    #[test]
    fn test_aspect_ratio_is_preserved() {
        let bound = ResizeBound::default();
        for (w, h) in [(5184u32, 3456u32), (7000, 1000), (1000, 7000), (2049, 1537)] {
            let (nw, nh) = bound.fit_within(w, h);
            let (max_w, max_h) = bound.oriented_for(w, h);
            assert!(nw <= max_w && nh <= max_h, "{}x{} -> {}x{}", w, h, nw, nh);
            let original = w as f64 / h as f64;
            let resized = nw as f64 / nh as f64;
            // one pixel of rounding on the shorter side
            let tolerance = original / nh.min(nw) as f64 + 1.0 / nh as f64;
            assert!((original - resized).abs() <= tolerance, "{}x{} -> {}x{}", w, h, nw, nh);
        }
    }

    #[test]
    fn test_ffmpeg_filter_shape() {
        let filter = ResizeBound::default().ffmpeg_scale_filter();
        assert!(filter.starts_with("scale=w='min(iw,if(gte(iw,ih),1920,1080))'"));
        assert!(filter.contains(":h='min(ih,if(gte(iw,ih),1080,1920))'"));
        assert!(filter.ends_with(":force_original_aspect_ratio=decrease:force_divisible_by=2"));
        assert!(!filter.contains(' '));
    }
}
