//! Frame Capture Layer
//!
//! Locates a video in a [`Document`] and rasterizes its current frame,
//! downscaling it so requests to the OCR backend stay bounded.

pub mod frame;
pub mod page;
pub mod source;

pub use frame::Frame;
pub use page::PageManifest;
pub use source::{Document, StillVideo};

use tracing::{debug, info};

use crate::error::OcrError;

/// Frame capture configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureConfig {
    /// Maximum output width in pixels
    pub max_width: u32,
    /// Maximum output height in pixels
    pub max_height: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            max_width: 1920,
            max_height: 1080,
        }
    }
}

/// Output size for a video of `width` x `height` under the given bounds.
///
/// Frames within bounds keep their size. Larger frames are scaled by
/// `min(max_width / width, max_height / height)` with both dimensions
/// floored (and kept at least one pixel). Never scales up.
pub fn scaled_dimensions(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    if width <= max_width && height <= max_height {
        return (width, height);
    }

    let ratio = f64::min(
        max_width as f64 / width as f64,
        max_height as f64 / height as f64,
    );
    let scaled_w = ((width as f64 * ratio).floor() as u32).clamp(1, max_width.max(1));
    let scaled_h = ((height as f64 * ratio).floor() as u32).clamp(1, max_height.max(1));
    (scaled_w, scaled_h)
}

/// Samples the current frame of the first reachable video
#[derive(Debug, Clone, Default)]
pub struct FrameSampler {
    config: CaptureConfig,
}

impl FrameSampler {
    /// Create a new sampler
    pub fn new(config: CaptureConfig) -> Self {
        Self { config }
    }

    /// Capture the current frame of the first video found in `document`
    pub fn capture(&self, document: &Document) -> Result<Frame, OcrError> {
        let (location, video) = document.find_video().ok_or(OcrError::NoVideoFound)?;

        let (width, height) = video.intrinsic_size();
        if width == 0 || height == 0 {
            debug!("Video at {:?} has no decoded frame yet", location);
            return Err(OcrError::VideoNotReady);
        }

        let (out_w, out_h) =
            scaled_dimensions(width, height, self.config.max_width, self.config.max_height);
        if (out_w, out_h) != (width, height) {
            info!(
                "Scaling frame from {}x{} to {}x{}",
                width, height, out_w, out_h
            );
        }

        let frame = video.render(out_w, out_h);
        debug!("Captured {}x{} frame from {:?}", frame.width, frame.height, location);
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::source::PendingVideo;
    use image::RgbaImage;
    use std::sync::Arc;

    #[test]
    fn test_within_bounds_is_unchanged() {
        for (w, h) in [(1, 1), (640, 480), (1920, 1080), (1920, 10), (10, 1080)] {
            assert_eq!(scaled_dimensions(w, h, 1920, 1080), (w, h));
        }
    }

    #[test]
    fn test_downscale_fits_bounds() {
        assert_eq!(scaled_dimensions(3840, 2160, 1920, 1080), (1920, 1080));
        assert_eq!(scaled_dimensions(2560, 1080, 1920, 1080), (1920, 810));
        assert_eq!(scaled_dimensions(1000, 2000, 1920, 1080), (540, 1080));
    }

    #[test]
    fn test_downscale_preserves_aspect_ratio() {
        let sizes = [(4096, 2160), (2000, 1999), (1921, 1081), (7680, 4320), (3000, 500)];
        for (w, h) in sizes {
            let (ow, oh) = scaled_dimensions(w, h, 1920, 1080);
            assert!(ow <= 1920 && oh <= 1080, "{}x{} -> {}x{}", w, h, ow, oh);
            let expected_h = ow as f64 * h as f64 / w as f64;
            assert!((oh as f64 - expected_h).abs() <= 1.0, "{}x{} -> {}x{}", w, h, ow, oh);
        }
    }

    #[test]
    fn test_extreme_aspect_ratio_keeps_one_pixel() {
        assert_eq!(scaled_dimensions(100_000, 1, 1920, 1080), (1920, 1));
    }

    #[test]
    fn test_capture_without_video() {
        let sampler = FrameSampler::default();
        assert_eq!(sampler.capture(&Document::new()).unwrap_err(), OcrError::NoVideoFound);
    }

    #[test]
    fn test_capture_video_not_ready() {
        let sampler = FrameSampler::default();
        let doc = Document::with_video(Arc::new(PendingVideo));
        assert_eq!(sampler.capture(&doc).unwrap_err(), OcrError::VideoNotReady);
    }

    #[test]
    fn test_capture_scales_large_video() {
        let sampler = FrameSampler::new(CaptureConfig {
            max_width: 100,
            max_height: 50,
        });
        let video = StillVideo::new(RgbaImage::new(400, 100));
        let frame = sampler.capture(&Document::with_video(Arc::new(video))).unwrap();
        assert_eq!(frame.dimensions(), (100, 25));
        assert_eq!(frame.data.len(), 100 * 25 * 4);
    }

    #[test]
    fn test_capture_small_video_untouched() {
        let sampler = FrameSampler::default();
        let video = StillVideo::new(RgbaImage::new(320, 240));
        let frame = sampler.capture(&Document::with_video(Arc::new(video))).unwrap();
        assert_eq!(frame.dimensions(), (320, 240));
    }
}
