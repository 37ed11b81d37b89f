//! Video sources and the page model they are discovered in

use anyhow::{Context, Result};
use image::{imageops::FilterType, RgbaImage};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use super::frame::Frame;

/// Something that presents video frames
pub trait VideoSource: Send + Sync {
    /// Intrinsic size of the decoded video, (0, 0) until a frame is available
    fn intrinsic_size(&self) -> (u32, u32);

    /// Draw the current frame into a bitmap of the given size
    fn render(&self, width: u32, height: u32) -> Frame;
}

/// A video whose current frame never changes (a decoded still image)
pub struct StillVideo {
    image: RgbaImage,
}

impl StillVideo {
    /// Wrap an already decoded frame
    pub fn new(image: RgbaImage) -> Self {
        Self { image }
    }

    /// Load the presented frame from an image file
    pub fn open(path: &Path) -> Result<Self> {
        let image = image::open(path)
            .with_context(|| format!("Failed to load frame image: {:?}", path))?
            .to_rgba8();
        Ok(Self::new(image))
    }
}

impl VideoSource for StillVideo {
    fn intrinsic_size(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    fn render(&self, width: u32, height: u32) -> Frame {
        if self.image.dimensions() == (width, height) {
            return Frame::from_image(self.image.clone());
        }
        Frame::from_image(image::imageops::resize(
            &self.image,
            width,
            height,
            FilterType::Triangle,
        ))
    }
}

/// A video element that has not decoded a frame yet
#[derive(Debug, Clone, Copy, Default)]
pub struct PendingVideo;

impl VideoSource for PendingVideo {
    fn intrinsic_size(&self) -> (u32, u32) {
        (0, 0)
    }

    fn render(&self, width: u32, height: u32) -> Frame {
        Frame::new(vec![0; (width as usize) * (height as usize) * 4], width, height)
    }
}

/// Whether an embedded frame's content can be inspected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameOrigin {
    #[default]
    SameOrigin,
    CrossOrigin,
}

/// An embedded frame (iframe) inside a document
#[derive(Clone)]
pub struct EmbeddedFrame {
    pub origin: FrameOrigin,
    pub videos: Vec<Arc<dyn VideoSource>>,
}

/// A shadow tree attached to some host element
#[derive(Clone, Default)]
pub struct ShadowRoot {
    pub videos: Vec<Arc<dyn VideoSource>>,
}

/// Where in the document a video was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoLocation {
    Document,
    EmbeddedFrame(usize),
    ShadowRoot(usize),
}

/// The page a capture runs against
#[derive(Clone, Default)]
pub struct Document {
    pub videos: Vec<Arc<dyn VideoSource>>,
    pub frames: Vec<EmbeddedFrame>,
    pub shadow_roots: Vec<ShadowRoot>,
}

impl Document {
    /// An empty page
    pub fn new() -> Self {
        Self::default()
    }

    /// A page with a single top-level video
    pub fn with_video(video: Arc<dyn VideoSource>) -> Self {
        Self {
            videos: vec![video],
            ..Self::default()
        }
    }

    /// Add a top-level video
    pub fn push_video(&mut self, video: Arc<dyn VideoSource>) {
        self.videos.push(video);
    }

    /// Add an embedded frame
    pub fn push_frame(&mut self, origin: FrameOrigin, videos: Vec<Arc<dyn VideoSource>>) {
        self.frames.push(EmbeddedFrame { origin, videos });
    }

    /// Add a shadow root
    pub fn push_shadow_root(&mut self, videos: Vec<Arc<dyn VideoSource>>) {
        self.shadow_roots.push(ShadowRoot { videos });
    }

    /// Find the first video: top-level document, then same-origin frames,
    /// then shadow roots. Cross-origin frames are never inspected.
    pub fn find_video(&self) -> Option<(VideoLocation, Arc<dyn VideoSource>)> {
        if let Some(video) = self.videos.first() {
            return Some((VideoLocation::Document, video.clone()));
        }

        for (index, frame) in self.frames.iter().enumerate() {
            if frame.origin == FrameOrigin::CrossOrigin {
                debug!("Skipping cross-origin frame {}", index);
                continue;
            }
            if let Some(video) = frame.videos.first() {
                debug!("Found video in embedded frame {}", index);
                return Some((VideoLocation::EmbeddedFrame(index), video.clone()));
            }
        }

        for (index, root) in self.shadow_roots.iter().enumerate() {
            if let Some(video) = root.videos.first() {
                debug!("Found video in shadow root {}", index);
                return Some((VideoLocation::ShadowRoot(index), video.clone()));
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn still(width: u32, height: u32) -> Arc<dyn VideoSource> {
        Arc::new(StillVideo::new(RgbaImage::new(width, height)))
    }

    #[test]
    fn test_empty_document_has_no_video() {
        assert!(Document::new().find_video().is_none());
    }

    #[test]
    fn test_top_level_video_wins() {
        let mut doc = Document::with_video(still(10, 10));
        doc.push_frame(FrameOrigin::SameOrigin, vec![still(20, 20)]);
        doc.push_shadow_root(vec![still(30, 30)]);

        let (location, video) = doc.find_video().unwrap();
        assert_eq!(location, VideoLocation::Document);
        assert_eq!(video.intrinsic_size(), (10, 10));
    }

    #[test]
    fn test_cross_origin_frames_are_skipped() {
        let mut doc = Document::new();
        doc.push_frame(FrameOrigin::CrossOrigin, vec![still(20, 20)]);
        doc.push_frame(FrameOrigin::SameOrigin, vec![still(40, 40)]);

        let (location, video) = doc.find_video().unwrap();
        assert_eq!(location, VideoLocation::EmbeddedFrame(1));
        assert_eq!(video.intrinsic_size(), (40, 40));
    }

    #[test]
    fn test_only_cross_origin_video_is_not_found() {
        let mut doc = Document::new();
        doc.push_frame(FrameOrigin::CrossOrigin, vec![still(20, 20)]);
        assert!(doc.find_video().is_none());
    }

    #[test]
    fn test_shadow_root_searched_last() {
        let mut doc = Document::new();
        doc.push_frame(FrameOrigin::SameOrigin, vec![]);
        doc.push_shadow_root(vec![]);
        doc.push_shadow_root(vec![still(8, 6)]);

        let (location, _) = doc.find_video().unwrap();
        assert_eq!(location, VideoLocation::ShadowRoot(1));
    }

    #[test]
    fn test_still_video_render_resizes() {
        let video = StillVideo::new(RgbaImage::from_pixel(4, 2, image::Rgba([9, 9, 9, 255])));
        let frame = video.render(2, 1);
        assert_eq!(frame.dimensions(), (2, 1));
        assert_eq!(frame.pixel(0, 0), [9, 9, 9, 255]);
    }
}
