//! Page descriptions
//!
//! Describes a page layout in TOML so captures can run against embedded
//! frames and shadow roots, not just a single top-level video:
//!
//! ```toml
//! videos = [{ image = "player.png" }]
//!
//! [[frames]]
//! origin = "cross_origin"
//! videos = [{ image = "ad.png" }]
//!
//! [[shadow_roots]]
//! videos = [{}]   # a video that has not decoded a frame yet
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::source::{Document, FrameOrigin, PendingVideo, StillVideo, VideoSource};

/// One video element
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideoEntry {
    /// Image holding the presented frame; absent for a video that is still loading
    pub image: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FrameEntry {
    #[serde(default)]
    pub origin: FrameOrigin,
    #[serde(default)]
    pub videos: Vec<VideoEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShadowRootEntry {
    #[serde(default)]
    pub videos: Vec<VideoEntry>,
}

/// Page layout loaded from TOML
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PageManifest {
    pub videos: Vec<VideoEntry>,
    pub frames: Vec<FrameEntry>,
    pub shadow_roots: Vec<ShadowRootEntry>,
}

impl PageManifest {
    /// Load a page description from a file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read page description {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse page description {:?}", path))
    }

    /// Build the document, resolving image paths against `base_dir`
    pub fn into_document(self, base_dir: &Path) -> Result<Document> {
        let mut document = Document::new();
        for video in self.videos {
            document.push_video(open_video(&video, base_dir)?);
        }
        for frame in self.frames {
            let videos = open_videos(&frame.videos, base_dir)?;
            document.push_frame(frame.origin, videos);
        }
        for root in self.shadow_roots {
            document.push_shadow_root(open_videos(&root.videos, base_dir)?);
        }
        Ok(document)
    }
}

fn open_videos(entries: &[VideoEntry], base_dir: &Path) -> Result<Vec<Arc<dyn VideoSource>>> {
    entries.iter().map(|entry| open_video(entry, base_dir)).collect()
}

fn open_video(entry: &VideoEntry, base_dir: &Path) -> Result<Arc<dyn VideoSource>> {
    Ok(match &entry.image {
        Some(image) => Arc::new(StillVideo::open(&base_dir.join(image))?),
        None => Arc::new(PendingVideo),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::source::VideoLocation;
    use image::{Rgba, RgbaImage};
    use tempfile::tempdir;

    #[test]
    fn test_parse_layout() {
        let manifest: PageManifest = toml::from_str(
            r#"
            [[frames]]
            origin = "cross_origin"
            videos = [{ image = "ad.png" }]

            [[frames]]
            videos = [{}]
            "#,
        )
        .unwrap();

        assert!(manifest.videos.is_empty());
        assert_eq!(manifest.frames[0].origin, FrameOrigin::CrossOrigin);
        assert_eq!(manifest.frames[1].origin, FrameOrigin::SameOrigin);
        assert!(manifest.frames[1].videos[0].image.is_none());
    }

    #[test]
    fn test_document_from_files() {
        let dir = tempdir().unwrap();
        RgbaImage::from_pixel(6, 4, Rgba([1, 2, 3, 255]))
            .save(dir.path().join("shadow.png"))
            .unwrap();
        std::fs::write(
            dir.path().join("page.toml"),
            "[[frames]]\norigin = \"cross_origin\"\nvideos = [{ image = \"shadow.png\" }]\n\n[[shadow_roots]]\nvideos = [{ image = \"shadow.png\" }]\n",
        )
        .unwrap();

        let document = PageManifest::load(&dir.path().join("page.toml"))
            .unwrap()
            .into_document(dir.path())
            .unwrap();

        let (location, video) = document.find_video().unwrap();
        assert_eq!(location, VideoLocation::ShadowRoot(0));
        assert_eq!(video.intrinsic_size(), (6, 4));
    }

    #[test]
    fn test_loading_video_has_no_size() {
        let manifest = PageManifest {
            videos: vec![VideoEntry::default()],
            ..PageManifest::default()
        };
        let document = manifest.into_document(Path::new(".")).unwrap();
        let (_, video) = document.find_video().unwrap();
        assert_eq!(video.intrinsic_size(), (0, 0));
    }

    #[test]
    fn test_missing_image_is_an_error() {
        let dir = tempdir().unwrap();
        let manifest = PageManifest {
            videos: vec![VideoEntry {
                image: Some(PathBuf::from("missing.png")),
            }],
            ..PageManifest::default()
        };
        assert!(manifest.into_document(dir.path()).is_err());
    }
}
