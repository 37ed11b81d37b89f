//! Application Coordinator
//!
//! Wires the capture side (sampler, binarizer, encoder) to the router.

use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::capture::{Document, FrameSampler};
use crate::config::AppConfig;
use crate::error::OcrError;
use crate::relay::{CaptureMessage, DisplaySink, Router, RouterConfig};
use crate::vision::{binarize, save_frame, BackendLoader, Encoder, StrategyLoader};

/// Main application coordinator
pub struct OcrApp {
    sampler: FrameSampler,
    encoder: Encoder,
    binarize: bool,
    frame_dump: Option<PathBuf>,
    router: Arc<Router>,
}

impl OcrApp {
    /// Create the app with backends chosen from the configuration
    pub fn new(config: &AppConfig, display: Arc<dyn DisplaySink>) -> Self {
        let loader = Arc::new(StrategyLoader::from_settings(&config.ocr));
        Self::with_loader(config, loader, display)
    }

    /// Create the app with a specific backend loader
    pub fn with_loader(config: &AppConfig, loader: Arc<dyn BackendLoader>, display: Arc<dyn DisplaySink>) -> Self {
        let router_config = RouterConfig {
            admission: config.relay.admission,
            timeout: config.ocr.timeout(),
        };

        Self {
            sampler: FrameSampler::new(config.capture.capture_config()),
            encoder: Encoder::new(config.encoding.format, config.encoding.jpeg_quality),
            binarize: config.capture.binarize,
            frame_dump: None,
            router: Arc::new(Router::new(router_config, loader, display)),
        }
    }

    /// Also write every image handed to OCR to `path` as PNG
    pub fn with_frame_dump(mut self, path: Option<PathBuf>) -> Self {
        self.frame_dump = path;
        self
    }

    /// Capture, preprocess and encode the current frame of the document
    pub fn prepare(&self, document: &Document) -> Result<CaptureMessage, OcrError> {
        let mut frame = self.sampler.capture(document)?;
        if self.binarize {
            frame = binarize(&frame);
        }
        let image = self.encoder.encode(&frame)?;
        debug!(
            "Encoded {}x{} frame as {:?} ({} bytes)",
            frame.width,
            frame.height,
            self.encoder.format(),
            image.byte_len()
        );
        if let Some(path) = &self.frame_dump {
            match save_frame(&image, path) {
                Ok(()) => info!("Saved OCR input to {:?}", path),
                Err(e) => warn!("Failed to save OCR input: {:#}", e),
            }
        }
        Ok(CaptureMessage { image })
    }

    /// Extract the text of the document's current video frame.
    ///
    /// Capture failures are shown on the display without reaching the OCR
    /// context.
    pub async fn capture(&self, document: &Document) -> Result<String, OcrError> {
        let message = match self.prepare(document) {
            Ok(message) => message,
            Err(e) => {
                info!("Capture failed: {}", e);
                self.router.report_failure(e.clone());
                return Err(e);
            }
        };
        self.router.dispatch(message).await
    }

    /// Stop background work
    pub fn shutdown(&self) {
        self.router.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::source::FrameOrigin;
    use crate::capture::StillVideo;
    use crate::relay::router::NoDisplay;
    use crate::relay::{OcrEvent, RoutedEvent};
    use crate::vision::encode::decode;
    use crate::vision::{EncodeFormat, OcrBackend, ProcessedImage, ProgressSink};
    use async_trait::async_trait;
    use image::{Rgba, RgbaImage};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    /// Reports how many pure white pixels the image holds
    struct WhiteCounter {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl OcrBackend for WhiteCounter {
        fn name(&self) -> &'static str {
            "white-counter"
        }

        async fn recognize(&self, image: &ProcessedImage, _progress: &ProgressSink) -> Result<String, OcrError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let frame = decode(image)?;
            let white = frame
                .data
                .chunks_exact(4)
                .filter(|px| px[0] == 255 && px[1] == 255 && px[2] == 255)
                .count();
            Ok(format!("white={}", white))
        }
    }

    struct Loader(Arc<WhiteCounter>);

    #[async_trait]
    impl BackendLoader for Loader {
        async fn load(&self, _progress: &ProgressSink) -> Result<Arc<dyn OcrBackend>, OcrError> {
            Ok(self.0.clone())
        }
    }

    fn app(display: Arc<dyn DisplaySink>) -> (OcrApp, Arc<WhiteCounter>) {
        let mut config = AppConfig::default();
        config.encoding.format = EncodeFormat::Png;
        let backend = Arc::new(WhiteCounter {
            calls: AtomicUsize::new(0),
        });
        let app = OcrApp::with_loader(&config, Arc::new(Loader(backend.clone())), display);
        (app, backend)
    }

    fn light_and_dark() -> Arc<StillVideo> {
        let mut image = RgbaImage::from_pixel(4, 2, Rgba([200, 200, 200, 255]));
        image.put_pixel(0, 0, Rgba([10, 10, 10, 255]));
        image.put_pixel(1, 0, Rgba([128, 128, 128, 255]));
        Arc::new(StillVideo::new(image))
    }

    #[tokio::test]
    async fn test_missing_video_reports_once_without_ocr() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let (app, backend) = app(Arc::new(tx));

        let mut document = Document::new();
        document.push_frame(FrameOrigin::CrossOrigin, vec![light_and_dark()]);

        assert_eq!(app.capture(&document).await.unwrap_err(), OcrError::NoVideoFound);

        let events: Vec<_> = rx.try_iter().map(|routed: RoutedEvent| routed.event).collect();
        assert_eq!(events, vec![OcrEvent::Error(OcrError::NoVideoFound)]);
        assert_eq!(app.router.requests_started(), 0);
        assert!(!app.router.is_context_started());
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_frame_is_binarized_before_recognition() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let (app, backend) = app(Arc::new(tx));

        let text = app.capture(&Document::with_video(light_and_dark())).await.unwrap();

        // Two dark pixels (10 and exactly 128) collapse to black, six to white
        assert_eq!(text, "white=6");
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
        let last = rx.try_iter().last().map(|routed: RoutedEvent| routed.event);
        assert_eq!(last, Some(OcrEvent::Result { text }));
    }

    #[tokio::test]
    async fn test_prepare_keeps_dimensions() {
        let (app, _) = app(Arc::new(NoDisplay));
        let message = app.prepare(&Document::with_video(light_and_dark())).unwrap();
        assert_eq!(message.image.dimensions(), (4, 2));
    }

    #[tokio::test]
    async fn test_frame_dump_holds_binarized_frame() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("frame.png");
        let (app, _) = app(Arc::new(NoDisplay));
        let app = app.with_frame_dump(Some(path.clone()));

        app.prepare(&Document::with_video(light_and_dark())).unwrap();

        let saved = image::open(&path).unwrap().to_rgba8();
        assert_eq!(saved.dimensions(), (4, 2));
        assert_eq!(saved.get_pixel(0, 0), &Rgba([0, 0, 0, 255]));
        assert_eq!(saved.get_pixel(3, 1), &Rgba([255, 255, 255, 255]));
    }

    #[tokio::test]
    async fn test_unwritable_frame_dump_does_not_fail_capture() {
        let dir = tempdir().unwrap();
        let (app, _) = app(Arc::new(NoDisplay));
        let app = app.with_frame_dump(Some(dir.path().join("missing").join("frame.png")));

        assert!(app.prepare(&Document::with_video(light_and_dark())).is_ok());
    }
}
