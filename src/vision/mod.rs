//! Vision/OCR Layer
//!
//! Prepares captured frames for recognition and extracts their text.
//! Supports multiple OCR backends:
//! - Local Tesseract engine
//! - Remote OCR HTTP service

pub mod binarize;
pub mod encode;
pub mod langdata;
pub mod loader;
pub mod remote;
pub mod tesseract;

pub use binarize::binarize;
pub use encode::{save_frame, EncodeFormat, Encoder, ProcessedImage};
pub use langdata::LanguageDataManager;
pub use loader::{BackendLoader, StrategyLoader};
pub use remote::RemoteOcr;
pub use tesseract::TesseractOcr;

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedSender;

use crate::error::OcrError;
use crate::relay::OcrEvent;

/// OCR backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Tesseract running on this machine
    #[default]
    Local,
    /// Hosted OCR HTTP API
    Remote,
}

/// Text recognition capability
#[async_trait]
pub trait OcrBackend: Send + Sync {
    /// Short backend identifier for logs
    fn name(&self) -> &'static str;

    /// Extract the text of an encoded image
    async fn recognize(&self, image: &ProcessedImage, progress: &ProgressSink) -> Result<String, OcrError>;
}

/// Forwards progress updates of a single request
#[derive(Debug, Clone, Default)]
pub struct ProgressSink {
    tx: Option<UnboundedSender<OcrEvent>>,
}

impl ProgressSink {
    /// Report progress into the given event channel
    pub fn new(tx: UnboundedSender<OcrEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    /// A sink that drops every update
    #[cfg(test)]
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Report a status, optionally with a completion fraction in 0.0..=1.0
    pub fn report(&self, status: impl Into<String>, fraction: Option<f32>) {
        if let Some(tx) = &self.tx {
            // The request may already be finished; late updates are dropped
            let _ = tx.send(OcrEvent::progress(status, fraction));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::messages::Progress;
    use tokio::sync::mpsc;

    #[test]
    fn test_progress_sink_forwards_updates() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = ProgressSink::new(tx);
        sink.report("Recognizing text", Some(0.5));

        match rx.try_recv().unwrap() {
            OcrEvent::Progress(Progress { status, fraction }) => {
                assert_eq!(status, "Recognizing text");
                assert_eq!(fraction, Some(0.5));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_progress_sink_tolerates_closed_channel() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        ProgressSink::new(tx).report("ignored", None);
        ProgressSink::disabled().report("ignored", None);
    }
}
