//! OCR context
//!
//! Long-lived worker owning the OCR backend handle. The backend is created
//! at most once, driven by the first request so its progress reaches that
//! request; requests issued while it loads wait for the same initialization.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, OnceCell, OwnedSemaphorePermit};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::messages::OcrEvent;
use crate::error::OcrError;
use crate::vision::{BackendLoader, OcrBackend, ProcessedImage, ProgressSink};

/// Request to recognize one image
#[derive(Debug)]
pub struct StartOcr {
    pub request_id: Uuid,
    pub image: ProcessedImage,
    /// Receives progress and exactly one terminal event
    pub events: mpsc::UnboundedSender<OcrEvent>,
    /// Admission slot, released once recognition has finished
    pub permit: OwnedSemaphorePermit,
}

/// Owner of the OCR backend
pub struct OcrContext {
    loader: Arc<dyn BackendLoader>,
    backend: OnceCell<Arc<dyn OcrBackend>>,
    timeout: Duration,
}

impl OcrContext {
    /// Create a context; the backend is loaded on first use
    pub fn new(loader: Arc<dyn BackendLoader>, timeout: Duration) -> Self {
        Self {
            loader,
            backend: OnceCell::new(),
            timeout,
        }
    }

    /// Whether the backend finished initializing
    #[cfg(test)]
    pub fn is_ready(&self) -> bool {
        self.backend.initialized()
    }

    /// Get the backend, initializing it if needed.
    ///
    /// A failed initialization leaves the cell empty so the next call retries.
    pub async fn backend(&self, progress: &ProgressSink) -> Result<Arc<dyn OcrBackend>, OcrError> {
        if let Some(backend) = self.backend.get() {
            return Ok(backend.clone());
        }

        progress.report("Loading OCR model...", None);
        let backend = self
            .backend
            .get_or_try_init(|| self.loader.load(progress))
            .await?;
        progress.report("OCR model ready", None);
        Ok(backend.clone())
    }

    /// Recognize one image under the configured timeout
    pub async fn recognize(&self, image: &ProcessedImage, progress: &ProgressSink) -> Result<String, OcrError> {
        let backend = self.backend(progress).await?;
        match tokio::time::timeout(self.timeout, backend.recognize(image, progress)).await {
            Ok(result) => result,
            Err(_) => Err(OcrError::RecognitionTimedOut(self.timeout)),
        }
    }

    async fn handle(&self, request: StartOcr) {
        let StartOcr {
            request_id,
            image,
            events,
            permit,
        } = request;

        let progress = ProgressSink::new(events.clone());
        let event = match self.recognize(&image, &progress).await {
            Ok(text) => {
                debug!("[{}] Recognized {} characters", request_id, text.len());
                OcrEvent::Result { text }
            }
            Err(e) => {
                warn!("[{}] Recognition failed: {}", request_id, e);
                OcrEvent::Error(e)
            }
        };

        // Free the slot before answering so the next request can be admitted
        // as soon as the router sees this one finish
        drop(permit);
        if events.send(event).is_err() {
            debug!("[{}] Router stopped listening", request_id);
        }
    }

    /// Start the worker loop
    pub fn spawn(self: Arc<Self>, shutdown: CancellationToken) -> OcrContextHandle {
        let (tx, mut rx) = mpsc::unbounded_channel::<StartOcr>();

        let context = self;
        tokio::spawn(async move {
            info!("OCR context started");
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    request = rx.recv() => match request {
                        Some(request) => {
                            let context = context.clone();
                            tokio::spawn(async move { context.handle(request).await });
                        }
                        None => break,
                    },
                }
            }
            info!("OCR context stopped");
        });

        OcrContextHandle { tx }
    }
}

/// Sending side of a running OCR context
#[derive(Clone)]
pub struct OcrContextHandle {
    tx: mpsc::UnboundedSender<StartOcr>,
}

impl OcrContextHandle {
    /// Queue a recognition request
    pub fn start_ocr(&self, request: StartOcr) -> Result<(), OcrError> {
        self.tx
            .send(request)
            .map_err(|_| OcrError::BackendUnavailable("OCR context is not running".to_string()))
    }
}
