//! Routing context
//!
//! Receives captured images, hands them to the OCR context and relays
//! every event back to the display, tagged with the request it belongs to.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, OnceCell};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use super::context::{OcrContext, OcrContextHandle, StartOcr};
use super::gate::{AdmissionGate, AdmissionPolicy};
use super::messages::{CaptureMessage, ContextMessage, OcrEvent, RoutedEvent};
use crate::error::OcrError;
use crate::vision::BackendLoader;

/// Router settings
#[derive(Debug, Clone)]
pub struct RouterConfig {
    pub admission: AdmissionPolicy,
    /// Upper bound for a single recognition
    pub timeout: Duration,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            admission: AdmissionPolicy::default(),
            timeout: Duration::from_secs(60),
        }
    }
}

/// Where relayed events end up
pub trait DisplaySink: Send + Sync {
    /// Deliver one event. Fails with `DeliveryFailed` when nobody listens.
    fn deliver(&self, event: RoutedEvent) -> Result<(), OcrError>;
}

impl DisplaySink for crossbeam_channel::Sender<RoutedEvent> {
    fn deliver(&self, event: RoutedEvent) -> Result<(), OcrError> {
        self.send(event).map_err(|_| OcrError::DeliveryFailed)
    }
}

/// A display that is never open
#[cfg(test)]
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDisplay;

#[cfg(test)]
impl DisplaySink for NoDisplay {
    fn deliver(&self, _event: RoutedEvent) -> Result<(), OcrError> {
        Err(OcrError::DeliveryFailed)
    }
}

/// Routes capture requests to the OCR context
pub struct Router {
    config: RouterConfig,
    loader: Arc<dyn BackendLoader>,
    context: OnceCell<OcrContextHandle>,
    gate: AdmissionGate,
    display: Arc<dyn DisplaySink>,
    shutdown: CancellationToken,
    started: AtomicU64,
}

impl Router {
    /// Create a router. The OCR context is spawned on the first dispatch.
    pub fn new(config: RouterConfig, loader: Arc<dyn BackendLoader>, display: Arc<dyn DisplaySink>) -> Self {
        Self {
            gate: AdmissionGate::new(config.admission),
            config,
            loader,
            context: OnceCell::new(),
            display,
            shutdown: CancellationToken::new(),
            started: AtomicU64::new(0),
        }
    }

    /// Whether the OCR context has been spawned
    pub fn is_context_started(&self) -> bool {
        self.context.initialized()
    }

    /// Number of requests handed to the OCR context
    pub fn requests_started(&self) -> u64 {
        self.started.load(Ordering::Relaxed)
    }

    async fn context(&self) -> &OcrContextHandle {
        self.context
            .get_or_init(|| async {
                info!("Spawning OCR context");
                let context = Arc::new(OcrContext::new(self.loader.clone(), self.config.timeout));
                context.spawn(self.shutdown.child_token())
            })
            .await
    }

    /// Recognize the captured image, relaying progress and the outcome to
    /// the display. Returns the recognized text.
    ///
    /// The admission slot travels with the request, so dropping this future
    /// does not free the slot before the OCR context is done with the image.
    pub async fn dispatch(&self, message: CaptureMessage) -> Result<String, OcrError> {
        let request_id = Uuid::new_v4();

        if self.gate.policy() == AdmissionPolicy::Queue && self.gate.is_busy() {
            info!("[{}] Waiting for the outstanding capture to finish", request_id);
        }
        let permit = match self.gate.admit().await {
            Ok(permit) => permit,
            Err(e) => {
                warn!("[{}] Rejecting capture: {}", request_id, e);
                self.deliver(request_id, OcrEvent::Error(e.clone()));
                return Err(e);
            }
        };

        let (width, height) = message.image.dimensions();
        debug!("[{}] Dispatching {}x{} image", request_id, width, height);
        trace!(
            "[{}] -> {}",
            request_id,
            wire(&ContextMessage::StartOcr(message.image.clone()))
        );

        let (tx, mut rx) = mpsc::unbounded_channel();
        let request = StartOcr {
            request_id,
            image: message.image,
            events: tx,
            permit,
        };

        if let Err(e) = self.context().await.start_ocr(request) {
            self.deliver(request_id, OcrEvent::Error(e.clone()));
            return Err(e);
        }
        self.started.fetch_add(1, Ordering::Relaxed);

        while let Some(event) = rx.recv().await {
            trace!("[{}] <- {}", request_id, wire(&event.to_context_message()));
            let outcome = match &event {
                OcrEvent::Progress(_) => None,
                OcrEvent::Result { text } => Some(Ok(text.clone())),
                OcrEvent::Error(e) => Some(Err(e.clone())),
            };
            self.deliver(request_id, event);
            if let Some(outcome) = outcome {
                return outcome;
            }
        }

        // The context went away without answering
        let e = OcrError::BackendUnavailable("OCR context stopped".to_string());
        self.deliver(request_id, OcrEvent::Error(e.clone()));
        Err(e)
    }

    /// Show a capture-side failure without involving the OCR context
    pub fn report_failure(&self, error: OcrError) {
        self.deliver(Uuid::new_v4(), OcrEvent::Error(error));
    }

    fn deliver(&self, request_id: Uuid, event: OcrEvent) {
        if let OcrEvent::Error(e) = &event {
            if !e.is_user_visible() {
                debug!("[{}] Not showing: {}", request_id, e);
                return;
            }
        }
        if let Err(e) = self.display.deliver(RoutedEvent { request_id, event }) {
            debug!("[{}] Display delivery skipped: {}", request_id, e);
        }
    }

    /// Stop the OCR context
    pub fn shutdown(&self) {
        if self.is_context_started() {
            info!("Stopping OCR context after {} requests", self.requests_started());
        }
        self.shutdown.cancel();
    }
}

impl Drop for Router {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// JSON wire form of a message, for trace logs
fn wire(message: &impl Serialize) -> String {
    serde_json::to_string(message).unwrap_or_else(|e| format!("<unserializable: {}>", e))
}
