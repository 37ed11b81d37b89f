//! Message types exchanged between the capture, routing, OCR and display
//! contexts
//!
//! Components talk through the typed [`OcrEvent`]. The serde types below are
//! the JSON wire form of the same messages.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::OcrError;
use crate::vision::ProcessedImage;

/// A status update emitted while a request is being processed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    /// Human readable status
    pub status: String,
    /// Completion in 0.0..=1.0, when known
    #[serde(rename = "progress", default, skip_serializing_if = "Option::is_none")]
    pub fraction: Option<f32>,
}

/// Events produced for one OCR request
///
/// Zero or more `Progress` events are followed by exactly one `Result` or
/// `Error`.
#[derive(Debug, Clone, PartialEq)]
pub enum OcrEvent {
    Progress(Progress),
    Result { text: String },
    Error(OcrError),
}

impl OcrEvent {
    /// Build a progress event
    pub fn progress(status: impl Into<String>, fraction: Option<f32>) -> Self {
        OcrEvent::Progress(Progress {
            status: status.into(),
            fraction,
        })
    }

    /// Whether this event ends its request
    pub fn is_terminal(&self) -> bool {
        !matches!(self, OcrEvent::Progress(_))
    }

    /// Whether this is the refusal of a request that was never admitted
    pub fn is_rejection(&self) -> bool {
        matches!(self, OcrEvent::Error(OcrError::RequestInFlight))
    }

    /// Wire form sent by the OCR context
    pub fn to_context_message(&self) -> ContextMessage {
        match self {
            OcrEvent::Progress(p) => ContextMessage::OcrProgress(p.clone()),
            OcrEvent::Result { text } => ContextMessage::OcrResult(TextPayload { text: text.clone() }),
            OcrEvent::Error(e) => ContextMessage::OcrError(e.to_string()),
        }
    }

    /// Wire form delivered to the display
    pub fn to_display_message(&self) -> DisplayMessage {
        match self {
            OcrEvent::Progress(p) => DisplayMessage::OcrProgress(p.clone()),
            OcrEvent::Result { text } => DisplayMessage::OcrResult(TextPayload { text: text.clone() }),
            OcrEvent::Error(e) => DisplayMessage::OcrError(e.to_string()),
        }
    }
}

/// An event tagged with the request it belongs to
#[derive(Debug, Clone, PartialEq)]
pub struct RoutedEvent {
    pub request_id: Uuid,
    pub event: OcrEvent,
}

/// Capture context to router: `{ "image": ... }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureMessage {
    pub image: ProcessedImage,
}

/// Recognized text payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextPayload {
    pub text: String,
}

/// Router <-> OCR context: `{ "type": ..., "payload": ... }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ContextMessage {
    StartOcr(ProcessedImage),
    OcrProgress(Progress),
    OcrResult(TextPayload),
    OcrError(String),
}

/// Router to display: `{ "ocr_progress": ... }`, `{ "ocr_result": { "text" } }`
/// or `{ "ocr_error": message }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayMessage {
    OcrProgress(Progress),
    OcrResult(TextPayload),
    OcrError(String),
}
