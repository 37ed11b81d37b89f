//! Display session state

use crate::relay::OcrEvent;

/// Kind of the status line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusKind {
    #[default]
    Default,
    Processing,
    Success,
    Error,
}

/// Status line shown under the extracted text
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Status {
    pub kind: StatusKind,
    pub message: String,
}

impl Status {
    fn new(kind: StatusKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// What the display currently shows
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DisplayState {
    /// Last successfully extracted text
    pub current_text: String,
    /// Whether a capture is outstanding
    pub is_processing: bool,
    pub status: Status,
}

impl DisplayState {
    /// Start from previously persisted text
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            current_text: text.into(),
            ..Self::default()
        }
    }

    /// A capture was requested
    pub fn begin_capture(&mut self) {
        self.is_processing = true;
        self.status = Status::new(StatusKind::Processing, "Capturing frame...");
    }

    /// Apply one relayed event.
    ///
    /// Returns the new text when the event replaced it.
    pub fn apply(&mut self, event: &OcrEvent) -> Option<&str> {
        match event {
            OcrEvent::Progress(progress) => {
                let message = match progress.fraction {
                    Some(fraction) => format!("{} {}%", progress.status, (fraction * 100.0).round() as u32),
                    None => progress.status.clone(),
                };
                self.is_processing = true;
                self.status = Status::new(StatusKind::Processing, message);
                None
            }
            OcrEvent::Result { text } => {
                self.is_processing = false;
                if text.trim().is_empty() {
                    self.status = Status::new(StatusKind::Default, "No text found in frame");
                    return None;
                }
                self.current_text = text.clone();
                self.status = Status::new(
                    StatusKind::Success,
                    format!("✓ Extracted {} characters", text.chars().count()),
                );
                Some(self.current_text.as_str())
            }
            OcrEvent::Error(e) => {
                // A refused capture leaves the outstanding one running
                if !event.is_rejection() {
                    self.is_processing = false;
                }
                self.status = Status::new(StatusKind::Error, e.to_string());
                None
            }
        }
    }

    /// Character count label for the current text
    pub fn char_count_label(&self) -> String {
        let count = self.current_text.chars().count();
        if count == 1 {
            "1 character".to_string()
        } else {
            format!("{} characters", count)
        }
    }
}
