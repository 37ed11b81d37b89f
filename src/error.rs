//! Error kinds shared by the capture, recognition and relay layers
//!
//! Every failure that reaches the display travels inside an
//! [`OcrEvent::Error`](crate::relay::OcrEvent), so the type is `Clone` and
//! carries only owned data.

use std::time::Duration;
use thiserror::Error;

/// Errors produced while capturing, recognizing or relaying a frame
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OcrError {
    /// No video source anywhere reachable from the document
    #[error("No video found on page. Make sure the video is playing or paused.")]
    NoVideoFound,

    /// A video exists but has not decoded a frame yet
    #[error("Video not ready. Please play the video first, then pause and try again.")]
    VideoNotReady,

    /// The OCR backend could not be initialized
    #[error("OCR engine not ready: {0}")]
    BackendUnavailable(String),

    /// The OCR backend reported a failure
    #[error("OCR failed: {0}")]
    RecognitionFailed(String),

    /// The OCR backend did not answer within the configured timeout
    #[error("OCR timed out after {0:?}")]
    RecognitionTimedOut(Duration),

    /// A capture was requested while another one is still being processed
    #[error("A capture is already being processed. Try again when it finishes.")]
    RequestInFlight,

    /// The captured frame could not be encoded or decoded
    #[error("Failed to capture frame: {0}")]
    Encode(String),

    /// The display is not listening
    #[error("Display is not listening")]
    DeliveryFailed,
}

impl OcrError {
    /// Whether this error should ever be shown to the user
    pub fn is_user_visible(&self) -> bool {
        !matches!(self, OcrError::DeliveryFailed)
    }
}

impl From<image::ImageError> for OcrError {
    fn from(err: image::ImageError) -> Self {
        OcrError::Encode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_match_display_text() {
        assert_eq!(
            OcrError::NoVideoFound.to_string(),
            "No video found on page. Make sure the video is playing or paused."
        );
        assert_eq!(
            OcrError::RecognitionFailed("bad image".to_string()).to_string(),
            "OCR failed: bad image"
        );
        assert_eq!(
            OcrError::RecognitionTimedOut(Duration::from_secs(30)).to_string(),
            "OCR timed out after 30s"
        );
    }

    #[test]
    fn test_delivery_failure_is_hidden() {
        assert!(!OcrError::DeliveryFailed.is_user_visible());
        assert!(OcrError::VideoNotReady.is_user_visible());
    }
}
