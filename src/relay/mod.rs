//! Relay Layer
//!
//! Moves captured images to the OCR context and its events back to the
//! display.

pub mod context;
pub mod gate;
pub mod messages;
pub mod router;

pub use gate::AdmissionPolicy;
pub use messages::{CaptureMessage, OcrEvent, RoutedEvent};
pub use router::{DisplaySink, Router, RouterConfig};
