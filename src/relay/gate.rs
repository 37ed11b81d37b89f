//! Single-slot admission for OCR requests

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::OcrError;

/// What happens to a request issued while another is outstanding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionPolicy {
    /// Fail immediately with `RequestInFlight`
    #[default]
    Reject,
    /// Wait for the outstanding request to finish (FIFO)
    Queue,
}

/// Allows at most one request in flight
#[derive(Debug, Clone)]
pub struct AdmissionGate {
    policy: AdmissionPolicy,
    slot: Arc<Semaphore>,
}

impl AdmissionGate {
    /// Create a new gate
    pub fn new(policy: AdmissionPolicy) -> Self {
        Self {
            policy,
            slot: Arc::new(Semaphore::new(1)),
        }
    }

    /// Get the admission policy
    pub fn policy(&self) -> AdmissionPolicy {
        self.policy
    }

    /// Whether a request currently holds the slot
    pub fn is_busy(&self) -> bool {
        self.slot.available_permits() == 0
    }

    /// Take the slot; the request is admitted until the permit is dropped
    pub async fn admit(&self) -> Result<OwnedSemaphorePermit, OcrError> {
        match self.policy {
            AdmissionPolicy::Reject => self
                .slot
                .clone()
                .try_acquire_owned()
                .map_err(|_| OcrError::RequestInFlight),
            AdmissionPolicy::Queue => self
                .slot
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| OcrError::RequestInFlight),
        }
    }
}
