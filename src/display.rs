//! Console display
//!
//! Consumes relayed events on its own thread, keeps the shared display
//! state current and persists every newly extracted text.

use anyhow::{Context, Result};
use crossbeam_channel::Receiver;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::thread::JoinHandle;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::relay::{OcrEvent, RoutedEvent};
use crate::shared::{SharedDisplayState, StatusKind};
use crate::storage::LastTextStore;

/// Display options
#[derive(Debug, Clone, Default)]
pub struct DisplayOptions {
    /// Print wire messages as JSON lines instead of status text
    pub json: bool,
    /// Also write every extracted text into this directory
    pub save_dir: Option<PathBuf>,
}

/// Prints progress and results of capture requests
pub struct ConsoleDisplay {
    state: SharedDisplayState,
    store: Option<LastTextStore>,
    options: DisplayOptions,
}

impl ConsoleDisplay {
    /// Create a new display
    pub fn new(state: SharedDisplayState, store: Option<LastTextStore>, options: DisplayOptions) -> Self {
        Self { state, store, options }
    }

    /// Handle one event, writing its rendering to `out`
    pub fn handle_event(&self, event: &OcrEvent, out: &mut impl Write) -> Result<()> {
        let (status, new_text) = {
            let mut state = self.state.write();
            let new_text = state.apply(event).map(str::to_owned);
            (state.status.clone(), new_text)
        };

        if self.options.json {
            serde_json::to_writer(&mut *out, &event.to_display_message())?;
            writeln!(out)?;
        } else {
            match (&new_text, status.kind) {
                (Some(text), _) => {
                    writeln!(out, "{}", status.message)?;
                    writeln!(out, "{}", text)?;
                }
                (None, StatusKind::Error) => writeln!(out, "Error: {}", status.message)?,
                (None, _) => writeln!(out, "{}", status.message)?,
            }
        }

        if let Some(text) = &new_text {
            if let Some(store) = &self.store {
                if let Err(e) = store.save(text) {
                    warn!("Failed to persist extracted text: {:#}", e);
                }
            }
            if let Some(dir) = &self.options.save_dir {
                let path = export_text(dir, text, unix_timestamp())?;
                info!("Saved extracted text to {:?}", path);
            }
        }

        Ok(())
    }

    /// Run on a background thread until the followed request finishes or
    /// the sender side disconnects
    pub fn spawn(self, events: Receiver<RoutedEvent>) -> JoinHandle<()> {
        std::thread::spawn(move || {
            let stdout = std::io::stdout();
            let mut tracker = RequestTracker::default();
            for routed in events.iter() {
                let mut out = stdout.lock();
                if let Err(e) = self.handle_event(&routed.event, &mut out) {
                    tracing::error!("Display error: {:#}", e);
                    break;
                }
                if tracker.observe(&routed) {
                    break;
                }
            }
        })
    }
}

/// Follows the first admitted request through the event stream
#[derive(Debug, Default)]
pub struct RequestTracker {
    following: Option<Uuid>,
}

impl RequestTracker {
    /// Returns true once the followed request has ended.
    ///
    /// Refusals of other captures never end it.
    pub fn observe(&mut self, routed: &RoutedEvent) -> bool {
        if routed.event.is_rejection() {
            debug!("[{}] Capture refused while another is running", routed.request_id);
            return false;
        }
        let following = *self.following.get_or_insert(routed.request_id);
        following == routed.request_id && routed.event.is_terminal()
    }
}

/// File name used when exporting text taken at `unix_secs`
pub fn export_file_name(unix_secs: u64) -> String {
    format!("video-text-{}.txt", unix_secs)
}

/// Write `text` into `dir` and return the created path
pub fn export_text(dir: &Path, text: &str, unix_secs: u64) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    let path = dir.join(export_file_name(unix_secs));
    std::fs::write(&path, text).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
