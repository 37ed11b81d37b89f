//! State shared between the capture side and the display
//!
//! The display thread owns updates; other threads read snapshots through
//! [`SharedDisplayState`].

pub mod state;

pub use state::{DisplayState, StatusKind};

use parking_lot::RwLock;
use std::sync::Arc;

/// Display state behind a lock
pub type SharedDisplayState = Arc<RwLock<DisplayState>>;
