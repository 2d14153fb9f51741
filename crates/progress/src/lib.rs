//! Tutorial progress tracking.
//!
//! The progress store persists per-tutorial visits and completions; the
//! projection turns store state into what the tutorial hub displays.

#![warn(missing_docs)]

pub mod tracker;
pub mod projection;

pub use tracker::{Listener, ProgressStore, StoreConfig, DEFAULT_STORAGE_KEY};
pub use projection::{Badge, ProgressUi, ProgressView, Toast, ToastQueue, TOAST_LIFETIME_MS};
