//! Bridge to the external storm-surge model.
//!
//! - [`TrackFileWriter`] writes the case metadata and track table the model reads
//! - [`ModelRunner`] owns the model's directory layout and launches it
//! - [`CompletionWatcher`] waits, without blocking the runtime, for the
//!   sentinel file the model creates when it finishes

pub mod runner;
pub mod track_file;
pub mod watcher;

pub use runner::{ModelLayout, ModelProcess, ModelRunner, SENTINEL_FILE, USER_PLACEHOLDER};
pub use track_file::{TrackFileWriter, TrackFiles, CASE_INFO_FILE, TRACK_FILE};
pub use watcher::{CompletionWatcher, WatchOutcome};
