//! Progress-callback trait for generation and export events.
//!
//! Inject an [`Arc<dyn PaperProgressCallback>`] into
//! [`crate::session::Session::with_progress`] to receive events as chunks
//! stream in and as export pages are placed. The binary uses this to drive
//! its terminal spinner; a GUI would forward events to its own widgets.
//!
//! # Example
//!
//! ```rust
//! use edgequake_qpaper::PaperProgressCallback;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! struct CharCounter(AtomicUsize);
//!
//! impl PaperProgressCallback for CharCounter {
//!     fn on_chunk(&self, chunk: &str, _total_len: usize) {
//!         self.0.fetch_add(chunk.chars().count(), Ordering::SeqCst);
//!     }
//! }
//!
//! let counter = CharCounter(AtomicUsize::new(0));
//! counter.on_chunk("1. What is", 10);
//! assert_eq!(counter.0.load(Ordering::SeqCst), 10);
//! ```

use crate::export::ExportPhase;
use std::sync::Arc;

/// Called by the session as a generation or export makes progress.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait PaperProgressCallback: Send + Sync {
    /// Called once the request is built, before the service is contacted.
    ///
    /// # Arguments
    /// * `model`: model identifier the request targets
    fn on_generation_start(&self, model: &str) {
        let _ = model;
    }

    /// Called for every non-empty chunk, in arrival order.
    ///
    /// # Arguments
    /// * `chunk`: the text just appended
    /// * `total_len`: byte length of the accumulated output
    fn on_chunk(&self, chunk: &str, total_len: usize) {
        let _ = (chunk, total_len);
    }

    /// Called when the stream ends normally.
    fn on_generation_complete(&self, chunks: usize, has_answers: bool) {
        let _ = (chunks, has_answers);
    }

    /// Called when the generation fails; partial output is kept.
    fn on_generation_error(&self, error: &str) {
        let _ = error;
    }

    /// Called on every export state transition.
    fn on_export_phase(&self, phase: ExportPhase) {
        let _ = phase;
    }

    /// Called after each slice is placed.
    ///
    /// # Arguments
    /// * `page`: 1-indexed page number
    /// * `total`: planned page count
    fn on_slice_placed(&self, page: usize, total: usize) {
        let _ = (page, total);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl PaperProgressCallback for NoopProgressCallback {}

/// Shared handle stored by the session.
pub type ProgressCallback = Arc<dyn PaperProgressCallback>;
