//! The accumulated generation output and its questions/answers split.
//!
//! The model writes the questions, then [`ANSWER_DELIMITER`], then the answer
//! key. Text is appended chunk by chunk while the stream runs, so the split is
//! recomputed on every read rather than stored. Once the delimiter has
//! arrived, every later byte belongs to the answers.

use crate::prompts::ANSWER_DELIMITER;
use serde::Serialize;

/// Shown in the answers pane while questions are still streaming.
pub const ANSWERS_PLACEHOLDER: &str = "Answers will appear here after questions...";

/// Marker inserted between partial output and a service error message.
pub const ERROR_MARKER: &str = "--- ERROR ENCOUNTERED ---";

/// Append-only text of one generation call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StreamedResult {
    raw: String,
}

impl StreamedResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one chunk. Chunks are never reordered or re-split.
    pub fn push_chunk(&mut self, chunk: &str) {
        self.raw.push_str(chunk);
    }

    /// Append a service error after whatever was streamed so far.
    pub fn annotate_error(&mut self, message: &str) {
        self.raw.push_str("\n\n");
        self.raw.push_str(ERROR_MARKER);
        self.raw.push('\n');
        self.raw.push_str(message);
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    pub fn has_delimiter(&self) -> bool {
        self.raw.contains(ANSWER_DELIMITER)
    }

    /// Text before the first delimiter, trimmed. All text if none yet.
    pub fn questions(&self) -> &str {
        match self.raw.split_once(ANSWER_DELIMITER) {
            Some((questions, _)) => questions.trim(),
            None => self.raw.trim(),
        }
    }

    /// Text after the first delimiter, trimmed.
    ///
    /// Before the delimiter arrives this is [`ANSWERS_PLACEHOLDER`] while a
    /// call is running with some output, and empty otherwise.
    pub fn answers(&self, is_generating: bool) -> &str {
        match self.raw.split_once(ANSWER_DELIMITER) {
            Some((_, answers)) => answers.trim(),
            None if is_generating && !self.raw.is_empty() => ANSWERS_PLACEHOLDER,
            None => "",
        }
    }

    pub fn clear(&mut self) {
        self.raw.clear();
    }
}
