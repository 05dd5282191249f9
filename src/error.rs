//! Error types for the edgequake-qpaper library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`QpaperError`]: **Fatal** for the operation that raised it: the
//!   generation or export cannot proceed (no source selected, credential
//!   missing, service rejected the key, capture failed). Every message is a
//!   single user-facing string.
//!
//! * [`SliceError`]: **Non-fatal**: one slice of the export bitmap could not
//!   be rasterised. The exporter degrades to the whole-bitmap fallback and
//!   records the error in [`crate::export::ExportedDocument`] instead of
//!   aborting the document.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-qpaper library.
#[derive(Debug, Error)]
pub enum QpaperError {
    // ── Configuration errors ──────────────────────────────────────────────
    /// No API key was supplied; the generation feature is disabled.
    #[error("Gemini API Key (API_KEY) is not configured. Please set it up to use the application.")]
    MissingCredential,

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Input errors ──────────────────────────────────────────────────────
    /// Generation was requested with no PDF text or images loaded.
    #[error("Please upload PDF(s)/Image(s) or select from Storage first.")]
    NoSource,

    /// A multi-file selection mixed PDFs and images.
    #[error("Invalid file selection. Please upload only PDF files or only image files (JPEG, PNG, GIF, WebP). Mixed types are not supported.")]
    MixedSelection,

    /// A file is neither a PDF nor one of the supported raster formats.
    #[error("Unsupported file type for '{path}'. Supported: PDF, JPEG, PNG, GIF, WebP.")]
    UnsupportedFile { path: PathBuf },

    /// Input file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// No catalogue entry lives at the given path.
    #[error("Nothing in storage at '{path}'. Run `qpaper storage` to list entries.")]
    UnknownStoragePath { path: String },

    /// A catalogue image entry has no binary payload.
    #[error("Image data missing for {name}")]
    MissingImageData { name: String },

    /// A catalogue image payload is not valid base64.
    #[error("Failed to convert base64 string for {name}.")]
    ImageDecode { name: String },

    /// Another generation or export is still running.
    #[error("Cannot start {requested}: {active} is still in progress")]
    Busy {
        requested: &'static str,
        active: &'static str,
    },

    /// Export requested before any question text exists.
    #[error("No question paper content to download.")]
    NothingToExport,

    // ── Extraction errors ─────────────────────────────────────────────────
    /// pdfium could not open the document or read a page's text layer.
    #[error("Error processing PDF(s): '{path}': {detail}")]
    PdfExtractionFailed { path: PathBuf, detail: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium or place the library next to the binary."
    )]
    PdfiumBindingFailed(String),

    // ── Service errors ────────────────────────────────────────────────────
    /// The service rejected the API key.
    #[error("The provided Gemini API Key is invalid or has expired. Please check your .env file or environment configuration.")]
    InvalidCredential,

    /// The key is valid but lacks access to the model or project.
    #[error("Gemini API Error: Permission denied. This might be due to an invalid API key or incorrect project setup. Details: {detail}")]
    ServicePermissionDenied { detail: String },

    /// HTTP 429 / RESOURCE_EXHAUSTED.
    #[error("Gemini API Error: quota exhausted. {detail}")]
    QuotaExceeded { detail: String },

    /// Any other error reported by the service.
    #[error("Gemini API Error: {message}")]
    ServiceError { message: String },

    /// The connection failed or the stream was cut.
    #[error("An error occurred while communicating with the Gemini API: {detail}")]
    Transport { detail: String },

    // ── Export errors ─────────────────────────────────────────────────────
    /// The captured bitmap has no rows or no columns.
    #[error("Captured bitmap is empty ({width}x{height}); nothing to paginate")]
    EmptyBitmap { width: u32, height: u32 },

    /// The rendered paper could not be captured as a bitmap.
    #[error("Failed to generate PDF: could not capture the rendered paper: {0}")]
    CaptureFailed(String),

    /// Assembling the paginated document failed.
    #[error("Failed to generate PDF: {0}")]
    PackagingFailed(String),

    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl QpaperError {
    /// True for failures reported by (or while talking to) the generation
    /// service. These preserve the partial streamed output.
    pub fn is_service_error(&self) -> bool {
        matches!(
            self,
            QpaperError::InvalidCredential
                | QpaperError::ServicePermissionDenied { .. }
                | QpaperError::QuotaExceeded { .. }
                | QpaperError::ServiceError { .. }
                | QpaperError::Transport { .. }
        )
    }
}

/// A non-fatal error for a single export slice.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SliceError {
    /// No drawing surface could be acquired for the slice.
    #[error("Slice {index}: could not acquire a drawing surface: {detail}")]
    SurfaceUnavailable { index: usize, detail: String },
}
