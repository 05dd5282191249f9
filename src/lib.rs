//! # edgequake-qpaper
//!
//! Generate question papers and answer keys from study material with Gemini,
//! then export the rendered paper as a paginated A4 PDF.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDFs / images / storage
//!  │
//!  ├─ 1. Source   read, sniff and classify the selection (all PDFs or all images)
//!  ├─ 2. Extract  PDF text layer via pdfium (spawn_blocking)
//!  ├─ 3. Request  system instruction + text or inline-image payload
//!  ├─ 4. Stream   Gemini streamGenerateContent over SSE, chunk by chunk
//!  ├─ 5. Split    questions | ---ANSWERS--- | answer key
//!  └─ 6. Export   captured bitmap → A4 slices → PDF
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_qpaper::{ApiCredential, GenerationConfig, Session};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = GenerationConfig::builder()
//!         .institution_name("Elite Academy")
//!         .num_questions(5)
//!         .build()?;
//!     let mut session = Session::new(config, ApiCredential::from_env());
//!     session.select_files(&["chapter1.pdf".into()]).await?;
//!
//!     let client = session.gemini_client().ok_or("API_KEY not set")?;
//!     session.generate(&client).await?;
//!     println!("{}\n\nANSWERS\n{}", session.questions(), session.answers());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `qpaper` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-qpaper = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod export;
pub mod output;
pub mod paper;
pub mod pdfium;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod session;
pub mod storage;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    ApiCredential, ExportConfig, GenerationConfig, GenerationConfigBuilder, Language,
    ObjectiveLayout, QuestionType,
};
pub use error::{QpaperError, SliceError};
pub use export::{
    document_filename, export_bitmap, plan_slices, BitmapSource, CropSurface, DocumentWriter,
    ExportPhase, ExportedDocument, ImageFileSource, PageGeometry, PageSlice,
    PdfiumDocumentWriter, SliceSurface,
};
pub use output::StreamedResult;
pub use pipeline::llm::{stream_generation, ChunkStream, GeminiClient, GenerationService};
pub use pipeline::request::{build_request, GenerationRequest, Payload};
pub use pipeline::source::{ImageAttachment, ImageMime, SourceMaterial};
pub use progress::{NoopProgressCallback, PaperProgressCallback, ProgressCallback};
pub use session::{BusyState, ExportReport, Session};
