//! One user's working state: the active source, the streamed result, and the
//! busy flag that keeps generation and export from overlapping.
//!
//! ## Source exclusivity
//!
//! At most one source is active. Every selection (files or storage) clears
//! the previous source first, so a failed selection leaves nothing selected
//! rather than a stale source.
//!
//! ## Single flight
//!
//! Generation and export share one [`BusyState`]. Starting either while the
//! other runs fails with [`QpaperError::Busy`]. The state is reset by a drop
//! guard, so a cancelled future cannot leave the session stuck.

use crate::config::{ApiCredential, ExportConfig, GenerationConfig, DEFAULT_MODEL};
use crate::error::{QpaperError, SliceError};
use crate::export::{
    document_filename, export_bitmap, BitmapSource, DocumentWriter, ExportPhase, SliceSurface,
};
use crate::output::StreamedResult;
use crate::pipeline::extract::{PdfiumTextExtractor, TextExtractor};
use crate::pipeline::llm::{stream_generation, GeminiClient, GenerationService};
use crate::pipeline::request::build_request;
use crate::pipeline::source::{classify, describe_upload, read_files, Selection, SourceMaterial};
use crate::progress::{NoopProgressCallback, ProgressCallback};
use crate::storage::{self, StorageEntry};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// Shown when math typesetting fails before capture; the export continues.
pub const MATH_PREP_NOTICE: &str =
    "Error preparing mathematical content for PDF. PDF math might not be rendered correctly.";

/// What the session is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BusyState {
    Idle,
    Generating,
    Exporting,
}

impl BusyState {
    fn label(self) -> &'static str {
        match self {
            BusyState::Idle => "idle",
            BusyState::Generating => "generation",
            BusyState::Exporting => "export",
        }
    }
}

/// Resets the busy slot to idle when dropped.
struct BusyGuard {
    slot: Arc<Mutex<BusyState>>,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        *lock(&self.slot) = BusyState::Idle;
    }
}

fn lock(slot: &Mutex<BusyState>) -> MutexGuard<'_, BusyState> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The source currently selected, with its user-facing description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveSource {
    pub material: SourceMaterial,
    pub description: String,
}

/// Outcome of a successful export.
#[derive(Debug, Clone)]
pub struct ExportReport {
    pub path: PathBuf,
    pub pages: usize,
    /// Non-empty when the whole-bitmap fallback was used.
    pub slice_errors: Vec<SliceError>,
}

/// Working state of one question-paper session.
pub struct Session {
    config: GenerationConfig,
    export_config: ExportConfig,
    model: String,
    credential: Option<ApiCredential>,
    source: Option<ActiveSource>,
    result: StreamedResult,
    busy: Arc<Mutex<BusyState>>,
    phase: ExportPhase,
    last_error: Option<String>,
    progress: ProgressCallback,
    extractor: Arc<dyn TextExtractor>,
}

impl Session {
    /// A session with default export settings and the pdfium extractor.
    ///
    /// Without a credential every command except generation still works.
    pub fn new(config: GenerationConfig, credential: Option<ApiCredential>) -> Self {
        if credential.is_none() {
            warn!("{}", QpaperError::MissingCredential);
        }
        Self {
            config,
            export_config: ExportConfig::default(),
            model: DEFAULT_MODEL.to_string(),
            credential,
            source: None,
            result: StreamedResult::new(),
            busy: Arc::new(Mutex::new(BusyState::Idle)),
            phase: ExportPhase::Idle,
            last_error: None,
            progress: Arc::new(NoopProgressCallback),
            extractor: Arc::new(PdfiumTextExtractor),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_export_config(mut self, export_config: ExportConfig) -> Self {
        self.export_config = export_config;
        self
    }

    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    // ── Accessors ────────────────────────────────────────────────────────

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// Replace the configuration. Refused while busy.
    pub fn set_config(&mut self, config: GenerationConfig) -> Result<(), QpaperError> {
        self.ensure_idle("configuration change")?;
        self.config = config;
        Ok(())
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// The persistent notice shown while no credential is configured.
    pub fn credential_notice(&self) -> Option<String> {
        self.credential
            .is_none()
            .then(|| QpaperError::MissingCredential.to_string())
    }

    /// A Gemini client for the configured credential, if any.
    pub fn gemini_client(&self) -> Option<GeminiClient> {
        self.credential.clone().map(GeminiClient::new)
    }

    pub fn source(&self) -> Option<&ActiveSource> {
        self.source.as_ref()
    }

    pub fn result(&self) -> &StreamedResult {
        &self.result
    }

    pub fn questions(&self) -> &str {
        self.result.questions()
    }

    pub fn answers(&self) -> &str {
        self.result.answers(self.is_generating())
    }

    pub fn busy_state(&self) -> BusyState {
        *lock(&self.busy)
    }

    pub fn is_generating(&self) -> bool {
        self.busy_state() == BusyState::Generating
    }

    pub fn export_phase(&self) -> ExportPhase {
        self.phase
    }

    /// The most recent error or notice, until dismissed.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn dismiss_error(&mut self) {
        self.last_error = None;
    }

    // ── Source selection ─────────────────────────────────────────────────

    /// Select files from disk. An empty list only clears the current source.
    ///
    /// PDFs are extracted on the blocking pool; images are kept as-is. On any
    /// failure the session is left with no source.
    pub async fn select_files(&mut self, paths: &[PathBuf]) -> Result<(), QpaperError> {
        self.ensure_idle("file selection")?;
        self.clear_source();
        if paths.is_empty() {
            return Ok(());
        }

        let files = match read_files(paths).await {
            Ok(files) => files,
            Err(e) => return Err(self.record(e)),
        };
        let names: Vec<String> = files.iter().map(|f| f.name.clone()).collect();

        let material = match classify(files) {
            Ok(Selection::Pdfs(files)) => {
                let extractor = Arc::clone(&self.extractor);
                let extracted = tokio::task::spawn_blocking(move || extractor.extract(&files))
                    .await
                    .map_err(|e| QpaperError::Internal(format!("Extraction task panicked: {e}")))
                    .and_then(|text| text);
                match extracted {
                    Ok(text) => SourceMaterial::Text(text),
                    Err(e) => return Err(self.record(e)),
                }
            }
            Ok(Selection::Images(images)) => SourceMaterial::Images(images),
            Err(e) => return Err(self.record(e)),
        };

        self.set_source(material, describe_upload(&names));
        Ok(())
    }

    /// Select catalogue entries. All paths must be chapter PDFs or all
    /// images.
    pub fn select_from_storage<S: AsRef<str>>(&mut self, paths: &[S]) -> Result<(), QpaperError> {
        self.ensure_idle("storage selection")?;
        self.clear_source();

        let selection = match paths.first().map(|p| storage::find(p.as_ref())) {
            None => Err(QpaperError::NoSource),
            Some(Some(StorageEntry::Image(_))) => storage::select_images(paths),
            Some(_) => storage::select_pdfs(paths),
        };
        match selection {
            Ok(sel) => {
                self.set_source(sel.source, sel.description);
                Ok(())
            }
            Err(e) => Err(self.record(e)),
        }
    }

    pub fn clear_source(&mut self) {
        if self.source.take().is_some() {
            debug!("Cleared previous source");
        }
    }

    fn set_source(&mut self, material: SourceMaterial, description: String) {
        info!("{description}");
        self.source = Some(ActiveSource {
            material,
            description,
        });
        self.last_error = None;
    }

    // ── Generation ───────────────────────────────────────────────────────

    /// Generate a paper from the active source, replacing the previous
    /// result.
    ///
    /// Returns the number of chunks received. If the service fails, the
    /// partial output is kept and the error is appended to it.
    pub async fn generate(&mut self, service: &dyn GenerationService) -> Result<usize, QpaperError> {
        let request = match &self.source {
            Some(source) => build_request(&source.material, &self.config, &self.model),
            None => Err(QpaperError::NoSource),
        };
        let request = match request {
            Ok(r) => r,
            Err(e) => return Err(self.record(e)),
        };
        if self.credential.is_none() {
            return Err(self.record(QpaperError::MissingCredential));
        }
        let _guard = match self.begin(BusyState::Generating) {
            Ok(g) => g,
            Err(e) => return Err(self.record(e)),
        };

        self.last_error = None;
        self.result.clear();
        self.progress.on_generation_start(&self.model);

        let progress = Arc::clone(&self.progress);
        let result = &mut self.result;
        let outcome = stream_generation(service, request, |chunk| {
            result.push_chunk(chunk);
            progress.on_chunk(chunk, result.raw().len());
        })
        .await;

        match outcome {
            Ok(chunks) => {
                info!(
                    "Generated {} chars in {chunks} chunks",
                    self.result.raw().chars().count()
                );
                self.progress
                    .on_generation_complete(chunks, self.result.has_delimiter());
                Ok(chunks)
            }
            Err(e) => {
                let message = e.to_string();
                self.result.annotate_error(&message);
                self.progress.on_generation_error(&message);
                Err(self.record(e))
            }
        }
    }

    /// Replace the result with output saved from an earlier generation, so
    /// it can be exported without calling the service again.
    pub fn load_output(&mut self, raw: &str) -> Result<(), QpaperError> {
        self.ensure_idle("loading saved output")?;
        self.result.clear();
        self.result.push_chunk(raw);
        debug!("Loaded {} bytes of saved output", raw.len());
        Ok(())
    }

    // ── Export ───────────────────────────────────────────────────────────

    /// Export the current questions as a paginated PDF in `out_dir`.
    ///
    /// For math papers the source typesets first and the session waits the
    /// configured settle delay before capturing. A typesetting failure is
    /// only a notice, and capture then proceeds without the delay.
    pub async fn export(
        &mut self,
        source: &dyn BitmapSource,
        surface: &dyn SliceSurface,
        writer: &dyn DocumentWriter,
        out_dir: &Path,
    ) -> Result<ExportReport, QpaperError> {
        if self.result.questions().is_empty() {
            return Err(self.record(QpaperError::NothingToExport));
        }
        let _guard = match self.begin(BusyState::Exporting) {
            Ok(g) => g,
            Err(e) => return Err(self.record(e)),
        };

        self.set_phase(ExportPhase::Capturing);
        if self.config.is_math_paper {
            match source.typeset_math().await {
                Ok(()) => tokio::time::sleep(self.export_config.math_settle).await,
                Err(e) => {
                    warn!("Math typesetting failed: {e}");
                    self.last_error = Some(MATH_PREP_NOTICE.to_string());
                }
            }
        }
        let bitmap = match source.capture().await {
            Ok(b) => b,
            Err(e) => return Err(self.fail_export(e)),
        };

        self.set_phase(ExportPhase::Slicing);
        let geometry = self.export_config.geometry();
        let document = match export_bitmap(&bitmap, &geometry, surface, self.progress.as_ref()) {
            Ok(d) => d,
            Err(e) => return Err(self.fail_export(e)),
        };

        self.set_phase(ExportPhase::Packaging);
        let path = out_dir.join(document_filename(&self.config.institution_name));
        if let Err(e) = writer.write(&document, &path) {
            return Err(self.fail_export(e));
        }

        self.set_phase(ExportPhase::Saved);
        Ok(ExportReport {
            path,
            pages: document.page_count(),
            slice_errors: document.slice_errors,
        })
    }

    fn set_phase(&mut self, phase: ExportPhase) {
        debug!("Export phase: {phase}");
        self.phase = phase;
        self.progress.on_export_phase(phase);
    }

    fn fail_export(&mut self, e: QpaperError) -> QpaperError {
        warn!("Export failed: {e}");
        self.set_phase(ExportPhase::Failed);
        self.record(e)
    }

    // ── Busy state ───────────────────────────────────────────────────────

    fn begin(&self, next: BusyState) -> Result<BusyGuard, QpaperError> {
        let mut state = lock(&self.busy);
        if *state != BusyState::Idle {
            return Err(QpaperError::Busy {
                requested: next.label(),
                active: state.label(),
            });
        }
        *state = next;
        Ok(BusyGuard {
            slot: Arc::clone(&self.busy),
        })
    }

    fn ensure_idle(&mut self, requested: &'static str) -> Result<(), QpaperError> {
        let active = self.busy_state();
        if active == BusyState::Idle {
            Ok(())
        } else {
            Err(self.record(QpaperError::Busy {
                requested,
                active: active.label(),
            }))
        }
    }

    fn record(&mut self, e: QpaperError) -> QpaperError {
        self.last_error = Some(e.to_string());
        e
    }
}
