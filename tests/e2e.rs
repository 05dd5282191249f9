//! End-to-end integration tests for edgequake-qpaper.
//!
//! The offline tests drive a full session (storage selection, streaming,
//! answer split, export) against scripted services. The live tests call
//! Gemini and pdfium and are gated behind `E2E_ENABLED` so they do not run
//! in CI unless explicitly requested.
//!
//! Run with:
//!   E2E_ENABLED=1 API_KEY=... cargo test --test e2e -- --nocapture
//!
//! To restrict to a specific test:
//!   E2E_ENABLED=1 cargo test --test e2e live_export -- --nocapture

use edgequake_qpaper::pipeline::request::Part;
use edgequake_qpaper::{
    ApiCredential, BitmapSource, ChunkStream, CropSurface, DocumentWriter, ExportConfig,
    ExportPhase, ExportedDocument, GenerationConfig, GenerationRequest, GenerationService,
    ImageFileSource, Language, Payload, PdfiumDocumentWriter, QpaperError, QuestionType, Session,
};
use futures::future::BoxFuture;
use futures::stream;
use image::{DynamicImage, Rgba, RgbaImage};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

// ── Test helpers ─────────────────────────────────────────────────────────────

const REAL_NUMBERS: &str = "storage/Class 10/Mathematics/Chapter 1 - Real Numbers.pdf";
const PHYSICS_PNG: &str = "storage/model_paper/MQ_Physics_SetA_Page1.png";

/// Replays fixed chunks and records the request it was given.
struct ScriptedGemini {
    chunks: Vec<&'static str>,
    fail_with: Option<fn() -> QpaperError>,
    seen: Mutex<Option<GenerationRequest>>,
}

impl ScriptedGemini {
    fn new(chunks: Vec<&'static str>) -> Self {
        Self {
            chunks,
            fail_with: None,
            seen: Mutex::new(None),
        }
    }

    fn request(&self) -> GenerationRequest {
        self.seen.lock().unwrap().clone().expect("no request seen")
    }
}

impl GenerationService for ScriptedGemini {
    fn stream_generate(&self, request: GenerationRequest) -> ChunkStream {
        *self.seen.lock().unwrap() = Some(request);
        let mut items: Vec<Result<String, QpaperError>> =
            self.chunks.iter().map(|c| Ok(c.to_string())).collect();
        if let Some(err) = self.fail_with {
            items.push(Err(err()));
        }
        Box::pin(stream::iter(items))
    }
}

/// A rendered paper: white with a dark band every 100 rows.
struct PaperBitmap {
    width: u32,
    height: u32,
}

impl BitmapSource for PaperBitmap {
    fn capture(&self) -> BoxFuture<'_, Result<DynamicImage, QpaperError>> {
        Box::pin(async move {
            let img = RgbaImage::from_fn(self.width, self.height, |_, y| {
                if y % 100 < 4 {
                    Rgba([0, 0, 0, 255])
                } else {
                    Rgba([255, 255, 255, 255])
                }
            });
            Ok(DynamicImage::ImageRgba8(img))
        })
    }
}

#[derive(Default)]
struct KeepDocument(Mutex<Option<(PathBuf, ExportedDocument)>>);

impl DocumentWriter for KeepDocument {
    fn write(&self, document: &ExportedDocument, path: &Path) -> Result<(), QpaperError> {
        *self.0.lock().unwrap() = Some((path.to_path_buf(), document.clone()));
        Ok(())
    }
}

fn session(config: GenerationConfig) -> Session {
    Session::new(config, ApiCredential::new("test-key")).with_export_config(ExportConfig {
        math_settle: Duration::from_millis(1),
        ..ExportConfig::default()
    })
}

/// Skip this test if E2E_ENABLED is not set.
macro_rules! e2e_skip_unless_enabled {
    () => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP — set E2E_ENABLED=1 to run e2e tests");
            return;
        }
    }};
}

// ── Offline: generation ──────────────────────────────────────────────────────

#[tokio::test]
async fn storage_chapter_generates_questions_and_answers() {
    let mut s = session(GenerationConfig::default());
    s.select_from_storage(&[REAL_NUMBERS]).unwrap();

    let gemini = ScriptedGemini::new(vec!["1. What...\n", "---ANSWERS---\n1. A"]);
    let chunks = s.generate(&gemini).await.unwrap();

    assert_eq!(chunks, 2);
    assert_eq!(s.questions(), "1. What...");
    assert_eq!(s.answers(), "1. A");
    assert!(s.last_error().is_none());
    assert!(!s.is_generating());

    let request = gemini.request();
    assert_eq!(request.model, "gemini-2.5-pro");
    match request.payload {
        Payload::Text(text) => {
            assert!(text.starts_with("Text Content to use for generating questions and answers:"));
            assert!(text.contains("Euclid"));
        }
        other => panic!("expected text payload, got {other:?}"),
    }
}

#[tokio::test]
async fn storage_image_is_sent_inline() {
    let config = GenerationConfig::builder()
        .num_questions(3)
        .language(Language::Hindi)
        .question_type(QuestionType::Subjective)
        .build()
        .unwrap();
    let mut s = session(config);
    s.select_from_storage(&[PHYSICS_PNG]).unwrap();

    let gemini = ScriptedGemini::new(vec!["1. प्रश्न"]);
    s.generate(&gemini).await.unwrap();

    let request = gemini.request();
    assert!(request.system_instruction.contains("Hindi"));
    let Payload::MultiPart(parts) = request.payload else {
        panic!("image sources use a multi-part payload");
    };
    assert_eq!(parts.len(), 2);
    match &parts[0] {
        Part::InlineData(blob) => assert_eq!(blob.mime_type, "image/png"),
        other => panic!("expected inline image, got {other:?}"),
    }
    assert!(matches!(&parts[1], Part::Text(_)));

    // No delimiter: questions are the whole output and the key is empty.
    assert_eq!(s.questions(), "1. प्रश्न");
    assert_eq!(s.answers(), "");
}

#[tokio::test]
async fn quota_error_keeps_partial_output() {
    let mut s = session(GenerationConfig::default());
    s.select_from_storage(&[REAL_NUMBERS]).unwrap();

    let mut gemini = ScriptedGemini::new(vec!["1. What is"]);
    gemini.fail_with = Some(|| QpaperError::QuotaExceeded {
        detail: "RESOURCE_EXHAUSTED".into(),
    });
    let err = s.generate(&gemini).await.unwrap_err();

    assert!(matches!(err, QpaperError::QuotaExceeded { .. }));
    assert!(s.result().raw().starts_with("1. What is"));
    assert!(s.result().raw().contains("--- ERROR ENCOUNTERED ---"));
    assert!(s.last_error().unwrap().contains("quota"));
    assert!(!s.is_generating());
}

#[tokio::test]
async fn missing_key_blocks_generation() {
    let mut s = Session::new(GenerationConfig::default(), None);
    s.select_from_storage(&[REAL_NUMBERS]).unwrap();
    assert!(s.credential_notice().is_some());

    let gemini = ScriptedGemini::new(vec!["never"]);
    let err = s.generate(&gemini).await.unwrap_err();
    assert!(matches!(err, QpaperError::MissingCredential));
    assert!(gemini.seen.lock().unwrap().is_none());
}

// ── Offline: export ──────────────────────────────────────────────────────────

#[tokio::test]
async fn generated_paper_exports_to_three_pages() {
    let config = GenerationConfig::builder()
        .institution_name("Elite Academy")
        .build()
        .unwrap();
    let mut s = session(config);
    s.select_from_storage(&[REAL_NUMBERS]).unwrap();
    s.generate(&ScriptedGemini::new(vec!["1. Q?\n---ANSWERS---\n1. A"]))
        .await
        .unwrap();

    // 1051 px across 525.28 pt of content is just under 0.5 pt/px, so each
    // page holds about 1544 rows and 4000 rows need three pages.
    let writer = KeepDocument::default();
    let out = tempfile::tempdir().unwrap();
    let report = s
        .export(
            &PaperBitmap {
                width: 1051,
                height: 4000,
            },
            &CropSurface,
            &writer,
            out.path(),
        )
        .await
        .unwrap();

    assert_eq!(report.pages, 3);
    assert!(report.slice_errors.is_empty());
    assert_eq!(
        report.path,
        out.path().join("Elite_Academy_QuestionPaper.pdf")
    );
    assert_eq!(s.export_phase(), ExportPhase::Saved);

    let (_, doc) = writer.0.lock().unwrap().clone().unwrap();
    let heights: Vec<u32> = doc.pages.iter().map(|p| p.image.height()).collect();
    assert_eq!(heights.iter().sum::<u32>(), 4000);
    for page in &doc.pages {
        assert_eq!(page.x, 35.0);
        assert_eq!(page.y, 35.0);
        assert!((page.width - 525.28).abs() < 1e-9);
    }
}

#[tokio::test]
async fn export_without_questions_is_refused() {
    let mut s = session(GenerationConfig::default());
    let err = s
        .export(
            &PaperBitmap {
                width: 10,
                height: 10,
            },
            &CropSurface,
            &KeepDocument::default(),
            Path::new("."),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, QpaperError::NothingToExport));
    assert_eq!(s.export_phase(), ExportPhase::Idle);
}

// ── Live ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn live_gemini_generates_answer_key() {
    e2e_skip_unless_enabled!();
    let Some(credential) = ApiCredential::from_env() else {
        println!("SKIP — API_KEY not set");
        return;
    };

    let config = GenerationConfig::builder()
        .num_questions(3)
        .build()
        .unwrap();
    let mut s = Session::new(config, Some(credential));
    s.select_from_storage(&[REAL_NUMBERS]).unwrap();
    let client = s.gemini_client().unwrap();

    let chunks = s.generate(&client).await.unwrap();
    println!("{chunks} chunks\n{}", s.result().raw());

    assert!(chunks > 0);
    assert!(s.result().has_delimiter(), "model omitted ---ANSWERS---");
    assert!(!s.questions().is_empty());
    assert!(!s.answers().is_empty());
}

#[tokio::test]
async fn live_export_writes_pdf() {
    e2e_skip_unless_enabled!();

    let dir = tempfile::tempdir().unwrap();
    let bitmap_path = dir.path().join("paper.png");
    PaperBitmap {
        width: 800,
        height: 2500,
    }
    .capture()
    .await
    .unwrap()
    .save(&bitmap_path)
    .unwrap();

    let mut s = session(GenerationConfig::default());
    s.select_from_storage(&[REAL_NUMBERS]).unwrap();
    s.generate(&ScriptedGemini::new(vec!["1. Q?"])).await.unwrap();

    let report = s
        .export(
            &ImageFileSource::new(&bitmap_path),
            &CropSurface,
            &PdfiumDocumentWriter,
            dir.path(),
        )
        .await
        .unwrap();

    let bytes = std::fs::read(&report.path).unwrap();
    assert!(bytes.starts_with(b"%PDF"));
    assert_eq!(
        report.path.file_name().unwrap(),
        "My_School_Coaching_QuestionPaper.pdf"
    );
    println!("{} page(s) → {}", report.pages, report.path.display());
}
