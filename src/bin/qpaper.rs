//! CLI binary for edgequake-qpaper.
//!
//! A thin shim over the library crate: flags map to `GenerationConfig` and
//! `ExportConfig`, the session does the work, results go to stdout and files.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use edgequake_qpaper::export::ExportPhase;
use edgequake_qpaper::paper::{render_answers, render_html};
use edgequake_qpaper::storage::catalogue;
use edgequake_qpaper::{
    document_filename, ApiCredential, CropSurface, ExportConfig, GenerationConfig,
    ImageFileSource, Language, NoopProgressCallback, ObjectiveLayout, PaperProgressCallback,
    PdfiumDocumentWriter, ProgressCallback, QuestionType, Session,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner on stderr while the paper streams; optionally echoes the raw
/// stream to stdout as it arrives.
struct CliProgressCallback {
    bar: ProgressBar,
    echo: bool,
    chunks: AtomicUsize,
}

impl CliProgressCallback {
    fn new(echo: bool) -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  ⏱ {elapsed}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(TICKS),
        );
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self {
            bar,
            echo,
            chunks: AtomicUsize::new(0),
        })
    }
}

impl PaperProgressCallback for CliProgressCallback {
    fn on_generation_start(&self, model: &str) {
        self.bar.set_prefix("Generating");
        self.bar.set_message(format!("waiting for {model}…"));
    }

    fn on_chunk(&self, chunk: &str, total_len: usize) {
        let n = self.chunks.fetch_add(1, Ordering::SeqCst) + 1;
        self.bar
            .set_message(format!("{n} chunks, {}", dim(&format!("{total_len} bytes"))));
        if self.echo {
            self.bar.suspend(|| {
                let mut out = io::stdout().lock();
                let _ = out.write_all(chunk.as_bytes());
                let _ = out.flush();
            });
        }
    }

    fn on_generation_complete(&self, chunks: usize, has_answers: bool) {
        self.bar.finish_and_clear();
        if self.echo {
            println!();
        }
        let answers = if has_answers {
            green("answer key included")
        } else {
            cyan("no answer key")
        };
        eprintln!("{} {} chunks received, {}", green("✔"), bold(&chunks.to_string()), answers);
    }

    fn on_generation_error(&self, error: &str) {
        self.bar.finish_and_clear();
        if self.echo {
            println!();
        }
        eprintln!("{} {}", red("✘"), red(error));
    }

    fn on_export_phase(&self, phase: ExportPhase) {
        self.bar.set_prefix("Exporting");
        self.bar.set_message(phase.to_string());
    }

    fn on_slice_placed(&self, page: usize, total: usize) {
        self.bar.set_message(format!("page {page}/{total}"));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Ten objective questions from a chapter PDF
  qpaper generate chapter1.pdf

  # Mixed paper in Hindi from scanned pages, multi-line options
  qpaper generate --type mixed --layout multi-line --language Hindi p1.jpg p2.jpg

  # Math paper from the built-in sample storage
  qpaper generate --math --storage "storage/Class 10/Mathematics/Chapter 2 - Polynomials.pdf"

  # Paginate a screenshot of the rendered HTML preview into an A4 PDF,
  # using the paper saved by `generate` in the same directory
  qpaper export My_School_Coaching_QuestionPaper.png --institution "My School/Coaching"

  # List sample storage
  qpaper storage

ENVIRONMENT VARIABLES:
  API_KEY            Gemini API key (required for `generate`)
  QPAPER_MODEL       Override model ID (default gemini-2.5-pro)
  QPAPER_OUT_DIR     Output directory for generated files
  PDFIUM_LIB_PATH    Path to an existing libpdfium
  RUST_LOG           Override log filter
"#;

/// Generate question papers and answer keys from study material with Gemini.
#[derive(Parser, Debug)]
#[command(
    name = "qpaper",
    version,
    about = "Generate question papers and answer keys from PDFs or images with Gemini",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "QPAPER_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "QPAPER_QUIET")]
    quiet: bool,

    /// Disable the progress spinner.
    #[arg(long, global = true, env = "QPAPER_NO_PROGRESS")]
    no_progress: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a question paper and answer key.
    Generate(GenerateArgs),
    /// Paginate a captured bitmap of the rendered paper into an A4 PDF.
    Export(ExportArgs),
    /// List the built-in sample storage.
    Storage {
        /// Print the catalogue as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
struct PaperArgs {
    /// Institution name printed in the header and used for file names.
    #[arg(long, env = "QPAPER_INSTITUTION", default_value = "My School/Coaching")]
    institution: String,

    /// Number of questions.
    #[arg(short = 'n', long, env = "QPAPER_QUESTIONS", default_value_t = 10,
          value_parser = clap::value_parser!(u32).range(1..))]
    questions: u32,

    /// Output language (English, Hindi, Spanish, French, German, Japanese,
    /// Bengali, Telugu, Marathi, Tamil, Urdu).
    #[arg(long, env = "QPAPER_LANGUAGE", default_value = "English")]
    language: String,

    /// Question type.
    #[arg(long = "type", env = "QPAPER_TYPE", value_enum, default_value = "objective")]
    question_type: TypeArg,

    /// Option layout for objective questions.
    #[arg(long, env = "QPAPER_LAYOUT", value_enum, default_value = "single-line")]
    layout: LayoutArg,

    /// Extra instructions for the model.
    #[arg(long, env = "QPAPER_PROMPT")]
    prompt: Option<String>,

    /// Font size of the rendered paper in points (8–24).
    #[arg(long, env = "QPAPER_FONT_SIZE", default_value_t = 8,
          value_parser = clap::value_parser!(u8).range(8..=24))]
    font_size: u8,

    /// Omit the institution / "Question Paper" header.
    #[arg(long, env = "QPAPER_NO_HEADER")]
    no_header: bool,

    /// Mathematics paper: LaTeX notation and MathJax in the preview.
    #[arg(long, env = "QPAPER_MATH")]
    math: bool,
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// PDF files, or image files (JPEG, PNG, GIF, WebP). Not both.
    files: Vec<PathBuf>,

    /// Use sample storage entries instead of files (repeatable).
    #[arg(long, conflicts_with = "files")]
    storage: Vec<String>,

    #[command(flatten)]
    paper: PaperArgs,

    /// Gemini model ID.
    #[arg(long, env = "QPAPER_MODEL", default_value = edgequake_qpaper::config::DEFAULT_MODEL)]
    model: String,

    /// Gemini API key.
    #[arg(long, env = "API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Directory for the HTML preview and the answer key.
    #[arg(short, long, env = "QPAPER_OUT_DIR", default_value = ".")]
    out_dir: PathBuf,

    /// Print a JSON summary instead of streaming the paper to stdout.
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct ExportArgs {
    /// Captured bitmap (PNG or JPEG) of the rendered paper, top to bottom.
    bitmap: PathBuf,

    /// Institution name; determines the PDF file name.
    #[arg(long, env = "QPAPER_INSTITUTION", default_value = "My School/Coaching")]
    institution: String,

    /// Raw paper saved by `generate`. Default: `<out-dir>/<Institution>_QuestionPaper.txt`.
    #[arg(long)]
    paper: Option<PathBuf>,

    /// The paper is a mathematics paper.
    #[arg(long, env = "QPAPER_MATH")]
    math: bool,

    /// Page margin in points.
    #[arg(long, default_value_t = edgequake_qpaper::config::PAGE_MARGIN_PT)]
    margin: f64,

    /// Output directory.
    #[arg(short, long, env = "QPAPER_OUT_DIR", default_value = ".")]
    out_dir: PathBuf,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum TypeArg {
    Objective,
    Subjective,
    Mixed,
}

impl From<TypeArg> for QuestionType {
    fn from(v: TypeArg) -> Self {
        match v {
            TypeArg::Objective => QuestionType::Objective,
            TypeArg::Subjective => QuestionType::Subjective,
            TypeArg::Mixed => QuestionType::Mixed,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum LayoutArg {
    SingleLine,
    MultiLine,
}

impl From<LayoutArg> for ObjectiveLayout {
    fn from(v: LayoutArg) -> Self {
        match v {
            LayoutArg::SingleLine => ObjectiveLayout::SingleLine,
            LayoutArg::MultiLine => ObjectiveLayout::MultiLine,
        }
    }
}

/// `generate --json` output.
#[derive(Serialize)]
struct GenerateSummary<'a> {
    source: &'a str,
    model: &'a str,
    chunks: usize,
    questions: &'a str,
    answers: &'a str,
    html_path: &'a Path,
    answers_path: &'a Path,
    raw_path: &'a Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Library INFO logs would interleave with the spinner, so they are
    // suppressed while it is shown.
    let json = matches!(
        &cli.command,
        Command::Generate(GenerateArgs { json: true, .. }) | Command::Storage { json: true }
    );
    let show_progress = !cli.quiet && !cli.no_progress && !json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Generate(ref args) => run_generate(args, &cli, show_progress).await,
        Command::Export(ref args) => run_export(args, &cli, show_progress).await,
        Command::Storage { json } => run_storage(json),
    }
}

async fn run_generate(args: &GenerateArgs, cli: &Cli, show_progress: bool) -> Result<()> {
    let config = build_config(&args.paper)?;
    let credential = args.api_key.clone().and_then(ApiCredential::new);

    let progress: ProgressCallback = if show_progress {
        CliProgressCallback::new(!args.json)
    } else {
        Arc::new(NoopProgressCallback)
    };
    let mut session = Session::new(config, credential)
        .with_model(&args.model)
        .with_progress(progress);

    if let Some(notice) = session.credential_notice() {
        anyhow::bail!(notice);
    }

    if args.storage.is_empty() {
        if args.files.is_empty() {
            anyhow::bail!("No input. Pass PDF/image files or --storage <PATH>.");
        }
        session
            .select_files(&args.files)
            .await
            .context("Failed to load source files")?;
    } else {
        session
            .select_from_storage(&args.storage)
            .context("Failed to load from storage")?;
    }
    if let Some(source) = session.source() {
        if !cli.quiet && !args.json {
            eprintln!("{} {}", cyan("◆"), source.description);
        }
    }

    let client = session
        .gemini_client()
        .context("Gemini API key is not configured")?;
    let outcome = session.generate(&client).await;

    // Without the spinner nothing has echoed the stream yet.
    if !show_progress && !args.json {
        println!("{}", session.result().raw());
    }
    let chunks = outcome.context("Generation failed")?;

    // ── Write outputs ────────────────────────────────────────────────────
    tokio::fs::create_dir_all(&args.out_dir)
        .await
        .with_context(|| format!("Failed to create {}", args.out_dir.display()))?;
    let pdf_name = document_filename(&session.config().institution_name);
    let html_path = args.out_dir.join(pdf_name.replace(".pdf", ".html"));
    let answers_path = args
        .out_dir
        .join(pdf_name.replace("_QuestionPaper.pdf", "_Answers.md"));
    let raw_path = args.out_dir.join(pdf_name.replace(".pdf", ".txt"));

    let html = render_html(session.questions(), session.config());
    tokio::fs::write(&html_path, html)
        .await
        .with_context(|| format!("Failed to write {}", html_path.display()))?;
    tokio::fs::write(&answers_path, render_answers(session.answers()))
        .await
        .with_context(|| format!("Failed to write {}", answers_path.display()))?;
    tokio::fs::write(&raw_path, session.result().raw())
        .await
        .with_context(|| format!("Failed to write {}", raw_path.display()))?;

    if args.json {
        let summary = GenerateSummary {
            source: session.source().map(|s| s.description.as_str()).unwrap_or(""),
            model: session.model(),
            chunks,
            questions: session.questions(),
            answers: session.answers(),
            html_path: &html_path,
            answers_path: &answers_path,
            raw_path: &raw_path,
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("Failed to serialise summary")?
        );
    } else if !cli.quiet {
        eprintln!("   preview  →  {}", bold(&html_path.display().to_string()));
        eprintln!("   answers  →  {}", bold(&answers_path.display().to_string()));
        eprintln!("   raw      →  {}", dim(&raw_path.display().to_string()));
    }
    Ok(())
}

async fn run_export(args: &ExportArgs, cli: &Cli, show_progress: bool) -> Result<()> {
    let config = GenerationConfig::builder()
        .institution_name(&args.institution)
        .is_math_paper(args.math)
        .build()
        .context("Invalid configuration")?;
    let paper_path = args.paper.clone().unwrap_or_else(|| {
        args.out_dir
            .join(document_filename(&args.institution).replace(".pdf", ".txt"))
    });
    let raw = tokio::fs::read_to_string(&paper_path)
        .await
        .with_context(|| format!("Failed to read saved paper {}", paper_path.display()))?;

    let spinner = show_progress.then(|| CliProgressCallback::new(false));
    let progress: ProgressCallback = match spinner {
        Some(ref cb) => cb.clone() as ProgressCallback,
        None => Arc::new(NoopProgressCallback),
    };
    let mut session = Session::new(config, None)
        .with_export_config(ExportConfig {
            margin: args.margin,
            ..ExportConfig::default()
        })
        .with_progress(progress);
    session
        .load_output(&raw)
        .context("Failed to load saved paper")?;

    tokio::fs::create_dir_all(&args.out_dir)
        .await
        .with_context(|| format!("Failed to create {}", args.out_dir.display()))?;
    let outcome = session
        .export(
            &ImageFileSource::new(&args.bitmap),
            &CropSurface,
            &PdfiumDocumentWriter,
            &args.out_dir,
        )
        .await;

    if let Some(cb) = spinner {
        cb.bar.finish_and_clear();
    }
    let report = outcome.context("Export failed")?;
    if !cli.quiet {
        if let Some(notice) = session.last_error() {
            eprintln!("{} {}", cyan("⚠"), notice);
        }
        for e in &report.slice_errors {
            eprintln!("{} {}", cyan("⚠"), e);
        }
        eprintln!(
            "{}  {} page(s)  →  {}",
            green("✔"),
            report.pages,
            bold(&report.path.display().to_string()),
        );
    }
    Ok(())
}

fn run_storage(json: bool) -> Result<()> {
    let catalogue = catalogue();
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(catalogue).context("Failed to serialise catalogue")?
        );
        return Ok(());
    }
    for class in &catalogue.classes {
        println!("{}", bold(class.name));
        for subject in &class.subjects {
            println!("  {}", subject.name);
            for chapter in &subject.chapters {
                println!("    {}", dim(chapter.path));
            }
        }
    }
    for folder in &catalogue.image_folders {
        println!("{}", bold(folder.name));
        for image in &folder.images {
            println!("    {}  {}", dim(image.path), image.mime.as_str());
        }
    }
    Ok(())
}

/// Map CLI args to `GenerationConfig`.
fn build_config(args: &PaperArgs) -> Result<GenerationConfig> {
    let language: Language = args.language.parse().context("Invalid --language")?;
    let mut builder = GenerationConfig::builder()
        .institution_name(&args.institution)
        .num_questions(args.questions)
        .language(language)
        .question_type(args.question_type.clone().into())
        .objective_layout(args.layout.clone().into())
        .pdf_font_size(args.font_size)
        .show_paper_header(!args.no_header)
        .is_math_paper(args.math);
    if let Some(ref prompt) = args.prompt {
        builder = builder.custom_prompt(prompt);
    }
    builder.build().context("Invalid configuration")
}
