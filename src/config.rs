//! Configuration types for question-paper generation and export.
//!
//! Generation behaviour is controlled through [`GenerationConfig`], built via
//! its [`GenerationConfigBuilder`]. The config is immutable for the duration
//! of one generation call; the session passes it by reference into the
//! request builder.
//!
//! Export geometry lives in [`ExportConfig`]. The credential is its own type,
//! [`ApiCredential`], so it never shows up in `Debug` output or logs.

use crate::error::QpaperError;
use crate::export::PageGeometry;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Default number of questions requested from the model.
pub const DEFAULT_NUM_QUESTIONS: u32 = 10;

/// Default font size (points) of the rendered paper.
pub const DEFAULT_PDF_FONT_SIZE: u8 = 8;

/// Smallest accepted font size for the rendered paper.
pub const MIN_PDF_FONT_SIZE: u8 = 8;

/// Largest accepted font size for the rendered paper.
pub const MAX_PDF_FONT_SIZE: u8 = 24;

/// Default Gemini model identifier.
pub const DEFAULT_MODEL: &str = "gemini-2.5-pro";

/// Environment variable holding the Gemini API key.
pub const API_KEY_ENV: &str = "API_KEY";

const DEFAULT_INSTITUTION: &str = "My School/Coaching";
const DEFAULT_CUSTOM_PROMPT: &str = "Ensure questions cover a range of topics from the provided text. For objective questions, avoid ambiguity in options.";

/// Configuration for one question-paper generation.
///
/// Built via [`GenerationConfig::builder()`] or using
/// [`GenerationConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_qpaper::{GenerationConfig, QuestionType, ObjectiveLayout};
///
/// let config = GenerationConfig::builder()
///     .institution_name("Springfield High")
///     .num_questions(5)
///     .question_type(QuestionType::Mixed)
///     .objective_layout(ObjectiveLayout::MultiLine)
///     .build()
///     .unwrap();
/// assert_eq!(config.num_questions, 5);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Printed in the paper header and used to name the exported PDF.
    pub institution_name: String,

    /// Number of questions to request. Always ≥ 1 after `build()`.
    pub num_questions: u32,

    /// Language the whole output (questions, delimiter, answers) is written in.
    pub language: Language,

    /// Objective, subjective or mixed questions.
    pub question_type: QuestionType,

    /// Option layout for objective questions. Ignored for
    /// [`QuestionType::Subjective`].
    pub objective_layout: ObjectiveLayout,

    /// Free-text instructions appended to the requirements block.
    pub custom_prompt: String,

    /// Font size in points of the rendered paper, 8–24.
    pub pdf_font_size: u8,

    /// Render the institution / "Question Paper" header above the questions.
    pub show_paper_header: bool,

    /// Ask for LaTeX math and load MathJax in the preview.
    pub is_math_paper: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            institution_name: DEFAULT_INSTITUTION.to_string(),
            num_questions: DEFAULT_NUM_QUESTIONS,
            language: Language::default(),
            question_type: QuestionType::default(),
            objective_layout: ObjectiveLayout::default(),
            custom_prompt: DEFAULT_CUSTOM_PROMPT.to_string(),
            pdf_font_size: DEFAULT_PDF_FONT_SIZE,
            show_paper_header: true,
            is_math_paper: false,
        }
    }
}

impl GenerationConfig {
    /// Create a new builder for `GenerationConfig`.
    pub fn builder() -> GenerationConfigBuilder {
        GenerationConfigBuilder {
            config: Self::default(),
        }
    }

    /// True when the paper contains objective (multiple-choice) questions.
    pub fn has_objective_questions(&self) -> bool {
        matches!(
            self.question_type,
            QuestionType::Objective | QuestionType::Mixed
        )
    }
}

/// Builder for [`GenerationConfig`].
#[derive(Debug)]
pub struct GenerationConfigBuilder {
    config: GenerationConfig,
}

impl GenerationConfigBuilder {
    pub fn institution_name(mut self, name: impl Into<String>) -> Self {
        self.config.institution_name = name.into();
        self
    }

    pub fn num_questions(mut self, n: u32) -> Self {
        self.config.num_questions = n;
        self
    }

    pub fn language(mut self, language: Language) -> Self {
        self.config.language = language;
        self
    }

    pub fn question_type(mut self, question_type: QuestionType) -> Self {
        self.config.question_type = question_type;
        self
    }

    pub fn objective_layout(mut self, layout: ObjectiveLayout) -> Self {
        self.config.objective_layout = layout;
        self
    }

    pub fn custom_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.custom_prompt = prompt.into();
        self
    }

    pub fn pdf_font_size(mut self, size: u8) -> Self {
        self.config.pdf_font_size = size;
        self
    }

    pub fn show_paper_header(mut self, v: bool) -> Self {
        self.config.show_paper_header = v;
        self
    }

    pub fn is_math_paper(mut self, v: bool) -> Self {
        self.config.is_math_paper = v;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<GenerationConfig, QpaperError> {
        let c = &self.config;
        if c.num_questions == 0 {
            return Err(QpaperError::InvalidConfig(
                "Number of questions must be ≥ 1".into(),
            ));
        }
        if !(MIN_PDF_FONT_SIZE..=MAX_PDF_FONT_SIZE).contains(&c.pdf_font_size) {
            return Err(QpaperError::InvalidConfig(format!(
                "PDF font size must be {MIN_PDF_FONT_SIZE}–{MAX_PDF_FONT_SIZE}, got {}",
                c.pdf_font_size
            )));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Kind of questions on the paper.
///
/// `Display` yields the wording used inside the prompt and the paper header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum QuestionType {
    /// Multiple-choice only. (default)
    #[default]
    Objective,
    /// Free-answer only.
    Subjective,
    /// Both kinds on one paper.
    Mixed,
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            QuestionType::Objective => "Objective",
            QuestionType::Subjective => "Subjective",
            QuestionType::Mixed => "Mixed (Objective & Subjective)",
        })
    }
}

/// Whether an objective question's options share its line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ObjectiveLayout {
    /// Number, question and all options on one physical line. (default)
    #[default]
    SingleLine,
    /// Question line first, then one option per line.
    MultiLine,
}

impl fmt::Display for ObjectiveLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ObjectiveLayout::SingleLine => "Single Line (Question & Options)",
            ObjectiveLayout::MultiLine => "Multi-line (Options below Question)",
        })
    }
}

/// The fixed set of output languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Language {
    #[default]
    English,
    Hindi,
    Spanish,
    French,
    German,
    Japanese,
    Bengali,
    Telugu,
    Marathi,
    Tamil,
    Urdu,
}

impl Language {
    /// Every supported language, in menu order.
    pub const ALL: [Language; 11] = [
        Language::English,
        Language::Hindi,
        Language::Spanish,
        Language::French,
        Language::German,
        Language::Japanese,
        Language::Bengali,
        Language::Telugu,
        Language::Marathi,
        Language::Tamil,
        Language::Urdu,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Hindi => "Hindi",
            Language::Spanish => "Spanish",
            Language::French => "French",
            Language::German => "German",
            Language::Japanese => "Japanese",
            Language::Bengali => "Bengali",
            Language::Telugu => "Telugu",
            Language::Marathi => "Marathi",
            Language::Tamil => "Tamil",
            Language::Urdu => "Urdu",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = QpaperError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Language::ALL
            .iter()
            .copied()
            .find(|l| l.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                let supported: Vec<&str> = Language::ALL.iter().map(|l| l.as_str()).collect();
                QpaperError::InvalidConfig(format!(
                    "Unsupported language '{wanted}'. Supported: {}",
                    supported.join(", ")
                ))
            })
    }
}

// ── Export ───────────────────────────────────────────────────────────────

/// A4 portrait width in points.
pub const A4_WIDTH_PT: f64 = 595.28;

/// A4 portrait height in points.
pub const A4_HEIGHT_PT: f64 = 841.89;

/// Margin on every side of an exported page, in points.
pub const PAGE_MARGIN_PT: f64 = 35.0;

/// Pause after math typesetting so layout settles before capture.
pub const MATH_SETTLE_MS: u64 = 700;

/// Settings for the paginated PDF export.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportConfig {
    /// Page width in points. Default: A4.
    pub page_width: f64,
    /// Page height in points. Default: A4.
    pub page_height: f64,
    /// Margin applied on all four sides. Default: 35 pt.
    pub margin: f64,
    /// Delay between math typesetting and capture. Default: 700 ms.
    pub math_settle: Duration,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            page_width: A4_WIDTH_PT,
            page_height: A4_HEIGHT_PT,
            margin: PAGE_MARGIN_PT,
            math_settle: Duration::from_millis(MATH_SETTLE_MS),
        }
    }
}

impl ExportConfig {
    /// Page geometry handed to the slicer.
    pub fn geometry(&self) -> PageGeometry {
        PageGeometry::new(self.page_width, self.page_height, self.margin)
    }
}

// ── Credential ───────────────────────────────────────────────────────────

/// The Gemini API key. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiCredential(String);

impl ApiCredential {
    /// Wrap a key. Blank strings are treated as "not configured".
    pub fn new(key: impl Into<String>) -> Option<Self> {
        let key = key.into();
        if key.trim().is_empty() {
            None
        } else {
            Some(Self(key))
        }
    }

    /// Read the key from [`API_KEY_ENV`].
    pub fn from_env() -> Option<Self> {
        std::env::var(API_KEY_ENV).ok().and_then(Self::new)
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiCredential(<redacted>)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_form_defaults() {
        let c = GenerationConfig::default();
        assert_eq!(c.num_questions, 10);
        assert_eq!(c.language, Language::English);
        assert_eq!(c.question_type, QuestionType::Objective);
        assert_eq!(c.objective_layout, ObjectiveLayout::SingleLine);
        assert_eq!(c.pdf_font_size, 8);
        assert!(c.show_paper_header);
        assert!(!c.is_math_paper);
    }

    #[test]
    fn build_rejects_zero_questions() {
        let err = GenerationConfig::builder().num_questions(0).build();
        assert!(matches!(err, Err(QpaperError::InvalidConfig(_))));
    }

    #[test]
    fn build_rejects_font_size_out_of_range() {
        assert!(GenerationConfig::builder().pdf_font_size(7).build().is_err());
        assert!(GenerationConfig::builder().pdf_font_size(25).build().is_err());
        assert!(GenerationConfig::builder().pdf_font_size(24).build().is_ok());
    }

    #[test]
    fn language_parses_case_insensitively() {
        assert_eq!("hindi".parse::<Language>().unwrap(), Language::Hindi);
        assert_eq!(" Tamil ".parse::<Language>().unwrap(), Language::Tamil);
        assert!("Klingon".parse::<Language>().is_err());
    }

    #[test]
    fn question_type_wording() {
        assert_eq!(
            QuestionType::Mixed.to_string(),
            "Mixed (Objective & Subjective)"
        );
        assert!(GenerationConfig::builder()
            .question_type(QuestionType::Mixed)
            .build()
            .unwrap()
            .has_objective_questions());
        assert!(!GenerationConfig::builder()
            .question_type(QuestionType::Subjective)
            .build()
            .unwrap()
            .has_objective_questions());
    }

    #[test]
    fn blank_credential_is_none() {
        assert!(ApiCredential::new("   ").is_none());
        let key = ApiCredential::new("secret-key").unwrap();
        assert_eq!(key.expose(), "secret-key");
        assert!(!format!("{key:?}").contains("secret"));
    }

    #[test]
    fn export_defaults_are_a4_with_35pt_margin() {
        let e = ExportConfig::default();
        let g = e.geometry();
        assert!((g.content_width() - (595.28 - 70.0)).abs() < 1e-9);
        assert!((g.content_height() - (841.89 - 70.0)).abs() < 1e-9);
        assert_eq!(e.math_settle, Duration::from_millis(700));
    }
}
