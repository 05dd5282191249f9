//! PDF text extraction via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps the pdfium C++ library, which is not safe to call
//! from async contexts. The session moves extraction onto tokio's blocking
//! pool, keeping the runtime free while a large textbook is read.
//!
//! ## All or nothing
//!
//! A batch either yields the text of every page of every file, or fails as a
//! whole. A half-extracted batch would silently generate questions from a
//! fraction of the chapter, so partial text is discarded.
//!
//! ## Page text
//!
//! Each page becomes one line: the text items of the page separated by
//! single spaces. Line breaks, tabs and layout spacing in pdfium's text
//! layer are collapsed, which keeps the prompt compact.

use crate::error::QpaperError;
use crate::pdfium::bind_pdfium;
use crate::pipeline::source::LoadedFile;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info};

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Turns a batch of PDF files into one plain-text source.
///
/// Implementations are called from a blocking thread.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, files: &[LoadedFile]) -> Result<String, QpaperError>;
}

/// Extracts the text layer of each page with pdfium.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfiumTextExtractor;

impl TextExtractor for PdfiumTextExtractor {
    fn extract(&self, files: &[LoadedFile]) -> Result<String, QpaperError> {
        let pdfium = bind_pdfium()?;
        let mut full_text = String::new();

        for file in files {
            let document = pdfium
                .load_pdf_from_byte_slice(&file.bytes, None)
                .map_err(|e| QpaperError::PdfExtractionFailed {
                    path: file.path.clone(),
                    detail: e.to_string(),
                })?;

            let pages = document.pages();
            info!("{}: {} pages", file.name, pages.len());

            for (index, page) in pages.iter().enumerate() {
                let text = page.text().map_err(|e| QpaperError::PdfExtractionFailed {
                    path: file.path.clone(),
                    detail: format!("page {}: {e}", index + 1),
                })?;
                append_page(&mut full_text, &normalise_page_text(&text.all()));
            }
        }

        debug!("Extracted {} characters", full_text.chars().count());
        Ok(full_text)
    }
}

/// Collapse every whitespace run to one space and trim the ends.
fn normalise_page_text(raw: &str) -> String {
    WHITESPACE_RUN.replace_all(raw.trim(), " ").into_owned()
}

/// One page's text followed by a newline, the way pages are joined.
fn append_page(buf: &mut String, page_text: &str) {
    buf.push_str(page_text);
    buf.push('\n');
}
