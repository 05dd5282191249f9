//! Packaging placed slices into a PDF file.
//!
//! PDF user space has its origin at the bottom-left corner while placements
//! are measured from the top of the page, so every image is flipped:
//! `bottom = page_height - top - height`.
//!
//! The file is written to a temporary sibling and renamed into place, so a
//! failed save never leaves a truncated PDF at the target path.

use crate::error::QpaperError;
use crate::export::plan::PageGeometry;
use crate::export::{ExportedDocument, PlacedImage};
use crate::pdfium::bind_pdfium;
use pdfium_render::prelude::*;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Writes an [`ExportedDocument`] to disk.
pub trait DocumentWriter: Send + Sync {
    fn write(&self, document: &ExportedDocument, path: &Path) -> Result<(), QpaperError>;
}

/// Builds the PDF with pdfium, one page per placed image.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfiumDocumentWriter;

impl DocumentWriter for PdfiumDocumentWriter {
    fn write(&self, document: &ExportedDocument, path: &Path) -> Result<(), QpaperError> {
        let pdfium = bind_pdfium()?;
        let mut pdf = pdfium.create_new_pdf().map_err(packaging)?;
        let geometry = document.geometry;

        for placed in &document.pages {
            let size = PdfPagePaperSize::from_points(
                PdfPoints::new(geometry.page_width as f32),
                PdfPoints::new(geometry.page_height as f32),
            );
            let mut page = pdf.pages_mut().create_page_at_end(size).map_err(packaging)?;
            page.objects_mut()
                .create_image_object(
                    PdfPoints::new(placed.x as f32),
                    PdfPoints::new(pdf_bottom(&geometry, placed) as f32),
                    &placed.image,
                    Some(PdfPoints::new(placed.width as f32)),
                    Some(PdfPoints::new(placed.height as f32)),
                )
                .map_err(packaging)?;
            debug!(
                "Page {}: image {}x{} pt at ({:.2}, {:.2})",
                placed.page_index + 1,
                placed.width,
                placed.height,
                placed.x,
                placed.y
            );
        }

        let bytes = pdf.save_to_bytes().map_err(packaging)?;
        save_atomically(path, &bytes)?;
        info!(
            "Saved {} ({} pages, {} bytes)",
            path.display(),
            document.pages.len(),
            bytes.len()
        );
        Ok(())
    }
}

fn packaging(e: PdfiumError) -> QpaperError {
    QpaperError::PackagingFailed(format!("{e:?}"))
}

/// Write `bytes` to `path` through a temporary file in the same directory.
pub(crate) fn save_atomically(path: &Path, bytes: &[u8]) -> Result<(), QpaperError> {
    let write_failed = |source: std::io::Error| QpaperError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir).map_err(write_failed)?;
    tmp.write_all(bytes).map_err(write_failed)?;
    tmp.as_file().sync_all().map_err(write_failed)?;
    tmp.persist(path).map_err(|e| write_failed(e.error))?;
    Ok(())
}

/// Bottom edge of `placed` in PDF coordinates.
pub fn pdf_bottom(geometry: &PageGeometry, placed: &PlacedImage) -> f64 {
    geometry.page_height - placed.y - placed.height
}
