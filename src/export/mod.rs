//! Paginated export: one tall captured bitmap → a multi-page A4 PDF.
//!
//! ## Data Flow
//!
//! ```text
//! capture ──▶ plan ──▶ raster ──▶ pdf
//! (bitmap)   (slices)  (crop)    (pdfium)
//! ```
//!
//! 1. [`capture`]: obtain the rendered paper as a bitmap
//! 2. [`plan`]: split its height into page-sized row ranges
//! 3. [`raster`]: crop each range at full width
//! 4. [`pdf`]: place each crop at the margin on its own page and save
//!
//! Capture and packaging failures abort the export. A slice that cannot be
//! rasterised does not: see [`export_bitmap`].

pub mod capture;
pub mod pdf;
pub mod plan;
pub mod raster;

pub use capture::{BitmapSource, ImageFileSource};
pub use pdf::{DocumentWriter, PdfiumDocumentWriter};
pub use plan::{plan_slices, width_ratio, PageGeometry, PageSlice};
pub use raster::{CropSurface, SliceSurface};

use crate::error::{QpaperError, SliceError};
use crate::progress::PaperProgressCallback;
use image::DynamicImage;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fmt;
use tracing::{debug, info, warn};

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Where an export currently is.
///
/// `Idle → Capturing → Slicing → Packaging → Saved`, or `Failed` from
/// capturing or packaging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExportPhase {
    Idle,
    Capturing,
    Slicing,
    Packaging,
    Saved,
    Failed,
}

impl fmt::Display for ExportPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExportPhase::Idle => "idle",
            ExportPhase::Capturing => "capturing",
            ExportPhase::Slicing => "slicing",
            ExportPhase::Packaging => "packaging",
            ExportPhase::Saved => "saved",
            ExportPhase::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// An image placed on one page. Coordinates are points from the page's
/// top-left corner.
#[derive(Debug, Clone)]
pub struct PlacedImage {
    pub page_index: usize,
    pub image: DynamicImage,
    pub x: f64,
    /// Top edge. Negative when the image starts above the page.
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Pages ready for packaging plus any slice that had to fall back.
#[derive(Debug, Clone)]
pub struct ExportedDocument {
    pub geometry: PageGeometry,
    /// One entry per page, in page order.
    pub pages: Vec<PlacedImage>,
    pub slice_errors: Vec<SliceError>,
}

impl ExportedDocument {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// True when a slice failed and the whole-bitmap fallback was used.
    pub fn is_degraded(&self) -> bool {
        !self.slice_errors.is_empty()
    }
}

/// Slice `bitmap` into pages laid out per `geometry`.
///
/// Every slice is placed at `(margin, margin)` scaled to the content width.
/// If `surface` fails for slice `i`, page `i` instead receives the entire
/// bitmap at content width, shifted up by the height already placed on
/// earlier pages, and no further pages are produced. The failure is kept in
/// [`ExportedDocument::slice_errors`].
pub fn export_bitmap(
    bitmap: &DynamicImage,
    geometry: &PageGeometry,
    surface: &dyn SliceSurface,
    progress: &dyn PaperProgressCallback,
) -> Result<ExportedDocument, QpaperError> {
    let slices = plan_slices(bitmap.width(), bitmap.height(), geometry)?;
    let ratio = width_ratio(bitmap.width(), geometry);
    let total = slices.len();
    info!(
        "Slicing {}x{} px bitmap into {} page(s), ratio {:.5} pt/px",
        bitmap.width(),
        bitmap.height(),
        total,
        ratio
    );

    let mut pages = Vec::with_capacity(total);
    let mut slice_errors = Vec::new();

    for slice in &slices {
        match surface.rasterize(bitmap, slice) {
            Ok(image) => {
                debug!(
                    "Slice {}: rows {:.1}..{:.1} → {:.2} pt tall",
                    slice.index,
                    slice.source_y,
                    slice.source_end(),
                    slice.placed_height
                );
                pages.push(PlacedImage {
                    page_index: slice.index,
                    image,
                    x: geometry.margin,
                    y: geometry.margin,
                    width: slice.placed_width,
                    height: slice.placed_height,
                });
                progress.on_slice_placed(slice.index + 1, total);
            }
            Err(e) => {
                // NOTE: the whole untiled bitmap lands on this page, shifted up
                // by the rows already placed. Earlier pages are kept and no
                // further slices are attempted.
                warn!("{e}; placing the whole bitmap on page {}", slice.index + 1);
                pages.push(PlacedImage {
                    page_index: slice.index,
                    image: bitmap.clone(),
                    x: geometry.margin,
                    y: geometry.margin - slice.source_y * ratio,
                    width: geometry.content_width(),
                    height: f64::from(bitmap.height()) * ratio,
                });
                slice_errors.push(e);
                break;
            }
        }
    }

    Ok(ExportedDocument {
        geometry: *geometry,
        pages,
        slice_errors,
    })
}

/// Download name for a paper: whitespace runs in the institution name become
/// one underscore. Path separators are replaced too so the name stays a
/// single file inside the output directory.
pub fn document_filename(institution: &str) -> String {
    let name = WHITESPACE_RUN.replace_all(institution, "_");
    format!("{}_QuestionPaper.pdf", name.replace(['/', '\\'], "_"))
}
