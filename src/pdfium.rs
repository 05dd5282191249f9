//! Binding to the pdfium shared library.
//!
//! Resolution order, first match wins:
//!
//! 1. `PDFIUM_LIB_PATH`: explicit path to `libpdfium.{so,dylib}` / `pdfium.dll`
//! 2. the platform library name in the current directory
//! 3. the system library search path

use crate::error::QpaperError;
use pdfium_render::prelude::Pdfium;
use std::path::Path;
use tracing::debug;

/// Environment variable pointing at an existing pdfium library.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Bind pdfium, returning a descriptive error instead of panicking.
pub fn bind_pdfium() -> Result<Pdfium, QpaperError> {
    if let Ok(path) = std::env::var(PDFIUM_LIB_PATH_ENV) {
        if !path.is_empty() {
            debug!("Binding pdfium from {PDFIUM_LIB_PATH_ENV}={path}");
            return Pdfium::bind_to_library(Path::new(&path))
                .map(Pdfium::new)
                .map_err(|e| QpaperError::PdfiumBindingFailed(format!("{path}: {e}")));
        }
    }

    Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| Pdfium::bind_to_system_library())
        .map(Pdfium::new)
        .map_err(|e| QpaperError::PdfiumBindingFailed(e.to_string()))
}
