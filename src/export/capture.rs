//! Acquiring the rendered paper as one tall bitmap.
//!
//! Capturing the HTML preview (and typesetting its math) belongs to whatever
//! renders it: a headless browser, a screenshot tool, a GUI. This crate only
//! consumes the result through [`BitmapSource`].

use crate::error::QpaperError;
use futures::future::BoxFuture;
use image::DynamicImage;
use std::path::PathBuf;
use tracing::debug;

/// Supplies the captured bitmap of the rendered paper.
pub trait BitmapSource: Send + Sync {
    /// Typeset math markup in the live rendering before capture.
    ///
    /// Called only for math papers. Sources without a live rendering have
    /// nothing to do.
    fn typeset_math(&self) -> BoxFuture<'_, Result<(), QpaperError>> {
        Box::pin(async { Ok(()) })
    }

    /// Capture the full paper, top to bottom, as a single bitmap.
    fn capture(&self) -> BoxFuture<'_, Result<DynamicImage, QpaperError>>;
}

/// Loads an already captured image (PNG or JPEG) from disk.
#[derive(Debug, Clone)]
pub struct ImageFileSource {
    path: PathBuf,
}

impl ImageFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl BitmapSource for ImageFileSource {
    fn capture(&self) -> BoxFuture<'_, Result<DynamicImage, QpaperError>> {
        Box::pin(async move {
            let bytes = tokio::fs::read(&self.path).await.map_err(|e| {
                QpaperError::CaptureFailed(format!("{}: {e}", self.path.display()))
            })?;
            let image = image::load_from_memory(&bytes).map_err(|e| {
                QpaperError::CaptureFailed(format!("{}: {e}", self.path.display()))
            })?;
            debug!(
                "Loaded capture {} ({}x{} px)",
                self.path.display(),
                image.width(),
                image.height()
            );
            Ok(image)
        })
    }
}
