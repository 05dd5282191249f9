//! Source material: load user-selected files and decide what they are.
//!
//! A selection must be homogeneous. All PDFs become a text source (after
//! extraction), all images become an attachment source, and anything else is
//! rejected whole before any state changes. File types are sniffed from the
//! first bytes, falling back to the extension, so a mis-named `.png` that is
//! really a JPEG is still tagged `image/jpeg`.

use crate::error::QpaperError;
use image::ImageFormat;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// MIME type of the document path (text extraction).
pub const PDF_MIME: &str = "application/pdf";

/// Longest slice of the joined file names kept in a selection description.
const DESCRIPTION_NAMES_LIMIT: usize = 100;

/// The four raster formats accepted as attachments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageMime {
    Jpeg,
    Png,
    Gif,
    Webp,
}

impl ImageMime {
    pub const ALL: [ImageMime; 4] = [
        ImageMime::Jpeg,
        ImageMime::Png,
        ImageMime::Gif,
        ImageMime::Webp,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ImageMime::Jpeg => "image/jpeg",
            ImageMime::Png => "image/png",
            ImageMime::Gif => "image/gif",
            ImageMime::Webp => "image/webp",
        }
    }

    /// Parse an allow-listed MIME string.
    pub fn from_mime(mime: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|m| m.as_str().eq_ignore_ascii_case(mime.trim()))
    }

    fn from_format(format: ImageFormat) -> Option<Self> {
        match format {
            ImageFormat::Jpeg => Some(ImageMime::Jpeg),
            ImageFormat::Png => Some(ImageMime::Png),
            ImageFormat::Gif => Some(ImageMime::Gif),
            ImageFormat::WebP => Some(ImageMime::Webp),
            _ => None,
        }
    }

    fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(ImageMime::Jpeg),
            "png" => Some(ImageMime::Png),
            "gif" => Some(ImageMime::Gif),
            "webp" => Some(ImageMime::Webp),
            _ => None,
        }
    }
}

impl fmt::Display for ImageMime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One image to send inline with the request.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageAttachment {
    pub name: String,
    pub mime: ImageMime,
    pub data: Vec<u8>,
}

impl fmt::Debug for ImageAttachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageAttachment")
            .field("name", &self.name)
            .field("mime", &self.mime)
            .field("bytes", &self.data.len())
            .finish()
    }
}

/// The content the paper is generated from. Exactly one kind is active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceMaterial {
    /// Extracted plain text (PDF text layer or catalogue text).
    Text(String),
    /// Ordered image attachments.
    Images(Vec<ImageAttachment>),
}

impl SourceMaterial {
    /// True when there is nothing to generate from.
    pub fn is_empty(&self) -> bool {
        match self {
            SourceMaterial::Text(t) => t.is_empty(),
            SourceMaterial::Images(v) => v.is_empty(),
        }
    }
}

/// What a single file turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Pdf,
    Image(ImageMime),
}

impl FileKind {
    pub fn mime(&self) -> &'static str {
        match self {
            FileKind::Pdf => PDF_MIME,
            FileKind::Image(m) => m.as_str(),
        }
    }
}

/// A file read into memory together with its detected kind.
#[derive(Clone)]
pub struct LoadedFile {
    pub path: PathBuf,
    pub name: String,
    pub kind: Option<FileKind>,
    pub bytes: Vec<u8>,
}

impl fmt::Debug for LoadedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedFile")
            .field("path", &self.path)
            .field("kind", &self.kind)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

impl LoadedFile {
    /// Build from bytes already in memory, sniffing the kind.
    pub fn from_bytes(path: impl Into<PathBuf>, bytes: Vec<u8>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let kind = sniff_kind(&bytes, &path);
        Self {
            path,
            name,
            kind,
            bytes,
        }
    }
}

/// A homogeneous, validated selection.
#[derive(Debug, Clone)]
pub enum Selection {
    /// PDFs awaiting text extraction.
    Pdfs(Vec<LoadedFile>),
    /// Images ready to attach.
    Images(Vec<ImageAttachment>),
}

/// Detect a file's kind from magic bytes, then from its extension.
pub fn sniff_kind(bytes: &[u8], path: &Path) -> Option<FileKind> {
    if bytes.starts_with(b"%PDF") {
        return Some(FileKind::Pdf);
    }
    if let Some(mime) = image::guess_format(bytes)
        .ok()
        .and_then(ImageMime::from_format)
    {
        return Some(FileKind::Image(mime));
    }
    let ext = path.extension()?.to_str()?;
    if ext.eq_ignore_ascii_case("pdf") {
        return Some(FileKind::Pdf);
    }
    ImageMime::from_extension(ext).map(FileKind::Image)
}

/// Read every selected file into memory.
pub async fn read_files(paths: &[PathBuf]) -> Result<Vec<LoadedFile>, QpaperError> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::PermissionDenied => QpaperError::PermissionDenied { path: path.clone() },
            _ => QpaperError::FileNotFound { path: path.clone() },
        })?;
        let file = LoadedFile::from_bytes(path.clone(), bytes);
        debug!(
            "Loaded {} ({} bytes, {:?})",
            path.display(),
            file.bytes.len(),
            file.kind
        );
        files.push(file);
    }
    Ok(files)
}

/// Validate that a selection is all PDFs or all images.
///
/// The caller guarantees `files` is non-empty; an empty selection is a
/// "clear" and never reaches here.
pub fn classify(files: Vec<LoadedFile>) -> Result<Selection, QpaperError> {
    if let Some(unknown) = files.iter().find(|f| f.kind.is_none()) {
        return Err(QpaperError::UnsupportedFile {
            path: unknown.path.clone(),
        });
    }

    let all_pdfs = files.iter().all(|f| f.kind == Some(FileKind::Pdf));
    if all_pdfs {
        return Ok(Selection::Pdfs(files));
    }

    let mut images = Vec::with_capacity(files.len());
    for file in files {
        match file.kind {
            Some(FileKind::Image(mime)) => images.push(ImageAttachment {
                name: file.name,
                mime,
                data: file.bytes,
            }),
            _ => return Err(QpaperError::MixedSelection),
        }
    }
    Ok(Selection::Images(images))
}

/// Human-readable summary of an upload, e.g.
/// `"Uploaded: 2 file(s) selected: a.pdf, b.pdf..."`.
pub fn describe_upload<S: AsRef<str>>(names: &[S]) -> String {
    format!(
        "Uploaded: {} file(s) selected: {}...",
        names.len(),
        joined_names(names)
    )
}

/// Comma-joined names, cut to the description limit.
pub fn joined_names<S: AsRef<str>>(names: &[S]) -> String {
    let joined = names
        .iter()
        .map(|n| n.as_ref())
        .collect::<Vec<_>>()
        .join(", ");
    joined.chars().take(DESCRIPTION_NAMES_LIMIT).collect()
}
