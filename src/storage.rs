//! Built-in sample catalogue of chapter texts and question-paper images.
//!
//! Lets the tool be tried without any files at hand. The catalogue is
//! immutable and lives for the whole process; paths are unique.
//!
//! ```text
//! storage/
//! ├── Class 10/{Mathematics, Science}/Chapter ….pdf     pre-extracted text
//! ├── Class 12/{Physics, Chemistry}/Chapter ….pdf
//! ├── model_paper/*.png|jpg                              base64 images
//! └── previous_year_question_paper/*.png
//! ```

use crate::error::QpaperError;
use crate::pipeline::source::{joined_names, ImageAttachment, ImageMime, SourceMaterial};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use once_cell::sync::Lazy;
use serde::Serialize;
use std::fmt;
use tracing::{debug, info};

/// Separator placed between the texts of several selected chapters.
pub const CHAPTER_SEPARATOR: &str = "\n\n---\n\n";

/// 1×1 PNG.
const TINY_PNG_BASE64: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR42mNkYAAAAAYAAjCB0C8AAAAASUVORK5CYII=";

/// Placeholder JPEG. The payload is not valid base64 (bad padding), so
/// selecting it exercises the decode-failure path.
const TINY_JPG_BASE64: &str = "/9j/4AAQSkZJRgABAQEAYABgAAD/2wBDAAIBAQIBAQICAgICAgICAwUDAwMDAwYEBAMFBwYHBwcGBwcICQsJCAgKCAcHCg0KCgsMDAwMBwkODw0MDgsMDAz/2wBDAQICAgMDAwYDAwYMCAcIDAwMDAwMDAwMDAwMDAwMDAwMDAwMDAwMDAwMDAwMDAwMDAwMDAwMDAwMDAwMDAwMDAz/wAARCAABAAEDASIAAhEBAxEB/8QAHwAAAQUBAQEBAQEAAAAAAAAAAAECAwQFBgcICQoL/8QAtRAAAgEDAwIEAwUFBAQAAAF9AQIDAAQRBRIhMUEGE1FhByJxFDKBkaEII0KxwRVS0fAkM2JyggkKFhcYGRolJicoKSo0NTY3ODk6Q0RFRkdISUpTVFVWV1hZWmNkZWZnaGlqc3R1dnd4eXqDhIWGh4iJipKTlJWWl5iZmqKjpKWmp6ipqrKztLW2t7i5usLDxMXGx8jJytLT1NXW19jZ2uHi4+Tl5ufo6erx8vP09fb3+Pn6/8QAHwEAAwEBAQEBAQEBAQAAAAAAAAECAwQFBgcICQoL/8QAtREAAgECBAQDBAcFBAQAAQJ3AAECAxEEBSExBhJBUQdhcRMiMoEIFEKRobHBCSMzUvAVYnLRChYkNOEl8RcYGRomJygpKjU2Nzg5OkNERUZHSElKU1RVVldYWVpjZGVmZ2hpanN0dXZ3eHl6goOEhYaHiImKkpOUlZaXmJmaoqOkpaanqKmqsrO0tba3uLm6wsPExcbHyMnK0tPU1dbX2Nna4uPk5ebn6Onq8vP09fb3+Pn6/9oADAMBAAIRAxEAPwD8wP/AAAb/wCP/8AgH/ADCD/wCbM=";

/// A chapter PDF whose text has already been extracted.
#[derive(Debug, Clone, Serialize)]
pub struct ChapterPdf {
    pub name: &'static str,
    pub path: &'static str,
    pub text: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct Subject {
    pub name: &'static str,
    pub chapters: Vec<ChapterPdf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassEntry {
    pub name: &'static str,
    pub subjects: Vec<Subject>,
}

/// An image stored inline as base64.
#[derive(Debug, Clone, Serialize)]
pub struct StoredImage {
    pub name: &'static str,
    pub path: &'static str,
    pub mime: ImageMime,
    #[serde(skip)]
    pub base64: Option<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageFolder {
    pub name: &'static str,
    pub path_prefix: &'static str,
    pub images: Vec<StoredImage>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Catalogue {
    pub classes: Vec<ClassEntry>,
    pub image_folders: Vec<ImageFolder>,
}

/// A leaf of the catalogue.
#[derive(Debug, Clone, Copy)]
pub enum StorageEntry {
    Pdf(&'static ChapterPdf),
    Image(&'static StoredImage),
}

impl StorageEntry {
    pub fn name(&self) -> &'static str {
        match self {
            StorageEntry::Pdf(c) => c.name,
            StorageEntry::Image(i) => i.name,
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            StorageEntry::Pdf(c) => c.path,
            StorageEntry::Image(i) => i.path,
        }
    }
}

impl fmt::Display for StorageEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageEntry::Pdf(c) => write!(f, "[pdf]   {}", c.path),
            StorageEntry::Image(i) => write!(f, "[{}] {}", i.mime, i.path),
        }
    }
}

/// A catalogue selection ready to become the session source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageSelection {
    pub source: SourceMaterial,
    pub description: String,
}

static CATALOGUE: Lazy<Catalogue> = Lazy::new(build_catalogue);

/// The process-wide catalogue.
pub fn catalogue() -> &'static Catalogue {
    &CATALOGUE
}

impl Catalogue {
    /// Every leaf, PDFs first, in catalogue order.
    pub fn entries(&'static self) -> impl Iterator<Item = StorageEntry> {
        let pdfs = self
            .classes
            .iter()
            .flat_map(|c| c.subjects.iter())
            .flat_map(|s| s.chapters.iter())
            .map(StorageEntry::Pdf);
        let images = self
            .image_folders
            .iter()
            .flat_map(|f| f.images.iter())
            .map(StorageEntry::Image);
        pdfs.chain(images)
    }
}

/// Look up a leaf by its full path.
pub fn find(path: &str) -> Option<StorageEntry> {
    catalogue().entries().find(|e| e.path() == path)
}

/// Concatenate the texts of the chapters at `paths`, in the given order.
pub fn select_pdfs<S: AsRef<str>>(paths: &[S]) -> Result<StorageSelection, QpaperError> {
    if paths.is_empty() {
        return Err(QpaperError::NoSource);
    }
    let chapters = paths
        .iter()
        .map(|p| match find(p.as_ref()) {
            Some(StorageEntry::Pdf(c)) => Ok(c),
            Some(StorageEntry::Image(_)) => Err(QpaperError::MixedSelection),
            None => Err(QpaperError::UnknownStoragePath {
                path: p.as_ref().to_string(),
            }),
        })
        .collect::<Result<Vec<_>, _>>()?;

    let text = chapters
        .iter()
        .map(|c| c.text)
        .collect::<Vec<_>>()
        .join(CHAPTER_SEPARATOR);
    let names: Vec<&str> = chapters.iter().map(|c| c.name).collect();
    info!("Selected {} chapter(s) from storage", chapters.len());

    Ok(StorageSelection {
        source: SourceMaterial::Text(text),
        description: format!(
            "{} PDF(s) from storage: {}...",
            chapters.len(),
            joined_names(&names)
        ),
    })
}

/// Decode the images at `paths` into attachments, in the given order.
///
/// The whole selection fails if any image lacks data or holds invalid
/// base64.
pub fn select_images<S: AsRef<str>>(paths: &[S]) -> Result<StorageSelection, QpaperError> {
    if paths.is_empty() {
        return Err(QpaperError::NoSource);
    }
    let mut attachments = Vec::with_capacity(paths.len());
    for p in paths {
        let image = match find(p.as_ref()) {
            Some(StorageEntry::Image(i)) => i,
            Some(StorageEntry::Pdf(_)) => return Err(QpaperError::MixedSelection),
            None => {
                return Err(QpaperError::UnknownStoragePath {
                    path: p.as_ref().to_string(),
                })
            }
        };
        attachments.push(decode_image(image)?);
    }

    let names: Vec<&str> = attachments.iter().map(|a| a.name.as_str()).collect();
    let description = format!(
        "{} image(s) from storage: {}...",
        attachments.len(),
        joined_names(&names)
    );
    Ok(StorageSelection {
        source: SourceMaterial::Images(attachments),
        description,
    })
}

fn decode_image(image: &StoredImage) -> Result<ImageAttachment, QpaperError> {
    let encoded = image.base64.ok_or_else(|| QpaperError::MissingImageData {
        name: image.name.to_string(),
    })?;
    let data = STANDARD
        .decode(encoded)
        .map_err(|_| QpaperError::ImageDecode {
            name: image.name.to_string(),
        })?;
    debug!("Decoded {} ({} bytes)", image.name, data.len());
    Ok(ImageAttachment {
        name: image.name.to_string(),
        mime: image.mime,
        data,
    })
}

fn chapter(name: &'static str, path: &'static str, text: &'static str) -> ChapterPdf {
    ChapterPdf { name, path, text }
}

fn build_catalogue() -> Catalogue {
    Catalogue {
        classes: vec![
            ClassEntry {
                name: "Class 10",
                subjects: vec![
                    Subject {
                        name: "Mathematics",
                        chapters: vec![
                            chapter(
                                "Chapter 1 - Real Numbers.pdf",
                                "storage/Class 10/Mathematics/Chapter 1 - Real Numbers.pdf",
                                "This is the simulated text content for Class 10 Mathematics, Chapter 1: Real Numbers. It covers topics like Euclid's division lemma, fundamental theorem of arithmetic, irrational numbers, and decimal expansions of rational numbers.",
                            ),
                            chapter(
                                "Chapter 2 - Polynomials.pdf",
                                "storage/Class 10/Mathematics/Chapter 2 - Polynomials.pdf",
                                "Simulated content for Class 10 Mathematics, Chapter 2: Polynomials. This includes degree of a polynomial, zeroes of a polynomial, relationship between zeroes and coefficients, and division algorithm for polynomials.",
                            ),
                        ],
                    },
                    Subject {
                        name: "Science",
                        chapters: vec![
                            chapter(
                                "Chapter 1 - Chemical Reactions and Equations.pdf",
                                "storage/Class 10/Science/Chapter 1 - Chemical Reactions.pdf",
                                "Simulated text for Class 10 Science, Chapter 1: Chemical Reactions and Equations. Topics include chemical equations, balancing chemical equations, types of chemical reactions (combination, decomposition, displacement, double displacement, oxidation and reduction).",
                            ),
                            chapter(
                                "Chapter 6 - Life Processes.pdf",
                                "storage/Class 10/Science/Chapter 6 - Life Processes.pdf",
                                "Simulated text for Class 10 Science, Chapter 6: Life Processes. This chapter explores nutrition, respiration, transportation, and excretion in living organisms.",
                            ),
                        ],
                    },
                ],
            },
            ClassEntry {
                name: "Class 12",
                subjects: vec![
                    Subject {
                        name: "Physics",
                        chapters: vec![chapter(
                            "Chapter 1 - Electric Charges and Fields.pdf",
                            "storage/Class 12/Physics/Chapter 1 - Electric Charges.pdf",
                            "Simulated content for Class 12 Physics, Chapter 1: Electric Charges and Fields. Covers electric charge, Coulomb's law, electric field, electric field lines, electric flux, Gauss's law and its applications.",
                        )],
                    },
                    Subject {
                        name: "Chemistry",
                        chapters: vec![chapter(
                            "Chapter 1 - The Solid State.pdf",
                            "storage/Class 12/Chemistry/Chapter 1 - The Solid State.pdf",
                            "Simulated content for Class 12 Chemistry, Chapter 1: The Solid State. Discusses classification of solids, crystal lattices, unit cells, packing in solids, imperfections in solids, electrical and magnetic properties of solids.",
                        )],
                    },
                ],
            },
        ],
        image_folders: vec![
            ImageFolder {
                name: "Model Question Papers",
                path_prefix: "storage/model_paper/",
                images: vec![
                    StoredImage {
                        name: "MQ_Physics_SetA_Page1.png",
                        path: "storage/model_paper/MQ_Physics_SetA_Page1.png",
                        mime: ImageMime::Png,
                        base64: Some(TINY_PNG_BASE64),
                    },
                    StoredImage {
                        name: "MQ_Math_SetB_Diagram.jpg",
                        path: "storage/model_paper/MQ_Math_SetB_Diagram.jpg",
                        mime: ImageMime::Jpeg,
                        base64: Some(TINY_JPG_BASE64),
                    },
                ],
            },
            ImageFolder {
                name: "Previous Year Question Papers",
                path_prefix: "storage/previous_year_question_paper/",
                images: vec![StoredImage {
                    name: "PYQ_Chemistry_2023_Q5.png",
                    path: "storage/previous_year_question_paper/PYQ_Chemistry_2023_Q5.png",
                    mime: ImageMime::Png,
                    base64: Some(TINY_PNG_BASE64),
                }],
            },
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    const PHYSICS_PNG: &str = "storage/model_paper/MQ_Physics_SetA_Page1.png";
    const MATH_JPG: &str = "storage/model_paper/MQ_Math_SetB_Diagram.jpg";
    const REAL_NUMBERS: &str = "storage/Class 10/Mathematics/Chapter 1 - Real Numbers.pdf";
    const SOLID_STATE: &str = "storage/Class 12/Chemistry/Chapter 1 - The Solid State.pdf";

    #[test]
    fn paths_are_unique() {
        let paths: Vec<&str> = catalogue().entries().map(|e| e.path()).collect();
        let unique: HashSet<&str> = paths.iter().copied().collect();
        assert_eq!(paths.len(), unique.len());
        assert_eq!(paths.len(), 9);
    }

    #[test]
    fn image_paths_live_under_their_folder_prefix() {
        for folder in &catalogue().image_folders {
            for image in &folder.images {
                assert!(image.path.starts_with(folder.path_prefix));
            }
        }
    }

    #[test]
    fn find_distinguishes_kinds() {
        assert!(matches!(find(REAL_NUMBERS), Some(StorageEntry::Pdf(_))));
        assert!(matches!(find(PHYSICS_PNG), Some(StorageEntry::Image(_))));
        assert!(find("storage/nowhere.pdf").is_none());
    }

    #[test]
    fn pdf_texts_joined_in_selection_order() {
        let sel = select_pdfs(&[SOLID_STATE, REAL_NUMBERS]).unwrap();
        let SourceMaterial::Text(text) = &sel.source else {
            panic!("expected text source")
        };
        let parts: Vec<&str> = text.split(CHAPTER_SEPARATOR).collect();
        assert_eq!(parts.len(), 2);
        assert!(parts[0].contains("The Solid State"));
        assert!(parts[1].contains("Real Numbers"));
        assert!(sel.description.starts_with(
            "2 PDF(s) from storage: Chapter 1 - The Solid State.pdf, Chapter 1 - Real Numbers.pdf"
        ));
        assert!(sel.description.ends_with("..."));
    }

    #[test]
    fn png_decodes_to_real_image() {
        let sel = select_images(&[PHYSICS_PNG]).unwrap();
        let SourceMaterial::Images(images) = &sel.source else {
            panic!("expected image source")
        };
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].mime, ImageMime::Png);
        assert!(images[0].data.starts_with(b"\x89PNG"));
        assert_eq!(
            sel.description,
            "1 image(s) from storage: MQ_Physics_SetA_Page1.png..."
        );
    }

    #[test]
    fn broken_base64_fails_whole_selection() {
        let err = select_images(&[PHYSICS_PNG, MATH_JPG]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to convert base64 string for MQ_Math_SetB_Diagram.jpg."
        );
    }

    #[test]
    fn missing_payload_is_reported() {
        let image = StoredImage {
            name: "blank.png",
            path: "storage/blank.png",
            mime: ImageMime::Png,
            base64: None,
        };
        let err = decode_image(&image).unwrap_err();
        assert_eq!(err.to_string(), "Image data missing for blank.png");
    }

    #[test]
    fn kinds_cannot_be_mixed() {
        assert!(matches!(
            select_pdfs(&[REAL_NUMBERS, PHYSICS_PNG]),
            Err(QpaperError::MixedSelection)
        ));
        assert!(matches!(
            select_images(&[PHYSICS_PNG, REAL_NUMBERS]),
            Err(QpaperError::MixedSelection)
        ));
    }

    #[test]
    fn empty_and_unknown_selections_rejected() {
        let none: [&str; 0] = [];
        assert!(matches!(select_pdfs(&none), Err(QpaperError::NoSource)));
        assert!(matches!(select_images(&none), Err(QpaperError::NoSource)));
        assert!(matches!(
            select_pdfs(&["storage/Class 11"]),
            Err(QpaperError::UnknownStoragePath { .. })
        ));
    }
}
