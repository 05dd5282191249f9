//! Request construction: config + source material → one generation request.
//!
//! The request has three pieces:
//!
//! 1. **Model**: the Gemini model identifier
//! 2. **System instruction**: formatting rules from [`crate::prompts`]
//! 3. **Payload**: either a single text block (PDF text path) or a
//!    multi-part body of inline images followed by one instruction part
//!
//! ## Source truncation
//!
//! The text path keeps only the first [`MAX_SOURCE_CHARS`] characters of the
//! source. The excess is dropped silently; neither the model nor the user is
//! told. Only a `debug!` line records it.

use crate::config::GenerationConfig;
use crate::error::QpaperError;
use crate::pipeline::encode::encode_attachment;
use crate::pipeline::source::SourceMaterial;
use crate::prompts::{image_user_prompt, system_instruction, text_user_prompt};
use tracing::debug;

/// Hard cap on source characters included in the text payload.
pub const MAX_SOURCE_CHARS: usize = 150_000;

/// An inline binary attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineData {
    pub mime_type: String,
    /// Standard base64 of the raw file bytes.
    pub data: String,
}

/// One part of a multi-part payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    Text(String),
    InlineData(InlineData),
}

/// The user content of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// A single text block.
    Text(String),
    /// Attachments in input order, then one trailing instruction text.
    MultiPart(Vec<Part>),
}

/// Everything the generation service needs for one streaming call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub model: String,
    pub system_instruction: String,
    pub payload: Payload,
}

/// Build the request for `source` under `config`.
///
/// Fails with [`QpaperError::NoSource`] when the source is empty.
pub fn build_request(
    source: &SourceMaterial,
    config: &GenerationConfig,
    model: &str,
) -> Result<GenerationRequest, QpaperError> {
    if source.is_empty() {
        return Err(QpaperError::NoSource);
    }

    let payload = match source {
        SourceMaterial::Text(text) => {
            let kept = truncate_chars(text, MAX_SOURCE_CHARS);
            if kept.len() < text.len() {
                debug!(
                    "Source truncated to {MAX_SOURCE_CHARS} characters ({} bytes dropped)",
                    text.len() - kept.len()
                );
            }
            Payload::Text(text_user_prompt(kept, config))
        }
        SourceMaterial::Images(images) => {
            let mut parts: Vec<Part> = images
                .iter()
                .map(|img| Part::InlineData(encode_attachment(img)))
                .collect();
            parts.push(Part::Text(image_user_prompt(config)));
            Payload::MultiPart(parts)
        }
    };

    Ok(GenerationRequest {
        model: model.to_string(),
        system_instruction: system_instruction(config),
        payload,
    })
}

/// The first `max` characters of `text` (Unicode scalar values, not bytes).
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ObjectiveLayout, QuestionType};
    use crate::pipeline::source::{ImageAttachment, ImageMime};
    use crate::prompts::{MATH_BLOCK, SINGLE_LINE_OBJECTIVE_BLOCK};

    fn image(name: &str, mime: ImageMime) -> ImageAttachment {
        ImageAttachment {
            name: name.into(),
            mime,
            data: name.as_bytes().to_vec(),
        }
    }

    #[test]
    fn truncate_keeps_short_text() {
        assert_eq!(truncate_chars("abc", 5), "abc");
        assert_eq!(truncate_chars("abcde", 5), "abcde");
        assert_eq!(truncate_chars("", 5), "");
    }

    #[test]
    fn truncate_counts_characters_not_bytes() {
        let s = "é".repeat(10);
        assert_eq!(truncate_chars(&s, 3), "ééé");
    }

    #[test]
    fn text_payload_truncated_at_cap() {
        let text = "x".repeat(MAX_SOURCE_CHARS + 25);
        let req = build_request(
            &SourceMaterial::Text(text),
            &GenerationConfig::default(),
            "m",
        )
        .unwrap();
        let Payload::Text(body) = req.payload else {
            panic!("expected text payload")
        };
        assert!(body.contains(&"x".repeat(MAX_SOURCE_CHARS)));
        assert!(!body.contains(&"x".repeat(MAX_SOURCE_CHARS + 1)));
    }

    #[test]
    fn text_payload_at_cap_is_unmodified() {
        let text = "y".repeat(MAX_SOURCE_CHARS);
        let req = build_request(
            &SourceMaterial::Text(text.clone()),
            &GenerationConfig::default(),
            "m",
        )
        .unwrap();
        let Payload::Text(body) = req.payload else {
            panic!("expected text payload")
        };
        assert!(body.contains(&format!("---\n{text}\n---")));
    }

    #[test]
    fn end_to_end_objective_single_line_request() {
        let config = GenerationConfig::builder()
            .num_questions(5)
            .question_type(QuestionType::Objective)
            .objective_layout(ObjectiveLayout::SingleLine)
            .is_math_paper(false)
            .build()
            .unwrap();
        let req = build_request(
            &SourceMaterial::Text("Photosynthesis is...".into()),
            &config,
            "gemini-2.5-pro",
        )
        .unwrap();

        assert_eq!(req.model, "gemini-2.5-pro");
        assert!(req.system_instruction.contains(SINGLE_LINE_OBJECTIVE_BLOCK));
        assert!(!req.system_instruction.contains(MATH_BLOCK));
        assert!(req.system_instruction.contains("- Number of Questions: 5"));
        match req.payload {
            Payload::Text(body) => assert!(body.contains("Photosynthesis is...")),
            other => panic!("expected text payload, got {other:?}"),
        }
    }

    #[test]
    fn image_payload_orders_parts_and_ends_with_instruction() {
        let source = SourceMaterial::Images(vec![
            image("p1.png", ImageMime::Png),
            image("p2.jpg", ImageMime::Jpeg),
            image("p3.webp", ImageMime::Webp),
        ]);
        let req = build_request(&source, &GenerationConfig::default(), "m").unwrap();
        let Payload::MultiPart(parts) = req.payload else {
            panic!("expected multi-part payload")
        };
        assert_eq!(parts.len(), 4);
        let mimes: Vec<&str> = parts[..3]
            .iter()
            .map(|p| match p {
                Part::InlineData(d) => d.mime_type.as_str(),
                Part::Text(_) => panic!("text before attachments"),
            })
            .collect();
        assert_eq!(mimes, ["image/png", "image/jpeg", "image/webp"]);
        assert!(matches!(&parts[3], Part::Text(t) if t.contains("provided image(s)")));
    }

    #[test]
    fn empty_sources_are_rejected() {
        let config = GenerationConfig::default();
        assert!(matches!(
            build_request(&SourceMaterial::Text(String::new()), &config, "m"),
            Err(QpaperError::NoSource)
        ));
        assert!(matches!(
            build_request(&SourceMaterial::Images(vec![]), &config, "m"),
            Err(QpaperError::NoSource)
        ));
    }
}
