//! Attachment encoding: raw image bytes → base64 inline data.
//!
//! Gemini accepts images inline in the JSON body as `{mimeType, data}` with
//! standard (padded) base64. The original file bytes are sent untouched; no
//! decode/re-encode round trip, so a JPEG stays a JPEG and GIF/WebP need no
//! codec support on our side.

use crate::pipeline::request::InlineData;
use crate::pipeline::source::ImageAttachment;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::debug;

/// Encode one attachment as an inline request part.
pub fn encode_attachment(image: &ImageAttachment) -> InlineData {
    let data = STANDARD.encode(&image.data);
    debug!("Encoded {} → {} bytes base64", image.name, data.len());

    InlineData {
        mime_type: image.mime.as_str().to_string(),
        data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::source::ImageMime;

    #[test]
    fn encode_keeps_mime_and_bytes() {
        let image = ImageAttachment {
            name: "scan.gif".into(),
            mime: ImageMime::Gif,
            data: b"GIF89a\x01\x00".to_vec(),
        };
        let inline = encode_attachment(&image);
        assert_eq!(inline.mime_type, "image/gif");
        let decoded = STANDARD.decode(&inline.data).expect("valid base64");
        assert_eq!(decoded, image.data);
    }
}
