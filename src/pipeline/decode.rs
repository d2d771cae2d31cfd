//! Decoding: raw bytes → pixels, natural dimensions and the source payload.
//!
//! The container format is sniffed from the magic bytes, never from the file
//! name. The original bytes are kept next to the pixels as a [`Payload`] so
//! the vector wrapper and the AI vectorizer can forward them untouched.

use crate::error::ImgConvError;
use crate::output::Payload;
use image::DynamicImage;
use tracing::debug;

/// A decoded source image. Owned by one pipeline invocation.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub image: DynamicImage,
    pub width: u32,
    pub height: u32,
    /// Original encoded bytes and their sniffed mime type.
    pub source: Payload,
}

impl DecodedImage {
    pub fn mime_type(&self) -> &str {
        &self.source.mime_type
    }
}

/// Decode `bytes` into a [`DecodedImage`].
///
/// `name` only labels the error.
pub fn decode_image(name: &str, bytes: Vec<u8>) -> Result<DecodedImage, ImgConvError> {
    let decode_err = |detail: String| ImgConvError::Decode {
        name: name.to_string(),
        detail,
    };

    let format = image::guess_format(&bytes).map_err(|e| decode_err(e.to_string()))?;
    let image =
        image::load_from_memory_with_format(&bytes, format).map_err(|e| decode_err(e.to_string()))?;

    let (width, height) = (image.width(), image.height());
    let mime_type = format.to_mime_type();
    debug!("Decoded {} as {} ({}x{})", name, mime_type, width, height);

    Ok(DecodedImage {
        image,
        width,
        height,
        source: Payload::new(mime_type, bytes),
    })
}
