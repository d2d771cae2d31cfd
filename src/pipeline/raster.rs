//! Raster rendering and encoding: decoded pixels → PNG / JPEG / WebP bytes.
//!
//! Every encode works on a [`Surface`] that lives for exactly one call:
//! acquire at the target size, paint the background, draw the scaled source,
//! then `encode` consumes the surface. Nothing survives between calls.
//!
//! ## Background policy
//!
//! The surface starts opaque white when the target has no alpha channel
//! (JPEG) or when the caller did not ask to keep transparency. Otherwise it
//! starts fully transparent and the source pixels are copied as-is.

use crate::config::{Quality, RasterFormat};
use crate::error::ImgConvError;
use crate::output::Payload;
use crate::pipeline::decode::DecodedImage;
use crate::pipeline::plan::Dimensions;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageEncoder, Rgba, RgbaImage};
use tracing::debug;

/// Largest surface we agree to allocate, in pixels.
pub const MAX_SURFACE_PIXELS: u64 = 16_384 * 16_384;

/// Resampling filter. Fixed so identical input yields identical output.
const RESIZE_FILTER: FilterType = FilterType::Triangle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Background {
    White,
    Transparent,
}

impl Background {
    fn for_target(format: RasterFormat, preserve_transparency: bool) -> Self {
        if !format.has_alpha() || !preserve_transparency {
            Background::White
        } else {
            Background::Transparent
        }
    }
}

/// A drawing surface sized to the output.
struct Surface {
    canvas: RgbaImage,
    background: Background,
}

impl Surface {
    fn acquire(dims: Dimensions, background: Background) -> Result<Self, ImgConvError> {
        let area = u64::from(dims.width) * u64::from(dims.height);
        if area == 0 || area > MAX_SURFACE_PIXELS {
            return Err(ImgConvError::Encoding {
                detail: format!(
                    "cannot allocate a {}x{} drawing surface (limit {} pixels)",
                    dims.width, dims.height, MAX_SURFACE_PIXELS
                ),
            });
        }

        let fill = match background {
            Background::White => Rgba([255, 255, 255, 255]),
            Background::Transparent => Rgba([0, 0, 0, 0]),
        };

        Ok(Self {
            canvas: RgbaImage::from_pixel(dims.width, dims.height, fill),
            background,
        })
    }

    /// Draw `image` stretched to fill the whole surface.
    fn draw(&mut self, image: &DynamicImage) {
        let (w, h) = self.canvas.dimensions();
        let scaled = if image.width() == w && image.height() == h {
            image.to_rgba8()
        } else {
            imageops::resize(image, w, h, RESIZE_FILTER)
        };

        match self.background {
            Background::Transparent => self.canvas = scaled,
            Background::White => imageops::overlay(&mut self.canvas, &scaled, 0, 0),
        }
    }

    fn encode(self, format: RasterFormat, quality: Quality) -> Result<Payload, ImgConvError> {
        let (w, h) = self.canvas.dimensions();
        let opaque = self.background == Background::White;
        let mut buf = Vec::new();

        if opaque {
            let rgb = DynamicImage::ImageRgba8(self.canvas).to_rgb8();
            write_image(&mut buf, format, quality, rgb.as_raw(), w, h, image::ColorType::Rgb8)?;
        } else {
            write_image(&mut buf, format, quality, self.canvas.as_raw(), w, h, image::ColorType::Rgba8)?;
        }

        debug!("Encoded {}x{} {:?} → {} bytes", w, h, format, buf.len());
        Ok(Payload::new(format.mime_type(), buf))
    }
}

fn write_image(
    buf: &mut Vec<u8>,
    format: RasterFormat,
    quality: Quality,
    pixels: &[u8],
    width: u32,
    height: u32,
    color: image::ColorType,
) -> Result<(), ImgConvError> {
    let encoding_err = |detail: String| ImgConvError::Encoding {
        detail: format!("{:?} encoder: {}", format, detail),
    };

    match format {
        RasterFormat::Png => PngEncoder::new(buf)
            .write_image(pixels, width, height, color.into())
            .map_err(|e| encoding_err(e.to_string())),
        RasterFormat::Jpeg => JpegEncoder::new_with_quality(buf, codec_quality(quality))
            .write_image(pixels, width, height, color.into())
            .map_err(|e| encoding_err(e.to_string())),
        // The image crate only writes lossless WebP; libwebp does the lossy encode.
        RasterFormat::Webp => {
            let encoder = match color {
                image::ColorType::Rgb8 => webp::Encoder::from_rgb(pixels, width, height),
                _ => webp::Encoder::from_rgba(pixels, width, height),
            };
            let memory = encoder
                .encode_simple(false, f32::from(codec_quality(quality)))
                .map_err(|e| encoding_err(format!("{:?}", e)))?;
            buf.extend_from_slice(&memory);
            Ok(())
        }
    }
}

/// Map the quality fraction onto the codecs' 1–100 scale.
fn codec_quality(quality: Quality) -> u8 {
    (quality.fraction() * 100.0).round().clamp(1.0, 100.0) as u8
}

/// Render `decoded` at `target` size and encode it as `format`.
///
/// `quality` is applied to JPEG and WebP; `preserve_transparency` is ignored for JPEG.
pub fn rasterize(
    decoded: &DecodedImage,
    target: Dimensions,
    format: RasterFormat,
    quality: Quality,
    preserve_transparency: bool,
) -> Result<Payload, ImgConvError> {
    let background = Background::for_target(format, preserve_transparency);
    if format.is_lossy() {
        debug!("Quality fraction {} for {:?}", quality.fraction(), format);
    }

    let mut surface = Surface::acquire(target, background)?;
    surface.draw(&decoded.image);
    surface.encode(format, quality)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::decode::{decode_image, tests::sample_bytes};
    use image::{GenericImageView, ImageFormat};

    fn decoded(w: u32, h: u32, pixel: [u8; 4]) -> DecodedImage {
        decode_image("t.png", sample_bytes(w, h, pixel, ImageFormat::Png)).unwrap()
    }

    fn dims(width: u32, height: u32) -> Dimensions {
        Dimensions { width, height }
    }

    fn q(percent: u8) -> Quality {
        Quality::from_percent(percent).unwrap()
    }

    #[test]
    fn png_keeps_alpha_when_asked() {
        let src = decoded(8, 6, [255, 0, 0, 0]);
        let out = rasterize(&src, dims(8, 6), RasterFormat::Png, q(90), true).unwrap();
        assert_eq!(out.mime_type, "image/png");

        let img = image::load_from_memory(&out.bytes).unwrap();
        assert!(img.color().has_alpha());
        assert_eq!((img.width(), img.height()), (8, 6));
        assert_eq!(img.get_pixel(3, 3).0[3], 0);
    }

    #[test]
    fn png_flattens_onto_white_when_not_preserving() {
        let src = decoded(4, 4, [0, 0, 255, 0]);
        let out = rasterize(&src, dims(4, 4), RasterFormat::Png, q(90), false).unwrap();

        let img = image::load_from_memory(&out.bytes).unwrap();
        assert!(!img.color().has_alpha());
        assert_eq!(img.get_pixel(1, 1).0, [255, 255, 255, 255]);
    }

    #[test]
    fn jpeg_is_always_opaque_white_backed() {
        let src = decoded(10, 10, [0, 0, 0, 0]);
        // preserve_transparency = true must be ignored for JPEG
        let out = rasterize(&src, dims(10, 10), RasterFormat::Jpeg, q(50), true).unwrap();
        assert_eq!(out.mime_type, "image/jpeg");

        let img = image::load_from_memory(&out.bytes).unwrap();
        assert!(!img.color().has_alpha());
        let px = img.get_pixel(5, 5).0;
        assert!(px[..3].iter().all(|&c| c >= 250), "expected white, got {px:?}");
    }

    #[test]
    fn webp_preserves_transparency_iff_flag() {
        let src = decoded(6, 6, [0, 255, 0, 64]);

        let keep = rasterize(&src, dims(6, 6), RasterFormat::Webp, q(80), true).unwrap();
        let img = image::load_from_memory(&keep.bytes).unwrap();
        assert_eq!(img.get_pixel(2, 2).0[3], 64);

        let flat = rasterize(&src, dims(6, 6), RasterFormat::Webp, q(80), false).unwrap();
        let img = image::load_from_memory(&flat.bytes).unwrap();
        assert_eq!(img.get_pixel(2, 2).0[3], 255);
    }

    #[test]
    fn webp_quality_changes_the_encoding() {
        let gradient = image::RgbaImage::from_fn(64, 64, |x, y| {
            Rgba([(x * 4) as u8, (y * 4) as u8, ((x + y) * 2) as u8, 255])
        });
        let src = DecodedImage {
            image: DynamicImage::ImageRgba8(gradient),
            width: 64,
            height: 64,
            source: Payload::new("image/png", Vec::new()),
        };

        let low = rasterize(&src, dims(64, 64), RasterFormat::Webp, q(1), true).unwrap();
        let high = rasterize(&src, dims(64, 64), RasterFormat::Webp, q(100), true).unwrap();
        assert_eq!(low.mime_type, "image/webp");
        assert_ne!(low.bytes, high.bytes);
        assert!(low.len() < high.len(), "q=1 {} bytes, q=100 {} bytes", low.len(), high.len());

        let img = image::load_from_memory(&high.bytes).unwrap();
        assert_eq!((img.width(), img.height()), (64, 64));
    }

    #[test]
    fn resizes_to_target() {
        let src = decoded(40, 40, [9, 9, 9, 255]);
        let out = rasterize(&src, dims(20, 10), RasterFormat::Png, q(90), true).unwrap();
        let img = image::load_from_memory(&out.bytes).unwrap();
        assert_eq!((img.width(), img.height()), (20, 10));
    }

    #[test]
    fn encoding_is_deterministic() {
        let src = decoded(33, 17, [200, 100, 50, 180]);
        let a = rasterize(&src, dims(12, 7), RasterFormat::Png, q(90), true).unwrap();
        let b = rasterize(&src, dims(12, 7), RasterFormat::Png, q(90), true).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn oversized_surface_is_encoding_error() {
        let src = decoded(2, 2, [0, 0, 0, 255]);
        let err = rasterize(&src, dims(100_000, 100_000), RasterFormat::Png, q(90), true)
            .unwrap_err();
        assert!(matches!(err, ImgConvError::Encoding { .. }));
        assert!(Surface::acquire(dims(0, 5), Background::White).is_err());
    }

    #[test]
    fn codec_quality_mapping() {
        assert_eq!(codec_quality(q(1)), 1);
        assert_eq!(codec_quality(q(50)), 50);
        assert_eq!(codec_quality(q(100)), 100);
    }

    #[test]
    fn background_policy() {
        use Background::*;
        assert_eq!(Background::for_target(RasterFormat::Jpeg, true), White);
        assert_eq!(Background::for_target(RasterFormat::Jpeg, false), White);
        assert_eq!(Background::for_target(RasterFormat::Png, true), Transparent);
        assert_eq!(Background::for_target(RasterFormat::Png, false), White);
        assert_eq!(Background::for_target(RasterFormat::Webp, true), Transparent);
    }
}
