//! JPEG encoding.
//!
//! This module provides JPEG encoding using the `image` crate's JPEG encoder.
//! Alpha is dropped and pixels are encoded as 8-bit RGB.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder as ImageJpegEncoder;
use image::{ExtendedColorType, ImageEncoder};

use super::{EncodeOutcome, Encoder, ImageFormat, Quality};
use crate::decode::SourceImage;
use crate::error::{CompressError, Result};

/// Quality used when the caller asks for neither a quality nor a size.
pub const DEFAULT_JPEG_QUALITY: u8 = 75;

/// Encode RGB pixel data to JPEG bytes.
///
/// # Arguments
///
/// * `pixels` - RGB pixel data (3 bytes per pixel, row-major order)
/// * `width` - Image width in pixels
/// * `height` - Image height in pixels
/// * `quality` - JPEG quality (1-100, where 100 is highest quality)
///
/// # Returns
///
/// JPEG-encoded bytes on success, or an error if encoding fails.
///
/// # Errors
///
/// Returns `CompressError::EncodeFailure` for zero dimensions, a pixel
/// buffer of the wrong length, or an encoder error.
pub fn encode_jpeg(pixels: &[u8], width: u32, height: u32, quality: u8) -> Result<Vec<u8>> {
    if width == 0 || height == 0 {
        return Err(CompressError::encode(
            ImageFormat::Jpeg,
            format!("invalid dimensions {}x{}", width, height),
        ));
    }

    let expected_len = (width as usize) * (height as usize) * 3;
    if pixels.len() != expected_len {
        return Err(CompressError::encode(
            ImageFormat::Jpeg,
            format!(
                "expected {} bytes of RGB data, got {}",
                expected_len,
                pixels.len()
            ),
        ));
    }

    let quality = quality.clamp(1, 100);
    let mut buffer = Cursor::new(Vec::new());
    ImageJpegEncoder::new_with_quality(&mut buffer, quality)
        .write_image(pixels, width, height, ExtendedColorType::Rgb8)
        .map_err(|e| CompressError::encode(ImageFormat::Jpeg, e.to_string()))?;

    Ok(buffer.into_inner())
}

/// In-process JPEG encoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct JpegEncoder;

impl JpegEncoder {
    fn encode_at(&self, source: &SourceImage, quality: u8) -> Result<EncodeOutcome> {
        let rgb = source.image()?.to_rgb8();
        let bytes = encode_jpeg(rgb.as_raw(), rgb.width(), rgb.height(), quality)?;
        Ok(EncodeOutcome::new(ImageFormat::Jpeg, bytes))
    }
}

impl Encoder for JpegEncoder {
    fn format(&self) -> ImageFormat {
        ImageFormat::Jpeg
    }

    fn encode(
        &self,
        source: &SourceImage,
        quality: Option<Quality>,
    ) -> Result<Option<EncodeOutcome>> {
        let quality = match quality {
            None => DEFAULT_JPEG_QUALITY,
            Some(Quality::Single(q)) => q,
            Some(band @ Quality::Band { .. }) => {
                return Err(CompressError::UnsupportedFormat(format!(
                    "quality band {} for JPEG",
                    band
                )))
            }
        };
        self.encode_at(source, quality).map(Some)
    }

    fn encode_reference(&self, source: &SourceImage) -> Result<EncodeOutcome> {
        self.encode_at(source, DEFAULT_JPEG_QUALITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::tests::gradient_png;

    #[test]
    fn test_encode_jpeg_basic() {
        let pixels = vec![128u8; 100 * 100 * 3];
        let jpeg_bytes = encode_jpeg(&pixels, 100, 100, 90).unwrap();

        // SOI and EOI markers
        assert_eq!(&jpeg_bytes[0..2], &[0xFF, 0xD8]);
        let len = jpeg_bytes.len();
        assert_eq!(&jpeg_bytes[len - 2..], &[0xFF, 0xD9]);
    }

    #[test]
    fn test_encode_jpeg_quality_clamping() {
        let pixels = vec![128u8; 10 * 10 * 3];
        assert!(encode_jpeg(&pixels, 10, 10, 0).is_ok());
        assert!(encode_jpeg(&pixels, 10, 10, 255).is_ok());
    }

    #[test]
    fn test_encode_jpeg_invalid_pixel_data() {
        let pixels = vec![128u8; 99 * 100 * 3];
        assert!(matches!(
            encode_jpeg(&pixels, 100, 100, 90),
            Err(CompressError::EncodeFailure { .. })
        ));
    }

    #[test]
    fn test_encode_jpeg_zero_dimensions() {
        assert!(matches!(
            encode_jpeg(&[], 0, 100, 90),
            Err(CompressError::EncodeFailure { .. })
        ));
    }

    #[test]
    fn test_encoder_quality_affects_size() {
        let source = SourceImage::from_bytes(gradient_png(128, 128)).unwrap();
        let low = JpegEncoder
            .encode(&source, Some(Quality::Single(10)))
            .unwrap()
            .unwrap();
        let high = JpegEncoder
            .encode(&source, Some(Quality::Single(95)))
            .unwrap()
            .unwrap();
        assert_eq!(low.format, ImageFormat::Jpeg);
        assert!(high.len() > low.len());
    }

    #[test]
    fn test_encoder_default_matches_reference() {
        let source = SourceImage::from_bytes(gradient_png(32, 32)).unwrap();
        let default = JpegEncoder.encode(&source, None).unwrap().unwrap();
        let reference = JpegEncoder.encode_reference(&source).unwrap();
        assert_eq!(default, reference);
    }

    #[test]
    fn test_encoder_rejects_band() {
        let source = SourceImage::from_bytes(gradient_png(4, 4)).unwrap();
        let result = JpegEncoder.encode(&source, Some(Quality::Band { min: 60, max: 80 }));
        assert!(matches!(result, Err(CompressError::UnsupportedFormat(_))));
    }
}

// ============================================================================
// Property-based tests
// ============================================================================
