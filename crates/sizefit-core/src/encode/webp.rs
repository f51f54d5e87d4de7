//! WebP encoding through `libwebp`.

use image::DynamicImage;

use super::{EncodeOutcome, Encoder, ImageFormat, Quality};
use crate::decode::SourceImage;
use crate::error::{CompressError, Result};

/// Quality used when none is given.
pub const DEFAULT_WEBP_QUALITY: u8 = 100;

/// Encode an image to WebP.
///
/// Images with an alpha channel keep it; everything else is encoded as RGB.
/// `lossless` ignores `quality`.
///
/// # Errors
///
/// Returns `CompressError::EncodeFailure` if libwebp rejects the input, for
/// example when a side exceeds 16383 pixels.
pub fn encode_webp(image: &DynamicImage, quality: u8, lossless: bool) -> Result<Vec<u8>> {
    let quality = f32::from(quality.clamp(1, 100));
    let encoded = if image.color().has_alpha() {
        let rgba = image.to_rgba8();
        ::webp::Encoder::from_rgba(rgba.as_raw(), rgba.width(), rgba.height())
            .encode_simple(lossless, quality)
    } else {
        let rgb = image.to_rgb8();
        ::webp::Encoder::from_rgb(rgb.as_raw(), rgb.width(), rgb.height())
            .encode_simple(lossless, quality)
    };
    let memory =
        encoded.map_err(|e| CompressError::encode(ImageFormat::WebP, format!("{:?}", e)))?;

    Ok(memory.to_vec())
}

/// In-process WebP encoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebPEncoder;

impl Encoder for WebPEncoder {
    fn format(&self) -> ImageFormat {
        ImageFormat::WebP
    }

    fn encode(
        &self,
        source: &SourceImage,
        quality: Option<Quality>,
    ) -> Result<Option<EncodeOutcome>> {
        let quality = match quality {
            None => DEFAULT_WEBP_QUALITY,
            Some(Quality::Single(q)) => q,
            Some(band @ Quality::Band { .. }) => {
                return Err(CompressError::UnsupportedFormat(format!(
                    "quality band {} for WebP",
                    band
                )))
            }
        };
        let bytes = encode_webp(source.image()?, quality, false)?;
        Ok(Some(EncodeOutcome::new(ImageFormat::WebP, bytes)))
    }

    fn encode_reference(&self, source: &SourceImage) -> Result<EncodeOutcome> {
        let bytes = encode_webp(source.image()?, DEFAULT_WEBP_QUALITY, true)?;
        Ok(EncodeOutcome::new(ImageFormat::WebP, bytes))
    }
}
