//! Source image handle with lazy, orientation-corrected decoding.
//!
//! The compression engine treats pixels as opaque: encoders ask the
//! [`SourceImage`] for its decoded form only when they need it, and the
//! decode happens at most once per source.

use std::cell::OnceCell;
use std::io::Cursor;

use exif::{In, Reader, Tag};
use image::{DynamicImage, ImageReader};

use crate::constraint::BYTES_PER_KB;
use crate::encode::ImageFormat;
use crate::error::{CompressError, Result};

/// An encoded input image in one of the primary formats.
///
/// Holds the original bytes and caches the decoded pixels on first use.
#[derive(Debug)]
pub struct SourceImage {
    format: ImageFormat,
    bytes: Vec<u8>,
    decoded: OnceCell<DynamicImage>,
}

impl SourceImage {
    /// Wrap encoded bytes whose format is already known.
    pub fn new(format: ImageFormat, bytes: Vec<u8>) -> Self {
        Self {
            format,
            bytes,
            decoded: OnceCell::new(),
        }
    }

    /// Wrap encoded bytes, detecting the format from their magic number.
    ///
    /// # Errors
    ///
    /// Returns `CompressError::UnsupportedFormat` unless the bytes start like
    /// a JPEG or PNG file.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        match ImageFormat::from_magic(&bytes) {
            Some(format) if format.is_primary() => Ok(Self::new(format, bytes)),
            Some(format) => Err(CompressError::UnsupportedFormat(format!(
                "{} input",
                format
            ))),
            None => Err(CompressError::UnsupportedFormat(
                "unrecognized image data".to_string(),
            )),
        }
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// The encoded bytes as read from the caller.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn size_kb(&self) -> f64 {
        self.bytes.len() as f64 / BYTES_PER_KB
    }

    /// Decoded pixels, with EXIF orientation applied.
    ///
    /// # Errors
    ///
    /// Returns `CompressError::Decode` if the bytes are not a readable image.
    pub fn image(&self) -> Result<&DynamicImage> {
        if let Some(image) = self.decoded.get() {
            return Ok(image);
        }
        let image = decode_oriented(&self.bytes)?;
        Ok(self.decoded.get_or_init(|| image))
    }
}

/// Decode bytes and bake the EXIF orientation into the pixels.
///
/// The encoders do not write EXIF, so orientation must live in the pixels.
fn decode_oriented(bytes: &[u8]) -> Result<DynamicImage> {
    let orientation = exif_orientation(bytes);

    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| CompressError::Decode(e.to_string()))?;
    let img = reader
        .decode()
        .map_err(|e| CompressError::Decode(e.to_string()))?;

    Ok(upright(img, orientation))
}

/// EXIF orientation tag (1-8), or 1 when the bytes carry none.
fn exif_orientation(bytes: &[u8]) -> u32 {
    Reader::new()
        .read_from_container(&mut Cursor::new(bytes))
        .ok()
        .and_then(|exif| {
            exif.get_field(Tag::Orientation, In::PRIMARY)
                .and_then(|field| field.value.get_uint(0))
        })
        .unwrap_or(1)
}

/// Undo the camera's rotation and mirroring. Unknown tags leave the pixels
/// alone.
fn upright(img: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.rotate90().fliph(),
        6 => img.rotate90(),
        7 => img.rotate270().fliph(),
        8 => img.rotate270(),
        _ => img,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::codecs::png::PngEncoder;
    use image::{ExtendedColorType, GenericImageView, ImageEncoder, RgbImage};

    /// A small RGB gradient, encoded as PNG.
    pub(crate) fn gradient_png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x * 7 % 256) as u8, (y * 13 % 256) as u8, ((x + y) % 256) as u8])
        });
        let mut out = Vec::new();
        PngEncoder::new(&mut out)
            .write_image(img.as_raw(), width, height, ExtendedColorType::Rgb8)
            .unwrap();
        out
    }

    #[test]
    fn test_from_bytes_detects_png() {
        let source = SourceImage::from_bytes(gradient_png(8, 4)).unwrap();
        assert_eq!(source.format(), ImageFormat::Png);
        assert_eq!(source.image().unwrap().dimensions(), (8, 4));
    }

    #[test]
    fn test_from_bytes_rejects_webp_and_garbage() {
        let webp = b"RIFF\x04\x00\x00\x00WEBP".to_vec();
        assert!(matches!(
            SourceImage::from_bytes(webp),
            Err(CompressError::UnsupportedFormat(_))
        ));
        assert!(matches!(
            SourceImage::from_bytes(vec![1, 2, 3]),
            Err(CompressError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_decode_failure_is_lazy() {
        // Truncated PNG: accepted by magic, fails only when pixels are needed.
        let mut bytes = gradient_png(8, 8);
        bytes.truncate(20);
        let source = SourceImage::from_bytes(bytes).unwrap();
        assert!(matches!(source.image(), Err(CompressError::Decode(_))));
    }

    #[test]
    fn test_decoded_image_is_cached() {
        let source = SourceImage::new(ImageFormat::Png, gradient_png(4, 4));
        let first = source.image().unwrap() as *const DynamicImage;
        let second = source.image().unwrap() as *const DynamicImage;
        assert_eq!(first, second);
    }

    #[test]
    fn test_upright_turns_sideways_images() {
        let img = DynamicImage::new_rgb8(4, 2);
        assert_eq!(upright(img.clone(), 6).dimensions(), (2, 4));
        assert_eq!(upright(img.clone(), 7).dimensions(), (2, 4));
        assert_eq!(upright(img.clone(), 3).dimensions(), (4, 2));
        assert_eq!(upright(img, 42).dimensions(), (4, 2));
    }

    #[test]
    fn test_upright_mirrors() {
        let mut img = image::RgbImage::new(2, 1);
        img.put_pixel(0, 0, image::Rgb([255, 0, 0]));
        let flipped = upright(DynamicImage::ImageRgb8(img), 2).to_rgb8();
        assert_eq!(flipped.get_pixel(1, 0), &image::Rgb([255, 0, 0]));
    }

    #[test]
    fn test_missing_exif_reads_as_upright() {
        assert_eq!(exif_orientation(&gradient_png(2, 2)), 1);
        assert_eq!(exif_orientation(&[]), 1);
    }
}
