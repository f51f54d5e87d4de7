//! PNG encoding: lossy through `pngquant`, lossless through the `image`
//! crate.
//!
//! pngquant runs as a subprocess inside a scratch directory that is removed
//! on every exit path. It is invoked with `--skip-if-larger`, so it may
//! legitimately write nothing; that case surfaces as `Ok(None)`.

use std::path::{Path, PathBuf};
use std::process::Command;

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};
use tracing::debug;

use super::{EncodeOutcome, Encoder, ImageFormat, Quality};
use crate::decode::SourceImage;
use crate::error::{CompressError, Result};
use crate::io;
use crate::tools::ToolPaths;

/// pngquant exit code: result would be below the minimum quality.
const EXIT_QUALITY_TOO_LOW: i32 = 98;
/// pngquant exit code: result would be larger than the input.
const EXIT_TOO_LARGE: i32 = 99;

/// Encode an image as a lossless PNG.
///
/// # Errors
///
/// Returns `CompressError::EncodeFailure` if the encoder fails.
pub fn encode_png_lossless(image: &image::DynamicImage) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let (width, height) = (image.width(), image.height());
    let result = if image.color().has_alpha() {
        let rgba = image.to_rgba8();
        PngEncoder::new(&mut out).write_image(rgba.as_raw(), width, height, ExtendedColorType::Rgba8)
    } else {
        let rgb = image.to_rgb8();
        PngEncoder::new(&mut out).write_image(rgb.as_raw(), width, height, ExtendedColorType::Rgb8)
    };
    result.map_err(|e| CompressError::encode(ImageFormat::Png, e.to_string()))?;
    Ok(out)
}

/// Palette-quantizing PNG encoder backed by the `pngquant` binary.
#[derive(Debug, Clone)]
pub struct PngQuantEncoder {
    binary: Option<PathBuf>,
}

impl PngQuantEncoder {
    /// Build from an already resolved tool lookup.
    pub fn new(tools: &ToolPaths) -> Self {
        Self {
            binary: tools.pngquant().ok().map(Path::to_path_buf),
        }
    }

    fn binary(&self) -> Result<&Path> {
        self.binary
            .as_deref()
            .ok_or_else(|| CompressError::EncoderUnavailable {
                tool: "pngquant".to_string(),
            })
    }

    fn run(&self, input: &[u8], quality: Option<Quality>) -> Result<Option<Vec<u8>>> {
        let binary = self.binary()?;
        let scratch = io::scratch_dir()?;
        let input_path = scratch.path().join("input.png");
        let output_path = scratch.path().join("output.png");
        io::write_file(&input_path, input)?;

        let mut cmd = Command::new(binary);
        cmd.arg("--skip-if-larger")
            .arg("--force")
            .arg("--output")
            .arg(&output_path);
        if let Some(quality) = quality {
            cmd.arg("--quality").arg(quality.to_string());
        }
        cmd.arg("--").arg(&input_path);

        let output = cmd.output().map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => CompressError::EncoderUnavailable {
                tool: "pngquant".to_string(),
            },
            _ => CompressError::encode(ImageFormat::Png, e.to_string()),
        })?;

        match output.status.code() {
            Some(0) => {}
            Some(code @ (EXIT_QUALITY_TOO_LOW | EXIT_TOO_LARGE)) => {
                debug!(code, ?quality, "pngquant skipped output");
                return Ok(None);
            }
            _ => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                return Err(CompressError::encode(
                    ImageFormat::Png,
                    format!("pngquant exited with {}: {}", output.status, stderr.trim()),
                ));
            }
        }

        if !output_path.is_file() {
            return Ok(None);
        }
        io::read_file(&output_path).map(Some)
    }
}

impl Encoder for PngQuantEncoder {
    fn format(&self) -> ImageFormat {
        ImageFormat::Png
    }

    fn encode(
        &self,
        source: &SourceImage,
        quality: Option<Quality>,
    ) -> Result<Option<EncodeOutcome>> {
        let input = if source.format() == ImageFormat::Png {
            None
        } else {
            Some(encode_png_lossless(source.image()?)?)
        };
        let bytes = self.run(input.as_deref().unwrap_or(source.bytes()), quality)?;
        Ok(bytes.map(|bytes| EncodeOutcome::new(ImageFormat::Png, bytes)))
    }

    fn encode_reference(&self, source: &SourceImage) -> Result<EncodeOutcome> {
        let bytes = encode_png_lossless(source.image()?)?;
        Ok(EncodeOutcome::new(ImageFormat::Png, bytes))
    }
}
