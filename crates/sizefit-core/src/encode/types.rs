//! Core types shared by the encoders.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constraint::BYTES_PER_KB;
use crate::error::CompressError;

/// Container formats the engine can read or produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// JPEG (baseline, RGB).
    Jpeg,
    /// PNG (lossless, or palette-quantized through pngquant).
    Png,
    /// WebP (lossy or lossless).
    WebP,
}

impl ImageFormat {
    /// Detect the format from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
            "png" => Some(ImageFormat::Png),
            "webp" => Some(ImageFormat::WebP),
            _ => None,
        }
    }

    /// Detect the format from a path's extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Detect the format from the leading magic bytes of an encoded buffer.
    pub fn from_magic(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(ImageFormat::Jpeg)
        } else if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
            Some(ImageFormat::Png)
        } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            Some(ImageFormat::WebP)
        } else {
            None
        }
    }

    /// Canonical file extension, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Png => "png",
            ImageFormat::WebP => "webp",
        }
    }

    /// Whether the format can be the primary (source-side) format of a run.
    ///
    /// WebP is only ever produced by the secondary conversion.
    pub fn is_primary(self) -> bool {
        matches!(self, ImageFormat::Jpeg | ImageFormat::Png)
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ImageFormat::Jpeg => "JPEG",
            ImageFormat::Png => "PNG",
            ImageFormat::WebP => "WebP",
        };
        f.write_str(name)
    }
}

impl FromStr for ImageFormat {
    type Err = CompressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_extension(s.trim_start_matches('.'))
            .ok_or_else(|| CompressError::UnsupportedFormat(s.to_string()))
    }
}

/// Encoder quality knob.
///
/// Most encoders take a single 1-100 value. Palette quantizers (pngquant)
/// also accept a `min-max` band and pick the fewest colors that meet it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Quality {
    /// A single quality value (1-100).
    Single(u8),
    /// A quality band, both ends inclusive.
    Band { min: u8, max: u8 },
}

impl Quality {
    /// Validate the value range: every bound in 1-100 and `min <= max`.
    pub fn validate(self) -> Result<Self, CompressError> {
        let ok = match self {
            Quality::Single(q) => (1..=100).contains(&q),
            Quality::Band { min, max } => {
                (1..=100).contains(&min) && (1..=100).contains(&max) && min <= max
            }
        };
        if ok {
            Ok(self)
        } else {
            Err(CompressError::InvalidQuality(self.to_string()))
        }
    }

    /// The single value, if this is not a band.
    pub fn single(self) -> Option<u8> {
        match self {
            Quality::Single(q) => Some(q),
            Quality::Band { .. } => None,
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quality::Single(q) => write!(f, "{}", q),
            Quality::Band { min, max } => write!(f, "{}-{}", min, max),
        }
    }
}

impl FromStr for Quality {
    type Err = CompressError;

    /// Parse `"80"` or `"80-90"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CompressError::InvalidQuality(s.to_string());
        let s = s.trim();

        let quality = match s.split_once('-') {
            None => Quality::Single(s.parse().map_err(|_| invalid())?),
            Some((min, max)) => Quality::Band {
                min: min.trim().parse().map_err(|_| invalid())?,
                max: max.trim().parse().map_err(|_| invalid())?,
            },
        };

        quality.validate().map_err(|_| invalid())
    }
}

/// The result of one encoder invocation.
///
/// Owned by whoever requested the encode; the engine measures it but never
/// mutates it, apart from the final padding step which consumes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeOutcome {
    /// Format the bytes are encoded in.
    pub format: ImageFormat,
    /// The encoded file contents.
    pub bytes: Vec<u8>,
}

impl EncodeOutcome {
    /// Wrap an encoded buffer.
    pub fn new(format: ImageFormat, bytes: Vec<u8>) -> Self {
        Self { format, bytes }
    }

    /// Encoded length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the encoder produced no bytes at all.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Encoded length in kilobytes (1 KB = 1024 bytes).
    pub fn size_kb(&self) -> f64 {
        self.bytes.len() as f64 / BYTES_PER_KB
    }

    /// Unwrap the owned buffer.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}
