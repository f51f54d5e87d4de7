//! Encoders driven by the size search.
//!
//! This module provides:
//! - JPEG encoding through the `image` crate
//! - Lossy PNG quantization through an external `pngquant` binary
//! - WebP encoding through `libwebp`
//!
//! # Architecture
//!
//! Every encoder implements [`Encoder`]. The search only ever sees the
//! trait, so tests substitute scripted encoders and the pipeline never
//! branches on concrete codec types. All calls are synchronous and may
//! block on a subprocess.
//!
//! # Examples
//!
//! ```ignore
//! use sizefit_core::decode::SourceImage;
//! use sizefit_core::encode::{Encoder, JpegEncoder, Quality};
//!
//! let source = SourceImage::from_bytes(std::fs::read("photo.jpg").unwrap()).unwrap();
//! let out = JpegEncoder.encode(&source, Some(Quality::Single(80))).unwrap();
//! println!("Encoded {} bytes", out.map_or(0, |o| o.len()));
//! ```

mod jpeg;
mod png;
mod types;
mod webp;

pub use jpeg::{encode_jpeg, JpegEncoder, DEFAULT_JPEG_QUALITY};
pub use png::{encode_png_lossless, PngQuantEncoder};
pub use types::{EncodeOutcome, ImageFormat, Quality};
pub use self::webp::{encode_webp, WebPEncoder, DEFAULT_WEBP_QUALITY};

use crate::decode::SourceImage;
use crate::error::Result;

/// A format-specific byte producer.
pub trait Encoder: Send + Sync {
    /// Format of every buffer this encoder produces.
    fn format(&self) -> ImageFormat;

    /// Encode `source` at `quality`, or at the encoder's own default when
    /// `quality` is `None`.
    ///
    /// Returns `Ok(None)` when the encoder declines to write output because
    /// it would be larger than the input or below the requested quality.
    ///
    /// # Errors
    ///
    /// `EncoderUnavailable` if a backing tool is missing, `EncodeFailure`
    /// if the encode itself fails.
    fn encode(&self, source: &SourceImage, quality: Option<Quality>)
        -> Result<Option<EncodeOutcome>>;

    /// One-shot encode at fixed reference settings, used to probe how large
    /// this format makes the source.
    fn encode_reference(&self, source: &SourceImage) -> Result<EncodeOutcome>;
}
