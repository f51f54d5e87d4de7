//! Single-probe estimate of how a secondary format compares in size to the
//! primary one.
//!
//! When the output is converted after the primary search, the primary search
//! should aim at the size that will shrink (or grow) into the caller's bounds
//! after conversion. One trial encode in each format gives a ratio; the
//! constraint handed to the primary search is divided by it and widened by a
//! fixed safety factor.

use tracing::debug;

use crate::constraint::SizeConstraint;
use crate::decode::SourceImage;
use crate::encode::{Encoder, Quality};
use crate::error::{CompressError, Result};

/// Multiplier applied on top of the measured ratio.
pub const SAFETY_FACTOR: f64 = 1.1;

/// Ratio used when the primary probe is empty.
pub const FALLBACK_RATIO: f64 = 0.7;

/// Measured `secondary / primary` size ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatioEstimate {
    pub ratio: f64,
    pub safety_factor: f64,
}

impl RatioEstimate {
    /// Build from the two probe sizes (in bytes).
    ///
    /// Falls back to [`FALLBACK_RATIO`] when the primary probe is empty or
    /// the ratio would not be a positive finite number.
    pub fn from_sizes(primary_len: usize, secondary_len: usize) -> Self {
        let ratio = if primary_len == 0 {
            FALLBACK_RATIO
        } else {
            secondary_len as f64 / primary_len as f64
        };
        let ratio = if ratio.is_finite() && ratio > 0.0 {
            ratio
        } else {
            FALLBACK_RATIO
        };
        Self {
            ratio,
            safety_factor: SAFETY_FACTOR,
        }
    }

    /// Rescale a constraint for the primary search: every bound becomes
    /// `bound / ratio * safety_factor`.
    pub fn rescale(&self, constraint: &SizeConstraint) -> SizeConstraint {
        constraint.scaled(self.safety_factor / self.ratio)
    }
}

/// Probe both encoders once and measure their size ratio.
///
/// # Arguments
///
/// * `source` - The image to probe
/// * `primary` - Encoder of the current format, probed at its reference settings
/// * `secondary` - Encoder of the conversion target
/// * `probe_quality` - Quality for the secondary probe
///
/// # Errors
///
/// Any error from either probe. A secondary encoder that declines to write
/// output is an `EncodeFailure`.
pub fn estimate(
    source: &SourceImage,
    primary: &dyn Encoder,
    secondary: &dyn Encoder,
    probe_quality: u8,
) -> Result<RatioEstimate> {
    let primary_probe = primary.encode_reference(source)?;
    let secondary_probe = secondary
        .encode(source, Some(Quality::Single(probe_quality)))?
        .ok_or_else(|| {
            CompressError::encode(secondary.format(), "probe encode produced no output")
        })?;

    let estimate = RatioEstimate::from_sizes(primary_probe.len(), secondary_probe.len());
    debug!(
        primary = %primary.format(),
        primary_bytes = primary_probe.len(),
        secondary = %secondary.format(),
        secondary_bytes = secondary_probe.len(),
        ratio = estimate.ratio,
        "size ratio probe"
    );
    Ok(estimate)
}


// ============================================================================
// Property-based tests
// ============================================================================
