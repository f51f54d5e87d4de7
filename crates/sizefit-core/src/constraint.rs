//! Output size constraints.
//!
//! A [`SizeConstraint`] is either an exact target (the output must not exceed
//! it, and is padded up to it when it lands below) or an inclusive range.
//! All sizes are in kilobytes, 1 KB = 1024 bytes.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CompressError, Result};

/// Bytes per kilobyte.
pub const BYTES_PER_KB: f64 = 1024.0;

/// Caller-specified output size requirement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SizeConstraint {
    /// Land at or just under `target_kb`; undershoots are padded up to it.
    Exact { target_kb: f64 },
    /// Land inside `[min_kb, max_kb]`.
    Range { min_kb: f64, max_kb: f64 },
}

impl SizeConstraint {
    /// Build an exact-target constraint.
    ///
    /// # Errors
    ///
    /// Returns `CompressError::InvalidConstraint` if the target is not a
    /// positive, finite number.
    pub fn exact(target_kb: f64) -> Result<Self> {
        SizeConstraint::Exact { target_kb }.validate()
    }

    /// Build an inclusive range constraint.
    ///
    /// # Errors
    ///
    /// Returns `CompressError::InvalidConstraint` if either bound is not
    /// positive and finite, if `min_kb >= max_kb`, or if no whole number of
    /// bytes lies between the bounds.
    pub fn range(min_kb: f64, max_kb: f64) -> Result<Self> {
        SizeConstraint::Range { min_kb, max_kb }.validate()
    }

    /// Check the invariants of the active variant.
    ///
    /// The variants are public so that options can be deserialized; the
    /// pipeline re-validates before any encoding work begins.
    pub fn validate(self) -> Result<Self> {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        match self {
            SizeConstraint::Exact { target_kb } => {
                if !positive(target_kb) {
                    return Err(CompressError::InvalidConstraint {
                        reason: format!("target size must be greater than 0, got {}", target_kb),
                    });
                }
            }
            SizeConstraint::Range { min_kb, max_kb } => {
                if !positive(min_kb) || !positive(max_kb) {
                    return Err(CompressError::InvalidConstraint {
                        reason: format!(
                            "size range values must be greater than 0, got min_size={}, max_size={}",
                            min_kb, max_kb
                        ),
                    });
                }
                if min_kb >= max_kb {
                    return Err(CompressError::InvalidConstraint {
                        reason: format!(
                            "minimum size must be less than maximum size, got min_size={}, max_size={}",
                            min_kb, max_kb
                        ),
                    });
                }
                // Padding rounds the floor up to whole bytes; that byte count
                // must still fit under the ceiling.
                if (min_kb * BYTES_PER_KB).ceil() > (max_kb * BYTES_PER_KB).floor() {
                    return Err(CompressError::InvalidConstraint {
                        reason: format!(
                            "size range {}-{}KB contains no whole byte count",
                            min_kb, max_kb
                        ),
                    });
                }
            }
        }
        Ok(self)
    }

    /// Upper bound: a search succeeds once the size is at or below this.
    pub fn ceiling_kb(&self) -> f64 {
        match *self {
            SizeConstraint::Exact { target_kb } => target_kb,
            SizeConstraint::Range { max_kb, .. } => max_kb,
        }
    }

    /// Lower bound: successful results below this are padded up to it.
    pub fn floor_kb(&self) -> f64 {
        match *self {
            SizeConstraint::Exact { target_kb } => target_kb,
            SizeConstraint::Range { min_kb, .. } => min_kb,
        }
    }

    /// Whether a size satisfies the constraint once padding has been applied.
    ///
    /// Exact targets accept anything in `[target, target + 1 byte)`: padding
    /// rounds up to the next whole byte.
    pub fn is_satisfied_by(&self, size_kb: f64) -> bool {
        match *self {
            SizeConstraint::Exact { target_kb } => {
                size_kb >= target_kb && size_kb - target_kb < 1.0 / BYTES_PER_KB
            }
            SizeConstraint::Range { min_kb, max_kb } => size_kb >= min_kb && size_kb <= max_kb,
        }
    }

    /// Multiply every bound by `factor`. Each range bound scales
    /// independently, so ordering is preserved for positive factors.
    pub fn scaled(&self, factor: f64) -> Self {
        match *self {
            SizeConstraint::Exact { target_kb } => SizeConstraint::Exact {
                target_kb: target_kb * factor,
            },
            SizeConstraint::Range { min_kb, max_kb } => SizeConstraint::Range {
                min_kb: min_kb * factor,
                max_kb: max_kb * factor,
            },
        }
    }

    pub fn is_exact(&self) -> bool {
        matches!(self, SizeConstraint::Exact { .. })
    }
}

/// Format a kilobyte count: whole numbers print bare, the rest with two
/// decimals.
pub(crate) fn format_kb(kb: f64) -> String {
    if kb.fract() == 0.0 {
        format!("{:.0}KB", kb)
    } else {
        format!("{:.2}KB", kb)
    }
}

impl fmt::Display for SizeConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            SizeConstraint::Exact { target_kb } => {
                write!(f, "target size of {}", format_kb(target_kb))
            }
            SizeConstraint::Range { min_kb, max_kb } => write!(
                f,
                "size range of {}-{}",
                format_kb(min_kb).trim_end_matches("KB"),
                format_kb(max_kb)
            ),
        }
    }
}
