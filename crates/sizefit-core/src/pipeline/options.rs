//! Per-run configuration.

use serde::{Deserialize, Serialize};

use crate::constraint::SizeConstraint;
use crate::encode::{ImageFormat, Quality, DEFAULT_WEBP_QUALITY};
use crate::error::{CompressError, Result};
use crate::search::DEFAULT_MAX_ATTEMPTS;

/// Optional conversion applied after the primary search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecondaryFormat {
    #[default]
    None,
    WebP,
}

impl SecondaryFormat {
    pub fn is_some(self) -> bool {
        self != SecondaryFormat::None
    }
}

/// Everything one orchestration run needs to know.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressOptions {
    /// Quality for the primary encoder. With a range constraint a single
    /// value becomes the search's starting point; without a constraint it
    /// is used as-is.
    pub quality: Option<Quality>,
    /// Size bound for the final output.
    pub constraint: Option<SizeConstraint>,
    /// Conversion after the primary search.
    pub secondary: SecondaryFormat,
    /// Starting (or fixed) WebP quality.
    pub webp_quality: u8,
    /// Attempt cap for every search in the run.
    pub max_attempts: u32,
    /// Fail instead of falling back to the primary artifact when the
    /// conversion fails.
    pub require_secondary: bool,
    /// Re-encode byte input into this format first (bytes entry point only).
    pub output_format: Option<ImageFormat>,
}

impl Default for CompressOptions {
    fn default() -> Self {
        Self {
            quality: None,
            constraint: None,
            secondary: SecondaryFormat::None,
            webp_quality: DEFAULT_WEBP_QUALITY,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            require_secondary: false,
            output_format: None,
        }
    }
}

impl CompressOptions {
    pub fn with_constraint(mut self, constraint: SizeConstraint) -> Self {
        self.constraint = Some(constraint);
        self
    }

    pub fn with_quality(mut self, quality: Quality) -> Self {
        self.quality = Some(quality);
        self
    }

    pub fn with_webp(mut self, webp_quality: u8) -> Self {
        self.secondary = SecondaryFormat::WebP;
        self.webp_quality = webp_quality;
        self
    }

    /// Check every field before any encoding starts.
    ///
    /// # Errors
    ///
    /// - `InvalidConstraint` for a malformed constraint
    /// - `InvalidQuality` for a quality or WebP quality outside 1-100
    /// - `UnsupportedFormat` for a non-primary `output_format`
    pub fn validate(&self) -> Result<()> {
        if let Some(constraint) = self.constraint {
            constraint.validate()?;
        }
        if let Some(quality) = self.quality {
            quality.validate()?;
        }
        Quality::Single(self.webp_quality).validate()?;
        if let Some(format) = self.output_format {
            if !format.is_primary() {
                return Err(CompressError::UnsupportedFormat(format!(
                    "{} output format",
                    format
                )));
            }
        }
        Ok(())
    }
}
