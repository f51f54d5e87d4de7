//! Settings file and flag resolution.
//!
//! Priority: command-line flags > config file > defaults. The size bound is
//! resolved as a unit: if any size flag is given, the file's size settings
//! are ignored.
//!
//! ```toml
//! quality = "80-90"
//! target_size = 300
//! # size_range = [200, 400]
//! webp = true
//! webp_quality = 90
//! max_attempts = 10
//! require_webp = false
//! jobs = 4
//! pngquant = "/opt/pngquant/bin/pngquant"
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use sizefit_core::{CompressOptions, Quality, SecondaryFormat, SizeConstraint, ToolPaths};
use tracing::warn;

use crate::args::Args;

/// Quality when neither a flag nor the config file sets one.
pub const DEFAULT_QUALITY: u8 = 80;

/// Contents of a `--config` file. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub quality: Option<QualityValue>,
    pub target_size: Option<f64>,
    pub size_range: Option<[f64; 2]>,
    pub webp: Option<bool>,
    pub webp_quality: Option<u8>,
    pub max_attempts: Option<u32>,
    pub require_webp: Option<bool>,
    pub jobs: Option<usize>,
    pub pngquant: Option<PathBuf>,
}

/// `quality = 80` or `quality = "80-90"`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum QualityValue {
    Number(u8),
    Text(String),
}

impl QualityValue {
    fn parse(&self) -> Result<Quality> {
        let quality = match self {
            QualityValue::Number(q) => Quality::Single(*q).validate()?,
            QualityValue::Text(s) => s.parse()?,
        };
        Ok(quality)
    }
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("\"{}\": cannot read config file", path.display()))?;
        Self::parse(&text).with_context(|| format!("\"{}\": invalid config file", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }
}

/// Everything a run needs after merging flags and the config file.
#[derive(Debug)]
pub struct Settings {
    pub options: CompressOptions,
    pub jobs: usize,
    pub tools: ToolPaths,
}

impl Settings {
    /// Merge `args` over `config`. `force_webp` is set when the output path
    /// itself asks for WebP.
    pub fn resolve(args: &Args, config: &ConfigFile, force_webp: bool) -> Result<Self> {
        let quality = match (args.quality, &config.quality) {
            (Some(quality), _) => Some(quality),
            (None, Some(value)) => Some(value.parse()?),
            (None, None) => Some(Quality::Single(DEFAULT_QUALITY)),
        };

        let flag_bounds = (args.target_size, args.size_range());
        let bounds = if flag_bounds.0.is_some() || flag_bounds.1.is_some() {
            flag_bounds
        } else {
            (config.target_size, config.size_range.map(|[min, max]| (min, max)))
        };
        let constraint = match bounds {
            (Some(target), range) => {
                if range.is_some() {
                    warn!("both target size and size range given, using target size");
                }
                Some(SizeConstraint::exact(target)?)
            }
            (None, Some((min, max))) => Some(SizeConstraint::range(min, max)?),
            (None, None) => None,
        };

        let mut options = CompressOptions {
            quality,
            constraint,
            ..CompressOptions::default()
        };
        if args.webp || force_webp || config.webp.unwrap_or(false) {
            options.secondary = SecondaryFormat::WebP;
        }
        if let Some(webp_quality) = args.webp_quality.or(config.webp_quality) {
            options.webp_quality = webp_quality;
        }
        if let Some(max_attempts) = config.max_attempts {
            options.max_attempts = max_attempts;
        }
        options.require_secondary = config.require_webp.unwrap_or(false);
        options.validate()?;

        let tools = match &config.pngquant {
            Some(path) => ToolPaths::with_pngquant(path),
            None => ToolPaths::discover(),
        };

        Ok(Self {
            options,
            jobs: args.jobs.or(config.jobs).unwrap_or(1).max(1),
            tools,
        })
    }
}
