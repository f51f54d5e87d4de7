//! The compression orchestrator.
//!
//! # Architecture
//!
//! A run walks an explicit state machine:
//!
//! ```text
//! Estimating -> PrimarySearch -> Converting -> SecondarySearch -> Padding -> Done
//!  (optional)                     (optional)     (optional)       (optional)
//! ```
//!
//! - `Estimating` runs only when a conversion and a constraint are both
//!   requested. It rescales the constraint for the primary search.
//! - `PrimarySearch` searches the source's own format, or encodes once at a
//!   fixed quality when there is no constraint.
//! - `Converting` hands the primary result to the secondary encoder. Without
//!   a constraint it encodes once; with one it moves to `SecondarySearch`,
//!   which searches against the caller's unscaled constraint.
//! - `Padding` raises an undershoot to the constraint's floor.
//!
//! A failure after the primary artifact exists degrades the run: the primary
//! artifact is returned with the error attached, unless the caller set
//! `require_secondary`.
//!
//! # Examples
//!
//! ```ignore
//! use sizefit_core::{CompressOptions, Compressor, SizeConstraint, ToolPaths};
//!
//! let compressor = Compressor::new(&ToolPaths::discover());
//! let options = CompressOptions::default().with_constraint(SizeConstraint::exact(200.0)?);
//! let result = compressor.compress_bytes(&std::fs::read("photo.jpg")?, &options)?;
//! println!("{} bytes", result.output.len());
//! ```

mod options;
#[cfg(test)]
pub(crate) mod scripted;

pub use options::{CompressOptions, SecondaryFormat};

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::constraint::SizeConstraint;
use crate::decode::SourceImage;
use crate::encode::{
    encode_jpeg, encode_png_lossless, EncodeOutcome, Encoder, ImageFormat, JpegEncoder,
    PngQuantEncoder, Quality, WebPEncoder,
};
use crate::error::{CompressError, Result};
use crate::io::{self, Overwrite};
use crate::padding;
use crate::ratio::{self, RatioEstimate};
use crate::search::{QualitySearch, StepPolicy};
use crate::tools::ToolPaths;

/// States of one orchestration run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Estimating,
    PrimarySearch,
    Converting,
    SecondarySearch,
    Padding,
    Done,
}

/// Result of a successful (possibly degraded) run.
#[derive(Debug)]
pub struct Compressed {
    /// Final bytes and their format.
    pub output: EncodeOutcome,
    /// Stages in the order they ran, ending with `Done`.
    pub stages: Vec<Stage>,
    /// Quality accepted by the primary encoder, if it took one.
    pub primary_quality: Option<Quality>,
    /// Quality accepted by the secondary encoder.
    pub secondary_quality: Option<u8>,
    /// Encoder invocations across every search and probe-free encode.
    pub attempts: u32,
    /// Whether filler bytes were appended.
    pub padded: bool,
    /// Ratio probe, when one ran.
    pub ratio: Option<RatioEstimate>,
    /// Why the conversion was abandoned, when the primary artifact was kept.
    pub degraded: Option<CompressError>,
}

impl Compressed {
    pub fn format(&self) -> ImageFormat {
        self.output.format
    }

    pub fn bytes(&self) -> &[u8] {
        &self.output.bytes
    }

    pub fn size_kb(&self) -> f64 {
        self.output.size_kb()
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded.is_some()
    }
}

/// A file written by [`Compressor::compress_file`].
#[derive(Debug)]
pub struct FileOutcome {
    /// Where the output was written. The extension follows the output format.
    pub path: PathBuf,
    pub compressed: Compressed,
}

/// Holds the encoders and runs the pipeline. Cheap to share across threads.
pub struct Compressor {
    jpeg: Box<dyn Encoder>,
    png: Box<dyn Encoder>,
    webp: Box<dyn Encoder>,
}

impl std::fmt::Debug for Compressor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Compressor").finish_non_exhaustive()
    }
}

impl Compressor {
    /// Build with the standard encoders and an already resolved tool lookup.
    pub fn new(tools: &ToolPaths) -> Self {
        Self::with_encoders(
            Box::new(JpegEncoder),
            Box::new(PngQuantEncoder::new(tools)),
            Box::new(WebPEncoder),
        )
    }

    /// Build with custom encoders.
    pub fn with_encoders(
        jpeg: Box<dyn Encoder>,
        png: Box<dyn Encoder>,
        webp: Box<dyn Encoder>,
    ) -> Self {
        Self { jpeg, png, webp }
    }

    fn encoder(&self, format: ImageFormat) -> &dyn Encoder {
        match format {
            ImageFormat::Jpeg => self.jpeg.as_ref(),
            ImageFormat::Png => self.png.as_ref(),
            ImageFormat::WebP => self.webp.as_ref(),
        }
    }

    /// Run the pipeline on an in-memory source.
    ///
    /// # Errors
    ///
    /// Validation errors before any encode, then whatever the primary stage
    /// raises. Conversion errors are returned only with `require_secondary`;
    /// otherwise they are attached to [`Compressed::degraded`].
    #[instrument(skip_all, fields(format = %source.format()))]
    pub fn compress(&self, source: &SourceImage, options: &CompressOptions) -> Result<Compressed> {
        options.validate()?;
        if !source.format().is_primary() {
            return Err(CompressError::UnsupportedFormat(format!(
                "{} input",
                source.format()
            )));
        }
        Run::new(self, source, options).execute()
    }

    /// Compress encoded bytes, detecting their format.
    ///
    /// With `options.output_format` set to a different primary format the
    /// input is first re-encoded (JPEG at quality 100, PNG lossless).
    ///
    /// # Errors
    ///
    /// `UnsupportedFormat` for input that is not JPEG or PNG, `Decode` when
    /// a re-encode cannot read the input, plus everything from
    /// [`Compressor::compress`].
    pub fn compress_bytes(&self, bytes: &[u8], options: &CompressOptions) -> Result<Compressed> {
        options.validate()?;
        let source = SourceImage::from_bytes(bytes.to_vec())?;
        let source = match options.output_format {
            Some(format) if format != source.format() => transcode(&source, format)?,
            _ => source,
        };
        self.compress(&source, options)
    }

    /// Compress a file on disk and write the result.
    ///
    /// The input format comes from the extension (`.jpg`, `.jpeg`, `.png`).
    /// `destination` is used as-is when its extension matches the output
    /// format; otherwise the extension is switched (for example to `.webp`
    /// after a conversion). `options.output_format` is ignored. With
    /// [`Overwrite::Deny`] the final path, after any extension switch, must
    /// not exist yet.
    ///
    /// # Errors
    ///
    /// `UnsupportedFormat` for other extensions, `Io` for read or write
    /// failures (`AlreadyExists` when overwriting is denied), plus
    /// everything from [`Compressor::compress`].
    #[instrument(skip_all, fields(input = %input.display()))]
    pub fn compress_file(
        &self,
        input: &Path,
        destination: &Path,
        options: &CompressOptions,
        overwrite: Overwrite,
    ) -> Result<FileOutcome> {
        let format = ImageFormat::from_path(input)
            .filter(|format| format.is_primary())
            .ok_or_else(|| {
                CompressError::UnsupportedFormat(format!(
                    "\"{}\": expected a .jpg, .jpeg or .png file",
                    input.display()
                ))
            })?;
        let source = SourceImage::new(format, io::read_file(input)?);

        let compressed = self.compress(&source, options)?;
        let path = output_path(destination, compressed.format());
        io::save(&path, compressed.bytes(), overwrite)?;

        info!(
            output = %path.display(),
            size_kb = compressed.size_kb(),
            "wrote compressed image"
        );
        Ok(FileOutcome { path, compressed })
    }
}

/// Re-encode a source into another primary format at near-lossless settings.
fn transcode(source: &SourceImage, format: ImageFormat) -> Result<SourceImage> {
    let image = source.image()?;
    let bytes = match format {
        ImageFormat::Jpeg => {
            let rgb = image.to_rgb8();
            encode_jpeg(rgb.as_raw(), rgb.width(), rgb.height(), 100)?
        }
        ImageFormat::Png => encode_png_lossless(image)?,
        ImageFormat::WebP => {
            return Err(CompressError::UnsupportedFormat(
                "WebP output format".to_string(),
            ))
        }
    };
    Ok(SourceImage::new(format, bytes))
}

fn output_path(destination: &Path, format: ImageFormat) -> PathBuf {
    if ImageFormat::from_path(destination) == Some(format) {
        destination.to_path_buf()
    } else {
        destination.with_extension(format.extension())
    }
}

/// Mutable state of one run, advanced one stage at a time.
struct Run<'a> {
    compressor: &'a Compressor,
    source: &'a SourceImage,
    options: &'a CompressOptions,
    primary_constraint: Option<SizeConstraint>,
    intermediate: Option<SourceImage>,
    output: Option<EncodeOutcome>,
    report: Report,
}

#[derive(Default)]
struct Report {
    stages: Vec<Stage>,
    primary_quality: Option<Quality>,
    secondary_quality: Option<u8>,
    attempts: u32,
    padded: bool,
    ratio: Option<RatioEstimate>,
    degraded: Option<CompressError>,
}

impl<'a> Run<'a> {
    fn new(compressor: &'a Compressor, source: &'a SourceImage, options: &'a CompressOptions) -> Self {
        Self {
            compressor,
            source,
            options,
            primary_constraint: options.constraint,
            intermediate: None,
            output: None,
            report: Report::default(),
        }
    }

    fn execute(mut self) -> Result<Compressed> {
        let mut stage = if self.options.secondary.is_some() && self.options.constraint.is_some() {
            Stage::Estimating
        } else {
            Stage::PrimarySearch
        };

        loop {
            self.report.stages.push(stage);
            stage = match stage {
                Stage::Estimating => self.estimate()?,
                Stage::PrimarySearch => self.primary_search()?,
                Stage::Converting => self.convert()?,
                Stage::SecondarySearch => self.secondary_search()?,
                Stage::Padding => self.pad()?,
                Stage::Done => break,
            };
        }

        self.finish()
    }

    fn primary(&self) -> &'a dyn Encoder {
        self.compressor.encoder(self.source.format())
    }

    fn secondary(&self) -> &'a dyn Encoder {
        self.compressor.webp.as_ref()
    }

    fn estimate(&mut self) -> Result<Stage> {
        if let Some(constraint) = self.options.constraint {
            let estimate = ratio::estimate(
                self.source,
                self.primary(),
                self.secondary(),
                self.options.webp_quality,
            )?;
            let scaled = estimate.rescale(&constraint);
            info!(ratio = estimate.ratio, %scaled, "rescaled constraint for conversion");
            self.primary_constraint = Some(scaled);
            self.report.ratio = Some(estimate);
        }
        Ok(Stage::PrimarySearch)
    }

    fn primary_search(&mut self) -> Result<Stage> {
        let encoder = self.primary();
        let format = encoder.format();
        let source = self.source;

        let outcome = match self.primary_constraint {
            Some(constraint) => {
                let requested = self.options.quality.and_then(Quality::single);
                let found = QualitySearch::new(
                    format,
                    constraint,
                    StepPolicy::for_constraint(&constraint, requested),
                )
                .max_attempts(self.options.max_attempts)
                .without_padding()
                .run(|q| encoder.encode(source, Some(Quality::Single(q))))?;

                self.report.attempts += found.attempts;
                self.report.primary_quality = Some(Quality::Single(found.quality));
                info!(quality = found.quality, size_kb = found.outcome.size_kb(), "primary search converged");
                found.outcome
            }
            None => {
                self.report.attempts += 1;
                self.report.primary_quality = self.options.quality;
                match encoder.encode(source, self.options.quality)? {
                    Some(outcome) => outcome,
                    None => {
                        warn!(
                            %format,
                            size_kb = source.size_kb(),
                            "encoder produced no smaller output, keeping source bytes"
                        );
                        EncodeOutcome::new(format, source.bytes().to_vec())
                    }
                }
            }
        };

        self.output = Some(outcome);
        if self.options.secondary.is_some() {
            Ok(Stage::Converting)
        } else {
            Ok(self.padding_or_done())
        }
    }

    fn convert(&mut self) -> Result<Stage> {
        let Some(primary) = self.output.as_ref() else {
            return Ok(Stage::Done);
        };
        let intermediate = SourceImage::new(primary.format, primary.bytes.clone());

        if self.options.constraint.is_some() {
            self.intermediate = Some(intermediate);
            return Ok(Stage::SecondarySearch);
        }

        let quality = self.options.webp_quality;
        self.report.attempts += 1;
        let converted = self
            .secondary()
            .encode(&intermediate, Some(Quality::Single(quality)))
            .and_then(|outcome| {
                outcome.ok_or_else(|| {
                    CompressError::encode(ImageFormat::WebP, "conversion produced no output")
                })
            });

        match converted {
            Ok(outcome) => {
                self.report.secondary_quality = Some(quality);
                self.output = Some(outcome);
                Ok(Stage::Done)
            }
            Err(err) => self.abandon_secondary(err),
        }
    }

    fn secondary_search(&mut self) -> Result<Stage> {
        let (Some(constraint), Some(intermediate)) =
            (self.options.constraint, self.intermediate.take())
        else {
            return Ok(Stage::Done);
        };
        let encoder = self.secondary();

        let searched = QualitySearch::new(
            encoder.format(),
            constraint,
            StepPolicy::webp(self.options.webp_quality),
        )
        .max_attempts(self.options.max_attempts)
        .without_padding()
        .run(|q| encoder.encode(&intermediate, Some(Quality::Single(q))));

        match searched {
            Ok(found) => {
                self.report.attempts += found.attempts;
                self.report.secondary_quality = Some(found.quality);
                info!(quality = found.quality, size_kb = found.outcome.size_kb(), "secondary search converged");
                self.output = Some(found.outcome);
                Ok(self.padding_or_done())
            }
            Err(err) => self.abandon_secondary(err),
        }
    }

    fn abandon_secondary(&mut self, err: CompressError) -> Result<Stage> {
        if self.options.require_secondary {
            return Err(err);
        }
        warn!(error = %err, "conversion failed, keeping primary output");
        self.report.degraded = Some(err);
        Ok(Stage::Done)
    }

    fn padding_or_done(&self) -> Stage {
        match (self.options.constraint, self.output.as_ref()) {
            (Some(constraint), Some(output)) if output.size_kb() < constraint.floor_kb() => {
                Stage::Padding
            }
            _ => Stage::Done,
        }
    }

    fn pad(&mut self) -> Result<Stage> {
        if let (Some(constraint), Some(output)) = (self.options.constraint, self.output.take()) {
            let floor = constraint.floor_kb();
            let before = output.len();
            let padded = padding::pad_outcome(output, floor);
            info!(from = before, to = padded.len(), "padded output to floor");
            self.report.padded = padded.len() > before;
            self.output = Some(padded);
        }
        Ok(Stage::Done)
    }

    fn finish(self) -> Result<Compressed> {
        let output = self.output.ok_or_else(|| {
            CompressError::encode(self.source.format(), "pipeline produced no output")
        })?;
        let report = self.report;
        Ok(Compressed {
            output,
            stages: report.stages,
            primary_quality: report.primary_quality,
            secondary_quality: report.secondary_quality,
            attempts: report.attempts,
            padded: report.padded,
            ratio: report.ratio,
            degraded: report.degraded,
        })
    }
}
