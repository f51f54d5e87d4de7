//! sizefit core - size-targeted image compression
//!
//! This crate compresses JPEG and PNG images to an exact target size or into
//! a size range, optionally converting the result to WebP. Encoders are
//! treated as opaque and expensive; the interesting part is the search that
//! steers them toward a byte budget, detects when that is hopeless, and pads
//! undershoots up to the floor.
//!
//! # Architecture
//!
//! - [`search`]: convergence tracking and the quality search loop
//! - [`padding`]: byte-exact floor correction
//! - [`ratio`]: cross-format size ratio probe
//! - [`pipeline`]: the orchestrator and its entry points
//! - [`encode`], [`decode`], [`tools`], [`io`]: the collaborators the
//!   pipeline drives

pub mod constraint;
pub mod decode;
pub mod encode;
pub mod error;
pub mod io;
pub mod padding;
pub mod pipeline;
pub mod ratio;
pub mod search;
pub mod tools;

pub use constraint::SizeConstraint;
pub use decode::SourceImage;
pub use encode::{EncodeOutcome, Encoder, ImageFormat, Quality};
pub use error::{CompressError, IoErrorKind, Result};
pub use io::Overwrite;
pub use pipeline::{CompressOptions, Compressed, Compressor, FileOutcome, SecondaryFormat, Stage};
pub use ratio::RatioEstimate;
pub use tools::ToolPaths;
