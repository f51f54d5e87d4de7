//! Error taxonomy for the compression engine.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::constraint::{format_kb, SizeConstraint};
use crate::encode::ImageFormat;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CompressError>;

/// Distinct file-system failure conditions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IoErrorKind {
    #[error("not found")]
    NotFound,
    #[error("already exists")]
    AlreadyExists,
    #[error("permission denied")]
    PermissionDenied,
    #[error("{0}")]
    Other(String),
}

impl From<&io::Error> for IoErrorKind {
    fn from(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => IoErrorKind::NotFound,
            io::ErrorKind::AlreadyExists => IoErrorKind::AlreadyExists,
            io::ErrorKind::PermissionDenied => IoErrorKind::PermissionDenied,
            _ => IoErrorKind::Other(err.to_string()),
        }
    }
}

/// Errors surfaced by the compression pipeline.
///
/// None of these are swallowed internally; each reaches the caller of the
/// orchestrator.
#[derive(Debug, Error)]
pub enum CompressError {
    /// Malformed or contradictory size bounds. Raised before any encoding.
    #[error("Invalid size constraint: {reason}")]
    InvalidConstraint { reason: String },

    /// Quality outside 1-100, or an inverted band.
    #[error("\"{0}\": quality must look like 80-90 or 90 (values 1-100)")]
    InvalidQuality(String),

    /// A required external encoder could not be located. Not retried.
    #[error("{tool} not found. Please ensure {tool} is installed or added to the PATH")]
    EncoderUnavailable { tool: String },

    /// One encoder invocation errored or produced no output.
    #[error("{format} encoding failed: {reason}")]
    EncodeFailure { format: ImageFormat, reason: String },

    /// The search stalled or ran out of attempts without meeting the bound.
    #[error(
        "Unable to compress {format} to {constraint}. Best achieved: {}",
        describe_best(.best_kb)
    )]
    ConvergenceFailure {
        format: ImageFormat,
        constraint: SizeConstraint,
        best_kb: Option<f64>,
        attempts: u32,
    },

    /// Input or output format outside the supported set.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The source bytes are not a readable image.
    #[error("Failed to decode source image: {0}")]
    Decode(String),

    /// A file-system operation failed.
    #[error("\"{}\": {kind}", .path.display())]
    Io { path: PathBuf, kind: IoErrorKind },
}

fn describe_best(best_kb: &Option<f64>) -> String {
    match best_kb {
        Some(kb) => format_kb(*kb),
        None => "nothing (encoder produced no smaller output)".to_string(),
    }
}

impl CompressError {
    pub(crate) fn encode(format: ImageFormat, reason: impl Into<String>) -> Self {
        CompressError::EncodeFailure {
            format,
            reason: reason.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, err: &io::Error) -> Self {
        CompressError::Io {
            path: path.into(),
            kind: IoErrorKind::from(err),
        }
    }

    /// Best size reached before a convergence failure, if any.
    pub fn best_kb(&self) -> Option<f64> {
        match self {
            CompressError::ConvergenceFailure { best_kb, .. } => *best_kb,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convergence_failure_display_with_best() {
        let err = CompressError::ConvergenceFailure {
            format: ImageFormat::Jpeg,
            constraint: SizeConstraint::exact(10.0).unwrap(),
            best_kb: Some(50.5),
            attempts: 4,
        };
        assert_eq!(
            err.to_string(),
            "Unable to compress JPEG to target size of 10KB. Best achieved: 50.50KB"
        );
        assert_eq!(err.best_kb(), Some(50.5));
    }

    #[test]
    fn test_convergence_failure_display_without_best() {
        let err = CompressError::ConvergenceFailure {
            format: ImageFormat::Png,
            constraint: SizeConstraint::range(300.0, 500.0).unwrap(),
            best_kb: None,
            attempts: 1,
        };
        assert!(err
            .to_string()
            .starts_with("Unable to compress PNG to size range of 300-500KB"));
        assert_eq!(err.best_kb(), None);
    }

    #[test]
    fn test_encoder_unavailable_display() {
        let err = CompressError::EncoderUnavailable {
            tool: "pngquant".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "pngquant not found. Please ensure pngquant is installed or added to the PATH"
        );
    }

    #[test]
    fn test_io_error_kinds() {
        let not_found = io::Error::new(io::ErrorKind::NotFound, "x");
        let err = CompressError::io("/tmp/missing.jpg", &not_found);
        assert!(matches!(
            err,
            CompressError::Io {
                kind: IoErrorKind::NotFound,
                ..
            }
        ));
        assert_eq!(err.to_string(), "\"/tmp/missing.jpg\": not found");

        let denied = io::Error::new(io::ErrorKind::PermissionDenied, "x");
        assert_eq!(IoErrorKind::from(&denied), IoErrorKind::PermissionDenied);

        let exists = io::Error::new(io::ErrorKind::AlreadyExists, "x");
        assert_eq!(IoErrorKind::from(&exists), IoErrorKind::AlreadyExists);
    }
}
