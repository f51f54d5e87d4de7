//! Command-line arguments.

use std::path::PathBuf;

use clap::Parser;
use sizefit_core::Quality;

/// Compress JPEG and PNG images, optionally to an exact size or a size range.
#[derive(Debug, Parser)]
#[command(name = "sizefit", version, about)]
pub struct Args {
    /// Image file or directory of images (.jpg, .jpeg, .png).
    pub path: PathBuf,

    /// Overwrite the input, or an existing output file.
    #[arg(short, long, visible_alias = "violent")]
    pub force: bool,

    /// Compression quality, e.g. 80 or a pngquant band like 80-90. Defaults to 80.
    #[arg(short, long, value_name = "Q")]
    pub quality: Option<Quality>,

    /// Output file or directory.
    #[arg(short, long, value_name = "OUT")]
    pub output: Option<PathBuf>,

    /// Convert the result to WebP.
    #[arg(long)]
    pub webp: bool,

    /// Target file size in KB. Takes precedence over --size-range.
    #[arg(short, long, value_name = "KB")]
    pub target_size: Option<f64>,

    /// Minimum and maximum file size in KB.
    #[arg(short, long, num_args = 2, value_names = ["MIN", "MAX"])]
    pub size_range: Option<Vec<f64>>,

    /// Quality for the WebP conversion (1-100). Defaults to 100.
    #[arg(long, visible_alias = "wq", value_name = "N", value_parser = clap::value_parser!(u8).range(1..=100))]
    pub webp_quality: Option<u8>,

    /// TOML file with default settings.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log every search step.
    #[arg(short, long)]
    pub verbose: bool,

    /// Worker threads for directory input.
    #[arg(short, long, value_name = "N")]
    pub jobs: Option<usize>,

    /// Print one JSON summary line per file on stdout.
    #[arg(long)]
    pub json: bool,
}

impl Args {
    /// The range flag as a pair. clap guarantees exactly two values.
    pub fn size_range(&self) -> Option<(f64, f64)> {
        match self.size_range.as_deref() {
            Some([min, max]) => Some((*min, *max)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_command_is_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_full_flag_set() {
        let args = Args::try_parse_from([
            "sizefit", "photo.jpg", "-f", "-q", "80-90", "-o", "out", "--webp", "-s", "100",
            "200", "--webp-quality", "70", "-v", "-j", "4", "--json",
        ])
        .unwrap();

        assert_eq!(args.path, PathBuf::from("photo.jpg"));
        assert!(args.force);
        assert_eq!(args.quality, Some(Quality::Band { min: 80, max: 90 }));
        assert_eq!(args.output, Some(PathBuf::from("out")));
        assert!(args.webp);
        assert_eq!(args.size_range(), Some((100.0, 200.0)));
        assert_eq!(args.webp_quality, Some(70));
        assert!(args.verbose);
        assert_eq!(args.jobs, Some(4));
        assert!(args.json);
    }

    #[test]
    fn test_long_aliases() {
        let args =
            Args::try_parse_from(["sizefit", "photo.jpg", "--violent", "--wq", "70"]).unwrap();
        assert!(args.force);
        assert_eq!(args.webp_quality, Some(70));
        assert!(Args::try_parse_from(["sizefit", "photo.jpg", "--wq", "101"]).is_err());
    }

    #[test]
    fn test_rejects_malformed_quality() {
        assert!(Args::try_parse_from(["sizefit", "a.jpg", "-q", "90-80"]).is_err());
        assert!(Args::try_parse_from(["sizefit", "a.jpg", "-q", "high"]).is_err());
        assert!(Args::try_parse_from(["sizefit", "a.jpg", "--webp-quality", "0"]).is_err());
    }

    #[test]
    fn test_range_needs_two_values() {
        assert!(Args::try_parse_from(["sizefit", "a.jpg", "-s", "100"]).is_err());
    }
}
