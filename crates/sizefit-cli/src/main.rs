//! sizefit command line
//!
//! # Usage
//!
//! ```bash
//! # Compress at quality 80, writing photo_<uuid>_compressed.jpg
//! sizefit photo.jpg
//!
//! # Land at exactly 300 KB, overwriting the input
//! sizefit photo.jpg -t 300 -f
//!
//! # Keep a PNG between 200 and 400 KB and convert it to WebP
//! sizefit diagram.png -s 200 400 --webp -o out/
//!
//! # A whole directory on four threads, with a JSON line per file
//! sizefit photos/ -q 80 -j 4 --json
//!
//! # Log every search step
//! sizefit photo.jpg -t 300 -v
//! ```
//!
//! # Settings Priority
//!
//! Command-line flags > `--config` file > defaults. `RUST_LOG` overrides
//! `-v`.
//!
//! Exit status is 1 if any file failed.

mod args;
mod batch;
mod config;
mod paths;

use std::io;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use sizefit_core::Compressor;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use crate::args::Args;
use crate::config::{ConfigFile, Settings};
use crate::paths::PathPolicy;

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    fmt()
        .with_writer(io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let config = match &args.config {
        Some(path) => {
            info!("Loading configuration from: {:?}", path);
            ConfigFile::load(path)?
        }
        None => ConfigFile::default(),
    };

    let inputs = batch::collect_inputs(&args.path)?;
    let policy = PathPolicy::new(args.output.as_deref(), args.force)?;
    policy.check_input(&args.path)?;
    let settings = Settings::resolve(&args, &config, policy.wants_webp())?;

    if inputs.is_empty() {
        warn!("no .jpg, .jpeg or .png files in {}", args.path.display());
        return Ok(ExitCode::SUCCESS);
    }

    let jobs = batch::plan(&policy, &inputs, settings.options.secondary.is_some())?;
    let compressor = Compressor::new(&settings.tools);
    let reports = batch::run_all(
        &compressor,
        &settings.options,
        policy.overwrite(),
        &jobs,
        settings.jobs,
    );

    if args.json {
        for report in &reports {
            println!("{}", serde_json::to_string(report)?);
        }
    }

    let failed = reports.iter().filter(|report| report.is_failure()).count();
    if failed > 0 {
        error!(failed, total = reports.len(), "some files could not be compressed");
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
