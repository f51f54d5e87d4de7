//! Input collection, destination planning and the worker pool.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use sizefit_core::constraint::BYTES_PER_KB;
use sizefit_core::io::file_len;
use sizefit_core::{CompressOptions, Compressor, FileOutcome, ImageFormat, Overwrite, Stage};
use tracing::{error, info, info_span};

use crate::paths::PathPolicy;

/// Files to compress. A directory contributes its `.jpg`, `.jpeg` and
/// `.png` files, not recursively, in name order.
pub fn collect_inputs(path: &Path) -> Result<Vec<PathBuf>> {
    if !path.exists() {
        bail!("\"{}\": path or directory does not exist", path.display());
    }
    if !path.is_dir() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut inputs = Vec::new();
    let entries =
        fs::read_dir(path).with_context(|| format!("\"{}\": cannot list directory", path.display()))?;
    for entry in entries {
        let entry = entry?;
        let file = entry.path();
        let supported = ImageFormat::from_path(&file).is_some_and(ImageFormat::is_primary);
        if supported && file.is_file() {
            inputs.push(file);
        }
    }
    inputs.sort();
    Ok(inputs)
}

/// One input and where its output goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub input: PathBuf,
    pub destination: PathBuf,
}

/// Resolve every destination up front.
///
/// Two inputs may not end up at the same file. With `converts` set the
/// comparison uses the `.webp` name the pipeline will write.
pub fn plan(policy: &PathPolicy, inputs: &[PathBuf], converts: bool) -> Result<Vec<Job>> {
    let mut claimed: HashMap<PathBuf, &Path> = HashMap::new();
    let mut jobs = Vec::with_capacity(inputs.len());

    for input in inputs {
        let destination = policy.destination(input)?;
        let written = if converts {
            destination.with_extension(ImageFormat::WebP.extension())
        } else {
            destination.clone()
        };
        if let Some(first) = claimed.insert(written.clone(), input) {
            bail!(
                "\"{}\" and \"{}\" would both be written to \"{}\"",
                first.display(),
                input.display(),
                written.display()
            );
        }
        jobs.push(Job {
            input: input.clone(),
            destination,
        });
    }
    Ok(jobs)
}

/// Per-file summary, printed with `--json`.
#[derive(Debug, Serialize)]
pub struct FileReport {
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    pub format: Option<String>,
    pub original_kb: Option<f64>,
    pub size_kb: Option<f64>,
    pub quality: Option<String>,
    pub webp_quality: Option<u8>,
    pub attempts: u32,
    pub padded: bool,
    pub stages: Vec<Stage>,
    pub degraded: Option<String>,
    pub error: Option<String>,
}

impl FileReport {
    fn succeeded(input: &Path, original_kb: Option<f64>, outcome: &FileOutcome) -> Self {
        let compressed = &outcome.compressed;
        Self {
            input: input.to_path_buf(),
            output: Some(outcome.path.clone()),
            format: Some(compressed.format().to_string()),
            original_kb,
            size_kb: Some(compressed.size_kb()),
            quality: compressed.primary_quality.map(|q| q.to_string()),
            webp_quality: compressed.secondary_quality,
            attempts: compressed.attempts,
            padded: compressed.padded,
            stages: compressed.stages.clone(),
            degraded: compressed.degraded.as_ref().map(ToString::to_string),
            error: None,
        }
    }

    fn failed(input: &Path, original_kb: Option<f64>, err: &anyhow::Error) -> Self {
        Self {
            input: input.to_path_buf(),
            output: None,
            format: None,
            original_kb,
            size_kb: None,
            quality: None,
            webp_quality: None,
            attempts: 0,
            padded: false,
            stages: Vec::new(),
            degraded: None,
            error: Some(format!("{:#}", err)),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

/// Compress every job on up to `workers` threads sharing one compressor.
///
/// Jobs go out over a bounded channel and reports come back over a second
/// one. Reports are returned in job order.
pub fn run_all(
    compressor: &Compressor,
    options: &CompressOptions,
    overwrite: Overwrite,
    jobs: &[Job],
    workers: usize,
) -> Vec<FileReport> {
    let workers = workers.clamp(1, jobs.len().max(1));
    let (job_tx, job_rx) = crossbeam_channel::bounded::<(usize, &Job)>(workers * 2);
    let (done_tx, done_rx) = crossbeam_channel::unbounded();

    thread::scope(|scope| {
        for _ in 0..workers {
            let job_rx = job_rx.clone();
            let done_tx = done_tx.clone();
            scope.spawn(move || {
                for (index, job) in job_rx {
                    let report = compress_one(compressor, options, overwrite, job);
                    if done_tx.send((index, report)).is_err() {
                        break;
                    }
                }
            });
        }
        drop(job_rx);
        drop(done_tx);

        for job in jobs.iter().enumerate() {
            if job_tx.send(job).is_err() {
                break;
            }
        }
        drop(job_tx);
    });

    let mut done: Vec<(usize, FileReport)> = done_rx.into_iter().collect();
    done.sort_by_key(|(index, _)| *index);
    done.into_iter().map(|(_, report)| report).collect()
}

fn compress_one(
    compressor: &Compressor,
    options: &CompressOptions,
    overwrite: Overwrite,
    job: &Job,
) -> FileReport {
    let input = job.input.as_path();
    let _span = info_span!("file", input = %input.display()).entered();
    let original_kb = file_len(input).ok().map(|len| len as f64 / BYTES_PER_KB);

    match compressor.compress_file(input, &job.destination, options, overwrite) {
        Ok(outcome) => {
            info!(
                output = %outcome.path.display(),
                before_kb = original_kb,
                after_kb = outcome.compressed.size_kb(),
                "done"
            );
            FileReport::succeeded(input, original_kb, &outcome)
        }
        Err(err) => {
            let err = anyhow::Error::from(err);
            error!("{:#}", err);
            FileReport::failed(input, original_kb, &err)
        }
    }
}
