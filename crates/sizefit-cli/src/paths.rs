//! Where compressed files go.
//!
//! Without `--force` nothing is overwritten: outputs get a fresh
//! `<stem>_<uuid>_compressed<ext>` name next to the input or inside the
//! output directory, and an existing output file is an error. With
//! `--force` the input (or the named output) is replaced.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use sizefit_core::{ImageFormat, Overwrite};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Output {
    BesideInput,
    Directory(PathBuf),
    File { path: PathBuf, format: ImageFormat },
}

/// Output placement rules for one invocation.
#[derive(Debug, Clone)]
pub struct PathPolicy {
    output: Output,
    force: bool,
}

impl PathPolicy {
    /// Classify `-o`. An existing directory, or a path without an extension,
    /// is an output directory and is created if missing. Anything else must
    /// name a `.jpg`, `.jpeg`, `.png` or `.webp` file.
    pub fn new(output: Option<&Path>, force: bool) -> Result<Self> {
        let output = match output {
            None => Output::BesideInput,
            Some(dir) if dir.is_dir() => Output::Directory(dir.to_path_buf()),
            Some(dir) if dir.extension().is_none() => {
                fs::create_dir_all(dir)
                    .with_context(|| format!("\"{}\": cannot create directory", dir.display()))?;
                Output::Directory(dir.to_path_buf())
            }
            Some(path) => match ImageFormat::from_path(path) {
                Some(format) => Output::File {
                    path: path.to_path_buf(),
                    format,
                },
                None => bail!(
                    "\"{}\": unsupported output file format",
                    path.file_name().unwrap_or(path.as_os_str()).to_string_lossy()
                ),
            },
        };
        Ok(Self { output, force })
    }

    /// An output file named `*.webp` turns the conversion on.
    pub fn wants_webp(&self) -> bool {
        matches!(
            self.output,
            Output::File {
                format: ImageFormat::WebP,
                ..
            }
        )
    }

    /// Whether writes may replace existing files.
    pub fn overwrite(&self) -> Overwrite {
        if self.force {
            Overwrite::Allow
        } else {
            Overwrite::Deny
        }
    }

    /// Reject an output file that cannot hold what `input` produces.
    pub fn check_input(&self, input: &Path) -> Result<()> {
        let Output::File { path, format } = &self.output else {
            return Ok(());
        };
        if input.is_dir() {
            bail!(
                "\"{}\": output must be a directory when the input is a directory",
                path.display()
            );
        }
        if *format != ImageFormat::WebP && ImageFormat::from_path(input) != Some(*format) {
            bail!("inconsistent output file format with input file format");
        }
        Ok(())
    }

    /// Destination for one input file. The pipeline may still switch the
    /// extension to match the output format.
    pub fn destination(&self, input: &Path) -> Result<PathBuf> {
        let file_name = input
            .file_name()
            .with_context(|| format!("\"{}\": not a file path", input.display()))?;

        let path = match (&self.output, self.force) {
            (Output::BesideInput, true) => input.to_path_buf(),
            (Output::BesideInput, false) => input.with_file_name(unique_name(input)),
            (Output::Directory(dir), true) => dir.join(file_name),
            (Output::Directory(dir), false) => dir.join(unique_name(input)),
            (Output::File { path, .. }, force) => {
                if !force && path.exists() {
                    bail!("\"{}\": already exists", path.display());
                }
                path.clone()
            }
        };
        Ok(path)
    }
}

fn unique_name(input: &Path) -> String {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    let ext = input
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();
    format!("{}_{}_compressed{}", stem, Uuid::new_v4(), ext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_beside_input_gets_unique_name() {
        let policy = PathPolicy::new(None, false).unwrap();
        let input = Path::new("/photos/cat.jpg");

        let first = policy.destination(input).unwrap();
        let second = policy.destination(input).unwrap();

        assert_eq!(first.parent(), Some(Path::new("/photos")));
        let name = first.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("cat_"));
        assert!(name.ends_with("_compressed.jpg"));
        // stem + '_' + 36-char uuid + "_compressed.jpg"
        assert_eq!(name.len(), "cat_".len() + 36 + "_compressed.jpg".len());
        assert_ne!(first, second);
    }

    #[test]
    fn test_force_overwrites_input() {
        let policy = PathPolicy::new(None, true).unwrap();
        let input = Path::new("/photos/cat.png");
        assert_eq!(policy.destination(input).unwrap(), input);
        assert_eq!(policy.overwrite(), Overwrite::Allow);
        assert_eq!(PathPolicy::new(None, false).unwrap().overwrite(), Overwrite::Deny);
    }

    #[test]
    fn test_output_directory() {
        let dir = TempDir::new().unwrap();
        let input = Path::new("/photos/cat.jpeg");

        let policy = PathPolicy::new(Some(dir.path()), true).unwrap();
        assert_eq!(policy.destination(input).unwrap(), dir.path().join("cat.jpeg"));

        let policy = PathPolicy::new(Some(dir.path()), false).unwrap();
        let dest = policy.destination(input).unwrap();
        assert_eq!(dest.parent(), Some(dir.path()));
        assert!(dest.to_string_lossy().ends_with("_compressed.jpeg"));
    }

    #[test]
    fn test_extensionless_output_is_created_as_directory() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("nested").join("out");

        let policy = PathPolicy::new(Some(&out), false).unwrap();
        assert!(out.is_dir());
        assert!(!policy.wants_webp());
    }

    #[test]
    fn test_output_file_exists_without_force() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("out.jpg");
        fs::write(&out, b"taken").unwrap();
        let input = Path::new("/photos/cat.jpg");

        let policy = PathPolicy::new(Some(&out), false).unwrap();
        let err = policy.destination(input).unwrap_err();
        assert!(err.to_string().contains("already exists"));

        let policy = PathPolicy::new(Some(&out), true).unwrap();
        assert_eq!(policy.destination(input).unwrap(), out);
    }

    #[test]
    fn test_webp_output_file() {
        let policy = PathPolicy::new(Some(Path::new("/tmp/sizefit-none/out.webp")), false).unwrap();
        assert!(policy.wants_webp());
        assert!(policy.check_input(Path::new("/photos/cat.png")).is_ok());
    }

    #[test]
    fn test_unsupported_output_extension() {
        let err = PathPolicy::new(Some(Path::new("/tmp/out.gif")), false).unwrap_err();
        assert!(err.to_string().contains("unsupported output file format"));
    }

    #[test]
    fn test_mismatched_output_extension() {
        let policy = PathPolicy::new(Some(Path::new("/tmp/sizefit-none/out.png")), false).unwrap();
        assert!(policy.check_input(Path::new("/photos/cat.jpg")).is_err());
        assert!(policy.check_input(Path::new("/photos/cat.png")).is_ok());

        let policy = PathPolicy::new(Some(Path::new("/tmp/sizefit-none/out.jpeg")), false).unwrap();
        assert!(policy.check_input(Path::new("/photos/cat.JPG")).is_ok());
    }

    #[test]
    fn test_file_output_rejects_directory_input() {
        let dir = TempDir::new().unwrap();
        let policy = PathPolicy::new(Some(Path::new("/tmp/sizefit-none/out.jpg")), false).unwrap();
        assert!(policy.check_input(dir.path()).is_err());
    }
}
