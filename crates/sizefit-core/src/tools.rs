//! Lookup of external encoder binaries.
//!
//! The lookup runs once, when the caller builds a [`ToolPaths`], and the
//! result is handed to the compressor explicitly. Leaf encoders never search
//! the file system themselves.

use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{CompressError, Result};

/// Environment variable that overrides the pngquant location.
pub const PNGQUANT_ENV: &str = "SIZEFIT_PNGQUANT";

const PNGQUANT: &str = "pngquant";

/// Resolved locations of the external tools.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolPaths {
    pngquant: Option<PathBuf>,
}

impl ToolPaths {
    /// Search the environment for every tool.
    ///
    /// Order: the `SIZEFIT_PNGQUANT` variable, then `PATH`, then the
    /// directory of the running executable and its `ext/` subdirectory.
    pub fn discover() -> Self {
        let exe_dir = env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf));
        let pngquant = find_tool(
            PNGQUANT,
            env::var_os(PNGQUANT_ENV),
            env::var_os("PATH"),
            exe_dir.as_deref(),
        );
        debug!(pngquant = ?pngquant, "resolved external tools");
        Self { pngquant }
    }

    /// Use an explicit pngquant binary.
    pub fn with_pngquant(path: impl Into<PathBuf>) -> Self {
        Self {
            pngquant: Some(path.into()),
        }
    }

    /// No external tools at all.
    pub fn none() -> Self {
        Self::default()
    }

    /// The pngquant binary.
    ///
    /// # Errors
    ///
    /// Returns `CompressError::EncoderUnavailable` if it was not found.
    pub fn pngquant(&self) -> Result<&Path> {
        self.pngquant
            .as_deref()
            .ok_or_else(|| CompressError::EncoderUnavailable {
                tool: PNGQUANT.to_string(),
            })
    }
}

fn find_tool(
    name: &str,
    override_path: Option<OsString>,
    search_path: Option<OsString>,
    exe_dir: Option<&Path>,
) -> Option<PathBuf> {
    if let Some(path) = override_path.map(PathBuf::from) {
        if path.is_file() {
            return Some(path);
        }
    }

    let file_name = format!("{}{}", name, env::consts::EXE_SUFFIX);

    let path_dirs = search_path
        .map(|paths| env::split_paths(&paths).collect::<Vec<_>>())
        .unwrap_or_default();
    let local_dirs = exe_dir
        .map(|dir| vec![dir.to_path_buf(), dir.join("ext")])
        .unwrap_or_default();

    path_dirs
        .into_iter()
        .chain(local_dirs)
        .map(|dir| dir.join(&file_name))
        .find(|candidate| candidate.is_file())
}
