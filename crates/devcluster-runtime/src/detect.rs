//! Container runtime detection.

use crate::RuntimeError;
use devcluster_schema::ResolvedRuntime;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("executable not found")]
    NotFound,
    #[error("{0}")]
    Failed(String),
}

/// Resolves an executable name to a path.
pub trait ExecutableLookup {
    fn lookup(&self, name: &str) -> Result<PathBuf, LookupError>;
}

/// `PATH` search backed by the `which` crate.
#[derive(Debug, Clone, Default)]
pub struct PathLookup {
    paths: Option<OsString>,
}

impl PathLookup {
    /// Search the process `PATH`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Search an explicit, `PATH`-formatted list of directories.
    pub fn in_paths(paths: impl Into<OsString>) -> Self {
        Self {
            paths: Some(paths.into()),
        }
    }
}

impl ExecutableLookup for PathLookup {
    fn lookup(&self, name: &str) -> Result<PathBuf, LookupError> {
        let result = match &self.paths {
            None => which::which(name),
            Some(paths) => {
                let cwd = std::env::current_dir().unwrap_or_else(|_| Path::new("/").to_path_buf());
                which::which_in(name, Some(paths), cwd)
            }
        };
        result.map_err(|e| match e {
            which::Error::CannotFindBinaryPath => LookupError::NotFound,
            other => LookupError::Failed(other.to_string()),
        })
    }
}

/// Detect the container runtime on the process `PATH`.
pub fn detect_container_runtime() -> Result<ResolvedRuntime, RuntimeError> {
    detect_with(&PathLookup::new())
}

/// Walk `ResolvedRuntime::PREFERENCE` in order. A lookup error other than
/// "not found" stops detection instead of falling through.
pub fn detect_with(lookup: &dyn ExecutableLookup) -> Result<ResolvedRuntime, RuntimeError> {
    for runtime in ResolvedRuntime::PREFERENCE {
        match lookup.lookup(runtime.executable()) {
            Ok(path) => {
                debug!("detected container runtime {runtime} at {}", path.display());
                return Ok(runtime);
            }
            Err(LookupError::NotFound) => {}
            Err(source) => {
                return Err(RuntimeError::Lookup {
                    executable: runtime.executable(),
                    source,
                })
            }
        }
    }
    Err(RuntimeError::NoRuntime)
}
