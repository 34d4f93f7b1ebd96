//! Runtime layer for devcluster: everything that touches the host.
//!
//! This crate implements container runtime detection (`detect_container_runtime`,
//! podman preferred over docker), a cancellable execution `Context`, a streaming
//! child-process runner that kills the process group on cancellation, the `kind`
//! command surface (`KindCommand`) with experimental-provider injection, and
//! prerequisite checks for the doctor command.

pub mod context;
pub mod detect;
pub mod kind;
pub mod prereq;
pub mod process;

pub use context::{CancelHandle, Context, Done};
pub use detect::{detect_container_runtime, detect_with, ExecutableLookup, LookupError, PathLookup};
pub use kind::{KindCommand, DEFAULT_KIND_BINARY, EXPERIMENTAL_PROVIDER_ENV};
pub use prereq::{check_prereqs, format_missing, MissingPrereq};
pub use process::run_streaming;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("could not detect container runtime (looked for: podman, docker)")]
    NoRuntime,
    #[error("looking up {executable} executable: {source}")]
    Lookup {
        executable: &'static str,
        #[source]
        source: LookupError,
    },
    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("'{command}' failed: {status}")]
    CommandFailed {
        command: String,
        status: std::process::ExitStatus,
    },
    #[error("'{command}' cancelled")]
    Cancelled { command: String },
    #[error("'{command}' exceeded its deadline")]
    DeadlineExceeded { command: String },
    #[error("runtime I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RuntimeError {
    /// True when the failure came from the context rather than the command.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled { .. } | Self::DeadlineExceeded { .. })
    }
}

