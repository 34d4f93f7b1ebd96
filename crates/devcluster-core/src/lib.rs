//! Core orchestration for devcluster environments.
//!
//! This crate ties the schema and runtime layers together into the `Environment`,
//! the lifecycle API for creating or reusing a kind cluster, running one-time
//! `ClusterInitializer`s against it, loading image archives, passing arbitrary
//! commands to kind, and destroying it. It also provides lifecycle transition
//! validation, the default `Cluster` handle and factory, work directory locking,
//! and Ctrl-C handling.

pub mod cluster;
pub mod concurrency;
pub mod config;
pub mod environment;
pub mod initializer;
pub mod lifecycle;

pub use cluster::{new_cluster, Cluster, ClusterOption, KubeconfigSource, NewClusterFn};
pub use concurrency::{install_signal_handler, WorkDirLock};
pub use config::EnvironmentConfig;
pub use environment::{Environment, InitOutcome, KIND_CONFIG_FILE, KUBECONFIG_FILE};
pub use initializer::{initializer_fn, ClusterInitializer, CommandInitializer, FnInitializer};
pub use lifecycle::{validate_transition, EnvState};

use devcluster_runtime::RuntimeError;
use std::path::PathBuf;
use thiserror::Error;

/// Error type produced by cluster factories and initializers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("detecting container runtime: {0}")]
    DetectRuntime(#[source] RuntimeError),
    #[error("creating workdir '{}': {source}", .path.display())]
    CreateWorkDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("creating kind cluster config '{}': {source}", .path.display())]
    WriteConfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("getting existing kind clusters: {0}")]
    ListClusters(#[source] RuntimeError),
    #[error("creating kind cluster: {0}")]
    CreateCluster(#[source] RuntimeError),
    #[error("creating cluster clients: {0}")]
    NewCluster(#[source] BoxError),
    #[error("running cluster initializer '{name}': {source}")]
    Initializer {
        name: String,
        #[source]
        source: BoxError,
    },
    #[error("deleting kind cluster: {0}")]
    DeleteCluster(#[source] RuntimeError),
    #[error("loading image archive '{}': {source}", .path.display())]
    LoadImage {
        path: PathBuf,
        #[source]
        source: RuntimeError,
    },
    #[error("kind: {0}")]
    Kind(#[source] RuntimeError),
    #[error("invalid state transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },
    #[error("work directory lock: {0}")]
    Lock(#[source] std::io::Error),
}

impl CoreError {
    /// True when the step failed because its context was cancelled or expired.
    pub fn is_cancellation(&self) -> bool {
        match self {
            Self::DetectRuntime(e)
            | Self::ListClusters(e)
            | Self::CreateCluster(e)
            | Self::DeleteCluster(e)
            | Self::Kind(e)
            | Self::LoadImage { source: e, .. } => e.is_cancellation(),
            Self::Initializer { source, .. } => source
                .downcast_ref::<RuntimeError>()
                .is_some_and(RuntimeError::is_cancellation),
            _ => false,
        }
    }
}
