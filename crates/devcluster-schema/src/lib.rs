//! Manifest parsing, container runtime selection, and kind topology documents for devcluster.
//!
//! This crate defines the schema layer: the `devcluster.toml` environment manifest
//! (`EnvironmentManifest`), the runtime selection sum type (`ContainerRuntime`, resolved
//! into `ResolvedRuntime`), the validated `ClusterName`, and the kind cluster config
//! document written before cluster creation (`TopologyConfig`).

pub mod manifest;
pub mod topology;
pub mod types;

pub use manifest::{
    parse_manifest_file, parse_manifest_str, EnvironmentManifest, InitializerSection,
    ManifestError, DEFAULT_MANIFEST_FILE, DEFAULT_WORK_DIR,
};
pub use topology::{write_topology, TopologyConfig, DM_DEVICE_PATH, TOPOLOGY_HEADER};
pub use types::{ClusterName, ContainerRuntime, ParseRuntimeError, ResolvedRuntime};
