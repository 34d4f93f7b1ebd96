//! kind cluster config document.
//!
//! The document is a fixed header plus one optional host workaround: when a
//! device-mapper node exists (BTRFS on LUKS and similar setups), kind's
//! control-plane node cannot stat the backing device unless it is mounted into
//! the node container. See kubernetes-sigs/kind#2411.

use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const TOPOLOGY_HEADER: &str = "kind: Cluster\napiVersion: kind.x-k8s.io/v1alpha4\n";

pub const DM_DEVICE_PATH: &str = "/dev/dm-0";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopologyConfig {
    /// Host device mounted into the control-plane node, if any.
    pub device_mount: Option<PathBuf>,
}

impl TopologyConfig {
    /// Probe the host for the device-mapper node.
    pub fn detect() -> Self {
        Self::probe(Path::new(DM_DEVICE_PATH))
    }

    /// Probe an arbitrary device path. Only existence matters; the node is
    /// not followed if it is a symlink.
    pub fn probe(device: &Path) -> Self {
        let device_mount = match fs::symlink_metadata(device) {
            Ok(_) => {
                debug!("{} present, adding extraMounts workaround", device.display());
                Some(device.to_path_buf())
            }
            Err(_) => None,
        };
        Self { device_mount }
    }

    pub fn render(&self) -> String {
        let mut doc = String::from(TOPOLOGY_HEADER);
        if let Some(device) = &self.device_mount {
            let device = device.display();
            doc.push_str("nodes:\n- role: control-plane\n  extraMounts:\n");
            let _ = writeln!(doc, "    - hostPath: {device}");
            let _ = writeln!(doc, "      containerPath: {device}");
            doc.push_str("      propagation: HostToContainer\n");
        }
        doc
    }

    /// Write the rendered document, creating or truncating `path`.
    pub fn write_to(&self, path: &Path) -> io::Result<()> {
        fs::write(path, self.render())
    }
}

/// Detect host state and write the topology document to `path`.
pub fn write_topology(path: &Path) -> io::Result<TopologyConfig> {
    let config = TopologyConfig::detect();
    config.write_to(path)?;
    Ok(config)
}
