//! External representation of the cluster topology.
//!
//! Descriptors are plain serde types mirroring the JSON layout operators write.
//! They carry no validation; building a [`crate::ClusterMap`] from them does.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::health::HardwareState;

/// One disk as written in a topology file.
///
/// ```json
/// { "mountPath": "/mnt1", "hardState": "AVAILABLE", "capacityBytes": 107374182400 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiskDescriptor {
    /// Absolute mount path on the owning node.
    pub mount_path: String,
    /// Administrator-set state.
    pub hard_state: HardwareState,
    /// Raw capacity. Signed so that negative input reaches validation.
    pub capacity_bytes: i64,
}

impl DiskDescriptor {
    /// Creates a disk descriptor.
    #[must_use]
    pub fn new(mount_path: impl Into<String>, hard_state: HardwareState, capacity_bytes: i64) -> Self {
        Self { mount_path: mount_path.into(), hard_state, capacity_bytes }
    }
}

/// One data node as written in a topology file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDescriptor {
    /// Host name peers use to reach the node.
    pub hostname: String,
    /// Port peers use to reach the node. Wider than `u16` so that
    /// out-of-range input reaches validation.
    pub port: u32,
    /// Datacenter the node lives in.
    #[serde(default)]
    pub datacenter: String,
    /// Administrator-set state.
    pub hard_state: HardwareState,
    /// Disks mounted on the node.
    #[serde(default)]
    pub disks: Vec<DiskDescriptor>,
}

impl NodeDescriptor {
    /// Creates a node descriptor without disks.
    #[must_use]
    pub fn new(hostname: impl Into<String>, port: u32, datacenter: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            port,
            datacenter: datacenter.into(),
            hard_state: HardwareState::Available,
            disks: Vec::new(),
        }
    }

    /// Adds a disk.
    #[must_use]
    pub fn with_disk(mut self, disk: DiskDescriptor) -> Self {
        self.disks.push(disk);
        self
    }

    /// Sets the hard state.
    #[must_use]
    pub fn with_hard_state(mut self, hard_state: HardwareState) -> Self {
        self.hard_state = hard_state;
        self
    }
}

/// A whole topology file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopologyDescriptor {
    /// All data nodes.
    pub datanodes: Vec<NodeDescriptor>,
}

impl TopologyDescriptor {
    /// Parses a topology from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ClusterMapError::Parse`] if the JSON does not match the schema.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a topology file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Renders the topology as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ClusterMapError::Parse`] if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
