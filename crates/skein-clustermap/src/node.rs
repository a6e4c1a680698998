//! Data nodes and the disks they own.

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::descriptor::NodeDescriptor;
use crate::disk::{Disk, Validation};
use crate::error::{ClusterMapError, Result};
use crate::health::{HardwareState, HealthSettings, HealthTracker};

/// Network identity of a data node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId {
    hostname: String,
    port: u16,
}

impl NodeId {
    /// Creates a node id.
    #[must_use]
    pub fn new(hostname: impl Into<String>, port: u16) -> Self {
        Self { hostname: hostname.into(), port }
    }

    /// Host name.
    #[must_use]
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Port.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.hostname, self.port)
    }
}

/// A storage server in the cluster map.
pub struct DataNode {
    id: NodeId,
    datacenter: String,
    hard_down: AtomicBool,
    disks: Vec<Disk>,
    health: HealthTracker,
}

impl DataNode {
    /// Builds a node and all of its disks from a descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterMapError::Validation`] if the host name or port is
    /// invalid or any disk fails validation, and [`ClusterMapError::Duplicate`]
    /// if two disks share a mount path.
    pub fn new(descriptor: &NodeDescriptor, settings: &HealthSettings) -> Result<Self> {
        let display = format!("data node {}:{}", descriptor.hostname, descriptor.port);
        if descriptor.hostname.trim().is_empty() {
            return Err(ClusterMapError::validation(display, "hostname is empty"));
        }
        let port = u16::try_from(descriptor.port)
            .ok()
            .filter(|port| *port != 0)
            .ok_or_else(|| {
                ClusterMapError::validation(display, format!("port {} out of range", descriptor.port))
            })?;
        let id = NodeId::new(descriptor.hostname.clone(), port);

        let mut mount_paths = HashSet::with_capacity(descriptor.disks.len());
        let mut disks = Vec::with_capacity(descriptor.disks.len());
        for disk in &descriptor.disks {
            if !mount_paths.insert(disk.mount_path.as_str()) {
                return Err(ClusterMapError::Duplicate(format!(
                    "disk {id}{} on data node",
                    disk.mount_path
                )));
            }
            disks.push(Disk::new(Some(id.clone()), disk, settings, Validation::Strict)?);
        }

        let health = settings.node_tracker(id.to_string());
        Ok(Self {
            id,
            datacenter: descriptor.datacenter.clone(),
            hard_down: AtomicBool::new(descriptor.hard_state == HardwareState::Unavailable),
            disks,
            health,
        })
    }

    /// Network identity.
    #[must_use]
    pub fn id(&self) -> &NodeId {
        &self.id
    }

    /// Datacenter name.
    #[must_use]
    pub fn datacenter(&self) -> &str {
        &self.datacenter
    }

    /// Disks in descriptor order.
    #[must_use]
    pub fn disks(&self) -> &[Disk] {
        &self.disks
    }

    /// Looks up a disk by mount path.
    #[must_use]
    pub fn disk(&self, mount_path: &str) -> Option<&Disk> {
        self.disks.iter().find(|disk| disk.mount_path() == mount_path)
    }

    /// Sum of the raw capacity of all disks.
    #[must_use]
    pub fn raw_capacity_bytes(&self) -> u64 {
        self.disks.iter().map(Disk::raw_capacity_bytes).sum()
    }

    /// Administrator-set state.
    #[must_use]
    pub fn hard_state(&self) -> HardwareState {
        if self.hard_down.load(Ordering::Acquire) {
            HardwareState::Unavailable
        } else {
            HardwareState::Available
        }
    }

    /// Changes the administrator-set state of the node itself.
    pub fn set_hard_state(&self, state: HardwareState) {
        let down = state == HardwareState::Unavailable;
        if self.hard_down.swap(down, Ordering::AcqRel) != down {
            info!(node = %self.id, state = %state, "Data node hard state changed");
        }
    }

    /// Current availability of the node.
    #[must_use]
    pub fn state(&self) -> HardwareState {
        self.health.state(self.hard_down.load(Ordering::Acquire))
    }

    /// Availability of one disk as seen by routing: a disk on an unavailable
    /// node is unavailable. `None` if the node has no such disk.
    #[must_use]
    pub fn disk_state(&self, mount_path: &str) -> Option<HardwareState> {
        let disk = self.disk(mount_path)?;
        if self.state() == HardwareState::Unavailable {
            Some(HardwareState::Unavailable)
        } else {
            Some(disk.state())
        }
    }

    /// Reports a failure talking to the node.
    pub fn on_error(&self) {
        self.health.report_error();
    }

    /// Reports an I/O failure on one of the node's disks.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterMapError::NotFound`] if the node has no such disk.
    pub fn on_disk_error(&self, mount_path: &str) -> Result<()> {
        let disk = self
            .disk(mount_path)
            .ok_or_else(|| ClusterMapError::NotFound(format!("disk {}{mount_path}", self.id)))?;
        disk.on_error();
        Ok(())
    }

    /// The node's health tracker.
    #[must_use]
    pub fn health(&self) -> &HealthTracker {
        &self.health
    }

    /// External representation.
    #[must_use]
    pub fn descriptor(&self) -> NodeDescriptor {
        NodeDescriptor {
            hostname: self.id.hostname.clone(),
            port: u32::from(self.id.port),
            datacenter: self.datacenter.clone(),
            hard_state: self.hard_state(),
            disks: self.disks.iter().map(Disk::descriptor).collect(),
        }
    }
}

impl PartialEq for DataNode {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.datacenter == other.datacenter
            && self.hard_state() == other.hard_state()
            && self.disks == other.disks
    }
}

impl Eq for DataNode {}

impl fmt::Debug for DataNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataNode")
            .field("id", &self.id)
            .field("datacenter", &self.datacenter)
            .field("hard_state", &self.hard_state())
            .field("state", &self.state())
            .field("disks", &self.disks)
            .finish()
    }
}
