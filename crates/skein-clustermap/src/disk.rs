//! Disks mounted on data nodes.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::info;

use crate::descriptor::DiskDescriptor;
use crate::error::{ClusterMapError, Result};
use crate::health::{HardwareState, HealthSettings, HealthTracker};
use crate::node::NodeId;

/// Largest raw capacity a single disk may declare (10 TiB).
pub const MAX_DISK_CAPACITY_BYTES: u64 = 10 * 1024 * 1024 * 1024 * 1024;

/// How strictly a disk checks its link to an owning node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Validation {
    /// Every check applies, including the owning node.
    #[default]
    Strict,
    /// The owning node may be absent. Path and capacity checks still apply.
    /// Used to build standalone disks in tests and tooling.
    Detached,
}

/// A disk in the cluster map.
///
/// A `Disk` only exists in a validated state. Apart from its hard-state flag
/// and its health tracker it is immutable after construction.
pub struct Disk {
    node: Option<NodeId>,
    mount_path: String,
    raw_capacity_bytes: u64,
    hard_down: AtomicBool,
    health: HealthTracker,
}

impl Disk {
    /// Builds a disk from its descriptor.
    ///
    /// Checks, in order: the mount path is non-empty and absolute, the capacity
    /// is within `(0, MAX_DISK_CAPACITY_BYTES]`, and an owning node is present
    /// unless `validation` is [`Validation::Detached`].
    ///
    /// # Errors
    ///
    /// Returns [`ClusterMapError::Validation`] describing the first failed check.
    pub fn new(
        node: Option<NodeId>,
        descriptor: &DiskDescriptor,
        settings: &HealthSettings,
        validation: Validation,
    ) -> Result<Self> {
        let mount_path = &descriptor.mount_path;
        let resource = match &node {
            Some(node) => format!("disk {node}{mount_path}"),
            None => format!("disk {mount_path:?}"),
        };

        if mount_path.is_empty() {
            return Err(ClusterMapError::validation(resource, "mount path is empty"));
        }
        if !mount_path.starts_with('/') {
            return Err(ClusterMapError::validation(resource, "mount path is not absolute"));
        }

        let raw_capacity_bytes = u64::try_from(descriptor.capacity_bytes).unwrap_or(0);
        if raw_capacity_bytes == 0 {
            return Err(ClusterMapError::validation(
                resource,
                format!("capacity {} must be positive", descriptor.capacity_bytes),
            ));
        }
        if raw_capacity_bytes > MAX_DISK_CAPACITY_BYTES {
            return Err(ClusterMapError::validation(
                resource,
                format!(
                    "capacity {raw_capacity_bytes} exceeds maximum {MAX_DISK_CAPACITY_BYTES}"
                ),
            ));
        }

        if node.is_none() && validation == Validation::Strict {
            return Err(ClusterMapError::validation(resource, "owning data node is missing"));
        }

        let health = settings.disk_tracker(resource);
        Ok(Self {
            node,
            mount_path: mount_path.clone(),
            raw_capacity_bytes,
            hard_down: AtomicBool::new(descriptor.hard_state == HardwareState::Unavailable),
            health,
        })
    }

    /// Builds a disk with no owning node.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterMapError::Validation`] if the path or capacity is invalid.
    pub fn detached(descriptor: &DiskDescriptor, settings: &HealthSettings) -> Result<Self> {
        Self::new(None, descriptor, settings, Validation::Detached)
    }

    /// The owning node, if any.
    #[must_use]
    pub fn node(&self) -> Option<&NodeId> {
        self.node.as_ref()
    }

    /// Absolute mount path.
    #[must_use]
    pub fn mount_path(&self) -> &str {
        &self.mount_path
    }

    /// Raw capacity in bytes.
    #[must_use]
    pub fn raw_capacity_bytes(&self) -> u64 {
        self.raw_capacity_bytes
    }

    /// Administrator-set state.
    #[must_use]
    pub fn hard_state(&self) -> HardwareState {
        if self.is_hard_down() {
            HardwareState::Unavailable
        } else {
            HardwareState::Available
        }
    }

    /// Returns true if an administrator marked the disk down.
    #[must_use]
    pub fn is_hard_down(&self) -> bool {
        self.hard_down.load(Ordering::Acquire)
    }

    /// Changes the administrator-set state.
    ///
    /// Bringing a disk back up does not clear errors it has accumulated.
    pub fn set_hard_state(&self, state: HardwareState) {
        let down = state == HardwareState::Unavailable;
        if self.hard_down.swap(down, Ordering::AcqRel) != down {
            info!(mount_path = %self.mount_path, state = %state, "Disk hard state changed");
        }
    }

    /// Current availability, combining the hard state with recent errors.
    #[must_use]
    pub fn state(&self) -> HardwareState {
        self.health.state(self.is_hard_down())
    }

    /// Reports an I/O failure on this disk.
    pub fn on_error(&self) {
        self.health.report_error();
    }

    /// The disk's health tracker.
    #[must_use]
    pub fn health(&self) -> &HealthTracker {
        &self.health
    }

    /// External representation. Building a disk from it yields an equal disk.
    #[must_use]
    pub fn descriptor(&self) -> DiskDescriptor {
        DiskDescriptor {
            mount_path: self.mount_path.clone(),
            hard_state: self.hard_state(),
            capacity_bytes: i64::try_from(self.raw_capacity_bytes).unwrap_or(i64::MAX),
        }
    }
}

/// Identity covers the mount path, capacity and hard state. Soft state is
/// operational and excluded.
impl PartialEq for Disk {
    fn eq(&self, other: &Self) -> bool {
        self.mount_path == other.mount_path
            && self.raw_capacity_bytes == other.raw_capacity_bytes
            && self.hard_state() == other.hard_state()
    }
}

impl Eq for Disk {}

impl fmt::Debug for Disk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Disk")
            .field("node", &self.node)
            .field("mount_path", &self.mount_path)
            .field("raw_capacity_bytes", &self.raw_capacity_bytes)
            .field("hard_state", &self.hard_state())
            .field("state", &self.state())
            .finish()
    }
}
