//! Cluster map composition and the store routing logic reads from.
//!
//! A [`ClusterMap`] is built from a [`TopologyDescriptor`] in one step: every
//! node and disk is validated, and any failure rejects the whole map. The
//! [`TopologyStore`] holds the installed map and swaps it atomically on
//! reload, so readers always see either the old map or the new one.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use skein_core::ClusterMapConfig;
use tracing::{debug, info, warn};

use crate::descriptor::TopologyDescriptor;
use crate::disk::Disk;
use crate::error::{ClusterMapError, Result};
use crate::health::{HardwareState, HealthSettings};
use crate::node::{DataNode, NodeId};

/// Receives I/O failures from the storage access path.
///
/// Failures never propagate back to the caller; a report against a resource
/// that is not in the map is logged and dropped.
pub trait IoErrorSink: Send + Sync {
    /// An operation against a disk failed.
    fn disk_error(&self, node: &NodeId, mount_path: &str);

    /// An operation against a data node failed.
    fn node_error(&self, node: &NodeId);
}

/// A validated set of data nodes.
#[derive(Debug, Default)]
pub struct ClusterMap {
    nodes: BTreeMap<NodeId, DataNode>,
}

impl ClusterMap {
    /// An empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a map from a descriptor.
    ///
    /// # Errors
    ///
    /// Returns the first validation failure of any node or disk, or
    /// [`ClusterMapError::Duplicate`] if two nodes share an id.
    pub fn from_descriptor(
        descriptor: &TopologyDescriptor,
        settings: &HealthSettings,
    ) -> Result<Self> {
        let mut nodes = BTreeMap::new();
        for node in &descriptor.datanodes {
            let node = DataNode::new(node, settings)?;
            let id = node.id().clone();
            if nodes.contains_key(&id) {
                return Err(ClusterMapError::Duplicate(format!("data node {id}")));
            }
            nodes.insert(id, node);
        }
        Ok(Self { nodes })
    }

    /// Looks up a node.
    #[must_use]
    pub fn node(&self, id: &NodeId) -> Option<&DataNode> {
        self.nodes.get(id)
    }

    /// All nodes ordered by id.
    pub fn nodes(&self) -> impl Iterator<Item = &DataNode> {
        self.nodes.values()
    }

    /// Number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of disks across all nodes.
    #[must_use]
    pub fn disk_count(&self) -> usize {
        self.nodes.values().map(|node| node.disks().len()).sum()
    }

    /// Raw capacity across all nodes.
    #[must_use]
    pub fn raw_capacity_bytes(&self) -> u64 {
        self.nodes.values().map(DataNode::raw_capacity_bytes).sum()
    }

    /// Current state of a node, `None` if unknown.
    #[must_use]
    pub fn node_state(&self, id: &NodeId) -> Option<HardwareState> {
        self.node(id).map(DataNode::state)
    }

    /// Current state of a disk as seen by routing, `None` if unknown.
    #[must_use]
    pub fn disk_state(&self, id: &NodeId, mount_path: &str) -> Option<HardwareState> {
        self.node(id)?.disk_state(mount_path)
    }

    /// Every disk routing may currently use.
    #[must_use]
    pub fn available_disks(&self) -> Vec<&Disk> {
        self.nodes
            .values()
            .filter(|node| node.state().is_available())
            .flat_map(DataNode::disks)
            .filter(|disk| disk.state().is_available())
            .collect()
    }

    /// Forwards a disk failure to the disk's tracker.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterMapError::NotFound`] if the node or disk is unknown.
    pub fn on_disk_error(&self, id: &NodeId, mount_path: &str) -> Result<()> {
        self.node(id)
            .ok_or_else(|| ClusterMapError::NotFound(format!("data node {id}")))?
            .on_disk_error(mount_path)
    }

    /// Forwards a node failure to the node's tracker.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterMapError::NotFound`] if the node is unknown.
    pub fn on_node_error(&self, id: &NodeId) -> Result<()> {
        self.node(id).ok_or_else(|| ClusterMapError::NotFound(format!("data node {id}")))?.on_error();
        Ok(())
    }

    /// External representation.
    #[must_use]
    pub fn to_descriptor(&self) -> TopologyDescriptor {
        TopologyDescriptor { datanodes: self.nodes.values().map(DataNode::descriptor).collect() }
    }
}

/// Holds the installed cluster map.
pub struct TopologyStore {
    settings: HealthSettings,
    current: RwLock<Arc<ClusterMap>>,
    generation: AtomicU64,
}

impl TopologyStore {
    /// Creates a store holding an empty map.
    #[must_use]
    pub fn new(settings: HealthSettings) -> Self {
        Self {
            settings,
            current: RwLock::new(Arc::new(ClusterMap::new())),
            generation: AtomicU64::new(0),
        }
    }

    /// Creates a store whose trackers follow `config`.
    #[must_use]
    pub fn from_config(config: &ClusterMapConfig) -> Self {
        Self::new(HealthSettings::from_config(config))
    }

    /// Builds a map from `descriptor` and installs it.
    ///
    /// On error nothing is installed and the previous map stays in place.
    ///
    /// # Errors
    ///
    /// Returns the validation failure that rejected the descriptor.
    pub fn load(&self, descriptor: &TopologyDescriptor) -> Result<Arc<ClusterMap>> {
        let map = match ClusterMap::from_descriptor(descriptor, &self.settings) {
            Ok(map) => Arc::new(map),
            Err(e) => {
                warn!(error = %e, "Rejected cluster map");
                return Err(e);
            }
        };

        let generation = {
            let mut current = self.current.write();
            *current = Arc::clone(&map);
            self.generation.fetch_add(1, Ordering::AcqRel) + 1
        };
        info!(
            generation,
            nodes = map.node_count(),
            disks = map.disk_count(),
            raw_capacity_bytes = map.raw_capacity_bytes(),
            "Installed cluster map"
        );
        Ok(map)
    }

    /// Parses a JSON descriptor and installs it.
    ///
    /// # Errors
    ///
    /// Returns a parse or validation error; nothing is installed on error.
    pub fn load_json(&self, json: &str) -> Result<Arc<ClusterMap>> {
        self.load(&TopologyDescriptor::from_json(json)?)
    }

    /// Reads a JSON descriptor file and installs it.
    ///
    /// # Errors
    ///
    /// Returns an I/O, parse or validation error; nothing is installed on error.
    pub fn load_file(&self, path: &Path) -> Result<Arc<ClusterMap>> {
        debug!(path = %path.display(), "Loading cluster map");
        self.load(&TopologyDescriptor::from_file(path)?)
    }

    /// The installed map.
    #[must_use]
    pub fn snapshot(&self) -> Arc<ClusterMap> {
        Arc::clone(&self.current.read())
    }

    /// Number of maps installed so far.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// The installed map together with the generation that installed it.
    #[must_use]
    pub fn versioned_snapshot(&self) -> (u64, Arc<ClusterMap>) {
        let current = self.current.read();
        (self.generation.load(Ordering::Acquire), Arc::clone(&current))
    }

    /// Current state of a node in the installed map.
    #[must_use]
    pub fn node_state(&self, id: &NodeId) -> Option<HardwareState> {
        self.snapshot().node_state(id)
    }

    /// Current state of a disk in the installed map.
    #[must_use]
    pub fn disk_state(&self, id: &NodeId, mount_path: &str) -> Option<HardwareState> {
        self.snapshot().disk_state(id, mount_path)
    }

    /// Settings used for newly loaded maps.
    #[must_use]
    pub fn settings(&self) -> &HealthSettings {
        &self.settings
    }
}

impl IoErrorSink for TopologyStore {
    fn disk_error(&self, node: &NodeId, mount_path: &str) {
        if let Err(e) = self.snapshot().on_disk_error(node, mount_path) {
            warn!(error = %e, "Dropped disk error report");
        }
    }

    fn node_error(&self, node: &NodeId) {
        if let Err(e) = self.snapshot().on_node_error(node) {
            warn!(error = %e, "Dropped node error report");
        }
    }
}
