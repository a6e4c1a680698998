//! Cluster map and resource health tracking for Skein distributed storage.
//!
//! This crate provides:
//! - Windowed soft-state health tracking for disks and data nodes
//! - Validated disk and data node descriptors
//! - A topology store that installs whole cluster maps atomically
//!
//! # Architecture
//!
//! 1. Operators describe the cluster in a JSON topology file
//! 2. The [`TopologyStore`] validates it into a [`ClusterMap`]; any invalid
//!    node or disk rejects the whole file
//! 3. The storage I/O path reports failures through [`IoErrorSink`]
//! 4. Each resource's [`HealthTracker`] turns recent failures into a
//!    [`HardwareState`] that routing logic checks before dispatch
//!
//! # Example
//!
//! ```
//! use skein_clustermap::{HardwareState, NodeId, TopologyStore};
//! use skein_core::ClusterMapConfig;
//!
//! let store = TopologyStore::from_config(&ClusterMapConfig::default());
//! store
//!     .load_json(
//!         r#"{"datanodes": [{
//!             "hostname": "storage-1", "port": 6667, "hardState": "AVAILABLE",
//!             "disks": [{"mountPath": "/mnt1", "hardState": "AVAILABLE", "capacityBytes": 1024}]
//!         }]}"#,
//!     )
//!     .unwrap();
//!
//! let node = NodeId::new("storage-1", 6667);
//! assert_eq!(store.disk_state(&node, "/mnt1"), Some(HardwareState::Available));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod descriptor;
pub mod disk;
pub mod error;
pub mod health;
pub mod node;
pub mod topology;

pub use descriptor::{DiskDescriptor, NodeDescriptor, TopologyDescriptor};
pub use disk::{Disk, Validation, MAX_DISK_CAPACITY_BYTES};
pub use error::{ClusterMapError, Result};
pub use health::{
    Clock, HardwareState, HealthPolicy, HealthSettings, HealthTracker, ManualClock,
    MonotonicClock, ResourceKind,
};
pub use node::{DataNode, NodeId};
pub use topology::{ClusterMap, IoErrorSink, TopologyStore};
