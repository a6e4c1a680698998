//! Configuration management for Skein.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Bytes taken by the fixed part of a wire header
/// (size + type + version + correlation id + client-id length).
pub const FIXED_HEADER_BYTES: u64 = 8 + 2 + 2 + 4 + 4;

/// Main configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Cluster map health policies.
    pub cluster_map: ClusterMapConfig,
    /// Wire framing configuration.
    pub wire: WireConfig,
    /// Logging configuration.
    pub logging: LoggingConfig,
}

impl Config {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or fails validation.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Loads configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string cannot be parsed or fails validation.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that every value is usable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        self.cluster_map.disk.validate("cluster_map.disk")?;
        self.cluster_map.node.validate("cluster_map.node")?;
        self.wire.validate()
    }
}

/// Health policies for the resources tracked by the cluster map.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClusterMapConfig {
    /// Policy applied to every disk.
    pub disk: HealthPolicyConfig,
    /// Policy applied to every data node.
    pub node: HealthPolicyConfig,
}

impl Default for ClusterMapConfig {
    fn default() -> Self {
        Self { disk: HealthPolicyConfig::disk(), node: HealthPolicyConfig::node() }
    }
}

/// Soft-state parameters for one kind of resource.
///
/// A section must set all three fields; disks and nodes have different
/// defaults so a partial section has no meaningful fallback.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthPolicyConfig {
    /// Span in milliseconds within which errors are counted together.
    pub window_ms: u64,
    /// Number of errors tolerated within a window. One more trips the resource.
    pub error_threshold: u32,
    /// Quiet time in milliseconds after the last error before a tripped
    /// resource is usable again.
    pub retry_backoff_ms: u64,
}

impl HealthPolicyConfig {
    /// Defaults for disks: trip on the second error within 2s, retry after 10s.
    #[must_use]
    pub const fn disk() -> Self {
        Self { window_ms: 2_000, error_threshold: 1, retry_backoff_ms: 10_000 }
    }

    /// Defaults for data nodes: trip on the seventh error within 5s, retry after 5m.
    #[must_use]
    pub const fn node() -> Self {
        Self { window_ms: 5_000, error_threshold: 6, retry_backoff_ms: 5 * 60 * 1_000 }
    }

    /// Window as a [`Duration`].
    #[must_use]
    pub const fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    /// Retry backoff as a [`Duration`].
    #[must_use]
    pub const fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    fn validate(&self, section: &str) -> Result<()> {
        if self.window_ms == 0 {
            return Err(Error::config(format!("{section}.window_ms must be positive")));
        }
        if self.retry_backoff_ms == 0 {
            return Err(Error::config(format!("{section}.retry_backoff_ms must be positive")));
        }
        Ok(())
    }
}

/// Wire framing configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WireConfig {
    /// Client id stamped on outgoing envelopes.
    pub client_id: String,
    /// Largest frame accepted from a peer, in bytes.
    /// Default: 64 MiB.
    pub max_frame_bytes: u64,
}

impl Default for WireConfig {
    fn default() -> Self {
        Self { client_id: "skein".to_string(), max_frame_bytes: 64 * 1024 * 1024 }
    }
}

impl WireConfig {
    fn validate(&self) -> Result<()> {
        if self.max_frame_bytes < FIXED_HEADER_BYTES {
            return Err(Error::config(format!(
                "wire.max_frame_bytes must be at least {FIXED_HEADER_BYTES}"
            )));
        }
        let client_id_bytes = self.client_id.len() as u64;
        if FIXED_HEADER_BYTES + client_id_bytes > self.max_frame_bytes {
            return Err(Error::config("wire.client_id does not fit in wire.max_frame_bytes"));
        }
        Ok(())
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable format.
    #[default]
    Pretty,
    /// JSON format.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    pub level: String,
    /// Log output format.
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: LogFormat::Pretty }
    }
}
