//! Error types for the cluster map.

use thiserror::Error;

/// A specialized `Result` type for cluster map operations.
pub type Result<T> = std::result::Result<T, ClusterMapError>;

/// Errors that can occur while building or querying a cluster map.
#[derive(Debug, Error)]
pub enum ClusterMapError {
    /// A resource descriptor failed validation.
    #[error("invalid {resource}: {reason}")]
    Validation {
        /// The resource being built (disk mount path, node id, ...).
        resource: String,
        /// What was wrong with it.
        reason: String,
    },

    /// Two resources share an identity.
    #[error("duplicate {0}")]
    Duplicate(String),

    /// The named resource is not part of the installed map.
    #[error("{0} not found")]
    NotFound(String),

    /// The topology descriptor is not valid JSON for the expected schema.
    #[error("failed to parse topology: {0}")]
    Parse(#[from] serde_json::Error),

    /// I/O error while reading a topology file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClusterMapError {
    /// Creates a validation error.
    #[must_use]
    pub fn validation(resource: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation { resource: resource.into(), reason: reason.into() }
    }

    /// Returns true if the error was raised by descriptor validation.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. } | Self::Duplicate(_))
    }
}
