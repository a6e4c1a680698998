//! Core types for Skein.
//!
//! This crate provides the building blocks shared by the cluster map, the wire
//! layer and the operator CLI:
//! - Configuration management
//! - Error types

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;

pub use config::{
    ClusterMapConfig, Config, HealthPolicyConfig, LogFormat, LoggingConfig, WireConfig,
    FIXED_HEADER_BYTES,
};
pub use error::{Error, Result};
