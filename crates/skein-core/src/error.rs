// Copyright 2025 The Skein Authors
// SPDX-License-Identifier: AGPL-3.0-only

//! Error types shared by the Skein crates.

use thiserror::Error;

/// A specialized `Result` type for Skein configuration operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading or validating configuration.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration value is out of range or inconsistent.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file is not valid TOML for the expected schema.
    #[error("failed to parse configuration: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    /// Creates a new configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Returns true if the error was caused by an invalid configuration value.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Toml(_))
    }
}
