// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Error types for the bundler core

use std::path::PathBuf;
use thiserror::Error;

/// Result type for bundler operations
pub type Result<T> = std::result::Result<T, BundlerError>;

/// Errors that can occur while building a module graph
#[derive(Debug, Error)]
pub enum BundlerError {
    /// File system error
    #[error("File system error: {0}")]
    Io(#[from] std::io::Error),

    /// A file could not be read from the session's file system
    #[error("Cannot read file '{0}'")]
    FileNotFound(PathBuf),

    /// JSON parsing error (config files, package.json)
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Invalid option set
    #[error("Configuration error: {0}")]
    Config(String),

    /// A per-file override pattern could not be interpreted
    #[error("Invalid module override pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The offending pattern
        pattern: String,
        /// Reason for failure
        reason: String,
    },

    /// Generic error with message
    #[error("{0}")]
    Generic(String),
}

impl BundlerError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

impl From<String> for BundlerError {
    fn from(s: String) -> Self {
        BundlerError::Generic(s)
    }
}

impl From<&str> for BundlerError {
    fn from(s: &str) -> Self {
        BundlerError::Generic(s.to_string())
    }
}
