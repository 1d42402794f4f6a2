// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error type for configuration and construction APIs.
//!
//! The write path never returns these: failures while logging are absorbed
//! and reported through `tracing`.

use thiserror::Error;

/// Errors surfaced while building or reconfiguring sinks.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Invalid category pattern '{pattern}': more than one wildcard")]
    MultipleWildcards { pattern: String },

    #[error("Unknown formatter: {0}")]
    UnknownFormatter(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),
}

/// Result alias for fallible configuration calls.
pub type Result<T> = std::result::Result<T, SinkError>;
