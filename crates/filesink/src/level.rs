// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Log severity levels.

use serde::{Deserialize, Serialize};

/// Log severity, ordered from most to least verbose.
///
/// `None` is a sentinel used in filter configuration to switch a
/// destination off; records are never logged at `None`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[repr(u8)]
pub enum LogLevel {
    /// Most detailed messages, may contain sensitive data.
    Trace = 0,
    /// Debug messages for development.
    Debug = 1,
    /// Informational messages.
    #[default]
    Information = 2,
    /// Abnormal or unexpected events.
    Warning = 3,
    /// Failures of the current operation.
    Error = 4,
    /// Unrecoverable failures.
    Critical = 5,
    /// Disables logging.
    None = 6,
}

impl LogLevel {
    /// Get level name as string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "Trace",
            Self::Debug => "Debug",
            Self::Information => "Information",
            Self::Warning => "Warning",
            Self::Error => "Error",
            Self::Critical => "Critical",
            Self::None => "None",
        }
    }

    /// Four letter tag used by the simple formatter.
    pub fn short_str(&self) -> &'static str {
        match self {
            Self::Trace => "trce",
            Self::Debug => "dbug",
            Self::Information => "info",
            Self::Warning => "warn",
            Self::Error => "fail",
            Self::Critical => "crit",
            Self::None => "none",
        }
    }

    /// Parse level from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "TRACE" | "TRCE" => Some(Self::Trace),
            "DEBUG" | "DBUG" => Some(Self::Debug),
            "INFORMATION" | "INFO" => Some(Self::Information),
            "WARNING" | "WARN" => Some(Self::Warning),
            "ERROR" | "ERR" | "FAIL" => Some(Self::Error),
            "CRITICAL" | "CRIT" | "FATAL" => Some(Self::Critical),
            "NONE" | "OFF" => Some(Self::None),
            _ => None,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
