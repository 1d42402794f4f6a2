// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Structured log record handed to formatters.

use crate::LogLevel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Numeric event identifier with an optional name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventId {
    pub id: i32,
    pub name: Option<String>,
}

impl EventId {
    pub fn new(id: i32) -> Self {
        Self { id, name: None }
    }

    pub fn named(id: i32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: Some(name.into()),
        }
    }
}

impl From<i32> for EventId {
    fn from(id: i32) -> Self {
        Self::new(id)
    }
}

/// A single log call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    /// Timestamp when the record was created.
    pub timestamp: DateTime<Utc>,
    /// Log severity level.
    pub level: LogLevel,
    /// Category (logger name), usually a type or module path.
    pub category: String,
    /// Event identifier.
    pub event_id: EventId,
    /// Rendered message text.
    pub message: String,
    /// Rendered error/exception text, if any.
    pub exception: Option<String>,
}

impl Default for LogRecord {
    fn default() -> Self {
        Self {
            timestamp: Utc::now(),
            level: LogLevel::Information,
            category: String::new(),
            event_id: EventId::default(),
            message: String::new(),
            exception: None,
        }
    }
}

impl LogRecord {
    /// Create a new record with message.
    pub fn new(level: LogLevel, category: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            category: category.into(),
            message: message.into(),
            ..Default::default()
        }
    }

    /// Set event id.
    pub fn with_event(mut self, event_id: impl Into<EventId>) -> Self {
        self.event_id = event_id.into();
        self
    }

    /// Attach exception text.
    pub fn with_exception(mut self, exception: impl Into<String>) -> Self {
        self.exception = Some(exception.into());
        self
    }

    /// Override the timestamp.
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// True when there is nothing to render.
    pub fn is_blank(&self) -> bool {
        self.message.is_empty() && self.exception.is_none()
    }
}
