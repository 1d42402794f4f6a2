// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Rolling File Log Sink
//!
//! Durable, asynchronous log output to local files.
//!
//! # Features
//!
//! - **Background writes**: bounded queue with one drain thread per target
//! - **Rotation**: by size and/or time interval, with crash-safe resume
//! - **Retention**: only the newest `max_generations` files are kept
//! - **Composite logging**: one call fans out to several filtered targets
//! - **Formats**: simple text and JSON, or custom formatters
//!
//! # Example
//!
//! ```rust,ignore
//! use filesink::{CompositeFileLoggerProvider, LogLevel, LogRecord, Logger, SinkConfig};
//!
//! let config = SinkConfig::load("filesink.json")?;
//! let provider = CompositeFileLoggerProvider::from_config(&config)?;
//!
//! let logger = provider.create_logger("App.Service");
//! if logger.is_enabled(LogLevel::Information) {
//!     logger.log(&LogRecord::new(LogLevel::Information, "App.Service", "Started"));
//! }
//!
//! provider.shutdown();
//! ```

mod composite;
mod counting;
mod error;
mod formatter;
mod level;
mod logger;
mod options;
mod processor;
mod provider;
mod record;
mod rolling;
mod rules;
mod scope;
mod writer;

pub use composite::{CompositeLogger, SubLoggerBinding};
pub use counting::CountingWriter;
pub use error::{Result, SinkError};
pub use formatter::{
    Formatter, FormatterOptions, FormatterRegistry, JsonFormatter, JsonFormatterOptions,
    OptionsBySubTarget, SimpleFormatter, SimpleFormatterOptions, JSON, SIMPLE,
};
pub use level::LogLevel;
pub use logger::{FileLogger, FileLoggerProvider, Logger};
pub use options::{
    expand_env_vars, FileTargetOptions, FilterConfig, RuleConfig, SinkConfig, TargetConfig,
};
pub use processor::{LogProcessor, QueueSettings, DEFAULT_QUEUE_CAPACITY, DEFAULT_SHUTDOWN_TIMEOUT};
pub use provider::CompositeFileLoggerProvider;
pub use record::{EventId, LogRecord};
pub use rolling::{RollingInterval, RollingNamePolicy};
pub use rules::{FilterFn, FilterOptions, FilterRule, RuleSelector, Selection};
pub use scope::{NoScopes, ScopeGuard, ScopeLookup, ScopeStack};
pub use writer::{FileWriter, WriterLimits};
