// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Loggers for a single file target.
//!
//! A [`FileLoggerProvider`] owns one [`LogProcessor`] and hands out one
//! [`FileLogger`] per category. Loggers render on the calling thread and
//! only the finished text crosses the queue.

use crate::formatter::{Formatter, FormatterRegistry};
use crate::options::FileTargetOptions;
use crate::processor::LogProcessor;
use crate::scope::ScopeLookup;
use crate::{LogLevel, LogRecord};
use arc_swap::ArcSwap;
use dashmap::DashMap;
use std::cell::RefCell;
use std::sync::Arc;

/// Buffers above this size are released after use.
const MAX_RETAINED_BUFFER: usize = 64 * 1024;

thread_local! {
    static RENDER_BUFFER: RefCell<String> = RefCell::new(String::with_capacity(1024));
}

/// Sink for records of one category.
pub trait Logger: Send + Sync {
    fn category(&self) -> &str;

    /// Cheap pre-check before building a record.
    fn is_enabled(&self, level: LogLevel) -> bool;

    /// Write `record`. Never fails; problems are traced.
    fn log(&self, record: &LogRecord);
}

/// Formatter selection, swapped as a whole on reload.
struct FormatState {
    formatter: Arc<dyn Formatter>,
    include_scopes: bool,
}

struct ProviderShared {
    name: Option<String>,
    processor: LogProcessor,
    format: ArcSwap<FormatState>,
    scopes: Arc<dyn ScopeLookup>,
}

/// Logger writing one category to a file target.
pub struct FileLogger {
    category: String,
    shared: Arc<ProviderShared>,
}

impl FileLogger {
    fn render(&self, record: &LogRecord, out: &mut String) {
        let format = self.shared.format.load();
        format.formatter.write(
            record,
            self.shared.scopes.as_ref(),
            out,
            self.shared.name.as_deref(),
            Some(format.include_scopes),
        );
    }
}

impl Logger for FileLogger {
    fn category(&self) -> &str {
        &self.category
    }

    fn is_enabled(&self, level: LogLevel) -> bool {
        level != LogLevel::None
    }

    fn log(&self, record: &LogRecord) {
        if !self.is_enabled(record.level) {
            return;
        }

        let message = RENDER_BUFFER.with(|buffer| match buffer.try_borrow_mut() {
            Ok(mut buffer) => {
                buffer.clear();
                self.render(record, &mut buffer);
                let message = buffer.clone();
                if buffer.capacity() > MAX_RETAINED_BUFFER {
                    *buffer = String::with_capacity(1024);
                }
                message
            }
            // Re-entered from inside a formatter.
            Err(_) => {
                let mut buffer = String::new();
                self.render(record, &mut buffer);
                buffer
            }
        });

        if !message.is_empty() {
            self.shared.processor.enqueue(message);
        }
    }
}

/// Provider for one named (or unnamed) file target.
pub struct FileLoggerProvider {
    shared: Arc<ProviderShared>,
    registry: FormatterRegistry,
    loggers: DashMap<String, Arc<FileLogger>>,
}

impl FileLoggerProvider {
    /// Start the target's processor.
    ///
    /// `name` identifies the sub-target for per-target formatter options and
    /// filter rules.
    pub fn new(
        name: Option<&str>,
        options: &FileTargetOptions,
        registry: &FormatterRegistry,
        scopes: Arc<dyn ScopeLookup>,
    ) -> crate::Result<Self> {
        let formatter = registry.resolve(&options.formatter_name)?;
        let processor = LogProcessor::new(name.unwrap_or("default"), options)?;

        Ok(Self {
            shared: Arc::new(ProviderShared {
                name: name.map(str::to_string),
                processor,
                format: ArcSwap::from_pointee(FormatState {
                    formatter,
                    include_scopes: options.include_scopes,
                }),
                scopes,
            }),
            registry: registry.clone(),
            loggers: DashMap::new(),
        })
    }

    pub fn name(&self) -> Option<&str> {
        self.shared.name.as_deref()
    }

    /// Logger for `category`, created on first use.
    pub fn create_logger(&self, category: &str) -> Arc<FileLogger> {
        if let Some(logger) = self.loggers.get(category) {
            return Arc::clone(logger.value());
        }

        let logger = self
            .loggers
            .entry(category.to_string())
            .or_insert_with(|| {
                Arc::new(FileLogger {
                    category: category.to_string(),
                    shared: Arc::clone(&self.shared),
                })
            });
        Arc::clone(logger.value())
    }

    /// Apply new options to the target and to every logger created so far.
    ///
    /// An unknown formatter name leaves everything unchanged.
    pub fn reload(&self, options: &FileTargetOptions) -> crate::Result<()> {
        let formatter = self.registry.resolve(&options.formatter_name)?;

        self.shared.processor.reconfigure(options);
        self.shared.format.store(Arc::new(FormatState {
            formatter,
            include_scopes: options.include_scopes,
        }));

        tracing::debug!(
            target_name = self.name().unwrap_or("default"),
            formatter = %options.formatter_name,
            "Reloaded file logger provider"
        );
        Ok(())
    }

    pub fn processor(&self) -> &LogProcessor {
        &self.shared.processor
    }

    /// Drain and close the target. Loggers keep working through the
    /// synchronous fallback of a sealed queue.
    pub fn shutdown(&self) {
        self.shared.processor.shutdown();
    }
}
