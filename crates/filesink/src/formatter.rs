// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Record formatters: simple text and JSON.
//!
//! Formatter options are kept per sub-target name so that each destination
//! of a composite sink can render differently. A missing entry falls back to
//! the default one.

use crate::error::{Result, SinkError};
use crate::scope::ScopeLookup;
use crate::LogRecord;
use chrono::Local;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;

/// Name of the built-in text formatter.
pub const SIMPLE: &str = "simple";
/// Name of the built-in JSON formatter.
pub const JSON: &str = "json";

/// Key of the options used when a sub-target has none of its own.
const DEFAULT_OPTIONS_KEY: &str = "";

/// Width of `"info: "`, used to indent continuation lines.
const MESSAGE_PADDING: &str = "      ";

/// Renders a record into text.
pub trait Formatter: Send + Sync {
    /// Name used to select this formatter in options.
    fn name(&self) -> &str;

    /// Append the rendering of `record` to `out`.
    ///
    /// Writing nothing suppresses the record. `fallback_include_scopes` is
    /// used when the formatter options leave `include_scopes` unset.
    fn write(
        &self,
        record: &LogRecord,
        scopes: &dyn ScopeLookup,
        out: &mut String,
        sub_target: Option<&str>,
        fallback_include_scopes: Option<bool>,
    );
}

/// Options shared by the built-in formatters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatterOptions {
    /// Include active scopes; `None` defers to the target setting.
    pub include_scopes: Option<bool>,
    /// chrono format string; `None` omits the timestamp.
    pub timestamp_format: Option<String>,
    pub use_utc_timestamp: bool,
    /// Follow every record with an empty line.
    pub empty_line_between_messages: bool,
}

impl Default for FormatterOptions {
    fn default() -> Self {
        Self {
            include_scopes: None,
            timestamp_format: Some("%Y-%m-%d %-I:%M %p".to_string()),
            use_utc_timestamp: false,
            empty_line_between_messages: true,
        }
    }
}

impl FormatterOptions {
    fn include_scopes(&self, fallback: Option<bool>) -> bool {
        self.include_scopes.or(fallback).unwrap_or(false)
    }

    fn write_timestamp(&self, record: &LogRecord, out: &mut String) -> bool {
        let Some(format) = self.timestamp_format.as_deref() else {
            return false;
        };

        // An invalid format string renders as far as it gets.
        let _ = if self.use_utc_timestamp {
            write!(out, "{}", record.timestamp.format(format))
        } else {
            write!(out, "{}", record.timestamp.with_timezone(&Local).format(format))
        };
        true
    }
}

/// Options for [`SimpleFormatter`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimpleFormatterOptions {
    #[serde(flatten)]
    pub common: FormatterOptions,
    /// Render message, exception and scopes on one line.
    pub single_line: bool,
}

/// Options for [`JsonFormatter`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JsonFormatterOptions {
    #[serde(flatten)]
    pub common: FormatterOptions,
    /// Pretty-print objects.
    pub indented: bool,
}

/// Options per sub-target, replaceable at runtime.
#[derive(Debug)]
pub struct OptionsBySubTarget<T> {
    entries: RwLock<HashMap<String, Arc<T>>>,
}

impl<T: Default> OptionsBySubTarget<T> {
    pub fn new(default: T) -> Self {
        let mut entries = HashMap::new();
        entries.insert(DEFAULT_OPTIONS_KEY.to_string(), Arc::new(default));
        Self {
            entries: RwLock::new(entries),
        }
    }

    /// Options for `sub_target`, or the default entry.
    pub fn get(&self, sub_target: Option<&str>) -> Arc<T> {
        let entries = self.entries.read();
        sub_target
            .and_then(|name| entries.get(name))
            .or_else(|| entries.get(DEFAULT_OPTIONS_KEY))
            .cloned()
            .unwrap_or_default()
    }

    /// Replace options for `sub_target` (`None` is the default entry).
    pub fn set(&self, sub_target: Option<&str>, options: T) {
        let key = sub_target.unwrap_or(DEFAULT_OPTIONS_KEY).to_string();
        self.entries.write().insert(key, Arc::new(options));
    }
}

/// Human-readable formatter.
///
/// ```text
/// 2024-01-15 10:30 AM info: App.Service [7]
///       Request received
///       => request 42
/// ```
#[derive(Debug)]
pub struct SimpleFormatter {
    options: OptionsBySubTarget<SimpleFormatterOptions>,
}

impl Default for SimpleFormatter {
    fn default() -> Self {
        Self::new(SimpleFormatterOptions::default())
    }
}

impl SimpleFormatter {
    pub fn new(options: SimpleFormatterOptions) -> Self {
        Self {
            options: OptionsBySubTarget::new(options),
        }
    }

    /// Replace options for one sub-target, or the default with `None`.
    pub fn set_options(&self, sub_target: Option<&str>, options: SimpleFormatterOptions) {
        self.options.set(sub_target, options);
    }

    fn write_text(out: &mut String, text: &str, single_line: bool) {
        if text.is_empty() {
            return;
        }

        if single_line {
            out.push(' ');
            push_replacing_newlines(out, text, " ");
        } else {
            out.push('\n');
            out.push_str(MESSAGE_PADDING);
            push_replacing_newlines(out, text, "\n      ");
        }
    }
}

impl Formatter for SimpleFormatter {
    fn name(&self) -> &str {
        SIMPLE
    }

    fn write(
        &self,
        record: &LogRecord,
        scopes: &dyn ScopeLookup,
        out: &mut String,
        sub_target: Option<&str>,
        fallback_include_scopes: Option<bool>,
    ) {
        if record.is_blank() {
            return;
        }

        let options = self.options.get(sub_target);
        let single_line = options.single_line;

        if options.common.write_timestamp(record, out) {
            out.push(' ');
        }
        let _ = write!(
            out,
            "{}: {} [{}]",
            record.level.short_str(),
            record.category,
            record.event_id.id
        );

        Self::write_text(out, &record.message, single_line);
        if let Some(exception) = record.exception.as_deref() {
            Self::write_text(out, exception, single_line);
        }

        if options.common.include_scopes(fallback_include_scopes) {
            scopes.for_each_scope(&mut |scope| {
                if single_line {
                    out.push_str(" => ");
                } else {
                    out.push('\n');
                    out.push_str(MESSAGE_PADDING);
                    out.push_str("=> ");
                }
                out.push_str(scope);
            });
        }

        if options.common.empty_line_between_messages {
            out.push('\n');
        }
    }
}

fn push_replacing_newlines(out: &mut String, text: &str, replacement: &str) {
    let mut lines = text.split('\n');
    if let Some(first) = lines.next() {
        out.push_str(first.strip_suffix('\r').unwrap_or(first));
    }
    for line in lines {
        out.push_str(replacement);
        out.push_str(line.strip_suffix('\r').unwrap_or(line));
    }
}

/// JSON formatter, one object per record.
#[derive(Debug)]
pub struct JsonFormatter {
    options: OptionsBySubTarget<JsonFormatterOptions>,
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self::new(JsonFormatterOptions::default())
    }
}

impl JsonFormatter {
    pub fn new(options: JsonFormatterOptions) -> Self {
        Self {
            options: OptionsBySubTarget::new(options),
        }
    }

    /// Replace options for one sub-target, or the default with `None`.
    pub fn set_options(&self, sub_target: Option<&str>, options: JsonFormatterOptions) {
        self.options.set(sub_target, options);
    }
}

#[derive(Debug, Serialize)]
struct JsonLine<'a> {
    #[serde(rename = "Timestamp", skip_serializing_if = "Option::is_none")]
    timestamp: Option<String>,
    #[serde(rename = "EventId")]
    event_id: i32,
    #[serde(rename = "LogLevel")]
    level: &'static str,
    #[serde(rename = "Category")]
    category: &'a str,
    #[serde(rename = "Message")]
    message: &'a str,
    #[serde(rename = "Exception", skip_serializing_if = "Option::is_none")]
    exception: Option<String>,
    #[serde(rename = "Scopes", skip_serializing_if = "Option::is_none")]
    scopes: Option<Vec<String>>,
}

impl Formatter for JsonFormatter {
    fn name(&self) -> &str {
        JSON
    }

    fn write(
        &self,
        record: &LogRecord,
        scopes: &dyn ScopeLookup,
        out: &mut String,
        sub_target: Option<&str>,
        fallback_include_scopes: Option<bool>,
    ) {
        if record.is_blank() {
            return;
        }

        let options = self.options.get(sub_target);

        let mut timestamp = String::new();
        let timestamp = options
            .common
            .write_timestamp(record, &mut timestamp)
            .then_some(timestamp);

        let exception = record.exception.as_deref().map(|e| {
            if options.indented {
                e.to_string()
            } else {
                let mut collapsed = String::with_capacity(e.len());
                push_replacing_newlines(&mut collapsed, e, " ");
                collapsed
            }
        });

        let line = JsonLine {
            timestamp,
            event_id: record.event_id.id,
            level: record.level.as_str(),
            category: &record.category,
            message: &record.message,
            exception,
            scopes: options
                .common
                .include_scopes(fallback_include_scopes)
                .then(|| scopes.collect()),
        };

        let rendered = if options.indented {
            serde_json::to_string_pretty(&line)
        } else {
            serde_json::to_string(&line)
        };

        match rendered {
            Ok(json) => out.push_str(&json),
            Err(e) => tracing::warn!("Failed to serialize log record: {}", e),
        }

        if options.common.empty_line_between_messages {
            out.push('\n');
        }
    }
}

/// Formatters by case-insensitive name.
#[derive(Clone)]
pub struct FormatterRegistry {
    simple: Arc<SimpleFormatter>,
    json: Arc<JsonFormatter>,
    by_name: HashMap<String, Arc<dyn Formatter>>,
}

impl Default for FormatterRegistry {
    fn default() -> Self {
        Self::new(Arc::new(SimpleFormatter::default()), Arc::new(JsonFormatter::default()))
    }
}

impl FormatterRegistry {
    /// Registry containing the given built-in formatters.
    pub fn new(simple: Arc<SimpleFormatter>, json: Arc<JsonFormatter>) -> Self {
        let mut registry = Self {
            simple: Arc::clone(&simple),
            json: Arc::clone(&json),
            by_name: HashMap::new(),
        };
        registry.register(simple);
        registry.register(json);
        registry
    }

    /// Add or replace a formatter under its own name.
    pub fn register(&mut self, formatter: Arc<dyn Formatter>) {
        self.by_name
            .insert(formatter.name().to_ascii_lowercase(), formatter);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Formatter>> {
        self.by_name.get(&name.to_ascii_lowercase()).cloned()
    }

    /// Like [`get`](Self::get) but unknown names are an error.
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Formatter>> {
        self.get(name)
            .ok_or_else(|| SinkError::UnknownFormatter(name.to_string()))
    }

    /// Built-in text formatter, for changing its options.
    pub fn simple(&self) -> &Arc<SimpleFormatter> {
        &self.simple
    }

    /// Built-in JSON formatter, for changing its options.
    pub fn json(&self) -> &Arc<JsonFormatter> {
        &self.json
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.by_name.keys().map(String::as_str)
    }
}
