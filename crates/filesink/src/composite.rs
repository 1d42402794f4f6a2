// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fan-out logger over several filtered sub-destinations.
//!
//! The binding set is an immutable map behind an [`ArcSwap`]. Log calls load
//! the current snapshot without locking; updates build a new map and swap it
//! in, so a reader sees either the old set or the new one, never a mix.

use crate::logger::{FileLogger, Logger};
use crate::rules::{FilterFn, Selection};
use crate::{LogLevel, LogRecord};
use arc_swap::ArcSwap;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Resolved filter and writer for one sub-destination.
#[derive(Clone)]
pub struct SubLoggerBinding {
    name: String,
    min_level: Option<LogLevel>,
    filter: Option<FilterFn>,
    logger: Arc<FileLogger>,
}

impl fmt::Debug for SubLoggerBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubLoggerBinding")
            .field("name", &self.name)
            .field("min_level", &self.min_level)
            .field("filter", &self.filter.is_some())
            .finish()
    }
}

impl SubLoggerBinding {
    pub fn new(name: impl Into<String>, selection: Selection, logger: Arc<FileLogger>) -> Self {
        Self {
            name: name.into(),
            min_level: selection.min_level,
            filter: selection.predicate,
            logger,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn min_level(&self) -> Option<LogLevel> {
        self.min_level
    }

    /// Per-call decision for this destination.
    pub fn accepts(&self, category: &str, level: LogLevel) -> bool {
        if level == LogLevel::None {
            return false;
        }
        if self.min_level.is_some_and(|min| level < min) {
            return false;
        }
        match &self.filter {
            Some(filter) => filter(Some(self.name.as_str()), category, level),
            None => true,
        }
    }
}

type Bindings = BTreeMap<String, SubLoggerBinding>;

/// Logger forwarding each record to every accepting sub-destination.
pub struct CompositeLogger {
    category: String,
    bindings: ArcSwap<Bindings>,
}

impl CompositeLogger {
    pub fn new(
        category: impl Into<String>,
        bindings: impl IntoIterator<Item = SubLoggerBinding>,
    ) -> Self {
        Self {
            category: category.into(),
            bindings: ArcSwap::from_pointee(collect_bindings(bindings)),
        }
    }

    /// Replace the filter of one sub-destination.
    ///
    /// Unknown names are ignored.
    pub fn update(&self, name: &str, min_level: Option<LogLevel>, filter: Option<FilterFn>) {
        self.bindings.rcu(|current| {
            let mut next = Bindings::clone(current);
            if let Some(binding) = next.get_mut(name) {
                binding.min_level = min_level;
                binding.filter = filter.clone();
            }
            next
        });
    }

    /// Swap in a whole new binding set.
    pub fn replace_bindings(&self, bindings: impl IntoIterator<Item = SubLoggerBinding>) {
        self.bindings.store(Arc::new(collect_bindings(bindings)));
    }

    /// Snapshot of the current bindings.
    pub fn bindings(&self) -> Vec<SubLoggerBinding> {
        self.bindings.load().values().cloned().collect()
    }
}

fn collect_bindings(bindings: impl IntoIterator<Item = SubLoggerBinding>) -> Bindings {
    bindings
        .into_iter()
        .map(|binding| (binding.name.clone(), binding))
        .collect()
}

impl Logger for CompositeLogger {
    fn category(&self) -> &str {
        &self.category
    }

    /// True when at least one destination may accept `level`.
    ///
    /// Only a pre-filter: predicates are not consulted here, the decision
    /// that counts is made per destination in [`log`](Logger::log).
    fn is_enabled(&self, level: LogLevel) -> bool {
        level != LogLevel::None
            && self
                .bindings
                .load()
                .values()
                .any(|b| b.min_level.is_none_or(|min| level >= min))
    }

    fn log(&self, record: &LogRecord) {
        let bindings = self.bindings.load();
        for binding in bindings.values() {
            if binding.accepts(&self.category, record.level) {
                binding.logger.log(record);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formatter::{FormatterOptions, FormatterRegistry, SimpleFormatterOptions};
    use crate::logger::FileLoggerProvider;
    use crate::options::FileTargetOptions;
    use crate::scope::NoScopes;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn provider(dir: &Path, name: &str) -> FileLoggerProvider {
        let registry = FormatterRegistry::default();
        registry.simple().set_options(
            None,
            SimpleFormatterOptions {
                common: FormatterOptions {
                    timestamp_format: None,
                    empty_line_between_messages: false,
                    ..Default::default()
                },
                single_line: true,
            },
        );
        let options = FileTargetOptions::new(dir.join(format!("{}.log", name)).to_string_lossy());
        FileLoggerProvider::new(Some(name), &options, &registry, Arc::new(NoScopes)).unwrap()
    }

    fn binding(provider: &FileLoggerProvider, min_level: Option<LogLevel>) -> SubLoggerBinding {
        let name = provider.name().unwrap();
        SubLoggerBinding::new(
            name,
            Selection {
                min_level,
                predicate: None,
            },
            provider.create_logger("App"),
        )
    }

    #[test]
    fn test_only_accepting_destination_writes() {
        let temp_dir = TempDir::new().unwrap();
        let errors = provider(temp_dir.path(), "errors");
        let all = provider(temp_dir.path(), "all");

        let logger = CompositeLogger::new(
            "App",
            vec![binding(&errors, Some(LogLevel::Error)), binding(&all, None)],
        );
        logger.log(&LogRecord::new(LogLevel::Information, "App", "hello"));
        errors.shutdown();
        all.shutdown();

        assert!(!temp_dir.path().join("errors.log").exists());
        assert_eq!(
            fs::read_to_string(temp_dir.path().join("all.log")).unwrap(),
            "info: App [0] hello\n"
        );
    }

    #[test]
    fn test_is_enabled_is_disjunction() {
        let temp_dir = TempDir::new().unwrap();
        let errors = provider(temp_dir.path(), "errors");
        let warnings = provider(temp_dir.path(), "warnings");

        let logger = CompositeLogger::new(
            "App",
            vec![
                binding(&errors, Some(LogLevel::Error)),
                binding(&warnings, Some(LogLevel::Warning)),
            ],
        );
        assert!(!logger.is_enabled(LogLevel::Information));
        assert!(logger.is_enabled(LogLevel::Warning));
        assert!(logger.is_enabled(LogLevel::Critical));
        assert!(!logger.is_enabled(LogLevel::None));
    }

    #[test]
    fn test_update_replaces_one_binding() {
        let temp_dir = TempDir::new().unwrap();
        let errors = provider(temp_dir.path(), "errors");
        let all = provider(temp_dir.path(), "all");

        let logger = CompositeLogger::new(
            "App",
            vec![binding(&errors, Some(LogLevel::Error)), binding(&all, None)],
        );
        let before = logger.bindings.load_full();

        let reject: FilterFn = Arc::new(|_: Option<&str>, _: &str, _: LogLevel| false);
        logger.update("errors", Some(LogLevel::Trace), Some(reject));
        logger.update("missing", Some(LogLevel::Trace), None);

        // The old snapshot is untouched.
        assert_eq!(before["errors"].min_level(), Some(LogLevel::Error));

        let after = logger.bindings();
        let errors_binding = after.iter().find(|b| b.name() == "errors").unwrap();
        assert_eq!(errors_binding.min_level(), Some(LogLevel::Trace));
        assert!(!errors_binding.accepts("App", LogLevel::Critical));
        assert_eq!(after.len(), 2);
    }

    #[test]
    fn test_filter_sees_destination_and_category() {
        let temp_dir = TempDir::new().unwrap();
        let all = provider(temp_dir.path(), "all");
        let filter: FilterFn = Arc::new(|provider: Option<&str>, category: &str, _: LogLevel| {
            provider == Some("all") && category.starts_with("App")
        });

        let binding = SubLoggerBinding::new(
            "all",
            Selection {
                min_level: None,
                predicate: Some(filter),
            },
            all.create_logger("App"),
        );
        assert!(binding.accepts("App.Service", LogLevel::Debug));
        assert!(!binding.accepts("Other", LogLevel::Debug));
    }
}
