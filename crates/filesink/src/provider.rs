// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Registry of named file targets behind composite loggers.
//!
//! The host owns a [`CompositeFileLoggerProvider`] and asks it for loggers
//! by category. Each composite logger holds one binding per target, resolved
//! with [`RuleSelector`] against the current filter options. Changing the
//! targets or the filter rebuilds every binding set that was handed out.

use crate::composite::{CompositeLogger, SubLoggerBinding};
use crate::formatter::FormatterRegistry;
use crate::logger::FileLoggerProvider;
use crate::options::{FilterConfig, SinkConfig, TargetConfig};
use crate::rules::{FilterOptions, RuleSelector};
use crate::scope::{ScopeLookup, ScopeStack};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::Arc;

struct Target {
    name: String,
    provider: FileLoggerProvider,
}

struct State {
    /// Declaration order.
    targets: Vec<Target>,
    filter: FilterOptions,
}

impl State {
    fn bindings_for(&self, category: &str) -> Vec<SubLoggerBinding> {
        self.targets
            .iter()
            .map(|target| {
                let name = Some(target.name.as_str());
                let selection = RuleSelector::select(&self.filter, name, category);
                SubLoggerBinding::new(
                    target.name.clone(),
                    selection,
                    target.provider.create_logger(category),
                )
            })
            .collect()
    }
}

/// Composite provider writing to several named file targets.
pub struct CompositeFileLoggerProvider {
    registry: FormatterRegistry,
    scopes: Arc<dyn ScopeLookup>,
    state: RwLock<State>,
    loggers: DashMap<String, Arc<CompositeLogger>>,
}

impl CompositeFileLoggerProvider {
    /// Start one processor per target.
    ///
    /// Later targets with an already used name replace the earlier ones.
    pub fn new(
        targets: &[TargetConfig],
        filter: FilterOptions,
        registry: FormatterRegistry,
        scopes: Arc<dyn ScopeLookup>,
    ) -> crate::Result<Self> {
        let provider = Self {
            registry,
            scopes,
            state: RwLock::new(State {
                targets: Vec::new(),
                filter,
            }),
            loggers: DashMap::new(),
        };
        provider.set_targets(targets)?;
        Ok(provider)
    }

    /// Build from a configuration document with the built-in formatters and
    /// thread-local scopes.
    pub fn from_config(config: &SinkConfig) -> crate::Result<Self> {
        let filter = config.filter.compile()?;
        Self::new(
            &config.targets,
            filter,
            FormatterRegistry::default(),
            Arc::new(ScopeStack),
        )
    }

    /// Composite logger for `category`, created on first use.
    pub fn create_logger(&self, category: &str) -> Arc<CompositeLogger> {
        if let Some(logger) = self.loggers.get(category) {
            return Arc::clone(logger.value());
        }

        // Held while inserting so a concurrent reload cannot miss this logger.
        let state = self.state.read();
        let logger = self
            .loggers
            .entry(category.to_string())
            .or_insert_with(|| {
                Arc::new(CompositeLogger::new(category, state.bindings_for(category)))
            });
        Arc::clone(logger.value())
    }

    /// Compile and install new filter rules.
    ///
    /// On error the previous rules stay active.
    pub fn reload_filters(&self, config: &FilterConfig) -> crate::Result<()> {
        let filter = config.compile()?;
        self.set_filter_options(filter);
        Ok(())
    }

    /// Install already compiled filter options, e.g. ones with predicates.
    pub fn set_filter_options(&self, filter: FilterOptions) {
        let mut state = self.state.write();
        state.filter = filter;
        self.rebuild(&state);

        tracing::info!(
            rules = state.filter.len(),
            min_level = ?state.filter.min_level(),
            "Reloaded filter rules"
        );
    }

    /// Add, reconfigure and remove targets to match `targets`.
    ///
    /// Unknown formatter names are rejected before anything changes. If a
    /// target fails to start, the targets already running are kept.
    pub fn set_targets(&self, targets: &[TargetConfig]) -> crate::Result<()> {
        for target in targets {
            self.registry.resolve(&target.options.formatter_name)?;
        }

        let mut state = self.state.write();
        let mut previous = std::mem::take(&mut state.targets);
        let mut next = Vec::with_capacity(targets.len());

        let outcome = self.assemble(targets, &mut previous, &mut next);
        if outcome.is_err() {
            // Keep every target that is still running.
            next.append(&mut previous);
        }

        for removed in previous {
            tracing::info!(target_name = %removed.name, "Removing log target");
            removed.provider.shutdown();
        }

        state.targets = next;
        self.rebuild(&state);
        outcome
    }

    /// Move reused targets from `previous` into `next` and start new ones.
    fn assemble(
        &self,
        targets: &[TargetConfig],
        previous: &mut Vec<Target>,
        next: &mut Vec<Target>,
    ) -> crate::Result<()> {
        for config in targets {
            if let Some(existing) = next.iter().find(|t| t.name == config.name) {
                existing.provider.reload(&config.options)?;
                continue;
            }

            if let Some(pos) = previous.iter().position(|t| t.name == config.name) {
                let target = previous.remove(pos);
                let reloaded = target.provider.reload(&config.options);
                next.push(target);
                reloaded?;
                continue;
            }

            tracing::info!(
                target_name = %config.name,
                path = %config.options.path,
                "Adding log target"
            );
            next.push(Target {
                name: config.name.clone(),
                provider: FileLoggerProvider::new(
                    Some(&config.name),
                    &config.options,
                    &self.registry,
                    Arc::clone(&self.scopes),
                )?,
            });
        }
        Ok(())
    }

    fn rebuild(&self, state: &State) {
        for entry in self.loggers.iter() {
            entry.value().replace_bindings(state.bindings_for(entry.key()));
        }
    }

    /// Names of the current targets, in declaration order.
    pub fn target_names(&self) -> Vec<String> {
        self.state
            .read()
            .targets
            .iter()
            .map(|t| t.name.clone())
            .collect()
    }

    pub fn registry(&self) -> &FormatterRegistry {
        &self.registry
    }

    /// Drain and close every target.
    pub fn shutdown(&self) {
        let state = self.state.read();
        for target in &state.targets {
            target.provider.shutdown();
        }
        tracing::debug!(targets = state.targets.len(), "Composite provider stopped");
    }
}

impl Drop for CompositeFileLoggerProvider {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::Logger;
    use crate::options::{FileTargetOptions, RuleConfig};
    use crate::rules::FilterRule;
    use crate::{LogLevel, LogRecord};
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn target(dir: &Path, name: &str) -> TargetConfig {
        TargetConfig {
            name: name.to_string(),
            options: FileTargetOptions::new(dir.join(format!("{}.log", name)).to_string_lossy()),
        }
    }

    fn errors_only() -> FilterOptions {
        FilterOptions::new(
            Some(LogLevel::Trace),
            vec![FilterRule::level(LogLevel::Error).for_provider("errors")],
        )
        .unwrap()
    }

    fn read(dir: &Path, name: &str) -> String {
        fs::read_to_string(dir.join(format!("{}.log", name))).unwrap_or_default()
    }

    #[test]
    fn test_bindings_follow_rules() {
        let temp_dir = TempDir::new().unwrap();
        let targets = [target(temp_dir.path(), "main"), target(temp_dir.path(), "errors")];
        let provider = CompositeFileLoggerProvider::new(
            &targets,
            errors_only(),
            FormatterRegistry::default(),
            Arc::new(ScopeStack),
        )
        .unwrap();

        let logger = provider.create_logger("App.Service");
        let levels: Vec<_> = logger
            .bindings()
            .iter()
            .map(|b| (b.name().to_string(), b.min_level()))
            .collect();
        assert!(levels.contains(&("main".to_string(), Some(LogLevel::Trace))));
        assert!(levels.contains(&("errors".to_string(), Some(LogLevel::Error))));

        logger.log(&LogRecord::new(LogLevel::Information, "App.Service", "routine"));
        logger.log(&LogRecord::new(LogLevel::Error, "App.Service", "broken"));
        provider.shutdown();

        let main = read(temp_dir.path(), "main");
        let errors = read(temp_dir.path(), "errors");
        assert!(main.contains("routine") && main.contains("broken"));
        assert!(!errors.contains("routine") && errors.contains("broken"));
    }

    #[test]
    fn test_reload_filters_rebinds_existing_loggers() {
        let temp_dir = TempDir::new().unwrap();
        let targets = [target(temp_dir.path(), "main")];
        let provider = CompositeFileLoggerProvider::new(
            &targets,
            FilterOptions::default(),
            FormatterRegistry::default(),
            Arc::new(ScopeStack),
        )
        .unwrap();
        let logger = provider.create_logger("App");
        assert!(logger.is_enabled(LogLevel::Trace));

        let invalid = FilterConfig {
            min_level: Some(LogLevel::Critical),
            rules: vec![RuleConfig {
                category: Some("A*p*".into()),
                ..Default::default()
            }],
        };
        assert!(provider.reload_filters(&invalid).is_err());
        assert!(logger.is_enabled(LogLevel::Trace));

        let valid = FilterConfig {
            min_level: Some(LogLevel::Warning),
            rules: vec![],
        };
        provider.reload_filters(&valid).unwrap();
        assert!(!logger.is_enabled(LogLevel::Information));
        assert!(logger.is_enabled(LogLevel::Warning));
    }

    #[test]
    fn test_set_targets_adds_and_removes() {
        let temp_dir = TempDir::new().unwrap();
        let provider = CompositeFileLoggerProvider::new(
            &[target(temp_dir.path(), "a")],
            FilterOptions::default(),
            FormatterRegistry::default(),
            Arc::new(ScopeStack),
        )
        .unwrap();
        let logger = provider.create_logger("App");
        logger.log(&LogRecord::new(LogLevel::Information, "App", "first"));

        provider
            .set_targets(&[target(temp_dir.path(), "b")])
            .unwrap();
        assert_eq!(provider.target_names(), vec!["b".to_string()]);
        logger.log(&LogRecord::new(LogLevel::Information, "App", "second"));
        provider.shutdown();

        let a = read(temp_dir.path(), "a");
        let b = read(temp_dir.path(), "b");
        assert!(a.contains("first") && !a.contains("second"));
        assert!(b.contains("second") && !b.contains("first"));
    }

    #[test]
    fn test_set_targets_rejects_unknown_formatter() {
        let temp_dir = TempDir::new().unwrap();
        let provider = CompositeFileLoggerProvider::new(
            &[target(temp_dir.path(), "a")],
            FilterOptions::default(),
            FormatterRegistry::default(),
            Arc::new(ScopeStack),
        )
        .unwrap();

        let mut bad = target(temp_dir.path(), "b");
        bad.options.formatter_name = "xml".to_string();
        assert!(provider.set_targets(&[bad]).is_err());
        assert_eq!(provider.target_names(), vec!["a".to_string()]);
    }

    #[test]
    fn test_from_config() {
        let temp_dir = TempDir::new().unwrap();
        let json = format!(
            r#"{{
                "targets": [{{ "name": "main", "path": "{}" }}],
                "filter": {{ "min_level": "Warning" }}
            }}"#,
            temp_dir.path().join("cfg.log").display().to_string().replace('\\', "/")
        );
        let config = SinkConfig::from_json_str(&json).unwrap();
        let provider = CompositeFileLoggerProvider::from_config(&config).unwrap();

        let logger = provider.create_logger("App");
        assert!(!logger.is_enabled(LogLevel::Information));
        logger.log(&LogRecord::new(LogLevel::Warning, "App", "configured"));
        provider.shutdown();

        assert!(fs::read_to_string(temp_dir.path().join("cfg.log"))
            .unwrap()
            .contains("configured"));
    }
}
