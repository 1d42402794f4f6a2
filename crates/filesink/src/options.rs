// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Configuration records.
//!
//! Hosts may build these in code or bind them from JSON through serde.

use crate::rolling::RollingInterval;
use crate::rules::{FilterOptions, FilterRule};
use crate::LogLevel;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Options for one rolling file target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileTargetOptions {
    /// Path template; may contain `%VAR%` or `${VAR}` placeholders.
    pub path: String,
    /// Size that triggers rotation; 0 disables size rotation.
    pub max_file_size_bytes: u64,
    /// Number of files kept in the family.
    pub max_generations: u32,
    /// Time-based rotation.
    pub roll_interval: RollingInterval,
    /// Append to an existing file on first open instead of truncating it.
    pub append: bool,
    /// fsync on every flush.
    pub flush_to_disk: bool,
    /// Upper bound between flushes while the queue stays busy.
    pub max_flush_interval_ms: Option<u64>,
    /// Formatter name (`simple`, `json`, or a registered custom one).
    pub formatter_name: String,
    /// Default for formatters whose own `include_scopes` is unset.
    pub include_scopes: bool,
    /// Compute interval buckets in UTC instead of local time.
    pub use_utc_intervals: bool,
}

impl Default for FileTargetOptions {
    fn default() -> Self {
        Self {
            path: "logs/log.txt".to_string(),
            max_file_size_bytes: 50 * 1024 * 1024, // 50 MB
            max_generations: 7,
            roll_interval: RollingInterval::Infinite,
            append: true,
            flush_to_disk: false,
            max_flush_interval_ms: None,
            formatter_name: "simple".to_string(),
            include_scopes: true,
            use_utc_intervals: false,
        }
    }
}

impl FileTargetOptions {
    /// Options writing to `path` with defaults otherwise.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Set the rotation size in megabytes, saturating at `u64::MAX` bytes.
    pub fn with_max_size_mb(mut self, mb: u64) -> Self {
        self.max_file_size_bytes = mb.saturating_mul(1024 * 1024);
        self
    }

    /// Set the rotation size in bytes.
    pub fn with_max_size(mut self, bytes: u64) -> Self {
        self.max_file_size_bytes = bytes;
        self
    }

    /// Set maximum number of files kept.
    pub fn max_generations(mut self, count: u32) -> Self {
        self.max_generations = count;
        self
    }

    pub fn roll_interval(mut self, interval: RollingInterval) -> Self {
        self.roll_interval = interval;
        self
    }

    pub fn append(mut self, append: bool) -> Self {
        self.append = append;
        self
    }

    pub fn flush_to_disk(mut self, flush: bool) -> Self {
        self.flush_to_disk = flush;
        self
    }

    pub fn max_flush_interval(mut self, interval: Duration) -> Self {
        self.max_flush_interval_ms = Some(interval.as_millis() as u64);
        self
    }

    pub fn formatter(mut self, name: impl Into<String>) -> Self {
        self.formatter_name = name.into();
        self
    }

    pub fn utc(mut self, utc: bool) -> Self {
        self.use_utc_intervals = utc;
        self
    }

    /// Path with environment placeholders expanded.
    pub fn expanded_path(&self) -> PathBuf {
        PathBuf::from(expand_env_vars(&self.path))
    }

    pub fn max_flush_interval_duration(&self) -> Option<Duration> {
        self.max_flush_interval_ms.map(Duration::from_millis)
    }
}

/// Expand `%VAR%` and `${VAR}` from the process environment.
///
/// Unknown variables are left untouched.
pub fn expand_env_vars(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(pos) = rest.find(['%', '$']) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        let (name, consumed) = if let Some(body) = tail.strip_prefix("${") {
            match body.find('}') {
                Some(end) => (&body[..end], end + 3),
                None => ("", 0),
            }
        } else if let Some(body) = tail.strip_prefix('%') {
            match body.find('%') {
                Some(end) => (&body[..end], end + 2),
                None => ("", 0),
            }
        } else {
            ("", 0)
        };

        match std::env::var(name) {
            Ok(value) if consumed > 0 && !name.is_empty() => {
                out.push_str(&value);
                rest = &tail[consumed..];
            }
            _ => {
                // Not a placeholder we can resolve: keep the marker character.
                out.push_str(&tail[..1]);
                rest = &tail[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

/// A named sub-destination of a composite sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetConfig {
    pub name: String,
    #[serde(flatten)]
    pub options: FileTargetOptions,
}

/// Filter rule as written in configuration (no predicate).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleConfig {
    pub provider: Option<String>,
    pub category: Option<String>,
    pub level: Option<LogLevel>,
}

impl From<&RuleConfig> for FilterRule {
    fn from(rule: &RuleConfig) -> Self {
        FilterRule {
            provider_name: rule.provider.clone(),
            category_pattern: rule.category.clone(),
            min_level: rule.level,
            predicate: None,
        }
    }
}

/// Filter section of a configuration document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub min_level: Option<LogLevel>,
    pub rules: Vec<RuleConfig>,
}

impl FilterConfig {
    /// Compile into [`FilterOptions`]; fails on invalid category patterns.
    pub fn compile(&self) -> crate::Result<FilterOptions> {
        FilterOptions::new(self.min_level, self.rules.iter().map(FilterRule::from))
    }
}

/// Top-level configuration for a composite sink.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    pub targets: Vec<TargetConfig>,
    pub filter: FilterConfig,
}

impl SinkConfig {
    /// Parse a JSON document.
    pub fn from_json_str(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a JSON file.
    pub fn load(path: impl AsRef<Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = FileTargetOptions::default();
        assert_eq!(options.path, "logs/log.txt");
        assert_eq!(options.max_file_size_bytes, 50 * 1024 * 1024);
        assert_eq!(options.max_generations, 7);
        assert!(options.append);
        assert_eq!(options.max_flush_interval_duration(), None);
    }

    #[test]
    fn test_max_size_mb_saturates() {
        assert_eq!(FileTargetOptions::default().with_max_size_mb(10).max_file_size_bytes, 10 << 20);
        assert_eq!(
            FileTargetOptions::default().with_max_size_mb(u64::MAX).max_file_size_bytes,
            u64::MAX
        );
    }

    #[test]
    fn test_expand_env_vars() {
        std::env::set_var("FILESINK_TEST_DIR", "/var/log/app");
        assert_eq!(
            expand_env_vars("%FILESINK_TEST_DIR%/log.txt"),
            "/var/log/app/log.txt"
        );
        assert_eq!(
            expand_env_vars("${FILESINK_TEST_DIR}/log.txt"),
            "/var/log/app/log.txt"
        );
        assert_eq!(
            expand_env_vars("%FILESINK_UNSET_VAR%/log.txt"),
            "%FILESINK_UNSET_VAR%/log.txt"
        );
        assert_eq!(expand_env_vars("logs/100%.txt"), "logs/100%.txt");
        assert_eq!(expand_env_vars("$HOME_NOT_BRACED"), "$HOME_NOT_BRACED");
    }

    #[test]
    fn test_parse_sink_config() {
        let json = r#"{
            "targets": [
                { "name": "main", "path": "logs/main.txt", "max_generations": 3 },
                { "name": "errors", "path": "logs/errors.json", "formatter_name": "json",
                  "roll_interval": "Day" }
            ],
            "filter": {
                "min_level": "Information",
                "rules": [
                    { "provider": "errors", "level": "Error" },
                    { "category": "App.*", "level": "Debug" }
                ]
            }
        }"#;

        let config = SinkConfig::from_json_str(json).unwrap();
        assert_eq!(config.targets.len(), 2);
        assert_eq!(config.targets[0].options.max_generations, 3);
        assert!(config.targets[0].options.append);
        assert_eq!(config.targets[1].options.roll_interval, RollingInterval::Day);
        assert_eq!(config.filter.rules[0].provider.as_deref(), Some("errors"));
        assert!(config.filter.compile().is_ok());
    }

    #[test]
    fn test_invalid_rule_fails_compile() {
        let filter = FilterConfig {
            min_level: None,
            rules: vec![RuleConfig {
                category: Some("App.*.Sub*".into()),
                ..Default::default()
            }],
        };
        assert!(filter.compile().is_err());
    }
}
