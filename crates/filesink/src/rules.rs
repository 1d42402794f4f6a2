// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Filter rules and best-rule selection.
//!
//! Selection order for a (provider, category) pair:
//!
//! 1. Rules scoped to another provider never apply.
//! 2. Rules whose category pattern does not match never apply.
//! 3. Once a provider-scoped rule is selected, unscoped rules are ignored.
//! 4. A longer category pattern beats a shorter (or missing) one.
//! 5. Between equally specific rules, the later one wins.
//! 6. With no applicable rule, the global minimum level applies.

use crate::error::{Result, SinkError};
use crate::LogLevel;
use std::fmt;
use std::sync::Arc;

/// Predicate over `(provider, category, level)`.
pub type FilterFn = Arc<dyn Fn(Option<&str>, &str, LogLevel) -> bool + Send + Sync>;

const WILDCARD: char = '*';

/// A filter rule as declared by the host.
#[derive(Clone, Default)]
pub struct FilterRule {
    /// Sub-destination the rule applies to; `None` applies to all.
    pub provider_name: Option<String>,
    /// Category prefix, optionally with one `*` wildcard.
    pub category_pattern: Option<String>,
    /// Minimum level; `None` leaves the level ungated.
    pub min_level: Option<LogLevel>,
    /// Extra predicate evaluated per log call.
    pub predicate: Option<FilterFn>,
}

impl fmt::Debug for FilterRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterRule")
            .field("provider_name", &self.provider_name)
            .field("category_pattern", &self.category_pattern)
            .field("min_level", &self.min_level)
            .field("predicate", &self.predicate.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

impl FilterRule {
    /// Rule gating everything at `level`.
    pub fn level(level: LogLevel) -> Self {
        Self {
            min_level: Some(level),
            ..Default::default()
        }
    }

    /// Restrict to one sub-destination.
    pub fn for_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider_name = Some(provider.into());
        self
    }

    /// Restrict to categories matching `pattern`.
    pub fn for_category(mut self, pattern: impl Into<String>) -> Self {
        self.category_pattern = Some(pattern.into());
        self
    }

    /// Attach a predicate.
    pub fn with_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(Option<&str>, &str, LogLevel) -> bool + Send + Sync + 'static,
    {
        self.predicate = Some(Arc::new(predicate));
        self
    }
}

/// Category pattern split around its wildcard.
#[derive(Debug, Clone, PartialEq, Eq)]
struct CategoryPattern {
    prefix: String,
    suffix: String,
    /// Length of the declared pattern, used for specificity.
    len: usize,
}

impl CategoryPattern {
    fn parse(pattern: &str) -> Result<Self> {
        let mut parts = pattern.splitn(3, WILDCARD);
        let prefix = parts.next().unwrap_or_default();
        let suffix = parts.next();
        if parts.next().is_some() {
            return Err(SinkError::MultipleWildcards {
                pattern: pattern.to_string(),
            });
        }

        Ok(Self {
            prefix: prefix.to_string(),
            suffix: suffix.unwrap_or_default().to_string(),
            len: pattern.len(),
        })
    }

    /// Prefix/suffix match, case-insensitive for any Unicode letter.
    ///
    /// Prefix and suffix may not overlap inside `category`.
    fn matches(&self, category: &str) -> bool {
        let needed = self.prefix.chars().count() + self.suffix.chars().count();
        if category.chars().count() < needed {
            return false;
        }

        starts_with_ignore_case(category.chars(), self.prefix.chars())
            && starts_with_ignore_case(category.chars().rev(), self.suffix.chars().rev())
    }
}

fn starts_with_ignore_case(
    mut text: impl Iterator<Item = char>,
    pattern: impl Iterator<Item = char>,
) -> bool {
    pattern
        .into_iter()
        .all(|p| text.next().is_some_and(|t| t == p || t.to_lowercase().eq(p.to_lowercase())))
}

/// A rule whose category pattern has been validated.
#[derive(Debug, Clone)]
struct CompiledRule {
    rule: FilterRule,
    pattern: Option<CategoryPattern>,
}

/// Global minimum level plus ordered rules.
#[derive(Debug, Clone, Default)]
pub struct FilterOptions {
    min_level: Option<LogLevel>,
    rules: Vec<CompiledRule>,
}

impl FilterOptions {
    /// Validate `rules` (declaration order is kept).
    ///
    /// Fails when a category pattern contains more than one wildcard.
    pub fn new(
        min_level: Option<LogLevel>,
        rules: impl IntoIterator<Item = FilterRule>,
    ) -> Result<Self> {
        let rules = rules
            .into_iter()
            .map(|rule| {
                let pattern = rule
                    .category_pattern
                    .as_deref()
                    .map(CategoryPattern::parse)
                    .transpose()?;
                Ok(CompiledRule { rule, pattern })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { min_level, rules })
    }

    /// Global minimum level used when no rule applies.
    pub fn min_level(&self) -> Option<LogLevel> {
        self.min_level
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Outcome of rule selection for one sub-destination.
#[derive(Clone, Default)]
pub struct Selection {
    pub min_level: Option<LogLevel>,
    pub predicate: Option<FilterFn>,
}

impl fmt::Debug for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Selection")
            .field("min_level", &self.min_level)
            .field("predicate", &self.predicate.is_some())
            .finish()
    }
}

/// Picks the single best rule for a provider/category pair.
pub struct RuleSelector;

impl RuleSelector {
    /// Resolve the minimum level and predicate for `category` on `provider`.
    pub fn select(options: &FilterOptions, provider: Option<&str>, category: &str) -> Selection {
        let best = options.rules.iter().fold(None, |current, candidate| {
            if is_better(candidate, current, provider, category) {
                Some(candidate)
            } else {
                current
            }
        });

        match best {
            Some(compiled) => Selection {
                min_level: compiled.rule.min_level,
                predicate: compiled.rule.predicate.clone(),
            },
            None => Selection {
                min_level: options.min_level,
                predicate: None,
            },
        }
    }
}

fn is_better(
    candidate: &CompiledRule,
    current: Option<&CompiledRule>,
    provider: Option<&str>,
    category: &str,
) -> bool {
    let rule = &candidate.rule;

    if let Some(name) = rule.provider_name.as_deref() {
        if Some(name) != provider {
            return false;
        }
    }

    if let Some(pattern) = &candidate.pattern {
        if !pattern.matches(category) {
            return false;
        }
    }

    let current_scoped = current.is_some_and(|c| c.rule.provider_name.is_some());
    if current_scoped {
        if rule.provider_name.is_none() {
            return false;
        }
    } else if rule.provider_name.is_some() {
        // Going from unscoped to scoped skips the specificity check.
        return true;
    }

    if let Some(current_pattern) = current.and_then(|c| c.pattern.as_ref()) {
        match &candidate.pattern {
            None => return false,
            Some(pattern) if current_pattern.len > pattern.len => return false,
            Some(_) => {}
        }
    }

    true
}
