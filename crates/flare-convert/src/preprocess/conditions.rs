//! Conditional-text exclusion.

use flare_core::ConditionOptions;
use regex::{Regex, RegexBuilder};

use crate::{ConversionError, Result};

/// Compiled exclusion patterns for one conversion
#[derive(Debug, Clone)]
pub struct ConditionMatcher {
    patterns: Vec<Regex>,
    /// Lowercase names that are never excluded
    include: Vec<String>,
}

impl ConditionMatcher {
    pub fn new(options: &ConditionOptions) -> Result<Self> {
        let patterns = options
            .exclude_patterns
            .iter()
            .map(|pattern| {
                RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| {
                        ConversionError::InvalidOptions(format!("exclude pattern '{}': {}", pattern, e))
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        let include = options
            .include_conditions
            .iter()
            .map(|c| c.trim().to_lowercase())
            .filter(|c| !c.is_empty())
            .collect();
        Ok(Self { patterns, include })
    }

    /// First condition in a `MadCap:conditions` value that excludes content
    pub fn excluded<'a>(&self, conditions: &'a str) -> Option<&'a str> {
        split_conditions(conditions).find(|c| self.is_excluded(c))
    }

    pub fn is_excluded(&self, condition: &str) -> bool {
        let lower = condition.to_lowercase();
        let short = lower.rsplit('.').next().unwrap_or(&lower);
        if self.include.iter().any(|i| *i == lower || i == short) {
            return false;
        }
        self.patterns.iter().any(|p| p.is_match(condition))
    }
}

/// Condition names in a `MadCap:conditions` attribute value
pub fn split_conditions(value: &str) -> impl Iterator<Item = &str> {
    value.split([',', ';']).map(str::trim).filter(|c| !c.is_empty())
}
