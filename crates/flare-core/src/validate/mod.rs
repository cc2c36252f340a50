//! AsciiDoc validation and auto-fix
//!
//! Validation is a registry of [`ValidationRule`] trait objects run in order
//! over the emitted text. Issues are data, never errors: the caller decides
//! what to do with an `invalid` report.

mod autofix;
mod rules;

use std::collections::BTreeSet;

use serde::Serialize;

use crate::options::{AsciidocOptions, OutputFormat, ValidationStrictness};
use crate::text::SourceText;

pub use autofix::{auto_fix, AppliedFix, AutoFixResult};
pub use rules::{
    AdmonitionBlock, ImageMacro, IncludeDirective, ListSequence, OrphanedContinuation,
    SectionLevels, TableDelimiters, TrailingWhitespace,
};

/// Issue severity, most severe first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        }
    }
}

/// A problem found in the emitted document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationIssue {
    /// 1-based line number
    pub line: usize,
    pub severity: Severity,
    /// Name of the rule that reported the issue
    pub rule: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl ValidationIssue {
    pub fn new(line: usize, severity: Severity, rule: &str, message: impl Into<String>) -> Self {
        Self {
            line,
            severity,
            rule: rule.to_string(),
            message: message.into(),
            suggestion: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// One-line summary used in conversion metadata
    pub fn summary(&self) -> String {
        format!("line {}: {} ({})", self.line, self.message, self.rule)
    }
}

/// Settings for a validation run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationOptions {
    pub strictness: ValidationStrictness,
    /// Known image files; missing-image checks are skipped when `None`
    pub available_images: Option<BTreeSet<String>>,
}

impl ValidationOptions {
    pub fn from_asciidoc(options: &AsciidocOptions) -> Self {
        Self {
            strictness: options.validation_strictness,
            available_images: options.available_images.clone(),
        }
    }

    /// Whether issues of this severity are reported at the configured strictness
    pub fn reports(&self, severity: Severity) -> bool {
        match self.strictness {
            ValidationStrictness::Strict => true,
            ValidationStrictness::Normal => severity != Severity::Info,
            ValidationStrictness::Lenient => severity == Severity::Error,
        }
    }
}

/// A single validation check
pub trait ValidationRule: Send + Sync {
    /// Stable rule name (`table-delimiters`, ...)
    fn name(&self) -> &'static str;

    /// Most severe level this rule reports
    fn severity(&self) -> Severity;

    fn check(&self, source: &SourceText<'_>, options: &ValidationOptions) -> Vec<ValidationIssue>;
}

/// Overall verdict of a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    Valid,
    Warnings,
    Invalid,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IssueGroups {
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
    pub info: Vec<ValidationIssue>,
}

/// Result of a validation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub issue_count: usize,
    pub issues: IssueGroups,
    pub status: ValidationStatus,
}

impl ValidationReport {
    pub fn from_issues(mut issues: Vec<ValidationIssue>) -> Self {
        issues.sort_by(|a, b| a.line.cmp(&b.line).then(a.severity.cmp(&b.severity)));
        let issue_count = issues.len();
        let mut groups = IssueGroups::default();
        for issue in issues {
            match issue.severity {
                Severity::Error => groups.errors.push(issue),
                Severity::Warning => groups.warnings.push(issue),
                Severity::Info => groups.info.push(issue),
            }
        }
        let status = if !groups.errors.is_empty() {
            ValidationStatus::Invalid
        } else if !groups.warnings.is_empty() {
            ValidationStatus::Warnings
        } else {
            ValidationStatus::Valid
        };
        Self {
            issue_count,
            issues: groups,
            status,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.status != ValidationStatus::Invalid
    }

    /// All issues, errors first
    pub fn iter(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues
            .errors
            .iter()
            .chain(&self.issues.warnings)
            .chain(&self.issues.info)
    }
}

/// Ordered rule registry
pub struct Validator {
    rules: Vec<Box<dyn ValidationRule>>,
}

impl Default for Validator {
    fn default() -> Self {
        Self {
            rules: vec![
                Box::new(OrphanedContinuation),
                Box::new(ListSequence),
                Box::new(TableDelimiters),
                Box::new(ImageMacro),
                Box::new(IncludeDirective),
                Box::new(AdmonitionBlock),
                Box::new(SectionLevels),
                Box::new(TrailingWhitespace),
            ],
        }
    }
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validator with no rules
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Append a rule; it runs after the existing ones
    pub fn with_rule<R: ValidationRule + 'static>(mut self, rule: R) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    pub fn validate(&self, text: &str, options: &ValidationOptions) -> ValidationReport {
        let source = SourceText::new(text, OutputFormat::Asciidoc);
        let mut issues = Vec::new();
        for rule in &self.rules {
            // Nothing this rule finds would be reported
            if !options.reports(rule.severity()) {
                continue;
            }
            let found: Vec<ValidationIssue> = rule
                .check(&source, options)
                .into_iter()
                .filter(|i| options.reports(i.severity))
                .collect();
            if !found.is_empty() {
                tracing::debug!(rule = rule.name(), issues = found.len(), "validation rule reported issues");
            }
            issues.extend(found);
        }
        ValidationReport::from_issues(issues)
    }
}

/// Validate AsciiDoc text with the default rule set
pub fn validate(text: &str, options: &ValidationOptions) -> ValidationReport {
    Validator::default().validate(text, options)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoTodo;

    impl ValidationRule for NoTodo {
        fn name(&self) -> &'static str {
            "no-todo"
        }

        fn severity(&self) -> Severity {
            Severity::Warning
        }

        fn check(&self, source: &SourceText<'_>, _options: &ValidationOptions) -> Vec<ValidationIssue> {
            source
                .prose_lines()
                .filter(|(_, l)| l.contains("TODO"))
                .map(|(n, _)| ValidationIssue::new(n, Severity::Warning, self.name(), "Leftover TODO"))
                .collect()
        }
    }

    #[test]
    fn test_valid_document() {
        let text = "= Title\n\n== Section\n\n. One\n. Two\n";
        let report = validate(text, &ValidationOptions::default());
        assert_eq!(report.status, ValidationStatus::Valid);
        assert_eq!(report.issue_count, 0);
    }

    #[test]
    fn test_unclosed_table_is_invalid() {
        let text = "[cols=\"1,1\"]\n|===\n|a |b\n";
        let report = validate(text, &ValidationOptions::default());
        assert_eq!(report.status, ValidationStatus::Invalid);
        assert_eq!(report.issues.errors[0].rule, "table-delimiters");
        assert_eq!(report.issues.errors[0].line, 2);
    }

    #[test]
    fn test_strictness_filters_info() {
        let text = "= Title\n\n==== Deep\n\nText \n";
        let normal = validate(text, &ValidationOptions::default());
        assert!(normal.issues.info.is_empty());

        let strict = validate(
            text,
            &ValidationOptions {
                strictness: ValidationStrictness::Strict,
                available_images: None,
            },
        );
        let rules: Vec<&str> = strict.issues.info.iter().map(|i| i.rule.as_str()).collect();
        assert_eq!(rules, vec!["section-levels", "trailing-whitespace"]);
        assert_eq!(strict.status, ValidationStatus::Valid);
    }

    #[test]
    fn test_lenient_drops_warnings() {
        let text = "Text\n\n+\n\nMore\n";
        let lenient = validate(
            text,
            &ValidationOptions {
                strictness: ValidationStrictness::Lenient,
                available_images: None,
            },
        );
        assert_eq!(lenient.issue_count, 0);
        let normal = validate(text, &ValidationOptions::default());
        assert_eq!(normal.status, ValidationStatus::Warnings);
    }

    #[test]
    fn test_custom_rule() {
        let validator = Validator::new().with_rule(NoTodo);
        assert_eq!(validator.rule_names().last(), Some(&"no-todo"));
        let report = validator.validate("Fix this TODO\n", &ValidationOptions::default());
        assert_eq!(report.issues.warnings.len(), 1);
        assert_eq!(report.issues.warnings[0].summary(), "line 1: Leftover TODO (no-todo)");
    }

    #[test]
    fn test_report_serializes_camel_case() {
        let report = ValidationReport::from_issues(vec![ValidationIssue::new(
            3,
            Severity::Error,
            "image-macro",
            "Malformed image macro",
        )]);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["issueCount"], 1);
        assert_eq!(json["status"], "invalid");
        assert_eq!(json["issues"]["errors"][0]["severity"], "error");
    }
}
