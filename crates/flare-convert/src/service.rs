//! ConversionService - the entry point for converting one document.

use flare_core::validate::{auto_fix, validate, Severity, ValidationOptions};
use flare_core::{render, ConversionOptions, OutputFormat, VariableMode};
use serde::Serialize;

use crate::convert::{convert_document, ConvertContext};
use crate::preprocess::{ExtractedVariable, Preprocessor, RepairRule, RepairRules};
use crate::{ConversionError, Result};

/// Data collected alongside the converted text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionMetadata {
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    /// Image sources referenced by the document, in order
    pub images: Vec<String>,
    pub word_count: usize,
}

/// Output of a single conversion
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionResult {
    pub content: String,
    pub metadata: ConversionMetadata,
    /// Variables referenced in include mode, for the variables file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted_variables: Option<Vec<ExtractedVariable>>,
}

/// Outcome of converting one file of a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    Converted(ConversionResult),
    /// Whole document excluded by a condition; the batch goes on
    Skipped {
        source_name: String,
        condition: String,
        reason: String,
    },
}

/// Converts Flare topics with a configurable set of list repairs
pub struct ConversionService {
    repairs: RepairRules,
}

impl ConversionService {
    /// Service with the built-in list repairs
    pub fn new() -> Self {
        Self {
            repairs: RepairRules::builtin(),
        }
    }

    pub fn with_repair_rules(repairs: RepairRules) -> Self {
        Self { repairs }
    }

    /// Add or replace a named list repair
    pub fn add_repair_rule(&mut self, name: &str, rule: RepairRule) -> &mut Self {
        self.repairs.add(name, rule);
        self
    }

    pub fn remove_repair_rule(&mut self, name: &str) -> &mut Self {
        self.repairs.remove(name);
        self
    }

    pub fn repair_rules(&self) -> &RepairRules {
        &self.repairs
    }

    /// Convert one document.
    ///
    /// Fails before any processing on invalid options, and when an excluded
    /// condition removes the whole document.
    pub fn convert(&self, input: &str, options: &ConversionOptions) -> Result<ConversionResult> {
        options.validate()?;
        let source = options.source();
        tracing::debug!(source, format = %options.format, bytes = input.len(), "converting document");

        let preprocessor = Preprocessor::with_repairs(options, &self.repairs)?;
        let preprocessed = preprocessor.run(input);
        if let Some(condition) = preprocessed.excluded {
            return Err(ConversionError::ExcludedContent {
                source_name: source.to_string(),
                condition,
            });
        }

        let mut ctx = ConvertContext::new(options);
        let document = convert_document(&preprocessed.root, &mut ctx);
        let mut content = render(&document, options);

        let mut metadata = ConversionMetadata {
            warnings: preprocessed.warnings,
            errors: Vec::new(),
            images: ctx.images.into_iter().collect(),
            word_count: document.word_count(),
        };
        for warning in ctx.warnings {
            if !metadata.warnings.contains(&warning) {
                metadata.warnings.push(warning);
            }
        }
        if options.format == OutputFormat::Zendesk
            && options.variable_options.variable_mode != VariableMode::Flatten
        {
            metadata
                .warnings
                .push("Zendesk output has no variable syntax; variables were replaced by their values".to_string());
        }

        if options.format == OutputFormat::Asciidoc && options.asciidoc_options.enable_validation {
            content = self.check_asciidoc(content, options, &mut metadata);
        }

        let extracted_variables = (options.variable_options.variable_mode == VariableMode::Include
            && options.format != OutputFormat::Zendesk)
            .then_some(preprocessed.variables);

        tracing::debug!(
            source,
            warnings = metadata.warnings.len(),
            errors = metadata.errors.len(),
            words = metadata.word_count,
            "converted document"
        );
        Ok(ConversionResult {
            content,
            metadata,
            extracted_variables,
        })
    }

    /// Convert one file of a batch. Whole-document exclusion is reported as
    /// [`BatchOutcome::Skipped`] instead of an error.
    pub fn convert_batch_item(&self, source: &str, input: &str, options: &ConversionOptions) -> Result<BatchOutcome> {
        let mut options = options.clone();
        options.source_name = Some(source.to_string());

        match self.convert(input, &options) {
            Ok(result) => Ok(BatchOutcome::Converted(result)),
            Err(ConversionError::ExcludedContent { source_name, condition }) => {
                tracing::warn!(source = %source_name, %condition, "skipping excluded document");
                Ok(BatchOutcome::Skipped {
                    reason: format!("content excluded by condition '{}'", condition),
                    source_name,
                    condition,
                })
            }
            Err(err) => Err(err),
        }
    }

    /// Validate (and optionally auto-fix) AsciiDoc output into `metadata`
    fn check_asciidoc(&self, content: String, options: &ConversionOptions, metadata: &mut ConversionMetadata) -> String {
        let validation = ValidationOptions::from_asciidoc(&options.asciidoc_options);
        let (content, report) = if options.asciidoc_options.auto_fix {
            let fixed = auto_fix(&content, &validation);
            for fix in &fixed.fixes_applied {
                metadata
                    .warnings
                    .push(format!("Auto-fix '{}' applied ({} change{})", fix.name, fix.count, plural(fix.count)));
            }
            (fixed.content, fixed.remaining_issues)
        } else {
            let report = validate(&content, &validation);
            (content, report)
        };

        for issue in report.iter() {
            match issue.severity {
                Severity::Error => metadata.errors.push(issue.summary()),
                Severity::Warning | Severity::Info => metadata.warnings.push(issue.summary()),
            }
        }
        tracing::debug!(issues = report.issue_count, status = ?report.status, "validated asciidoc output");
        content
    }
}

impl Default for ConversionService {
    fn default() -> Self {
        Self::new()
    }
}

fn plural(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}
