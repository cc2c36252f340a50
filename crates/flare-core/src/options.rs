//! Configuration options for a conversion call
//!
//! Options are plain structs with `Default` impls. They deserialize from the
//! camelCase request shape used by callers (`{"format": "asciidoc",
//! "asciidocOptions": {...}}`), and unknown enum values are rejected before
//! any processing starts.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::FormatError;

/// Target output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    #[default]
    Asciidoc,
    WritersideMarkdown,
    Zendesk,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Asciidoc => "asciidoc",
            OutputFormat::WritersideMarkdown => "writerside-markdown",
            OutputFormat::Zendesk => "zendesk",
        }
    }

    /// File extension of converted documents, used when rewriting cross-references
    pub fn target_extension(self) -> &'static str {
        match self {
            OutputFormat::Asciidoc => ".adoc",
            OutputFormat::WritersideMarkdown => ".md",
            OutputFormat::Zendesk => ".html",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asciidoc" => Ok(OutputFormat::Asciidoc),
            "writerside-markdown" => Ok(OutputFormat::WritersideMarkdown),
            "zendesk" => Ok(OutputFormat::Zendesk),
            _ => Err(FormatError::UnsupportedFormat(s.to_string())),
        }
    }
}

/// Dialect of the input document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    #[default]
    Html,
    /// HTML produced by an upstream Word converter
    Word,
    Madcap,
}

impl FromStr for InputType {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "html" => Ok(InputType::Html),
            "word" => Ok(InputType::Word),
            "madcap" => Ok(InputType::Madcap),
            _ => Err(FormatError::UnsupportedInputType(s.to_string())),
        }
    }
}

/// How `MadCap:variable` references are resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableMode {
    /// Substitute the variable's value as literal text
    #[default]
    Flatten,
    /// Emit a placeholder and report the variable for extraction
    Include,
    /// Emit a placeholder only
    Reference,
}

impl FromStr for VariableMode {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "flatten" => Ok(VariableMode::Flatten),
            "include" => Ok(VariableMode::Include),
            "reference" => Ok(VariableMode::Reference),
            _ => Err(FormatError::UnsupportedVariableMode(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VariableOptions {
    pub variable_mode: VariableMode,
    /// Known variable values keyed by `Set.Name`
    pub variables: IndexMap<String, String>,
}

/// Condition patterns excluded when none are configured
pub const DEFAULT_EXCLUDE_PATTERNS: &[&str] = &[
    r"deprecat",
    r"internal",
    r"print[\s._-]?only",
    r"cancel+ed",
    r"paused",
    r"(?:^|\.)(?:red|black|gr[ae]y|orange|purple)$",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConditionOptions {
    /// Regex patterns, matched case-insensitively against each condition name
    pub exclude_patterns: Vec<String>,
    /// Condition names that are always kept, even if a pattern matches
    pub include_conditions: Vec<String>,
}

impl Default for ConditionOptions {
    fn default() -> Self {
        Self {
            exclude_patterns: DEFAULT_EXCLUDE_PATTERNS
                .iter()
                .map(|p| p.to_string())
                .collect(),
            include_conditions: Vec::new(),
        }
    }
}

/// Which validation severities are reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStrictness {
    /// Errors, warnings and info
    Strict,
    /// Errors and warnings
    #[default]
    Normal,
    /// Errors only
    Lenient,
}

impl FromStr for ValidationStrictness {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(ValidationStrictness::Strict),
            "normal" => Ok(ValidationStrictness::Normal),
            "lenient" => Ok(ValidationStrictness::Lenient),
            _ => Err(FormatError::UnsupportedStrictness(s.to_string())),
        }
    }
}

/// AsciiDoc table `frame` attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableFrame {
    #[default]
    All,
    Ends,
    Sides,
    None,
}

impl TableFrame {
    pub fn as_str(self) -> &'static str {
        match self {
            TableFrame::All => "all",
            TableFrame::Ends => "ends",
            TableFrame::Sides => "sides",
            TableFrame::None => "none",
        }
    }
}

/// AsciiDoc table `grid` attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableGridLines {
    #[default]
    All,
    Rows,
    Cols,
    None,
}

impl TableGridLines {
    pub fn as_str(self) -> &'static str {
        match self {
            TableGridLines::All => "all",
            TableGridLines::Rows => "rows",
            TableGridLines::Cols => "cols",
            TableGridLines::None => "none",
        }
    }
}

/// Options for the AsciiDoc emitter and validator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AsciidocOptions {
    /// Validate the emitted document and report issues in the result metadata
    pub enable_validation: bool,
    pub validation_strictness: ValidationStrictness,
    /// Run the auto-fixer before validating
    pub auto_fix: bool,
    pub table_frame: TableFrame,
    pub table_grid: TableGridLines,
    /// Derive `cols` weights from cell content length
    pub auto_column_widths: bool,
    /// Treat the first row as header when the source marks none
    pub first_row_header: bool,
    /// Added to every heading level (`h1` + 1 → `==`)
    pub heading_offset: u8,
    /// Attribute entries written after the document title (`toc` → `:toc:`)
    pub document_attributes: IndexMap<String, String>,
    /// Include target for extracted variables (`include` variable mode)
    pub variables_file: Option<String>,
    /// Image files known to exist; enables the missing-image check when set
    pub available_images: Option<BTreeSet<String>>,
}

impl Default for AsciidocOptions {
    fn default() -> Self {
        Self {
            enable_validation: false,
            validation_strictness: ValidationStrictness::Normal,
            auto_fix: false,
            table_frame: TableFrame::All,
            table_grid: TableGridLines::All,
            auto_column_widths: true,
            first_row_header: false,
            heading_offset: 0,
            document_attributes: IndexMap::new(),
            variables_file: None,
            available_images: None,
        }
    }
}

/// Heading style options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeadingStyle {
    /// Use setext-style headings (underlined with = or -)
    /// Only works for h1 and h2, falls back to ATX for h3-h6
    Setext,
    /// Use ATX-style headings (prefixed with #)
    #[default]
    Atx,
}

/// Options for the Writerside Markdown emitter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MarkdownOptions {
    /// Heading style (setext or atx)
    pub heading_style: HeadingStyle,

    /// Horizontal rule string
    pub hr: String,

    /// Bullet list marker
    pub bullet_list_marker: char,

    /// Fence string for code blocks
    pub fence: String,

    /// Emphasis delimiter
    pub em_delimiter: char,

    /// Strong delimiter
    pub strong_delimiter: String,
}

impl Default for MarkdownOptions {
    fn default() -> Self {
        Self {
            heading_style: HeadingStyle::Atx,
            hr: "---".to_string(),
            bullet_list_marker: '-',
            fence: "```".to_string(),
            em_delimiter: '_',
            strong_delimiter: "**".to_string(),
        }
    }
}

/// Options for the Zendesk HTML emitter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ZendeskOptions {
    /// Class prefix for callouts (`callout` → `class="callout callout-note"`)
    pub callout_class: String,
    /// Open external links in a new tab
    pub external_links_new_tab: bool,
}

impl Default for ZendeskOptions {
    fn default() -> Self {
        Self {
            callout_class: "callout".to_string(),
            external_links_new_tab: true,
        }
    }
}

/// Options for one conversion call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConversionOptions {
    pub format: OutputFormat,
    pub input_type: InputType,
    /// Identifier used in error messages (file name, URL, ...)
    pub source_name: Option<String>,
    pub variable_options: VariableOptions,
    pub conditions: ConditionOptions,
    pub asciidoc_options: AsciidocOptions,
    pub markdown_options: MarkdownOptions,
    pub zendesk_options: ZendeskOptions,
    /// Rewrite image paths into `images_directory` and report them for copying
    pub extract_images: bool,
    pub images_directory: String,
    /// Pre-loaded snippet sources keyed by their `src` reference
    pub snippets: IndexMap<String, String>,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            format: OutputFormat::Asciidoc,
            input_type: InputType::Html,
            source_name: None,
            variable_options: VariableOptions::default(),
            conditions: ConditionOptions::default(),
            asciidoc_options: AsciidocOptions::default(),
            markdown_options: MarkdownOptions::default(),
            zendesk_options: ZendeskOptions::default(),
            extract_images: false,
            images_directory: "images".to_string(),
            snippets: IndexMap::new(),
        }
    }
}

impl ConversionOptions {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            ..Default::default()
        }
    }

    /// Options for a format given by name; unknown names are rejected
    pub fn for_format(format: &str) -> Result<Self, FormatError> {
        Ok(Self::new(format.parse()?))
    }

    /// Name used in error messages
    pub fn source(&self) -> &str {
        self.source_name.as_deref().unwrap_or("<input>")
    }

    /// Check option values that the type system does not rule out
    pub fn validate(&self) -> Result<(), FormatError> {
        let md = &self.markdown_options;
        if !matches!(md.bullet_list_marker, '*' | '-' | '+') {
            return Err(FormatError::InvalidOption(format!(
                "bulletListMarker must be one of '*', '-', '+', got '{}'",
                md.bullet_list_marker
            )));
        }
        if !matches!(md.em_delimiter, '_' | '*') {
            return Err(FormatError::InvalidOption(format!(
                "emDelimiter must be '_' or '*', got '{}'",
                md.em_delimiter
            )));
        }
        if md.fence.len() < 3 || !(md.fence.chars().all(|c| c == '`') || md.fence.chars().all(|c| c == '~')) {
            return Err(FormatError::InvalidOption(format!(
                "fence must be at least three backticks or tildes, got '{}'",
                md.fence
            )));
        }
        if self.asciidoc_options.heading_offset > 5 {
            return Err(FormatError::InvalidOption(format!(
                "headingOffset must be at most 5, got {}",
                self.asciidoc_options.heading_offset
            )));
        }
        if self.extract_images && self.images_directory.trim().is_empty() {
            return Err(FormatError::InvalidOption(
                "imagesDirectory must not be empty when extractImages is set".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_str() {
        assert_eq!("asciidoc".parse::<OutputFormat>().unwrap(), OutputFormat::Asciidoc);
        assert_eq!(
            "writerside-markdown".parse::<OutputFormat>().unwrap(),
            OutputFormat::WritersideMarkdown
        );
        assert_eq!("Zendesk".parse::<OutputFormat>().unwrap(), OutputFormat::Zendesk);
        assert!(matches!(
            "docx".parse::<OutputFormat>(),
            Err(FormatError::UnsupportedFormat(f)) if f == "docx"
        ));
    }

    #[test]
    fn test_target_extension() {
        assert_eq!(OutputFormat::Asciidoc.target_extension(), ".adoc");
        assert_eq!(OutputFormat::WritersideMarkdown.target_extension(), ".md");
        assert_eq!(OutputFormat::Zendesk.target_extension(), ".html");
    }

    #[test]
    fn test_deserialize_request_shape() {
        let json = r#"{
            "format": "writerside-markdown",
            "inputType": "madcap",
            "variableOptions": { "variableMode": "reference" },
            "asciidocOptions": { "enableValidation": true, "validationStrictness": "strict", "tableFrame": "ends" }
        }"#;
        let options: ConversionOptions = serde_json::from_str(json).unwrap();
        assert_eq!(options.format, OutputFormat::WritersideMarkdown);
        assert_eq!(options.input_type, InputType::Madcap);
        assert_eq!(options.variable_options.variable_mode, VariableMode::Reference);
        assert!(options.asciidoc_options.enable_validation);
        assert_eq!(
            options.asciidoc_options.validation_strictness,
            ValidationStrictness::Strict
        );
        assert_eq!(options.asciidoc_options.table_frame, TableFrame::Ends);
        assert!(options.asciidoc_options.auto_column_widths);
    }

    #[test]
    fn test_deserialize_rejects_unknown_format() {
        let json = r#"{ "format": "pdf" }"#;
        assert!(serde_json::from_str::<ConversionOptions>(json).is_err());
    }

    #[test]
    fn test_validate_rejects_bad_marker() {
        let mut options = ConversionOptions::default();
        options.markdown_options.bullet_list_marker = '#';
        assert!(options.validate().is_err());
        assert!(ConversionOptions::default().validate().is_ok());
    }

    #[test]
    fn test_default_exclude_patterns_present() {
        let options = ConditionOptions::default();
        assert_eq!(options.exclude_patterns.len(), DEFAULT_EXCLUDE_PATTERNS.len());
    }
}
