//! # flare-convert
//!
//! Convert MadCap Flare HTML topics to AsciiDoc, Writerside Markdown and
//! Zendesk HTML.
//!
//! ## Design
//!
//! A conversion runs in stages, each owning its data for the duration of one
//! call:
//!
//! - **Preprocessing**: text repairs, parsing into an owned [`Node`] tree,
//!   conditional-text exclusion, variable and snippet resolution, and an
//!   ordered set of named list repair rules
//! - **Conversion**: a DOM walk that resolves list depth and style and builds
//!   the format-neutral `flare_core` document AST
//! - **Emission**: `flare_core` renders the AST to the target format and runs
//!   the post-processor (plus the validator for AsciiDoc, when enabled)
//!
//! ## Example
//!
//! ```rust
//! use flare_convert::{ConversionOptions, ConversionService, OutputFormat};
//!
//! let service = ConversionService::new();
//! let options = ConversionOptions::new(OutputFormat::Asciidoc);
//!
//! let result = service
//!     .convert("<h1>Install</h1><ol><li>Download</li><li>Run</li></ol>", &options)
//!     .unwrap();
//! assert_eq!(result.content, "= Install\n\n. Download\n. Run\n");
//! ```

mod convert;
pub mod html;
mod images;
mod links;
pub mod lists;
pub mod node;
pub mod preprocess;
mod service;
mod utilities;

pub use convert::{convert_document, ConvertContext};
pub use html::{parse_document, parse_fragment, ParsedDocument};
pub use lists::{ListContext, ListFrame};
pub use node::{Element, Node};
pub use preprocess::{preprocess, preprocess_tree, ExtractedVariable, PreprocessOutput, Preprocessor};
pub use service::{BatchOutcome, ConversionMetadata, ConversionResult, ConversionService};
pub use utilities::*;

pub use flare_core::validate::{ValidationIssue, ValidationReport, ValidationStatus};
pub use flare_core::{
    AsciidocOptions, ConditionOptions, ConversionOptions, FormatError, InputType, MarkdownOptions,
    OutputFormat, ValidationStrictness, VariableMode, VariableOptions, ZendeskOptions,
};

/// Error type for conversion operations
#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    /// Unsupported or inconsistent options, raised before any processing
    #[error(transparent)]
    Options(#[from] FormatError),

    #[error("{source_name}: content excluded by condition '{condition}'")]
    ExcludedContent { source_name: String, condition: String },

    #[error("Invalid options: {0}")]
    InvalidOptions(String),
}

pub type Result<T> = std::result::Result<T, ConversionError>;

/// Convert one document with a default service
pub fn convert(input: &str, options: &ConversionOptions) -> Result<ConversionResult> {
    ConversionService::new().convert(input, options)
}
