//! flare-core - Document AST, target emitters and AsciiDoc validation
//!
//! This crate holds the format-neutral document tree and everything that turns
//! it into text. It is used by `flare-convert`, which builds the tree from
//! preprocessed MadCap Flare HTML.
//!
//! # Architecture
//!
//! ```text
//!                   ┌──────────────┐ ──asciidoc──▶ AsciiDoc ──▶ validate
//! DOM (flare-convert)▶│ Document AST │ ──markdown──▶ Writerside Markdown
//!                   └──────────────┘ ──zendesk───▶ Zendesk HTML
//!                                         │
//!                                    postprocess (per format, idempotent)
//! ```
//!
//! # Example
//!
//! ```rust
//! use flare_core::{render, Block, ConversionOptions, Inline, OutputFormat};
//!
//! let ast = Block::Document(vec![
//!     Block::Heading {
//!         level: 1,
//!         content: vec![Inline::Text("Hello World".to_string())],
//!         id: None,
//!     },
//!     Block::Paragraph(vec![
//!         Inline::Text("This is ".to_string()),
//!         Inline::Strong(vec![Inline::Text("bold".to_string())]),
//!         Inline::Text(" text.".to_string()),
//!     ]),
//! ]);
//!
//! let adoc = render(&ast, &ConversionOptions::new(OutputFormat::Asciidoc));
//! assert_eq!(adoc, "= Hello World\n\nThis is *bold* text.\n");
//! ```

mod ast;
pub mod emit;
mod options;
pub mod postprocess;
pub mod text;
pub mod validate;

pub use ast::{
    inlines_text, AdmonitionKind, Block, DefinitionItem, Image, Inline, LinkTarget, List,
    ListItem, ListStyle, Table, TableCell, TableGrid, TableRow, ASCIIDOC_MAX_LIST_DEPTH,
};
pub use emit::{render, serialize};
pub use options::{
    AsciidocOptions, ConditionOptions, ConversionOptions, HeadingStyle, InputType,
    MarkdownOptions, OutputFormat, TableFrame, TableGridLines, ValidationStrictness,
    VariableMode, VariableOptions, ZendeskOptions, DEFAULT_EXCLUDE_PATTERNS,
};

use thiserror::Error;

/// Errors raised while reading conversion options
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Unsupported input type: {0}")]
    UnsupportedInputType(String),

    #[error("Unsupported variable mode: {0}")]
    UnsupportedVariableMode(String),

    #[error("Unsupported validation strictness: {0}")]
    UnsupportedStrictness(String),

    #[error("Invalid option: {0}")]
    InvalidOption(String),
}
