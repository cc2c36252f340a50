//! Target emitters
//!
//! Each emitter turns the document AST into text for one output format. The
//! output of `serialize` is raw; `render` runs the format's post-processor on
//! top of it.

pub mod asciidoc;
pub mod markdown;
pub mod zendesk;

use crate::ast::Block;
use crate::options::{ConversionOptions, OutputFormat};
use crate::postprocess;

/// Serialize a block in the configured output format
pub fn serialize(block: &Block, options: &ConversionOptions) -> String {
    match options.format {
        OutputFormat::Asciidoc => asciidoc::serialize(block, options),
        OutputFormat::WritersideMarkdown => markdown::serialize(block, options),
        OutputFormat::Zendesk => zendesk::serialize(block, options),
    }
}

/// Serialize and post-process a block in the configured output format
pub fn render(block: &Block, options: &ConversionOptions) -> String {
    let raw = serialize(block, options);
    tracing::trace!(format = %options.format, bytes = raw.len(), "serialized document");
    postprocess::for_format(&raw, options.format)
}
