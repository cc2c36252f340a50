//! Post-processing passes for emitted documents
//!
//! Each format runs an ordered list of line passes until none of them reports
//! a change, so running the post-processor on its own output is a no-op.
//! Lines inside delimited literal blocks are never touched.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::options::OutputFormat;
use crate::text::{asciidoc_heading_level, is_blank, markdown_heading_level, verbatim_mask};

/// Upper bound on full rounds; passes converge well before this
const MAX_ROUNDS: usize = 8;

static ADMONITION_STYLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\[(?:NOTE|TIP|IMPORTANT|WARNING|CAUTION)\]\s*$").expect("hardcoded admonition style regex")
});

static ADMONITION_PARAGRAPH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:NOTE|TIP|IMPORTANT|WARNING|CAUTION):\s").expect("hardcoded admonition paragraph regex")
});

static EXAMPLE_DELIMITER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^={4,}\s*$").expect("hardcoded example delimiter regex"));

static ATTRIBUTE_ENTRY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^:!?[\w-]+!?:(?:\s|$)").expect("hardcoded attribute entry regex"));

static MARKDOWN_IMAGE_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^!\[[^\]]*\]\([^)]*\)\s*$").expect("hardcoded markdown image regex"));

/// A named line pass; returns the number of changes made
struct Pass {
    name: &'static str,
    apply: fn(&mut Vec<String>, OutputFormat) -> usize,
}

static ASCIIDOC_PASSES: &[Pass] = &[
    Pass {
        name: "trailing_whitespace",
        apply: trim_trailing_whitespace,
    },
    Pass {
        name: "heading_indent",
        apply: strip_heading_indent,
    },
    Pass {
        name: "orphaned_continuations",
        apply: remove_orphaned_continuations,
    },
    Pass {
        name: "block_spacing",
        apply: ensure_block_spacing,
    },
    Pass {
        name: "blank_lines",
        apply: collapse_blank_lines,
    },
    Pass {
        name: "document_edges",
        apply: trim_document_edges,
    },
];

static MARKDOWN_PASSES: &[Pass] = &[
    Pass {
        name: "heading_indent",
        apply: strip_heading_indent,
    },
    Pass {
        name: "block_spacing",
        apply: ensure_block_spacing,
    },
    Pass {
        name: "blank_lines",
        apply: collapse_blank_lines,
    },
    Pass {
        name: "document_edges",
        apply: trim_document_edges,
    },
];

static ZENDESK_PASSES: &[Pass] = &[
    Pass {
        name: "trailing_whitespace",
        apply: trim_trailing_whitespace,
    },
    Pass {
        name: "blank_lines",
        apply: collapse_blank_lines,
    },
    Pass {
        name: "document_edges",
        apply: trim_document_edges,
    },
];

/// Clean up emitted AsciiDoc
pub fn asciidoc(input: &str) -> String {
    run(input, OutputFormat::Asciidoc, ASCIIDOC_PASSES)
}

/// Clean up emitted Writerside Markdown
pub fn markdown(input: &str) -> String {
    run(input, OutputFormat::WritersideMarkdown, MARKDOWN_PASSES)
}

/// Clean up emitted Zendesk HTML
pub fn zendesk(input: &str) -> String {
    run(input, OutputFormat::Zendesk, ZENDESK_PASSES)
}

pub fn for_format(input: &str, format: OutputFormat) -> String {
    match format {
        OutputFormat::Asciidoc => asciidoc(input),
        OutputFormat::WritersideMarkdown => markdown(input),
        OutputFormat::Zendesk => zendesk(input),
    }
}

fn run(input: &str, format: OutputFormat, passes: &[Pass]) -> String {
    let mut lines: Vec<String> = input.lines().map(str::to_string).collect();

    for round in 0..MAX_ROUNDS {
        let mut changes = 0;
        for pass in passes {
            let count = (pass.apply)(&mut lines, format);
            if count > 0 {
                tracing::trace!(pass = pass.name, round, changes = count, "post-process pass applied");
            }
            changes += count;
        }
        if changes == 0 {
            break;
        }
    }

    let mut out = lines.join("\n");
    if !out.is_empty() {
        out.push('\n');
    }
    out
}

fn mask_of(lines: &[String], format: OutputFormat) -> Vec<bool> {
    let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
    verbatim_mask(&refs, format)
}

fn is_continuation(line: &str) -> bool {
    line.trim() == "+"
}

pub(crate) fn trim_trailing_whitespace(lines: &mut Vec<String>, format: OutputFormat) -> usize {
    let mask = mask_of(lines, format);
    let mut count = 0;
    for (line, verbatim) in lines.iter_mut().zip(mask) {
        if verbatim {
            continue;
        }
        let trimmed = line.trim_end().len();
        if trimmed != line.len() {
            line.truncate(trimmed);
            count += 1;
        }
    }
    count
}

fn strip_heading_indent(lines: &mut Vec<String>, format: OutputFormat) -> usize {
    let mask = mask_of(lines, format);
    let mut count = 0;
    for (line, verbatim) in lines.iter_mut().zip(mask) {
        if verbatim || !line.starts_with([' ', '\t']) {
            continue;
        }
        let indent = line.len() - line.trim_start().len();
        let heading = match format {
            OutputFormat::Asciidoc => asciidoc_heading_level(line).is_some(),
            // Deeper indentation belongs to list items or code
            OutputFormat::WritersideMarkdown => indent <= 3 && markdown_heading_level(line).is_some(),
            OutputFormat::Zendesk => false,
        };
        if heading {
            *line = line.trim_start().to_string();
            count += 1;
        }
    }
    count
}

/// Drop `+` lines that have nothing to attach (document edge, blank neighbour,
/// or another `+`), repeating until none is left
pub(crate) fn remove_orphaned_continuations(lines: &mut Vec<String>, format: OutputFormat) -> usize {
    if format != OutputFormat::Asciidoc {
        return 0;
    }
    let mut count = 0;
    loop {
        let mask = mask_of(lines, format);
        let last = lines.len().saturating_sub(1);
        let orphan = (0..lines.len()).find(|&i| {
            !mask[i]
                && is_continuation(&lines[i])
                && (i == 0
                    || i == last
                    || is_blank(&lines[i - 1])
                    || is_blank(&lines[i + 1])
                    || is_continuation(&lines[i - 1]))
        });
        match orphan {
            Some(i) => {
                lines.remove(i);
                count += 1;
            }
            None => break,
        }
    }
    count
}

/// Line that attaches to the block below it (anchor, attribute list, title)
fn is_block_prefix(line: &str) -> bool {
    let line = line.trim_end();
    let attribute_list = line.starts_with('[') && line.ends_with(']');
    let title = line.starts_with('.')
        && line.len() > 1
        && !line[1..].starts_with(|c: char| c.is_whitespace() || c == '.');
    attribute_list || title
}

/// Extent `(first line, last line)` of a block that wants blank lines around it.
/// `None` as last line means only the leading blank line is enforced.
fn spaced_block(lines: &[String], i: usize, format: OutputFormat) -> Option<(usize, Option<usize>)> {
    let line = lines[i].as_str();
    match format {
        OutputFormat::Asciidoc => {
            let end = if asciidoc_heading_level(line).is_some() && !line.starts_with([' ', '\t']) {
                Some(i)
            } else if line.starts_with("image::") {
                Some(i)
            } else if ADMONITION_STYLE.is_match(line) {
                let delim = lines.get(i + 1).filter(|l| EXAMPLE_DELIMITER.is_match(l))?;
                let delim = delim.trim_end();
                (i + 2..lines.len()).find(|&j| lines[j].trim_end() == delim)
            } else if ADMONITION_PARAGRAPH.is_match(line) {
                None
            } else {
                return None;
            };

            let mut start = i;
            while start > 0 && is_block_prefix(&lines[start - 1]) && !ADMONITION_STYLE.is_match(&lines[start - 1]) {
                start -= 1;
            }
            Some((start, end))
        }
        OutputFormat::WritersideMarkdown => {
            if line.starts_with('#') && markdown_heading_level(line).is_some() {
                Some((i, Some(i)))
            } else if MARKDOWN_IMAGE_LINE.is_match(line) {
                let end = match lines.get(i + 1) {
                    Some(next) if next.starts_with("{width") => i + 1,
                    _ => i,
                };
                Some((i, Some(end)))
            } else {
                None
            }
        }
        OutputFormat::Zendesk => None,
    }
}

/// Exactly one blank line around headings, admonitions and block images,
/// except next to continuation markers
pub(crate) fn ensure_block_spacing(lines: &mut Vec<String>, format: OutputFormat) -> usize {
    let mask = mask_of(lines, format);
    let mut inserts: Vec<usize> = Vec::new();

    for i in 0..lines.len() {
        if mask[i] {
            continue;
        }
        let Some((start, end)) = spaced_block(lines, i, format) else {
            continue;
        };
        if start > 0 {
            let prev = &lines[start - 1];
            if !is_blank(prev) && !is_continuation(prev) {
                inserts.push(start);
            }
        }
        if let Some(end) = end.filter(|&e| !mask[e]) {
            if let Some(next) = lines.get(end + 1) {
                let header_entry = format == OutputFormat::Asciidoc && ATTRIBUTE_ENTRY.is_match(next);
                if !is_blank(next) && !is_continuation(next) && !header_entry {
                    inserts.push(end + 1);
                }
            }
        }
    }

    inserts.sort_unstable();
    inserts.dedup();
    for &at in inserts.iter().rev() {
        lines.insert(at, String::new());
    }
    inserts.len()
}

pub(crate) fn collapse_blank_lines(lines: &mut Vec<String>, format: OutputFormat) -> usize {
    let mask = mask_of(lines, format);
    let before = lines.len();
    let mut kept: Vec<String> = Vec::with_capacity(lines.len());
    let mut previous_blank = false;
    for (line, verbatim) in lines.drain(..).zip(mask) {
        let blank = !verbatim && is_blank(&line);
        if blank && previous_blank {
            continue;
        }
        previous_blank = blank;
        kept.push(line);
    }
    *lines = kept;
    before - lines.len()
}

pub(crate) fn trim_document_edges(lines: &mut Vec<String>, _format: OutputFormat) -> usize {
    let mut count = 0;
    while lines.last().is_some_and(|l| is_blank(l)) {
        lines.pop();
        count += 1;
    }
    let leading = lines.iter().take_while(|l| is_blank(l)).count();
    lines.drain(..leading);
    count + leading
}
