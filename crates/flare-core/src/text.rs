//! Line-oriented views of emitted documents
//!
//! Post-processing and validation work line by line and must leave delimited
//! literal blocks alone. `SourceText` splits a document into lines and marks
//! which of them belong to a verbatim region (delimiters included).

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::options::OutputFormat;

/// AsciiDoc inline literals: code spans, `+` passthroughs and `pass:[]` macros
static INLINE_LITERAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"``.+?``|`[^`]+`|\+\+\+.+?\+\+\+|\+\+.+?\+\+|\+[^+\s](?:[^+]*[^+\s])?\+|pass:[a-z,]*\[(?:\\\]|[^\]])*\]")
        .expect("hardcoded inline literal regex")
});

/// A document split into lines with verbatim regions marked
#[derive(Debug, Clone)]
pub struct SourceText<'a> {
    lines: Vec<&'a str>,
    verbatim: Vec<bool>,
}

impl<'a> SourceText<'a> {
    pub fn new(text: &'a str, format: OutputFormat) -> Self {
        let lines: Vec<&str> = text.lines().collect();
        let verbatim = verbatim_mask(&lines, format);
        Self { lines, verbatim }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Line by zero-based index
    pub fn line(&self, index: usize) -> Option<&'a str> {
        self.lines.get(index).copied()
    }

    pub fn is_verbatim(&self, index: usize) -> bool {
        self.verbatim.get(index).copied().unwrap_or(false)
    }

    /// Lines outside verbatim regions as `(1-based line number, text)`
    pub fn prose_lines(&self) -> impl Iterator<Item = (usize, &'a str)> + '_ {
        self.lines
            .iter()
            .enumerate()
            .filter(|(i, _)| !self.verbatim[*i])
            .map(|(i, line)| (i + 1, *line))
    }

    /// All lines as `(1-based line number, text)`
    pub fn all_lines(&self) -> impl Iterator<Item = (usize, &'a str)> + '_ {
        self.lines.iter().enumerate().map(|(i, line)| (i + 1, *line))
    }
}

/// AsciiDoc delimiter that opens a literal region (`----`, `....`, `++++`, `////`)
pub fn asciidoc_verbatim_delimiter(line: &str) -> Option<&str> {
    let line = line.trim_end();
    let first = line.chars().next()?;
    if matches!(first, '-' | '.' | '+' | '/') && line.len() >= 4 && line.chars().all(|c| c == first) {
        Some(line)
    } else {
        None
    }
}

/// Markdown code fence (three or more backticks or tildes), returned as `(char, length)`
pub fn markdown_fence(line: &str) -> Option<(char, usize)> {
    let trimmed = line.trim_start();
    if line.len() - trimmed.len() > 3 {
        return None;
    }
    let first = trimmed.chars().next()?;
    if first != '`' && first != '~' {
        return None;
    }
    let run = trimmed.chars().take_while(|&c| c == first).count();
    (run >= 3).then_some((first, run))
}

/// Mark lines that belong to verbatim regions for the given format
pub fn verbatim_mask(lines: &[&str], format: OutputFormat) -> Vec<bool> {
    let mut mask = vec![false; lines.len()];
    match format {
        OutputFormat::Asciidoc => {
            let mut open: Option<&str> = None;
            for (i, line) in lines.iter().enumerate() {
                match open {
                    Some(delim) => {
                        mask[i] = true;
                        if line.trim_end() == delim {
                            open = None;
                        }
                    }
                    None => {
                        if let Some(delim) = asciidoc_verbatim_delimiter(line) {
                            mask[i] = true;
                            open = Some(delim);
                        }
                    }
                }
            }
        }
        OutputFormat::WritersideMarkdown => {
            let mut open: Option<(char, usize)> = None;
            for (i, line) in lines.iter().enumerate() {
                match open {
                    Some((ch, len)) => {
                        mask[i] = true;
                        if let Some((c, n)) = markdown_fence(line) {
                            let rest = line.trim().trim_start_matches(c);
                            if c == ch && n >= len && rest.is_empty() {
                                open = None;
                            }
                        }
                    }
                    None => {
                        if let Some(fence) = markdown_fence(line) {
                            mask[i] = true;
                            open = Some(fence);
                        }
                    }
                }
            }
        }
        OutputFormat::Zendesk => {
            let mut open = false;
            for (i, line) in lines.iter().enumerate() {
                let lower = line.to_ascii_lowercase();
                if !open && lower.contains("<pre") {
                    open = true;
                }
                if open {
                    mask[i] = true;
                    if lower.contains("</pre>") {
                        open = false;
                    }
                }
            }
        }
    }
    mask
}

/// Copy of an AsciiDoc line with the content of inline literals blanked out.
/// Byte offsets match the original, so matches found in the mask can be
/// applied to the line itself.
pub fn mask_inline_literals(line: &str) -> Cow<'_, str> {
    if !INLINE_LITERAL.is_match(line) {
        return Cow::Borrowed(line);
    }
    let mut masked = String::with_capacity(line.len());
    let mut last = 0;
    for m in INLINE_LITERAL.find_iter(line) {
        masked.push_str(&line[last..m.start()]);
        for c in m.as_str().chars() {
            masked.extend(std::iter::repeat(' ').take(c.len_utf8()));
        }
        last = m.end();
    }
    masked.push_str(&line[last..]);
    Cow::Owned(masked)
}

/// Line is empty or whitespace only
pub fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

/// AsciiDoc section title (`= Title` through `====== Title`), returned as level
pub fn asciidoc_heading_level(line: &str) -> Option<usize> {
    let trimmed = line.trim_start();
    let level = trimmed.chars().take_while(|&c| c == '=').count();
    if (1..=6).contains(&level) && trimmed[level..].starts_with(' ') && !trimmed[level..].trim().is_empty() {
        Some(level)
    } else {
        None
    }
}

/// Markdown ATX heading level
pub fn markdown_heading_level(line: &str) -> Option<usize> {
    let trimmed = line.trim_start();
    let level = trimmed.chars().take_while(|&c| c == '#').count();
    if (1..=6).contains(&level) && trimmed[level..].starts_with(' ') {
        Some(level)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_literals_masked() {
        let line = "Run `docker pull myimage:latest` or +a|b+ then pass:[x]";
        let masked = mask_inline_literals(line);
        assert_eq!(masked.len(), line.len());
        assert!(masked.starts_with("Run "));
        assert!(!masked.contains("image"));
        assert!(!masked.contains('|'));
        assert!(masked.contains(" or "));
        assert!(masked.contains(" then "));
    }

    #[test]
    fn test_plain_line_not_copied() {
        assert!(matches!(mask_inline_literals("a + b + c"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_asciidoc_listing_is_verbatim() {
        let text = "Intro\n\n----\n\n\nNOTE: inside\n----\n\nAfter";
        let source = SourceText::new(text, OutputFormat::Asciidoc);
        assert!(!source.is_verbatim(0));
        assert!(source.is_verbatim(2));
        assert!(source.is_verbatim(5));
        assert!(source.is_verbatim(6));
        assert!(!source.is_verbatim(8));
    }

    #[test]
    fn test_markdown_fence_requires_matching_close() {
        let lines = vec!["````", "```", "still code", "````", "text"];
        let mask = verbatim_mask(&lines, OutputFormat::WritersideMarkdown);
        assert_eq!(mask, vec![true, true, true, true, false]);
    }

    #[test]
    fn test_zendesk_pre_region() {
        let lines = vec!["<p>a</p>", "<pre><code>", "  x", "</code></pre>", "<p>b</p>"];
        let mask = verbatim_mask(&lines, OutputFormat::Zendesk);
        assert_eq!(mask, vec![false, true, true, true, false]);
    }

    #[test]
    fn test_heading_levels() {
        assert_eq!(asciidoc_heading_level("== Section"), Some(2));
        assert_eq!(asciidoc_heading_level("  = Title"), Some(1));
        assert_eq!(asciidoc_heading_level("===="), None);
        assert_eq!(asciidoc_heading_level("==Section"), None);
        assert_eq!(markdown_heading_level("### Three"), Some(3));
        assert_eq!(markdown_heading_level("#hashtag"), None);
    }

    #[test]
    fn test_prose_lines_numbering() {
        let text = "a\n----\nb\n----\nc";
        let source = SourceText::new(text, OutputFormat::Asciidoc);
        let prose: Vec<_> = source.prose_lines().collect();
        assert_eq!(prose, vec![(1, "a"), (5, "c")]);
    }
}
