//! Whitespace and marker repairs for emitted AsciiDoc
//!
//! Fixes never change words, only blank lines, continuation markers and list
//! marker layout. They run in a fixed order and the result is re-validated.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use super::{validate, ValidationOptions, ValidationReport};
use crate::options::OutputFormat;
use crate::postprocess::{
    collapse_blank_lines, ensure_block_spacing, remove_orphaned_continuations, trim_document_edges,
    trim_trailing_whitespace,
};
use crate::text::{is_blank, mask_inline_literals, verbatim_mask};

static ADMONITION_STYLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\[(?:NOTE|TIP|IMPORTANT|WARNING|CAUTION)\]\s*$").expect("hardcoded admonition style regex")
});

static EXAMPLE_DELIMITER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^={4,}\s*$").expect("hardcoded example delimiter regex"));

static INDENTED_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s+((?:\.{1,5}|\*{1,5})\s+\S)").expect("hardcoded indented marker regex"));

static MARKER_SPACING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\.{1,5}|\*{1,5})\s{2,}(\S)").expect("hardcoded marker spacing regex"));

static INLINE_IMAGE_MACRO: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"image:[^\s\[:][^\s\[]*\[[^\]]*\]").expect("hardcoded inline image macro regex"));

/// A fix that changed the document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedFix {
    pub name: &'static str,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoFixResult {
    pub content: String,
    pub fixes_applied: Vec<AppliedFix>,
    pub remaining_issues: ValidationReport,
}

struct Fix {
    name: &'static str,
    apply: fn(&mut Vec<String>) -> usize,
}

static FIXES: &[Fix] = &[
    Fix {
        name: "continuation-markers",
        apply: fix_continuation_markers,
    },
    Fix {
        name: "admonition-spacing",
        apply: fix_admonition_spacing,
    },
    Fix {
        name: "list-formatting",
        apply: fix_list_formatting,
    },
    Fix {
        name: "block-spacing",
        apply: fix_block_spacing,
    },
    Fix {
        name: "inline-image-spacing",
        apply: fix_inline_image_spacing,
    },
    Fix {
        name: "duplicate-blank-lines",
        apply: fix_blank_lines,
    },
];

/// Apply all fixes in order and validate the result
pub fn auto_fix(text: &str, options: &ValidationOptions) -> AutoFixResult {
    let mut lines: Vec<String> = text.lines().map(str::to_string).collect();
    let mut fixes_applied = Vec::new();

    for fix in FIXES {
        let count = (fix.apply)(&mut lines);
        if count > 0 {
            tracing::debug!(fix = fix.name, changes = count, "auto-fix applied");
            fixes_applied.push(AppliedFix { name: fix.name, count });
        }
    }

    let mut content = lines.join("\n");
    if !content.is_empty() {
        content.push('\n');
    }
    let remaining_issues = validate(&content, options);
    AutoFixResult {
        content,
        fixes_applied,
        remaining_issues,
    }
}

fn mask(lines: &[String]) -> Vec<bool> {
    let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
    verbatim_mask(&refs, OutputFormat::Asciidoc)
}

fn fix_continuation_markers(lines: &mut Vec<String>) -> usize {
    remove_orphaned_continuations(lines, OutputFormat::Asciidoc)
}

/// Reattach `[NOTE]` style lines separated from their `====` block
fn fix_admonition_spacing(lines: &mut Vec<String>) -> usize {
    let flags = mask(lines);
    let mut removals = Vec::new();
    for i in 0..lines.len() {
        if flags[i] || !ADMONITION_STYLE.is_match(&lines[i]) {
            continue;
        }
        let blanks = lines[i + 1..].iter().take_while(|l| is_blank(l)).count();
        let target = i + 1 + blanks;
        if blanks > 0 && lines.get(target).is_some_and(|l| EXAMPLE_DELIMITER.is_match(l)) {
            removals.extend(i + 1..target);
        }
    }
    for &at in removals.iter().rev() {
        lines.remove(at);
    }
    removals.len()
}

/// Unindent list markers and normalise the space after them
fn fix_list_formatting(lines: &mut Vec<String>) -> usize {
    let flags = mask(lines);
    let mut count = 0;
    for (line, verbatim) in lines.iter_mut().zip(flags) {
        if verbatim {
            continue;
        }
        let mut fixed = INDENTED_MARKER.replace(line, "$1").into_owned();
        fixed = MARKER_SPACING.replace(&fixed, "$1 $2").into_owned();
        if fixed != *line {
            *line = fixed;
            count += 1;
        }
    }
    count
}

fn fix_block_spacing(lines: &mut Vec<String>) -> usize {
    ensure_block_spacing(lines, OutputFormat::Asciidoc)
}

/// Separate a complete `image:target[...]` macro from words glued to it.
/// Code spans and passthroughs are left alone.
fn fix_inline_image_spacing(lines: &mut Vec<String>) -> usize {
    let flags = mask(lines);
    let mut count = 0;
    for (line, verbatim) in lines.iter_mut().zip(flags) {
        if verbatim || line.starts_with("image::") {
            continue;
        }
        let masked = mask_inline_literals(line);
        let mut inserts = Vec::new();
        for m in INLINE_IMAGE_MACRO.find_iter(&masked) {
            if masked[..m.start()].chars().next_back().is_some_and(is_word_char) {
                inserts.push(m.start());
            }
            if masked[m.end()..].chars().next().is_some_and(is_word_char) {
                inserts.push(m.end());
            }
        }
        if inserts.is_empty() {
            continue;
        }
        for &at in inserts.iter().rev() {
            line.insert(at, ' ');
        }
        count += 1;
    }
    count
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn fix_blank_lines(lines: &mut Vec<String>) -> usize {
    let trimmed = trim_trailing_whitespace(lines, OutputFormat::Asciidoc);
    let collapsed = collapse_blank_lines(lines, OutputFormat::Asciidoc);
    trimmed + collapsed + trim_document_edges(lines, OutputFormat::Asciidoc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::ValidationStatus;

    #[test]
    fn test_fixes_detached_admonition() {
        let text = "Intro\n[NOTE]\n\n====\nBody\n====\nAfter\n";
        let result = auto_fix(text, &ValidationOptions::default());
        assert_eq!(result.content, "Intro\n\n[NOTE]\n====\nBody\n====\n\nAfter\n");
        let names: Vec<&str> = result.fixes_applied.iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["admonition-spacing", "block-spacing"]);
        assert_eq!(result.remaining_issues.status, ValidationStatus::Valid);
    }

    #[test]
    fn test_fixes_orphans_and_blank_runs() {
        let text = ". One\n+\n\n\n\nText   \n";
        let result = auto_fix(text, &ValidationOptions::default());
        assert_eq!(result.content, ". One\n\nText\n");
        assert!(result.remaining_issues.is_valid());
    }

    #[test]
    fn test_fixes_list_markers() {
        let text = "  . One\n..   Two\n";
        let result = auto_fix(text, &ValidationOptions::default());
        assert_eq!(result.content, ". One\n.. Two\n");
    }

    #[test]
    fn test_fixes_glued_inline_image() {
        let text = "Clickimage:save.png[Save]now\n";
        let result = auto_fix(text, &ValidationOptions::default());
        assert_eq!(result.content, "Click image:save.png[Save] now\n");
    }

    #[test]
    fn test_image_word_in_code_span_untouched() {
        let text = "Run `docker pull myimage:latest[x]` first.\nUse +myimage:tag[1]+ too.\n";
        let result = auto_fix(text, &ValidationOptions::default());
        assert_eq!(result.content, text);
        assert!(result.fixes_applied.is_empty());
    }

    #[test]
    fn test_image_word_without_macro_untouched() {
        let text = "Run docker pull myimage:latest first.\n";
        let result = auto_fix(text, &ValidationOptions::default());
        assert_eq!(result.content, text);
    }

    #[test]
    fn test_leaves_clean_text_alone() {
        let text = "= Title\n\nBody text.\n";
        let result = auto_fix(text, &ValidationOptions::default());
        assert_eq!(result.content, text);
        assert!(result.fixes_applied.is_empty());
    }
}
