//! Built-in validation rules

use once_cell::sync::Lazy;
use regex::Regex;

use super::{Severity, ValidationIssue, ValidationOptions, ValidationRule};
use crate::text::{asciidoc_heading_level, is_blank, mask_inline_literals, SourceText};

static LIST_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\.{1,5}|\*{1,5})\s+\S").expect("hardcoded list marker regex"));

static NUMBERED_ITEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)\.\s+\S").expect("hardcoded numbered item regex"));

static BLOCK_IMAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^image::([^\[\s]*)\[.*\]\s*$").expect("hardcoded block image regex"));

static INLINE_IMAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|[^\w:])image:(\S+)").expect("hardcoded inline image regex"));

/// Target that names an image file, so a missing `[...]` is a broken macro
static IMAGE_FILE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\.(?:png|jpe?g|gif|svg|bmp|webp|tiff?|ico)$").expect("hardcoded image file regex")
});

static INCLUDE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^include::(\S+?)\[[^\]]*\]\s*$").expect("hardcoded include regex"));

static ADMONITION_STYLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\[(?:NOTE|TIP|IMPORTANT|WARNING|CAUTION)\]\s*$").expect("hardcoded admonition style regex")
});

static EMPTY_ADMONITION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:NOTE|TIP|IMPORTANT|WARNING|CAUTION):\s*$").expect("hardcoded empty admonition regex")
});

static EXAMPLE_DELIMITER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^={4,}\s*$").expect("hardcoded example delimiter regex"));

/// `+` lines with nothing to attach to
pub struct OrphanedContinuation;

impl ValidationRule for OrphanedContinuation {
    fn name(&self) -> &'static str {
        "orphaned-continuation"
    }

    fn severity(&self) -> Severity {
        Severity::Warning
    }

    fn check(&self, source: &SourceText<'_>, _options: &ValidationOptions) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        let last = source.len().saturating_sub(1);
        for (number, line) in source.prose_lines() {
            if line.trim() != "+" {
                continue;
            }
            let i = number - 1;
            let prev = if i == 0 { None } else { source.line(i - 1) };
            let next = if i == last { None } else { source.line(i + 1) };
            let orphaned = match (prev, next) {
                (Some(p), Some(n)) => is_blank(p) || is_blank(n) || p.trim() == "+",
                _ => true,
            };
            if orphaned {
                issues.push(
                    ValidationIssue::new(number, self.severity(), self.name(), "Orphaned list continuation marker")
                        .with_suggestion("Remove the '+' line or attach the following block to a list item"),
                );
            }
        }
        issues
    }
}

/// List depth jumps and out-of-order explicit numbers
pub struct ListSequence;

impl ValidationRule for ListSequence {
    fn name(&self) -> &'static str {
        "list-sequence"
    }

    fn severity(&self) -> Severity {
        Severity::Warning
    }

    fn check(&self, source: &SourceText<'_>, _options: &ValidationOptions) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        let mut depth = 0usize;
        let mut last_number: Option<u32> = None;
        let mut after_blank = false;

        for (number, line) in source.prose_lines() {
            if is_blank(line) {
                after_blank = true;
                continue;
            }

            if let Some(caps) = LIST_MARKER.captures(line) {
                let level = caps[1].len();
                if level > depth + 1 {
                    issues.push(
                        ValidationIssue::new(
                            number,
                            self.severity(),
                            self.name(),
                            format!("List depth jumps from {} to {}", depth, level),
                        )
                        .with_suggestion(format!("Use {} for the next nesting level", &caps[1][..1].repeat(depth + 1))),
                    );
                }
                depth = level;
            } else if let Some(caps) = NUMBERED_ITEM.captures(line) {
                let n: u32 = caps[1].parse().unwrap_or(0);
                if let Some(prev) = last_number {
                    if prev.checked_add(1) != Some(n) && n != 1 {
                        issues.push(
                            ValidationIssue::new(
                                number,
                                self.severity(),
                                self.name(),
                                format!("List item numbered {} follows {}", n, prev),
                            )
                            .with_suggestion("Use '.' markers and let the renderer number items"),
                        );
                    }
                }
                last_number = Some(n);
            } else if asciidoc_heading_level(line).is_some() || (after_blank && !attaches_to_list(line)) {
                depth = 0;
                last_number = None;
            }
            after_blank = false;
        }
        issues
    }
}

fn attaches_to_list(line: &str) -> bool {
    let line = line.trim();
    line == "+" || line == "//-" || (line.starts_with('[') && line.ends_with(']'))
}

/// Unbalanced `|===` table delimiters
pub struct TableDelimiters;

impl ValidationRule for TableDelimiters {
    fn name(&self) -> &'static str {
        "table-delimiters"
    }

    fn severity(&self) -> Severity {
        Severity::Error
    }

    fn check(&self, source: &SourceText<'_>, _options: &ValidationOptions) -> Vec<ValidationIssue> {
        let mut open: Option<usize> = None;
        for (number, line) in source.prose_lines() {
            if line.trim_end() == "|===" {
                open = match open {
                    Some(_) => None,
                    None => Some(number),
                };
            }
        }
        match open {
            Some(number) => vec![ValidationIssue::new(
                number,
                self.severity(),
                self.name(),
                "Table is opened but never closed",
            )
            .with_suggestion("Add a closing |=== line")],
            None => Vec::new(),
        }
    }
}

/// Malformed image macros, empty targets and missing files
pub struct ImageMacro;

impl ImageMacro {
    fn check_target(
        &self,
        number: usize,
        target: &str,
        options: &ValidationOptions,
        issues: &mut Vec<ValidationIssue>,
    ) {
        if target.is_empty() {
            issues.push(ValidationIssue::new(number, self.severity(), self.name(), "Image macro has an empty target"));
            return;
        }
        let remote = target.starts_with("http://") || target.starts_with("https://") || target.starts_with("data:");
        if let (false, Some(available)) = (remote, &options.available_images) {
            let decoded = target.replace("%20", " ");
            let file_name = decoded.rsplit('/').next().unwrap_or(&decoded);
            if !available.contains(&decoded) && !available.contains(file_name) {
                issues.push(
                    ValidationIssue::new(
                        number,
                        self.severity(),
                        self.name(),
                        format!("Image file not found: {}", decoded),
                    )
                    .with_suggestion("Copy the image into the images directory or fix the path"),
                );
            }
        }
    }
}

impl ValidationRule for ImageMacro {
    fn name(&self) -> &'static str {
        "image-macro"
    }

    fn severity(&self) -> Severity {
        Severity::Error
    }

    fn check(&self, source: &SourceText<'_>, options: &ValidationOptions) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        for (number, line) in source.prose_lines() {
            if line.starts_with("image::") {
                match BLOCK_IMAGE.captures(line) {
                    Some(caps) => self.check_target(number, &caps[1], options, &mut issues),
                    None => issues.push(
                        ValidationIssue::new(number, self.severity(), self.name(), "Malformed block image macro")
                            .with_suggestion("Use image::path[alt text]"),
                    ),
                }
                continue;
            }

            let masked = mask_inline_literals(line);
            for caps in INLINE_IMAGE.captures_iter(&masked) {
                let tail = &caps[1];
                let Some(open) = tail.find('[') else {
                    // `image:latest` in prose is not a macro
                    if !IMAGE_FILE.is_match(tail.trim_end_matches(['.', ',', ';', ')'])) {
                        continue;
                    }
                    issues.push(
                        ValidationIssue::new(
                            number,
                            self.severity(),
                            self.name(),
                            "Inline image macro is missing its attribute list",
                        )
                        .with_suggestion("Use image:path[alt text]"),
                    );
                    continue;
                };
                let start = caps.get(1).map_or(0, |m| m.start()) + open;
                if !masked[start..].contains(']') {
                    issues.push(ValidationIssue::new(
                        number,
                        self.severity(),
                        self.name(),
                        "Inline image macro attribute list is not closed",
                    ));
                    continue;
                }
                self.check_target(number, &tail[..open], options, &mut issues);
            }
        }
        issues
    }
}

/// Malformed `include::` directives
pub struct IncludeDirective;

impl ValidationRule for IncludeDirective {
    fn name(&self) -> &'static str {
        "include-directive"
    }

    fn severity(&self) -> Severity {
        Severity::Error
    }

    fn check(&self, source: &SourceText<'_>, _options: &ValidationOptions) -> Vec<ValidationIssue> {
        source
            .prose_lines()
            .filter(|(_, line)| line.starts_with("include::") && !INCLUDE.is_match(line))
            .map(|(number, _)| {
                ValidationIssue::new(number, self.severity(), self.name(), "Malformed include directive")
                    .with_suggestion("Use include::path/to/file.adoc[]")
            })
            .collect()
    }
}

/// Detached style lines, unbalanced `====` and empty admonitions
pub struct AdmonitionBlock;

impl ValidationRule for AdmonitionBlock {
    fn name(&self) -> &'static str {
        "admonition-block"
    }

    fn severity(&self) -> Severity {
        Severity::Error
    }

    fn check(&self, source: &SourceText<'_>, _options: &ValidationOptions) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        let mut open: Vec<(usize, &str)> = Vec::new();

        for (number, line) in source.prose_lines() {
            if ADMONITION_STYLE.is_match(line) {
                let next = source.line(number);
                if next.map_or(true, is_blank) {
                    issues.push(
                        ValidationIssue::new(
                            number,
                            self.severity(),
                            self.name(),
                            "Admonition style line is not attached to a block",
                        )
                        .with_suggestion("Follow the style line directly with ==== and the content"),
                    );
                }
            } else if EMPTY_ADMONITION.is_match(line) {
                issues.push(ValidationIssue::new(number, self.severity(), self.name(), "Admonition has no content"));
            } else if EXAMPLE_DELIMITER.is_match(line) {
                let delim = line.trim_end();
                match open.last() {
                    Some((_, top)) if *top == delim => {
                        open.pop();
                    }
                    _ => open.push((number, delim)),
                }
            }
        }

        for (number, delim) in open {
            issues.push(
                ValidationIssue::new(
                    number,
                    self.severity(),
                    self.name(),
                    format!("Block delimiter {} is never closed", delim),
                )
                .with_suggestion(format!("Add a closing {} line", delim)),
            );
        }
        issues
    }
}

/// Section levels that skip a level
pub struct SectionLevels;

impl ValidationRule for SectionLevels {
    fn name(&self) -> &'static str {
        "section-levels"
    }

    fn severity(&self) -> Severity {
        Severity::Info
    }

    fn check(&self, source: &SourceText<'_>, _options: &ValidationOptions) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        let mut previous = 1;
        for (number, line) in source.prose_lines() {
            let Some(level) = asciidoc_heading_level(line) else {
                continue;
            };
            if level > previous + 1 {
                issues.push(ValidationIssue::new(
                    number,
                    self.severity(),
                    self.name(),
                    format!("Section level {} follows level {}", level, previous),
                ));
            }
            previous = level;
        }
        issues
    }
}

pub struct TrailingWhitespace;

impl ValidationRule for TrailingWhitespace {
    fn name(&self) -> &'static str {
        "trailing-whitespace"
    }

    fn severity(&self) -> Severity {
        Severity::Info
    }

    fn check(&self, source: &SourceText<'_>, _options: &ValidationOptions) -> Vec<ValidationIssue> {
        source
            .prose_lines()
            .filter(|(_, line)| line.ends_with([' ', '\t']))
            .map(|(number, _)| ValidationIssue::new(number, self.severity(), self.name(), "Trailing whitespace"))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::OutputFormat;
    use std::collections::BTreeSet;

    fn run(rule: &dyn ValidationRule, text: &str) -> Vec<ValidationIssue> {
        let source = SourceText::new(text, OutputFormat::Asciidoc);
        rule.check(&source, &ValidationOptions::default())
    }

    #[test]
    fn test_orphaned_continuation() {
        let issues = run(&OrphanedContinuation, ". Step\n+\nimage::a.png[]\n\n+\nText\n");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].line, 5);
    }

    #[test]
    fn test_list_depth_jump() {
        let issues = run(&ListSequence, ". One\n... Deep\n");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].message, "List depth jumps from 1 to 3");
    }

    #[test]
    fn test_list_depth_resets_after_paragraph() {
        let issues = run(&ListSequence, ". One\n.. Two\n\nParagraph\n\n. Again\n");
        assert!(issues.is_empty());
    }

    #[test]
    fn test_explicit_numbering() {
        let issues = run(&ListSequence, "1. One\n3. Three\n");
        assert_eq!(issues.len(), 1);
    }

    #[test]
    fn test_explicit_numbering_at_u32_max() {
        let issues = run(&ListSequence, "4294967295. Last\n2. Next\n");
        assert_eq!(issues.len(), 1);
    }

    #[test]
    fn test_listing_content_ignored() {
        let issues = run(&TableDelimiters, "----\n|===\n----\n");
        assert!(issues.is_empty());
    }

    #[test]
    fn test_malformed_images() {
        let text = "image::[alt]\nimage::ok.png\nSee image:icon.png here\nimage:x.png[ok] fine\n";
        let issues = run(&ImageMacro, text);
        let lines: Vec<usize> = issues.iter().map(|i| i.line).collect();
        assert_eq!(lines, vec![1, 2, 3]);
    }

    #[test]
    fn test_prose_image_word_not_flagged() {
        assert!(run(&ImageMacro, "Select the image: it opens.\n").is_empty());
        assert!(run(&ImageMacro, "Tag the image:latest build.\n").is_empty());
        assert!(run(&ImageMacro, "Run `docker pull image:icon.png` first.\n").is_empty());
    }

    #[test]
    fn test_missing_image_file() {
        let source = SourceText::new("image::images/a.png[]\nimage::images/b.png[]\n", OutputFormat::Asciidoc);
        let options = ValidationOptions {
            available_images: Some(BTreeSet::from(["a.png".to_string()])),
            ..Default::default()
        };
        let issues = ImageMacro.check(&source, &options);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].line, 2);
    }

    #[test]
    fn test_include_directive() {
        let issues = run(&IncludeDirective, "include::a.adoc[]\ninclude::b.adoc\ninclude::[]\n");
        let lines: Vec<usize> = issues.iter().map(|i| i.line).collect();
        assert_eq!(lines, vec![2, 3]);
    }

    #[test]
    fn test_admonition_block_checks() {
        let text = "[NOTE]\n\nText\n\nTIP:\n\n[WARNING]\n====\nBody\n";
        let issues = run(&AdmonitionBlock, text);
        let lines: Vec<usize> = issues.iter().map(|i| i.line).collect();
        assert_eq!(lines, vec![1, 5, 8]);
    }

    #[test]
    fn test_balanced_admonition() {
        let text = "[NOTE]\n====\nBody\n====\n";
        assert!(run(&AdmonitionBlock, text).is_empty());
    }

    #[test]
    fn test_section_levels() {
        let issues = run(&SectionLevels, "= T\n\n== A\n\n==== C\n");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].line, 5);
    }
}
