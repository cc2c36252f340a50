//! Utility functions and constants for HTML processing.

/// Block-level HTML elements
pub const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "body", "center", "dd", "details", "dir", "div",
    "dl", "dt", "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5",
    "h6", "header", "hgroup", "hr", "html", "li", "main", "menu", "nav", "ol", "p", "pre",
    "section", "summary", "table", "tbody", "td", "tfoot", "th", "thead", "tr", "ul",
];

/// Void (self-closing) HTML elements
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "command", "embed", "hr", "img", "input", "keygen", "link",
    "meta", "param", "source", "track", "wbr",
];

/// Check if a tag is a block-level element
pub fn is_block(tag: &str) -> bool {
    BLOCK_ELEMENTS.contains(&tag.to_ascii_lowercase().as_str())
}

/// Check if a tag is a void element
pub fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag.to_ascii_lowercase().as_str())
}

/// HTML inter-element whitespace. Non-breaking spaces are content.
pub fn is_html_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r' | '\x0c')
}

/// Collapse runs of HTML whitespace to one space, keeping non-breaking spaces
pub fn collapse_whitespace(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut prev_was_whitespace = false;

    for c in s.chars() {
        if is_html_whitespace(c) {
            if !prev_was_whitespace {
                result.push(' ');
                prev_was_whitespace = true;
            }
        } else {
            result.push(c);
            prev_was_whitespace = false;
        }
    }

    result
}

/// Escape text for HTML output
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Pixel value of an HTML/CSS length (`16`, `16px`, `16.5px`); other units give `None`
pub fn parse_css_length(value: &str) -> Option<u32> {
    let value = value.trim().to_ascii_lowercase();
    let number = value.strip_suffix("px").unwrap_or(&value).trim();
    let parsed: f32 = number.parse().ok()?;
    (parsed.is_finite() && parsed >= 0.0).then(|| parsed.round() as u32)
}

/// File name part of a path or URL
pub fn file_name(path: &str) -> &str {
    let path = path.split(['?', '#']).next().unwrap_or(path);
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_block() {
        assert!(is_block("div"));
        assert!(is_block("P"));
        assert!(!is_block("span"));
        assert!(!is_block("madcap:variable"));
    }

    #[test]
    fn test_is_void() {
        assert!(is_void("br"));
        assert!(is_void("IMG"));
        assert!(!is_void("madcap:snippetblock"));
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("a \n\t b"), "a b");
        assert_eq!(collapse_whitespace("Ctrl\u{a0}+\u{a0} S"), "Ctrl\u{a0}+\u{a0} S");
        assert_eq!(collapse_whitespace("  lead"), " lead");
    }

    #[test]
    fn test_parse_css_length() {
        assert_eq!(parse_css_length("16"), Some(16));
        assert_eq!(parse_css_length(" 24px "), Some(24));
        assert_eq!(parse_css_length("12.6px"), Some(13));
        assert_eq!(parse_css_length("2em"), None);
        assert_eq!(parse_css_length("auto"), None);
    }

    #[test]
    fn test_file_name() {
        assert_eq!(file_name("../Resources/Images/save.png"), "save.png");
        assert_eq!(file_name("img\\icon.gif?v=2"), "icon.gif");
        assert_eq!(file_name("plain.png"), "plain.png");
    }
}
