//! Regex repairs applied to the raw markup before parsing.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::utilities::is_void;

static SELF_CLOSING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<([A-Za-z][\w:.-]*)((?:\s+[^<>]*?)?)\s*/>").expect("hardcoded self-closing tag regex")
});

static XML_DECLARATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*<\?xml[^>]*\?>").expect("hardcoded xml declaration regex"));

/// Apply all text repairs
pub fn repair(raw: &str) -> String {
    let without_declaration = XML_DECLARATION.replace(raw, "");
    expand_self_closing(&without_declaration)
}

/// `<MadCap:variable name="x" />` becomes `<MadCap:variable name="x"></MadCap:variable>`.
/// HTML parsers ignore `/>` on non-void tags and would nest the following
/// content inside the element.
pub fn expand_self_closing(html: &str) -> String {
    SELF_CLOSING
        .replace_all(html, |caps: &Captures| {
            let name = &caps[1];
            if is_void(name) {
                caps[0].to_string()
            } else {
                format!("<{}{}></{}>", name, &caps[2], name)
            }
        })
        .into_owned()
}
