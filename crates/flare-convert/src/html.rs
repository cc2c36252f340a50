//! HTML parsing support.
//!
//! Parses HTML strings with scraper (html5ever) and copies the result into the
//! owned [`Node`] tree used by the preprocessor and converter.

use std::borrow::Cow;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Node as ScraperNode};

use crate::node::{Element, Node};
use crate::utilities::collapse_whitespace;

static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").expect("hardcoded tag regex"));

/// A parsed topic: the `<body>` subtree plus the attributes of `<html>`
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    pub html_attrs: IndexMap<String, String>,
    pub body: Element,
    /// Number of markup errors html5ever recovered from, not counting a
    /// missing or legacy DOCTYPE
    pub errors: usize,
}

/// Parse a complete HTML document
///
/// # Example
///
/// ```rust
/// use flare_convert::parse_document;
///
/// let doc = parse_document("<html><body><h1>Hello <em>World</em></h1></body></html>");
/// assert_eq!(doc.body.name, "body");
/// assert_eq!(doc.body.text_content(), "Hello World");
/// ```
pub fn parse_document(html: &str) -> ParsedDocument {
    let document = Html::parse_document(html);
    let root = document.root_element();

    let html_attrs = root
        .value()
        .attrs()
        .map(|(k, v)| (k.to_ascii_lowercase(), v.to_string()))
        .collect();

    let body = root
        .children()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "body")
        .map(scraper_to_element)
        .unwrap_or_else(|| Element::new("body"));

    ParsedDocument {
        html_attrs,
        body,
        errors: markup_errors(&document.errors, has_doctype(html)),
    }
}

fn has_doctype(html: &str) -> bool {
    html.trim_start()
        .get(..9)
        .is_some_and(|start| start.eq_ignore_ascii_case("<!doctype"))
}

/// Flare topics and fragments have no DOCTYPE, which html5ever reports as an
/// unexpected first token. That error and DOCTYPE complaints are not counted.
fn markup_errors(errors: &[Cow<'static, str>], has_doctype: bool) -> usize {
    let mut errors = errors.iter().filter(|e| !e.contains("DOCTYPE")).peekable();
    if !has_doctype && errors.peek().is_some_and(|e| e.starts_with("Unexpected token")) {
        errors.next();
    }
    errors.count()
}

/// Parse an HTML fragment into a list of nodes
pub fn parse_fragment(html: &str) -> Vec<Node> {
    let fragment = Html::parse_fragment(html);
    scraper_to_element(fragment.root_element()).children
}

/// Visible text of markup with all tags removed, whitespace collapsed
pub fn strip_tags(html: &str) -> String {
    let text = TAG.replace_all(html, " ");
    collapse_whitespace(&text).trim().to_string()
}

/// Convert a scraper ElementRef to our Element structure
fn scraper_to_element(element: ElementRef) -> Element {
    let attrs: Vec<(&str, &str)> = element.value().attrs().collect();
    let mut el = Element::with_attrs(element.value().name(), attrs);

    for child in element.children() {
        match child.value() {
            ScraperNode::Text(text) => {
                el.add_child(Node::text(&text.text));
            }
            ScraperNode::Comment(comment) => {
                el.add_child(Node::Comment(String::from(&*comment.comment)));
            }
            ScraperNode::Element(_) => {
                if let Some(child_element) = ElementRef::wrap(child) {
                    el.add_child(Node::Element(scraper_to_element(child_element)));
                }
            }
            _ => {}
        }
    }

    el
}
