//! Owned DOM tree for preprocessing and conversion.
//!
//! The HTML parser's output is copied into this structure once so the
//! preprocessor can rewrite it freely. Tag and attribute names are stored
//! lowercase (`madcap:variable`, `madcap:conditions`).

use indexmap::IndexMap;

use crate::utilities::{escape_html, is_void};

/// A node in the document tree
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
    Comment(String),
}

/// An element with ordered attributes and children
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    /// Lowercase tag name
    pub name: String,
    pub attrs: IndexMap<String, String>,
    pub children: Vec<Node>,
}

impl Node {
    /// Create a new element node
    pub fn element(tag_name: &str) -> Self {
        Node::Element(Element::new(tag_name))
    }

    /// Create a new element node with attributes
    pub fn element_with_attrs(tag_name: &str, attrs: Vec<(&str, &str)>) -> Self {
        Node::Element(Element::with_attrs(tag_name, attrs))
    }

    /// Create a new text node
    pub fn text(content: &str) -> Self {
        Node::Text(content.to_string())
    }

    pub fn is_element(&self) -> bool {
        matches!(self, Node::Element(_))
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Node::Text(_))
    }

    /// Tag name for elements, `#text` / `#comment` otherwise
    pub fn node_name(&self) -> &str {
        match self {
            Node::Element(el) => &el.name,
            Node::Text(_) => "#text",
            Node::Comment(_) => "#comment",
        }
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Node::Element(el) => Some(el),
            _ => None,
        }
    }

    /// Element with the given tag name
    pub fn is_tag(&self, name: &str) -> bool {
        matches!(self, Node::Element(el) if el.name == name)
    }

    /// Text node containing only whitespace
    pub fn is_whitespace(&self) -> bool {
        matches!(self, Node::Text(t) if t.trim().is_empty())
    }

    /// Get all text content from this node and descendants
    pub fn text_content(&self) -> String {
        match self {
            Node::Element(el) => el.text_content(),
            Node::Text(t) => t.clone(),
            Node::Comment(_) => String::new(),
        }
    }

    /// Reconstruct outer HTML
    pub fn outer_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        match self {
            Node::Element(el) => el.write_html(out),
            Node::Text(t) => out.push_str(&escape_html(t)),
            Node::Comment(c) => {
                out.push_str("<!--");
                out.push_str(c);
                out.push_str("-->");
            }
        }
    }
}

impl Element {
    pub fn new(tag_name: &str) -> Self {
        Self {
            name: tag_name.to_ascii_lowercase(),
            attrs: IndexMap::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attrs(tag_name: &str, attrs: Vec<(&str, &str)>) -> Self {
        let mut el = Self::new(tag_name);
        for (name, value) in attrs {
            el.set_attr(name, value);
        }
        el
    }

    /// Get an attribute value by name (case-insensitive)
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// Attribute value trimmed, `None` when missing or blank
    pub fn attr_trimmed(&self, name: &str) -> Option<&str> {
        self.attr(name).map(str::trim).filter(|v| !v.is_empty())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attrs.contains_key(&name.to_ascii_lowercase())
    }

    pub fn set_attr(&mut self, name: &str, value: &str) {
        self.attrs.insert(name.to_ascii_lowercase(), value.to_string());
    }

    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        self.attrs.shift_remove(&name.to_ascii_lowercase())
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or("").split_whitespace()
    }

    /// Class check, case-insensitive
    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c.eq_ignore_ascii_case(class))
    }

    /// Value of one CSS property from the `style` attribute
    pub fn style_property(&self, property: &str) -> Option<&str> {
        self.attr("style")?
            .split(';')
            .filter_map(|decl| decl.split_once(':'))
            .find(|(name, _)| name.trim().eq_ignore_ascii_case(property))
            .map(|(_, value)| value.trim())
    }

    pub fn children(&self) -> impl Iterator<Item = &Node> {
        self.children.iter()
    }

    /// Get only element children
    pub fn element_children(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(Node::as_element)
    }

    pub fn add_child(&mut self, child: Node) {
        self.children.push(child);
    }

    /// First descendant element with the given tag, depth first
    pub fn find(&self, tag: &str) -> Option<&Element> {
        for child in self.element_children() {
            if child.name == tag {
                return Some(child);
            }
            if let Some(found) = child.find(tag) {
                return Some(found);
            }
        }
        None
    }

    /// Get all text content from this element and descendants
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                Node::Element(el) => el.collect_text(out),
                Node::Text(t) => out.push_str(t),
                Node::Comment(_) => {}
            }
        }
    }

    /// Element has no visible text and no image
    pub fn is_empty_of_content(&self) -> bool {
        self.text_content().trim().is_empty() && self.name != "img" && self.find("img").is_none()
    }

    pub fn outer_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    pub fn inner_html(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            child.write_html(&mut out);
        }
        out
    }

    fn write_html(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for (name, value) in &self.attrs {
            out.push(' ');
            out.push_str(name);
            if !value.is_empty() {
                out.push_str("=\"");
                out.push_str(&escape_html(value).replace('"', "&quot;"));
                out.push('"');
            }
        }
        out.push('>');
        if is_void(&self.name) {
            return;
        }
        for child in &self.children {
            child.write_html(out);
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }
}

impl From<Element> for Node {
    fn from(el: Element) -> Self {
        Node::Element(el)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_element() {
        let node = Node::element("DIV");
        assert!(node.is_element());
        assert_eq!(node.node_name(), "div");
    }

    #[test]
    fn test_create_text() {
        let node = Node::text("Hello World");
        assert!(node.is_text());
        assert_eq!(node.text_content(), "Hello World");
    }

    #[test]
    fn test_attributes() {
        let el = Element::with_attrs("a", vec![("href", "guide.htm"), ("MadCap:conditions", "Default.Internal")]);
        assert_eq!(el.attr("href"), Some("guide.htm"));
        assert_eq!(el.attr("madcap:conditions"), Some("Default.Internal"));
        assert_eq!(el.attr("class"), None);
    }

    #[test]
    fn test_classes_and_style() {
        let el = Element::with_attrs(
            "ol",
            vec![("class", "Note IconInline"), ("style", "margin: 0; list-style-type: lower-alpha")],
        );
        assert!(el.has_class("note"));
        assert!(el.has_class("iconinline"));
        assert_eq!(el.style_property("list-style-type"), Some("lower-alpha"));
        assert_eq!(el.style_property("color"), None);
    }

    #[test]
    fn test_text_content_skips_comments() {
        let mut div = Element::new("div");
        div.add_child(Node::text("Hello "));
        div.add_child(Node::Comment("hidden".to_string()));
        let mut span = Element::new("span");
        span.add_child(Node::text("World"));
        div.add_child(span.into());
        assert_eq!(div.text_content(), "Hello World");
    }

    #[test]
    fn test_outer_html() {
        let mut a = Element::with_attrs("a", vec![("href", "https://example.com")]);
        a.add_child(Node::text("Fish & Chips"));
        assert_eq!(a.outer_html(), "<a href=\"https://example.com\">Fish &amp; Chips</a>");
    }

    #[test]
    fn test_void_element_html() {
        let img = Element::with_attrs("img", vec![("src", "test.png"), ("alt", "Test")]);
        assert_eq!(img.outer_html(), "<img src=\"test.png\" alt=\"Test\">");
    }

    #[test]
    fn test_find_descendant() {
        let mut p = Element::new("p");
        let mut span = Element::new("span");
        span.add_child(Node::element_with_attrs("img", vec![("src", "a.png")]));
        p.add_child(span.into());
        assert_eq!(p.find("img").and_then(|i| i.attr("src")), Some("a.png"));
        assert!(!p.is_empty_of_content());
    }
}
