//! MadCap element handling: metadata, drop-downs, cross-references, snippets.

use indexmap::IndexMap;

use crate::node::{Element, Node};
use crate::utilities::file_name;

/// Attribute marking an unresolved snippet reference
pub const INCLUDE_ATTR: &str = "data-flare-include";

/// Attribute carried over from `MadCap:continue` on lists
pub const CONTINUE_ATTR: &str = "data-list-continue";

const METADATA_ELEMENTS: &[&str] = &[
    "head",
    "script",
    "style",
    "meta",
    "link",
    "title",
    "noscript",
    "template",
    "madcap:keyword",
    "madcap:concept",
];

/// Elements with no visible content in the converted document
pub fn is_metadata(name: &str) -> bool {
    METADATA_ELEMENTS.contains(&name) || (name.starts_with("madcap:") && name.ends_with("proxy"))
}

pub fn is_madcap(name: &str) -> bool {
    name.starts_with("madcap:")
}

pub fn is_snippet(name: &str) -> bool {
    matches!(name, "madcap:snippetblock" | "madcap:snippettext")
}

/// `MadCap:dropDown` becomes `<details><summary>head</summary>body</details>`
pub fn drop_down(element: Element) -> Element {
    let mut summary = Element::new("summary");
    let mut details = Element::new("details");

    for child in element.children {
        match child {
            Node::Element(el) if el.name == "madcap:dropdownhead" => {
                summary.children.extend(unwrap_named(el, "madcap:dropdownhotspot"));
            }
            Node::Element(el) if el.name == "madcap:dropdownhotspot" => {
                summary.children.extend(el.children);
            }
            Node::Element(el) if el.name == "madcap:dropdownbody" => {
                details.children.extend(el.children);
            }
            other => details.children.push(other),
        }
    }

    details.children.insert(0, Node::Element(summary));
    details
}

/// `MadCap:expanding` becomes a span holding the head, a space and the body
pub fn expanding(element: Element) -> Element {
    let mut span = Element::new("span");
    for child in element.children {
        match child {
            Node::Element(el) if el.name == "madcap:expandinghead" => {
                span.children.extend(el.children);
                span.children.push(Node::text(" "));
            }
            Node::Element(el) if el.name == "madcap:expandingbody" => {
                span.children.extend(el.children);
            }
            other => span.children.push(other),
        }
    }
    span
}

/// `MadCap:xref` becomes a plain link
pub fn xref(element: Element) -> Element {
    let mut link = Element::new("a");
    if let Some(href) = element.attr_trimmed("href") {
        link.set_attr("href", href);
    }
    link.children = element.children;
    link
}

/// Placeholder for a snippet that could not be inlined
pub fn unresolved_snippet(element: &Element) -> Element {
    let name = if element.name == "madcap:snippettext" {
        "span"
    } else {
        "div"
    };
    Element::with_attrs(name, vec![(INCLUDE_ATTR, element.attr_trimmed("src").unwrap_or_default())])
}

/// Pre-loaded snippet markup for a `src`, matched exactly or by file name
pub fn find_snippet<'a>(snippets: &'a IndexMap<String, String>, src: &str) -> Option<&'a str> {
    let src = src.replace('\\', "/");
    if let Some(html) = snippets.get(src.as_str()) {
        return Some(html.as_str());
    }
    let wanted = file_name(&src);
    snippets
        .iter()
        .find(|(key, _)| file_name(&key.replace('\\', "/")).eq_ignore_ascii_case(wanted))
        .map(|(_, html)| html.as_str())
}

/// Drop `madcap:*` attributes, carrying list continuation over
pub fn strip_attributes(element: &mut Element) {
    if element
        .attr("madcap:continue")
        .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
    {
        element.set_attr(CONTINUE_ATTR, "true");
    }
    element.attrs.retain(|name, _| !name.starts_with("madcap:"));
}

fn unwrap_named(element: Element, name: &str) -> Vec<Node> {
    let mut out = Vec::new();
    for child in element.children {
        match child {
            Node::Element(el) if el.name == name => out.extend(el.children),
            other => out.push(other),
        }
    }
    out
}
